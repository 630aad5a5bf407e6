//! Service wiring: store selection, seeding, and token minting.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;

use tessera_auth::{AccessClaims, Hs256Jwt, JwtError, Permission, RoleName};
use tessera_core::{TenantId, UserId};
use tessera_infra::{Grants, InMemoryPermissionStore, PermissionResolver, PermissionStore, PostgresPermissionStore};
use tessera_permissions::{seed, Tenant, UserTenant};

use crate::config::ApiConfig;

pub type SharedStore = Arc<dyn PermissionStore>;

/// Services shared by every handler.
pub struct AppServices {
    pub resolver: PermissionResolver<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            resolver: PermissionResolver::new(store),
        }
    }
}

/// A demo tenant with one owner, created for in-memory runs.
#[derive(Debug, Clone)]
pub struct DemoSession {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub email: String,
    pub grants: Grants,
}

/// Postgres store when `DATABASE_URL` is set, otherwise a seeded in-memory
/// store with a demo tenant (returned alongside).
pub async fn build_store(config: &ApiConfig) -> anyhow::Result<(SharedStore, Option<DemoSession>)> {
    match &config.database_url {
        Some(url) => {
            let store = postgres_store(url, config.database_max_connections).await?;
            Ok((store, None))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using the in-memory permission store");
            let store = Arc::new(InMemoryPermissionStore::seeded().context("invalid seed catalog")?);
            let demo = seed_demo_tenant(Arc::clone(&store)).await?;
            let store: SharedStore = store;
            Ok((store, Some(demo)))
        }
    }
}

async fn postgres_store(url: &str, max_connections: u32) -> anyhow::Result<SharedStore> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    let store = PostgresPermissionStore::new(pool);
    store.ensure_schema().await.context("failed to apply schema")?;
    let seed = seed::seed_data().context("invalid seed catalog")?;
    store.install_seed(&seed).await.context("failed to install seed")?;

    tracing::info!(max_connections, "connected to postgres permission store");
    let store: SharedStore = Arc::new(store);
    Ok(store)
}

/// Create a professional-plan tenant, provision its default roles and add an
/// owner membership.
pub async fn seed_demo_tenant(store: Arc<InMemoryPermissionStore>) -> anyhow::Result<DemoSession> {
    let plan = store
        .find_plan_by_code("professional")
        .await?
        .context("seed has no professional plan")?;
    let tenant = Tenant::new("Demo Company").with_plan(plan.id);
    let tenant_id = tenant.id;
    store.insert_tenant(tenant)?;

    let resolver = PermissionResolver::new(Arc::clone(&store));
    resolver.provision_default_roles(tenant_id).await?;

    let user_id = UserId::new();
    store.upsert_membership(UserTenant::new(user_id, tenant_id, ["owner"]))?;
    let grants = resolver.resolve_grants(user_id, tenant_id).await?;

    Ok(DemoSession {
        tenant_id,
        user_id,
        email: "owner@demo.local".to_string(),
        grants,
    })
}

/// Sign an access token embedding `grants`.
pub fn mint_access_token(
    jwt: &Hs256Jwt,
    user_id: UserId,
    tenant_id: TenantId,
    email: &str,
    grants: &Grants,
    ttl: Duration,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id,
        tenant_id,
        email: email.to_string(),
        roles: grants.roles.iter().cloned().map(RoleName::new).collect(),
        permissions: grants.permissions.iter().cloned().map(Permission::new).collect(),
        issued_at: now,
        expires_at: now + ttl,
    };
    jwt.issue(&claims)
}
