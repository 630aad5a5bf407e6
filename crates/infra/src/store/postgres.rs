//! Postgres-backed permission store.
//!
//! Catalog, plan, tenant and role rows live in ordinary tables (see
//! `migrations/0001_permissions.sql`). Role permission tokens and membership
//! role names are JSONB string arrays, stored verbatim.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Role name already taken within the tenant |
//! | Database (other) | Any other | `Backend` | Constraint or statement failure |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | RowNotFound | N/A | `Backend` | Unexpected row not found (we use fetch_optional/fetch_all) |
//! | ColumnDecode | N/A | `Corrupt` | Stored value does not fit the domain type |
//! | Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! A role update whose version predicate matches no row is reported as
//! `Conflict` as well.
//!
//! ## Thread Safety
//!
//! `PostgresPermissionStore` is `Send + Sync` and can be shared across tasks.
//! Each method is a single statement (or one transaction), so the pool handles
//! all connection management.
//!
//! ## Tenant Isolation
//!
//! Every tenant-scoped query carries `tenant_id` in its WHERE clause. System
//! roles (`tenant_id IS NULL`) are the only rows visible across tenants.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use tessera_core::{MenuItemId, ModuleId, PlanId, RoleId, TenantId, UserId};
use tessera_permissions::seed::SeedData;
use tessera_permissions::{
    MenuItem, Module, PermissionKey, PlanMenuItem, Role, SubscriptionPlan, Tenant, UserTenant,
};

use super::{PermissionStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_permissions.sql");

/// Postgres-backed permission store.
pub struct PostgresPermissionStore {
    pool: Arc<PgPool>,
}

impl PostgresPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create missing tables and indexes. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Upsert the seed catalog, plans and plan entitlements in one transaction.
    ///
    /// Rows are matched on their natural keys (module code, module + item
    /// code, plan code), so re-running keeps existing ids.
    #[instrument(
        skip(self, seed),
        fields(
            modules = seed.catalog.modules().len(),
            menu_items = seed.catalog.menu_items().len(),
            plans = seed.plans.len()
        ),
        err
    )]
    pub async fn install_seed(&self, seed: &SeedData) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Roots first so children can resolve their parent's stored id.
        let mut modules: Vec<&Module> = seed.catalog.modules().iter().collect();
        modules.sort_by_key(|m| m.parent_id.is_some());

        let mut module_ids: HashMap<ModuleId, Uuid> = HashMap::new();
        for module in modules {
            let parent = module.parent_id.and_then(|p| module_ids.get(&p).copied());
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO modules (id, code, name, description, parent_id, sort_order, icon, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    parent_id = EXCLUDED.parent_id,
                    sort_order = EXCLUDED.sort_order,
                    icon = EXCLUDED.icon,
                    is_active = EXCLUDED.is_active
                RETURNING id
                "#,
            )
            .bind(module.id.as_uuid())
            .bind(&module.code)
            .bind(&module.name)
            .bind(&module.description)
            .bind(parent)
            .bind(module.sort_order)
            .bind(&module.icon)
            .bind(module.is_active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_module", e))?;
            module_ids.insert(module.id, id);
        }

        let mut item_ids: HashMap<MenuItemId, Uuid> = HashMap::new();
        for item in seed.catalog.menu_items() {
            let module_id = module_ids.get(&item.module_id).copied().ok_or_else(|| {
                StoreError::Corrupt(format!("menu item '{}' references an unseeded module", item.code))
            })?;
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO menu_items
                    (id, module_id, code, name, description, route, permission_key, sort_order, icon, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (module_id, code) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    route = EXCLUDED.route,
                    permission_key = EXCLUDED.permission_key,
                    sort_order = EXCLUDED.sort_order,
                    icon = EXCLUDED.icon,
                    is_active = EXCLUDED.is_active
                RETURNING id
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(module_id)
            .bind(&item.code)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.route)
            .bind(item.permission_key.as_str())
            .bind(item.sort_order)
            .bind(&item.icon)
            .bind(item.is_active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_menu_item", e))?;
            item_ids.insert(item.id, id);
        }

        let mut plan_ids: HashMap<PlanId, Uuid> = HashMap::new();
        for plan in &seed.plans {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO subscription_plans
                    (id, code, name, description, price_monthly, price_yearly, is_active, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    price_monthly = EXCLUDED.price_monthly,
                    price_yearly = EXCLUDED.price_yearly,
                    is_active = EXCLUDED.is_active,
                    sort_order = EXCLUDED.sort_order
                RETURNING id
                "#,
            )
            .bind(plan.id.as_uuid())
            .bind(&plan.code)
            .bind(&plan.name)
            .bind(&plan.description)
            .bind(price_to_db(plan.price_monthly)?)
            .bind(price_to_db(plan.price_yearly)?)
            .bind(plan.is_active)
            .bind(plan.sort_order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_plan", e))?;
            plan_ids.insert(plan.id, id);
        }

        for row in &seed.plan_menu_items {
            let (Some(plan_id), Some(menu_item_id)) =
                (plan_ids.get(&row.plan_id), item_ids.get(&row.menu_item_id))
            else {
                return Err(StoreError::Corrupt(
                    "plan entitlement references an unseeded plan or menu item".to_string(),
                ));
            };
            sqlx::query(
                r#"
                INSERT INTO plan_menu_items (plan_id, menu_item_id, is_included)
                VALUES ($1, $2, $3)
                ON CONFLICT (plan_id, menu_item_id) DO UPDATE SET is_included = EXCLUDED.is_included
                "#,
            )
            .bind(plan_id)
            .bind(menu_item_id)
            .bind(row.is_included)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_plan_menu_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!("permission seed installed");
        Ok(())
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id), err)]
    pub async fn upsert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, subscription_plan_id, plan, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                subscription_plan_id = EXCLUDED.subscription_plan_id,
                plan = EXCLUDED.plan,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.subscription_plan_id.map(|p| *p.as_uuid()))
        .bind(&tenant.plan)
        .bind(tenant.is_active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_tenant", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, membership),
        fields(tenant_id = %membership.tenant_id, user_id = %membership.user_id),
        err
    )]
    pub async fn upsert_membership(&self, membership: &UserTenant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tenants (user_id, tenant_id, roles, is_primary)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, tenant_id) DO UPDATE SET
                roles = EXCLUDED.roles,
                is_primary = EXCLUDED.is_primary
            "#,
        )
        .bind(membership.user_id.as_uuid())
        .bind(membership.tenant_id.as_uuid())
        .bind(Json(&membership.roles))
        .bind(membership.is_primary)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_membership", e))?;
        Ok(())
    }
}

const ROLE_COLUMNS: &str =
    "id, tenant_id, name, description, permissions, is_system_role, version, created_at, updated_at";

#[async_trait]
impl PermissionStore for PostgresPermissionStore {
    #[instrument(skip(self), err)]
    async fn list_modules(&self) -> StoreResult<Vec<Module>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, name, description, parent_id, sort_order, icon, is_active
            FROM modules
            ORDER BY sort_order ASC, code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_modules", e))?;

        rows.iter().map(module_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, module_id, code, name, description, route, permission_key, sort_order, icon, is_active
            FROM menu_items
            ORDER BY sort_order ASC, code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_menu_items", e))?;

        rows.iter().map(menu_item_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_plans(&self) -> StoreResult<Vec<SubscriptionPlan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, name, description, price_monthly, price_yearly, is_active, sort_order
            FROM subscription_plans
            ORDER BY sort_order ASC, code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_plans", e))?;

        rows.iter().map(plan_from_row).collect()
    }

    #[instrument(skip(self), fields(plan_id = %plan_id), err)]
    async fn get_plan(&self, plan_id: PlanId) -> StoreResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, description, price_monthly, price_yearly, is_active, sort_order
            FROM subscription_plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_plan", e))?;

        row.as_ref().map(plan_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_plan_by_code(&self, code: &str) -> StoreResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, description, price_monthly, price_yearly, is_active, sort_order
            FROM subscription_plans
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_plan_by_code", e))?;

        row.as_ref().map(plan_from_row).transpose()
    }

    #[instrument(skip(self, plan), fields(code = %plan.code), err)]
    async fn ensure_plan(&self, plan: SubscriptionPlan) -> StoreResult<SubscriptionPlan> {
        sqlx::query(
            r#"
            INSERT INTO subscription_plans
                (id, code, name, description, price_monthly, price_yearly, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(price_to_db(plan.price_monthly)?)
        .bind(price_to_db(plan.price_yearly)?)
        .bind(plan.is_active)
        .bind(plan.sort_order)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_plan", e))?;

        self.find_plan_by_code(&plan.code)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("plan '{}' vanished after insert", plan.code)))
    }

    #[instrument(skip(self), fields(plan_id = %plan_id), err)]
    async fn plan_menu_items(&self, plan_id: PlanId) -> StoreResult<Vec<PlanMenuItem>> {
        let rows = sqlx::query(
            r#"
            SELECT plan_id, menu_item_id, is_included
            FROM plan_menu_items
            WHERE plan_id = $1
            "#,
        )
        .bind(plan_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("plan_menu_items", e))?;

        rows.iter()
            .map(|row| {
                Ok(PlanMenuItem {
                    plan_id: PlanId::from_uuid(column(row, "plan_id")?),
                    menu_item_id: MenuItemId::from_uuid(column(row, "menu_item_id")?),
                    is_included: column(row, "is_included")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, subscription_plan_id, plan, is_active
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_tenant", e))?;

        row.as_ref()
            .map(|row| {
                Ok(Tenant {
                    id: TenantId::from_uuid(column(row, "id")?),
                    name: column(row, "name")?,
                    subscription_plan_id: column::<Option<Uuid>>(row, "subscription_plan_id")?
                        .map(PlanId::from_uuid),
                    plan: column(row, "plan")?,
                    is_active: column(row, "is_active")?,
                })
            })
            .transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %user_id), err)]
    async fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<UserTenant>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, tenant_id, roles, is_primary
            FROM user_tenants
            WHERE tenant_id = $1 AND user_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_membership", e))?;

        row.as_ref()
            .map(|row| {
                let Json(roles): Json<Vec<String>> = column(row, "roles")?;
                Ok(UserTenant {
                    user_id: UserId::from_uuid(column(row, "user_id")?),
                    tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
                    roles,
                    is_primary: column(row, "is_primary")?,
                })
            })
            .transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn count_members_with_role(&self, tenant_id: TenantId, role_name: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_tenants
            WHERE tenant_id = $1 AND roles @> jsonb_build_array($2::text)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_members_with_role", e))?;

        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative member count {count}")))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM roles
            WHERE tenant_id = $1 OR (tenant_id IS NULL AND is_system_role)
            ORDER BY name ASC, is_system_role ASC
            "#
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;

        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn get_role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(role_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;

        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = ?tenant_id), err)]
    async fn find_role(&self, tenant_id: Option<TenantId>, name: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE tenant_id IS NOT DISTINCT FROM $1 AND name = $2"
        ))
        .bind(tenant_id.map(|t| *t.as_uuid()))
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_role", e))?;

        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self, role), fields(role_id = %role.id, tenant_id = ?role.tenant_id), err)]
    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles
                (id, tenant_id, name, description, permissions, is_system_role, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.tenant_id.map(|t| *t.as_uuid()))
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.permissions))
        .bind(role.is_system)
        .bind(version_to_db(role.version)?)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, role),
        fields(role_id = %role.id, expected_version = expected_version),
        err
    )]
    async fn update_role(&self, role: &Role, expected_version: u64) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, permissions = $4, version = $5, updated_at = $6
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.permissions))
        .bind(version_to_db(role.version)?)
        .bind(role.updated_at)
        .bind(version_to_db(expected_version)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "role {} is no longer at version {}",
                role.id, expected_version
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn delete_role(&self, role_id: RoleId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// Row mapping

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column '{name}': {e}")))
}

fn module_from_row(row: &PgRow) -> StoreResult<Module> {
    Ok(Module {
        id: ModuleId::from_uuid(column(row, "id")?),
        code: column(row, "code")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        parent_id: column::<Option<Uuid>>(row, "parent_id")?.map(ModuleId::from_uuid),
        sort_order: column(row, "sort_order")?,
        icon: column(row, "icon")?,
        is_active: column(row, "is_active")?,
    })
}

fn menu_item_from_row(row: &PgRow) -> StoreResult<MenuItem> {
    let raw_key: String = column(row, "permission_key")?;
    let permission_key = PermissionKey::normalize(&raw_key)
        .map_err(|e| StoreError::Corrupt(format!("menu item permission key '{raw_key}': {e}")))?;

    Ok(MenuItem {
        id: MenuItemId::from_uuid(column(row, "id")?),
        module_id: ModuleId::from_uuid(column(row, "module_id")?),
        code: column(row, "code")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        route: column(row, "route")?,
        permission_key,
        sort_order: column(row, "sort_order")?,
        icon: column(row, "icon")?,
        is_active: column(row, "is_active")?,
    })
}

fn plan_from_row(row: &PgRow) -> StoreResult<SubscriptionPlan> {
    Ok(SubscriptionPlan {
        id: PlanId::from_uuid(column(row, "id")?),
        code: column(row, "code")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        price_monthly: price_from_db(column(row, "price_monthly")?)?,
        price_yearly: price_from_db(column(row, "price_yearly")?)?,
        is_active: column(row, "is_active")?,
        sort_order: column(row, "sort_order")?,
    })
}

fn role_from_row(row: &PgRow) -> StoreResult<Role> {
    let Json(permissions): Json<Vec<String>> = column(row, "permissions")?;
    let version: i64 = column(row, "version")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    let updated_at: DateTime<Utc> = column(row, "updated_at")?;

    Ok(Role {
        id: RoleId::from_uuid(column(row, "id")?),
        tenant_id: column::<Option<Uuid>>(row, "tenant_id")?.map(TenantId::from_uuid),
        name: column(row, "name")?,
        description: column(row, "description")?,
        permissions: permissions.into_iter().collect(),
        is_system: column(row, "is_system_role")?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Corrupt(format!("negative role version {version}")))?,
        created_at,
        updated_at,
    })
}

fn price_to_db(price: Option<u64>) -> StoreResult<Option<i64>> {
    price
        .map(|p| i64::try_from(p).map_err(|_| StoreError::Corrupt(format!("price {p} out of range"))))
        .transpose()
}

fn price_from_db(price: Option<i64>) -> StoreResult<Option<u64>> {
    price
        .map(|p| u64::try_from(p).map_err(|_| StoreError::Corrupt(format!("negative price {p}"))))
        .transpose()
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("role version {version} out of range")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {}", operation)),
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Corrupt(format!("column {} in {}: {}", index, operation, source))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
