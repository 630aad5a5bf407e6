//! In-memory permission store for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tessera_core::{DomainResult, PlanId, RoleId, TenantId, UserId};
use tessera_permissions::seed::{self, SeedData};
use tessera_permissions::{MenuItem, Module, PlanMenuItem, Role, SubscriptionPlan, Tenant, UserTenant};

use crate::read_model::{InMemoryTenantStore, TenantStore};

use super::{PermissionStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Catalog {
    modules: Vec<Module>,
    menu_items: Vec<MenuItem>,
    plans: Vec<SubscriptionPlan>,
    plan_menu_items: Vec<PlanMenuItem>,
}

/// In-memory store.
///
/// Catalog and plan rows sit behind one `RwLock`, roles behind another, and
/// memberships in a tenant-partitioned [`InMemoryTenantStore`]. Role writes
/// check name uniqueness and the version predicate under the write lock.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    catalog: RwLock<Catalog>,
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    memberships: InMemoryTenantStore<UserId, UserTenant>,
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| poisoned())
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| poisoned())
}

impl InMemoryPermissionStore {
    /// Empty store (no catalog, no plans).
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with the production catalog and plans.
    pub fn seeded() -> DomainResult<Self> {
        let store = Self::new();
        store.load_seed(seed::seed_data()?)?;
        Ok(store)
    }

    /// Replace catalog and plan rows with `seed`.
    pub fn load_seed(&self, seed: SeedData) -> StoreResult<()> {
        let mut catalog = write(&self.catalog)?;
        catalog.modules = seed.catalog.modules().to_vec();
        catalog.menu_items = seed.catalog.menu_items().to_vec();
        catalog.plans = seed.plans;
        catalog.plan_menu_items = seed.plan_menu_items;
        Ok(())
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> StoreResult<()> {
        write(&self.tenants)?.insert(tenant.id, tenant);
        Ok(())
    }

    pub fn upsert_membership(&self, membership: UserTenant) -> StoreResult<()> {
        self.memberships
            .upsert(membership.tenant_id, membership.user_id, membership)
    }

    /// Insert a platform-wide role (no tenant, read-only).
    pub fn insert_system_role(&self, mut role: Role) -> StoreResult<()> {
        role.tenant_id = None;
        role.is_system = true;
        let mut roles = write(&self.roles)?;
        ensure_name_free(&roles, &role)?;
        roles.insert(role.id, role);
        Ok(())
    }
}

fn ensure_name_free(roles: &HashMap<RoleId, Role>, role: &Role) -> StoreResult<()> {
    let taken = roles
        .values()
        .any(|r| r.id != role.id && r.tenant_id == role.tenant_id && r.name == role.name);
    if taken {
        Err(StoreError::Conflict(format!("role name '{}' is taken", role.name)))
    } else {
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn list_modules(&self) -> StoreResult<Vec<Module>> {
        Ok(read(&self.catalog)?.modules.clone())
    }

    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        Ok(read(&self.catalog)?.menu_items.clone())
    }

    async fn list_plans(&self) -> StoreResult<Vec<SubscriptionPlan>> {
        Ok(read(&self.catalog)?.plans.clone())
    }

    async fn get_plan(&self, plan_id: PlanId) -> StoreResult<Option<SubscriptionPlan>> {
        Ok(read(&self.catalog)?
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned())
    }

    async fn find_plan_by_code(&self, code: &str) -> StoreResult<Option<SubscriptionPlan>> {
        Ok(read(&self.catalog)?
            .plans
            .iter()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn ensure_plan(&self, plan: SubscriptionPlan) -> StoreResult<SubscriptionPlan> {
        let mut catalog = write(&self.catalog)?;
        if let Some(existing) = catalog.plans.iter().find(|p| p.code == plan.code) {
            return Ok(existing.clone());
        }
        catalog.plans.push(plan.clone());
        Ok(plan)
    }

    async fn plan_menu_items(&self, plan_id: PlanId) -> StoreResult<Vec<PlanMenuItem>> {
        Ok(read(&self.catalog)?
            .plan_menu_items
            .iter()
            .filter(|row| row.plan_id == plan_id)
            .copied()
            .collect())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(read(&self.tenants)?.get(&tenant_id).cloned())
    }

    async fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<UserTenant>> {
        self.memberships.get(tenant_id, &user_id)
    }

    async fn count_members_with_role(&self, tenant_id: TenantId, role_name: &str) -> StoreResult<u64> {
        self.memberships
            .count_where(tenant_id, &|membership: &UserTenant| membership.has_role(role_name))
    }

    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<Role>> {
        let roles = read(&self.roles)?;
        let mut visible: Vec<Role> = roles
            .values()
            .filter(|r| r.visible_to(tenant_id))
            .cloned()
            .collect();
        visible.sort_by(|a, b| (&a.name, a.is_system).cmp(&(&b.name, b.is_system)));
        Ok(visible)
    }

    async fn get_role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
        Ok(read(&self.roles)?.get(&role_id).cloned())
    }

    async fn find_role(&self, tenant_id: Option<TenantId>, name: &str) -> StoreResult<Option<Role>> {
        Ok(read(&self.roles)?
            .values()
            .find(|r| r.tenant_id == tenant_id && r.name == name)
            .cloned())
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        let mut roles = write(&self.roles)?;
        if roles.contains_key(&role.id) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.id)));
        }
        ensure_name_free(&roles, role)?;
        roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role, expected_version: u64) -> StoreResult<()> {
        let mut roles = write(&self.roles)?;
        let current = roles
            .get(&role.id)
            .ok_or_else(|| StoreError::Conflict(format!("role {} no longer exists", role.id)))?;
        if current.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "role {} is at version {}, expected {}",
                role.id, current.version, expected_version
            )));
        }
        ensure_name_free(&roles, role)?;
        roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId) -> StoreResult<bool> {
        Ok(write(&self.roles)?.remove(&role_id).is_some())
    }
}
