//! Permission storage.
//!
//! `PermissionStore` is the persistence seam for catalog, plan, tenant and
//! role rows. It performs no validation beyond what the backend enforces
//! (unique names, version predicates); business rules live in the resolver.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use tessera_core::{PlanId, RoleId, TenantId, UserId};
use tessera_permissions::{MenuItem, Module, PlanMenuItem, Role, SubscriptionPlan, Tenant, UserTenant};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPermissionStore;
pub use postgres::PostgresPermissionStore;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or version predicate rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into the domain.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The backend itself failed (connection, pool, poisoned lock...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PermissionStore: Send + Sync {
    // ── catalog ──────────────────────────────────────────────────────────
    async fn list_modules(&self) -> StoreResult<Vec<Module>>;
    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>>;

    // ── plans ────────────────────────────────────────────────────────────
    async fn list_plans(&self) -> StoreResult<Vec<SubscriptionPlan>>;
    async fn get_plan(&self, plan_id: PlanId) -> StoreResult<Option<SubscriptionPlan>>;
    async fn find_plan_by_code(&self, code: &str) -> StoreResult<Option<SubscriptionPlan>>;
    /// Insert `plan` unless one with the same code exists; returns the stored row.
    async fn ensure_plan(&self, plan: SubscriptionPlan) -> StoreResult<SubscriptionPlan>;
    async fn plan_menu_items(&self, plan_id: PlanId) -> StoreResult<Vec<PlanMenuItem>>;

    // ── tenants & memberships ────────────────────────────────────────────
    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>>;
    async fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<UserTenant>>;
    /// Number of the tenant's memberships listing `role_name`.
    async fn count_members_with_role(&self, tenant_id: TenantId, role_name: &str) -> StoreResult<u64>;

    // ── roles ────────────────────────────────────────────────────────────
    /// The tenant's own roles plus every system role, ordered by name.
    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, role_id: RoleId) -> StoreResult<Option<Role>>;
    /// Exact-name lookup; `tenant_id == None` searches system roles.
    async fn find_role(&self, tenant_id: Option<TenantId>, name: &str) -> StoreResult<Option<Role>>;
    /// Fails with `Conflict` if the name is taken within the role's tenant.
    async fn insert_role(&self, role: &Role) -> StoreResult<()>;
    /// Replace the stored row if it is still at `expected_version`.
    async fn update_role(&self, role: &Role, expected_version: u64) -> StoreResult<()>;
    async fn delete_role(&self, role_id: RoleId) -> StoreResult<bool>;
}

#[async_trait]
impl<S> PermissionStore for Arc<S>
where
    S: PermissionStore + ?Sized,
{
    async fn list_modules(&self) -> StoreResult<Vec<Module>> {
        (**self).list_modules().await
    }

    async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        (**self).list_menu_items().await
    }

    async fn list_plans(&self) -> StoreResult<Vec<SubscriptionPlan>> {
        (**self).list_plans().await
    }

    async fn get_plan(&self, plan_id: PlanId) -> StoreResult<Option<SubscriptionPlan>> {
        (**self).get_plan(plan_id).await
    }

    async fn find_plan_by_code(&self, code: &str) -> StoreResult<Option<SubscriptionPlan>> {
        (**self).find_plan_by_code(code).await
    }

    async fn ensure_plan(&self, plan: SubscriptionPlan) -> StoreResult<SubscriptionPlan> {
        (**self).ensure_plan(plan).await
    }

    async fn plan_menu_items(&self, plan_id: PlanId) -> StoreResult<Vec<PlanMenuItem>> {
        (**self).plan_menu_items(plan_id).await
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        (**self).get_tenant(tenant_id).await
    }

    async fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<UserTenant>> {
        (**self).get_membership(tenant_id, user_id).await
    }

    async fn count_members_with_role(&self, tenant_id: TenantId, role_name: &str) -> StoreResult<u64> {
        (**self).count_members_with_role(tenant_id, role_name).await
    }

    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<Role>> {
        (**self).list_roles(tenant_id).await
    }

    async fn get_role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
        (**self).get_role(role_id).await
    }

    async fn find_role(&self, tenant_id: Option<TenantId>, name: &str) -> StoreResult<Option<Role>> {
        (**self).find_role(tenant_id, name).await
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        (**self).insert_role(role).await
    }

    async fn update_role(&self, role: &Role, expected_version: u64) -> StoreResult<()> {
        (**self).update_role(role, expected_version).await
    }

    async fn delete_role(&self, role_id: RoleId) -> StoreResult<bool> {
        (**self).delete_role(role_id).await
    }
}
