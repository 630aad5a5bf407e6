//! Request-time permission resolution.
//!
//! `PermissionResolver` turns a tenant's subscription plan and a user's role
//! names into the plan-visible catalog and an OR-aggregated capability
//! matrix, and owns the role editing rules (plan entitlement, name
//! uniqueness, protected system roles, in-use deletion guard).
//!
//! It is stateless apart from its store handle: nothing is cached between
//! calls, so every answer reflects the rows as they are now.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use tessera_core::{DomainError, ExpectedVersion, MenuItemId, RoleId, TenantId, UserId};
use tessera_permissions::catalog::{active_modules, catalog_keys, order_menu_items, with_modules};
use tessera_permissions::seed;
use tessera_permissions::{
    build_tokens, decode_token, navigation, parse_tokens, CapabilityFlags, Entitlements, MenuItem,
    MenuItemWithModule, MenuPermissionGrant, Module, NavigationModule, PermissionMatrix, Role,
    RoleDraft, RolePatch, SubscriptionPlan, Tenant,
};

use crate::store::{PermissionStore, StoreError};

/// Resolution/editing failure.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Stale role version or a write that lost a uniqueness race.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PermissionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => PermissionError::Conflict(msg),
            other => PermissionError::Store(other),
        }
    }
}

impl From<DomainError> for PermissionError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => PermissionError::Validation(msg),
            DomainError::NotFound(what) => PermissionError::NotFound(what),
            DomainError::Conflict(msg) => PermissionError::Conflict(msg),
        }
    }
}

pub type PermissionResult<T> = Result<T, PermissionError>;

/// What a tenant's plan makes visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableMenus {
    /// Active modules owning at least one available item.
    pub modules: Vec<Module>,
    pub menu_items: Vec<MenuItemWithModule>,
    pub current_plan: String,
    pub plan_name: String,
}

/// A principal's grants, as embedded in an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grants {
    pub roles: Vec<String>,
    /// Raw stored tokens plus the canonical expansion of their matrix.
    pub permissions: BTreeSet<String>,
}

/// One catalog row of a role's display permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleMenuPermission {
    pub menu_item_id: MenuItemId,
    pub menu_item_code: String,
    pub permission_key: String,
    #[serde(flatten)]
    pub flags: CapabilityFlags,
}

/// A role as shown to tenant administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleView {
    pub id: RoleId,
    pub tenant_id: Option<TenantId>,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub version: u64,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub permissions: Vec<RoleMenuPermission>,
}

/// Plan-scoped permission resolution over a [`PermissionStore`].
pub struct PermissionResolver<S> {
    store: S,
}

impl<S> PermissionResolver<S>
where
    S: PermissionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog & plans
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_modules(&self) -> PermissionResult<Vec<Module>> {
        Ok(active_modules(&self.store.list_modules().await?))
    }

    /// Every active menu item with its module, in display order.
    pub async fn list_menu_items(&self) -> PermissionResult<Vec<MenuItemWithModule>> {
        let modules = self.store.list_modules().await?;
        let items = self.store.list_menu_items().await?;
        let ordered = order_menu_items(&modules, items);
        Ok(with_modules(&modules, ordered))
    }

    pub async fn list_subscription_plans(&self) -> PermissionResult<Vec<SubscriptionPlan>> {
        let mut plans: Vec<SubscriptionPlan> = self
            .store
            .list_plans()
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .collect();
        plans.sort_by(|a, b| (a.sort_order, &a.code).cmp(&(b.sort_order, &b.code)));
        Ok(plans)
    }

    /// Effective plan of `tenant`: explicit plan id, else legacy plan code,
    /// else the `basic` plan (created if missing). Never fails on a dangling
    /// reference; the fallback is logged instead.
    pub async fn resolve_plan(&self, tenant: &Tenant) -> PermissionResult<SubscriptionPlan> {
        if let Some(plan_id) = tenant.subscription_plan_id {
            if let Some(plan) = self.store.get_plan(plan_id).await? {
                return Ok(plan);
            }
            warn!(
                tenant_id = %tenant.id,
                plan_id = %plan_id,
                "tenant references a missing subscription plan, trying its plan code"
            );
        }

        if let Some(plan) = self.store.find_plan_by_code(&tenant.plan).await? {
            return Ok(plan);
        }

        warn!(
            tenant_id = %tenant.id,
            plan_code = %tenant.plan,
            "tenant plan could not be resolved, falling back to the default plan"
        );
        Ok(self.store.ensure_plan(SubscriptionPlan::fallback_basic()).await?)
    }

    /// Active items included in `plan`, ordered by module then item sort order.
    pub async fn menu_items_for_plan(&self, plan: &SubscriptionPlan) -> PermissionResult<Vec<MenuItem>> {
        let modules = self.store.list_modules().await?;
        self.plan_items(plan, &modules).await
    }

    async fn plan_items(&self, plan: &SubscriptionPlan, modules: &[Module]) -> PermissionResult<Vec<MenuItem>> {
        let rows = self.store.plan_menu_items(plan.id).await?;
        let entitlements = Entitlements::from_rows(&rows);
        let items: Vec<MenuItem> = self
            .store
            .list_menu_items()
            .await?
            .into_iter()
            .filter(|i| entitlements.includes(i.id))
            .collect();
        Ok(order_menu_items(modules, items))
    }

    pub async fn get_available_menu_items(&self, tenant_id: TenantId) -> PermissionResult<AvailableMenus> {
        let tenant = self.tenant(tenant_id).await?;
        let plan = self.resolve_plan(&tenant).await?;
        let modules = self.store.list_modules().await?;
        let items = self.plan_items(&plan, &modules).await?;

        let owners: BTreeSet<_> = items.iter().map(|i| i.module_id).collect();
        let visible_modules: Vec<Module> = active_modules(&modules)
            .into_iter()
            .filter(|m| owners.contains(&m.id))
            .collect();

        Ok(AvailableMenus {
            menu_items: with_modules(&modules, items),
            modules: visible_modules,
            current_plan: plan.code,
            plan_name: plan.name,
        })
    }

    /// Navigation tree of the tenant's plan, filtered to `allowed_keys`.
    pub async fn build_navigation(
        &self,
        tenant_id: TenantId,
        allowed_keys: &BTreeSet<String>,
    ) -> PermissionResult<Vec<NavigationModule>> {
        let tenant = self.tenant(tenant_id).await?;
        let plan = self.resolve_plan(&tenant).await?;
        let modules = self.store.list_modules().await?;
        let items = self.plan_items(&plan, &modules).await?;
        Ok(navigation::build_navigation(&modules, &items, allowed_keys))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Effective permissions
    // ─────────────────────────────────────────────────────────────────────

    /// `role`'s matrix restricted to keys of existing menu items.
    pub async fn get_role_permissions(&self, role: &Role) -> PermissionResult<PermissionMatrix> {
        let keys = catalog_keys(&self.store.list_menu_items().await?);
        Ok(role.matrix().restricted_to(|k| keys.contains(k)))
    }

    /// OR of the matrices of every role named in the user's membership.
    ///
    /// A role name resolves to the tenant's own role first, then to a system
    /// role of the same name; unknown names contribute nothing.
    pub async fn get_effective_permissions(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> PermissionResult<PermissionMatrix> {
        let roles = self.member_roles(user_id, tenant_id).await?;
        Ok(roles
            .iter()
            .fold(PermissionMatrix::new(), |acc, role| acc.merged(&role.matrix())))
    }

    /// Role names and permission set to embed in an access token.
    pub async fn resolve_grants(&self, user_id: UserId, tenant_id: TenantId) -> PermissionResult<Grants> {
        let Some(membership) = self.store.get_membership(tenant_id, user_id).await? else {
            return Ok(Grants::default());
        };

        let roles = self.lookup_roles(tenant_id, &membership.roles).await?;
        let raw: BTreeSet<String> = roles.iter().flat_map(|r| r.permissions.iter().cloned()).collect();
        let mut permissions = parse_tokens(&raw).token_set();
        permissions.extend(raw);

        Ok(Grants {
            roles: membership.roles,
            permissions,
        })
    }

    /// Live matrix for the user, or `fallback` tokens with view only when the
    /// live matrix comes back empty.
    pub async fn live_user_permissions<I, T>(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        fallback: I,
    ) -> PermissionResult<PermissionMatrix>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let live = self.get_effective_permissions(user_id, tenant_id).await?;
        if !live.is_empty() {
            return Ok(live);
        }
        debug!(tenant_id = %tenant_id, user_id = %user_id, "no live permissions, using token grants");
        Ok(parse_tokens(fallback).view_only())
    }

    async fn member_roles(&self, user_id: UserId, tenant_id: TenantId) -> PermissionResult<Vec<Role>> {
        match self.store.get_membership(tenant_id, user_id).await? {
            Some(membership) => self.lookup_roles(tenant_id, &membership.roles).await,
            None => Ok(Vec::new()),
        }
    }

    async fn lookup_roles(&self, tenant_id: TenantId, names: &[String]) -> PermissionResult<Vec<Role>> {
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            if let Some(role) = self.store.find_role(Some(tenant_id), name).await? {
                roles.push(role);
            } else if let Some(role) = self.store.find_role(None, name).await? {
                if role.is_system {
                    roles.push(role);
                }
            } else {
                debug!(tenant_id = %tenant_id, role = %name, "membership names an unknown role");
            }
        }
        Ok(roles)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    /// The tenant's roles plus system roles, by name.
    pub async fn list_roles(&self, tenant_id: TenantId) -> PermissionResult<Vec<RoleView>> {
        let items = self.store.list_menu_items().await?;
        let modules = self.store.list_modules().await?;
        let ordered = order_menu_items(&modules, items);
        let roles = self.store.list_roles(tenant_id).await?;
        Ok(roles.into_iter().map(|r| role_view(r, &ordered)).collect())
    }

    pub async fn get_role(&self, tenant_id: TenantId, role_id: RoleId) -> PermissionResult<RoleView> {
        let role = self.visible_role(tenant_id, role_id).await?;
        self.view(role).await
    }

    pub async fn create_role(&self, tenant_id: TenantId, draft: RoleDraft) -> PermissionResult<RoleView> {
        let tenant = self.tenant(tenant_id).await?;
        let name = checked_role_name(&draft.name)?;

        if self.store.find_role(Some(tenant_id), &name).await?.is_some() {
            return Err(PermissionError::Validation(format!("role '{name}' already exists")));
        }

        let plan = self.resolve_plan(&tenant).await?;
        let items = self.store.list_menu_items().await?;
        let tokens = self.encode_grid(&plan, &items, &draft.permissions).await?;

        let role = Role::for_tenant(tenant_id, name, draft.description, tokens, Utc::now());
        self.store.insert_role(&role).await?;

        info!(tenant_id = %tenant_id, role_id = %role.id, role = %role.name, "role created");
        self.view(role).await
    }

    /// Apply `patch` to a tenant role.
    ///
    /// Stored tokens whose key matches no catalog menu item are kept when the
    /// grid is replaced, so legacy and non-menu grants survive editing.
    ///
    /// `expected` is checked against the version read here; the write itself
    /// is always conditional on that read, so a concurrent update that lands
    /// first turns this one into a `Conflict` even under `Any`.
    pub async fn update_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        patch: RolePatch,
        expected: ExpectedVersion,
    ) -> PermissionResult<RoleView> {
        let mut role = self.visible_role(tenant_id, role_id).await?;
        role.ensure_mutable()?;
        expected.check(role.version)?;

        if let Some(raw) = patch.name.as_deref() {
            let name = checked_role_name(raw)?;
            if name != role.name {
                if let Some(other) = self.store.find_role(Some(tenant_id), &name).await? {
                    if other.id != role.id {
                        return Err(PermissionError::Validation(format!("role '{name}' already exists")));
                    }
                }
                role.name = name;
            }
        }

        if let Some(description) = patch.description {
            role.description = Some(description);
        }

        if let Some(grid) = patch.permissions {
            let tenant = self.tenant(tenant_id).await?;
            let plan = self.resolve_plan(&tenant).await?;
            let items = self.store.list_menu_items().await?;
            let keys = catalog_keys(&items);

            let mut tokens: BTreeSet<String> = role
                .permissions
                .iter()
                .filter(|t| !decode_token(t).is_some_and(|(key, _)| keys.contains(&key)))
                .cloned()
                .collect();
            tokens.extend(self.encode_grid(&plan, &items, &grid).await?);
            role.permissions = tokens;
        }

        let previous = role.version;
        role.version = previous + 1;
        role.updated_at = Utc::now();
        self.store.update_role(&role, previous).await?;

        info!(tenant_id = %tenant_id, role_id = %role.id, version = role.version, "role updated");
        self.view(role).await
    }

    /// Delete a tenant role no membership references.
    pub async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> PermissionResult<()> {
        let role = self.visible_role(tenant_id, role_id).await?;
        role.ensure_mutable()?;

        let assigned = self.store.count_members_with_role(tenant_id, &role.name).await?;
        if assigned > 0 {
            return Err(PermissionError::Validation(format!(
                "role '{}' is assigned to {} user(s)",
                role.name, assigned
            )));
        }

        if !self.store.delete_role(role.id).await? {
            return Err(PermissionError::NotFound(format!("role {role_id}")));
        }
        info!(tenant_id = %tenant_id, role_id = %role_id, "role deleted");
        Ok(())
    }

    /// Create or refresh the owner/admin roles of `tenant_id`. Idempotent.
    pub async fn provision_default_roles(&self, tenant_id: TenantId) -> PermissionResult<Vec<Role>> {
        let mut provisioned = Vec::new();
        for fresh in seed::default_roles(tenant_id, Utc::now()) {
            match self.store.find_role(Some(tenant_id), &fresh.name).await? {
                Some(existing) if existing.permissions == fresh.permissions => provisioned.push(existing),
                Some(mut existing) => {
                    let previous = existing.version;
                    existing.permissions = fresh.permissions;
                    existing.description = fresh.description;
                    existing.version = previous + 1;
                    existing.updated_at = fresh.updated_at;
                    self.store.update_role(&existing, previous).await?;
                    provisioned.push(existing);
                }
                None => {
                    self.store.insert_role(&fresh).await?;
                    provisioned.push(fresh);
                }
            }
        }
        info!(tenant_id = %tenant_id, roles = provisioned.len(), "default roles provisioned");
        Ok(provisioned)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    async fn tenant(&self, tenant_id: TenantId) -> PermissionResult<Tenant> {
        self.store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| PermissionError::NotFound(format!("tenant {tenant_id}")))
    }

    async fn visible_role(&self, tenant_id: TenantId, role_id: RoleId) -> PermissionResult<Role> {
        self.store
            .get_role(role_id)
            .await?
            .filter(|r| r.visible_to(tenant_id))
            .ok_or_else(|| PermissionError::NotFound(format!("role {role_id}")))
    }

    async fn view(&self, role: Role) -> PermissionResult<RoleView> {
        let modules = self.store.list_modules().await?;
        let items = order_menu_items(&modules, self.store.list_menu_items().await?);
        Ok(role_view(role, &items))
    }

    /// Encode a capability grid into tokens.
    ///
    /// Every row must name a menu item the plan makes available (active item,
    /// active module, included in the plan), whatever its flags. Rows with no
    /// flag set then contribute nothing.
    async fn encode_grid(
        &self,
        plan: &SubscriptionPlan,
        items: &[MenuItem],
        grid: &[MenuPermissionGrant],
    ) -> PermissionResult<BTreeSet<String>> {
        let by_id: HashMap<MenuItemId, &MenuItem> = items.iter().map(|i| (i.id, i)).collect();
        let modules = self.store.list_modules().await?;
        let available: HashSet<MenuItemId> = self
            .plan_items(plan, &modules)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        let mut tokens = BTreeSet::new();
        for grant in grid {
            let item = by_id
                .get(&grant.menu_item_id)
                .ok_or_else(|| PermissionError::NotFound(format!("menu item {}", grant.menu_item_id)))?;
            if !available.contains(&item.id) {
                return Err(PermissionError::Validation(format!(
                    "menu item '{}' is not available on the '{}' plan",
                    item.code, plan.code
                )));
            }
            if grant.flags.any() {
                tokens.extend(build_tokens(&item.permission_key, grant.flags));
            }
        }
        Ok(tokens)
    }
}

fn checked_role_name(raw: &str) -> PermissionResult<String> {
    Ok(tessera_permissions::validate_role_name(raw)?)
}

fn role_view(role: Role, ordered_items: &[MenuItem]) -> RoleView {
    let matrix = role.matrix();
    let permissions = ordered_items
        .iter()
        .filter_map(|item| {
            let flags = matrix.get(item.permission_key.as_str())?;
            Some(RoleMenuPermission {
                menu_item_id: item.id,
                menu_item_code: item.code.clone(),
                permission_key: item.permission_key.to_string(),
                flags,
            })
        })
        .collect();

    RoleView {
        id: role.id,
        tenant_id: role.tenant_id,
        name: role.name,
        description: role.description,
        is_system: role.is_system,
        version: role.version,
        created_at: role.created_at,
        updated_at: role.updated_at,
        permissions,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessera_core::PlanId;
    use tessera_permissions::{Action, PlanMenuItem, UserTenant};

    use crate::store::{InMemoryPermissionStore, StoreResult};

    use super::*;

    struct Fixture {
        resolver: PermissionResolver<Arc<InMemoryPermissionStore>>,
        store: Arc<InMemoryPermissionStore>,
        tenant_id: TenantId,
    }

    async fn fixture(plan_code: &str) -> Fixture {
        let store = Arc::new(InMemoryPermissionStore::seeded().unwrap());
        let plan = store.find_plan_by_code(plan_code).await.unwrap().unwrap();
        let tenant = Tenant::new("Acme").with_plan(plan.id);
        let tenant_id = tenant.id;
        store.insert_tenant(tenant).unwrap();

        let resolver = PermissionResolver::new(Arc::clone(&store));
        resolver.provision_default_roles(tenant_id).await.unwrap();
        Fixture {
            resolver,
            store,
            tenant_id,
        }
    }

    impl Fixture {
        fn member(&self, roles: &[&str]) -> UserId {
            let user_id = UserId::new();
            self.store
                .upsert_membership(UserTenant::new(user_id, self.tenant_id, roles.iter().copied()))
                .unwrap();
            user_id
        }

        async fn item(&self, code: &str) -> MenuItem {
            self.store
                .list_menu_items()
                .await
                .unwrap()
                .into_iter()
                .find(|i| i.code == code)
                .unwrap()
        }
    }

    fn grant(menu_item_id: MenuItemId, flags: CapabilityFlags) -> MenuPermissionGrant {
        MenuPermissionGrant { menu_item_id, flags }
    }

    #[tokio::test]
    async fn basic_plan_owner_sees_nineteen_items() {
        let fx = fixture("basic").await;
        let owner = fx.member(&["owner"]);

        let menus = fx.resolver.get_available_menu_items(fx.tenant_id).await.unwrap();
        assert_eq!(menus.current_plan, "basic");
        assert_eq!(menus.plan_name, "Basic Plan");
        assert_eq!(menus.menu_items.len(), 19);
        assert!(menus.modules.iter().all(|m| m.is_active));
        assert!(menus
            .modules
            .iter()
            .all(|m| menus.menu_items.iter().any(|i| i.module.id == m.id)));

        let matrix = fx.resolver.get_effective_permissions(owner, fx.tenant_id).await.unwrap();
        let products = matrix.get("products.view").unwrap();
        assert!(products.can_view && products.can_create && products.can_edit && products.can_delete);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let fx = fixture("basic").await;
        let err = fx.resolver.get_available_menu_items(TenantId::new()).await.unwrap_err();
        assert!(matches!(err, PermissionError::NotFound(_)));
    }

    #[tokio::test]
    async fn dangling_plan_falls_back_to_basic() {
        let fx = fixture("basic").await;
        let tenant = Tenant::new("Legacy")
            .with_plan(tessera_core::PlanId::new())
            .with_legacy_plan("platinum");
        let tenant_id = tenant.id;
        fx.store.insert_tenant(tenant).unwrap();

        let menus = fx.resolver.get_available_menu_items(tenant_id).await.unwrap();
        assert_eq!(menus.current_plan, "basic");
        assert_eq!(menus.menu_items.len(), 19);
    }

    #[tokio::test]
    async fn missing_basic_plan_is_created_on_demand() {
        let store = Arc::new(InMemoryPermissionStore::new());
        let tenant = Tenant::new("Empty");
        let tenant_id = tenant.id;
        store.insert_tenant(tenant).unwrap();

        let resolver = PermissionResolver::new(Arc::clone(&store));
        let menus = resolver.get_available_menu_items(tenant_id).await.unwrap();
        assert_eq!(menus.current_plan, "basic");
        assert!(menus.menu_items.is_empty());
        assert!(store.find_plan_by_code("basic").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn legacy_plan_code_is_honored() {
        let fx = fixture("basic").await;
        let tenant = Tenant::new("Pro").with_legacy_plan("professional");
        let tenant_id = tenant.id;
        fx.store.insert_tenant(tenant).unwrap();

        let menus = fx.resolver.get_available_menu_items(tenant_id).await.unwrap();
        assert_eq!(menus.current_plan, "professional");
        assert_eq!(menus.menu_items.len(), 44);
    }

    #[tokio::test]
    async fn multiple_roles_are_or_aggregated() {
        let fx = fixture("basic").await;
        let products = fx.item("master_products").await;
        let contacts = fx.item("master_contacts").await;

        fx.resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "clerk".into(),
                    description: None,
                    permissions: vec![grant(products.id, CapabilityFlags::only(Action::Create))],
                },
            )
            .await
            .unwrap();
        fx.resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "auditor".into(),
                    description: None,
                    permissions: vec![
                        grant(products.id, CapabilityFlags::only(Action::Export)),
                        grant(contacts.id, CapabilityFlags::VIEW_ONLY),
                    ],
                },
            )
            .await
            .unwrap();

        let user = fx.member(&["clerk", "auditor", "ghost"]);
        let matrix = fx.resolver.get_effective_permissions(user, fx.tenant_id).await.unwrap();

        let p = matrix.get("products.view").unwrap();
        assert!(p.can_view && p.can_create && p.can_export);
        assert!(!p.can_edit && !p.can_delete);
        assert_eq!(matrix.get("contacts.view"), Some(CapabilityFlags::VIEW_ONLY));
        assert_eq!(matrix.len(), 2);
    }

    #[tokio::test]
    async fn no_membership_means_no_permissions() {
        let fx = fixture("basic").await;
        let matrix = fx
            .resolver
            .get_effective_permissions(UserId::new(), fx.tenant_id)
            .await
            .unwrap();
        assert!(matrix.is_empty());
    }

    #[tokio::test]
    async fn system_roles_back_unknown_tenant_role_names() {
        let fx = fixture("basic").await;
        let tokens: BTreeSet<String> = ["contacts.export".to_string()].into();
        fx.store
            .insert_system_role(Role::for_tenant(fx.tenant_id, "reporter", None, tokens, Utc::now()))
            .unwrap();

        let user = fx.member(&["reporter"]);
        let matrix = fx.resolver.get_effective_permissions(user, fx.tenant_id).await.unwrap();
        assert!(matrix.get("contacts.view").unwrap().can_export);
    }

    #[tokio::test]
    async fn create_rejects_items_outside_the_plan() {
        let fx = fixture("basic").await;
        let ledger = fx.item("finance_report_general_ledger").await;

        let err = fx
            .resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "accountant".into(),
                    description: None,
                    permissions: vec![grant(ledger.id, CapabilityFlags::VIEW_ONLY)],
                },
            )
            .await
            .unwrap_err();
        match err {
            PermissionError::Validation(msg) => assert!(msg.contains("basic"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_unknown_items_and_duplicate_names() {
        let fx = fixture("basic").await;

        let err = fx
            .resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "clerk".into(),
                    description: None,
                    permissions: vec![grant(MenuItemId::new(), CapabilityFlags::VIEW_ONLY)],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::NotFound(_)));

        let err = fx
            .resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: " owner ".into(),
                    description: None,
                    permissions: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));
    }

    #[tokio::test]
    async fn update_keeps_tokens_the_grid_cannot_express() {
        let fx = fixture("basic").await;
        let products = fx.item("master_products").await;
        let contacts = fx.item("master_contacts").await;

        let owner = fx.store.find_role(Some(fx.tenant_id), "owner").await.unwrap().unwrap();
        let view = fx
            .resolver
            .update_role(
                fx.tenant_id,
                owner.id,
                RolePatch {
                    permissions: Some(vec![grant(contacts.id, CapabilityFlags::VIEW_ONLY)]),
                    ..RolePatch::default()
                },
                ExpectedVersion::Exact(owner.version),
            )
            .await
            .unwrap();
        assert_eq!(view.version, owner.version + 1);

        let stored = fx.store.get_role(owner.id).await.unwrap().unwrap();
        assert!(stored.permissions.contains("tenant.manage_settings"));
        assert!(stored.permissions.contains("roles.create_role"));
        assert!(stored.permissions.contains("contacts.view"));
        assert!(!stored.permissions.contains("contacts.create"));
        assert!(!stored.permissions.iter().any(|t| t.starts_with("products.")));

        let display = fx.resolver.get_role_permissions(&stored).await.unwrap();
        assert!(display.get(products.permission_key.as_str()).is_none());
        assert!(display.get("tenant.manage_settings.view").is_none());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let fx = fixture("basic").await;
        let admin = fx.store.find_role(Some(fx.tenant_id), "admin").await.unwrap().unwrap();

        let patch = RolePatch {
            description: Some("edited".into()),
            ..RolePatch::default()
        };
        fx.resolver
            .update_role(fx.tenant_id, admin.id, patch.clone(), ExpectedVersion::Exact(admin.version))
            .await
            .unwrap();

        let err = fx
            .resolver
            .update_role(fx.tenant_id, admin.id, patch.clone(), ExpectedVersion::Exact(admin.version))
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Conflict(_)));

        fx.resolver
            .update_role(fx.tenant_id, admin.id, patch, ExpectedVersion::Any)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rename_into_an_existing_name_is_rejected() {
        let fx = fixture("basic").await;
        let admin = fx.store.find_role(Some(fx.tenant_id), "admin").await.unwrap().unwrap();

        let err = fx
            .resolver
            .update_role(
                fx.tenant_id,
                admin.id,
                RolePatch {
                    name: Some("owner".into()),
                    ..RolePatch::default()
                },
                ExpectedVersion::Any,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));
    }

    #[tokio::test]
    async fn system_roles_are_read_only() {
        let fx = fixture("basic").await;
        let role = Role::for_tenant(fx.tenant_id, "platform", None, BTreeSet::new(), Utc::now());
        let role_id = role.id;
        fx.store.insert_system_role(role).unwrap();

        let err = fx.resolver.delete_role(fx.tenant_id, role_id).await.unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));

        let err = fx
            .resolver
            .update_role(fx.tenant_id, role_id, RolePatch::default(), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_is_blocked_while_assigned() {
        let fx = fixture("basic").await;
        fx.member(&["owner"]);
        fx.member(&["owner", "admin"]);
        let owner = fx.store.find_role(Some(fx.tenant_id), "owner").await.unwrap().unwrap();

        let err = fx.resolver.delete_role(fx.tenant_id, owner.id).await.unwrap_err();
        match err {
            PermissionError::Validation(msg) => assert!(msg.contains('2'), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let spare = fx
            .resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "spare".into(),
                    description: None,
                    permissions: vec![],
                },
            )
            .await
            .unwrap();
        fx.resolver.delete_role(fx.tenant_id, spare.id).await.unwrap();
        let err = fx.resolver.get_role(fx.tenant_id, spare.id).await.unwrap_err();
        assert!(matches!(err, PermissionError::NotFound(_)));
    }

    #[tokio::test]
    async fn roles_of_other_tenants_are_invisible() {
        let fx = fixture("basic").await;
        let owner = fx.store.find_role(Some(fx.tenant_id), "owner").await.unwrap().unwrap();

        let err = fx.resolver.get_role(TenantId::new(), owner.id).await.unwrap_err();
        assert!(matches!(err, PermissionError::NotFound(_)));
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let fx = fixture("basic").await;
        let again = fx.resolver.provision_default_roles(fx.tenant_id).await.unwrap();
        assert_eq!(again.len(), 2);

        let roles = fx.resolver.list_roles(fx.tenant_id).await.unwrap();
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "owner"]);
        assert!(roles.iter().all(|r| r.version == 0));
    }

    #[tokio::test]
    async fn grants_carry_raw_and_canonical_tokens() {
        let fx = fixture("basic").await;
        let owner = fx.member(&["owner"]);

        let grants = fx.resolver.resolve_grants(owner, fx.tenant_id).await.unwrap();
        assert_eq!(grants.roles, vec!["owner".to_string()]);
        assert!(grants.permissions.contains("roles.create_role"));
        assert!(grants.permissions.contains("roles.update"));
        assert!(grants.permissions.contains("roles.edit"));
        assert!(grants.permissions.contains("sales.create_order.view"));
    }

    #[tokio::test]
    async fn navigation_is_plan_scoped_and_filtered() {
        let fx = fixture("basic").await;
        let allowed: BTreeSet<String> = ["products.view", "finance.reports.general_ledger.view"]
            .into_iter()
            .map(String::from)
            .collect();

        let nav = fx.resolver.build_navigation(fx.tenant_id, &allowed).await.unwrap();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].code, "master_data");
        assert_eq!(nav[0].items.len(), 1);
        assert_eq!(nav[0].items[0].permission_key, "products.view");
    }

    #[tokio::test]
    async fn live_permissions_fall_back_to_view_only_grants() {
        let fx = fixture("basic").await;
        let stranger = UserId::new();

        let matrix = fx
            .resolver
            .live_user_permissions(stranger, fx.tenant_id, ["contacts.delete"])
            .await
            .unwrap();
        assert_eq!(matrix.get("contacts.view"), Some(CapabilityFlags::VIEW_ONLY));
    }

    #[tokio::test]
    async fn plan_items_follow_module_then_item_order() {
        let fx = fixture("enterprise").await;
        let plan = fx.store.find_plan_by_code("enterprise").await.unwrap().unwrap();
        let modules = fx.store.list_modules().await.unwrap();

        let items = fx.resolver.menu_items_for_plan(&plan).await.unwrap();
        assert_eq!(items.len(), 50);

        let module_sort: HashMap<_, _> = modules.iter().map(|m| (m.id, m.sort_order)).collect();
        let positions: Vec<_> = items.iter().map(|i| (module_sort[&i.module_id], i.sort_order)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[tokio::test]
    async fn catalog_queries_return_active_rows_in_order() {
        let fx = fixture("basic").await;
        assert_eq!(fx.resolver.list_modules().await.unwrap().len(), 7);
        assert_eq!(fx.resolver.list_menu_items().await.unwrap().len(), 50);

        let codes: Vec<_> = fx
            .resolver
            .list_subscription_plans()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec!["basic", "professional", "enterprise"]);
    }

    #[tokio::test]
    async fn unflagged_rows_outside_the_plan_are_rejected() {
        let fx = fixture("basic").await;
        let ledger = fx.item("finance_report_general_ledger").await;

        let err = fx
            .resolver
            .create_role(
                fx.tenant_id,
                RoleDraft {
                    name: "accountant".into(),
                    description: None,
                    permissions: vec![grant(ledger.id, CapabilityFlags::NONE)],
                },
            )
            .await
            .unwrap_err();
        match err {
            PermissionError::Validation(msg) => assert!(msg.contains("basic"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let admin = fx.store.find_role(Some(fx.tenant_id), "admin").await.unwrap().unwrap();
        let err = fx
            .resolver
            .update_role(
                fx.tenant_id,
                admin.id,
                RolePatch {
                    permissions: Some(vec![grant(ledger.id, CapabilityFlags::NONE)]),
                    ..RolePatch::default()
                },
                ExpectedVersion::Any,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));
    }

    #[tokio::test]
    async fn inactive_items_cannot_be_granted() {
        let mut seed = seed::seed_data().unwrap();
        let items: Vec<MenuItem> = seed
            .catalog
            .menu_items()
            .iter()
            .cloned()
            .map(|mut i| {
                if i.code == "master_units" {
                    i.is_active = false;
                }
                i
            })
            .collect();
        seed.catalog = tessera_permissions::Catalog::new(seed.catalog.modules().to_vec(), items).unwrap();

        let store = Arc::new(InMemoryPermissionStore::new());
        store.load_seed(seed).unwrap();
        let tenant = Tenant::new("Acme");
        let tenant_id = tenant.id;
        store.insert_tenant(tenant).unwrap();
        let resolver = PermissionResolver::new(Arc::clone(&store));

        let units = store
            .list_menu_items()
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.code == "master_units")
            .unwrap();
        let err = resolver
            .create_role(
                tenant_id,
                RoleDraft {
                    name: "stocker".into(),
                    description: None,
                    permissions: vec![grant(units.id, CapabilityFlags::VIEW_ONLY)],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Validation(_)));

        let menus = resolver.get_available_menu_items(tenant_id).await.unwrap();
        assert_eq!(menus.menu_items.len(), 18);
    }

    #[tokio::test]
    async fn literal_tokens_decode_to_an_exact_matrix() {
        let fx = fixture("basic").await;
        let tokens: BTreeSet<String> = ["products.view", "products.create", "contacts.view"]
            .into_iter()
            .map(String::from)
            .collect();
        fx.store
            .insert_role(&Role::for_tenant(fx.tenant_id, "clerk", None, tokens, Utc::now()))
            .await
            .unwrap();
        let user = fx.member(&["clerk"]);

        let matrix = fx.resolver.get_effective_permissions(user, fx.tenant_id).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(
            matrix.get("products.view"),
            Some(CapabilityFlags {
                can_view: true,
                can_create: true,
                ..CapabilityFlags::NONE
            })
        );
        assert_eq!(matrix.get("contacts.view"), Some(CapabilityFlags::VIEW_ONLY));
    }

    /// Lets another writer update a role right after the resolver reads it.
    struct RacingStore {
        inner: Arc<InMemoryPermissionStore>,
        armed: std::sync::Mutex<bool>,
    }

    impl RacingStore {
        async fn rival_write(&self, role: &Role) {
            let mut rival = role.clone();
            rival.description = Some("rival".into());
            rival.version = role.version + 1;
            self.inner.update_role(&rival, role.version).await.unwrap();
        }
    }

    #[async_trait::async_trait]
    impl PermissionStore for RacingStore {
        async fn list_modules(&self) -> StoreResult<Vec<Module>> {
            self.inner.list_modules().await
        }
        async fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
            self.inner.list_menu_items().await
        }
        async fn list_plans(&self) -> StoreResult<Vec<SubscriptionPlan>> {
            self.inner.list_plans().await
        }
        async fn get_plan(&self, plan_id: PlanId) -> StoreResult<Option<SubscriptionPlan>> {
            self.inner.get_plan(plan_id).await
        }
        async fn find_plan_by_code(&self, code: &str) -> StoreResult<Option<SubscriptionPlan>> {
            self.inner.find_plan_by_code(code).await
        }
        async fn ensure_plan(&self, plan: SubscriptionPlan) -> StoreResult<SubscriptionPlan> {
            self.inner.ensure_plan(plan).await
        }
        async fn plan_menu_items(&self, plan_id: PlanId) -> StoreResult<Vec<PlanMenuItem>> {
            self.inner.plan_menu_items(plan_id).await
        }
        async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
            self.inner.get_tenant(tenant_id).await
        }
        async fn get_membership(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<UserTenant>> {
            self.inner.get_membership(tenant_id, user_id).await
        }
        async fn count_members_with_role(&self, tenant_id: TenantId, role_name: &str) -> StoreResult<u64> {
            self.inner.count_members_with_role(tenant_id, role_name).await
        }
        async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<Role>> {
            self.inner.list_roles(tenant_id).await
        }
        async fn get_role(&self, role_id: RoleId) -> StoreResult<Option<Role>> {
            let role = self.inner.get_role(role_id).await?;
            let fire = std::mem::take(&mut *self.armed.lock().unwrap());
            if let (true, Some(role)) = (fire, role.as_ref()) {
                self.rival_write(role).await;
            }
            Ok(role)
        }
        async fn find_role(&self, tenant_id: Option<TenantId>, name: &str) -> StoreResult<Option<Role>> {
            self.inner.find_role(tenant_id, name).await
        }
        async fn insert_role(&self, role: &Role) -> StoreResult<()> {
            self.inner.insert_role(role).await
        }
        async fn update_role(&self, role: &Role, expected_version: u64) -> StoreResult<()> {
            self.inner.update_role(role, expected_version).await
        }
        async fn delete_role(&self, role_id: RoleId) -> StoreResult<bool> {
            self.inner.delete_role(role_id).await
        }
    }

    #[tokio::test]
    async fn unversioned_update_losing_a_race_is_a_conflict() {
        let fx = fixture("basic").await;
        let admin = fx.store.find_role(Some(fx.tenant_id), "admin").await.unwrap().unwrap();
        let racing = RacingStore {
            inner: Arc::clone(&fx.store),
            armed: std::sync::Mutex::new(true),
        };
        let resolver = PermissionResolver::new(racing);

        let patch = RolePatch {
            description: Some("mine".into()),
            ..RolePatch::default()
        };
        let err = resolver
            .update_role(fx.tenant_id, admin.id, patch.clone(), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Conflict(_)));

        let stored = fx.store.get_role(admin.id).await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("rival"));
        assert_eq!(stored.version, admin.version + 1);

        // With no rival in flight the same unversioned update goes through.
        let view = resolver
            .update_role(fx.tenant_id, admin.id, patch, ExpectedVersion::Any)
            .await
            .unwrap();
        assert_eq!(view.description.as_deref(), Some("mine"));
        assert_eq!(view.version, admin.version + 2);
    }

    #[test]
    fn store_conflicts_surface_as_conflicts() {
        let err: PermissionError = StoreError::Conflict("taken".into()).into();
        assert!(matches!(err, PermissionError::Conflict(_)));

        let err: PermissionError = StoreError::Backend("down".into()).into();
        assert!(matches!(err, PermissionError::Store(_)));
    }
}
