//! `tessera-permissions` — plan-gated RBAC domain model.
//!
//! Pure domain logic, no IO:
//! - the menu catalog (modules → menu items, each with a canonical `.view` key)
//! - subscription plans and their menu-item entitlements
//! - the permission token codec (flat token list ⇄ capability matrix)
//! - roles, tenants and memberships
//! - the navigation tree builder
//! - the production seed data
//!
//! Storage and request-time resolution live in `tessera-infra`.

pub mod catalog;
pub mod codec;
pub mod flags;
pub mod navigation;
pub mod plan;
pub mod role;
pub mod seed;
pub mod tenant;

pub use catalog::{Catalog, MenuItem, MenuItemWithModule, Module};
pub use codec::{build_tokens, decode_token, parse_tokens, Action, PermissionKey, PermissionMatrix};
pub use flags::CapabilityFlags;
pub use navigation::{build_navigation, NavigationItem, NavigationModule};
pub use plan::{Entitlements, PlanMenuItem, SubscriptionPlan, DEFAULT_PLAN_CODE};
pub use role::{validate_role_name, MenuPermissionGrant, Role, RoleDraft, RolePatch};
pub use tenant::{Tenant, UserTenant};
