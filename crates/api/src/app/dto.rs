use serde::{Deserialize, Serialize};

use tessera_core::RoleId;
use tessera_infra::RoleView;
use tessera_permissions::{MenuItemWithModule, Module, NavigationModule, PermissionMatrix, RolePatch, SubscriptionPlan};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `PUT /permissions/roles/:id`.
///
/// `version` is the role version the client last read; omitting it skips
/// that check but not the conflict check against concurrent writers.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(flatten)]
    pub patch: RolePatch,
    #[serde(default)]
    pub version: Option<u64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    pub modules: Vec<Module>,
}

#[derive(Debug, Serialize)]
pub struct MenuItemsResponse {
    pub menu_items: Vec<MenuItemWithModule>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<SubscriptionPlan>,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub permissions: PermissionMatrix,
}

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub modules: Vec<NavigationModule>,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<RoleView>,
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_role_id(raw: &str) -> Result<RoleId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "invalid role id",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_flattens_the_patch() {
        let body: UpdateRoleRequest = serde_json::from_str(
            r#"{"name": "clerk", "version": 3, "permissions": []}"#,
        )
        .unwrap();
        assert_eq!(body.version, Some(3));
        assert_eq!(body.patch.name.as_deref(), Some("clerk"));
        assert_eq!(body.patch.permissions, Some(vec![]));
        assert_eq!(body.patch.description, None);
    }

    #[test]
    fn malformed_role_ids_are_bad_requests() {
        let res = parse_role_id("not-a-uuid").unwrap_err();
        assert_eq!(res.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(parse_role_id(&RoleId::new().to_string()).is_ok());
    }
}
