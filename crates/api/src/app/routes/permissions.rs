//! Permission endpoints: plan-scoped catalog, effective permissions,
//! navigation, and tenant role management.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tessera_core::ExpectedVersion;
use tessera_permissions::RoleDraft;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/available-menus", get(available_menus))
        .route("/modules", get(list_modules))
        .route("/menu-items", get(list_menu_items))
        .route("/subscription-plans", get(list_subscription_plans))
        .route("/user-permissions", get(user_permissions))
        .route("/navigation", get(navigation))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", get(get_role).put(update_role).delete(delete_role))
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// GET /permissions/available-menus - menu items the tenant's plan includes
pub async fn available_menus(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.resolver.get_available_menu_items(tenant.tenant_id()).await {
        Ok(menus) => (StatusCode::OK, Json(menus)).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// GET /permissions/modules
pub async fn list_modules(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.resolver.list_modules().await {
        Ok(modules) => (StatusCode::OK, Json(dto::ModulesResponse { modules })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// GET /permissions/menu-items
pub async fn list_menu_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.resolver.list_menu_items().await {
        Ok(menu_items) => (StatusCode::OK, Json(dto::MenuItemsResponse { menu_items })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// GET /permissions/subscription-plans
pub async fn list_subscription_plans(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.resolver.list_subscription_plans().await {
        Ok(plans) => (StatusCode::OK, Json(dto::PlansResponse { plans })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Principal
// ─────────────────────────────────────────────────────────────────────────────

/// GET /permissions/user-permissions - live matrix, token grants as fallback
pub async fn user_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services
        .resolver
        .live_user_permissions(principal.user_id(), tenant.tenant_id(), principal.permissions())
        .await;

    match result {
        Ok(permissions) => (StatusCode::OK, Json(dto::PermissionsResponse { permissions })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// GET /permissions/navigation - module tree filtered by the token's view keys
pub async fn navigation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let allowed = principal.permissions();
    match services.resolver.build_navigation(tenant.tenant_id(), &allowed).await {
        Ok(modules) => (StatusCode::OK, Json(dto::NavigationResponse { modules })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// GET /permissions/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = authz::require_all(&principal, &["roles.view"]) {
        return res;
    }

    match services.resolver.list_roles(tenant.tenant_id()).await {
        Ok(roles) => (StatusCode::OK, Json(dto::RolesResponse { roles })).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// GET /permissions/roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require_all(&principal, &["roles.view"]) {
        return res;
    }
    let role_id = match dto::parse_role_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.resolver.get_role(tenant.tenant_id(), role_id).await {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// POST /permissions/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<RoleDraft>,
) -> axum::response::Response {
    if let Err(res) = authz::require_any(&principal, &["roles.create", "roles.create_role"]) {
        return res;
    }

    match services.resolver.create_role(tenant.tenant_id(), body).await {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// PUT /permissions/roles/:id
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRoleRequest>,
) -> axum::response::Response {
    if let Err(res) = authz::require_any(&principal, &["roles.update", "roles.edit"]) {
        return res;
    }
    let role_id = match dto::parse_role_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let expected = ExpectedVersion::from_option(body.version);
    match services
        .resolver
        .update_role(tenant.tenant_id(), role_id, body.patch, expected)
        .await
    {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// DELETE /permissions/roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = authz::require_all(&principal, &["roles.delete"]) {
        return res;
    }
    let role_id = match dto::parse_role_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.resolver.delete_role(tenant.tenant_id(), role_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}
