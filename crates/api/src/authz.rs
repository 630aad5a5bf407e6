//! API-side permission gate.
//!
//! Handlers call these before touching the resolver; the principal's
//! permission set is taken from the token as-is.

use axum::http::StatusCode;
use axum::response::Response;

use tessera_auth::AuthzError;

use crate::app::errors;
use crate::context::PrincipalContext;

/// 403 unless the principal holds every key in `required`.
pub fn require_all(principal: &PrincipalContext, required: &[&str]) -> Result<(), Response> {
    tessera_auth::require_all(principal.principal(), required).map_err(forbidden)
}

/// 403 unless the principal holds at least one key in `required`.
pub fn require_any(principal: &PrincipalContext, required: &[&str]) -> Result<(), Response> {
    tessera_auth::require_any(principal.principal(), required).map_err(forbidden)
}

fn forbidden(err: AuthzError) -> Response {
    tracing::debug!(missing = ?err.missing(), "permission check failed");
    errors::json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}
