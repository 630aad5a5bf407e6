use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tessera_infra::PermissionError;

pub fn permission_error_to_response(err: PermissionError) -> axum::response::Response {
    match err {
        PermissionError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        PermissionError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        PermissionError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        PermissionError::Store(e) => {
            tracing::error!(error = %e, "permission store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
