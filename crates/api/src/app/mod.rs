//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, demo seeding, token minting
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and id parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use tessera_auth::Hs256Jwt;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over `store`.
pub fn build_app(jwt_secret: &str, store: services::SharedStore) -> Router {
    let jwt = Arc::new(Hs256Jwt::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::AppServices::new(store));

    // Protected routes: auth runs first, then services are attached.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
