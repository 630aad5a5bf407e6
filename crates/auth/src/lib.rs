//! `tessera-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! validate a bearer token and check a principal's permission set, nothing
//! about where roles or plans live.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{require_all, require_any, AuthzError};
pub use claims::{validate_claims, AccessClaims, TokenValidationError};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::RoleName;
