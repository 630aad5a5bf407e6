//! `tessera-core` — shared domain foundation.
//!
//! Identifiers, the domain error model and optimistic-concurrency expectations.
//! No IO and no framework types live here.

pub mod error;
pub mod id;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::{MenuItemId, ModuleId, PlanId, RoleId, TenantId, UserId};
pub use version::ExpectedVersion;
