//! Infrastructure layer: permission storage and request-time resolution.

pub mod read_model;
pub mod resolver;
pub mod store;

pub use resolver::{AvailableMenus, Grants, PermissionError, PermissionResolver, RoleMenuPermission, RoleView};
pub use store::{InMemoryPermissionStore, PermissionStore, PostgresPermissionStore, StoreError, StoreResult};
