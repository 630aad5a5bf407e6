//! Tenant-isolated in-memory storage abstractions.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
