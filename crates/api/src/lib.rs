//! HTTP API: configuration, routing, and request/response mapping for the
//! permission endpoints.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
