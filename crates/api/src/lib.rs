//! HTTP API: configuration, session middleware, use-case services and routes.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
