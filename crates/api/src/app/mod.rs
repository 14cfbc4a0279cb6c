//! HTTP API application wiring.
//!
//! - `services/`: record stores plus the operations behind every endpoint
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response bodies and the JSON/query extractors
//! - `errors.rs`: status-code mapping for every failure

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build stores and services from config, then the full router.
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    services::spawn_session_sweeper(services.clone());
    Ok(build_router(services))
}

/// Router over already-built services.
pub fn build_router(services: Arc<AppServices>) -> Router {
    let protected = routes::router().route_layer(from_fn_with_state(
        services.clone(),
        middleware::principal_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_log))
                .layer(Extension(services.clone()))
                .layer(from_fn_with_state(services, middleware::session_middleware)),
        )
}
