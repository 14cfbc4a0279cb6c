use axum::{Router, routing::get};

pub mod auth;
pub mod common;
pub mod dashboard;
pub mod financial;
pub mod pos;
pub mod products;
pub mod sales;
pub mod sellers;
pub mod stock;
pub mod system;
pub mod users;

/// Router for all endpoints that need a logged-in user.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/sellers", sellers::router())
        .nest("/sales", sales::router())
        .nest("/pos", pos::router())
        .nest("/financial", financial::router())
        .route("/dashboard", get(dashboard::dashboard))
}
