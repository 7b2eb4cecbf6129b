use axum::{routing::get, Router};

pub mod customers;
pub mod logs;
pub mod materials;
pub mod processing;
pub mod rolls;
pub mod sales;
pub mod system;

/// Router for every ledger endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/materials", materials::router())
        .nest("/rolls", rolls::router())
        .nest("/sales", sales::router())
        .nest("/processing", processing::router())
        .nest("/customers", customers::router())
        .nest("/logs", logs::router())
}
