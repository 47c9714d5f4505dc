//! HTTP surface: `GET /api/cve/{keyword}` and a health check.

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::AppState;
pub use models::{CveResponse, HealthResponse};
pub use routes::{create_router, serve};
