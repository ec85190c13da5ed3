//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the priced product operations
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request parsing and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    let paging = dto::Paging {
        default_per_page: config.page_size,
        max_per_page: config.max_page_size,
    };
    Ok(router(Arc::new(services), paging))
}

/// Router over already-wired services.
pub fn router(services: Arc<services::AppServices>, paging: dto::Paging) -> Router {
    let api = routes::router()
        .layer(Extension(services))
        .layer(Extension(paging));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(
            middleware::request_context_middleware,
        )))
}
