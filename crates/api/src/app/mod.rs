//! HTTP application wiring.
//!
//! - `services.rs`: store, migrations and capability detection behind the engines
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies and their conversion to domain requests
//! - `errors.rs`: JSON error responses

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use forgedesk_infra::Engines;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over a ready set of engines.
pub fn build_app(engines: Engines) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(engines)))
}
