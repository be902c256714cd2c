use axum::{extract::Extension, http::StatusCode};

use forgedesk_infra::Engines;

use crate::app::routes::common::respond;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn summary(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.catalog.inventory_summary().await)
}
