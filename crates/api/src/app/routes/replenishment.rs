use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use forgedesk_infra::Engines;

use crate::app::routes::common::{OptionalApiJson, respond};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(report))
        .route("/refresh", post(refresh))
}

pub async fn report(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.replenishment.report().await)
}

pub async fn refresh(
    Extension(engines): Extension<Engines>,
    OptionalApiJson(body): OptionalApiJson<dto::RefreshRequest>,
) -> axum::response::Response {
    let as_of = match body.as_of(Utc::now().date_naive()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(
        StatusCode::OK,
        engines.replenishment.refresh_planning_caches(as_of).await,
    )
}
