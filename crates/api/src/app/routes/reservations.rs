use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use forgedesk_core::ReservationId;
use forgedesk_infra::Engines;

use crate::app::routes::common::{ApiJson, OptionalApiJson, parse_id, respond};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reservations))
        .route("/commit", post(commit_items))
        .route("/reconcile", post(reconcile))
        .route("/:id", get(get_reservation))
        .route("/:id/status", post(change_status))
        .route("/:id/complete", post(complete))
}

pub async fn list_reservations(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.reservations.list_reservations().await)
}

pub async fn commit_items(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::CommitReservationRequest>,
) -> axum::response::Response {
    respond(
        StatusCode::OK,
        engines.reservations.commit_items(body.into_domain()).await,
    )
}

pub async fn get_reservation(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ReservationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.reservations.get_reservation(id).await)
}

pub async fn change_status(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::StatusRequest>,
) -> axum::response::Response {
    let id: ReservationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target = match body.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(
        StatusCode::OK,
        engines.reservations.transition_status(id, target).await,
    )
}

pub async fn complete(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
    OptionalApiJson(body): OptionalApiJson<dto::CompleteRequest>,
) -> axum::response::Response {
    let id: ReservationId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actuals = match body.parse() {
        Ok(a) => a,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::OK, engines.reservations.complete(id, actuals).await)
}

pub async fn reconcile(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.reservations.reconcile_commitments().await)
}
