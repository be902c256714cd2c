use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use forgedesk_core::PurchaseOrderId;
use forgedesk_infra::Engines;

use crate::app::routes::common::{ApiJson, parse_id, respond};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_open_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order))
        .route("/:id/receipts", get(receipt_history).post(record_receipt))
}

pub async fn list_open_orders(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.purchasing.list_open_orders().await)
}

pub async fn create_order(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let request = match body.into_domain() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::CREATED, engines.purchasing.create_order(request).await)
}

pub async fn get_order(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.purchasing.get_order(id).await)
}

pub async fn update_order(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let update = match body.into_domain() {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::OK, engines.purchasing.update_order(id, update).await)
}

pub async fn record_receipt(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ReceiveRequest>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        engines.purchasing.record_receipt(id, body.into_domain()).await,
    )
}

pub async fn receipt_history(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseOrderId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.purchasing.receipt_history(id).await)
}
