use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use forgedesk_core::ItemId;
use forgedesk_infra::Engines;

use crate::app::routes::common::{ApiJson, parse_id, respond};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/import", post(import_items))
        .route("/by-sku/:sku", get(find_by_sku))
        .route("/:id", get(get_item).put(update_item))
        .route("/:id/transactions", get(item_transactions))
}

pub async fn list_items(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.catalog.list_items().await)
}

pub async fn create_item(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::CreateItemRequest>,
) -> axum::response::Response {
    let request = match body.into_domain() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::CREATED, engines.catalog.create_item(request).await)
}

pub async fn get_item(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.catalog.get_item(id).await)
}

pub async fn find_by_sku(
    Extension(engines): Extension<Engines>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    respond(StatusCode::OK, engines.catalog.find_by_sku(&sku).await)
}

pub async fn update_item(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ItemRequest>,
) -> axum::response::Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let details = match body.into_details() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::OK, engines.catalog.update_item(id, details).await)
}

pub async fn item_transactions(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.ledger.history(id).await)
}

pub async fn import_items(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::ImportRequest>,
) -> axum::response::Response {
    respond(StatusCode::OK, engines.catalog.import_items(body.rows).await)
}

pub async fn post_transaction(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::PostTransactionRequest>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, engines.ledger.post(body.into_domain()).await)
}

pub async fn check_estimate(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<dto::EstimateRequest>,
) -> axum::response::Response {
    respond(StatusCode::OK, engines.catalog.check_estimate(body.requirements).await)
}
