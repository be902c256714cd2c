use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use forgedesk_core::SupplierId;
use forgedesk_infra::Engines;
use forgedesk_purchasing::NewSupplier;

use crate::app::routes::common::{ApiJson, parse_id, respond};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_supplier))
}

pub async fn list_suppliers(Extension(engines): Extension<Engines>) -> axum::response::Response {
    respond(StatusCode::OK, engines.purchasing.list_suppliers().await)
}

pub async fn create_supplier(
    Extension(engines): Extension<Engines>,
    ApiJson(body): ApiJson<NewSupplier>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, engines.purchasing.create_supplier(body).await)
}

pub async fn get_supplier(
    Extension(engines): Extension<Engines>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplierId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, engines.purchasing.get_supplier(id).await)
}
