use axum::{
    Router,
    routing::{get, post},
};

pub mod common;
pub mod inventory;
pub mod purchases;
pub mod replenishment;
pub mod reservations;
pub mod suppliers;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(system::summary))
        .route("/transactions", post(inventory::post_transaction))
        .route("/estimates/check", post(inventory::check_estimate))
        .nest("/items", inventory::router())
        .nest("/reservations", reservations::router())
        .nest("/suppliers", suppliers::router())
        .nest("/purchase-orders", purchases::router())
        .nest("/replenishment", replenishment::router())
}
