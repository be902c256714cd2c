use forgedesk_api::app::{build_app, services::in_memory_engines};
use forgedesk_core::PurchaseOrderId;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(reservations: bool) -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(in_memory_engines(reservations));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_item(client: &reqwest::Client, srv: &TestServer, part: &str, stock: i64) -> String {
    let res = client
        .post(srv.url("/items"))
        .json(&json!({ "name": format!("Item {part}"), "part_number": part, "stock": stock }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn(true).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_lifecycle_create_post_history() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();
    let id = create_item(&client, &srv, "HB-100", 10).await;

    let (status, item) = get_json(&client, srv.url(&format!("/items/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["stock"], 10);
    assert_eq!(item["available_qty"], 10);
    assert_eq!(item["sku"], "HB-100");

    let (status, txn) = post_json(
        &client,
        srv.url("/transactions"),
        json!({ "reference": "Cycle count", "lines": [{ "item_id": id, "quantity_change": -4 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(txn["lines"][0]["stock_before"], 10);
    assert_eq!(txn["lines"][0]["stock_after"], 6);

    let (status, err) = post_json(
        &client,
        srv.url("/transactions"),
        json!({ "reference": "Pull", "lines": [{ "item_id": id, "quantity_change": -7 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"], "integrity_error");

    let (status, history) = get_json(&client, srv.url(&format!("/items/{id}/transactions"))).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["reference"], "Cycle count");

    let (status, found) = get_json(&client, srv.url("/items/by-sku/hb-100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"].as_str(), Some(id.as_str()));
}

#[tokio::test]
async fn bad_ids_are_400_and_unknown_ids_are_404() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/items/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let missing = PurchaseOrderId::new();
    let (status, body) = get_json(&client, srv.url(&format!("/purchase-orders/{missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_bodies_are_json_validation_errors() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        srv.url("/reservations/commit"),
        json!({
            "job_number": "J-900",
            "job_name": "Storefront",
            "requested_by": "Dana",
            "lines": [{ "item_id": "not-a-uuid", "commit_qty": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("item_id"));

    let (status, body) = post_json(
        &client,
        srv.url("/transactions"),
        json!({ "reference": "Pull", "lines": [{ "item_id": "zzz", "quantity_change": "lots" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let res = client
        .post(srv.url("/items"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn optional_bodies_may_be_omitted_but_not_malformed() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/replenishment/refresh")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = post_json(
        &client,
        srv.url("/replenishment/refresh"),
        json!({ "as_of": 20300115 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn reservation_commit_start_complete() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();
    let item_id = create_item(&client, &srv, "DC-200", 5).await;

    let (status, commit) = post_json(
        &client,
        srv.url("/reservations/commit"),
        json!({
            "job_number": "J-100",
            "job_name": "Lobby doors",
            "requested_by": "Dana",
            "needed_by": "2030-01-15",
            "lines": [{ "item_id": item_id, "commit_qty": 8 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(commit["items"][0]["available_after"], -3);
    let reservation_id = commit["reservation_id"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &client,
        srv.url(&format!("/reservations/{reservation_id}/status")),
        json!({ "status": "shipped" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, started) = post_json(
        &client,
        srv.url(&format!("/reservations/{reservation_id}/status")),
        json!({ "status": "in_progress" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["changed"], true);
    assert_eq!(started["shortages"].as_array().unwrap().len(), 1);

    let (status, body) = post_json(
        &client,
        srv.url(&format!("/reservations/{reservation_id}/status")),
        json!({ "status": "committed" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let mut actuals = serde_json::Map::new();
    actuals.insert(item_id.clone(), json!(5));
    let (status, done) = post_json(
        &client,
        srv.url(&format!("/reservations/{reservation_id}/complete")),
        json!({ "actuals": actuals }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["consumed"], 5);
    assert_eq!(done["released"], 3);

    let (_, item) = get_json(&client, srv.url(&format!("/items/{item_id}"))).await;
    assert_eq!(item["stock"], 0);
    assert_eq!(item["committed_qty"], 0);

    let (status, list) = get_json(&client, srv.url("/reservations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["status"], "fulfilled");
    assert_eq!(list[0]["consumed_total"], 5);

    let (status, corrections) = post_json(&client, srv.url("/reservations/reconcile"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(corrections.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn purchase_order_receiving_updates_stock_and_status() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();
    let item_id = create_item(&client, &srv, "LT-1", 0).await;

    let (status, supplier) = post_json(
        &client,
        srv.url("/suppliers"),
        json!({ "name": "Acme Hardware", "default_lead_time_days": 7 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(
        &client,
        srv.url("/purchase-orders"),
        json!({
            "supplier_id": supplier["id"],
            "expected_date": "03/01/2030",
            "lines": [{ "item_id": item_id, "quantity_ordered": "100", "unit_cost": "2.50" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, order) = post_json(
        &client,
        srv.url("/purchase-orders"),
        json!({
            "supplier_id": supplier["id"],
            "order_number": "PO-1001",
            "status": "sent",
            "lines": [{ "item_id": item_id, "quantity_ordered": "100", "unit_cost": "2.50" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().unwrap().to_string();
    let line_id = order["lines"][0]["id"].clone();
    assert_eq!(order["supplier"]["name"], "Acme Hardware");

    let (status, open) = get_json(&client, srv.url("/purchase-orders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(open.as_array().unwrap().len(), 1);

    let (status, first) = post_json(
        &client,
        srv.url(&format!("/purchase-orders/{order_id}/receipts")),
        json!({ "lines": [{ "line_id": line_id, "quantity": "40" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "partially_received");

    let (status, second) = post_json(
        &client,
        srv.url(&format!("/purchase-orders/{order_id}/receipts")),
        json!({ "lines": [{ "line_id": line_id, "quantity": "70" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "closed");

    let (_, item) = get_json(&client, srv.url(&format!("/items/{item_id}"))).await;
    assert_eq!(item["stock"], 100);

    let (status, receipts) =
        get_json(&client, srv.url(&format!("/purchase-orders/{order_id}/receipts"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipts.as_array().unwrap().len(), 2);

    let (status, open) = get_json(&client, srv.url("/purchase-orders")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(open.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn replenishment_report_and_refresh() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();
    create_item(&client, &srv, "RP-1", 3).await;

    let (status, report) = get_json(&client, srv.url("/replenishment")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["groups"].as_array().unwrap().len(), 1);

    let (status, summary) = post_json(
        &client,
        srv.url("/replenishment/refresh"),
        json!({ "as_of": "2030-01-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["items"], 1);
    assert_eq!(summary["as_of"], "2030-01-01");
}

#[tokio::test]
async fn estimate_and_summary() {
    let srv = TestServer::spawn(true).await;
    let client = reqwest::Client::new();
    create_item(&client, &srv, "HB-100", 2).await;

    let (status, report) = post_json(
        &client,
        srv.url("/estimates/check"),
        json!({ "requirements": [
            { "part_number": "HB-100", "required_qty": 5 },
            { "part_number": "ZZ-1", "required_qty": 1 }
        ] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["counts"]["short"], 1);
    assert_eq!(report["counts"]["missing"], 1);

    let (status, summary) = get_json(&client, srv.url("/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_stock"], 2);
}

#[tokio::test]
async fn reservation_routes_degrade_without_the_subsystem() {
    let srv = TestServer::spawn(false).await;
    let client = reqwest::Client::new();
    let item_id = create_item(&client, &srv, "NR-1", 5).await;

    let (status, list) = get_json(&client, srv.url("/reservations")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());

    let (status, body) = post_json(
        &client,
        srv.url("/reservations/commit"),
        json!({
            "job_number": "J-1",
            "job_name": "Lobby",
            "requested_by": "Dana",
            "lines": [{ "item_id": item_id, "commit_qty": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "unsupported_feature");

    let (_, item) = get_json(&client, srv.url(&format!("/items/{item_id}"))).await;
    assert_eq!(item["active_reservations"], 0);
}
