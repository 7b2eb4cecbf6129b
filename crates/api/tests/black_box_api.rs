use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use stockledger_api::app::{self, AppServices};
use stockledger_infra::config::StoreConfig;

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let services = Arc::new(
            app::build_services(&StoreConfig::InMemory)
                .await
                .expect("failed to build services"),
        );
        let router = app::build_app(Arc::clone(&services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base_url, services, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
        self.services.shutdown();
    }
}

async fn send_json(req: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let res = req.send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn create_material(client: &reqwest::Client, srv: &TestServer, body: Value) -> String {
    let (status, created) = send_json(client.post(srv.url("/materials")).json(&body)).await;
    assert_eq!(status, StatusCode::CREATED, "body={created}");
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn sale_processing_round_trip_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_material(&client, &srv, json!({ "name": "Gabardine", "openingStock": 10 })).await;

    let (status, sold) = send_json(
        client
            .post(srv.url("/sales"))
            .json(&json!({ "materialId": id, "quantity": 4, "unitPrice": 1200 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sold["materialId"], id.as_str());
    assert_eq!(sold["quantityRemaining"], 6);
    let sale_id = sold["saleId"].as_str().unwrap().to_string();

    let (status, sent) = send_json(
        client
            .post(srv.url("/processing"))
            .json(&json!({ "materialId": id, "quantity": 3, "provider": "Dyehouse Kaya" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["quantityRemaining"], 3);
    let record_id = sent["recordId"].as_str().unwrap().to_string();

    let (status, rejected) = send_json(
        client
            .post(srv.url("/sales"))
            .json(&json!({ "materialId": id, "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rejected["error"], "InsufficientStock");
    assert_eq!(rejected["materialId"], id.as_str());
    assert_eq!(rejected["requested"], 4);
    assert_eq!(rejected["available"], 3);
    assert!(rejected["message"].is_string());

    let (status, received) = send_json(
        client
            .post(srv.url(&format!("/processing/{record_id}/receive")))
            .json(&json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received["recordId"], record_id.as_str());
    assert_eq!(received["status"], "returned");
    assert_eq!(received["quantityRemaining"], 6);

    let (status, deleted) = send_json(client.delete(srv.url(&format!("/sales/{sale_id}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "ok": true, "quantityRemaining": 10 }));

    let (_, material) = send_json(client.get(srv.url(&format!("/materials/{id}")))).await;
    assert_eq!(material["quantityOnHand"], 10);
}

#[tokio::test]
async fn failures_carry_kind_and_context() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_material(&client, &srv, json!({ "name": "Tulle", "openingStock": 5 })).await;
    let (_, sent) = send_json(
        client
            .post(srv.url("/processing"))
            .json(&json!({ "materialId": id, "quantity": 2 })),
    )
    .await;
    let record_id = sent["recordId"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        client
            .post(srv.url(&format!("/processing/{record_id}/receive")))
            .json(&json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "OverReturn");
    assert_eq!(body["recordId"], record_id.as_str());
    assert_eq!(body["outstanding"], 2);

    let (status, body) = send_json(
        client
            .post(srv.url("/sales"))
            .json(&json!({ "materialId": id, "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidQuantity");

    let missing = "0190d5c2-7d1f-7a3e-9b2c-5f4e3d2c1b0a";
    let (status, body) = send_json(client.delete(srv.url(&format!("/sales/{missing}")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownSale");

    let (status, body) = send_json(client.get(srv.url("/materials/not-an-id"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidId");

    let (status, body) = send_json(
        client
            .post(srv.url("/sales"))
            .header("content-type", "application/json")
            .body("{\"quantity\": "),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");

    let (status, body) = send_json(client.delete(srv.url(&format!("/materials/{id}")))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "MaterialInUse");
    assert_eq!(body["openProcessing"], 1);

    let (status, body) = send_json(
        client
            .post(srv.url("/materials"))
            .json(&json!({ "name": "tulle" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn activity_log_records_the_actor() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_material(&client, &srv, json!({ "name": "Chiffon", "openingStock": 8 })).await;
    let (status, _) = send_json(
        client
            .post(srv.url("/sales"))
            .header("x-actor", "zeynep")
            .json(&json!({ "materialId": id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, logs) = send_json(client.get(srv.url("/logs?limit=2"))).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["action"], "sale");
    assert_eq!(logs[0]["actor"], "zeynep");
    assert_eq!(logs[0]["changes"]["stock"], json!({ "before": 8, "after": 6 }));
    assert_eq!(logs[1]["actor"], "anonymous");
}

#[tokio::test]
async fn customers_carry_sale_debt() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let material = create_material(&client, &srv, json!({ "name": "Satin", "openingStock": 20 })).await;
    let (status, customer) = send_json(
        client
            .post(srv.url("/customers"))
            .json(&json!({ "name": "Terzi Mehmet", "location": "Bursa" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(client.post(srv.url("/sales")).json(&json!({
        "materialId": material,
        "quantity": 5,
        "customerId": customer_id,
        "unitPrice": 300,
        "amountDue": 1500,
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, fetched) = send_json(client.get(srv.url(&format!("/customers/{customer_id}")))).await;
    assert_eq!(fetched["debt"], 1500);

    let (_, sales) = send_json(client.get(srv.url("/sales"))).await;
    assert_eq!(sales[0]["customerId"], customer_id.as_str());
    assert_eq!(sales[0]["totalPrice"], 1500);
}

#[tokio::test]
async fn low_stock_report_follows_sales() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_material(
        &client,
        &srv,
        json!({ "name": "Velvet", "openingStock": 12, "reorderPoint": 5 }),
    )
    .await;
    let (status, _) = send_json(
        client
            .post(srv.url("/sales"))
            .json(&json!({ "materialId": id, "quantity": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The report is served by a projection; poll until it catches up.
    for _ in 0..50 {
        let (status, report) = send_json(client.get(srv.url("/materials/low-stock"))).await;
        assert_eq!(status, StatusCode::OK);
        if let Some(entry) = report.as_array().and_then(|a| a.first()) {
            assert_eq!(entry["materialId"], id.as_str());
            assert_eq!(entry["quantityOnHand"], 4);
            assert_eq!(entry["reorderPoint"], 5);
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("material did not show up in the low-stock report within timeout");
}
