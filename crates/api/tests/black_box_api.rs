use std::sync::Arc;

use pricebook_api::app::{dto::Paging, router, services::build_in_memory_services};
use pricebook_core::RequestId;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let paging = Paging {
            default_per_page: 10,
            max_per_page: 100,
        };
        let app = router(Arc::new(build_in_memory_services()), paging);
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

fn laptop() -> Value {
    json!({
        "title": "Laptop",
        "description": "A fast laptop",
        "price": 500,
        "category": "electronics",
        "promotion_percentage": 10,
    })
}

async fn create(client: &reqwest::Client, srv: &TestServer, body: &Value) -> Value {
    let res = client
        .post(srv.url("/api/products"))
        .json(body)
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 Created, got {status} body={body}");
    }
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_lifecycle_create_get_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Create
    let created = create(&client, &srv, &laptop()).await;
    let id = created["id"].as_u64().unwrap();
    assert_eq!(created["title"], "Laptop");
    assert_eq!(created["price"].as_f64(), Some(500.0));
    assert_eq!(created["promotion_percentage"].as_f64(), Some(10.0));
    assert_eq!(created["final_price"].as_f64(), Some(384.75));
    assert_eq!(created["created_at"], created["updated_at"]);

    // Get
    let res = client
        .get(srv.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);

    // Update replaces every field
    let res = client
        .put(srv.url(&format!("/api/products/{id}")))
        .json(&json!({
            "title": "Desk",
            "description": "Oak desk",
            "price": "200.00",
            "category": "furniture",
            "promotion_percentage": null,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["id"].as_u64(), Some(id));
    assert_eq!(updated["title"], "Desk");
    assert_eq!(updated["category"], "furniture");
    assert_eq!(updated["promotion_percentage"], Value::Null);
    assert_eq!(updated["final_price"].as_f64(), Some(180.0));
    assert_eq!(updated["created_at"], created["created_at"]);

    // Delete
    let res = client
        .delete(srv.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product deleted successfully");

    let res = client
        .get(srv.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_discounted_category_only_gets_customer_discount() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        &json!({
            "title": "Mug",
            "description": "Ceramic mug",
            "price": 100,
            "category": "other",
        }),
    )
    .await;

    assert_eq!(created["promotion_percentage"], Value::Null);
    assert_eq!(created["final_price"].as_f64(), Some(90.0));
}

#[tokio::test]
async fn patch_is_a_full_replace() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let created = create(&client, &srv, &laptop()).await;
    let id = created["id"].as_u64().unwrap();

    let res = client
        .patch(srv.url(&format!("/api/products/{id}")))
        .json(&json!({ "title": "Only a title" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut body = laptop();
    body["promotion_percentage"] = json!(20);
    let res = client
        .patch(srv.url(&format!("/api/products/{id}")))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    // 500 * 0.95 * 0.90 * 0.80
    assert_eq!(updated["final_price"].as_f64(), Some(342.0));
}

#[tokio::test]
async fn missing_and_malformed_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/api/products/999", "/api/products/abc", "/api/products/0"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "GET {path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "not_found");
    }

    let res = client
        .delete(srv.url("/api/products/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url("/api/products/999"))
        .json(&laptop())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_failures_list_each_field() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/products"))
        .json(&json!({
            "title": "",
            "price": -5,
            "category": "electronics",
            "promotion_percentage": 120,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "The title field is required. (and 3 more errors)");
    assert_eq!(body["errors"]["title"], json!(["The title field is required."]));
    assert_eq!(
        body["errors"]["description"],
        json!(["The description field is required."])
    );
    assert_eq!(body["errors"]["price"], json!(["The price field must be at least 0."]));
    assert_eq!(
        body["errors"]["promotion_percentage"],
        json!(["The promotion percentage field must not be greater than 100."])
    );
    assert!(body["errors"].get("category").is_none());

    // Nothing was stored.
    let res = client.get(srv.url("/api/products")).send().await.unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn update_validates_before_looking_up_the_record() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/api/products/999"))
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/products"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_json");
}

#[tokio::test]
async fn listing_is_paginated_in_id_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for n in 1..=12 {
        let mut body = laptop();
        body["title"] = json!(format!("Laptop {n}"));
        ids.push(create(&client, &srv, &body).await["id"].as_u64().unwrap());
    }

    let res = client.get(srv.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first: Value = res.json().await.unwrap();
    assert_eq!(first["current_page"], 1);
    assert_eq!(first["per_page"], 10);
    assert_eq!(first["total"], 12);
    assert_eq!(first["last_page"], 2);
    assert_eq!(first["from"], 1);
    assert_eq!(first["to"], 10);
    assert_eq!(first["path"], "/api/products");
    assert_eq!(first["first_page_url"], "/api/products?page=1");
    assert_eq!(first["next_page_url"], "/api/products?page=2");
    assert_eq!(first["prev_page_url"], Value::Null);

    let data = first["data"].as_array().unwrap();
    assert_eq!(data.len(), 10);
    let listed: Vec<u64> = data.iter().map(|p| p["id"].as_u64().unwrap()).collect();
    assert_eq!(listed, ids[..10].to_vec());
    assert!(data.iter().all(|p| p["final_price"].as_f64() == Some(384.75)));

    let res = client
        .get(srv.url("/api/products?page=2"))
        .send()
        .await
        .unwrap();
    let second: Value = res.json().await.unwrap();
    assert_eq!(second["data"].as_array().unwrap().len(), 2);
    assert_eq!(second["from"], 11);
    assert_eq!(second["to"], 12);
    assert_eq!(second["next_page_url"], Value::Null);
    assert_eq!(second["prev_page_url"], "/api/products?page=1");

    let res = client
        .get(srv.url("/api/products?page=1&per_page=5"))
        .send()
        .await
        .unwrap();
    let small: Value = res.json().await.unwrap();
    assert_eq!(small["last_page"], 3);
    assert_eq!(small["next_page_url"], "/api/products?page=2&per_page=5");

    let res = client
        .get(srv.url("/api/products?page=9"))
        .send()
        .await
        .unwrap();
    let beyond: Value = res.json().await.unwrap();
    assert_eq!(beyond["data"], json!([]));
    assert_eq!(beyond["from"], Value::Null);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/products")).send().await.unwrap();
    let generated = res
        .headers()
        .get("x-request-id")
        .expect("missing x-request-id")
        .to_str()
        .unwrap()
        .to_string();
    assert!(generated.parse::<RequestId>().is_ok());

    let sent = RequestId::new().to_string();
    let res = client
        .get(srv.url("/api/products/999"))
        .header("x-request-id", &sent)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["x-request-id"], sent.as_str());
}

#[tokio::test]
async fn bodies_without_json_content_type_are_validated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // No body and no content type at all.
    let res = client.post(srv.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    for field in ["title", "description", "price", "category"] {
        assert!(body["errors"].get(field).is_some(), "missing error for {field}");
    }

    // Form-encoded fields go through the same rules.
    let res = client
        .post(srv.url("/api/products"))
        .form(&[
            ("title", "Headphones"),
            ("description", "Wireless"),
            ("price", "200"),
            ("category", "electronics"),
            ("promotion_percentage", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["promotion_percentage"], Value::Null);
    assert_eq!(created["final_price"].as_f64(), Some(171.0));

    let res = client
        .post(srv.url("/api/products"))
        .header("content-type", "text/plain")
        .body("title=Nope")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn numeric_strings_must_be_plain_literals() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut body = laptop();
    body["price"] = json!("1_000");
    let res = client
        .post(srv.url("/api/products"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors: Value = res.json().await.unwrap();
    assert_eq!(errors["errors"]["price"], json!(["The price field must be a number."]));
}

#[tokio::test]
async fn padded_text_is_stored_trimmed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        &json!({
            "title": "  Cable  ",
            "description": "USB-C",
            "price": 1,
            "category": " electronics ",
        }),
    )
    .await;

    assert_eq!(created["title"], "Cable");
    assert_eq!(created["category"], "electronics");
    // 1 * 0.95 * 0.90
    assert_eq!(created["final_price"].as_f64(), Some(0.86));
}
