#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use stockbin::config::AppConfig;
use stockbin::create_router;
use stockbin::models::{Asset, Warehouse};
use stockbin::state::AppState;
use stockbin::store::MemoryStore;

pub const TEST_SECRET: &str = "test-secret";

/// A router over a fresh in-memory store, writing barcodes into a temp dir
/// that lives as long as this value.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn barcode_path(&self, payload: &str) -> std::path::PathBuf {
        self.barcode_dir().join(format!("{payload}.png"))
    }

    pub fn barcode_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("barcodes")
    }
}

pub fn test_config(barcode_dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        barcode_dir: barcode_dir.to_path_buf(),
        public_base_url: None,
        bin_capacity: None,
        bcrypt_cost: 4,
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(|_| {})
}

pub fn build_test_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut config = test_config(&dir.path().join("barcodes"));
    customize(&mut config);

    let store = Arc::new(MemoryStore::new());
    let router = create_router(AppState::new(store.clone(), config));
    TestApp { router, store, dir }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_with_bearer(app: &TestApp, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send_json(app: &TestApp, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn post_raw(app: &TestApp, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Create a warehouse through the API and return its JSON.
pub async fn create_warehouse(app: &TestApp, name: &str, rows: i64, racks: i64, bins: i64) -> Value {
    let response = post_json(
        app,
        "/api/warehouses",
        serde_json::json!({
            "name": name,
            "location": "Building 1",
            "rows": rows,
            "racks_per_row": racks,
            "bins_per_rack": bins,
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["warehouse"].clone()
}

pub async fn create_asset(app: &TestApp, name: &str) -> Value {
    let response = post_json(app, "/api/assets", serde_json::json!({ "name": name })).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["asset"].clone()
}

/// A warehouse row as an interrupted create would leave it: no code, no barcode.
pub fn codeless_warehouse(id: i64, rows: i32, racks: i32, bins: i32) -> Warehouse {
    Warehouse {
        id,
        code: None,
        barcode_url: None,
        name: format!("Legacy {id}"),
        location: "Annex".to_string(),
        row_count: rows,
        racks_per_row: racks,
        bins_per_rack: bins,
        created_at: Utc::now(),
    }
}

pub fn codeless_asset(id: i64) -> Asset {
    Asset {
        id,
        code: None,
        name: format!("Legacy asset {id}"),
        location: None,
        warehouse_id: None,
        status: "available".to_string(),
        image_data: None,
        created_at: Utc::now(),
    }
}
