//! HTTP lookup service tests, driven through the router without a socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use allele_store::archive::Compression;
use allele_store::store::frequency::FrequencyStoreBuilder;
use allele_store::web::server::{create_router, AppState};
use allele_store::{BuildInfo, Database, DatabaseLayout, IngestRecord, StoreConfig};
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

fn state(dir: &TempDir) -> Arc<AppState> {
    let layout = DatabaseLayout::under(dir.path());
    let mut builder = FrequencyStoreBuilder::new();
    builder
        .push(&IngestRecord::new("1", 16103, "T", "G").with_info("AF", "0.02"))
        .unwrap();
    builder
        .finish()
        .unwrap()
        .save(&layout.frequency, &BuildInfo::now("20130502"), Compression::default())
        .unwrap();

    let database = Database::open(&layout, &StoreConfig::default()).unwrap();
    Arc::new(AppState {
        database: Mutex::new(database),
        layout,
    })
}

/// Requests carry a peer address, as the rate limiter keys on it
fn get(uri: &str) -> Request<Body> {
    let mut request = Request::get(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_lookup_found_and_missing() {
    let dir = TempDir::new().unwrap();
    let app = create_router(state(&dir)).unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/lookup?chrom=chr1&pos=16103&ref=T&alt=G"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body = json_body(response).await;
    assert_eq!(body["chromosome"], "1");
    assert_eq!(body["frequency"]["outcome"], "found");
    assert!(body["curated"].is_null());

    let response = app
        .oneshot(get("/api/lookup?chrom=1&pos=16103&ref=T&alt=C"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["frequency"]["outcome"], "missing");
    assert_eq!(body["frequency"]["value"], "no_record");
}

#[tokio::test]
async fn test_lookup_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let app = create_router(state(&dir)).unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/lookup?chrom=chrUn_gl000220&pos=5&ref=A&alt=G"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error_type"], "unknown_chromosome");
    assert!(body["details"].is_null());

    let response = app
        .clone()
        .oneshot(get("/api/lookup?chrom=1&pos=0&ref=A&alt=G"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error_type"], "invalid_query");

    let response = app
        .oneshot(get("/api/lookup?chrom=1&pos=10&ref=A&alt=%3CDEL%3E"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_info_lists_stores() {
    let dir = TempDir::new().unwrap();
    let app = create_router(state(&dir)).unwrap();

    let response = app.oneshot(get("/api/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 6);
    let frequency = entries.iter().find(|e| e["store"] == "frequency").unwrap();
    assert_eq!(frequency["present"], true);
    assert_eq!(frequency["source_version"], "20130502");
}
