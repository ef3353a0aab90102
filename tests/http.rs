//! [tests/http.rs]
//! Exercises the query-service HTTP surface in-process via `tower::oneshot`,
//! without opening a real socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use entroscan::config::{Configuration, Mode};
use entroscan::server::build_router;
use entroscan::session::AppState;
use std::io::Write;
use tower::ServiceExt;

fn bootstrap(bytes: &[u8]) -> (AppState, tempfile::NamedTempFile) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();

    let config = Configuration {
        mode: Mode::Fixed,
        block_size: 1024,
        delimiter: 0x00,
        window: 5,
        port: 0,
        name: "test".to_string(),
    };
    let state = AppState::bootstrap(file.path().to_path_buf(), config).unwrap();
    (state, file)
}

#[tokio::test]
async fn data_endpoint_returns_expected_total() {
    let (state, _file) = bootstrap(&vec![0x41u8; 4096]);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/data?page=0&size=10").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 4);
    assert_eq!(json["chunks"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn read_endpoint_returns_hex_and_arch() {
    let mut data = vec![0x4D, 0x5A, 0x90, 0x00];
    data.extend(std::iter::repeat(0u8).take(1020));
    let (state, _file) = bootstrap(&data);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/read?offset=0&length=1024").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["arch"], "Windows PE Header (x86/64)");
    assert!(json["hex"].as_str().unwrap().starts_with("4d5a9000"));
}

#[tokio::test]
async fn read_clamps_length_above_8192() {
    let (state, _file) = bootstrap(&vec![0xAAu8; 20_000]);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/read?offset=0&length=50000").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["hex"].as_str().unwrap().len(), 8192 * 2);
}

#[tokio::test]
async fn search_finds_literal_bytes_at_known_offset() {
    let mut data = vec![0u8; 5000];
    let needle: &[u8] = &[0xDE, 0xAD, 0xBE, 0xEF];
    data[4096..4100].copy_from_slice(needle);
    let (state, _file) = bootstrap(&data);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/search?hex=DE%20AD%20BE%20EF").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["found"], true);
    assert_eq!(json["offset"], 4096);
}

#[tokio::test]
async fn search_reports_error_for_malformed_hex() {
    let (state, _file) = bootstrap(&vec![0u8; 128]);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/search?hex=ZZ").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["found"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn download_bin_returns_octet_stream_with_named_attachment() {
    let (state, _file) = bootstrap(&vec![0x11u8; 4096]);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/download?mode=bin&offset=0&length=16").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "application/octet-stream");
    let disposition = response.headers().get("content-disposition").unwrap().to_str().unwrap();
    assert!(disposition.contains("extract_0.bin"));
}

#[tokio::test]
async fn download_bmp_returns_image_bmp() {
    let (state, _file) = bootstrap(&vec![0x11u8; 4096]);
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/download?mode=bmp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "image/bmp");
}

#[tokio::test]
async fn load_rejects_missing_file_with_400() {
    let (state, _file) = bootstrap(&vec![0u8; 128]);
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/load")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("filepath=/nonexistent/path/does-not-exist"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn index_embeds_initial_page_payload() {
    let (state, _file) = bootstrap(&vec![0x41u8; 4096]);
    let app = build_router(state);

    let response = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("REPORT"));
    assert!(html.contains("\"total\":4"));
}
