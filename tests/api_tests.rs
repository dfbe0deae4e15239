//! API tests: configuration plus router behavior via tower oneshot.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use grubpeek::api::server::{build_router, ApiConfig, AppState};
use grubpeek::db::Db;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_state() -> (Arc<AppState>, TempDir) {
    let db = Db::connect_in_memory().await.unwrap();
    let dir = TempDir::new().unwrap();
    let state = Arc::new(AppState {
        db,
        menu_dir: dir.path().to_path_buf(),
        version: "1.0.0".to_string(),
    });
    (state, dir)
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Anchors on Sunday 2026-01-04; one breakfast section, Sunday + Monday
/// columns, three dishes total.
const FIXTURE_NAME: &str = "菜单2026年1月4日-9日.xlsx";

fn menu_workbook_bytes() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "早餐").unwrap();
    worksheet.write_string(1, 1, "星期日").unwrap();
    worksheet.write_string(1, 2, "星期一").unwrap();
    worksheet.write_string(2, 0, "主食").unwrap();
    worksheet.write_string(2, 1, "包子/粥").unwrap();
    worksheet.write_string(2, 2, "面条").unwrap();
    workbook.save_to_buffer().unwrap()
}

const BOUNDARY: &str = "grubpeek-test-boundary";

/// Hand-rolled multipart request: a `file` part plus an optional `action`
/// part, matching what the frontend form submits.
fn upload_request(filename: &str, bytes: &[u8], action: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    if let Some(action) = action {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"action\"\r\n\r\n");
        body.extend_from_slice(action.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_default() {
    let config = ApiConfig::default();
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
}

#[test]
fn test_config_custom() {
    let config = ApiConfig {
        host: "0.0.0.0".to_string(),
        port: 3000,
    };
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 3000);
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_version() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(Request::get("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["version"], "1.0.0");
}

// ═══════════════════════════════════════════════════════════════════════════
// MENU QUERIES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_menus_requires_range() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(Request::get("/api/menus").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_menus_empty_range() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::get("/api/menus?start=2026-01-04&end=2026-01-10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["menus"], serde_json::json!([]));
}

#[tokio::test]
async fn test_menus_insert_and_query() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::post("/api/menus")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "date": "2026-01-04",
                        "type": "lunch",
                        "category": "热菜",
                        "name": "红烧肉",
                        "is_featured": true,
                        "price": 25
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert!(json["data"]["id"].as_i64().unwrap() > 0);

    let resp = app
        .oneshot(
            Request::get("/api/menus?start=2026-01-04&end=2026-01-04")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["menus"][0]["name"], "红烧肉");
    assert_eq!(json["data"]["menus"][0]["type"], "lunch");
}

#[tokio::test]
async fn test_summary_empty() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::get("/api/menus/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["dates"], serde_json::json!([]));
}

// ═══════════════════════════════════════════════════════════════════════════
// UPLOAD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_upload_imports_and_saves_file() {
    let (state, dir) = test_state().await;
    let app = build_router(state);
    let bytes = menu_workbook_bytes();

    let resp = app
        .clone()
        .oneshot(upload_request(FIXTURE_NAME, &bytes, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["count"], 3);
    assert_eq!(json["data"]["imported"], true);
    assert_eq!(json["data"]["rows_skipped"], 0);
    assert_eq!(json["data"]["filename"], FIXTURE_NAME);

    // The spreadsheet lands in the menu directory and shows up in the
    // file listing.
    assert!(dir.path().join(FIXTURE_NAME).exists());
    let resp = app
        .clone()
        .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["files"][0]["name"], FIXTURE_NAME);

    // And the rows are queryable.
    let resp = app
        .oneshot(
            Request::get("/api/menus?start=2026-01-04&end=2026-01-05")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["menus"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_upload_conflict_then_overwrite() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let bytes = menu_workbook_bytes();

    let resp = app
        .clone()
        .oneshot(upload_request(FIXTURE_NAME, &bytes, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Same week again without a decision: 409 naming the populated dates.
    let resp = app
        .clone()
        .oneshot(upload_request(FIXTURE_NAME, &bytes, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["status"], "conflict");
    assert_eq!(
        json["data"]["dates"],
        serde_json::json!(["2026-01-04", "2026-01-05"])
    );

    // Explicit overwrite goes through.
    let resp = app
        .clone()
        .oneshot(upload_request(FIXTURE_NAME, &bytes, Some("overwrite")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["imported"], true);
    assert_eq!(json["data"]["count"], 3);

    // Replacement, not duplication.
    let resp = app
        .oneshot(
            Request::get("/api/menus?start=2026-01-04&end=2026-01-05")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["menus"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_upload_keep_saves_file_without_importing() {
    let (state, dir) = test_state().await;
    let app = build_router(state);
    let bytes = menu_workbook_bytes();

    let resp = app
        .clone()
        .oneshot(upload_request(FIXTURE_NAME, &bytes, Some("keep")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["imported"], false);
    assert_eq!(json["data"]["count"], 0);
    assert!(dir.path().join(FIXTURE_NAME).exists());

    let resp = app
        .oneshot(
            Request::get("/api/menus?start=2026-01-04&end=2026-01-05")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["menus"], serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_without_anchor_date_is_400() {
    let (state, dir) = test_state().await;
    let app = build_router(state);
    let bytes = menu_workbook_bytes();

    let resp = app
        .oneshot(upload_request("menu.xlsx", &bytes, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    // Rejected before anything touches disk.
    assert!(!dir.path().join("menu.xlsx").exists());
}

// ═══════════════════════════════════════════════════════════════════════════
// FILES AND IMPORT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_files_list_empty_when_dir_missing() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["files"], serde_json::json!([]));
}

#[tokio::test]
async fn test_import_unknown_file_is_404() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::post("/api/import")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"filename": "无此文件2026年1月4日.xlsx"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_rejects_path_traversal() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::post("/api/import")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"filename": "../etc/passwd"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_missing_file_is_404() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::get("/api/download?filename=nope.xlsx")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTH
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_default_password() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::post("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"password": "admin888"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["data"]["token"], "admin-session-token");
}

#[tokio::test]
async fn test_login_wrong_password_is_401() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::post("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"password": "guess"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_validations() {
    let (state, _dir) = test_state().await;
    let app = build_router(state);

    // Too short
    let resp = app
        .clone()
        .oneshot(
            Request::put("/api/auth/password")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"old_password": "admin888", "new_password": "abc"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Wrong old password
    let resp = app
        .clone()
        .oneshot(
            Request::put("/api/auth/password")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"old_password": "nope", "new_password": "longenough"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Success
    let resp = app
        .oneshot(
            Request::put("/api/auth/password")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"old_password": "admin888", "new_password": "newsecret"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
