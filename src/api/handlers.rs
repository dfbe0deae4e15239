//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DateSummary, ItemFields, ItemUpdate};
use crate::error::GrubError;
use crate::import;
use crate::types::MenuItem;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    /// Failure that still carries a payload (e.g. the 409 conflict body).
    pub fn fail(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Plain error response with a status code.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::err(message))).into_response()
}

/// Map a pipeline error to its HTTP status. Parse failures are the
/// uploader's problem (400); storage failures are ours (500).
fn pipeline_error(e: GrubError) -> Response {
    let status = match e {
        GrubError::AnchorDateMissing(_) | GrubError::Sheet(_) | GrubError::UnknownMeal(_) => {
            StatusCode::BAD_REQUEST
        }
        GrubError::Validation(_) => StatusCode::BAD_REQUEST,
        GrubError::Io(_) | GrubError::Db(_) | GrubError::Server(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

/// Uploaded filenames are used as path components under `menu_dir`; anything
/// that could escape it is rejected outright.
fn sanitize_filename(name: &str) -> Option<&str> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        None
    } else {
        Some(name)
    }
}

//==============================================================================
// Info endpoints
//==============================================================================

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "GrubPeek API Server".to_string(),
        version: state.version.clone(),
        description: "Canteen menu publishing: calendar queries, spreadsheet upload and import"
            .to_string(),
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
    }))
}

//==============================================================================
// Menu queries and CRUD
//==============================================================================

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Serialize)]
pub struct MenusResponse {
    pub menus: Vec<MenuItem>,
}

/// GET /api/menus?start=YYYY-MM-DD&end=YYYY-MM-DD
pub async fn menus_between(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Response {
    match state.db.menus_between(range.start, range.end).await {
        Ok(menus) => Json(ApiResponse::ok(MenusResponse { menus })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub dates: Vec<DateSummary>,
}

/// GET /api/menus/summary - dates with data, newest first, per-meal counts
pub async fn menus_summary(State(state): State<Arc<AppState>>) -> Response {
    match state.db.summary().await {
        Ok(dates) => Json(ApiResponse::ok(SummaryResponse { dates })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Serialize)]
pub struct InsertResponse {
    pub id: i64,
}

/// POST /api/menus - insert one item by hand (admin editor)
pub async fn menus_insert(
    State(state): State<Arc<AppState>>,
    Json(item): Json<ItemFields>,
) -> Response {
    match state.db.insert_item(&item).await {
        Ok(id) => Json(ApiResponse::ok(InsertResponse { id })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ItemUpdate,
}

#[derive(Serialize)]
pub struct UpdatedResponse {
    pub updated: bool,
}

/// PUT /api/menus - update one item by id
pub async fn menus_update(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRequest>,
) -> Response {
    match state.db.update_item(req.id, &req.fields).await {
        Ok(true) => Json(ApiResponse::ok(UpdatedResponse { updated: true })).into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("no item with id {}", req.id)),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub id: Option<i64>,
    /// Comma-separated list of YYYY-MM-DD dates.
    pub dates: Option<String>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

/// DELETE /api/menus?id= or /api/menus?dates=d1,d2
pub async fn menus_delete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    if let Some(id) = query.id {
        return match state.db.delete_item(id).await {
            Ok(true) => Json(ApiResponse::ok(DeletedResponse { deleted: 1 })).into_response(),
            Ok(false) => api_error(StatusCode::NOT_FOUND, format!("no item with id {id}")),
            Err(e) => pipeline_error(e),
        };
    }
    if let Some(raw) = query.dates {
        let mut dates = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match part.parse::<NaiveDate>() {
                Ok(d) => dates.push(d),
                Err(_) => return api_error(StatusCode::BAD_REQUEST, format!("invalid date: {part}")),
            }
        }
        return match state.db.delete_dates(&dates).await {
            Ok(deleted) => Json(ApiResponse::ok(DeletedResponse { deleted })).into_response(),
            Err(e) => pipeline_error(e),
        };
    }
    api_error(StatusCode::BAD_REQUEST, "id or dates required")
}

//==============================================================================
// Upload / import
//==============================================================================

#[derive(Serialize)]
pub struct UploadResponse {
    pub count: u64,
    pub filename: String,
    pub imported: bool,
    /// Rows scanned that matched no section; non-zero hints at layout drift.
    pub rows_skipped: usize,
}

#[derive(Serialize)]
pub struct ConflictResponse {
    pub status: String,
    pub dates: Vec<NaiveDate>,
    pub message: String,
}

/// POST /api/upload - multipart `file` plus optional `action`
/// (`overwrite` | `keep`).
///
/// The file is parsed in memory before anything is written. Without an
/// explicit action, already-populated target dates answer 409 so the caller
/// can choose. The file itself is always saved to the menu directory.
pub async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut action: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
        };
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("file") => {
                filename = field.file_name().map(ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            Some("action") => match field.text().await {
                Ok(text) => action = Some(text),
                Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
            },
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return api_error(StatusCode::BAD_REQUEST, "no file uploaded");
    };
    let Some(name) = filename.as_deref().and_then(sanitize_filename) else {
        return api_error(StatusCode::BAD_REQUEST, "invalid filename");
    };
    let name = name.to_string();

    // Parse in memory first so a bad file is rejected before any write.
    let extraction = match import::parse_menu_bytes(bytes.clone(), &name) {
        Ok(extraction) => extraction,
        Err(e) => return pipeline_error(e),
    };

    // Conflict check when the caller has not decided yet.
    if action.is_none() {
        match import::check_conflicts(&state.db, &extraction.records).await {
            Ok(existing) if !existing.is_empty() => {
                let body = ConflictResponse {
                    status: "conflict".to_string(),
                    dates: existing,
                    message: "some target dates already have data".to_string(),
                };
                return (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::fail(body, "import conflict")),
                )
                    .into_response();
            }
            Ok(_) => {}
            Err(e) => return pipeline_error(e),
        }
    }

    // The spreadsheet is kept on disk regardless of the import decision.
    if let Err(e) = tokio::fs::create_dir_all(&state.menu_dir).await {
        return pipeline_error(GrubError::Io(e));
    }
    if let Err(e) = tokio::fs::write(state.menu_dir.join(&name), &bytes).await {
        return pipeline_error(GrubError::Io(e));
    }

    if action.as_deref() == Some("keep") {
        return Json(ApiResponse::ok(UploadResponse {
            count: 0,
            filename: name,
            imported: false,
            rows_skipped: extraction.rows_skipped,
        }))
        .into_response();
    }

    match import::import_records(&state.db, &extraction.records).await {
        Ok(report) => Json(ApiResponse::ok(UploadResponse {
            count: report.count,
            filename: name,
            imported: true,
            rows_skipped: extraction.rows_skipped,
        }))
        .into_response(),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Deserialize)]
pub struct ImportRequest {
    pub filename: String,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub count: u64,
    pub dates: Vec<NaiveDate>,
    pub rows_skipped: usize,
}

/// POST /api/import - re-import a previously uploaded file by name,
/// overwriting whatever its dates currently hold.
pub async fn import_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Response {
    let Some(name) = sanitize_filename(&req.filename) else {
        return api_error(StatusCode::BAD_REQUEST, "invalid filename");
    };
    let path = state.menu_dir.join(name);
    if !path.exists() {
        return api_error(StatusCode::NOT_FOUND, format!("file not found: {name}"));
    }

    let extraction = match import::parse_menu_file(&path, name) {
        Ok(extraction) => extraction,
        Err(e) => return pipeline_error(e),
    };
    match import::import_records(&state.db, &extraction.records).await {
        Ok(report) => Json(ApiResponse::ok(ImportResponse {
            count: report.count,
            dates: report.dates,
            rows_skipped: extraction.rows_skipped,
        }))
        .into_response(),
        Err(e) => pipeline_error(e),
    }
}

//==============================================================================
// Uploaded file management
//==============================================================================

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "et", "csv"];

#[derive(Serialize)]
pub struct FileInfo {
    pub name: String,
    pub modified: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileInfo>,
}

/// GET /api/files - uploaded spreadsheets, newest first. Editor lock files
/// (`~$` prefix) are hidden.
pub async fn files_list(State(state): State<Arc<AppState>>) -> Response {
    let mut files: Vec<FileInfo> = Vec::new();
    let mut entries = match tokio::fs::read_dir(&state.menu_dir).await {
        Ok(entries) => entries,
        // No uploads yet: an absent directory is an empty listing.
        Err(_) => return Json(ApiResponse::ok(FilesResponse { files })).into_response(),
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("~$") {
            continue;
        }
        let is_sheet = name
            .rsplit('.')
            .next()
            .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if !is_sheet {
            continue;
        }
        let modified = match entry.metadata().await {
            Ok(meta) => meta.modified().map(DateTime::<Utc>::from).unwrap_or_default(),
            Err(_) => DateTime::<Utc>::default(),
        };
        files.push(FileInfo { name, modified });
    }
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Json(ApiResponse::ok(FilesResponse { files })).into_response()
}

#[derive(Deserialize)]
pub struct FileQuery {
    pub filename: String,
}

#[derive(Serialize)]
pub struct FileDeletedResponse {
    pub deleted: bool,
}

/// DELETE /api/files?filename= - remove the file only; stored menu rows for
/// its dates are untouched.
pub async fn files_delete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Response {
    let Some(name) = sanitize_filename(&query.filename) else {
        return api_error(StatusCode::BAD_REQUEST, "invalid filename");
    };
    let path = state.menu_dir.join(name);
    if !path.exists() {
        return api_error(StatusCode::NOT_FOUND, format!("file not found: {name}"));
    }
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Json(ApiResponse::ok(FileDeletedResponse { deleted: true })).into_response(),
        Err(e) => pipeline_error(GrubError::Io(e)),
    }
}

/// GET /api/download?filename= - serve an uploaded file as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Response {
    let Some(name) = sanitize_filename(&query.filename) else {
        return api_error(StatusCode::BAD_REQUEST, "invalid filename");
    };
    let path = state.menu_dir.join(name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => return api_error(StatusCode::NOT_FOUND, format!("file not found: {name}")),
    };

    let content_type = match name.rsplit('.').next().map(str::to_lowercase).as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv",
        Some("xls") | Some("et") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    };
    let disposition = HeaderValue::from_bytes(format!("attachment; filename=\"{name}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

//==============================================================================
// Auth
//==============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /api/auth/login - check the admin password.
pub async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> Response {
    match state.db.verify_password(&req.password).await {
        Ok(true) => Json(ApiResponse::ok(LoginResponse {
            token: "admin-session-token".to_string(),
        }))
        .into_response(),
        Ok(false) => api_error(StatusCode::UNAUTHORIZED, "wrong password"),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

/// PUT /api/auth/password - change the admin password.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Response {
    if req.new_password.chars().count() < 6 {
        return api_error(
            StatusCode::BAD_REQUEST,
            "new password must be at least 6 characters",
        );
    }
    match state.db.verify_password(&req.old_password).await {
        Ok(true) => {}
        Ok(false) => return api_error(StatusCode::UNAUTHORIZED, "old password is incorrect"),
        Err(e) => return pipeline_error(e),
    }
    match state
        .db
        .set_setting(crate::db::ADMIN_PASSWORD_KEY, &req.new_password)
        .await
    {
        Ok(()) => Json(ApiResponse::ok(ChangedResponse { changed: true })).into_response(),
        Err(e) => pipeline_error(e),
    }
}
