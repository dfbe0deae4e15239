//! API server: router construction, CORS, tracing, graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::Db;

use super::handlers;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    /// Directory where uploaded spreadsheet files are kept.
    pub menu_dir: PathBuf,
    pub version: String,
}

/// Build the application router. Separated from [`run_api_server`] so tests
/// can drive it with `tower::ServiceExt::oneshot`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route(
            "/api/menus",
            get(handlers::menus_between)
                .post(handlers::menus_insert)
                .put(handlers::menus_update)
                .delete(handlers::menus_delete),
        )
        .route("/api/menus/summary", get(handlers::menus_summary))
        .route("/api/upload", post(handlers::upload))
        .route("/api/import", post(handlers::import_file))
        .route(
            "/api/files",
            get(handlers::files_list).delete(handlers::files_delete),
        )
        .route("/api/download", get(handlers::download))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/password", put(handlers::change_password))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until ctrl-c / SIGTERM.
pub async fn run_api_server(config: ApiConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("GrubPeek API server starting on http://{}", addr);
    info!("   Endpoints: /api/menus, /api/menus/summary, /api/upload, /api/import, /api/files");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("GrubPeek API server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
