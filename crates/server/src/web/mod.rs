use axum::{http::Method, routing::get, Json, Router};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::store::{SiteStore, StatusBoard};

pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SiteStore>,
    pub board: StatusBoard,
    pub reconcile_tx: mpsc::Sender<()>,
}

impl AppState {
    /// Asks the monitor manager to pick up a store change.
    pub fn trigger_reconcile(&self) {
        if self.reconcile_tx.try_send(()).is_err() {
            // Full means a reconcile is already queued.
            warn!("Reconcile trigger not delivered; channel full or closed.");
        }
    }
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_axum_router(
    store: Arc<SiteStore>,
    board: StatusBoard,
    reconcile_tx: mpsc::Sender<()>,
) -> Router {
    let app_state = Arc::new(AppState {
        store,
        board,
        reconcile_tx,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .merge(routes::site_routes::create_site_router())
        .with_state(app_state)
        .layer(cors)
}
