use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reqwest::Url;
use sitewatch_common::{
    validate_interval, AddSiteRequest, ApiResponse, DeleteRequest, MonitoredTarget, SiteDetails,
    ToggleRequest, UpdateRequest,
};
use std::sync::Arc;
use tracing::info;

use crate::store::TargetPatch;
use crate::web::{AppError, AppState};

pub fn create_site_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sites", get(list_sites))
        .route("/add_site", post(add_site))
        .route("/update", post(update_site))
        .route("/toggle_monitoring", post(toggle_monitoring))
        .route("/delete_site", post(delete_site))
}

fn require_url(url: &str) -> Result<&str, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::InvalidInput("url is required".to_string()));
    }
    Ok(url)
}

// New sites must be absolute http(s) URLs; existing ones are matched verbatim.
fn validate_new_url(url: &str) -> Result<String, AppError> {
    let url = require_url(url)?;
    let parsed = Url::parse(url)
        .map_err(|e| AppError::InvalidInput(format!("Invalid url '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(AppError::InvalidInput(format!(
            "Unsupported url scheme '{other}', expected http or https"
        ))),
    }
}

#[axum::debug_handler]
async fn list_sites(State(app_state): State<Arc<AppState>>) -> Json<Vec<SiteDetails>> {
    let sites = app_state
        .store
        .list()
        .into_iter()
        .map(|target| app_state.board.details_for(target))
        .collect();
    Json(sites)
}

#[axum::debug_handler]
async fn add_site(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AddSiteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse>), AppError> {
    let Json(payload) = payload?;
    let url = validate_new_url(&payload.url)?;
    let interval = validate_interval(payload.interval)?;

    app_state.store.insert(MonitoredTarget {
        url: url.clone(),
        interval,
        enabled: payload.enabled.unwrap_or(true),
    })?;
    info!(url = %url, interval = interval, "Site added.");
    app_state.trigger_reconcile();

    Ok((StatusCode::CREATED, Json(ApiResponse::ok())))
}

#[axum::debug_handler]
async fn update_site(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let Json(payload) = payload?;
    let url = require_url(&payload.url)?;
    if payload.interval.is_none() && payload.enabled.is_none() {
        return Err(AppError::InvalidInput(
            "Nothing to update: interval or enabled is required".to_string(),
        ));
    }
    let interval = payload.interval.map(validate_interval).transpose()?;
    if interval.is_some() && app_state.store.get(url).is_none() {
        validate_new_url(url)?;
    }

    let (target, created) = app_state.store.upsert(
        url,
        TargetPatch {
            interval,
            enabled: payload.enabled,
        },
    )?;
    info!(
        url = %target.url,
        interval = target.interval,
        enabled = target.enabled,
        created = created,
        "Site updated."
    );
    app_state.trigger_reconcile();

    Ok(Json(ApiResponse::ok()))
}

#[axum::debug_handler]
async fn toggle_monitoring(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let Json(payload) = payload?;
    let url = require_url(&payload.url)?;

    app_state.store.update(
        url,
        TargetPatch {
            interval: None,
            enabled: Some(payload.enabled),
        },
    )?;
    info!(url = %url, enabled = payload.enabled, "Monitoring toggled.");
    app_state.trigger_reconcile();

    Ok(Json(ApiResponse::ok()))
}

#[axum::debug_handler]
async fn delete_site(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let Json(payload) = payload?;
    let url = require_url(&payload.url)?;

    let removed = app_state.store.remove(url)?;
    app_state.board.clear(&removed.url);
    info!(url = %removed.url, "Site deleted, monitoring stopped.");
    app_state.trigger_reconcile();

    Ok(Json(ApiResponse::ok()))
}
