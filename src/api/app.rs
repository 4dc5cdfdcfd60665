// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SDK app management for developers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateAppRequest, LogsQuery, MessageResponse},
    state::AppState,
    storage::{App, AppGating, AppLog, AppRepository, AuditRepository, NewApp},
};

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

fn log_limit(query: &LogsQuery) -> usize {
    query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT)
}

/// Register an SDK app owned by the caller.
#[utoipa::path(
    post,
    path = "/app",
    tag = "Apps",
    request_body = CreateAppRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "App registered", body = App),
        (status = 400, description = "Missing name or URL"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "App name already used by this developer")
    )
)]
pub async fn create_app(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateAppRequest>,
) -> Result<(StatusCode, Json<App>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("app name is required"));
    }
    if url::Url::parse(request.url.trim()).is_err() {
        return Err(ApiError::bad_request("app url must be an absolute URL"));
    }

    let app = AppRepository::new(&state.db).create(NewApp {
        owner: user.identifier,
        name: name.to_string(),
        url: request.url.trim().to_string(),
        description: request.description,
        gating: request.gating,
    })?;
    Ok((StatusCode::CREATED, Json(app)))
}

/// Active apps of the caller.
#[utoipa::path(
    get,
    path = "/app",
    tag = "Apps",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Apps owned by the caller", body = Vec<App>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_apps(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<App>>, ApiError> {
    let apps = AppRepository::new(&state.db).list_by_owner(&user.identifier)?;
    Ok(Json(apps))
}

/// Replace an app's allowed domains, bundle ids, blacklist and whitelist.
#[utoipa::path(
    put,
    path = "/app/{app_id}/gating",
    tag = "Apps",
    params(("app_id" = String, Path, description = "App ID")),
    request_body = AppGating,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated app", body = App),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "App not found")
    )
)]
pub async fn update_gating(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    Json(gating): Json<AppGating>,
) -> Result<Json<App>, ApiError> {
    let app = AppRepository::new(&state.db)
        .update_gating(&app_id, &user.identifier, gating)?
        .ok_or_else(|| ApiError::not_found(format!("App {app_id} not found")))?;

    tracing::info!(app_id = %app.id, "App gating updated");
    Ok(Json(app))
}

/// Retire an app. Its API key and client id stop granting SDK access.
#[utoipa::path(
    delete,
    path = "/app/{app_id}",
    tag = "Apps",
    params(("app_id" = String, Path, description = "App ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "App deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "App not found"),
        (status = 409, description = "App already deleted")
    )
)]
pub async fn delete_app(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    match AppRepository::new(&state.db).deactivate(&app_id, &user.identifier)? {
        Some(true) => Ok((StatusCode::CREATED, Json(MessageResponse::new("app deleted")))),
        Some(false) => Err(ApiError::conflict(format!("App {app_id} already deleted"))),
        None => Err(ApiError::not_found(format!("App {app_id} not found"))),
    }
}

/// Request log of an app, newest first.
#[utoipa::path(
    get,
    path = "/app/{app_id}/logs",
    tag = "Apps",
    params(
        ("app_id" = String, Path, description = "App ID"),
        ("limit" = Option<usize>, Query, description = "Max entries (default 50, max 500)")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Log entries", body = Vec<AppLog>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "App not found")
    )
)]
pub async fn list_logs(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    // Other developers' apps look the same as missing ones
    let owned = AppRepository::new(&state.db)
        .find_by_id(&app_id)?
        .filter(|app| app.owner == user.identifier);
    if owned.is_none() {
        return Err(ApiError::not_found(format!("App {app_id} not found")));
    }

    let logs = AuditRepository::new(&state.db).list_for_app(&app_id, log_limit(&query))?;
    Ok(Json(logs))
}
