// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded SDK endpoints.
//!
//! Every route here needs an SDK app in scope (`Quyx-Api-Key` or
//! `Quyx-Client-Id`); requests are recorded in the app's log by the
//! caller-resolution middleware.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::user::user_agent;
use crate::{
    auth::{
        cookies::{clear_token_cookies, set_token_cookies},
        login::{login_with_wallet, WalletPrincipal},
        ApiKeyApp, Auth, AuthError, AuthenticatedUser, SdkApp, SignInMessage, TokenPair,
    },
    error::ApiError,
    models::{MessageResponse, SdkUserListResponse, SdkWhoAmIResponse, SiwsLoginRequest},
    state::AppState,
    storage::{App, SdkUser, SdkUserRepository, SessionRepository},
};

/// Sign in an SDK user (ed25519 wallet) through the app in scope.
///
/// The app's blacklist and whitelist apply to the signer's address.
#[utoipa::path(
    post,
    path = "/sdk/login",
    tag = "SDK",
    request_body = SiwsLoginRequest,
    params(
        ("Quyx-Api-Key" = Option<String>, Header, description = "App API key"),
        ("Quyx-Client-Id" = Option<String>, Header, description = "App client ID")
    ),
    responses(
        (status = 201, description = "Signed in", body = TokenPair),
        (status = 401, description = "App credentials missing or rejected"),
        (status = 403, description = "Address blocked or not whitelisted"),
        (status = 409, description = "Signature, domain or freshness check failed"),
        (status = 422, description = "Nonce expired, missing or mismatched")
    )
)]
pub async fn login(
    SdkApp(app): SdkApp,
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<SiwsLoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenPair>), AuthError> {
    let message = SignInMessage::Siws(request.message);
    let outcome = login_with_wallet(
        &state,
        &headers,
        user_agent(&headers),
        &message,
        &request.signature,
        WalletPrincipal::SdkUser { app: &app },
    )?;

    let jar = set_token_cookies(
        jar,
        &outcome.tokens,
        state.tokens.access_ttl(),
        state.tokens.refresh_ttl(),
        state.config.cookie_secure,
    );
    Ok((StatusCode::CREATED, jar, Json(outcome.tokens)))
}

/// The SDK user behind the token, which must belong to the app in scope.
fn sdk_user_of(state: &AppState, user: &AuthenticatedUser, app: &App) -> Result<SdkUser, ApiError> {
    let record = SdkUserRepository::new(&state.db)
        .find_active(&user.identifier)?
        .ok_or(AuthError::Unauthorized)?;
    if record.app != app.id {
        return Err(AuthError::Unauthorized.into());
    }
    Ok(record)
}

/// Current SDK user.
#[utoipa::path(
    get,
    path = "/sdk/whoami",
    tag = "SDK",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current SDK user", body = SdkWhoAmIResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn whoami(
    SdkApp(app): SdkApp,
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<SdkWhoAmIResponse>, ApiError> {
    let record = sdk_user_of(&state, &user, &app)?;
    Ok(Json(SdkWhoAmIResponse {
        user: record,
        app_id: app.id,
        app_name: app.name,
    }))
}

/// Disconnect the SDK user from the app and end the session.
#[utoipa::path(
    delete,
    path = "/sdk/disconnect",
    tag = "SDK",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Disconnected", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn disconnect(
    SdkApp(app): SdkApp,
    Auth(user): Auth,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar, Json<MessageResponse>), ApiError> {
    let record = sdk_user_of(&state, &user, &app)?;

    SdkUserRepository::new(&state.db).deactivate(&record.id)?;
    SessionRepository::new(&state.db).invalidate(&user.session)?;

    tracing::info!(app_id = %app.id, sdk_user_id = %record.id, "SDK user disconnected");
    Ok((
        StatusCode::CREATED,
        clear_token_cookies(jar),
        Json(MessageResponse::new("disconnected")),
    ))
}

/// Active SDK users of the app. Server-to-server only.
#[utoipa::path(
    get,
    path = "/sdk/users",
    tag = "SDK",
    params(("Quyx-Api-Key" = String, Header, description = "App API key")),
    responses(
        (status = 200, description = "Active SDK users", body = SdkUserListResponse),
        (status = 401, description = "API key missing or invalid")
    )
)]
pub async fn list_users(
    ApiKeyApp(app): ApiKeyApp,
    State(state): State<AppState>,
) -> Result<Json<SdkUserListResponse>, ApiError> {
    let users = SdkUserRepository::new(&state.db).list_active_for_app(&app.id)?;
    let total = users.len();
    Ok(Json(SdkUserListResponse { users, total }))
}
