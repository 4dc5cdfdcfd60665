// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Developer accounts: registration and email/password sign-in.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::user::user_agent;
use crate::{
    auth::{
        claims::TokenPayload,
        cookies::set_token_cookies,
        password::{hash_password, verify_password, PasswordError},
        Auth, AuthError, Role, TokenPair,
    },
    error::ApiError,
    models::{DevLoginRequest, DevSessionResponse, RegisterDevRequest},
    state::AppState,
    storage::{Dev, DevRepository, DevResponse, NewDev, SessionRepository},
};

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Open a developer session and mint its tokens.
fn start_session(
    state: &AppState,
    dev: &Dev,
    user_agent: Option<String>,
) -> Result<TokenPair, AuthError> {
    let session = SessionRepository::new(&state.db).create(&dev.id, Role::Dev, user_agent)?;
    state.tokens.issue_pair(&TokenPayload {
        session: session.id,
        role: Role::Dev,
        identifier: dev.id.clone(),
    })
}

/// Register a developer account and sign it in.
#[utoipa::path(
    post,
    path = "/dev",
    tag = "Developer",
    request_body = RegisterDevRequest,
    responses(
        (status = 201, description = "Registered", body = DevSessionResponse),
        (status = 400, description = "Invalid email or password too short"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<RegisterDevRequest>,
) -> Result<(StatusCode, CookieJar, Json<DevSessionResponse>), ApiError> {
    if !looks_like_email(&request.email) {
        return Err(ApiError::bad_request("invalid email address"));
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("first and last name are required"));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| match e {
            PasswordError::TooShort => ApiError::bad_request(e.to_string()),
            PasswordError::Hash(_) => ApiError::internal(e.to_string()),
        })?;

    let dev = DevRepository::new(&state.db).create(NewDev {
        email: request.email,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        company: request.company,
        password_hash,
    })?;

    let tokens = start_session(&state, &dev, user_agent(&headers))?;
    let jar = set_token_cookies(
        jar,
        &tokens,
        state.tokens.access_ttl(),
        state.tokens.refresh_ttl(),
        state.config.cookie_secure,
    );

    Ok((
        StatusCode::CREATED,
        jar,
        Json(DevSessionResponse {
            dev: DevResponse::from(dev),
            tokens,
        }),
    ))
}

/// Sign in with email and password.
#[utoipa::path(
    post,
    path = "/dev/login",
    tag = "Developer",
    request_body = DevLoginRequest,
    responses(
        (status = 201, description = "Signed in", body = DevSessionResponse),
        (status = 401, description = "Invalid email/password combination")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<DevLoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<DevSessionResponse>), ApiError> {
    let dev = DevRepository::new(&state.db)
        .find_by_email(&request.email)?
        .ok_or(AuthError::InvalidCredentials)?;

    let stored = dev.password_hash.clone();
    let password = request.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::internal(format!("password check task failed: {e}")))?;
    if !matches {
        tracing::info!(dev_id = %dev.id, "Developer sign-in rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = start_session(&state, &dev, user_agent(&headers))?;
    let jar = set_token_cookies(
        jar,
        &tokens,
        state.tokens.access_ttl(),
        state.tokens.refresh_ttl(),
        state.config.cookie_secure,
    );

    Ok((
        StatusCode::CREATED,
        jar,
        Json(DevSessionResponse {
            dev: DevResponse::from(dev),
            tokens,
        }),
    ))
}

/// Profile of the signed-in developer.
#[utoipa::path(
    get,
    path = "/dev/current",
    tag = "Developer",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current developer", body = DevResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn current_dev(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<DevResponse>, ApiError> {
    let dev = DevRepository::new(&state.db)
        .find_by_id(&user.identifier)?
        .ok_or_else(|| ApiError::not_found("developer not found"))?;
    Ok(Json(DevResponse::from(dev)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ada@quyx.xyz"));
        assert!(looks_like_email("  ada@quyx.xyz "));
        assert!(!looks_like_email("ada"));
        assert!(!looks_like_email("@quyx.xyz"));
        assert!(!looks_like_email("ada@localhost"));
    }
}
