// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-user (web app) endpoints.

use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    auth::{
        cookies::set_token_cookies,
        login::{login_with_wallet, WalletPrincipal},
        Auth, AuthError, SignInMessage, TokenPair,
    },
    error::ApiError,
    models::SiweLoginRequest,
    state::AppState,
    storage::{User, UserRepository},
};

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Sign in with an EVM wallet (EIP-4361 message, EIP-191 signature).
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "User",
    request_body = SiweLoginRequest,
    responses(
        (status = 201, description = "Signed in", body = TokenPair),
        (status = 400, description = "Malformed message"),
        (status = 409, description = "Signature, domain or freshness check failed"),
        (status = 422, description = "Nonce expired, missing or mismatched")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<SiweLoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenPair>), AuthError> {
    let message = SignInMessage::Siwe(request.message);
    let outcome = login_with_wallet(
        &state,
        &headers,
        user_agent(&headers),
        &message,
        &request.signature,
        WalletPrincipal::User,
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

/// Profile of the signed-in end user.
#[utoipa::path(
    get,
    path = "/user/current",
    tag = "User",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User record missing")
    )
)]
pub async fn current_user(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    let record = UserRepository::new(&state.db)
        .find_by_id(&user.identifier)?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(record))
}
