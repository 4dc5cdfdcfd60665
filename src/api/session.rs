// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints: nonce challenge, current caller, logout.

use std::str::FromStr;

use alloy::primitives::Address;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    auth::{cookies::clear_token_cookies, nonce::cache_key_for_request, Auth, Nonce},
    error::ApiError,
    models::{CurrentSessionResponse, MessageResponse, SessionListResponse},
    state::AppState,
    storage::SessionRepository,
};

/// EVM (0x + 40 hex) or base58 ed25519 public key.
fn is_wallet_address(address: &str) -> bool {
    if address.starts_with("0x") {
        return Address::from_str(address).is_ok();
    }
    bs58::decode(address)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

/// Issue (or return the live) sign-in nonce for an address.
///
/// Nonces are scoped to the request's `Origin` (or `Referer`), so the login
/// must come from the same origin that fetched the nonce.
#[utoipa::path(
    get,
    path = "/session/nonce/{address}",
    tag = "Session",
    params(("address" = String, Path, description = "Wallet address that will sign in")),
    responses(
        (status = 200, description = "Live nonce", body = Nonce),
        (status = 400, description = "Not a wallet address")
    )
)]
pub async fn get_nonce(
    State(state): State<AppState>,
    Path(address): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Nonce>, ApiError> {
    let address = address.trim();
    if !is_wallet_address(address) {
        return Err(ApiError::bad_request("invalid wallet address"));
    }

    let key = cache_key_for_request(&headers, address);
    Ok(Json(state.nonces.issue(&key)))
}

/// Current caller and the session backing their token.
#[utoipa::path(
    get,
    path = "/session/current",
    tag = "Session",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current session", body = CurrentSessionResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn current_session(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<CurrentSessionResponse>, ApiError> {
    let details = SessionRepository::new(&state.db)
        .find(&user.session)?
        .ok_or_else(|| ApiError::not_found("session not found"))?;

    Ok(Json(CurrentSessionResponse {
        caller: user,
        details,
    }))
}

/// Active sessions of the caller, newest first.
#[utoipa::path(
    get,
    path = "/session",
    tag = "Session",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active sessions", body = SessionListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_sessions(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = SessionRepository::new(&state.db).list_active_for(&user.identifier)?;
    let total = sessions.len();
    Ok(Json(SessionListResponse { sessions, total }))
}

/// Log out: deactivate the current session and clear credential cookies.
///
/// Every access and refresh token bound to the session stops working.
#[utoipa::path(
    delete,
    path = "/session",
    tag = "Session",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Session already inactive")
    )
)]
pub async fn logout(
    Auth(user): Auth,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar, Json<MessageResponse>), ApiError> {
    let changed = SessionRepository::new(&state.db).invalidate(&user.session)?;
    if !changed {
        return Err(ApiError::conflict("session is already inactive"));
    }

    tracing::info!(session_id = %user.session, role = %user.role, "Logged out");
    Ok((
        StatusCode::CREATED,
        clear_token_cookies(jar),
        Json(MessageResponse::new("logged out")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_address_formats() {
        assert!(is_wallet_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(is_wallet_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
        let base58 = crate::auth::verifier::tests::ed25519_address(
            &crate::auth::verifier::tests::ed25519_key(),
        );
        assert!(is_wallet_address(&base58));
        assert!(!is_wallet_address("0x1234"));
        assert!(!is_wallet_address("not-an-address"));
        assert!(!is_wallet_address(""));
    }
}
