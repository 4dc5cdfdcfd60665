// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{auth::TokenVerification, models::VerifyJwtRequest, state::AppState};

/// Inspect a token issued by this server.
///
/// Only checks signature and expiry; the backing session may be gone.
#[utoipa::path(
    post,
    path = "/misc/verify-jwt",
    tag = "Misc",
    request_body = VerifyJwtRequest,
    responses(
        (status = 200, description = "Token is valid", body = TokenVerification),
        (status = 400, description = "Token is invalid or expired", body = TokenVerification)
    )
)]
pub async fn verify_jwt(
    State(state): State<AppState>,
    Json(request): Json<VerifyJwtRequest>,
) -> (StatusCode, Json<TokenVerification>) {
    let verification = state.tokens.verify(request.token.trim());
    let status = if verification.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(verification))
}
