// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ErrorDetail;
use crate::storage::DbError;

/// Authentication and gating error type.
///
/// Every variant is a request-local failure; none is retried by the server.
/// `TokenExpired`-style conditions never appear here because an expired
/// access token is routed to the refresh path instead of failing.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No live nonce for this (origin, address) pair
    NonceExpiredOrMissing,
    /// The message carries a different nonce than the one issued
    NonceMismatch,
    /// The signed message is outside its `issuedAt..expirationTime` window
    MessageExpired,
    /// Signature did not verify against the canonical message
    SignatureInvalid,
    /// The message domain does not match the requesting origin
    DomainMismatch,
    /// The signed message could not be interpreted
    MalformedMessage(String),
    /// Signer is on the app's blacklist
    AddressBlocked(String),
    /// App has a whitelist and the signer is not on it
    AddressNotWhitelisted(String),
    /// Missing, invalid or role-mismatched credential
    Unauthorized,
    /// Refresh attempted against an inactive session or vanished principal
    SessionRevoked,
    /// Wrong email/password combination
    InvalidCredentials,
    /// Neither `Quyx-Api-Key` nor `Quyx-Client-Id` was sent
    MissingAppCredentials,
    /// Route only accepts server-to-server calls with an API key
    ApiKeyRequired,
    /// API key / client ID does not resolve to an app
    AppNotFound,
    /// App exists but this caller is not allowed to use it
    AppAccessBlocked,
    /// Internal error
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NonceExpiredOrMissing => "nonce_expired_or_missing",
            AuthError::NonceMismatch => "nonce_mismatch",
            AuthError::MessageExpired => "message_expired",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::DomainMismatch => "domain_mismatch",
            AuthError::MalformedMessage(_) => "malformed_message",
            AuthError::AddressBlocked(_) => "address_blocked",
            AuthError::AddressNotWhitelisted(_) => "address_not_whitelisted",
            AuthError::Unauthorized => "unauthorized",
            AuthError::SessionRevoked => "session_revoked",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingAppCredentials => "missing_app_credentials",
            AuthError::ApiKeyRequired => "api_key_required",
            AuthError::AppNotFound => "app_not_found",
            AuthError::AppAccessBlocked => "app_access_blocked",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NonceExpiredOrMissing | AuthError::NonceMismatch => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::MessageExpired
            | AuthError::SignatureInvalid
            | AuthError::DomainMismatch => StatusCode::CONFLICT,
            AuthError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            AuthError::AddressBlocked(_) | AuthError::AddressNotWhitelisted(_) => {
                StatusCode::FORBIDDEN
            }
            AuthError::Unauthorized
            | AuthError::SessionRevoked
            | AuthError::InvalidCredentials
            | AuthError::MissingAppCredentials
            | AuthError::ApiKeyRequired
            | AuthError::AppNotFound
            | AuthError::AppAccessBlocked => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NonceExpiredOrMissing => write!(f, "Nonce has expired! Request a new one"),
            AuthError::NonceMismatch => write!(f, "Invalid nonce set"),
            AuthError::MessageExpired => write!(f, "Sign-in message has expired or is not yet valid"),
            AuthError::SignatureInvalid => write!(f, "Sign In verification failed!"),
            AuthError::DomainMismatch => {
                write!(f, "Sign-in message domain does not match the request origin")
            }
            AuthError::MalformedMessage(msg) => write!(f, "Malformed sign-in message: {msg}"),
            AuthError::AddressBlocked(address) => {
                write!(f, "access blocked for {address}, REASON::IS_BLACKLISTED")
            }
            AuthError::AddressNotWhitelisted(address) => {
                write!(f, "access blocked for {address}, REASON::NOT_WHITELISTED")
            }
            AuthError::Unauthorized => write!(f, "not authorized to access this route"),
            AuthError::SessionRevoked => write!(f, "Session is no longer active"),
            AuthError::InvalidCredentials => write!(f, "Invalid email/password combination"),
            AuthError::MissingAppCredentials => write!(f, "apiKey/clientID is missing"),
            AuthError::ApiKeyRequired => write!(f, "apiKey is required to access this route"),
            AuthError::AppNotFound => write!(f, "invalid apiKey/clientID passed"),
            AuthError::AppAccessBlocked => write!(f, "access blocked from origin"),
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Authentication failed internally");
        }
        let status = self.status_code();
        let message = self.to_string();
        let body = Json(AuthErrorBody {
            error: message.clone(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorDetail(message));
        response
    }
}
