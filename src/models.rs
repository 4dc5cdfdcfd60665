// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Storage records that are
//! returned as-is (`Session`, `User`, `App`, ...) live in `storage` and are
//! not duplicated here.
//!
//! ## Model Categories
//!
//! - **Sign-in**: wallet login requests for both message standards
//! - **Sessions**: the current caller and their sessions
//! - **Developers**: registration and password login
//! - **Apps**: SDK app registration and gating
//! - **Misc**: token inspection

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, SiweMessage, SiwsMessage, TokenPair};
use crate::storage::{AppGating, DevResponse, SdkUser, Session};

// =============================================================================
// Sign-in
// =============================================================================

/// EVM wallet sign-in (`POST /user/login`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SiweLoginRequest {
    /// Structured EIP-4361 fields; the server re-renders the signed text.
    pub message: SiweMessage,
    /// 0x-prefixed 65-byte `personal_sign` signature.
    pub signature: String,
}

/// SDK wallet sign-in (`POST /sdk/login`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SiwsLoginRequest {
    pub message: SiwsMessage,
    /// base58 ed25519 signature.
    pub signature: String,
}

// =============================================================================
// Sessions
// =============================================================================

/// The caller as seen by the access gate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentSessionResponse {
    #[serde(flatten)]
    pub caller: AuthenticatedUser,
    pub details: Session,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Developers
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDevRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DevLoginRequest {
    pub email: String,
    pub password: String,
}

/// Developer profile plus the tokens of the session just started.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DevSessionResponse {
    pub dev: DevResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

// =============================================================================
// Apps
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAppRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub gating: AppGating,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    /// Max entries to return (default 50, capped at 500)
    pub limit: Option<usize>,
}

// =============================================================================
// SDK
// =============================================================================

/// SDK user and the app it signed in through.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SdkWhoAmIResponse {
    pub user: SdkUser,
    pub app_id: String,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SdkUserListResponse {
    pub users: Vec<SdkUser>,
    pub total: usize,
}

// =============================================================================
// Misc
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyJwtRequest {
    pub token: String,
}
