// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet sign-in, sessions and access control for the Quyx API.
//!
//! ## Auth Flow
//!
//! 1. Client fetches a nonce for its address (`GET /session/nonce/{address}`);
//!    the nonce is scoped to the request origin and lives for 5 minutes
//! 2. Wallet signs the canonical sign-in message embedding that nonce
//!    (EIP-4361 for EVM wallets, the SDK text for ed25519 wallets)
//! 3. Server re-renders the message, consumes the nonce, verifies the
//!    signature and the app's address gating, then:
//!    - opens a session for the principal
//!    - returns an EdDSA access token (5 min) and refresh token (1 year)
//! 4. Later requests present the access token as `Authorization: Bearer`
//!    or cookie; expired access tokens are silently replaced through the
//!    refresh token while the session stays active
//!
//! ## Security
//!
//! - Nonces are single use, consumed even when verification fails
//! - Logging out deactivates the session, which kills every token bound to it
//! - Clock skew tolerance on tokens is 60 seconds

pub mod claims;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod login;
pub mod message;
pub mod middleware;
pub mod nonce;
pub mod password;
pub mod roles;
pub mod token;
pub mod verifier;

pub use claims::{AuthenticatedUser, TokenClaims, TokenPayload};
pub use error::AuthError;
pub use extractor::{ApiKeyApp, Auth, OptionalAuth, SdkApp};
pub use gate::{CallerContext, SdkAccess};
pub use message::{SignInMessage, SiweMessage, SiwsMessage, Standard};
pub use nonce::{LruNonceStore, Nonce, NonceService, NonceStore};
pub use roles::Role;
pub use token::{TokenIssuer, TokenPair, TokenVerification};
