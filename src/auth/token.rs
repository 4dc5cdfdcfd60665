// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access / refresh token issuance (EdDSA JWT).
//!
//! ## Lifecycle
//!
//! - Login mints a pair: a short-lived access token and a long-lived refresh
//!   token, same payload, same key.
//! - An access token that is past its TTL but otherwise intact can be
//!   replaced with `reissue_access` as long as the session is still active.
//! - Logging out flips the session inactive, which kills every token that
//!   points at it regardless of the tokens' own TTL.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Serialize;
use utoipa::ToSchema;

use super::claims::{TokenClaims, TokenPayload};
use super::{AuthError, Role};
use crate::config::TokenKeyPem;
use crate::storage::{AuthDatabase, DevRepository, SdkUserRepository, SessionRepository, UserRepository};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly minted access / refresh pair.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of `TokenIssuer::verify`.
///
/// `expired` is only ever `true` for tokens whose signature checked out.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenVerification {
    pub valid: bool,
    pub expired: bool,
    pub decoded: Option<TokenClaims>,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct ReissuedAccess {
    pub access_token: String,
    pub role: Role,
    pub claims: TokenClaims,
}

/// Signs and verifies session tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Build from a PEM-encoded Ed25519 key pair.
    pub fn from_pem(
        keys: &TokenKeyPem,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_ed_pem(keys.private_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid token private key: {e}")))?;
        let decoding_key = DecodingKey::from_ed_pem(keys.public_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid token public key: {e}")))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Build with a freshly generated key pair.
    ///
    /// Tokens die with the process. Development and tests only.
    pub fn ephemeral(access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, AuthError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| AuthError::Internal("ed25519 key generation failed".to_string()))?;
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
            .map_err(|_| AuthError::Internal("ed25519 key parsing failed".to_string()))?;

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(pkcs8.as_ref()),
            decoding_key: DecodingKey::from_ed_der(pair.public_key().as_ref()),
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn sign(&self, payload: &TokenPayload, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            payload: payload.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    pub fn issue_access(&self, payload: &TokenPayload) -> Result<String, AuthError> {
        self.sign(payload, self.access_ttl)
    }

    pub fn issue_pair(&self, payload: &TokenPayload) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign(payload, self.access_ttl)?,
            refresh_token: self.sign(payload, self.refresh_ttl)?,
        })
    }

    /// Check signature, structure and TTL of a token.
    pub fn verify(&self, token: &str) -> TokenVerification {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenVerification {
                valid: true,
                expired: false,
                decoded: Some(data.claims),
            },
            Err(e) => TokenVerification {
                valid: false,
                expired: matches!(e.kind(), ErrorKind::ExpiredSignature),
                decoded: None,
            },
        }
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token itself is not rotated.
    pub fn reissue_access(
        &self,
        refresh_token: &str,
        db: &AuthDatabase,
    ) -> Result<ReissuedAccess, AuthError> {
        let verification = self.verify(refresh_token);
        let claims = match verification.decoded {
            Some(claims) if verification.valid => claims,
            _ => return Err(AuthError::Unauthorized),
        };
        let payload = &claims.payload;

        let session = SessionRepository::new(db)
            .find(&payload.session)?
            .ok_or(AuthError::SessionRevoked)?;
        if !session.is_active {
            return Err(AuthError::SessionRevoked);
        }

        let principal_exists = match session.role {
            Role::User => UserRepository::new(db)
                .find_by_id(&session.identifier)?
                .is_some(),
            Role::Dev => DevRepository::new(db)
                .find_by_id(&session.identifier)?
                .is_some(),
            Role::SdkUser => SdkUserRepository::new(db)
                .find_active(&session.identifier)?
                .is_some(),
            // Staff have no backing record to re-check against
            Role::Staff => false,
        };
        if !principal_exists {
            return Err(AuthError::SessionRevoked);
        }

        let fresh = TokenPayload {
            session: session.id,
            role: session.role,
            identifier: session.identifier,
        };
        let access_token = self.issue_access(&fresh)?;
        let now = Utc::now();

        tracing::debug!(session_id = %fresh.session, role = %fresh.role, "Access token reissued");
        Ok(ReissuedAccess {
            access_token,
            role: fresh.role,
            claims: TokenClaims {
                payload: fresh,
                iat: now.timestamp(),
                exp: (now + self.access_ttl).timestamp(),
            },
        })
    }
}
