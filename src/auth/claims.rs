// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated principal representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// What a token vouches for. Identical in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPayload {
    /// Session id
    pub session: String,
    pub role: Role,
    /// Principal id (user, dev or SDK user, depending on `role`)
    pub identifier: String,
}

/// Full JWT claim set: the payload plus standard timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Authenticated principal attached to a request.
///
/// Only ever constructed from a token whose session was still active when
/// the request came in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    pub session: String,
    pub role: Role,
    pub identifier: String,

    /// Access token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            session: claims.payload.session,
            role: claims.payload.role,
            identifier: claims.payload.identifier,
            expires_at: claims.exp,
        }
    }

    /// Check the principal's role against a route's allow-list.
    pub fn has_role_in(&self, allowed: &[Role]) -> bool {
        self.role.is_one_of(allowed)
    }

    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            session: self.session.clone(),
            role: self.role,
            identifier: self.identifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            payload: TokenPayload {
                session: "sess-1".to_string(),
                role: Role::Dev,
                identifier: "dev-1".to_string(),
            },
            iat: 1700000000,
            exp: 1700000300,
        }
    }

    #[test]
    fn claims_serialize_flat() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["session"], "sess-1");
        assert_eq!(json["role"], "quyx_dev");
        assert_eq!(json["identifier"], "dev-1");
        assert_eq!(json["exp"], 1700000300);
    }

    #[test]
    fn from_claims_copies_payload() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.session, "sess-1");
        assert_eq!(user.expires_at, 1700000300);
        assert!(user.has_role_in(&[Role::Dev, Role::User]));
        assert!(!user.has_role_in(&[Role::SdkUser]));
        assert_eq!(user.payload(), sample_claims().payload);
    }
}
