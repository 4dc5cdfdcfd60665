// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The kind of principal a session belongs to.
///
/// A session's role is fixed when it is created.
///
/// - `User` - marketplace end user, signs in with an Ethereum wallet
/// - `Staff` - platform staff (no self-service login, no refresh)
/// - `Dev` - developer account, email + password
/// - `SdkUser` - wallet holder signing in through an embedded SDK app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "quyx_user")]
    User,
    #[serde(rename = "quyx_staff")]
    Staff,
    #[serde(rename = "quyx_dev")]
    Dev,
    #[serde(rename = "quyx_sdk_user")]
    SdkUser,
}

impl Role {
    pub const ALL: &'static [Role] = &[Role::User, Role::Staff, Role::Dev, Role::SdkUser];

    /// Wire name, as stored in sessions and tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "quyx_user",
            Role::Staff => "quyx_staff",
            Role::Dev => "quyx_dev",
            Role::SdkUser => "quyx_sdk_user",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Role> {
        Self::ALL.iter().copied().find(|role| role.as_str() == s)
    }

    /// Whether this role appears in a route's allow-list.
    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(back, *role);
        }
    }

    #[test]
    fn parse_rejects_unknown_roles() {
        assert_eq!(Role::parse("quyx_dev"), Some(Role::Dev));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("QUYX_DEV"), None);
    }

    #[test]
    fn allow_list_membership() {
        assert!(Role::Dev.is_one_of(&[Role::Dev]));
        assert!(!Role::User.is_one_of(&[Role::Dev]));
        assert!(Role::SdkUser.is_one_of(Role::ALL));
    }
}
