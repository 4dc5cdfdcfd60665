// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical sign-in messages.
//!
//! The server never trusts message text sent by the client. It receives the
//! structured fields, re-renders the exact text the wallet signed and
//! verifies the signature over that. Rendering must therefore be
//! byte-for-byte identical to the client libraries:
//!
//! - [`SiweMessage`]: EIP-4361 "Sign-In with Ethereum", signed with
//!   `personal_sign` (EIP-191) by an EVM wallet.
//! - [`SiwsMessage`]: the Quyx SDK sign-in text, signed as raw bytes by an
//!   ed25519 (Solana-style) wallet.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::verifier::{self, Verification};
use super::AuthError;

/// Statement used when the client leaves it out.
pub const DEFAULT_STATEMENT: &str = "Clicking Sign or Approve only means you have approved this wallet is owned by you. This request will not trigger any blockchain transaction or cost any gas fee";

/// Wallet signing standard of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    /// EIP-4361 / EIP-191, secp256k1 address recovery
    Siwe,
    /// Detached ed25519 over the raw message bytes
    Siws,
}

// =============================================================================
// Standard A: EIP-4361
// =============================================================================

/// Structured EIP-4361 message fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiweMessage {
    /// RFC 3986 authority requesting the signature (e.g. `site.a`)
    pub domain: String,
    /// 0x-prefixed EVM address
    pub address: String,
    #[serde(default)]
    pub statement: Option<String>,
    pub uri: String,
    #[serde(default = "default_siwe_version")]
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    /// RFC 3339 timestamp, rendered verbatim
    pub issued_at: String,
    #[serde(default)]
    pub expiration_time: Option<String>,
}

fn default_siwe_version() -> String {
    "1".to_string()
}

impl SiweMessage {
    pub fn render(&self) -> String {
        let statement = self.statement.as_deref().unwrap_or(DEFAULT_STATEMENT);
        let mut text = format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             URI: {uri}\n\
             Version: {version}\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            uri = self.uri,
            version = self.version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at,
        );
        if let Some(expiration) = &self.expiration_time {
            text.push_str("\nExpiration Time: ");
            text.push_str(expiration);
        }
        text
    }
}

// =============================================================================
// Standard B: SDK sign-in (ed25519)
// =============================================================================

/// Chain id or network label. Clients send either a number or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ChainLabel {
    Id(u64),
    Name(String),
}

impl fmt::Display for ChainLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainLabel::Id(id) => write!(f, "{id}"),
            ChainLabel::Name(name) => f.write_str(name),
        }
    }
}

/// Structured SDK sign-in message fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiwsMessage {
    pub domain: String,
    /// base58 ed25519 public key
    pub address: String,
    #[serde(default)]
    pub statement: Option<String>,
    pub chain_id: ChainLabel,
    pub nonce: String,
    pub issued_at: String,
    /// Always rendered; an empty value is rejected as malformed
    #[serde(default)]
    pub expiration_time: String,
}

impl SiwsMessage {
    pub fn render(&self) -> String {
        let statement = self.statement.as_deref().unwrap_or(DEFAULT_STATEMENT);
        // "Chain ID" has no colon in the SDK's template; wallets sign it that way.
        format!(
            "{domain}\n{statement}\n\nNonce: {nonce}\nChain ID{chain}\nIssued At: {issued_at}\nExpiration Time: {expiration}",
            domain = self.domain,
            nonce = self.nonce,
            chain = self.chain_id,
            issued_at = self.issued_at,
            expiration = self.expiration_time,
        )
    }
}

// =============================================================================
// Either standard
// =============================================================================

/// A sign-in message of either standard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInMessage {
    Siwe(SiweMessage),
    Siws(SiwsMessage),
}

impl SignInMessage {
    pub fn standard(&self) -> Standard {
        match self {
            SignInMessage::Siwe(_) => Standard::Siwe,
            SignInMessage::Siws(_) => Standard::Siws,
        }
    }

    /// Canonical text the wallet signed.
    pub fn render(&self) -> String {
        match self {
            SignInMessage::Siwe(m) => m.render(),
            SignInMessage::Siws(m) => m.render(),
        }
    }

    pub fn address(&self) -> &str {
        match self {
            SignInMessage::Siwe(m) => &m.address,
            SignInMessage::Siws(m) => &m.address,
        }
    }

    pub fn nonce(&self) -> &str {
        match self {
            SignInMessage::Siwe(m) => &m.nonce,
            SignInMessage::Siws(m) => &m.nonce,
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            SignInMessage::Siwe(m) => &m.domain,
            SignInMessage::Siws(m) => &m.domain,
        }
    }

    fn timestamps(&self) -> (&str, Option<&str>) {
        match self {
            SignInMessage::Siwe(m) => (&m.issued_at, m.expiration_time.as_deref()),
            SignInMessage::Siws(m) => (&m.issued_at, Some(m.expiration_time.as_str())),
        }
    }

    /// Enforce `issuedAt <= now < expirationTime`.
    pub fn check_fresh(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        let (issued_at, expiration_time) = self.timestamps();

        let issued_at = parse_timestamp("issuedAt", issued_at)?;
        if now < issued_at {
            return Err(AuthError::MessageExpired);
        }

        if let Some(expiration_time) = expiration_time {
            if expiration_time.trim().is_empty() {
                return Err(AuthError::MalformedMessage(
                    "expirationTime is required".to_string(),
                ));
            }
            let expiration_time = parse_timestamp("expirationTime", expiration_time)?;
            if now >= expiration_time {
                return Err(AuthError::MessageExpired);
            }
        }
        Ok(())
    }

    /// Verify `signature` over the canonical text against the message's address.
    pub fn verify_signature(&self, signature: &str) -> Verification {
        verifier::verify(self.standard(), &self.render(), signature, self.address())
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AuthError::MalformedMessage(format!("{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn siwe() -> SiweMessage {
        SiweMessage {
            domain: "site.a".into(),
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
            statement: Some("Sign in to Quyx".into()),
            uri: "https://site.a".into(),
            version: "1".into(),
            chain_id: 1,
            nonce: "32891756abcdef12".into(),
            issued_at: "2024-01-01T00:00:00.000Z".into(),
            expiration_time: Some("2024-01-01T00:10:00.000Z".into()),
        }
    }

    fn siws() -> SiwsMessage {
        SiwsMessage {
            domain: "site.a".into(),
            address: "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T".into(),
            statement: None,
            chain_id: ChainLabel::Name("devnet".into()),
            nonce: "abc123".into(),
            issued_at: "2024-01-01T00:00:00.000Z".into(),
            expiration_time: "2024-01-01T00:05:00.000Z".into(),
        }
    }

    #[test]
    fn siwe_renders_eip4361_layout() {
        let expected = "site.a wants you to sign in with your Ethereum account:\n\
                        0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
                        \n\
                        Sign in to Quyx\n\
                        \n\
                        URI: https://site.a\n\
                        Version: 1\n\
                        Chain ID: 1\n\
                        Nonce: 32891756abcdef12\n\
                        Issued At: 2024-01-01T00:00:00.000Z\n\
                        Expiration Time: 2024-01-01T00:10:00.000Z";
        assert_eq!(siwe().render(), expected);
        assert_eq!(siwe().render(), siwe().render());
    }

    #[test]
    fn siws_renders_sdk_layout_with_default_statement() {
        let expected = format!(
            "site.a\n{DEFAULT_STATEMENT}\n\nNonce: abc123\nChain IDdevnet\nIssued At: 2024-01-01T00:00:00.000Z\nExpiration Time: 2024-01-01T00:05:00.000Z"
        );
        assert_eq!(siws().render(), expected);

        let mut numeric = siws();
        numeric.chain_id = ChainLabel::Id(101);
        assert!(numeric
            .render()
            .ends_with("Chain ID101\nIssued At: 2024-01-01T00:00:00.000Z\nExpiration Time: 2024-01-01T00:05:00.000Z"));
    }

    #[test]
    fn siws_expiration_line_is_always_rendered() {
        let mut m = siws();
        m.expiration_time = String::new();
        assert!(m.render().ends_with("Issued At: 2024-01-01T00:00:00.000Z\nExpiration Time: "));
    }

    #[test]
    fn chain_label_accepts_number_or_name() {
        let m: SiwsMessage = serde_json::from_value(serde_json::json!({
            "domain": "d", "address": "a", "chainId": 5, "nonce": "n",
            "issuedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(m.chain_id, ChainLabel::Id(5));
        assert!(m.statement.is_none());
    }

    #[test]
    fn freshness_window_is_half_open() {
        let msg = SignInMessage::Siwe(siwe());
        let issued = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert!(msg.check_fresh(issued).is_ok());
        assert!(msg.check_fresh(issued + Duration::minutes(9)).is_ok());
        assert!(matches!(
            msg.check_fresh(issued - Duration::seconds(1)),
            Err(AuthError::MessageExpired)
        ));
        assert!(matches!(
            msg.check_fresh(issued + Duration::minutes(10)),
            Err(AuthError::MessageExpired)
        ));
    }

    #[test]
    fn siws_missing_expiration_is_malformed() {
        let m: SiwsMessage = serde_json::from_value(serde_json::json!({
            "domain": "site.a", "address": "a", "chainId": "devnet", "nonce": "n",
            "issuedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(m.expiration_time.is_empty());

        let issued = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(matches!(
            SignInMessage::Siws(m).check_fresh(issued),
            Err(AuthError::MalformedMessage(_))
        ));
    }

    #[test]
    fn siws_expiration_is_enforced() {
        let msg = SignInMessage::Siws(siws());
        let issued = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(msg.check_fresh(issued + Duration::minutes(4)).is_ok());
        assert!(matches!(
            msg.check_fresh(issued + Duration::minutes(5)),
            Err(AuthError::MessageExpired)
        ));
    }

    #[test]
    fn unparseable_timestamp_is_malformed() {
        let mut m = siwe();
        m.issued_at = "yesterday".into();
        assert!(matches!(
            SignInMessage::Siwe(m).check_fresh(Utc::now()),
            Err(AuthError::MalformedMessage(_))
        ));
    }
}
