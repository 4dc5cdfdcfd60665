// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet sign-in pipeline.
//!
//! ## Order of checks
//!
//! 1. Consume the nonce for (request origin, claimed address). The nonce is
//!    gone after this step whatever happens next.
//! 2. Compare the message domain with the request origin, when the request
//!    carries one.
//! 3. Message freshness (`issuedAt <= now < expirationTime`).
//! 4. Signature over the canonical text.
//! 5. For SDK sign-ins, the app's blacklist then whitelist.
//! 6. Upsert the principal, open a session, mint a token pair.

use axum::http::HeaderMap;

use super::claims::TokenPayload;
use super::gate::check_address_policy;
use super::message::SignInMessage;
use super::nonce::{cache_key_for_request, request_origin};
use super::token::TokenPair;
use super::{AuthError, Role};
use crate::state::AppState;
use crate::storage::{App, SdkUserRepository, Session, SessionRepository, UserRepository};

/// Who is signing in.
#[derive(Debug, Clone, Copy)]
pub enum WalletPrincipal<'a> {
    /// End user of the Quyx web app
    User,
    /// End user of a third-party app embedding the SDK
    SdkUser { app: &'a App },
}

impl WalletPrincipal<'_> {
    pub fn role(&self) -> Role {
        match self {
            WalletPrincipal::User => Role::User,
            WalletPrincipal::SdkUser { .. } => Role::SdkUser,
        }
    }
}

/// A completed sign-in.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub tokens: TokenPair,
}

/// Run the full sign-in pipeline for a signed wallet message.
pub fn login_with_wallet(
    state: &AppState,
    headers: &HeaderMap,
    user_agent: Option<String>,
    message: &SignInMessage,
    signature: &str,
    principal: WalletPrincipal<'_>,
) -> Result<LoginOutcome, AuthError> {
    let key = cache_key_for_request(headers, message.address());
    if !state.nonces.consume_and_check(&key, message.nonce())? {
        return Err(AuthError::NonceMismatch);
    }

    if let Some(origin) = request_origin(headers) {
        if !domain_matches_origin(message.domain(), &origin) {
            return Err(AuthError::DomainMismatch);
        }
    }

    message.check_fresh(state.clock.now())?;

    let verification = message.verify_signature(signature);
    if !verification.valid {
        tracing::info!(address = %message.address(), "Sign-in signature rejected");
        return Err(AuthError::SignatureInvalid);
    }

    let identifier = match principal {
        WalletPrincipal::User => {
            UserRepository::new(&state.db)
                .upsert_by_address(message.address())?
                .id
        }
        WalletPrincipal::SdkUser { app } => {
            check_address_policy(app, message.address())?;
            SdkUserRepository::new(&state.db)
                .upsert(&app.id, message.address())?
                .id
        }
    };

    let role = principal.role();
    let session = SessionRepository::new(&state.db).create(&identifier, role, user_agent)?;
    let tokens = state.tokens.issue_pair(&TokenPayload {
        session: session.id.clone(),
        role,
        identifier,
    })?;

    tracing::info!(session_id = %session.id, role = %role, "Wallet sign-in succeeded");
    Ok(LoginOutcome { session, tokens })
}

/// The signed domain is an RFC 3986 authority (`host[:port]`); the origin
/// is `scheme://host[:port]` with default ports already dropped.
fn domain_matches_origin(domain: &str, origin: &str) -> bool {
    let authority = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    domain.trim().eq_ignore_ascii_case(authority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::message::{ChainLabel, SiweMessage, SiwsMessage};
    use crate::auth::nonce::cache_key;
    use crate::auth::verifier::tests::{
        ed25519_address, ed25519_key, ed25519_sign, evm_sign, evm_signer,
    };
    use crate::state::test_support::test_state;
    use crate::storage::{AppGating, AppRepository, NewApp};
    use axum::http::{header, HeaderValue};
    use chrono::{Duration, SecondsFormat};

    fn site_a_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://site.a"));
        headers
    }

    fn siwe_for(state: &AppState, nonce: &str) -> SiweMessage {
        let now = state.clock.now();
        SiweMessage {
            domain: "site.a".to_string(),
            address: evm_signer().address().to_checksum(None),
            statement: None,
            uri: "https://site.a".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            nonce: nonce.to_string(),
            issued_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            expiration_time: Some(
                (now + Duration::minutes(10)).to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        }
    }

    fn siws_for(state: &AppState, nonce: &str) -> SiwsMessage {
        SiwsMessage {
            domain: "site.a".to_string(),
            address: ed25519_address(&ed25519_key()),
            statement: None,
            chain_id: ChainLabel::Name("devnet".to_string()),
            nonce: nonce.to_string(),
            issued_at: state
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            expiration_time: (state.clock.now() + Duration::minutes(10))
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    fn issue_nonce(state: &AppState, address: &str) -> String {
        state
            .nonces
            .issue(&cache_key(Some("https://site.a"), address))
            .value
    }

    fn demo_app(state: &AppState, gating: AppGating) -> App {
        AppRepository::new(&state.db)
            .create(NewApp {
                owner: "dev-1".to_string(),
                name: "demo".to_string(),
                url: "https://site.a".to_string(),
                description: "demo".to_string(),
                gating,
            })
            .unwrap()
    }

    #[test]
    fn siwe_login_end_to_end() {
        let (state, _) = test_state();
        let signer = evm_signer();
        let address = signer.address().to_checksum(None);

        // Nonce requested with a lowercased address still matches
        let nonce = issue_nonce(&state, &address.to_lowercase());
        let message = SignInMessage::Siwe(siwe_for(&state, &nonce));
        let signature = evm_sign(&signer, &message.render());

        let outcome = login_with_wallet(
            &state,
            &site_a_headers(),
            Some("test-agent".to_string()),
            &message,
            &signature,
            WalletPrincipal::User,
        )
        .unwrap();

        let claims = state
            .tokens
            .verify(&outcome.tokens.access_token)
            .decoded
            .unwrap();
        assert_eq!(claims.payload.role, Role::User);
        let session = SessionRepository::new(&state.db)
            .find(&claims.payload.session)
            .unwrap()
            .unwrap();
        assert!(session.is_active);
        assert_eq!(session.user_agent.as_deref(), Some("test-agent"));

        let user = UserRepository::new(&state.db)
            .find_by_address(&address)
            .unwrap()
            .unwrap();
        assert_eq!(user.id, claims.payload.identifier);
    }

    #[test]
    fn replayed_nonce_is_rejected() {
        let (state, _) = test_state();
        let signer = evm_signer();
        let nonce = issue_nonce(&state, &signer.address().to_checksum(None));
        let message = SignInMessage::Siwe(siwe_for(&state, &nonce));
        let signature = evm_sign(&signer, &message.render());
        let headers = site_a_headers();

        login_with_wallet(&state, &headers, None, &message, &signature, WalletPrincipal::User)
            .unwrap();
        let replay =
            login_with_wallet(&state, &headers, None, &message, &signature, WalletPrincipal::User);
        assert!(matches!(replay, Err(AuthError::NonceExpiredOrMissing)));
    }

    #[test]
    fn failed_signature_still_burns_nonce() {
        let (state, _) = test_state();
        let signer = evm_signer();
        let nonce = issue_nonce(&state, &signer.address().to_checksum(None));
        let message = SignInMessage::Siwe(siwe_for(&state, &nonce));
        let headers = site_a_headers();

        let bad = evm_sign(&signer, "something else");
        assert!(matches!(
            login_with_wallet(&state, &headers, None, &message, &bad, WalletPrincipal::User),
            Err(AuthError::SignatureInvalid)
        ));

        let good = evm_sign(&signer, &message.render());
        assert!(matches!(
            login_with_wallet(&state, &headers, None, &message, &good, WalletPrincipal::User),
            Err(AuthError::NonceExpiredOrMissing)
        ));
    }

    #[test]
    fn nonce_from_other_origin_is_not_found() {
        let (state, _) = test_state();
        let signer = evm_signer();
        let nonce = issue_nonce(&state, &signer.address().to_checksum(None));
        let message = SignInMessage::Siwe(siwe_for(&state, &nonce));
        let signature = evm_sign(&signer, &message.render());

        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://site.b"));
        assert!(matches!(
            login_with_wallet(&state, &headers, None, &message, &signature, WalletPrincipal::User),
            Err(AuthError::NonceExpiredOrMissing)
        ));
    }

    #[test]
    fn wrong_nonce_value_is_mismatch() {
        let (state, _) = test_state();
        let signer = evm_signer();
        issue_nonce(&state, &signer.address().to_checksum(None));
        let message = SignInMessage::Siwe(siwe_for(&state, "not-the-nonce"));
        let signature = evm_sign(&signer, &message.render());

        assert!(matches!(
            login_with_wallet(
                &state,
                &site_a_headers(),
                None,
                &message,
                &signature,
                WalletPrincipal::User
            ),
            Err(AuthError::NonceMismatch)
        ));
    }

    #[test]
    fn expired_nonce_fails_even_with_valid_signature() {
        let (state, clock) = test_state();
        let signer = evm_signer();
        let nonce = issue_nonce(&state, &signer.address().to_checksum(None));
        let message = SignInMessage::Siwe(siwe_for(&state, &nonce));
        let signature = evm_sign(&signer, &message.render());

        clock.advance(Duration::minutes(5) + Duration::seconds(1));
        assert!(matches!(
            login_with_wallet(
                &state,
                &site_a_headers(),
                None,
                &message,
                &signature,
                WalletPrincipal::User
            ),
            Err(AuthError::NonceExpiredOrMissing)
        ));
    }

    #[test]
    fn domain_must_match_origin() {
        let (state, _) = test_state();
        let signer = evm_signer();
        let nonce = issue_nonce(&state, &signer.address().to_checksum(None));
        let mut fields = siwe_for(&state, &nonce);
        fields.domain = "site.b".to_string();
        let message = SignInMessage::Siwe(fields);
        let signature = evm_sign(&signer, &message.render());

        assert!(matches!(
            login_with_wallet(
                &state,
                &site_a_headers(),
                None,
                &message,
                &signature,
                WalletPrincipal::User
            ),
            Err(AuthError::DomainMismatch)
        ));
    }

    #[test]
    fn siws_login_creates_sdk_user() {
        let (state, _) = test_state();
        let app = demo_app(&state, AppGating::default());
        let key = ed25519_key();
        let address = ed25519_address(&key);

        let nonce = issue_nonce(&state, &address);
        let message = SignInMessage::Siws(siws_for(&state, &nonce));
        let signature = ed25519_sign(&key, &message.render());

        let outcome = login_with_wallet(
            &state,
            &site_a_headers(),
            None,
            &message,
            &signature,
            WalletPrincipal::SdkUser { app: &app },
        )
        .unwrap();
        assert_eq!(outcome.session.role, Role::SdkUser);

        let users = SdkUserRepository::new(&state.db)
            .list_active_for_app(&app.id)
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].address, address);
        assert_eq!(users[0].id, outcome.session.identifier);
    }

    #[test]
    fn blacklisted_signer_is_blocked_even_if_whitelisted() {
        let (state, _) = test_state();
        let key = ed25519_key();
        let address = ed25519_address(&key);
        let app = demo_app(
            &state,
            AppGating {
                blacklisted_addresses: Some(vec![address.clone()]),
                whitelisted_addresses: Some(vec![address.clone()]),
                ..Default::default()
            },
        );

        let nonce = issue_nonce(&state, &address);
        let message = SignInMessage::Siws(siws_for(&state, &nonce));
        let signature = ed25519_sign(&key, &message.render());

        let result = login_with_wallet(
            &state,
            &site_a_headers(),
            None,
            &message,
            &signature,
            WalletPrincipal::SdkUser { app: &app },
        );
        assert!(matches!(result, Err(AuthError::AddressBlocked(a)) if a == address));
        assert!(SdkUserRepository::new(&state.db)
            .list_active_for_app(&app.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn domain_comparison_uses_authority() {
        assert!(domain_matches_origin("site.a", "https://site.a"));
        assert!(domain_matches_origin("Site.A:8080", "http://site.a:8080"));
        assert!(!domain_matches_origin("site.a", "https://site.a:8443"));
        assert!(!domain_matches_origin("evil.site.a", "https://site.a"));
    }
}
