// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the caller of a request.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth, SdkApp(app): SdkApp) -> impl IntoResponse {
//!     // user is AuthenticatedUser, app is the SDK app in scope
//! }
//! ```
//!
//! Extractors read the [`CallerContext`] left by `resolve_caller`. Outside
//! that middleware, `Auth` falls back to authenticating the request itself.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::gate::CallerContext;
use super::middleware::authenticate;
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;
use crate::storage::App;

/// Extractor for authenticated principals of any role.
///
/// Role restrictions are applied per route with `require_roles`.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already resolved the caller
        if let Some(ctx) = parts.extensions.get::<CallerContext>() {
            return ctx.principal.clone().map(Auth).ok_or(AuthError::Unauthorized);
        }

        authenticate(state, &parts.headers)
            .principal
            .map(Auth)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// The SDK app in scope, resolved by API key or client id.
pub struct SdkApp(pub App);

impl<S: Send + Sync> FromRequestParts<S> for SdkApp {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<CallerContext>()
            .ok_or(AuthError::MissingAppCredentials)?;
        ctx.require_app().cloned().map(SdkApp)
    }
}

/// The SDK app in scope, resolved by its secret API key only.
pub struct ApiKeyApp(pub App);

impl<S: Send + Sync> FromRequestParts<S> for ApiKeyApp {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<CallerContext>()
            .ok_or(AuthError::ApiKeyRequired)?;
        ctx.require_api_key_app().cloned().map(ApiKeyApp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenPayload;
    use crate::auth::gate::{AppCredential, SdkAccess};
    use crate::auth::Role;
    use crate::state::test_support::test_state;
    use crate::storage::{AppGating, SessionRepository};
    use axum::http::Request;
    use chrono::Utc;

    fn bare_parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn sample_app() -> App {
        App {
            id: "app-1".to_string(),
            name: "demo".to_string(),
            url: "https://site.a".to_string(),
            description: String::new(),
            owner: "dev-1".to_string(),
            api_key: "key".to_string(),
            client_id: "client".to_string(),
            gating: AppGating::default(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_credentials() {
        let (state, _) = test_state();
        let mut parts = bare_parts();

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_bearer_token() {
        let (state, _) = test_state();
        let session = SessionRepository::new(&state.db)
            .create("dev-1", Role::Dev, None)
            .unwrap();
        let token = state
            .tokens
            .issue_access(&TokenPayload {
                session: session.id,
                role: Role::Dev,
                identifier: "dev-1".to_string(),
            })
            .unwrap();

        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", token))
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap().0.identifier, "dev-1");
    }

    #[tokio::test]
    async fn auth_extractor_prefers_caller_context() {
        let (state, _) = test_state();
        let mut parts = bare_parts();

        let user = AuthenticatedUser {
            session: "sess".to_string(),
            role: Role::User,
            identifier: "user_from_middleware".to_string(),
            expires_at: 0,
        };
        parts.extensions.insert(CallerContext {
            principal: Some(user),
            ..Default::default()
        });

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap().0.identifier, "user_from_middleware");
    }

    #[tokio::test]
    async fn optional_auth_returns_none_without_user() {
        let (state, _) = test_state();
        let mut parts = bare_parts();

        let result = OptionalAuth::from_request_parts(&mut parts, &state).await;
        assert!(result.unwrap().0.is_none());
    }

    #[tokio::test]
    async fn sdk_app_extractors_follow_credential_kind() {
        let mut parts = bare_parts();
        parts.extensions.insert(CallerContext {
            sdk: SdkAccess::Granted {
                app: sample_app(),
                via: AppCredential::ClientId,
            },
            ..Default::default()
        });

        let app = SdkApp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(app.0.id, "app-1");
        assert!(matches!(
            ApiKeyApp::from_request_parts(&mut parts, &()).await,
            Err(AuthError::ApiKeyRequired)
        ));

        let mut bare = bare_parts();
        assert!(matches!(
            SdkApp::from_request_parts(&mut bare, &()).await,
            Err(AuthError::MissingAppCredentials)
        ));
    }
}
