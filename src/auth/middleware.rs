// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request middleware for the access gate.
//!
//! `resolve_caller` runs on every request and never rejects; the route
//! guards below it turn the resolved [`CallerContext`] into 401s.
//!
//! ```rust,ignore
//! Router::new()
//!     .route(
//!         "/user/current",
//!         get(user::current_user).route_layer(from_fn_with_state(
//!             RouteGuard::new(&[Role::User]),
//!             require_roles,
//!         )),
//!     )
//!     .layer(from_fn_with_state(state.clone(), resolve_caller));
//! ```

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::claims::AuthenticatedUser;
use super::cookies::{access_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use super::gate::{
    resolve_app, CallerContext, ACCESS_TOKEN_RESPONSE_HEADER, REFRESH_HEADER,
};
use super::{AuthError, Role};
use crate::error::ErrorDetail;
use crate::state::AppState;
use crate::storage::{AppLog, AuditRepository, SessionRepository};

/// Principal resolved from request credentials, plus a replacement access
/// token when the presented one had expired.
pub struct Authentication {
    pub principal: Option<AuthenticatedUser>,
    pub reissued_access_token: Option<String>,
}

impl Authentication {
    fn anonymous() -> Self {
        Self {
            principal: None,
            reissued_access_token: None,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn refresh_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(&REFRESH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
}

/// Resolve the caller's principal.
///
/// - A valid access token counts only while its session is active.
/// - An expired (but authentic) or missing access token falls back to the
///   refresh token, which mints a new access token.
/// - Anything else is anonymous.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Authentication {
    let jar = CookieJar::from_headers(headers);
    let access = bearer_token(headers).or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()));

    if let Some(token) = access.as_deref() {
        let verification = state.tokens.verify(token);
        if let Some(claims) = verification.decoded {
            let user = AuthenticatedUser::from_claims(claims);
            return match SessionRepository::new(&state.db).find(&user.session) {
                Ok(Some(session)) if session.is_active => Authentication {
                    principal: Some(user),
                    reissued_access_token: None,
                },
                Ok(_) => Authentication::anonymous(),
                Err(e) => {
                    tracing::warn!(error = %e, "Session lookup failed");
                    Authentication::anonymous()
                }
            };
        }
        if !verification.expired {
            return Authentication::anonymous();
        }
    }

    let Some(refresh) = refresh_token(headers, &jar) else {
        return Authentication::anonymous();
    };
    match state.tokens.reissue_access(&refresh, &state.db) {
        Ok(reissued) => Authentication {
            principal: Some(AuthenticatedUser::from_claims(reissued.claims)),
            reissued_access_token: Some(reissued.access_token),
        },
        Err(e) => {
            tracing::debug!(error = %e, "Refresh token rejected");
            Authentication::anonymous()
        }
    }
}

/// Populate [`CallerContext`] for the request and record the outcome in the
/// app log when an SDK app is in scope.
pub async fn resolve_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let route = request.uri().path().to_string();

    let auth = authenticate(&state, request.headers());
    let sdk = resolve_app(
        request.headers(),
        &state.db,
        state.dev_dashboard_host.as_deref(),
    );
    let app_in_scope = sdk.app().map(|app| (app.id.clone(), app.owner.clone()));

    request.extensions_mut().insert(CallerContext {
        principal: auth.principal,
        sdk,
        reissued_access_token: auth.reissued_access_token.clone(),
    });

    let mut response = next.run(request).await;

    if let Some(token) = auth.reissued_access_token {
        attach_reissued_token(&state, &mut response, token);
    }

    if let Some((app_id, owner)) = app_in_scope {
        let mut log = AppLog::new(app_id, owner, route, started);
        if !response.status().is_success() {
            let detail = response
                .extensions()
                .get::<ErrorDetail>()
                .map(|d| d.0.clone())
                .unwrap_or_else(|| response.status().to_string());
            log = log.failed(detail);
        }
        AuditRepository::new(&state.db).append_quietly(&log);
    }

    response
}

/// Hand a reissued access token back via header and cookie.
///
/// Skipped when the handler already set or cleared the access cookie
/// (fresh login, logout).
fn attach_reissued_token(state: &AppState, response: &mut Response, token: String) {
    let cookie_prefix = format!("{ACCESS_COOKIE}=");
    let handler_set_cookie = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&cookie_prefix));
    if handler_set_cookie {
        return;
    }

    let cookie = access_cookie(token.clone(), state.tokens.access_ttl(), state.config.cookie_secure);
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&token) {
        response
            .headers_mut()
            .insert(ACCESS_TOKEN_RESPONSE_HEADER, value);
    }
}

fn caller_context(request: &Request) -> Option<&CallerContext> {
    request.extensions().get::<CallerContext>()
}

/// Role allow-list for one route.
#[derive(Clone)]
pub struct RouteGuard {
    pub allowed: &'static [Role],
}

impl RouteGuard {
    pub fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }
}

/// Reject unless the caller's role is on the route's allow-list.
pub async fn require_roles(
    State(guard): State<RouteGuard>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = caller_context(&request)
        .map(|ctx| ctx.require_role(guard.allowed).map(|_| ()))
        .unwrap_or(Err(AuthError::Unauthorized));

    match allowed {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Reject unless an SDK app was resolved (API key or client id).
pub async fn require_sdk_app(request: Request, next: Next) -> Response {
    let resolved = caller_context(&request)
        .map(|ctx| ctx.require_app().map(|_| ()))
        .unwrap_or(Err(AuthError::MissingAppCredentials));

    match resolved {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Reject unless an SDK app was resolved by its secret API key.
pub async fn require_sdk_api_key(request: Request, next: Next) -> Response {
    let resolved = caller_context(&request)
        .map(|ctx| ctx.require_api_key_app().map(|_| ()))
        .unwrap_or(Err(AuthError::ApiKeyRequired));

    match resolved {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
