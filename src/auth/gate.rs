// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access gate: per-request caller context and SDK app resolution.
//!
//! Every request passes through `resolve_caller` (see `middleware.rs`),
//! which records two independent facts in a [`CallerContext`]:
//!
//! - the authenticated principal, if a live access token (or a refresh
//!   token backing an expired one) was presented;
//! - the SDK app in scope, if `Quyx-Api-Key` or `Quyx-Client-Id` was sent.
//!
//! Routes then decide what they require. A failed app resolution is kept
//! as [`SdkAccess::Denied`] so routes that do not care about apps are not
//! affected by a bad header.

use axum::http::{HeaderMap, HeaderName};

use super::claims::AuthenticatedUser;
use super::nonce::request_origin;
use super::{AuthError, Role};
use crate::storage::{App, AppRepository, AuthDatabase};

/// Secret app credential for server-to-server calls.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("quyx-api-key");
/// Public app credential for browser and mobile embeds.
pub const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("quyx-client-id");
/// Mobile bundle id, matched against `allowedBundleIDs`.
pub const BUNDLE_ID_HEADER: HeaderName = HeaderName::from_static("bundle-id");
/// Refresh token for non-browser callers.
pub const REFRESH_HEADER: HeaderName = HeaderName::from_static("x-refresh");
/// Carries a reissued access token back to the caller.
pub const ACCESS_TOKEN_RESPONSE_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// How the app in scope was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCredential {
    ApiKey,
    ClientId,
}

/// Outcome of resolving the SDK app for a request.
#[derive(Debug, Clone, Default)]
pub enum SdkAccess {
    /// No app credential headers were sent
    #[default]
    Absent,
    Granted { app: App, via: AppCredential },
    Denied(AuthError),
}

impl SdkAccess {
    pub fn app(&self) -> Option<&App> {
        match self {
            SdkAccess::Granted { app, .. } => Some(app),
            _ => None,
        }
    }
}

/// Everything the gate learned about the caller of one request.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub principal: Option<AuthenticatedUser>,
    pub sdk: SdkAccess,
    /// Set when an expired access token was replaced during this request
    pub reissued_access_token: Option<String>,
}

impl CallerContext {
    /// Require a principal whose role is in `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<&AuthenticatedUser, AuthError> {
        match &self.principal {
            Some(user) if user.has_role_in(allowed) => Ok(user),
            _ => Err(AuthError::Unauthorized),
        }
    }

    /// Require a resolved SDK app, by either credential.
    pub fn require_app(&self) -> Result<&App, AuthError> {
        match &self.sdk {
            SdkAccess::Granted { app, .. } => Ok(app),
            SdkAccess::Absent => Err(AuthError::MissingAppCredentials),
            SdkAccess::Denied(err) => Err(err.clone()),
        }
    }

    /// Require an SDK app resolved by its secret API key.
    pub fn require_api_key_app(&self) -> Result<&App, AuthError> {
        match &self.sdk {
            SdkAccess::Granted {
                app,
                via: AppCredential::ApiKey,
            } => Ok(app),
            SdkAccess::Granted { .. } | SdkAccess::Absent => Err(AuthError::ApiKeyRequired),
            SdkAccess::Denied(err) => Err(err.clone()),
        }
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &HeaderName) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the SDK app named by the request's credential headers.
///
/// An API key is trusted outright. A client id additionally has to pass the
/// app's bundle id and domain restrictions. `dev_dashboard_host` is always
/// allowed so developers can exercise their apps from the dashboard.
pub fn resolve_app(
    headers: &HeaderMap,
    db: &AuthDatabase,
    dev_dashboard_host: Option<&str>,
) -> SdkAccess {
    let api_key = header_str(headers, &API_KEY_HEADER);
    let client_id = header_str(headers, &CLIENT_ID_HEADER);
    if api_key.is_none() && client_id.is_none() {
        return SdkAccess::Absent;
    }

    match lookup_app(headers, db, api_key, client_id, dev_dashboard_host) {
        Ok((app, via)) => SdkAccess::Granted { app, via },
        Err(err) => {
            tracing::debug!(error = %err, "SDK app credentials rejected");
            SdkAccess::Denied(err)
        }
    }
}

fn lookup_app(
    headers: &HeaderMap,
    db: &AuthDatabase,
    api_key: Option<&str>,
    client_id: Option<&str>,
    dev_dashboard_host: Option<&str>,
) -> Result<(App, AppCredential), AuthError> {
    let apps = AppRepository::new(db);

    let (app, via) = if let Some(api_key) = api_key {
        let app = apps.find_by_api_key(api_key)?.ok_or(AuthError::AppNotFound)?;
        (app, AppCredential::ApiKey)
    } else {
        let client_id = client_id.ok_or(AuthError::MissingAppCredentials)?;
        let app = apps
            .find_by_client_id(client_id)?
            .ok_or(AuthError::AppNotFound)?;
        check_client_restrictions(&app, headers, dev_dashboard_host)?;
        (app, AppCredential::ClientId)
    };

    if !app.is_active {
        return Err(AuthError::AppAccessBlocked);
    }
    Ok((app, via))
}

/// Bundle id and domain checks for client-id callers.
///
/// A restriction list that is unset or empty does not restrict.
pub fn check_client_restrictions(
    app: &App,
    headers: &HeaderMap,
    dev_dashboard_host: Option<&str>,
) -> Result<(), AuthError> {
    if let Some(bundle_ids) = non_empty(&app.gating.allowed_bundle_ids) {
        let Some(bundle_id) = header_str(headers, &BUNDLE_ID_HEADER) else {
            return Err(AuthError::AppAccessBlocked);
        };
        if !bundle_ids.iter().any(|allowed| allowed == bundle_id) {
            return Err(AuthError::AppAccessBlocked);
        }
    }

    if let Some(domains) = non_empty(&app.gating.allowed_domains) {
        let Some(host) = request_origin(headers).as_deref().and_then(origin_host) else {
            return Err(AuthError::AppAccessBlocked);
        };
        let is_dashboard = dev_dashboard_host.is_some_and(|dev| dev.eq_ignore_ascii_case(&host));
        if !is_dashboard && !domains.iter().any(|d| domain_host(d) == host) {
            return Err(AuthError::AppAccessBlocked);
        }
    }

    Ok(())
}

/// Blacklist, then whitelist, for an SDK sign-in by `address`.
pub fn check_address_policy(app: &App, address: &str) -> Result<(), AuthError> {
    if let Some(blacklist) = non_empty(&app.gating.blacklisted_addresses) {
        if blacklist.iter().any(|a| same_address(a, address)) {
            return Err(AuthError::AddressBlocked(address.to_string()));
        }
    }
    if let Some(whitelist) = non_empty(&app.gating.whitelisted_addresses) {
        if !whitelist.iter().any(|a| same_address(a, address)) {
            return Err(AuthError::AddressNotWhitelisted(address.to_string()));
        }
    }
    Ok(())
}

fn non_empty(list: &Option<Vec<String>>) -> Option<&[String]> {
    list.as_deref().filter(|l| !l.is_empty())
}

/// EVM addresses compare case-insensitively, base58 exactly.
fn same_address(listed: &str, address: &str) -> bool {
    let listed = listed.trim();
    if listed.starts_with("0x") && address.starts_with("0x") {
        listed.eq_ignore_ascii_case(address)
    } else {
        listed == address
    }
}

fn origin_host(origin: &str) -> Option<String> {
    url::Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Allowed domains may be stored bare (`site.a`) or as a URL.
fn domain_host(entry: &str) -> String {
    let entry = entry.trim();
    origin_host(entry).unwrap_or_else(|| entry.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AppGating, NewApp};
    use axum::http::{header, HeaderValue};

    const DEV_HOST: Option<&str> = Some("dev.quyx.xyz");

    fn app_with(db: &AuthDatabase, gating: AppGating) -> App {
        AppRepository::new(db)
            .create(NewApp {
                owner: "dev-1".to_string(),
                name: "demo".to_string(),
                url: "https://site.a".to_string(),
                description: "demo app".to_string(),
                gating,
            })
            .unwrap()
    }

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn no_credentials_is_absent() {
        let db = AuthDatabase::in_memory().unwrap();
        assert!(matches!(
            resolve_app(&HeaderMap::new(), &db, DEV_HOST),
            SdkAccess::Absent
        ));
    }

    #[test]
    fn api_key_bypasses_client_restrictions() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                allowed_domains: Some(vec!["site.a".into()]),
                allowed_bundle_ids: Some(vec!["com.site.a".into()]),
                ..Default::default()
            },
        );

        let access = resolve_app(&headers(&[(API_KEY_HEADER, &app.api_key)]), &db, DEV_HOST);
        match access {
            SdkAccess::Granted { app: resolved, via } => {
                assert_eq!(resolved.id, app.id);
                assert_eq!(via, AppCredential::ApiKey);
            }
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[test]
    fn unknown_credentials_are_denied() {
        let db = AuthDatabase::in_memory().unwrap();
        let access = resolve_app(&headers(&[(CLIENT_ID_HEADER, "nope")]), &db, DEV_HOST);
        assert!(matches!(access, SdkAccess::Denied(AuthError::AppNotFound)));

        let access = resolve_app(&headers(&[(API_KEY_HEADER, "nope")]), &db, DEV_HOST);
        assert!(matches!(access, SdkAccess::Denied(AuthError::AppNotFound)));
    }

    #[test]
    fn client_id_enforces_domains() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                allowed_domains: Some(vec!["https://site.a".into()]),
                ..Default::default()
            },
        );

        let allowed = headers(&[
            (CLIENT_ID_HEADER, &app.client_id),
            (header::ORIGIN, "https://site.a"),
        ]);
        assert!(matches!(
            resolve_app(&allowed, &db, DEV_HOST),
            SdkAccess::Granted { via: AppCredential::ClientId, .. }
        ));

        let other = headers(&[
            (CLIENT_ID_HEADER, &app.client_id),
            (header::ORIGIN, "https://evil.b"),
        ]);
        assert!(matches!(
            resolve_app(&other, &db, DEV_HOST),
            SdkAccess::Denied(AuthError::AppAccessBlocked)
        ));

        let no_origin = headers(&[(CLIENT_ID_HEADER, &app.client_id)]);
        assert!(matches!(
            resolve_app(&no_origin, &db, DEV_HOST),
            SdkAccess::Denied(AuthError::AppAccessBlocked)
        ));

        let dashboard = headers(&[
            (CLIENT_ID_HEADER, &app.client_id),
            (header::REFERER, "https://dev.quyx.xyz/apps/1"),
        ]);
        assert!(matches!(
            resolve_app(&dashboard, &db, DEV_HOST),
            SdkAccess::Granted { .. }
        ));
    }

    #[test]
    fn client_id_enforces_bundle_ids() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                allowed_bundle_ids: Some(vec!["com.site.a".into()]),
                ..Default::default()
            },
        );

        let ok = headers(&[(CLIENT_ID_HEADER, &app.client_id), (BUNDLE_ID_HEADER, "com.site.a")]);
        assert!(matches!(resolve_app(&ok, &db, DEV_HOST), SdkAccess::Granted { .. }));

        let wrong = headers(&[(CLIENT_ID_HEADER, &app.client_id), (BUNDLE_ID_HEADER, "com.evil")]);
        assert!(matches!(
            resolve_app(&wrong, &db, DEV_HOST),
            SdkAccess::Denied(AuthError::AppAccessBlocked)
        ));
    }

    #[test]
    fn empty_restriction_lists_do_not_restrict() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                allowed_domains: Some(vec![]),
                allowed_bundle_ids: Some(vec![]),
                ..Default::default()
            },
        );
        let h = headers(&[(CLIENT_ID_HEADER, &app.client_id)]);
        assert!(matches!(resolve_app(&h, &db, DEV_HOST), SdkAccess::Granted { .. }));
    }

    #[test]
    fn inactive_app_is_blocked() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(&db, AppGating::default());
        AppRepository::new(&db).deactivate(&app.id, &app.owner).unwrap();

        let h = headers(&[(API_KEY_HEADER, &app.api_key)]);
        assert!(matches!(
            resolve_app(&h, &db, DEV_HOST),
            SdkAccess::Denied(AuthError::AppAccessBlocked)
        ));
    }

    #[test]
    fn blacklist_wins_over_whitelist() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                blacklisted_addresses: Some(vec!["0xAbC".into()]),
                whitelisted_addresses: Some(vec!["0xabc".into(), "0xdef".into()]),
                ..Default::default()
            },
        );

        assert!(matches!(
            check_address_policy(&app, "0xabc"),
            Err(AuthError::AddressBlocked(_))
        ));
        assert!(check_address_policy(&app, "0xDEF").is_ok());
        assert!(matches!(
            check_address_policy(&app, "0x123"),
            Err(AuthError::AddressNotWhitelisted(_))
        ));
    }

    #[test]
    fn base58_addresses_match_exactly() {
        let db = AuthDatabase::in_memory().unwrap();
        let app = app_with(
            &db,
            AppGating {
                blacklisted_addresses: Some(vec!["AbC".into()]),
                ..Default::default()
            },
        );
        assert!(check_address_policy(&app, "AbC").is_err());
        assert!(check_address_policy(&app, "abc").is_ok());
    }

    #[test]
    fn caller_context_requirements() {
        let ctx = CallerContext::default();
        assert!(matches!(ctx.require_role(Role::ALL), Err(AuthError::Unauthorized)));
        assert!(matches!(ctx.require_app(), Err(AuthError::MissingAppCredentials)));
        assert!(matches!(ctx.require_api_key_app(), Err(AuthError::ApiKeyRequired)));

        let denied = CallerContext {
            sdk: SdkAccess::Denied(AuthError::AppNotFound),
            ..Default::default()
        };
        assert!(matches!(denied.require_app(), Err(AuthError::AppNotFound)));
        assert!(matches!(denied.require_api_key_app(), Err(AuthError::AppNotFound)));
    }
}
