// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential cookies.
//!
//! Browsers get both tokens as `HttpOnly` cookies in addition to the JSON
//! body; server-to-server callers ignore them and use headers instead.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;

use super::token::TokenPair;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn credential_cookie(
    name: &'static str,
    value: String,
    ttl: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(cookie::time::Duration::seconds(ttl.num_seconds()))
        .build()
}

pub fn access_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    credential_cookie(ACCESS_COOKIE, token, ttl, secure)
}

/// Attach both tokens of a fresh login.
pub fn set_token_cookies(
    jar: CookieJar,
    tokens: &TokenPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    secure: bool,
) -> CookieJar {
    jar.add(access_cookie(tokens.access_token.clone(), access_ttl, secure))
        .add(credential_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token.clone(),
            refresh_ttl,
            secure,
        ))
}

/// Expire both credential cookies.
pub fn clear_token_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}
