// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie construction.
//!
//! Removal cookies carry the same attributes as the cookies they replace, so
//! browsers match and drop them.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Access token cookie.
pub const ACCESS_COOKIE: &str = "auth-token";
/// Refresh token cookie.
pub const REFRESH_COOKIE: &str = "refresh-token";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn ttl(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

/// Add both session cookies to the jar.
pub fn with_session(
    jar: CookieJar,
    access_token: String,
    access_ttl_secs: u64,
    refresh_token: String,
    refresh_ttl_secs: u64,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        access_token,
        ttl(access_ttl_secs),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        refresh_token,
        ttl(refresh_ttl_secs),
        secure,
    ))
}

/// Overwrite both session cookies with expired, empty ones.
pub fn without_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        String::new(),
        Duration::ZERO,
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        String::new(),
        Duration::ZERO,
        secure,
    ))
}

pub fn access_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, ACCESS_COOKIE)
}

pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, REFRESH_COOKIE)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
