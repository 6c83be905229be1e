//! Transport binding: the credential pair travels as two HTTP-only cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::services::TokenPair;

pub const ACCESS_COOKIE_NAME: &str = "auth_access_token";
pub const REFRESH_COOKIE_NAME: &str = "auth_refresh_token";

fn credential_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .build()
}

/// Attach both credentials to the response jar, each capped at its own TTL.
pub fn attach_token_pair(
    jar: CookieJar,
    pair: &TokenPair,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    secure: bool,
) -> CookieJar {
    jar.add(credential_cookie(
        ACCESS_COOKIE_NAME,
        pair.access_token.clone(),
        access_ttl_seconds,
        secure,
    ))
    .add(credential_cookie(
        REFRESH_COOKIE_NAME,
        pair.refresh_token.clone(),
        refresh_ttl_seconds,
        secure,
    ))
}

/// Clear both credential cookies.
pub fn clear_token_pair(jar: CookieJar) -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();
    let refresh = Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    jar.add(access).add(refresh)
}

/// Get the access credential from the request jar.
pub fn access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Get the refresh credential from the request jar.
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string())
}
