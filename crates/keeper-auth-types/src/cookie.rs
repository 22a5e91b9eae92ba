//! Cookie builders for the refresh token.
//!
//! The access token travels in the response body and the `Authorization`
//! header; only the refresh token is kept in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Path the refresh cookie is scoped to (refresh and logout live here).
pub const REFRESH_TOKEN_PATH: &str = "/auth/token";

/// Cookie Max-Age in seconds (60 minutes, same as the stored token).
pub const REFRESH_TOKEN_MAX_AGE: i64 = 3600;

/// Set the refresh-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::{CookieJar, SameSite};
/// use keeper_auth_types::cookie::{set_refresh_token_cookie, REFRESH_TOKEN_COOKIE};
///
/// let jar = set_refresh_token_cookie(CookieJar::new(), "opaque".to_string());
/// let cookie = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "opaque");
/// assert_eq!(cookie.path(), Some("/auth/token"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
/// assert_eq!(cookie.same_site(), Some(SameSite::None));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_refresh_token_cookie(jar: CookieJar, value: String) -> CookieJar {
    jar.add(refresh_cookie(value, Duration::seconds(REFRESH_TOKEN_MAX_AGE)))
}

/// Expire the refresh-token cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use keeper_auth_types::cookie::{
///     clear_refresh_token_cookie, set_refresh_token_cookie, REFRESH_TOKEN_COOKIE,
/// };
///
/// let jar = set_refresh_token_cookie(CookieJar::new(), "opaque".to_string());
/// let jar = clear_refresh_token_cookie(jar);
/// let cookie = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "");
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_refresh_token_cookie(jar: CookieJar) -> CookieJar {
    jar.add(refresh_cookie(String::new(), Duration::ZERO))
}

/// Read the refresh-token value, ignoring an empty cookie.
pub fn refresh_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

fn refresh_cookie(value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, value))
        .path(REFRESH_TOKEN_PATH)
        .max_age(max_age)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build()
}
