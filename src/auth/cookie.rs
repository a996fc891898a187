use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::CookieConfig;

pub const AUTH_COOKIE_NAME: &str = "jwt";

/// Cookie carrying the login token; never readable from page scripts.
pub fn build_auth_cookie(
    token: String,
    max_age: std::time::Duration,
    cfg: &CookieConfig,
) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.secure)
        .build()
}

pub fn build_clear_cookie(cfg: &CookieConfig) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.secure)
        .build()
}
