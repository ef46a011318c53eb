// src/common/cookies.rs

use axum::http::HeaderValue;
use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::Duration;

use crate::common::error::AppError;

pub const SESSION_COOKIE: &str = "session_token";
pub const ADMIN_SESSION_COOKIE: &str = "admin_session";
pub const TENANT_COOKIE: &str = "tenant";

/// HttpOnly, SameSite=Lax, path `/`. `max_age` of `None` makes a browser-session cookie.
#[derive(Debug, Clone)]
pub struct CookieSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub max_age_secs: Option<i64>,
    pub domain: Option<&'a str>,
    pub secure: bool,
}

impl CookieSpec<'_> {
    fn build(&self) -> Cookie<'static> {
        let mut builder = base(self.name, self.value, self.domain).secure(self.secure);
        if let Some(max_age) = self.max_age_secs {
            builder = builder.max_age(Duration::seconds(max_age));
        }
        builder.build()
    }

    pub fn to_header(&self) -> Result<HeaderValue, AppError> {
        HeaderValue::from_str(&self.build().to_string())
            .map_err(|e| anyhow::anyhow!("Invalid Set-Cookie value for {}: {}", self.name, e).into())
    }
}

fn base(name: &str, value: &str, domain: Option<&str>) -> cookie::CookieBuilder<'static> {
    let builder = Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    match domain {
        Some(domain) => builder.domain(domain.to_string()),
        None => builder,
    }
}

/// Expires the cookie immediately. Domain must match the one it was set with.
pub fn clear_cookie(name: &str, domain: Option<&str>) -> HeaderValue {
    let cookie = base(name, "", domain).removal().build();
    HeaderValue::from_str(&cookie.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("deleted=; Max-Age=0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let header = CookieSpec {
            name: SESSION_COOKIE,
            value: "abc",
            max_age_secs: Some(60),
            domain: Some(".app.example.com"),
            secure: true,
        }
        .to_header()
        .unwrap();

        let cookie = Cookie::parse(header.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.domain(), Some("app.example.com"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(60)));
    }

    #[test]
    fn plain_http_cookie_is_not_secure() {
        let header = CookieSpec {
            name: ADMIN_SESSION_COOKIE,
            value: "abc",
            max_age_secs: None,
            domain: None,
            secure: false,
        }
        .to_header()
        .unwrap();

        let raw = header.to_str().unwrap();
        assert!(raw.starts_with("admin_session=abc;"));
        assert!(!raw.contains("Secure"));
        assert!(!raw.contains("Max-Age"));
        assert!(!raw.contains("Domain"));
    }

    #[test]
    fn cleared_cookie_has_zero_max_age() {
        let header = clear_cookie(ADMIN_SESSION_COOKIE, None);
        let cookie = Cookie::parse(header.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.name(), ADMIN_SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
