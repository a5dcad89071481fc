// Framework-agnostic request handling: pulling a session id out of
// incoming headers and the CSRF origin check that gates it.
//
// The engine never sees a request type, only the handful of header values
// a caller extracts from whatever HTTP stack it runs on.

use url::Url;

use lucia_core::{LuciaError, Result};

use crate::auth::{Auth, UserAttributes};
use crate::cookies::get_cookie;

/// Session id from a `Cookie` header, if the named cookie is present.
pub fn read_session_cookie(cookie_header: Option<&str>, cookie_name: &str) -> Option<String> {
    get_cookie(cookie_header, cookie_name)
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn read_bearer_token(authorization_header: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization_header?.split_once(' ')?;
    if scheme != "Bearer" {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

// Scheme, host and port must all match. Unparseable urls never match.
fn same_origin(request_url: &str, origin: &str) -> bool {
    let Ok(request_url) = Url::parse(request_url) else {
        return false;
    };
    let Ok(origin) = Url::parse(origin) else {
        return false;
    };
    request_url.origin() == origin.origin()
}

impl<T: UserAttributes> Auth<T> {
    // ─── Requests ────────────────────────────────────────────────────

    /// Session cookie value under this instance's configured cookie name.
    pub fn read_session_cookie(&self, cookie_header: Option<&str>) -> Option<String> {
        read_session_cookie(cookie_header, &self.config.session_cookie.name)
    }

    /// Bearer token for callers that transport the session id outside
    /// cookies. Bearer requests are origin-free and skip the CSRF check.
    pub fn read_bearer_token<'a>(&self, authorization_header: Option<&'a str>) -> Option<&'a str> {
        read_bearer_token(authorization_header)
    }

    /// CSRF-check a request and extract its session cookie.
    ///
    /// GET and HEAD requests pass unconditionally. Any other method must
    /// carry an `Origin` header matching the request url's origin, unless
    /// CSRF protection is disabled in the configuration. A missing or
    /// foreign origin fails with [`LuciaError::InvalidRequest`] before the
    /// cookie is read.
    pub fn parse_request_headers(
        &self,
        method: &str,
        request_url: &str,
        origin_header: Option<&str>,
        cookie_header: Option<&str>,
    ) -> Result<Option<String>> {
        let method = method.to_uppercase();
        let csrf_check = method != "GET" && method != "HEAD";
        if csrf_check && self.config.csrf_protection {
            let valid = match origin_header {
                Some(origin) => same_origin(request_url, origin),
                None => false,
            };
            if !valid {
                tracing::warn!(
                    method = %method,
                    request_url,
                    origin = origin_header.unwrap_or("<none>"),
                    "cross-origin request rejected"
                );
                return Err(LuciaError::InvalidRequest);
            }
        }
        Ok(self.read_session_cookie(cookie_header))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lucia_memory::MemoryAdapter;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::config::Config;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestAttributes {
        username: String,
    }

    fn test_auth(config: Config) -> Auth<TestAttributes> {
        Auth::new(Arc::new(MemoryAdapter::new()), config)
    }

    #[test]
    fn bearer_tokens_require_the_bearer_scheme() {
        assert_eq!(read_bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(read_bearer_token(Some("Basic abc123")), None);
        assert_eq!(read_bearer_token(Some("Bearer ")), None);
        assert_eq!(read_bearer_token(Some("Bearer")), None);
        assert_eq!(read_bearer_token(None), None);
    }

    #[test]
    fn get_requests_skip_the_origin_check() {
        let auth = test_auth(Config::default());
        let cookie = auth
            .parse_request_headers(
                "GET",
                "https://example.com/api/user",
                None,
                Some("auth_session=abc"),
            )
            .unwrap();
        assert_eq!(cookie, Some("abc".to_string()));
    }

    #[test]
    fn post_without_an_origin_is_rejected() {
        let auth = test_auth(Config::default());
        let result =
            auth.parse_request_headers("POST", "https://example.com/api/user", None, None);
        assert!(matches!(result, Err(LuciaError::InvalidRequest)));
    }

    #[test]
    fn post_from_a_foreign_origin_is_rejected() {
        let auth = test_auth(Config::default());
        let result = auth.parse_request_headers(
            "post",
            "https://example.com/api/user",
            Some("https://attacker.example"),
            Some("auth_session=abc"),
        );
        assert!(matches!(result, Err(LuciaError::InvalidRequest)));
    }

    #[test]
    fn post_from_the_same_origin_passes() {
        let auth = test_auth(Config::default());
        let cookie = auth
            .parse_request_headers(
                "POST",
                "https://example.com:8443/api/user",
                Some("https://example.com:8443"),
                Some("auth_session=abc; theme=dark"),
            )
            .unwrap();
        assert_eq!(cookie, Some("abc".to_string()));
    }

    #[test]
    fn ports_are_part_of_the_origin() {
        let auth = test_auth(Config::default());
        let result = auth.parse_request_headers(
            "POST",
            "https://example.com:8443/api/user",
            Some("https://example.com"),
            None,
        );
        assert!(matches!(result, Err(LuciaError::InvalidRequest)));
    }

    #[test]
    fn disabling_csrf_protection_skips_the_check() {
        let auth = test_auth(Config::default().with_csrf_protection(false));
        let cookie = auth
            .parse_request_headers("POST", "https://example.com/api/user", None, None)
            .unwrap();
        assert_eq!(cookie, None);
    }

    #[test]
    fn cookie_name_follows_the_configuration() {
        let auth = test_auth(Config::default());
        assert_eq!(
            auth.read_session_cookie(Some("auth_session=xyz")),
            Some("xyz".to_string())
        );
        assert_eq!(auth.read_session_cookie(Some("other=xyz")), None);
    }
}
