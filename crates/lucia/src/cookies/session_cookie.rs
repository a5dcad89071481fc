// Session cookie derivation.
//
// The cookie is derived, never stored: its value is the session id and its
// expiry tracks the session's idle window, so the cookie dies no earlier
// than the session it names.

use lucia_core::Env;

use crate::auth::session::Session;
use crate::config::CookieConfig;
use crate::cookies::utils::{serialize_cookie, CookieAttributes};

/// Cookie lifetime used when [`CookieConfig::expires`] is false: one year,
/// so renewals never require a re-issued cookie.
pub const MAX_COOKIE_AGE: i64 = 1000 * 60 * 60 * 24 * 365;

/// A session cookie, ready to render into a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
}

impl SessionCookie {
    /// Render the `Set-Cookie` header value.
    pub fn serialize(&self) -> String {
        serialize_cookie(&self.name, &self.value, &self.attributes)
    }
}

/// Derive the cookie for a session, or the blank cookie that clears it
/// when `session` is `None`.
///
/// The cookie is always `HttpOnly`, and `Secure` exactly in production;
/// `SameSite`, `Path`, and `Domain` come from the config. The blank cookie
/// has an empty value and expires at the epoch.
pub fn create_session_cookie(
    session: Option<&Session>,
    env: Env,
    config: &CookieConfig,
) -> SessionCookie {
    let mut attributes = CookieAttributes {
        max_age: None,
        expires: None,
        domain: config.domain.clone(),
        path: Some(config.path.clone()),
        secure: env.is_prod(),
        http_only: true,
        same_site: Some(config.same_site),
    };

    let value = match session {
        Some(session) => {
            attributes.expires = if config.expires {
                Some(session.idle_expires)
            } else {
                Some(chrono::Utc::now().timestamp_millis() + MAX_COOKIE_AGE)
            };
            session.session_id.clone()
        }
        None => {
            attributes.max_age = Some(0);
            attributes.expires = Some(0);
            String::new()
        }
    };

    SessionCookie {
        name: config.name.clone(),
        value,
        attributes,
    }
}
