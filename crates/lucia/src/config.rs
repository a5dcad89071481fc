// Engine configuration.
//
// Everything here has a working default: one day of full trust, two weeks
// of renewability, CSRF protection and dead-session cleanup on, a Lax
// `auth_session` cookie scoped to `/`.

use lucia_core::Env;

use crate::cookies::utils::SameSite;

/// Default length of the fully-trusted session window: 24 hours.
pub const DEFAULT_ACTIVE_PERIOD: i64 = 1000 * 60 * 60 * 24;

/// Default length of the renewable window that follows it: 14 days.
pub const DEFAULT_IDLE_PERIOD: i64 = 1000 * 60 * 60 * 24 * 14;

/// Default session cookie name.
pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// Configuration for [`Auth`](crate::Auth).
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment; `Prod` turns on the `Secure` cookie attribute.
    pub env: Env,
    /// Length of the fully-trusted session window, in milliseconds.
    pub active_period: i64,
    /// Length of the renewable window that follows it, in milliseconds.
    pub idle_period: i64,
    /// Reject state-changing cross-origin requests in
    /// [`parse_request_headers`](crate::Auth::parse_request_headers).
    pub csrf_protection: bool,
    /// Opportunistically delete dead session rows encountered while
    /// validating or issuing sessions.
    pub auto_database_cleanup: bool,
    /// Session cookie shape.
    pub session_cookie: CookieConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: Env::Dev,
            active_period: DEFAULT_ACTIVE_PERIOD,
            idle_period: DEFAULT_IDLE_PERIOD,
            csrf_protection: true,
            auto_database_cleanup: true,
            session_cookie: CookieConfig::default(),
        }
    }
}

impl Config {
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Override both session windows (milliseconds).
    pub fn with_session_timeout(mut self, active_period: i64, idle_period: i64) -> Self {
        self.active_period = active_period;
        self.idle_period = idle_period;
        self
    }

    pub fn with_csrf_protection(mut self, enabled: bool) -> Self {
        self.csrf_protection = enabled;
        self
    }

    pub fn with_auto_database_cleanup(mut self, enabled: bool) -> Self {
        self.auto_database_cleanup = enabled;
        self
    }

    pub fn with_session_cookie(mut self, cookie: CookieConfig) -> Self {
        self.session_cookie = cookie;
        self
    }
}

/// Shape of the session cookie issued by
/// [`create_session_cookie`](crate::Auth::create_session_cookie).
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    /// When false, the cookie lifetime is stretched to a year instead of
    /// tracking the session's idle expiry, so renewed sessions keep working
    /// without a re-issued cookie.
    pub expires: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            same_site: SameSite::Lax,
            path: "/".to_string(),
            domain: None,
            expires: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let config = Config::default();
        assert_eq!(config.active_period, 86_400_000);
        assert_eq!(config.idle_period, 1_209_600_000);
        assert!(config.csrf_protection);
        assert!(config.auto_database_cleanup);
        assert_eq!(config.session_cookie.name, "auth_session");
        assert_eq!(config.session_cookie.same_site, SameSite::Lax);
        assert_eq!(config.session_cookie.path, "/");
        assert!(config.session_cookie.expires);
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::default()
            .with_env(Env::Prod)
            .with_session_timeout(1_000, 2_000)
            .with_csrf_protection(false);
        assert!(config.env.is_prod());
        assert_eq!(config.active_period, 1_000);
        assert_eq!(config.idle_period, 2_000);
        assert!(!config.csrf_protection);
    }
}
