// Cookie codec: attribute serialization, tolerant `Cookie`-header parsing,
// and session cookie derivation.

pub mod session_cookie;
pub mod utils;

pub use session_cookie::{create_session_cookie, SessionCookie, MAX_COOKIE_AGE};
pub use utils::{get_cookie, parse_cookies, serialize_cookie, CookieAttributes, SameSite};
