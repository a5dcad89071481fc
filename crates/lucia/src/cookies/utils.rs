// Cookie attribute serialization and `Cookie`-header parsing.
//
// Parsing is deliberately forgiving. Real headers carry duplicate names,
// stray segments without `=`, quoted values, and values that are not valid
// percent-encoding; anything malformed is skipped or passed through raw,
// and parsing never fails. The first occurrence of a name wins.

use std::collections::HashMap;
use std::fmt;

use chrono::TimeZone;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes attached to a serialized cookie. The value itself is passed
/// to [`serialize_cookie`] separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieAttributes {
    /// `Max-Age`, in seconds.
    pub max_age: Option<i64>,
    /// `Expires`, as epoch milliseconds; rendered as an IMF-fixdate.
    pub expires: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// Render a `Set-Cookie` header value. The cookie value is percent-encoded.
pub fn serialize_cookie(name: &str, value: &str, attributes: &CookieAttributes) -> String {
    let mut out = format!("{}={}", name, urlencoding::encode(value));
    if let Some(max_age) = attributes.max_age {
        out.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(domain) = &attributes.domain {
        out.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &attributes.path {
        out.push_str(&format!("; Path={path}"));
    }
    if let Some(expires) = attributes.expires {
        if let Some(date) = format_http_date(expires) {
            out.push_str(&format!("; Expires={date}"));
        }
    }
    if attributes.http_only {
        out.push_str("; HttpOnly");
    }
    if attributes.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = attributes.same_site {
        out.push_str(&format!("; SameSite={same_site}"));
    }
    out
}

/// RFC 7231 IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`. `None` only
/// for timestamps outside chrono's representable range.
fn format_http_date(epoch_ms: i64) -> Option<String> {
    chrono::Utc
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|date| date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Parse a `Cookie` header into a name → value map.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for segment in header.split(';') {
        let Some((name, value)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        let decoded = urlencoding::decode(value)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| value.to_string());
        cookies.entry(name.to_string()).or_insert(decoded);
    }
    cookies
}

/// Look up one cookie in a `Cookie` header. `None` when the header is
/// absent or the name is not present.
pub fn get_cookie(header: Option<&str>, name: &str) -> Option<String> {
    parse_cookies(header?).remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_every_attribute() {
        let attributes = CookieAttributes {
            max_age: Some(3600),
            expires: Some(0),
            domain: Some("example.com".to_string()),
            path: Some("/".to_string()),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Strict),
        };
        assert_eq!(
            serialize_cookie("auth_session", "abc123", &attributes),
            "auth_session=abc123; Max-Age=3600; Domain=example.com; Path=/; \
             Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn bare_cookie_has_no_attributes() {
        assert_eq!(
            serialize_cookie("name", "value", &CookieAttributes::default()),
            "name=value"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let header = serialize_cookie("name", "a value;with=specials", &CookieAttributes::default());
        assert_eq!(header, "name=a%20value%3Bwith%3Dspecials");

        let cookies = parse_cookies("name=a%20value%3Bwith%3Dspecials");
        assert_eq!(cookies["name"], "a value;with=specials");
    }

    #[test]
    fn parses_multiple_cookies() {
        let cookies = parse_cookies("a=1; b=2;c=3");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "2");
        assert_eq!(cookies["c"], "3");
    }

    #[test]
    fn malformed_segments_are_skipped() {
        let cookies = parse_cookies("plain; =novalue; ok=yes; ;");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["ok"], "yes");
    }

    #[test]
    fn first_occurrence_wins() {
        let cookies = parse_cookies("dup=first; dup=second");
        assert_eq!(cookies["dup"], "first");
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let cookies = parse_cookies("q=\"quoted value\"");
        assert_eq!(cookies["q"], "quoted value");
    }

    #[test]
    fn undecodable_values_pass_through_raw() {
        // `%zz` is not valid percent-encoding.
        let cookies = parse_cookies("raw=%zz");
        assert_eq!(cookies["raw"], "%zz");
    }

    #[test]
    fn get_cookie_handles_missing_header_and_name() {
        assert_eq!(get_cookie(None, "a"), None);
        assert_eq!(get_cookie(Some("a=1"), "b"), None);
        assert_eq!(get_cookie(Some("a=1; b=2"), "b").as_deref(), Some("2"));
    }

    #[test]
    fn http_dates_are_imf_fixdate() {
        assert_eq!(
            format_http_date(0).as_deref(),
            Some("Thu, 01 Jan 1970 00:00:00 GMT")
        );
        assert_eq!(
            format_http_date(784_111_777_000).as_deref(),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }
}
