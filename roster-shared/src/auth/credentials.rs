/// Credential extraction from HTTP requests
///
/// [`RequestCredentials`] is a borrowed view over the method, URI and headers
/// of an incoming request. Each auth provider pulls the part it understands
/// from it; nothing here touches storage.

use axum::http::{header, HeaderMap};
use std::fmt;
use uuid::Uuid;

/// Header carrying an API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying a session cache ID
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Cookie carrying a session cache ID
pub const SESSION_COOKIE: &str = "ss-id";

/// Email and password pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keeps passwords out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Request parts the auth providers inspect
#[derive(Debug, Clone, Copy)]
pub struct RequestCredentials<'a> {
    /// HTTP method, e.g. `GET`
    pub method: &'a str,

    /// Path and query as sent by the client
    pub uri: &'a str,

    pub headers: &'a HeaderMap,
}

impl<'a> RequestCredentials<'a> {
    pub fn new(method: &'a str, uri: &'a str, headers: &'a HeaderMap) -> Self {
        Self { method, uri, headers }
    }

    /// Raw `Authorization` value
    pub fn authorization(&self) -> Option<&'a str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    }

    /// Value after a case-insensitive `Bearer ` prefix
    pub fn bearer(&self) -> Option<&'a str> {
        let value = self.authorization()?;
        let (scheme, token) = value.split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") {
            let token = token.trim();
            (!token.is_empty()).then_some(token)
        } else {
            None
        }
    }

    /// Whether `Authorization` uses the given scheme
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.authorization()
            .and_then(|v| v.split(' ').next())
            .map(|s| s.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
    }

    /// `X-Api-Key` header value
    pub fn api_key_header(&self) -> Option<&'a str> {
        self.headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Session ID from `X-Session-Id`, falling back to the `ss-id` cookie
    ///
    /// Returns the raw value; an unparseable ID is the caller's problem.
    pub fn session_id(&self) -> Option<&'a str> {
        if let Some(value) = self
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(value);
        }

        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim())
    }

    /// Parsed session ID, if present and well-formed
    pub fn parsed_session_id(&self) -> Option<Result<Uuid, uuid::Error>> {
        self.session_id().map(Uuid::parse_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        let req = RequestCredentials::new("GET", "/", &h);
        assert_eq!(req.bearer(), Some("abc.def.ghi"));
        assert!(req.has_scheme("bearer"));
        assert!(!req.has_scheme("basic"));

        let h = headers(&[("authorization", "Basic Zm9vOmJhcg==")]);
        assert_eq!(RequestCredentials::new("GET", "/", &h).bearer(), None);

        let h = headers(&[("authorization", "Bearer   ")]);
        assert_eq!(RequestCredentials::new("GET", "/", &h).bearer(), None);
    }

    #[test]
    fn test_api_key_header() {
        let h = headers(&[("X-Api-Key", "rk_abc")]);
        assert_eq!(RequestCredentials::new("GET", "/", &h).api_key_header(), Some("rk_abc"));
    }

    #[test]
    fn test_session_id_header_wins_over_cookie() {
        let id = Uuid::new_v4().to_string();
        let h = headers(&[("x-session-id", &id), ("cookie", "ss-id=other")]);
        assert_eq!(RequestCredentials::new("GET", "/", &h).session_id(), Some(id.as_str()));
    }

    #[test]
    fn test_session_id_from_cookie() {
        let id = Uuid::new_v4();
        let cookie = format!("theme=dark; ss-id={}; lang=en", id);
        let h = headers(&[("cookie", &cookie)]);
        let req = RequestCredentials::new("GET", "/", &h);

        assert_eq!(req.parsed_session_id().unwrap().unwrap(), id);
    }

    #[test]
    fn test_malformed_session_id() {
        let h = headers(&[("x-session-id", "not-a-uuid")]);
        assert!(RequestCredentials::new("GET", "/", &h).parsed_session_id().unwrap().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let printed = format!("{:?}", Credentials::new("a@x.com", "hunter2"));
        assert!(printed.contains("a@x.com"));
        assert!(!printed.contains("hunter2"));
    }
}
