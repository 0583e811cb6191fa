/// HTTP Basic credential parsing
///
/// `Authorization: Basic base64(email:password)`. Only the first `:` splits,
/// so passwords may contain colons.

use base64::{engine::general_purpose, Engine};

use super::credentials::Credentials;

/// Extracts credentials from a Basic `Authorization` value
///
/// Returns `None` when the value uses another scheme or is malformed.
///
/// # Example
///
/// ```
/// use roster_shared::auth::basic::parse_basic;
///
/// // "bob@example.com:secret"
/// let creds = parse_basic("Basic Ym9iQGV4YW1wbGUuY29tOnNlY3JldA==").unwrap();
/// assert_eq!(creds.email, "bob@example.com");
/// assert_eq!(creds.password, "secret");
/// ```
pub fn parse_basic(header_value: &str) -> Option<Credentials> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;

    Some(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// `WWW-Authenticate` challenge for Basic
pub fn challenge(realm: &str) -> String {
    format!("Basic realm=\"{}\", charset=\"UTF-8\"", realm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn test_parse_basic() {
        let creds = parse_basic(&encode("a@x.com:pw1")).unwrap();
        assert_eq!(creds.email, "a@x.com");
        assert_eq!(creds.password, "pw1");
    }

    #[test]
    fn test_password_may_contain_colon() {
        let creds = parse_basic(&encode("a@x.com:p:w:1")).unwrap();
        assert_eq!(creds.password, "p:w:1");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let value = encode("a@x.com:pw1").replacen("Basic", "basic", 1);
        assert!(parse_basic(&value).is_some());
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert!(parse_basic("Bearer abc.def.ghi").is_none());
        assert!(parse_basic("Basic !!!not-base64!!!").is_none());
        assert!(parse_basic(&encode("no-colon-here")).is_none());
        assert!(parse_basic("Basic").is_none());
    }

    #[test]
    fn test_challenge() {
        assert_eq!(challenge("roster"), "Basic realm=\"roster\", charset=\"UTF-8\"");
    }
}
