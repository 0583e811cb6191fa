/// HTTP Digest authentication (RFC 7616, SHA-256, `qop=auth`)
///
/// The server keeps no nonce state. A nonce is `{unix_seconds}.{hmac}` where
/// the HMAC-SHA256 is keyed with the server secret, so any instance can check
/// that it issued the nonce and that it is not older than the configured TTL.
///
/// Accounts store `HA1 = SHA-256(email:realm:password)` at registration, which
/// is all the server needs to check a response.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use roster_shared::auth::digest::{ha1, issue_nonce, parse_digest, expected_response};
///
/// let secret = b"server-secret";
/// let nonce = issue_nonce(secret, Utc::now().timestamp()).unwrap();
/// let stored = ha1("a@x.com", "roster", "pw1");
///
/// let header = format!(
///     "Digest username=\"a@x.com\", realm=\"roster\", nonce=\"{}\", uri=\"/hello\", \
///      response=\"x\", algorithm=SHA-256",
///     nonce
/// );
/// let parsed = parse_digest(&header).unwrap();
/// assert_eq!(expected_response(&stored, "GET", &parsed).len(), 64);
/// ```

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Error type for Digest parsing and verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("Not a Digest authorization header")]
    NotDigest,

    #[error("Malformed Digest header: {0}")]
    Malformed(String),

    #[error("Missing Digest parameter: {0}")]
    MissingField(&'static str),

    #[error("Unsupported Digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported qop: {0}")]
    UnsupportedQop(String),

    #[error("Nonce was not issued by this server")]
    InvalidNonce,

    #[error("Nonce has expired")]
    StaleNonce,

    #[error("Nonce key rejected")]
    InvalidKey,
}

/// Parsed `Authorization: Digest ...` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub qop: Option<String>,
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub opaque: Option<String>,
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `SHA-256(username:realm:password)`, hex
pub fn ha1(username: &str, realm: &str, password: &str) -> String {
    sha256_hex(&format!("{}:{}:{}", username, realm, password))
}

fn nonce_mac(secret: &[u8]) -> Result<HmacSha256, DigestError> {
    <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| DigestError::InvalidKey)
}

/// Issues a nonce stamped with `timestamp` (Unix seconds)
pub fn issue_nonce(secret: &[u8], timestamp: i64) -> Result<String, DigestError> {
    let mut mac = nonce_mac(secret)?;
    mac.update(timestamp.to_string().as_bytes());
    Ok(format!("{}.{}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

/// Checks the nonce signature and age
pub fn verify_nonce(nonce: &str, secret: &[u8], ttl_secs: i64, now: i64) -> Result<(), DigestError> {
    let (stamp, signature) = nonce.split_once('.').ok_or(DigestError::InvalidNonce)?;
    let timestamp: i64 = stamp.parse().map_err(|_| DigestError::InvalidNonce)?;
    let signature = hex::decode(signature).map_err(|_| DigestError::InvalidNonce)?;

    let mut mac = nonce_mac(secret)?;
    mac.update(stamp.as_bytes());
    mac.verify_slice(&signature).map_err(|_| DigestError::InvalidNonce)?;

    if timestamp > now || now - timestamp > ttl_secs {
        return Err(DigestError::StaleNonce);
    }

    Ok(())
}

/// Splits `key=value, key="quoted, value"` pairs
fn parse_params(input: &str) -> Result<HashMap<String, String>, DigestError> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            return Err(DigestError::Malformed(format!("parameter '{}' has no value", key.trim())));
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(DigestError::Malformed("unterminated quoted string".to_string()));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.insert(key.trim().to_ascii_lowercase(), value);
    }

    Ok(params)
}

/// Parses a Digest `Authorization` value
pub fn parse_digest(header_value: &str) -> Result<DigestResponse, DigestError> {
    let (scheme, rest) = header_value
        .trim()
        .split_once(' ')
        .ok_or(DigestError::NotDigest)?;
    if !scheme.eq_ignore_ascii_case("digest") {
        return Err(DigestError::NotDigest);
    }

    let mut params = parse_params(rest)?;

    if let Some(algorithm) = params.get("algorithm") {
        if !algorithm.eq_ignore_ascii_case("SHA-256") {
            return Err(DigestError::UnsupportedAlgorithm(algorithm.clone()));
        }
    }

    let qop = params.remove("qop");
    if let Some(ref q) = qop {
        if q != "auth" {
            return Err(DigestError::UnsupportedQop(q.clone()));
        }
    }

    let mut take = |name: &'static str| params.remove(name).ok_or(DigestError::MissingField(name));

    let parsed = DigestResponse {
        username: take("username")?,
        realm: take("realm")?,
        nonce: take("nonce")?,
        uri: take("uri")?,
        response: take("response")?,
        nc: take("nc").ok(),
        cnonce: take("cnonce").ok(),
        opaque: take("opaque").ok(),
        qop,
    };

    if parsed.qop.is_some() && (parsed.nc.is_none() || parsed.cnonce.is_none()) {
        return Err(DigestError::MissingField("cnonce"));
    }

    Ok(parsed)
}

/// Response value the client should have sent
pub fn expected_response(ha1: &str, method: &str, digest: &DigestResponse) -> String {
    let ha2 = sha256_hex(&format!("{}:{}", method, digest.uri));

    match (&digest.qop, &digest.nc, &digest.cnonce) {
        (Some(qop), Some(nc), Some(cnonce)) => sha256_hex(&format!(
            "{}:{}:{}:{}:{}:{}",
            ha1, digest.nonce, nc, cnonce, qop, ha2
        )),
        _ => sha256_hex(&format!("{}:{}:{}", ha1, digest.nonce, ha2)),
    }
}

/// `WWW-Authenticate` challenge for Digest
pub fn challenge(realm: &str, nonce: &str, stale: bool) -> String {
    let mut value = format!(
        "Digest realm=\"{}\", qop=\"auth\", algorithm=SHA-256, nonce=\"{}\"",
        realm, nonce
    );
    if stale {
        value.push_str(", stale=true");
    }
    value
}
