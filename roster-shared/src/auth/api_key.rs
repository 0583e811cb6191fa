/// API key authentication utilities
///
/// # Key Format
///
/// API keys follow the pattern `rk_{32 base62 chars}` (35 chars total).
/// Keys are hashed with SHA-256 before storage; only the first
/// [`DISPLAY_PREFIX_LEN`] characters are kept in clear for display.
///
/// # Example
///
/// ```
/// use roster_shared::auth::api_key::{generate_api_key, hash_api_key, validate_api_key_format};
///
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("rk_"));
/// assert!(validate_api_key_format(&key));
/// assert_eq!(hash, hash_api_key(&key));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the API key (characters)
const KEY_RANDOM_LENGTH: usize = 32;

/// API key prefix
pub const KEY_PREFIX: &str = "rk_";

/// Total length of an API key (prefix + random)
pub const API_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Characters kept in clear for listings
pub const DISPLAY_PREFIX_LEN: usize = 10;

/// Generates a new API key
///
/// Returns `(plaintext_key, sha256_hex_hash)`. Key space is 62^32.
pub fn generate_api_key() -> (String, String) {
    let random_part = generate_random_string(KEY_RANDOM_LENGTH);
    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_api_key(&key);

    (key, hash)
}

fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hex-encoded SHA-256 of the key (64 characters)
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Display prefix stored next to the hash
pub fn display_prefix(key: &str) -> String {
    key.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Checks prefix, length and alphabet without touching storage
///
/// # Example
///
/// ```
/// use roster_shared::auth::api_key::validate_api_key_format;
///
/// assert!(validate_api_key_format("rk_abcdefghijklmnopqrstuvwxyz123456"));
/// assert!(!validate_api_key_format("xx_abcdefghijklmnopqrstuvwxyz123456"));
/// assert!(!validate_api_key_format("rk_short"));
/// ```
pub fn validate_api_key_format(key: &str) -> bool {
    if key.len() != API_KEY_LENGTH {
        return false;
    }

    if !key.starts_with(KEY_PREFIX) {
        return false;
    }

    key[KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validates an API key against a stored hash in constant time
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_api_key(key);
    constant_time_compare(&computed_hash, stored_hash)
}

/// Constant-time string comparison
///
/// Compares every byte and accumulates differences without short-circuiting.
/// Only the length check returns early.
///
/// # Example
///
/// ```
/// use roster_shared::auth::api_key::constant_time_compare;
///
/// assert!(constant_time_compare("hello", "hello"));
/// assert!(!constant_time_compare("hello", "world"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let (key, hash) = generate_api_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert_eq!(hash.len(), 64);
        assert!(validate_api_key_format(&key));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let (a, _) = generate_api_key();
        let (b, _) = generate_api_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_api_key("rk_test123"), hash_api_key("rk_test123"));
        assert_ne!(hash_api_key("rk_test123"), hash_api_key("rk_test124"));
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(display_prefix("rk_abcdefghijklmnop"), "rk_abcdefg");
    }

    #[test]
    fn test_validate_format_rejects_symbols() {
        let key = format!("{}{}", KEY_PREFIX, "!".repeat(KEY_RANDOM_LENGTH));
        assert!(!validate_api_key_format(&key));
    }

    #[test]
    fn test_verify_api_key() {
        let (key, hash) = generate_api_key();
        assert!(verify_api_key(&key, &hash));
        assert!(!verify_api_key("rk_wrongkey", &hash));
    }

    #[test]
    fn test_constant_time_compare_lengths() {
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
