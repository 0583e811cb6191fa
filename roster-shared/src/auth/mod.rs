/// Authentication for Roster
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT access/refresh token generation and validation
/// - [`api_key`]: API key generation and hashing
/// - [`basic`]: HTTP Basic credential parsing
/// - [`digest`]: HTTP Digest (RFC 7616, SHA-256) parsing and verification
/// - [`credentials`]: credential extraction from request headers
/// - [`provider`]: the provider chain (`jwt → api_key → session → basic → digest`)
/// - [`service`]: [`AuthService`](service::AuthService), the entry point
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id, parameters configurable
/// - **Timing**: unknown emails cost the same Argon2 verification as wrong passwords
/// - **JWT Tokens**: HS256 signing with issuer and expiry checks
/// - **API Keys**: stored as SHA-256 hashes, compared in constant time
/// - **Digest Nonces**: stateless, HMAC-signed and time-limited
///
/// # Example
///
/// ```
/// use roster_shared::auth::password::{hash_password_with, verify_password, PasswordParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password_with("user_password", &PasswordParams::fast())?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod basic;
pub mod credentials;
pub mod digest;
pub mod jwt;
pub mod password;
pub mod provider;
pub mod service;
