/// Data model for Roster
///
/// # Models
///
/// - `user`: Registered accounts (`UserAuth`) and their public view
/// - `session`: Request-scoped `Session` and the session cache entry
/// - `api_key`: API keys for programmatic access
///
/// Persistence lives in [`crate::store`]; these types carry no queries.
///
/// # Example
///
/// ```
/// use roster_shared::models::user::{NewUserAuth, UserAuth};
///
/// let user = UserAuth::from_new(NewUserAuth {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     digest_ha1_hash: None,
///     roles: vec![],
/// });
///
/// let view = user.view();
/// assert_eq!(view.email, "user@example.com");
/// ```

pub mod api_key;
pub mod session;
pub mod user;
