/// Error taxonomy shared by the stores and the auth service
///
/// Every fallible operation in this crate returns [`AuthResult`]. The HTTP
/// layer maps each variant to a status code and a stable error code; see
/// `roster_api::error`.
///
/// Storage failures never carry driver details past this type: the message is
/// kept for logging, and the API replaces it with a generic one.

use serde::{Deserialize, Serialize};

/// Result alias used across the crate
pub type AuthResult<T> = Result<T, AuthError>;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error type for store and auth service operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Request input was empty or malformed
    #[error("Invalid input: {}", summarize(.0))]
    InvalidInput(Vec<FieldViolation>),

    /// Email is already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No configured provider recognized the request
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying storage failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Token could not be created or validated
    #[error(transparent)]
    Token(#[from] crate::auth::jwt::JwtError),

    /// Hashing or other internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: &str, message: &str) -> Self {
        AuthError::InvalidInput(vec![FieldViolation::new(field, message)])
    }

    /// Whether the next auth provider may still be tried after this error
    ///
    /// Credential problems fall through to the next provider; storage and
    /// internal failures abort the whole chain.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::Unauthenticated(_)
                | AuthError::Token(_)
                | AuthError::NotFound(_)
                | AuthError::InvalidInput(_)
        )
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    FieldViolation::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    )
                })
            })
            .collect();
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        AuthError::InvalidInput(violations)
    }
}

/// Maps sqlx errors onto the taxonomy
///
/// Unique violations on the email constraint become `DuplicateEmail`;
/// everything else is a storage failure.
impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AuthError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    if let Some(constraint) = db_err.constraint() {
                        if constraint.contains("email") {
                            return AuthError::DuplicateEmail;
                        }
                    }
                }
                AuthError::StorageUnavailable(format!("Database error: {}", db_err))
            }
            _ => AuthError::StorageUnavailable(format!("Database error: {}", err)),
        }
    }
}
