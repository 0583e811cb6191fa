/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `hello`: Greeting for authenticated callers
/// - `register`: Account registration
/// - `users`: Account listing
/// - `auth`: Sign-in, sign-out and token refresh
/// - `api_keys`: API key management
/// - `health`: Health check endpoint
///
/// Request bodies use camelCase field names; PascalCase aliases are accepted.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod hello;
pub mod register;
pub mod users;

use crate::error::ApiError;
use uuid::Uuid;

/// Parses a path ID, reporting malformed values as input errors
pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid(field, "Must be a valid UUID"))
}
