/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`, which converts to a status code
/// and a JSON body:
///
/// ```json
/// { "error": "invalid_input", "message": "...", "details": [{ "field": "email", "message": "..." }] }
/// ```
///
/// | Variant | Status | Code |
/// |---|---|---|
/// | `InvalidInput` | 400 | `invalid_input` |
/// | `Unauthenticated` | 401 | `unauthenticated` |
/// | `InvalidCredentials` | 401 | `invalid_credentials` |
/// | `NotFound` | 404 | `not_found` |
/// | `DuplicateEmail` | 409 | `duplicate_email` |
/// | `StorageUnavailable` | 500 | `storage_unavailable` |
/// | `Internal` | 500 | `internal_error` |
///
/// # Example
///
/// ```
/// use roster_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<serde_json::Value>> {
///     let name = name.ok_or_else(|| ApiError::invalid("name", "Name is required"))?;
///     Ok(Json(json!({ "result": format!("Hello, {}!", name) })))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roster_shared::error::{AuthError, FieldViolation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    InvalidInput(Vec<FieldViolation>),

    /// Missing or rejected authentication (401)
    ///
    /// Carries the `WWW-Authenticate` challenges to send.
    Unauthenticated {
        message: String,
        challenges: Vec<String>,
    },

    /// Wrong email or password on sign-in (401)
    InvalidCredentials,

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    DuplicateEmail,

    /// Storage failure (500)
    StorageUnavailable(String),

    /// Internal server error (500)
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. "invalid_input"
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

impl ApiError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::InvalidInput(vec![FieldViolation::new(field, message)])
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            message: message.into(),
            challenges: Vec::new(),
        }
    }

    /// Attaches challenges to an `Unauthenticated` error; other variants pass through
    pub fn with_challenges(self, values: Vec<String>) -> Self {
        match self {
            ApiError::Unauthenticated { message, .. } => ApiError::Unauthenticated {
                message,
                challenges: values,
            },
            other => other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::NotFound(_) => "not_found",
            ApiError::DuplicateEmail => "duplicate_email",
            ApiError::StorageUnavailable(_) => "storage_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated { .. } | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::StorageUnavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidInput(errors) => write!(f, "Invalid input: {} errors", errors.len()),
            ApiError::Unauthenticated { message, .. } => write!(f, "Unauthenticated: {}", message),
            ApiError::InvalidCredentials => write!(f, "Invalid email or password"),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DuplicateEmail => write!(f, "Email already registered"),
            ApiError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details, challenges) = match self {
            ApiError::InvalidInput(errors) => ("Request validation failed".to_string(), Some(errors), Vec::new()),
            ApiError::Unauthenticated { message, challenges } => (message, None, challenges),
            ApiError::InvalidCredentials => ("Invalid email or password".to_string(), None, Vec::new()),
            ApiError::NotFound(msg) => (msg, None, Vec::new()),
            ApiError::DuplicateEmail => ("Email already registered".to_string(), None, Vec::new()),
            ApiError::StorageUnavailable(msg) => {
                // Log storage errors but don't expose details to clients
                tracing::error!(error = %msg, "Storage unavailable");
                ("Storage is temporarily unavailable".to_string(), None, Vec::new())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None, Vec::new())
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        for challenge in challenges {
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().append(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(violations) => ApiError::InvalidInput(violations),
            AuthError::DuplicateEmail => ApiError::DuplicateEmail,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Unauthenticated(msg) => ApiError::unauthenticated(msg),
            AuthError::NotFound(msg) => ApiError::NotFound(msg),
            AuthError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            AuthError::Token(err) => ApiError::unauthenticated(format!("Invalid token: {}", err)),
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Malformed or missing JSON bodies are input errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("body", &rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid("query", &rejection.body_text())
    }
}
