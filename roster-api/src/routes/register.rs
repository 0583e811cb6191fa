/// Registration endpoints
///
/// # Endpoints
///
/// - `POST /register` with `{"email": "...", "password": "..."}`
/// - `GET|POST /register/:email/:password`, mounted only when
///   `REGISTER_URL_CREDENTIALS=true`; credentials in URLs end up in access
///   logs, so this form exists for older clients only
///
/// # Response
///
/// ```json
/// { "result": "Hello, a@x.com!" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: empty or malformed email, empty or over-long password
/// - `409 Conflict`: email already registered

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{app::AppState, error::ApiResult};

/// Register request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, alias = "Email", alias = "userName", alias = "UserName")]
    pub email: String,

    #[serde(default, alias = "Password")]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub result: String,
}

async fn register_account(state: &AppState, email: &str, password: &str) -> ApiResult<Json<RegisterResponse>> {
    let user = state.auth.register(email, password).await?;

    Ok(Json(RegisterResponse {
        result: format!("Hello, {}!", user.email),
    }))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(req) = payload?;
    register_account(&state, &req.email, &req.password).await
}

/// `GET|POST /register/:email/:password`
pub async fn register_from_path(
    State(state): State<AppState>,
    Path((email, password)): Path<(String, String)>,
) -> ApiResult<Json<RegisterResponse>> {
    register_account(&state, &email, &password).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_aliases() {
        let req: RegisterRequest = serde_json::from_str(r#"{"Email":"a@x.com","Password":"pw1"}"#).unwrap();
        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.password, "pw1");

        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert!(req.password.is_empty());
    }
}
