/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/credentials` - Sign in with email and password
/// - `POST /auth/logout` - Drop the caller's session (authenticated)
/// - `POST /access-token` - Exchange a refresh token for an access token
///
/// A successful sign-in also sets the `ss-id` session cookie.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use roster_shared::auth::credentials::{Credentials, SESSION_COOKIE};
use roster_shared::models::session::Session;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Sign-in request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default, alias = "Email", alias = "userName", alias = "UserName")]
    pub email: String,

    #[serde(default, alias = "Password")]
    pub password: String,
}

/// Sign-in response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,

    /// Access token (JWT)
    pub bearer_token: String,

    /// Refresh token (JWT)
    pub refresh_token: String,
}

/// Generic `{result}` response
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "RefreshToken")]
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

fn session_cookie(value: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    ))
    .ok()
}

/// `POST /auth/credentials`
///
/// # Errors
///
/// - `401 Unauthorized` (`invalid_credentials`): unknown email or wrong password
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let signed_in = state
        .auth
        .sign_in(&Credentials::new(req.email, req.password))
        .await?;

    let cookie = session_cookie(
        &signed_in.session_id.to_string(),
        state.config.auth.session_ttl_secs,
    );

    let mut response = Json(SignInResponse {
        session_id: signed_in.session_id,
        user_id: signed_in.user_auth_id,
        email: signed_in.email,
        bearer_token: signed_in.bearer_token,
        refresh_token: signed_in.refresh_token,
    })
    .into_response();

    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Response> {
    let removed = state.auth.sign_out(&session).await?;

    let result = if removed { "Signed out" } else { "No session to sign out" };
    let mut response = Json(ResultResponse {
        result: result.to_string(),
    })
    .into_response();

    if let Some(cookie) = session_cookie("", 0) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// `POST /access-token`
pub async fn access_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    if req.refresh_token.trim().is_empty() {
        return Err(ApiError::invalid("refreshToken", "Refresh token is required"));
    }

    let access_token = state.auth.refresh_access_token(req.refresh_token.trim()).await?;
    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let cookie = session_cookie("abc", 60).unwrap();
        assert_eq!(cookie, "ss-id=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
    }

    #[test]
    fn test_sign_in_response_is_camel_case() {
        let body = serde_json::to_value(SignInResponse {
            session_id: Uuid::nil(),
            user_id: Uuid::nil(),
            email: "a@x.com".to_string(),
            bearer_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
        })
        .unwrap();

        for key in ["sessionId", "userId", "email", "bearerToken", "refreshToken"] {
            assert!(body.get(key).is_some(), "missing {}", key);
        }
    }
}
