/// API key management endpoints
///
/// All endpoints require authentication and only ever see the caller's own
/// keys.
///
/// # Endpoints
///
/// - `GET /apikeys` - List API keys (masked)
/// - `POST /apikeys` - Create API key
/// - `DELETE /apikeys/:id` - Revoke API key

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use roster_shared::models::{api_key::ApiKeyView, session::Session};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_id;
use crate::{app::AppState, error::ApiResult};

/// Create API key request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    /// API key name/description
    #[serde(default, alias = "Name")]
    pub name: String,

    /// Optional expiration date (ISO 8601)
    #[serde(default, alias = "ExpiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create API key response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub id: Uuid,

    /// The plaintext API key
    ///
    /// This is the only time the plaintext key is shown.
    pub key: String,

    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// List API keys response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyView>,
}

/// `POST /apikeys`
///
/// # Errors
///
/// - `400 Bad Request`: empty or over-long name, expiry in the past
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    let Json(req) = payload?;
    let (record, key) = state
        .auth
        .create_api_key(&session, &req.name, req.expires_at)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: record.id,
            key,
            name: record.name,
            key_prefix: record.key_prefix,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }),
    ))
}

/// `GET /apikeys`
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ListApiKeysResponse>> {
    let keys = state.auth.list_api_keys(&session).await?;

    Ok(Json(ListApiKeysResponse {
        api_keys: keys.iter().map(|k| k.view()).collect(),
    }))
}

/// `DELETE /apikeys/:id`
///
/// # Errors
///
/// - `404 Not Found`: no such key for this account
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id("id", &id)?;
    state.auth.revoke_api_key(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
