/// Account listing
///
/// # Endpoints
///
/// - `GET /users`: every account, in registration order
/// - `GET /users/:id`: a one-element list, or 404
///
/// Only [`UserAuthView`] is serialized; password and digest hashes never
/// leave the store. Whether these routes require authentication is set by
/// `USERS_REQUIRE_AUTH`.

use axum::{
    extract::{Path, State},
    Json,
};
use roster_shared::models::user::UserAuthView;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// List response
#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserAuthView>,
}

/// `GET /users`
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UsersResponse>> {
    let users = state.users.list_all().await?;

    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserAuthView::from).collect(),
    }))
}

/// `GET /users/:id`
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UsersResponse>> {
    let id = parse_id("id", &id)?;

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(UsersResponse {
        users: vec![user.view()],
    }))
}
