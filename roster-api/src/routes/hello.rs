/// Greeting endpoint
///
/// # Endpoints
///
/// - `GET /hello?name=Bob`
/// - `GET /hello/Bob`
/// - `POST /hello` with `{"name": "Bob"}`
///
/// All three require authentication and respond with
/// `{"result": "Hello, Bob!"}`.

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query},
    Extension, Json,
};
use roster_shared::models::session::Session;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Greeting request
#[derive(Debug, Default, Deserialize)]
pub struct HelloRequest {
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
}

/// Greeting response
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub result: String,
}

fn greet(session: &Session, name: Option<String>) -> ApiResult<Json<HelloResponse>> {
    let name = name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("name", "Name is required"))?;

    debug!(user_auth_id = %session.user_auth_id, email = %session.email, "Greeting");

    Ok(Json(HelloResponse {
        result: format!("Hello, {}!", name),
    }))
}

/// `GET /hello?name=...`
pub async fn greet_query(
    Extension(session): Extension<Session>,
    query: Result<Query<HelloRequest>, QueryRejection>,
) -> ApiResult<Json<HelloResponse>> {
    let Query(req) = query?;
    greet(&session, req.name)
}

/// `GET /hello/:name`
pub async fn greet_path(
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> ApiResult<Json<HelloResponse>> {
    greet(&session, Some(name))
}

/// `POST /hello`
pub async fn greet_body(
    Extension(session): Extension<Session>,
    payload: Result<Json<HelloRequest>, JsonRejection>,
) -> ApiResult<Json<HelloResponse>> {
    let Json(req) = payload?;
    greet(&session, req.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_shared::models::session::AuthMethod;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            user_auth_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            roles: vec![],
            method: AuthMethod::Jwt,
            session_id: None,
        }
    }

    #[test]
    fn test_greet() {
        let Json(response) = greet(&session(), Some("Bob".to_string())).unwrap();
        assert_eq!(response.result, "Hello, Bob!");
    }

    #[test]
    fn test_name_is_echoed_verbatim() {
        let Json(response) = greet(&session(), Some(" Bob ".to_string())).unwrap();
        assert_eq!(response.result, "Hello,  Bob !");
    }

    #[test]
    fn test_blank_name_is_invalid() {
        assert!(matches!(greet(&session(), None), Err(ApiError::InvalidInput(_))));
        assert!(matches!(greet(&session(), Some("  ".to_string())), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_pascal_case_alias() {
        let req: HelloRequest = serde_json::from_str(r#"{"Name":"Bob"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Bob"));
    }
}
