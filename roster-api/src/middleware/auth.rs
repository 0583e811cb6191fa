/// Session resolution for protected routes
///
/// Runs the auth service's provider chain against the request and inserts the
/// resulting [`Session`] into request extensions, where handlers pick it up
/// with `Extension<Session>`. Requests without an acceptable credential get a
/// 401 carrying a `WWW-Authenticate` challenge for every enabled scheme.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use roster_shared::auth::credentials::RequestCredentials;
use roster_shared::models::session::Session;

use crate::{app::AppState, error::ApiError};

/// Rejects the request unless a provider accepts its credentials
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = req.method().as_str().to_string();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let result = {
        let credentials = RequestCredentials::new(&method, &uri, req.headers());
        state.auth.current_session(&credentials).await
    };

    let session: Session = match result {
        Ok(session) => session,
        Err(err) => {
            tracing::debug!(error = %err, uri = %uri, "Rejected unauthenticated request");
            return Err(ApiError::from(err).with_challenges(state.auth.challenges()));
        }
    };

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
