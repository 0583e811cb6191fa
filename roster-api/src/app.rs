/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use roster_api::{app::{build_router, AppState}, config::Config};
/// use roster_shared::store::Stores;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::build(config, Stores::memory())?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{auth::require_session, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use roster_shared::{
    auth::{
        credentials::{API_KEY_HEADER, SESSION_ID_HEADER},
        service::AuthService,
    },
    store::{Stores, UserStore},
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Credential checks, sessions and API keys
    pub auth: Arc<AuthService>,

    /// Account store, for the listing routes
    pub users: Arc<dyn UserStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: AuthService, users: Arc<dyn UserStore>, config: Config) -> Self {
        Self {
            auth: Arc::new(auth),
            users,
            config: Arc::new(config),
        }
    }

    /// Wires the auth service over `stores` using `config`
    pub fn build(config: Config, stores: Stores) -> anyhow::Result<Self> {
        let users = stores.users.clone();
        let auth = AuthService::new(stores, config.auth_settings())?;
        Ok(Self::new(auth, users, config))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                      # public
/// ├── POST /register                    # public
/// ├── GET|POST /register/:email/:pw     # public, REGISTER_URL_CREDENTIALS only
/// ├── POST /auth/credentials            # public, sign in
/// ├── POST /access-token                # public, refresh token exchange
/// ├── /users, /users/:id                # protected when USERS_REQUIRE_AUTH
/// ├── GET|POST /hello, GET /hello/:name # protected
/// ├── POST /auth/logout                 # protected
/// └── /apikeys                          # protected
///     ├── GET    /
///     ├── POST   /
///     └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Session resolution (protected routes only)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    let mut public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::register::register))
        .route("/auth/credentials", post(routes::auth::sign_in))
        .route("/access-token", post(routes::auth::access_token));

    if state.config.auth.register_url_credentials {
        public_routes = public_routes.route(
            "/register/:email/:password",
            get(routes::register::register_from_path).post(routes::register::register_from_path),
        );
    }

    let user_routes = Router::new()
        .route("/users", get(routes::users::list_users))
        .route("/users/:id", get(routes::users::get_user));

    let mut protected_routes = Router::new()
        .route(
            "/hello",
            get(routes::hello::greet_query).post(routes::hello::greet_body),
        )
        .route("/hello/:name", get(routes::hello::greet_path))
        .route("/auth/logout", post(routes::auth::logout))
        .route(
            "/apikeys",
            get(routes::api_keys::list_api_keys).post(routes::api_keys::create_api_key),
        )
        .route("/apikeys/:id", delete(routes::api_keys::revoke_api_key));

    if state.config.auth.users_require_auth {
        protected_routes = protected_routes.merge(user_routes);
    } else {
        public_routes = public_routes.merge(user_routes);
    }

    // route_layer: unmatched paths still 404 instead of 401
    let protected_routes =
        protected_routes.route_layer(from_fn_with_state(state.clone(), require_session));

    let cors = build_cors(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn build_cors(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(SESSION_ID_HEADER),
        ])
        .expose_headers([header::WWW_AUTHENTICATE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
