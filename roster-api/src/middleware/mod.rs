/// Middleware modules for the API server
///
/// - `auth`: resolves the caller's session on protected routes
/// - `security`: security response headers

pub mod auth;
pub mod security;
