//! # Roster Shared Library
//!
//! Account model, storage and authentication used by the Roster API server.
//!
//! ## Module Organization
//!
//! - `models`: Accounts, sessions and API keys
//! - `store`: Store traits with Postgres and in-memory backends
//! - `auth`: Password hashing, tokens, HTTP auth schemes and the auth service
//! - `db`: Connection pool and migrations
//! - `error`: Error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

/// Current version of the Roster shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
