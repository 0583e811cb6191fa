/// Configuration management for the API server
///
/// Configuration is read from environment variables, after loading a `.env`
/// file when one is present.
///
/// # Environment Variables
///
/// Server:
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
///
/// Storage:
/// - `STORAGE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
///
/// Tokens:
/// - `JWT_SECRET`: Signing secret, at least 32 characters (required)
/// - `JWT_ISSUER`: Issuer claim (default: roster)
/// - `JWT_ACCESS_TTL_SECS` (default: 86400), `JWT_REFRESH_TTL_SECS` (default: 2592000)
///
/// Authentication:
/// - `AUTH_PROVIDERS`: Comma-separated subset of `jwt,api_key,session,basic,digest` (default: all)
/// - `AUTH_REALM`: Basic/Digest realm (default: roster)
/// - `SESSION_TTL_SECS` (default: 1209600), `SESSION_PURGE_INTERVAL_SECS` (default: 300)
/// - `API_KEY_RETENTION_SECS` (default: 2592000)
/// - `DIGEST_NONCE_TTL_SECS` (default: 300)
/// - `USERS_REQUIRE_AUTH`: Protect `/users` (default: true)
/// - `REGISTER_URL_CREDENTIALS`: Mount `/register/:email/:password` (default: false)
/// - `PASSWORD_POLICY`: `basic` or `strict` (default: basic)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM` (default: 65536, 3, 4)
///
/// Logging:
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: Filter directives
///
/// # Example
///
/// ```no_run
/// use roster_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use roster_shared::auth::password::PasswordParams;
use roster_shared::auth::provider::AuthProvider;
use roster_shared::auth::service::{AuthSettings, PasswordPolicy};
use roster_shared::db::pool::DatabaseConfig;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode adds HSTS
    pub production: bool,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,
}

/// Which store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// PostgreSQL connection URL; required for the Postgres backend
    pub database_url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing, also keys Digest nonces
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub issuer: String,

    pub access_ttl_secs: i64,

    pub refresh_ttl_secs: i64,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Enabled providers, in evaluation order
    pub providers: Vec<AuthProvider>,

    pub realm: String,

    pub session_ttl_secs: i64,

    pub session_purge_interval_secs: u64,

    /// Revoked or expired API keys are deleted after this long
    pub api_key_retention_secs: i64,

    pub digest_nonce_ttl_secs: i64,

    /// Whether `/users` sits behind the auth middleware
    pub users_require_auth: bool,

    /// Whether the URL-credential registration routes are mounted
    pub register_url_credentials: bool,

    pub password_policy: PasswordPolicy,

    pub password: PasswordParams,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{} must be a boolean, got '{}'", key, v),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api = ApiConfig {
            host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "API_PORT", 8080u16)?,
            production: parse_bool(&lookup, "API_PRODUCTION", false)?,
            cors_origins: lookup("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        let backend = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL environment variable is required when STORAGE_BACKEND=postgres");
        }

        let storage = StorageConfig {
            backend,
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| roster_shared::auth::jwt::DEFAULT_ISSUER.to_string()),
            access_ttl_secs: parse_or(&lookup, "JWT_ACCESS_TTL_SECS", 86_400i64)?,
            refresh_ttl_secs: parse_or(&lookup, "JWT_REFRESH_TTL_SECS", 2_592_000i64)?,
        };

        let providers = match lookup("AUTH_PROVIDERS") {
            Some(raw) if !raw.trim().is_empty() => {
                AuthProvider::parse_list(&raw).map_err(|e| anyhow::anyhow!("AUTH_PROVIDERS: {}", e))?
            }
            _ => AuthProvider::ALL.to_vec(),
        };

        let defaults = PasswordParams::default();
        let auth = AuthConfig {
            providers,
            realm: lookup("AUTH_REALM").unwrap_or_else(|| "roster".to_string()),
            session_ttl_secs: parse_or(&lookup, "SESSION_TTL_SECS", 1_209_600i64)?,
            session_purge_interval_secs: parse_or(&lookup, "SESSION_PURGE_INTERVAL_SECS", 300u64)?,
            api_key_retention_secs: parse_or(&lookup, "API_KEY_RETENTION_SECS", 2_592_000i64)?,
            digest_nonce_ttl_secs: parse_or(&lookup, "DIGEST_NONCE_TTL_SECS", 300i64)?,
            users_require_auth: parse_bool(&lookup, "USERS_REQUIRE_AUTH", true)?,
            register_url_credentials: parse_bool(&lookup, "REGISTER_URL_CREDENTIALS", false)?,
            password_policy: parse_or(&lookup, "PASSWORD_POLICY", PasswordPolicy::Basic)?,
            password: PasswordParams {
                memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(&lookup, "ARGON2_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", defaults.parallelism)?,
            },
        };

        if auth.session_purge_interval_secs == 0 {
            anyhow::bail!("SESSION_PURGE_INTERVAL_SECS must be positive");
        }

        let log = LogConfig {
            format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
        };

        Ok(Self {
            api,
            storage,
            jwt,
            auth,
            log,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the Postgres backend
    pub fn database_config(&self) -> Option<DatabaseConfig> {
        self.storage.database_url.as_ref().map(|url| DatabaseConfig {
            url: url.clone(),
            max_connections: self.storage.max_connections,
            min_connections: self.storage.max_connections.min(2),
            ..Default::default()
        })
    }

    /// Settings for the auth service
    pub fn auth_settings(&self) -> AuthSettings {
        let mut settings = AuthSettings::new(self.jwt.secret.clone());
        settings.jwt.issuer = self.jwt.issuer.clone();
        settings.jwt.access_ttl = Duration::seconds(self.jwt.access_ttl_secs);
        settings.jwt.refresh_ttl = Duration::seconds(self.jwt.refresh_ttl_secs);
        settings.realm = self.auth.realm.clone();
        settings.session_ttl = Duration::seconds(self.auth.session_ttl_secs);
        settings.api_key_retention = Duration::seconds(self.auth.api_key_retention_secs);
        settings.nonce_ttl = Duration::seconds(self.auth.digest_nonce_ttl_secs);
        settings.password = self.auth.password;
        settings.password_policy = self.auth.password_policy;
        settings.providers = self.auth.providers.clone();
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", SECRET), ("STORAGE_BACKEND", "memory")]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.database_config().is_none());
        assert_eq!(config.auth.providers, AuthProvider::ALL.to_vec());
        assert!(config.auth.users_require_auth);
        assert!(!config.auth.register_url_credentials);
        assert_eq!(config.auth.password_policy, PasswordPolicy::Basic);
        assert_eq!(config.auth.password, PasswordParams::default());
        assert_eq!(config.auth.api_key_retention_secs, 2_592_000);
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());

        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/roster"),
            ("DATABASE_MAX_CONNECTIONS", "3"),
        ])
        .unwrap();
        let db = config.database_config().unwrap();
        assert_eq!(db.url, "postgresql://localhost/roster");
        assert_eq!(db.max_connections, 3);
    }

    #[test]
    fn test_jwt_secret_rules() {
        assert!(load(&[("STORAGE_BACKEND", "memory")]).is_err());
        assert!(load(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "short")]).is_err());
    }

    #[test]
    fn test_overrides_flow_into_auth_settings() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("STORAGE_BACKEND", "memory"),
            ("JWT_ISSUER", "acme"),
            ("JWT_ACCESS_TTL_SECS", "60"),
            ("AUTH_PROVIDERS", "digest,jwt"),
            ("AUTH_REALM", "acme-realm"),
            ("USERS_REQUIRE_AUTH", "false"),
            ("REGISTER_URL_CREDENTIALS", "yes"),
            ("PASSWORD_POLICY", "strict"),
            ("ARGON2_MEMORY_KIB", "1024"),
            ("API_KEY_RETENTION_SECS", "3600"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert!(!config.auth.users_require_auth);
        assert!(config.auth.register_url_credentials);
        assert_eq!(config.log.format, LogFormat::Json);

        let settings = config.auth_settings();
        assert_eq!(settings.jwt.issuer, "acme");
        assert_eq!(settings.jwt.access_ttl, Duration::seconds(60));
        assert_eq!(settings.providers, vec![AuthProvider::Jwt, AuthProvider::Digest]);
        assert_eq!(settings.realm, "acme-realm");
        assert_eq!(settings.password_policy, PasswordPolicy::Strict);
        assert_eq!(settings.password.memory_kib, 1024);
        assert_eq!(settings.api_key_retention, Duration::hours(1));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = load(&[("JWT_SECRET", SECRET), ("STORAGE_BACKEND", "memory"), ("API_PORT", "eighty")])
            .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));

        assert!(load(&[("JWT_SECRET", SECRET), ("STORAGE_BACKEND", "redis")]).is_err());
        assert!(load(&[("JWT_SECRET", SECRET), ("STORAGE_BACKEND", "memory"), ("AUTH_PROVIDERS", "oauth")]).is_err());
        assert!(load(&[("JWT_SECRET", SECRET), ("STORAGE_BACKEND", "memory"), ("USERS_REQUIRE_AUTH", "maybe")]).is_err());
    }
}
