/// Schema migrations
///
/// The SQL files in `roster-shared/migrations/` are embedded at compile time:
/// - `create_user_auth`: accounts (`CITEXT` email, unique)
/// - `create_auth_sessions`: session cache
/// - `create_api_keys`: hashed API keys
///
/// # Example
///
/// ```no_run
/// use roster_shared::db::pool::{create_pool, DatabaseConfig};
/// use roster_shared::db::migrations::{ensure_database_exists, get_migration_status, run_migrations};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let url = std::env::var("DATABASE_URL")?;
/// ensure_database_exists(&url).await?;
///
/// let pool = create_pool(DatabaseConfig { url, ..Default::default() }).await?;
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// assert!(status.is_up_to_date);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::{postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    /// Highest applied version
    pub latest_version: Option<i64>,

    /// Whether the highest embedded version has been applied
    pub is_up_to_date: bool,
}

/// Highest version compiled into this binary
pub fn embedded_latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Applies pending migrations
///
/// Each migration runs in its own transaction; a failure leaves earlier ones
/// applied and returns the error.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(embedded = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations complete");
    Ok(())
}

/// Reads `_sqlx_migrations`; a database never migrated reports zero
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("No migrations table yet");
        return Ok(status_from(0, None));
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(status_from(count.max(0) as usize, latest_version))
}

fn status_from(applied_migrations: usize, latest_version: Option<i64>) -> MigrationStatus {
    let is_up_to_date = match (embedded_latest_version(), latest_version) {
        (None, _) => true,
        (Some(embedded), Some(applied)) => applied >= embedded,
        (Some(_), None) => false,
    };

    MigrationStatus {
        applied_migrations,
        latest_version,
        is_up_to_date,
    }
}

/// Creates the database named in the URL when it is missing
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrator_embeds_all_files() {
        let descriptions: Vec<_> = MIGRATOR.iter().map(|m| m.description.to_string()).collect();
        assert_eq!(
            descriptions,
            vec!["create user auth", "create auth sessions", "create api keys"]
        );
        assert_eq!(embedded_latest_version(), Some(20260101000003));
    }

    #[test]
    fn test_status_tracks_embedded_version() {
        assert!(!status_from(0, None).is_up_to_date);
        assert!(!status_from(1, Some(20260101000001)).is_up_to_date);

        let current = status_from(3, Some(20260101000003));
        assert!(current.is_up_to_date);
        assert_eq!(current.applied_migrations, 3);
    }
}
