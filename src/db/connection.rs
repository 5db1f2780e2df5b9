use super::{DbConnection, DbPool};
use crate::db::error::RepositoryError;
use diesel::dsl::select;
use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::sql_types::Integer;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use once_cell::sync::OnceCell;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const POOL_MAX_SIZE: u32 = 5;

static DB_POOL: OnceCell<DbPool> = OnceCell::new();

pub fn build_pool(database_url: &str) -> Result<DbPool, RepositoryError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    diesel::r2d2::Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .build(manager)
        .map_err(Into::into)
}

/// Creates the process-wide pool. Later calls return the existing pool.
pub fn init_pool(database_url: &str) -> Result<&'static DbPool, RepositoryError> {
    DB_POOL.get_or_try_init(|| build_pool(database_url))
}

pub fn get_connection() -> Result<DbConnection, RepositoryError> {
    DB_POOL
        .get()
        .ok_or_else(|| RepositoryError::PoolError("Database pool is not initialised".to_string()))?
        .get()
        .map_err(Into::into)
}

/// Applies pending embedded migrations, returning how many ran.
pub fn run_migrations() -> Result<usize, RepositoryError> {
    let mut conn = get_connection()?;
    let conn: &mut PgConnection = &mut conn;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| RepositoryError::DatabaseError(format!("Migration failed: {e}")))?;

    for version in &applied {
        tracing::info!(%version, "Applied migration");
    }
    Ok(applied.len())
}

/// Round-trip check used by the `/api/db` health endpoint.
pub trait ConnectivityCheck: Send + Sync {
    /// Runs `SELECT 1` and returns the selected value.
    fn select_one(&self) -> Result<i32, RepositoryError>;
}

/// Checks the process-wide pool.
pub struct PoolConnectivity;

impl ConnectivityCheck for PoolConnectivity {
    fn select_one(&self) -> Result<i32, RepositoryError> {
        let mut conn = get_connection()?;

        select(1.into_sql::<Integer>())
            .get_result::<i32>(&mut conn)
            .map_err(Into::into)
    }
}

#[cfg(test)]
pub fn init_test_pool() {
    static MIGRATED: OnceCell<()> = OnceCell::new();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    init_pool(&database_url).expect("Failed to create database pool");

    MIGRATED.get_or_init(|| {
        run_migrations().expect("Failed to run migrations");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn pool_has_configured_max_size() {
        init_test_pool();
        let pool = DB_POOL.get().expect("pool initialised");
        assert_eq!(pool.max_size(), POOL_MAX_SIZE);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn select_one_round_trips() {
        init_test_pool();
        assert_eq!(PoolConnectivity.select_one().expect("select 1"), 1);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn migrations_are_idempotent() {
        init_test_pool();
        assert_eq!(run_migrations().expect("second run"), 0);
    }
}
