use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Milliseconds since the Unix epoch, the timestamp unit used in every table
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Open a file-based connection pool for production use
/// Creates the file if missing, enables WAL mode and foreign keys
pub async fn open_database(db_path: &Path) -> Result<SqlitePool, DynError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Create tables and indexes (idempotent)
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for sql in ddl::all_statements() {
        sqlx::query(&sql).execute(pool).await?;
    }
    Ok(())
}

/// Record the schema version on a fresh database, refuse a mismatched one
pub async fn ensure_schema_version(pool: &SqlitePool) -> Result<(), DynError> {
    let existing = match sqlx::query(&metadata::select_by_key("version"))
        .fetch_optional(pool)
        .await?
    {
        Some(row) => Some(
            row.try_get::<String, _>(0)
                .map_err(|e| format!("Unreadable database version: {}", e))?,
        ),
        None => None,
    };

    match existing {
        None => {
            sqlx::query(&metadata::insert("version", EXPECTED_DB_VERSION))
                .execute(pool)
                .await?;
            Ok(())
        }
        Some(version) if version == EXPECTED_DB_VERSION => Ok(()),
        Some(version) => Err(format!(
            "Unsupported database version: '{}'. This application only supports version '{}'",
            version, EXPECTED_DB_VERSION
        )
        .into()),
    }
}

/// Open, create schema and check version in one step
pub async fn open_and_prepare(db_path: &Path) -> Result<SqlitePool, DynError> {
    let pool = open_database(db_path).await?;
    init_database_schema(&pool).await?;
    ensure_schema_version(&pool).await?;
    Ok(pool)
}

/// Create a prepared database in a temporary directory for testing
/// The pool has several connections, so an in-memory database would not be shared;
/// keep the returned guard alive for the duration of the test
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), DynError> {
    let dir = tempfile::tempdir()?;
    let pool = open_and_prepare(&dir.path().join("test.sqlite")).await?;
    Ok((pool, dir))
}
