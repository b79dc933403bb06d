//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migration units and record them in the ledger
//! tillpoint migrate run
//! tillpoint migrate run --dir path/to/migrations
//!
//! # Show which units are applied
//! tillpoint migrate status
//!
//! # Run a hand-written script statement by statement
//! tillpoint migrate script upgrade.sql
//! ```
//!
//! # Environment Variables
//!
//! - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` - MySQL connection
//!
//! # Migration Files
//!
//! Units live in `crates/api/migrations/` and are named `NNNN_name.sql`:
//! ```text
//! migrations/
//! ├── 0001_create_users.sql
//! ├── 0002_create_settings.sql
//! └── ...
//! ```

mod executor;
mod ledger;
mod script;
mod split;

use std::path::{Path, PathBuf};

use sqlx::{Connection, MySqlConnection};
use thiserror::Error;

use tillpoint_api::{ConfigError, DatabaseConfig, db};

use executor::{StatementExecutor, StatementFailure};
use ledger::MigrationUnit;
use script::ScriptReport;
use split::{Statement, split_statements};

pub use ledger::{UnitState, UnitStatus};

/// Default location of migration units, relative to the workspace root.
pub const DEFAULT_MIGRATIONS_DIR: &str = "crates/api/migrations";

/// MySQL server errors meaning "this already exists".
///
/// - 1060 `ER_DUP_FIELDNAME`
/// - 1061 `ER_DUP_KEYNAME`
/// - 1826 `ER_FK_DUP_NAME`
pub const DUPLICATE_ERROR_CODES: [u16; 3] = [1060, 1061, 1826];

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A statement tried to create something that already exists.
    ///
    /// Tolerated in script mode: logged and skipped.
    #[error("statement {index} already applied (error {code}): {message}")]
    Duplicate {
        index: usize,
        code: u16,
        message: String,
    },

    /// A statement failed; nothing after it was executed.
    #[error("statement {index} failed: {message}")]
    Statement {
        index: usize,
        code: Option<u16>,
        message: String,
    },

    /// A script or unit could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connection or ledger query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Connection settings are missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An applied unit was edited after it ran.
    #[error(
        "checksum mismatch for migration {version} ({name}): recorded {recorded}, file has {actual}"
    )]
    ChecksumMismatch {
        version: u32,
        name: String,
        recorded: String,
        actual: String,
    },

    /// Two unit files share a version number.
    #[error("duplicate migration version {0}")]
    DuplicateVersion(u32),

    /// A `.sql` file in the migrations directory is not named `NNNN_name.sql`.
    #[error("invalid migration file name: {0}")]
    InvalidFileName(String),
}

impl MigrationError {
    /// Classify a failed statement.
    fn from_failure(index: usize, failure: StatementFailure) -> Self {
        match failure.code {
            Some(code) if DUPLICATE_ERROR_CODES.contains(&code) => Self::Duplicate {
                index,
                code,
                message: failure.message,
            },
            code => Self::Statement {
                index,
                code,
                message: failure.message,
            },
        }
    }
}

fn read_file(path: &Path) -> Result<String, MigrationError> {
    std::fs::read_to_string(path).map_err(|source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn connect() -> Result<MySqlConnection, MigrationError> {
    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, database = %config.name, "Connecting to database...");
    Ok(MySqlConnection::connect_with(&db::connect_options(&config)).await?)
}

/// Close `conn` whatever `result` holds, then hand `result` back.
async fn close_after<T>(
    conn: MySqlConnection,
    result: Result<T, MigrationError>,
) -> Result<T, MigrationError> {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close database connection cleanly");
    }
    result
}

/// `tillpoint migrate script <file>`
///
/// # Errors
///
/// Returns the first non-duplicate statement failure, or an I/O,
/// configuration or connection error.
pub async fn script(path: &Path) -> Result<ScriptReport, MigrationError> {
    let sql = read_file(path)?;
    let statements = split_statements(&sql);
    tracing::info!(file = %path.display(), statements = statements.len(), "Running migration script");

    let mut conn = connect().await?;
    let result = script::run_script(&mut conn, &statements).await;
    let report = close_after(conn, result).await?;

    tracing::info!(
        attempted = report.attempted,
        applied = report.applied,
        skipped = report.skipped,
        "Migration script complete"
    );
    Ok(report)
}

/// `tillpoint migrate run [--dir <dir>]`
///
/// # Errors
///
/// Returns an error if the units cannot be loaded, an applied unit was
/// modified, or a pending unit fails.
pub async fn run(dir: &Path) -> Result<Vec<MigrationUnit>, MigrationError> {
    let units = ledger::load_units(dir)?;
    tracing::info!(dir = %dir.display(), units = units.len(), "Running migrations");

    let mut conn = connect().await?;
    let result = ledger::apply_pending(&mut conn, &units).await;
    let applied = close_after(conn, result).await?;

    if applied.is_empty() {
        tracing::info!("Database is up to date");
    } else {
        tracing::info!(applied = applied.len(), "Migrations complete");
    }
    Ok(applied)
}

/// `tillpoint migrate status [--dir <dir>]`
///
/// # Errors
///
/// Returns an error if the units or the ledger cannot be read.
pub async fn status(dir: &Path) -> Result<Vec<UnitStatus>, MigrationError> {
    let units = ledger::load_units(dir)?;

    let mut conn = connect().await?;
    let result = ledger::status(&mut conn, &units).await;
    close_after(conn, result).await
}
