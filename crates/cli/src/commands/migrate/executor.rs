//! Statement execution seam.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::MySqlConnection;
use sqlx::mysql::MySqlDatabaseError;

use super::ledger::{AppliedUnit, LedgerStore, MigrationUnit};
use super::MigrationError;

/// Why a statement failed, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    /// MySQL error number, when the server produced one.
    pub code: Option<u16>,
    pub message: String,
}

impl From<sqlx::Error> for StatementFailure {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
            .map(MySqlDatabaseError::number);
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Runs one SQL statement at a time.
pub trait StatementExecutor {
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<(), StatementFailure>>;
}

impl StatementExecutor for MySqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), StatementFailure> {
        // Plain text protocol; DDL does not need a prepared statement.
        sqlx::raw_sql(sql).execute(&mut *self).await?;
        Ok(())
    }
}

const CREATE_LEDGER: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INT UNSIGNED PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    checksum CHAR(64) NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

impl LedgerStore for MySqlConnection {
    async fn ensure_ledger(&mut self) -> Result<(), MigrationError> {
        sqlx::raw_sql(CREATE_LEDGER).execute(&mut *self).await?;
        Ok(())
    }

    async fn applied(&mut self) -> Result<Vec<AppliedUnit>, MigrationError> {
        let rows = sqlx::query_as::<_, (u32, String, String, DateTime<Utc>)>(
            "SELECT version, name, checksum, applied_at FROM schema_migrations ORDER BY version",
        )
        .fetch_all(&mut *self)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(version, name, checksum, applied_at)| AppliedUnit {
                version,
                name,
                checksum,
                applied_at,
            })
            .collect())
    }

    async fn record(&mut self, unit: &MigrationUnit) -> Result<(), MigrationError> {
        sqlx::query("INSERT INTO schema_migrations (version, name, checksum) VALUES (?, ?, ?)")
            .bind(unit.version)
            .bind(&unit.name)
            .bind(&unit.checksum)
            .execute(&mut *self)
            .await?;
        Ok(())
    }
}
