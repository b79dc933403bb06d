//! Script mode: run a file statement by statement.
//!
//! Nothing is wrapped in a transaction. Statements that fail because their
//! object already exists are skipped, so a partially applied script can be
//! run again.

use super::{MigrationError, Statement, StatementExecutor};

/// Outcome of a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Statements sent to the server.
    pub attempted: usize,
    /// Statements that succeeded.
    pub applied: usize,
    /// Statements skipped as already applied.
    pub skipped: usize,
}

/// Execute `statements` in order, tolerating duplicate-definition errors.
///
/// # Errors
///
/// Stops at the first other failure and returns it; later statements are
/// not executed.
pub async fn run_script<E: StatementExecutor>(
    executor: &mut E,
    statements: &[Statement],
) -> Result<ScriptReport, MigrationError> {
    let mut report = ScriptReport::default();

    for statement in statements {
        report.attempted += 1;
        tracing::debug!(index = statement.index, sql = %statement.sql, "Executing statement");

        match executor.execute(&statement.sql).await {
            Ok(()) => report.applied += 1,
            Err(failure) => match MigrationError::from_failure(statement.index, failure) {
                err @ MigrationError::Duplicate { .. } => {
                    tracing::warn!(error = %err, "Skipping statement");
                    report.skipped += 1;
                }
                err => {
                    tracing::error!(
                        index = statement.index,
                        applied = report.applied,
                        "Stopping script; earlier statements stay applied"
                    );
                    return Err(err);
                }
            },
        }
    }

    Ok(report)
}

/// Execute `statements` in order with no tolerance for failures.
pub(super) async fn run_strict<E: StatementExecutor>(
    executor: &mut E,
    statements: &[Statement],
) -> Result<usize, MigrationError> {
    for statement in statements {
        executor
            .execute(&statement.sql)
            .await
            .map_err(|failure| MigrationError::Statement {
                index: statement.index,
                code: failure.code,
                message: failure.message,
            })?;
    }
    Ok(statements.len())
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::split_statements;
    use super::testing::FakeExecutor;
    use super::*;

    const DUP_FIELD: u16 = 1060;
    const NO_SUCH_TABLE: u16 = 1146;

    #[tokio::test]
    async fn test_duplicate_field_is_skipped() {
        let statements = split_statements(
            "ALTER TABLE t ADD a INT; ALTER TABLE t ADD b INT; ALTER TABLE t ADD a INT;",
        );
        let mut executor = FakeExecutor::failing_at(2, DUP_FIELD);

        let report = run_script(&mut executor, &statements).await.unwrap();

        assert_eq!(executor.executed.len(), 3);
        assert_eq!(
            report,
            ScriptReport {
                attempted: 3,
                applied: 2,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_other_error_stops_the_run() {
        let statements = split_statements("SELECT 1; SELECT * FROM missing; SELECT 3;");
        let mut executor = FakeExecutor::failing_at(1, NO_SUCH_TABLE);

        let err = run_script(&mut executor, &statements).await.unwrap_err();

        assert_eq!(executor.executed, vec!["SELECT 1", "SELECT * FROM missing"]);
        assert!(matches!(
            err,
            MigrationError::Statement { index: 1, code: Some(1146), .. }
        ));
    }

    #[tokio::test]
    async fn test_all_duplicate_codes_tolerated() {
        let statements = split_statements("A; B; C;");
        for code in [1060, 1061, 1826] {
            let mut executor = FakeExecutor::failing_at(1, code);
            let report = run_script(&mut executor, &statements).await.unwrap();
            assert_eq!(report.skipped, 1, "code {code}");
            assert_eq!(report.applied, 2);
        }
    }

    #[tokio::test]
    async fn test_strict_mode_fails_on_duplicates() {
        let statements = split_statements("A; B;");
        let mut executor = FakeExecutor::failing_at(0, DUP_FIELD);

        let err = run_strict(&mut executor, &statements).await.unwrap_err();

        assert!(matches!(err, MigrationError::Statement { index: 0, .. }));
        assert_eq!(executor.executed.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_script() {
        let mut executor = FakeExecutor::default();
        let report = run_script(&mut executor, &[]).await.unwrap();
        assert_eq!(report, ScriptReport::default());
    }
}
