//! Ledger mode: versioned migration units tracked in `schema_migrations`.
//!
//! A unit runs at most once. Its SHA-256 checksum is recorded with it, and a
//! unit that changed on disk after being applied stops the run.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::script::run_strict;
use super::{MigrationError, StatementExecutor, read_file, split_statements};

/// One `NNNN_name.sql` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub version: u32,
    pub name: String,
    pub path: PathBuf,
    pub sql: String,
    /// Lowercase hex SHA-256 of the file contents.
    pub checksum: String,
}

impl MigrationUnit {
    /// Build a unit from a file name and its contents.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidFileName` unless the name looks like
    /// `0001_create_users.sql`.
    pub fn parse(path: &Path, sql: String) -> Result<Self, MigrationError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrationError::InvalidFileName(path.display().to_string()))?;
        let invalid = || MigrationError::InvalidFileName(file_name.to_owned());

        let stem = file_name.strip_suffix(".sql").ok_or_else(invalid)?;
        let (digits, name) = stem.split_once('_').ok_or_else(invalid)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
            return Err(invalid());
        }
        let version = digits.parse().map_err(|_| invalid())?;

        Ok(Self {
            version,
            name: name.to_owned(),
            path: path.to_path_buf(),
            checksum: checksum(&sql),
            sql,
        })
    }
}

/// Hex SHA-256 of `contents`.
#[must_use]
pub fn checksum(contents: &str) -> String {
    hex::encode(Sha256::digest(contents.as_bytes()))
}

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedUnit {
    pub version: u32,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Where a unit stands relative to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Applied { at: DateTime<Utc> },
    /// Applied, but the file no longer matches the recorded checksum.
    Modified { at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    pub version: u32,
    pub name: String,
    pub state: UnitState,
}

/// Storage for the migration ledger.
pub trait LedgerStore: StatementExecutor {
    /// Create the ledger table if it does not exist.
    fn ensure_ledger(&mut self) -> impl Future<Output = Result<(), MigrationError>>;

    /// Every recorded unit, by version.
    fn applied(&mut self) -> impl Future<Output = Result<Vec<AppliedUnit>, MigrationError>>;

    /// Record `unit` as applied now.
    fn record(
        &mut self,
        unit: &MigrationUnit,
    ) -> impl Future<Output = Result<(), MigrationError>>;
}

/// Read every `.sql` unit in `dir`, ordered by version.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, a file name is not a
/// unit name, or two files share a version.
pub fn load_units(dir: &Path) -> Result<Vec<MigrationUnit>, MigrationError> {
    let io_error = |source| MigrationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut units = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }

        let unit = MigrationUnit::parse(&path, read_file(&path)?)?;
        let version = unit.version;
        if units.insert(version, unit).is_some() {
            return Err(MigrationError::DuplicateVersion(version));
        }
    }

    Ok(units.into_values().collect())
}

/// Check applied units against their files.
fn verify_applied(
    units: &[MigrationUnit],
    applied: &BTreeMap<u32, AppliedUnit>,
) -> Result<(), MigrationError> {
    for unit in units {
        if let Some(row) = applied.get(&unit.version)
            && row.checksum != unit.checksum
        {
            return Err(MigrationError::ChecksumMismatch {
                version: unit.version,
                name: unit.name.clone(),
                recorded: row.checksum.clone(),
                actual: unit.checksum.clone(),
            });
        }
    }

    for row in applied.values() {
        if !units.iter().any(|u| u.version == row.version) {
            tracing::warn!(version = row.version, name = %row.name, "Applied migration has no file");
        }
    }
    Ok(())
}

async fn applied_by_version<S: LedgerStore>(
    store: &mut S,
) -> Result<BTreeMap<u32, AppliedUnit>, MigrationError> {
    store.ensure_ledger().await?;
    Ok(store
        .applied()
        .await?
        .into_iter()
        .map(|row| (row.version, row))
        .collect())
}

/// Apply every unit not yet in the ledger, in version order.
///
/// Returns the units applied by this run.
///
/// # Errors
///
/// Returns `MigrationError::ChecksumMismatch` before running anything if an
/// applied unit changed, or the failure of the first unit that does not
/// apply. Units applied before the failure stay recorded.
pub async fn apply_pending<S: LedgerStore>(
    store: &mut S,
    units: &[MigrationUnit],
) -> Result<Vec<MigrationUnit>, MigrationError> {
    let applied = applied_by_version(store).await?;
    verify_applied(units, &applied)?;

    let mut newly_applied = Vec::new();
    for unit in units.iter().filter(|u| !applied.contains_key(&u.version)) {
        tracing::info!(version = unit.version, file = %unit.path.display(), "Applying migration");
        let statements = split_statements(&unit.sql);
        run_strict(store, &statements).await.inspect_err(|e| {
            tracing::error!(version = unit.version, name = %unit.name, error = %e, "Migration failed");
        })?;
        store.record(unit).await?;
        newly_applied.push(unit.clone());
    }

    Ok(newly_applied)
}

/// Report each unit as pending, applied, or modified since applying.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read.
pub async fn status<S: LedgerStore>(
    store: &mut S,
    units: &[MigrationUnit],
) -> Result<Vec<UnitStatus>, MigrationError> {
    let applied = applied_by_version(store).await?;

    Ok(units
        .iter()
        .map(|unit| UnitStatus {
            version: unit.version,
            name: unit.name.clone(),
            state: match applied.get(&unit.version) {
                None => UnitState::Pending,
                Some(row) if row.checksum == unit.checksum => UnitState::Applied {
                    at: row.applied_at,
                },
                Some(row) => UnitState::Modified { at: row.applied_at },
            },
        })
        .collect())
}
