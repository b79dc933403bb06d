//! Key/value settings.

use sqlx::MySqlPool;

use tillpoint_core::BusinessType;

use super::RepositoryError;

const BUSINESS_TYPE_KEY: &str = "business_type";

/// Repository for the `settings` table.
pub struct SettingsRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Read a raw setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let value = sqlx::query_scalar::<_, String>("SELECT `value` FROM settings WHERE `key` = ?")
            .bind(key)
            .fetch_optional(self.pool)
            .await?;
        Ok(value)
    }

    /// Insert or replace a raw setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO settings (`key`, `value`)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE `value` = VALUES(`value`)
            ",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The configured business type, if setup has been completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored value no longer
    /// validates.
    pub async fn business_type(&self) -> Result<Option<BusinessType>, RepositoryError> {
        self.get(BUSINESS_TYPE_KEY)
            .await?
            .map(|raw| {
                BusinessType::parse(&raw).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid business type: {e}"))
                })
            })
            .transpose()
    }

    /// Record the business type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn set_business_type(&self, business_type: &BusinessType) -> Result<(), RepositoryError> {
        self.set(BUSINESS_TYPE_KEY, business_type.as_str()).await
    }
}
