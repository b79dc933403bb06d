//! User repository.

use sqlx::{FromRow, MySqlPool};

use tillpoint_core::{Role, UserId, UserProfile};

use super::RepositoryError;

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password_hash: String,
    display_name: String,
    role: String,
}

/// A stored account, including its password hash.
#[derive(Clone)]
pub struct UserRecord {
    pub profile: UserProfile,
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("profile", &self.profile)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role for user {}: {e}", row.id))
        })?;

        Ok(Self {
            profile: UserProfile {
                id: UserId::new(row.id),
                username: row.username,
                display_name: row.display_name,
                role,
            },
            password_hash: row.password_hash,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Look up an account by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored role is unknown.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, password_hash, display_name, role
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails, including on
    /// a duplicate username.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        display_name: &str,
        role: Role,
    ) -> Result<UserId, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO users (username, password_hash, display_name, role)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(username)
        .bind(password_hash)
        .bind(display_name)
        .bind(role.as_str())
        .execute(self.pool)
        .await?;

        let id = i32::try_from(result.last_insert_id()).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "user id {} out of range",
                result.last_insert_id()
            ))
        })?;
        Ok(UserId::new(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: 3,
            username: "amy".to_owned(),
            password_hash: "$argon2id$...".to_owned(),
            display_name: "Amy".to_owned(),
            role: role.to_owned(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let record = UserRecord::try_from(row("admin")).unwrap();
        assert_eq!(record.profile.id, UserId::new(3));
        assert_eq!(record.profile.role, Role::Admin);
    }

    #[test]
    fn test_unknown_role_is_corruption() {
        let err = UserRecord::try_from(row("manager")).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_debug_hides_hash() {
        let record = UserRecord::try_from(row("cashier")).unwrap();
        assert!(!format!("{record:?}").contains("argon2"));
    }
}
