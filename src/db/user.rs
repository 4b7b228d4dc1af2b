use super::DBClient;
use crate::models::{User, UserRole};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_active, created_at, updated_at";

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, username or email.
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Paginated user listing, optionally filtered by username substring.
    async fn get_users(
        &self,
        page: i64,
        limit: i64,
        username: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self, username: Option<&str>) -> Result<i64, sqlx::Error>;

    /// Insert a new user. Signup passes `is_active = false`; admin-side
    /// creation passes `true`.
    #[allow(clippy::too_many_arguments)]
    async fn save_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        bio: &str,
        role: UserRole,
        is_active: bool,
    ) -> Result<User, sqlx::Error>;

    /// Flip `is_active` after a successful confirmation code exchange.
    async fn activate_user(&self, user_id: Uuid) -> Result<User, sqlx::Error>;

    /// Overwrite the mutable profile columns. Callers resolve partial
    /// updates against the current record first.
    #[allow(clippy::too_many_arguments)]
    async fn update_user(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        bio: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    async fn delete_user_by_username(&self, username: &str) -> Result<(), sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_users(
        &self,
        page: i64,
        limit: i64,
        username: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let users = if let Some(username) = username {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE username ILIKE '%' || $1 || '%'
                 ORDER BY username LIMIT $2 OFFSET $3"
            ))
            .bind(username)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 ORDER BY username LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(users)
    }

    async fn get_user_count(&self, username: Option<&str>) -> Result<i64, sqlx::Error> {
        let count: i64 = if let Some(username) = username {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM users WHERE username ILIKE '%' || $1 || '%'",
            )
            .bind(username)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count)
    }

    async fn save_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        bio: &str,
        role: UserRole,
        is_active: bool,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, first_name, last_name, bio, role, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(bio)
        .bind(role)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn activate_user(&self, user_id: Uuid) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET is_active = TRUE, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        bio: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = $1, email = $2, first_name = $3, last_name = $4,
                 bio = $5, role = $6, updated_at = NOW()
             WHERE id = $7
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(bio)
        .bind(role)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_user_by_username(&self, username: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
