use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization tier attached to every user.
///
/// Stored as the PostgreSQL ENUM "user_role". Capability checks go
/// through the helper methods instead of string comparison so a new tier
/// forces every call site through the compiler.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Moderator,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
            UserRole::User => "user",
        }
    }

    /// Full control over catalog resources and user management.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// May mutate other people's reviews and comments. Admin does not
    /// inherit this: object-level moderation is a separate capability.
    pub fn is_moderator(&self) -> bool {
        matches!(self, UserRole::Moderator)
    }
}

/// User row. Accounts are created with `is_active = false` and only
/// become usable after the email confirmation code is exchanged.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Reference data: categories group titles coarsely ("Books", "Films").
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Reference data: a title can carry any number of genres.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A reviewable work. `category_id` is nullable and nulled when the
/// category is deleted; genres live in the `title_genre` join table.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i16,
    pub description: String,
    pub category_id: Option<i64>,
}

/// One user's review of one title. The `(title_id, author_id)` pair is
/// unique at the schema level.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_capabilities() {
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Admin.is_moderator());
        assert!(UserRole::Moderator.is_moderator());
        assert!(!UserRole::Moderator.is_admin());
        assert!(!UserRole::User.is_admin());
        assert!(!UserRole::User.is_moderator());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Moderator).unwrap(),
            r#""moderator""#
        );
    }
}
