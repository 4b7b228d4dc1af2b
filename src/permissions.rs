use axum::http::Method;
use uuid::Uuid;

use crate::models::User;

/// Request-level and object-level access predicates.
///
/// Handlers evaluate these against the (optionally) authenticated user;
/// the auth middleware only proves identity, it never grants anything.

/// GET/HEAD/OPTIONS never mutate and are open to everyone.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Safe methods always pass; mutating methods need an authenticated
/// admin. Guards the catalog resources (categories, genres, titles).
pub fn admin_or_read_only(method: &Method, user: Option<&User>) -> bool {
    is_safe_method(method) || user.is_some_and(|u| u.role.is_admin())
}

/// Object-level rule for reviews and comments: only the author or a
/// moderator may mutate. Admin is not included here.
pub fn author_or_moderator(user: &User, author_id: Uuid) -> bool {
    user.id == author_id || user.role.is_moderator()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;

    fn user_with_role(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: format!("{}-user", role.to_str()),
            email: format!("{}@example.com", role.to_str()),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            is_active: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn safe_methods_pass_for_anonymous() {
        assert!(admin_or_read_only(&Method::GET, None));
        assert!(admin_or_read_only(&Method::HEAD, None));
        assert!(admin_or_read_only(&Method::OPTIONS, None));
    }

    #[test]
    fn mutation_requires_admin() {
        let user = user_with_role(UserRole::User);
        let moderator = user_with_role(UserRole::Moderator);
        let admin = user_with_role(UserRole::Admin);

        assert!(!admin_or_read_only(&Method::POST, None));
        assert!(!admin_or_read_only(&Method::POST, Some(&user)));
        assert!(!admin_or_read_only(&Method::DELETE, Some(&moderator)));
        assert!(admin_or_read_only(&Method::POST, Some(&admin)));
        assert!(admin_or_read_only(&Method::PATCH, Some(&admin)));
    }

    #[test]
    fn author_may_mutate_own_object() {
        let author = user_with_role(UserRole::User);
        assert!(author_or_moderator(&author, author.id));
    }

    #[test]
    fn stranger_may_not_mutate() {
        let stranger = user_with_role(UserRole::User);
        assert!(!author_or_moderator(&stranger, Uuid::new_v4()));
    }

    #[test]
    fn moderator_may_mutate_any_object() {
        let moderator = user_with_role(UserRole::Moderator);
        assert!(author_or_moderator(&moderator, Uuid::new_v4()));
    }

    #[test]
    fn admin_is_not_granted_object_level_mutation() {
        // Admins manage the catalog and users, but moderation of other
        // people's reviews and comments belongs to moderators.
        let admin = user_with_role(UserRole::Admin);
        assert!(!author_or_moderator(&admin, Uuid::new_v4()));
    }
}
