use crate::models::{Category, Genre, User, UserRole};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// DTOs define the representations exchanged with clients, separate from
// the database models so handlers control exactly what goes in and out.
// Author and parent associations never appear in inbound DTOs: they are
// always taken from the authenticated identity and the request path.

// ============================================================================
// Shared validators
// ============================================================================

/// Slugs are lowercase ascii letters, digits and hyphens, as produced by
/// the catalog importers.
fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug"))
    }
}

/// A title's year cannot lie in the future.
fn validate_year(year: i16) -> Result<(), ValidationError> {
    if i32::from(year) > Utc::now().year() {
        Err(ValidationError::new("year_in_future"))
    } else {
        Ok(())
    }
}

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Signup request. Username is optional: when absent it is derived from
/// the email address.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignupDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, max = 60, message = "Username must be 1-60 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 60, message = "First name is too long"))]
    pub first_name: Option<String>,

    #[validate(length(max = 60, message = "Last name is too long"))]
    pub last_name: Option<String>,

    pub bio: Option<String>,
}

/// Second phase of signup: exchange the mailed code for an access token.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenExchangeDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Confirmation code is required"))]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponseDto {
    pub status: String,
    pub token: String,
}

/// Generic success response
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// Pagination & query DTOs
// ============================================================================

#[derive(Serialize, Deserialize, Validate, Debug, Default)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,

    /// Substring match over name and slug (categories/genres).
    #[validate(length(min = 1))]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PaginationDto {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        PaginationDto {
            page,
            limit,
            total,
            total_pages: (total as f64 / limit as f64).ceil() as i64,
        }
    }
}

// ============================================================================
// User DTOs
// ============================================================================

/// Client-safe user representation.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FilterUserDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            bio: user.bio.to_owned(),
            role: user.role.to_str().to_string(),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub data: Vec<FilterUserDto>,
    pub pagination: PaginationDto,
}

/// Admin-side user creation. Unlike signup, the account is active
/// immediately and a role may be assigned.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, max = 60, message = "Username must be 1-60 characters"))]
    pub username: String,

    #[validate(length(max = 60))]
    pub first_name: Option<String>,

    #[validate(length(max = 60))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<UserRole>,
}

/// Admin-side partial update; may change the role.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateUserDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 60, message = "Username must be 1-60 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 60))]
    pub first_name: Option<String>,

    #[validate(length(max = 60))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<UserRole>,
}

/// Self-service partial update (`/users/me`). No role field: a user
/// cannot change their own tier.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateMeDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 60, message = "Username must be 1-60 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 60))]
    pub first_name: Option<String>,

    #[validate(length(max = 60))]
    pub last_name: Option<String>,

    pub bio: Option<String>,
}

#[derive(Serialize, Deserialize, Validate, Debug, Default)]
pub struct UsersQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,

    #[validate(length(min = 1))]
    pub username: Option<String>,
}

// ============================================================================
// Category / Genre DTOs
// ============================================================================

/// Create request shared by categories and genres: both are plain
/// name-plus-slug reference data.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct NameSlugDto {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, max = 64, message = "Slug must be 1-64 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: String,
}

/// Outbound category/genre representation (no surrogate id).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NameSlugOutDto {
    pub name: String,
    pub slug: String,
}

impl From<Category> for NameSlugOutDto {
    fn from(c: Category) -> Self {
        NameSlugOutDto {
            name: c.name,
            slug: c.slug,
        }
    }
}

impl From<Genre> for NameSlugOutDto {
    fn from(g: Genre) -> Self {
        NameSlugOutDto {
            name: g.name,
            slug: g.slug,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameSlugResponseDto {
    pub status: String,
    pub data: NameSlugOutDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameSlugListResponseDto {
    pub status: String,
    pub data: Vec<NameSlugOutDto>,
    pub pagination: PaginationDto,
}

// ============================================================================
// Title DTOs
// ============================================================================

/// Title write representation: genre and category are referenced by slug
/// and must already exist.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateTitleDto {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(custom(function = "validate_year"))]
    pub year: i16,

    pub description: Option<String>,

    pub genre: Option<Vec<String>>,

    pub category: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateTitleDto {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_year"))]
    pub year: Option<i16>,

    pub description: Option<String>,

    pub genre: Option<Vec<String>>,

    pub category: Option<String>,
}

/// Title read representation: category/genres expanded to full objects,
/// `rating` computed from review scores (absent with zero reviews).
#[derive(Debug, Serialize, Deserialize)]
pub struct TitleDto {
    pub id: i64,
    pub name: String,
    pub year: i16,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<NameSlugOutDto>,
    pub category: Option<NameSlugOutDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponseDto {
    pub status: String,
    pub data: TitleDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TitleListResponseDto {
    pub status: String,
    pub data: Vec<TitleDto>,
    pub pagination: PaginationDto,
}

#[derive(Serialize, Deserialize, Validate, Debug, Default)]
pub struct TitlesQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,

    /// Category slug, exact match.
    #[validate(length(min = 1))]
    pub category: Option<String>,

    /// Genre slug, exact match.
    #[validate(length(min = 1))]
    pub genre: Option<String>,

    /// Substring match over the title name.
    #[validate(length(min = 1))]
    pub name: Option<String>,

    pub year: Option<i16>,
}

// ============================================================================
// Review DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    pub score: i16,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateReviewDto {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    pub score: Option<i16>,
}

/// Review with the author expanded to a username.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewDto {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub score: i16,
    #[serde(rename = "pubDate")]
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponseDto {
    pub status: String,
    pub data: ReviewDto,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponseDto {
    pub status: String,
    pub data: Vec<ReviewDto>,
    pub pagination: PaginationDto,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateCommentDto {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Text must be between 1 and 2000 characters"
    ))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentDto {
    pub id: i64,
    pub text: String,
    pub author: String,
    #[serde(rename = "pubDate")]
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponseDto {
    pub status: String,
    pub data: CommentDto,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponseDto {
    pub status: String,
    pub data: Vec<CommentDto>,
    pub pagination: PaginationDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_score_bounds() {
        let ok = CreateReviewDto {
            text: "solid".to_string(),
            score: 10,
        };
        assert!(ok.validate().is_ok());

        let low = CreateReviewDto {
            text: "meh".to_string(),
            score: 0,
        };
        assert!(low.validate().is_err());

        let high = CreateReviewDto {
            text: "wow".to_string(),
            score: 11,
        };
        assert!(high.validate().is_err());
    }

    #[test]
    fn title_year_cannot_be_in_the_future() {
        let this_year = Utc::now().year() as i16;

        let current = CreateTitleDto {
            name: "Dune".to_string(),
            year: this_year,
            ..Default::default()
        };
        assert!(current.validate().is_ok());

        let next = CreateTitleDto {
            name: "Dune 3".to_string(),
            year: this_year + 1,
            ..Default::default()
        };
        assert!(next.validate().is_err());
    }

    #[test]
    fn slug_rejects_uppercase_and_spaces() {
        let ok = NameSlugDto {
            name: "Science Fiction".to_string(),
            slug: "sci-fi".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = NameSlugDto {
            name: "Science Fiction".to_string(),
            slug: "Sci Fi".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn signup_requires_valid_email() {
        let dto = SignupDto {
            email: "not-an-email".to_string(),
            ..Default::default()
        };
        assert!(dto.validate().is_err());

        let dto = SignupDto {
            email: "reader@example.com".to_string(),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn filter_user_hides_nothing_it_should_show() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: "bilbo".to_string(),
            email: "bilbo@shire.me".to_string(),
            first_name: "Bilbo".to_string(),
            last_name: "Baggins".to_string(),
            bio: "there and back again".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        let filtered = FilterUserDto::filter_user(&user);
        assert_eq!(filtered.username, "bilbo");
        assert_eq!(filtered.role, "user");
        // internal fields stay internal
        let json = serde_json::to_string(&filtered).unwrap();
        assert!(!json.contains("is_active"));
        assert!(!json.contains("id"));
    }
}
