use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};
use crate::models::User;

/// Claims of the access credential. `sub` carries the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Claims of the email confirmation code.
///
/// Besides the subject, the code is bound to mutable user state: `email`
/// and `active` are snapshotted at issue time and re-checked against the
/// current user record on exchange. Activating the account flips
/// `is_active`, so an already-used code can never be replayed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    pub sub: String,
    pub email: String,
    pub active: bool,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::new(
            ErrorMessage::InvalidToken.to_string(),
            StatusCode::UNAUTHORIZED,
        )),
    }
}

pub fn create_confirmation_code(
    user: &User,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = ConfirmationClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        active: user.is_active,
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Check a confirmation code against the current user record.
///
/// Returns false on any failure: bad signature, expiry, or a claims
/// mismatch with the user's present state. The caller answers with one
/// generic message either way.
pub fn verify_confirmation_code(code: &str, user: &User, secret: &[u8]) -> bool {
    let decoded = decode::<ConfirmationClaims>(
        code,
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(data) => {
            let claims = data.claims;
            claims.sub == user.id.to_string()
                && claims.email == user.email
                && claims.active == user.is_active
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use uuid::Uuid;

    const SECRET: &[u8] = b"unit-test-secret";

    fn inactive_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "frodo".to_string(),
            email: "frodo@shire.me".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: UserRole::User,
            is_active: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let id = Uuid::new_v4().to_string();
        let token = create_token(&id, SECRET, 60).unwrap();
        assert_eq!(decode_token(token, SECRET).unwrap(), id);
    }

    #[test]
    fn access_token_rejects_wrong_secret() {
        let token = create_token("someone", SECRET, 60).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(create_token("", SECRET, 60).is_err());
    }

    #[test]
    fn confirmation_code_matches_issuing_state() {
        let user = inactive_user();
        let code = create_confirmation_code(&user, SECRET, 60).unwrap();
        assert!(verify_confirmation_code(&code, &user, SECRET));
    }

    #[test]
    fn confirmation_code_dies_with_activation() {
        let mut user = inactive_user();
        let code = create_confirmation_code(&user, SECRET, 60).unwrap();

        // the exchange itself flips is_active, invalidating the code
        user.is_active = true;
        assert!(!verify_confirmation_code(&code, &user, SECRET));
    }

    #[test]
    fn confirmation_code_is_bound_to_email() {
        let mut user = inactive_user();
        let code = create_confirmation_code(&user, SECRET, 60).unwrap();

        user.email = "sam@shire.me".to_string();
        assert!(!verify_confirmation_code(&code, &user, SECRET));
    }

    #[test]
    fn confirmation_code_is_not_transferable() {
        let user = inactive_user();
        let other = inactive_user();
        let code = create_confirmation_code(&user, SECRET, 60).unwrap();
        assert!(!verify_confirmation_code(&code, &other, SECRET));
    }

    #[test]
    fn expired_confirmation_code_fails() {
        let user = inactive_user();
        // already expired at issue time (leeway in jsonwebtoken defaults to 60s)
        let code = create_confirmation_code(&user, SECRET, -120).unwrap();
        assert!(!verify_confirmation_code(&code, &user, SECRET));
    }
}
