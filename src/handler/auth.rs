use crate::{
    AppState,
    db::UserExt,
    dtos::{Response, SignupDto, TokenExchangeDto, TokenResponseDto},
    error::{ErrorMessage, HttpError},
    mail::mails::send_confirmation_email,
    models::UserRole,
    utils::token,
};
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use tracing::instrument;
use validator::Validate;

/// Router for the two-phase signup flow
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/email", post(signup))
        .route("/token", post(exchange_token))
}

/// Turn an email address into a default username: every separator the
/// local/domain parts use becomes a hyphen.
fn derive_username(email: &str) -> String {
    email
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Phase one: create an inactive account and mail a confirmation code.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(body): Json<SignupDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid signup input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let username = body
        .username
        .clone()
        .unwrap_or_else(|| derive_username(&body.email));

    let result = app_state
        .db_client
        .save_user(
            &username,
            &body.email,
            body.first_name.as_deref().unwrap_or(""),
            body.last_name.as_deref().unwrap_or(""),
            body.bio.as_deref().unwrap_or(""),
            UserRole::User,
            false,
        )
        .await;

    let user = match result {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            return Err(HttpError::bad_request(
                "A user with this email or username already exists",
            ));
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    let code = token::create_confirmation_code(
        &user,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.confirmation_maxage,
    )
    .map_err(|e| {
        tracing::error!("Confirmation code creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    // fire-and-forget: delivery problems are the mailer's concern
    if let Err(e) = send_confirmation_email(&user.email, &user.username, &code).await {
        tracing::error!("Failed to send confirmation email: {}", e);
    }

    tracing::info!(username = %user.username, email = %user.email, "Signup successful");
    Ok(Json(Response {
        status: "success",
        message: format!("Confirmation code sent to {}", user.email),
    }))
}

/// Phase two: verify the mailed code against the current user state,
/// activate the account and hand out the access token.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn exchange_token(
    State(app_state): State<AppState>,
    Json(body): Json<TokenExchangeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid token exchange input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    // one generic message whichever check failed: no account enumeration
    if !token::verify_confirmation_code(
        &body.confirmation_code,
        &user,
        app_state.env.jwt_secret.as_bytes(),
    ) {
        tracing::error!(email = %body.email, "Confirmation code rejected");
        return Err(HttpError::bad_request(
            ErrorMessage::InvalidConfirmationCode.to_string(),
        ));
    }

    // flipping is_active invalidates the code that just succeeded
    let user = app_state.db_client.activate_user(user.id).await.map_err(|e| {
        tracing::error!("DB error, activating user: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!(user_id = %user.id, "Account activated");
    Ok(Json(TokenResponseDto {
        status: "success".to_string(),
        token: access_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::derive_username;

    #[test]
    fn username_derivation_replaces_separators() {
        assert_eq!(derive_username("jane.doe@mail.org"), "jane-doe-mail-org");
        assert_eq!(derive_username("a_b@c.io"), "a-b-c-io");
    }

    #[test]
    fn username_derivation_keeps_alphanumerics() {
        assert_eq!(derive_username("user42@x.y"), "user42-x-y");
    }
}
