use crate::{
    AppState,
    db::UserExt,
    dtos::{
        CreateUserDto, FilterUserDto, PaginationDto, UpdateMeDto, UpdateUserDto,
        UserListResponseDto, UserResponseDto, UsersQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, require_admin},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;
use validator::Validate;

/// Router for user management.
///
/// The auth middleware is applied to the whole subtree in routes.rs;
/// everything except `/me` additionally requires the admin role.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/",
            get(get_users)
                .post(create_user)
                .route_layer(middleware::from_fn(require_admin)),
        )
        .route(
            "/{username}",
            get(get_user_by_username)
                .patch(update_user)
                .delete(delete_user)
                .route_layer(middleware::from_fn(require_admin)),
        )
}

/// Current user's profile.
#[instrument(skip(auth), fields(username = %auth.user.username))]
pub async fn get_me(
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let response = UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&auth.user),
    };
    Ok(Json(response))
}

/// Partial self-update. The caller's role is carried over untouched.
#[instrument(skip(app_state, auth, body), fields(username = %auth.user.username))]
pub async fn update_me(
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateMeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_me input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = &auth.user;
    let updated = app_state
        .db_client
        .update_user(
            user.id,
            body.username.as_deref().unwrap_or(&user.username),
            body.email.as_deref().unwrap_or(&user.email),
            body.first_name.as_deref().unwrap_or(&user.first_name),
            body.last_name.as_deref().unwrap_or(&user.last_name),
            body.bio.as_deref().unwrap_or(&user.bio),
            user.role,
        )
        .await
        .map_err(map_user_write_error)?;

    tracing::info!("update_me successful");
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&updated),
    }))
}

/// Paginated user listing, optionally filtered by username substring.
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<UsersQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);
    let username = query_params.username.as_deref();

    let users = app_state
        .db_client
        .get_users(page, limit, username)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_user_count(username)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_users(&users),
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_users successful");
    Ok(Json(response))
}

/// Admin-side user creation; the account is active from the start.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn create_user(
    State(app_state): State<AppState>,
    Json(body): Json<CreateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_user input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .save_user(
            &body.username,
            &body.email,
            body.first_name.as_deref().unwrap_or(""),
            body.last_name.as_deref().unwrap_or(""),
            body.bio.as_deref().unwrap_or(""),
            body.role.unwrap_or(UserRole::User),
            true,
        )
        .await
        .map_err(map_user_write_error)?;

    tracing::info!(username = %user.username, "create_user successful");
    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: FilterUserDto::filter_user(&user),
        }),
    ))
}

#[instrument(skip(app_state))]
pub async fn get_user_by_username(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(None, Some(&username), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&user),
    }))
}

/// Admin-side partial update; may reassign the role.
#[instrument(skip(app_state, body))]
pub async fn update_user(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, Some(&username), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let updated = app_state
        .db_client
        .update_user(
            user.id,
            body.username.as_deref().unwrap_or(&user.username),
            body.email.as_deref().unwrap_or(&user.email),
            body.first_name.as_deref().unwrap_or(&user.first_name),
            body.last_name.as_deref().unwrap_or(&user.last_name),
            body.bio.as_deref().unwrap_or(&user.bio),
            body.role.unwrap_or(user.role),
        )
        .await
        .map_err(map_user_write_error)?;

    tracing::info!(username = %updated.username, "update_user successful");
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&updated),
    }))
}

#[instrument(skip(app_state))]
pub async fn delete_user(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_user_by_username(&username)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("User not found"),
            e => {
                tracing::error!("DB error, deleting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(username = %username, "delete_user successful");
    Ok(StatusCode::NO_CONTENT)
}

/// Unique violations on the users table surface as validation errors.
fn map_user_write_error(e: sqlx::Error) -> HttpError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::error!("DB error, user unique violation: {}", db_err);
            HttpError::bad_request("A user with this email or username already exists")
        }
        e => {
            tracing::error!("DB error, writing user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        }
    }
}
