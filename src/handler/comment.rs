use crate::{
    AppState,
    db::{CommentExt, ReviewExt},
    dtos::{
        CommentListResponseDto, CommentResponseDto, CreateCommentDto, PaginationDto,
        RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
    models::Comment,
    permissions,
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

/// Router for comments nested under
/// /titles/{title_id}/reviews/{review_id}/comments.
pub fn comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_comments))
        .route("/{comment_id}", get(get_comment))
        .route(
            "/",
            axum::routing::post(create_comment)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{comment_id}",
            axum::routing::patch(update_comment)
                .delete(delete_comment)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// 404 unless the review exists under this exact title.
async fn ensure_review_exists(
    app_state: &AppState,
    title_id: i64,
    review_id: i64,
) -> Result<(), HttpError> {
    app_state
        .db_client
        .get_review(title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .map(|_| ())
        .ok_or_else(|| HttpError::not_found("Review not found"))
}

/// Load a comment scoped to its review, or 404.
async fn load_comment(
    app_state: &AppState,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, HttpError> {
    app_state
        .db_client
        .get_comment(review_id, comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Comment not found"))
}

#[instrument(skip(app_state))]
pub async fn get_comments(
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_comments input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    ensure_review_exists(&app_state, title_id, review_id).await?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let comments = app_state
        .db_client
        .get_comments(review_id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_comment_count(review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = CommentListResponseDto {
        status: "success".to_string(),
        data: comments,
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_comments successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    ensure_review_exists(&app_state, title_id, review_id).await?;

    let comment = app_state
        .db_client
        .get_comment_dto(review_id, comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Comment not found"))?;

    Ok(Json(CommentResponseDto {
        status: "success".to_string(),
        data: comment,
    }))
}

/// Comment on a review. The author comes from the authenticated
/// identity, the review from the path.
#[instrument(skip(app_state, auth, body), fields(username = %auth.user.username))]
pub async fn create_comment(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    ensure_review_exists(&app_state, title_id, review_id).await?;

    let comment = app_state
        .db_client
        .create_comment(review_id, auth.user.id, &body.text)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "create_comment successful");
    Ok((
        StatusCode::CREATED,
        Json(CommentResponseDto {
            status: "success".to_string(),
            data: comment,
        }),
    ))
}

/// Edit a comment (author or moderator).
#[instrument(skip(app_state, auth, body), fields(username = %auth.user.username))]
pub async fn update_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    ensure_review_exists(&app_state, title_id, review_id).await?;

    let comment = load_comment(&app_state, review_id, comment_id).await?;

    if !permissions::author_or_moderator(&auth.user, comment.author_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let updated = app_state
        .db_client
        .update_comment(comment.id, &body.text)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id, "update_comment successful");
    Ok(Json(CommentResponseDto {
        status: "success".to_string(),
        data: updated,
    }))
}

/// Delete a comment (author or moderator).
#[instrument(skip(app_state, auth), fields(username = %auth.user.username))]
pub async fn delete_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    ensure_review_exists(&app_state, title_id, review_id).await?;

    let comment = load_comment(&app_state, review_id, comment_id).await?;

    if !permissions::author_or_moderator(&auth.user, comment.author_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    app_state
        .db_client
        .delete_comment(comment.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id, "delete_comment successful");
    Ok(StatusCode::NO_CONTENT)
}
