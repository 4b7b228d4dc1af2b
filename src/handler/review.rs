use crate::{
    AppState,
    db::{ReviewExt, TitleExt},
    dtos::{
        CreateReviewDto, PaginationDto, RequestQueryDto, ReviewListResponseDto, ReviewResponseDto,
        UpdateReviewDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
    models::Review,
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

/// Router for reviews nested under /titles/{title_id}/reviews.
///
/// Reads are public. Creating requires authentication; editing and
/// deleting require the author or a moderator.
pub fn review_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_reviews))
        .route("/{review_id}", get(get_review))
        .route(
            "/",
            axum::routing::post(create_review)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}",
            axum::routing::patch(update_review)
                .delete(delete_review)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// 404 unless the title exists; reviews hang off it.
async fn ensure_title_exists(app_state: &AppState, title_id: i64) -> Result<(), HttpError> {
    let exists = app_state.db_client.title_exists(title_id).await.map_err(|e| {
        tracing::error!("DB error, checking title: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if exists {
        Ok(())
    } else {
        Err(HttpError::not_found("Title not found"))
    }
}

/// Load a review scoped to its title, or 404.
async fn load_review(
    app_state: &AppState,
    title_id: i64,
    review_id: i64,
) -> Result<Review, HttpError> {
    app_state
        .db_client
        .get_review(title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Review not found"))
}

#[instrument(skip(app_state))]
pub async fn get_reviews(
    Path(title_id): Path<i64>,
    Query(params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_reviews input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    ensure_title_exists(&app_state, title_id).await?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let reviews = app_state
        .db_client
        .get_reviews(title_id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_review_count(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = ReviewListResponseDto {
        status: "success".to_string(),
        data: reviews,
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_reviews successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let review = app_state
        .db_client
        .get_review_dto(title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Review not found"))?;

    Ok(Json(ReviewResponseDto {
        status: "success".to_string(),
        data: review,
    }))
}

/// Create a review of a title. The author comes from the authenticated
/// identity; one review per user per title.
#[instrument(skip(app_state, auth, body), fields(username = %auth.user.username))]
pub async fn create_review(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    ensure_title_exists(&app_state, title_id).await?;

    let author_id = auth.user.id;

    let already_reviewed = app_state
        .db_client
        .user_has_review(title_id, author_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking existing review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if already_reviewed {
        return Err(HttpError::bad_request("You already reviewed this title"));
    }

    let review = app_state
        .db_client
        .create_review(title_id, author_id, &body.text, body.score)
        .await
        .map_err(|e| match e {
            // two concurrent first reviews race past the pre-check; the
            // unique index turns the loser into the same 400
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::bad_request("You already reviewed this title")
            }
            e => {
                tracing::error!("DB error, creating review: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(title_id, "create_review successful");
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponseDto {
            status: "success".to_string(),
            data: review,
        }),
    ))
}

/// Partial review update by its author or a moderator.
#[instrument(skip(app_state, auth, body), fields(username = %auth.user.username))]
pub async fn update_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let review = load_review(&app_state, title_id, review_id).await?;

    if !permissions::author_or_moderator(&auth.user, review.author_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let updated = app_state
        .db_client
        .update_review(
            review.id,
            body.text.as_deref().unwrap_or(&review.text),
            body.score.unwrap_or(review.score),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "update_review successful");
    Ok(Json(ReviewResponseDto {
        status: "success".to_string(),
        data: updated,
    }))
}

/// Delete a review (author or moderator). Its comments cascade away.
#[instrument(skip(app_state, auth), fields(username = %auth.user.username))]
pub async fn delete_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let review = load_review(&app_state, title_id, review_id).await?;

    if !permissions::author_or_moderator(&auth.user, review.author_id) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    app_state
        .db_client
        .delete_review(review.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(review_id, "delete_review successful");
    Ok(StatusCode::NO_CONTENT)
}
