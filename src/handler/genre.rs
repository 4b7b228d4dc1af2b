use crate::{
    AppState,
    db::GenreExt,
    dtos::{
        NameSlugDto, NameSlugListResponseDto, NameSlugOutDto, NameSlugResponseDto, PaginationDto,
        RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, require_admin},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for genre reference data. Same contract as categories.
pub fn genre_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_genres))
        .route(
            "/",
            post(create_genre)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{slug}",
            delete(delete_genre)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

#[instrument(skip(app_state))]
pub async fn get_genres(
    Query(params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_genres input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let search = params.search.as_deref();

    let genres = app_state
        .db_client
        .get_genres(page, limit, search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting genres: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.get_genre_count(search).await.map_err(|e| {
        tracing::error!("DB error, getting genre count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = NameSlugListResponseDto {
        status: "success".to_string(),
        data: genres.into_iter().map(NameSlugOutDto::from).collect(),
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_genres successful");
    Ok(Json(response))
}

#[instrument(skip(app_state, body), fields(slug = %body.slug))]
pub async fn create_genre(
    State(app_state): State<AppState>,
    Json(body): Json<NameSlugDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_genre input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let genre = app_state
        .db_client
        .save_genre(&body.name, &body.slug)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::bad_request("A genre with this slug already exists")
            }
            e => {
                tracing::error!("DB error, creating genre: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(slug = %genre.slug, "create_genre successful");
    Ok((
        StatusCode::CREATED,
        Json(NameSlugResponseDto {
            status: "success".to_string(),
            data: NameSlugOutDto::from(genre),
        }),
    ))
}

#[instrument(skip(app_state))]
pub async fn delete_genre(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_genre_by_slug(&slug)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Genre not found"),
            e => {
                tracing::error!("DB error, deleting genre: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(slug = %slug, "delete_genre successful");
    Ok(StatusCode::NO_CONTENT)
}
