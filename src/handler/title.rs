use std::collections::HashMap;

use crate::{
    AppState,
    db::{CategoryExt, GenreExt, TitleExt, TitleRow},
    dtos::{
        CreateTitleDto, NameSlugOutDto, PaginationDto, TitleDto, TitleListResponseDto,
        TitleResponseDto, TitlesQueryDto, UpdateTitleDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, require_admin},
    models::Genre,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for the titles catalog: public reads, admin-only writes.
pub fn title_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_titles))
        .route("/{title_id}", get(get_title))
        .route(
            "/",
            post(create_title)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{title_id}",
            axum::routing::patch(update_title)
                .delete(delete_title)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn title_dto(row: TitleRow, genres: Vec<NameSlugOutDto>) -> TitleDto {
    let category = match (row.category_name, row.category_slug) {
        (Some(name), Some(slug)) => Some(NameSlugOutDto { name, slug }),
        _ => None,
    };

    TitleDto {
        id: row.id,
        name: row.name,
        year: row.year,
        rating: row.rating,
        description: row.description,
        genre: genres,
        category,
    }
}

/// Resolve a category slug to its row; unknown slug is a client error.
async fn resolve_category(
    app_state: &AppState,
    slug: &str,
) -> Result<crate::models::Category, HttpError> {
    app_state
        .db_client
        .get_category_by_slug(slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resolving category slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request(format!("Unknown category slug: {slug}")))
}

/// Resolve genre slugs as a batch; any unknown slug is a client error.
async fn resolve_genres(app_state: &AppState, slugs: &[String]) -> Result<Vec<Genre>, HttpError> {
    let genres = app_state
        .db_client
        .get_genres_by_slugs(slugs)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resolving genre slugs: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let known: Vec<&str> = genres.iter().map(|g| g.slug.as_str()).collect();
    let missing: Vec<&str> = slugs
        .iter()
        .map(String::as_str)
        .filter(|s| !known.contains(s))
        .collect();
    if !missing.is_empty() {
        return Err(HttpError::bad_request(format!(
            "Unknown genre slug: {}",
            missing.join(", ")
        )));
    }

    Ok(genres)
}

/// Filtered, paginated catalog listing. Each title carries its expanded
/// category/genres and computed rating.
#[instrument(skip(app_state))]
pub async fn get_titles(
    Query(params): Query<TitlesQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_titles input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let rows = app_state
        .db_client
        .get_title_rows(page, limit, &params)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting titles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_title_count(&params)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // one genre query for the whole page
    let title_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let genre_rows = app_state
        .db_client
        .get_genres_for_titles(&title_ids)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title genres: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut genres_by_title: HashMap<i64, Vec<NameSlugOutDto>> = HashMap::new();
    for row in genre_rows {
        genres_by_title
            .entry(row.title_id)
            .or_default()
            .push(NameSlugOutDto {
                name: row.name,
                slug: row.slug,
            });
    }

    let data = rows
        .into_iter()
        .map(|row| {
            let genres = genres_by_title.remove(&row.id).unwrap_or_default();
            title_dto(row, genres)
        })
        .collect();

    let response = TitleListResponseDto {
        status: "success".to_string(),
        data,
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_titles successful");
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let row = app_state
        .db_client
        .get_title_row(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Title not found"))?;

    let genres = app_state
        .db_client
        .get_title_genres(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title genres: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = TitleResponseDto {
        status: "success".to_string(),
        data: title_dto(row, genres.into_iter().map(NameSlugOutDto::from).collect()),
    };
    Ok(Json(response))
}

/// Create a title. Genre and category arrive as slugs and must already
/// exist.
#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_title(
    State(app_state): State<AppState>,
    Json(body): Json<CreateTitleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_title input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let category_id = match body.category.as_deref() {
        Some(slug) => Some(resolve_category(&app_state, slug).await?.id),
        None => None,
    };

    let genre_ids: Vec<i64> = match body.genre.as_deref() {
        Some(slugs) => resolve_genres(&app_state, slugs)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect(),
        None => Vec::new(),
    };

    let title_id = app_state
        .db_client
        .save_title(
            &body.name,
            body.year,
            body.description.as_deref().unwrap_or(""),
            category_id,
            &genre_ids,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating title: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let row = app_state
        .db_client
        .get_title_row(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, re-reading title: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    let genres = app_state
        .db_client
        .get_title_genres(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title genres: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(title_id, "create_title successful");
    Ok((
        StatusCode::CREATED,
        Json(TitleResponseDto {
            status: "success".to_string(),
            data: title_dto(row, genres.into_iter().map(NameSlugOutDto::from).collect()),
        }),
    ))
}

/// Partial update. Absent fields keep their current values; a provided
/// genre list replaces the title's genre set.
#[instrument(skip(app_state, body))]
pub async fn update_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateTitleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_title input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let current = app_state
        .db_client
        .get_title(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Title not found"))?;

    let category_id = match body.category.as_deref() {
        Some(slug) => Some(resolve_category(&app_state, slug).await?.id),
        None => current.category_id,
    };

    let genre_ids: Option<Vec<i64>> = match body.genre.as_deref() {
        Some(slugs) => Some(
            resolve_genres(&app_state, slugs)
                .await?
                .into_iter()
                .map(|g| g.id)
                .collect(),
        ),
        None => None,
    };

    app_state
        .db_client
        .update_title(
            title_id,
            body.name.as_deref().unwrap_or(&current.name),
            body.year.unwrap_or(current.year),
            body.description.as_deref().unwrap_or(&current.description),
            category_id,
            genre_ids.as_deref(),
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Title not found"),
            e => {
                tracing::error!("DB error, updating title: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let row = app_state
        .db_client
        .get_title_row(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, re-reading title: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    let genres = app_state
        .db_client
        .get_title_genres(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title genres: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(title_id, "update_title successful");
    Ok(Json(TitleResponseDto {
        status: "success".to_string(),
        data: title_dto(row, genres.into_iter().map(NameSlugOutDto::from).collect()),
    }))
}

#[instrument(skip(app_state))]
pub async fn delete_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_title(title_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Title not found"),
            e => {
                tracing::error!("DB error, deleting title: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(title_id, "delete_title successful");
    Ok(StatusCode::NO_CONTENT)
}
