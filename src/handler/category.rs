use crate::{
    AppState,
    db::CategoryExt,
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

/// Router for category reference data: public listing, admin-only
/// mutation, slug-addressed.
pub fn category_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_categories))
        .route(
            "/",
            post(create_category)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{slug}",
            delete(delete_category)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Paginated categories, optional `?search=` over name and slug.
#[instrument(skip(app_state))]
pub async fn get_categories(
    Query(params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_categories input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let search = params.search.as_deref();

    let categories = app_state
        .db_client
        .get_categories(page, limit, search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting categories: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .get_category_count(search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = NameSlugListResponseDto {
        status: "success".to_string(),
        data: categories.into_iter().map(NameSlugOutDto::from).collect(),
        pagination: PaginationDto::new(page, limit, total),
    };
    tracing::info!("get_categories successful");
    Ok(Json(response))
}

#[instrument(skip(app_state, body), fields(slug = %body.slug))]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(body): Json<NameSlugDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let category = app_state
        .db_client
        .save_category(&body.name, &body.slug)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::bad_request("A category with this slug already exists")
            }
            e => {
                tracing::error!("DB error, creating category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(slug = %category.slug, "create_category successful");
    Ok((
        StatusCode::CREATED,
        Json(NameSlugResponseDto {
            status: "success".to_string(),
            data: NameSlugOutDto::from(category),
        }),
    ))
}

#[instrument(skip(app_state))]
pub async fn delete_category(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_category_by_slug(&slug)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Category not found"),
            e => {
                tracing::error!("DB error, deleting category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(slug = %slug, "delete_category successful");
    Ok(StatusCode::NO_CONTENT)
}
