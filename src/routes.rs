use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler, category::category_handler, comment::comment_handler,
        genre::genre_handler, review::review_handler, title::title_handler, users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    // comments nest under reviews, reviews under titles; path params
    // accumulate so comment handlers see (title_id, review_id, ...)
    let review_routes = review_handler(app_state.clone()).nest(
        "/{review_id}/comments",
        comment_handler(app_state.clone()),
    );
    let title_routes =
        title_handler(app_state.clone()).nest("/{title_id}/reviews", review_routes);

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest(
            "/users",
            // everything under /users requires a valid credential;
            // per-route admin gates live inside the handler module
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/categories", category_handler(app_state.clone()))
        .nest("/genres", genre_handler(app_state.clone()))
        .nest("/titles", title_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api/v1", api_route)
}
