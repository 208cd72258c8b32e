//! Resource routes built over the resolved model.
//! Paths are parameterized; handlers look the resource up by name and 404 when it is unknown or of the wrong kind.

use crate::error::AppError;
use crate::handlers::resource::{
    create, delete as delete_handler, list, merge, merge_singular, read, replace, replace_singular,
};
use crate::state::AppState;
use axum::{http::Uri, routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:name",
            get(list).post(create).put(replace_singular).patch(merge_singular),
        )
        .route(
            "/:name/:id",
            get(read).put(replace).patch(merge).delete(delete_handler),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
