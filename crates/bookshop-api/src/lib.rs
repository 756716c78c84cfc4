pub mod auth;
pub mod books;
pub mod error;
pub mod middleware;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::error;

use bookshop_store::Bookshop;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_session;

/// All `/api` routes plus `/health`. Book and order routes require a session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(
            "/api/auth",
            post(auth::post_auth)
                .get(auth::get_session)
                .delete(auth::logout),
        )
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/api/books",
            get(books::list_books)
                .post(books::create_book)
                .patch(books::update_book)
                .delete(books::delete_book),
        )
        .route("/api/books/{id}", get(books::get_book))
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/details", get(orders::list_order_details))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

/// Run a store operation off the async runtime. Store calls block on file
/// I/O and password hashing.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Bookshop) -> bookshop_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.shop))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
