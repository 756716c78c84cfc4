use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use bookshop_types::api::{DeleteBookRequest, SuccessResponse, UpdateBookRequest};
use bookshop_types::{Book, Identity, NewBook};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// Admins get their own books, customers the whole catalog.
pub async fn list_books(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = run_blocking(&state, move |shop| shop.guard().list_books(&caller)).await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let book = run_blocking(&state, move |shop| shop.guard().get_book(&caller, id)).await?;
    Ok(Json(book))
}

pub async fn create_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new_book) = body?;
    let book = run_blocking(&state, move |shop| shop.guard().create_book(&caller, new_book)).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    body: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Json(req) = body?;
    let book = run_blocking(&state, move |shop| {
        shop.guard().update_book(&caller, req.id, req.patch)
    })
    .await?;
    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    body: Result<Json<DeleteBookRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = body?;
    run_blocking(&state, move |shop| shop.guard().delete_book(&caller, req.id)).await?;
    Ok(Json(SuccessResponse { success: true }))
}
