use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use bookshop_types::api::CreateOrderRequest;
use bookshop_types::{Identity, Order, OrderDetail};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    if let Some(method) = req.payment_method {
        debug!("{} pays by {:?}", caller.email, method);
    }

    let order = run_blocking(&state, move |shop| {
        shop.guard().create_order(&caller, req.items)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = run_blocking(&state, move |shop| shop.guard().list_orders(&caller)).await?;
    Ok(Json(orders))
}

/// Order history with each line resolved against the current catalog.
pub async fn list_order_details(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> Result<Json<Vec<OrderDetail>>, ApiError> {
    let details =
        run_blocking(&state, move |shop| shop.guard().list_order_details(&caller)).await?;
    Ok(Json(details))
}
