use crate::{
    AppState,
    api::models::{
        orders::{OrderCreate, OrderResponse},
        parse_id,
    },
    errors::{Error, Result},
    ledger,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
};

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "orders",
    summary = "Create order",
    request_body = OrderCreate,
    responses(
        (status = 201, description = "Order created; `Location` points at the new order"),
        (status = 400, description = "Invalid meal list or unknown meal"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OrderCreate>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1])> {
    let Json(create) = payload?;

    let order = ledger::create_order(&state.db, &create.meals).await?;

    Ok((StatusCode::CREATED, [(header::LOCATION, format!("/api/orders/{}", order.id))]))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "orders",
    summary = "Get order",
    responses(
        (status = 200, description = "Meals of the order", body = OrderResponse),
        (status = 400, description = "Malformed order id"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("order_id" = i32, Path, description = "Order ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_order(State(state): State<AppState>, Path(order_id): Path<String>) -> Result<Json<OrderResponse>> {
    let id = parse_id(&order_id)?;

    match ledger::get_order(&state.db, id).await? {
        Some(lines) => Ok(Json(OrderResponse::from(lines))),
        None => Err(Error::NotFound {
            resource: "Order".to_string(),
            id: id.to_string(),
        }),
    }
}
