use crate::{
    AppState,
    api::models::{
        parse_id,
        reservations::{ReservationRequest, ReservationResponse},
    },
    errors::Result,
    scheduling::{self, Booking, lifecycle},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
};
use chrono::Utc;

type LocationHeader = [(header::HeaderName, String); 1];

fn location(id: i32) -> LocationHeader {
    [(header::LOCATION, format!("api/reservations/{id}"))]
}

fn booking_from(state: &AppState, request: ReservationRequest) -> Result<Booking> {
    let input = request.reservation;
    scheduling::validate_booking(&state.config.scheduling, input.guests, &input.time, input.duration, Utc::now())
}

#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "reservations",
    summary = "Create reservation",
    description = "Books the first free table (lowest id) that seats the party for the whole window.",
    request_body = ReservationRequest,
    responses(
        (status = 201, description = "Reservation created; `Location` points at it"),
        (status = 400, description = "Invalid body"),
        (status = 409, description = "No free table for the requested window"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, LocationHeader)> {
    let Json(request) = payload?;
    let booking = booking_from(&state, request)?;

    let reservation = lifecycle::create_reservation(&state.db, &booking).await?;

    Ok((StatusCode::CREATED, location(reservation.id)))
}

#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}",
    tag = "reservations",
    summary = "Get reservation",
    responses(
        (status = 200, description = "Reservation with its table", body = ReservationResponse),
        (status = 400, description = "Malformed reservation id"),
        (status = 404, description = "Reservation not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("reservation_id" = i32, Path, description = "Reservation ID"))
)]
#[tracing::instrument(skip_all)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<ReservationResponse>> {
    let id = parse_id(&reservation_id)?;

    let reservation = lifecycle::get_reservation(&state.db, id).await?;

    Ok(Json(reservation.into()))
}

#[utoipa::path(
    put,
    path = "/api/reservations/{reservation_id}",
    tag = "reservations",
    summary = "Update reservation",
    description = "Re-runs table allocation for the new party size and window. The reservation's own \
                   booking never blocks it, but it may be moved to a different table.",
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Reservation updated; `Location` points at it"),
        (status = 400, description = "Malformed id or invalid body"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "No free table for the requested window"),
        (status = 500, description = "Internal server error")
    ),
    params(("reservation_id" = i32, Path, description = "Reservation ID"))
)]
#[tracing::instrument(skip_all)]
pub async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    payload: std::result::Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, LocationHeader)> {
    let id = parse_id(&reservation_id)?;
    let Json(request) = payload?;
    let booking = booking_from(&state, request)?;

    lifecycle::update_reservation(&state.db, id, &booking).await?;

    Ok((StatusCode::OK, location(id)))
}

#[utoipa::path(
    delete,
    path = "/api/reservations/{reservation_id}",
    tag = "reservations",
    summary = "Delete reservation",
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 400, description = "Malformed reservation id"),
        (status = 404, description = "Reservation not found"),
        (status = 500, description = "Internal server error")
    ),
    params(("reservation_id" = i32, Path, description = "Reservation ID"))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_reservation(State(state): State<AppState>, Path(reservation_id): Path<String>) -> Result<StatusCode> {
    let id = parse_id(&reservation_id)?;

    lifecycle::delete_reservation(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
