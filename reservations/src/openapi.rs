//! OpenAPI document for the reservations API, served at `/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reservations::create_reservation,
        handlers::reservations::get_reservation,
        handlers::reservations::update_reservation,
        handlers::reservations::delete_reservation,
        handlers::orders::attach_order,
        handlers::orders::get_order,
    ),
    components(schemas(
        models::reservations::ReservationRequest,
        models::reservations::ReservationInput,
        models::reservations::ReservationResponse,
        models::reservations::ReservationDetails,
        models::reservations::TableResponse,
        models::orders::OrderAttach,
        models::orders::AttachedOrderResponse,
    )),
    tags(
        (name = "reservations", description = "Book, inspect, move and cancel table reservations"),
        (name = "orders", description = "Orders attached to a reservation, stored in the Orders service"),
    ),
    info(
        title = "Reservations API",
        description = "Table reservations without double-booking, with food orders attached.",
    )
)]
pub struct ApiDoc;
