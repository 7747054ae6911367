//! OpenAPI document for the orders API, served at `/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::orders::create_order,
        api::handlers::orders::get_order,
    ),
    components(schemas(
        api::models::orders::OrderCreate,
        api::models::orders::OrderResponse,
        api::models::orders::MealResponse,
    )),
    tags(
        (name = "orders", description = "Place orders against the item catalog and read them back"),
    ),
    info(
        title = "Orders API",
        description = "Records orders made of distinct catalog items.",
    )
)]
pub struct ApiDoc;
