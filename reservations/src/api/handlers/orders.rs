use crate::{
    AppState,
    api::models::{
        orders::{AttachedOrderResponse, OrderAttach},
        parse_id,
    },
    attachment,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
};

#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/orders",
    tag = "orders",
    summary = "Attach order",
    description = "Creates the order in the Orders service and links it to the reservation. \
                   A reservation carries at most one order.",
    request_body = OrderAttach,
    responses(
        (status = 201, description = "Order created and attached"),
        (status = 400, description = "Invalid meal list, or the Orders service rejected it"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already has an order"),
        (status = 502, description = "Orders service unavailable"),
        (status = 500, description = "Internal server error")
    ),
    params(("reservation_id" = i32, Path, description = "Reservation ID"))
)]
#[tracing::instrument(skip_all)]
pub async fn attach_order(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    payload: std::result::Result<Json<OrderAttach>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1])> {
    let id = parse_id(&reservation_id)?;
    let Json(request) = payload?;

    attachment::attach_order(&state.db, state.orders.as_ref(), id, &request.meals).await?;

    Ok((StatusCode::CREATED, [(header::LOCATION, format!("api/reservations/{id}/orders"))]))
}

#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}/orders",
    tag = "orders",
    summary = "Get attached order",
    responses(
        (status = 200, description = "Meal names of the attached order", body = AttachedOrderResponse),
        (status = 400, description = "Malformed reservation id"),
        (status = 404, description = "No order attached, or it could not be read"),
        (status = 500, description = "Internal server error")
    ),
    params(("reservation_id" = i32, Path, description = "Reservation ID"))
)]
#[tracing::instrument(skip_all)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<AttachedOrderResponse>> {
    let id = parse_id(&reservation_id)?;

    let meals = attachment::fetch_order(&state.db, state.orders.as_ref(), id).await?;

    Ok(Json(AttachedOrderResponse { meals }))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::orders::AttachedOrderResponse, config::TableSeed, test_utils::*};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{DurationRound, TimeDelta, Utc};
    use serde_json::json;
    use sqlx::PgPool;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    async fn app_against(pool: PgPool, orders: &MockServer) -> TestServer {
        let mut config = create_test_config(&[TableSeed { number: 1, capacity: 6 }]);
        config.orders.url = Url::parse(&orders.uri()).unwrap();
        create_test_app_with_config(pool, config).await
    }

    async fn book(app: &TestServer) -> String {
        let start = (Utc::now() + TimeDelta::days(3)).duration_trunc(TimeDelta::hours(1)).unwrap();
        let response = app
            .post("/api/reservations")
            .json(&json!({ "reservation": { "guests": 2, "time": start.to_rfc3339(), "duration": 1.5 } }))
            .await;
        response.assert_status(StatusCode::CREATED);
        format!("/{}", response.header("location").to_str().unwrap())
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_attach_then_fetch(pool: PgPool) {
        let orders = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .and(body_json(json!({ "meals": ["steak", "soup", "latte"] })))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "/api/orders/5"))
            .expect(1)
            .mount(&orders)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/orders/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meals": [{ "id": 1, "name": "soup" }, { "id": 2, "name": "steak" }, { "id": 10, "name": "latte" }]
            })))
            .mount(&orders)
            .await;
        let app = app_against(pool, &orders).await;
        let reservation = book(&app).await;

        let response = app
            .post(&format!("{reservation}/orders"))
            .json(&json!({ "meals": ["steak", "soup", "latte"] }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let response = app.get(&format!("{reservation}/orders")).await;
        response.assert_status_ok();
        let mut meals = response.json::<AttachedOrderResponse>().meals;
        meals.sort();
        assert_eq!(meals, vec!["latte", "soup", "steak"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_attach_error_statuses(pool: PgPool) {
        let orders = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "meals": ["caviar"] })))
            .respond_with(ResponseTemplate::new(400).set_body_string("Unknown meals: caviar"))
            .mount(&orders)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "meals": ["soup"] })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&orders)
            .await;
        let app = app_against(pool, &orders).await;
        let reservation = book(&app).await;
        let attach = format!("{reservation}/orders");

        app.post(&attach).json(&json!({ "meals": [] })).await.assert_status(StatusCode::BAD_REQUEST);
        app.post(&attach).json(&json!({ "meals": ["soup", "soup"] })).await.assert_status(StatusCode::BAD_REQUEST);
        app.post(&attach).json(&json!({ "dishes": ["soup"] })).await.assert_status(StatusCode::BAD_REQUEST);
        app.post(&attach).json(&json!({ "meals": ["caviar"] })).await.assert_status(StatusCode::BAD_REQUEST);
        app.post(&attach).json(&json!({ "meals": ["soup"] })).await.assert_status(StatusCode::BAD_GATEWAY);
        app.post("/api/reservations/4040/orders")
            .json(&json!({ "meals": ["soup"] }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        app.get(&attach).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_attach_conflicts(pool: PgPool) {
        let orders = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "/api/orders/9"))
            .expect(1)
            .mount(&orders)
            .await;
        let app = app_against(pool, &orders).await;
        let attach = format!("{}/orders", book(&app).await);

        app.post(&attach).json(&json!({ "meals": ["soup"] })).await.assert_status(StatusCode::CREATED);
        app.post(&attach).json(&json!({ "meals": ["steak"] })).await.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unreadable_remote_order_is_not_found(pool: PgPool) {
        let orders = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "/api/orders/3"))
            .mount(&orders)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&orders)
            .await;
        let app = app_against(pool, &orders).await;
        let attach = format!("{}/orders", book(&app).await);

        app.post(&attach).json(&json!({ "meals": ["soup"] })).await.assert_status(StatusCode::CREATED);
        app.get(&attach).await.assert_status(StatusCode::NOT_FOUND);
    }
}
