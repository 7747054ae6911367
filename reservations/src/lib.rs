//! # reservations: the Reservations service
//!
//! Books restaurant tables and attaches food orders to bookings.
//!
//! A booking asks for a party size, a start time and a duration. The service looks for the
//! lowest-numbered table (by id) that seats the party and has no booking intersecting the
//! requested window, and records the reservation against it. Lookup and write share one
//! SERIALIZABLE transaction, and an exclusion constraint on `reservations` keeps two bookings for
//! the same table from overlapping even under concurrent requests.
//!
//! Orders live in a separate Orders service. [`attachment`] creates an order there over HTTP and
//! keeps the returned locator next to the reservation.
//!
//! ## Modules
//!
//! - [`scheduling`]: validation, booking windows and the reservation lifecycle
//! - [`attachment`]: the Orders service client and the attach/fetch coordinator
//! - [`db`]: repositories over PostgreSQL
//! - [`api`]: axum handlers and request/response models
pub mod api;
pub mod attachment;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod scheduling;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use crate::{
    attachment::client::{OrdersClient, OrdersClientReqwest},
    config::CorsOrigin,
    db::handlers::Tables,
    openapi::ApiDoc,
};
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub orders: Arc<dyn OrdersClient>,
}

/// Get the reservations database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Install the process-wide rustls provider used by the Orders client. Safe to call repeatedly.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Seed the configured floor plan, unless tables already exist.
#[instrument(skip_all)]
pub async fn seed_floor_plan(config: &Config, db: &PgPool) -> anyhow::Result<u64> {
    let mut conn = db.acquire().await?;
    let inserted = Tables::new(&mut conn).seed(&config.floor_plan).await?;
    if inserted > 0 {
        info!("Seeded {} tables from the floor plan", inserted);
    }
    Ok(inserted)
}

async fn setup_database(config: &Config, pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    let pool = match pool {
        Some(pool) => pool,
        None => {
            info!("Connecting to database");
            config.database.pool.pool_options().connect(&config.database.url).await?
        }
    };

    migrator().run(&pool).await?;
    seed_floor_plan(config, &pool).await?;

    Ok(pool)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE])
        .expose_headers([http::header::LOCATION]);

    if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        cors = cors.allow_origin(tower_http::cors::Any);
    } else {
        let origins = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin {
                CorsOrigin::Url(url) => Some(url.origin().ascii_serialization().parse::<HeaderValue>()),
                CorsOrigin::Wildcard => None,
            })
            .collect::<Result<Vec<_>, _>>()?;
        cors = cors.allow_origin(origins);
    }

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{orders, reservations};

    let api_routes = Router::new()
        .route("/api/reservations", post(reservations::create_reservation))
        .route(
            "/api/reservations/{reservation_id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route(
            "/api/reservations/{reservation_id}/orders",
            post(orders::attach_order).get(orders::get_order),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .merge(api_routes)
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Connect (or reuse `pool`), migrate, seed the floor plan and build the router.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting reservations service with configuration: {:#?}", config);

        let pool = setup_database(&config, pool).await?;
        let orders: Arc<dyn OrdersClient> = Arc::new(OrdersClientReqwest::new(&config.orders)?);

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .orders(orders)
            .build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Reservations service listening on http://{}", bind_addr);
        info!("Orders service expected at {}", self.config.orders.url);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        telemetry::shutdown_telemetry();
        Ok(())
    }
}
