//! Helpers shared by the HTTP-level tests.

use crate::config::{Config, PoolSettings, TableSeed};
use axum_test::TestServer;
use sqlx::PgPool;

/// Default config with a small pool and the given floor plan.
pub fn create_test_config(floor_plan: &[TableSeed]) -> Config {
    let mut config = Config::default();
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config.floor_plan = floor_plan.to_vec();
    config
}

pub async fn create_test_app(pool: PgPool, floor_plan: &[TableSeed]) -> TestServer {
    create_test_app_with_config(pool, create_test_config(floor_plan)).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}
