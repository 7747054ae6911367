//! Helpers shared by the HTTP-level tests.

use crate::config::{Config, PoolSettings};
use axum_test::TestServer;
use sqlx::PgPool;

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config
}

/// Build the full application on top of a `#[sqlx::test]` pool; the default menu is seeded.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    crate::Application::new_with_pool(create_test_config(), Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}
