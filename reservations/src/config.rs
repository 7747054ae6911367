//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` and can be changed with `-f` or `RESERVATIONS_CONFIG`.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `RESERVATIONS_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! Nested values use double underscores, so `RESERVATIONS_ORDERS__URL=http://orders:3001`
//! sets `orders.url`.
//!
//! ## Example
//!
//! ```yaml
//! port: 3000
//! database:
//!   url: postgres://localhost:5432/reservations
//! orders:
//!   url: http://localhost:3001
//!   request_timeout: 5s
//! scheduling:
//!   max_guests: 10
//!   max_duration: 6.0
//! floor_plan:
//!   - { number: 1, capacity: 2 }
//!   - { number: 2, capacity: 10 }
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RESERVATIONS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Built once in `main` and moved into [`crate::Application`]; scheduling and attachment code
/// receive the pieces they need from [`crate::AppState`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from `DATABASE_URL`; takes precedence over `database.url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Where the Orders service lives
    pub orders: OrdersServiceConfig,
    /// Booking limits enforced on create and update
    pub scheduling: SchedulingConfig,
    /// Tables seeded on startup when the `tables` relation is empty
    pub floor_plan: Vec<TableSeed>,
    /// CORS settings
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolSettings,
}

/// The SQLx pool parameters we expose.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
}

impl PoolSettings {
    pub fn pool_options(&self) -> sqlx::postgres::PgPoolOptions {
        let options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs));

        match self.idle_timeout_secs {
            0 => options.idle_timeout(None),
            secs => options.idle_timeout(Duration::from_secs(secs)),
        }
    }
}

/// Connection settings for the Orders service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrdersServiceConfig {
    /// Base URL; order locators returned by the service are resolved against it
    pub url: Url,
    /// Timeout for a single round trip, e.g. `5s` or `1500ms`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Bounds applied to every booking request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulingConfig {
    pub min_guests: i32,
    pub max_guests: i32,
    /// Shortest booking, in hours
    pub min_duration: Decimal,
    /// Longest booking, in hours
    pub max_duration: Decimal,
}

/// One table of the floor plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TableSeed {
    pub number: i32,
    pub capacity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// A single allowed CORS origin: `*` or a URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CorsOrigin {
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    match s.as_str() {
        "*" => Ok(()),
        _ => Err(serde::de::Error::custom("Expected '*'")),
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            database: DatabaseConfig::default(),
            orders: OrdersServiceConfig::default(),
            scheduling: SchedulingConfig::default(),
            floor_plan: default_floor_plan(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/reservations".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl Default for OrdersServiceConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:3001").expect("static URL is valid"),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            min_guests: 1,
            max_guests: 10,
            min_duration: Decimal::new(5, 1),
            max_duration: Decimal::new(60, 1),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

fn default_floor_plan() -> Vec<TableSeed> {
    [(1, 2), (2, 2), (3, 4), (4, 4), (5, 6), (6, 8), (7, 10)]
        .into_iter()
        .map(|(number, capacity)| TableSeed { number, capacity })
        .collect()
}

fn invalid(reason: impl std::fmt::Display) -> Error {
    Error::Internal {
        operation: format!("Config validation: {reason}"),
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.trim().is_empty() {
            return Err(invalid("host cannot be empty"));
        }
        if self.database.url.trim().is_empty() {
            return Err(invalid("database.url cannot be empty. Set DATABASE_URL or database.url."));
        }

        let pool = &self.database.pool;
        if pool.max_connections == 0 || pool.min_connections > pool.max_connections {
            return Err(invalid(format_args!(
                "invalid pool sizing (min_connections {}, max_connections {})",
                pool.min_connections, pool.max_connections
            )));
        }

        if !matches!(self.orders.url.scheme(), "http" | "https") {
            return Err(invalid(format_args!("orders.url must be http(s), got '{}'", self.orders.url)));
        }
        if self.orders.request_timeout.is_zero() {
            return Err(invalid("orders.request_timeout must be greater than zero"));
        }

        let rules = &self.scheduling;
        if rules.min_guests < 1 || rules.min_guests > rules.max_guests {
            return Err(invalid(format_args!(
                "scheduling guests bounds must satisfy 1 <= min_guests <= max_guests (got {}..{})",
                rules.min_guests, rules.max_guests
            )));
        }
        if rules.min_duration <= Decimal::ZERO || rules.min_duration > rules.max_duration {
            return Err(invalid(format_args!(
                "scheduling duration bounds must satisfy 0 < min_duration <= max_duration (got {}..{})",
                rules.min_duration, rules.max_duration
            )));
        }
        for bound in [rules.min_duration, rules.max_duration] {
            if bound.normalize().scale() > 1 {
                return Err(invalid(format_args!("scheduling duration {bound} is not a multiple of 0.1 hours")));
            }
        }

        let mut numbers = HashSet::new();
        for table in &self.floor_plan {
            if table.capacity < 1 {
                return Err(invalid(format_args!("table {} must seat at least one guest", table.number)));
            }
            if !numbers.insert(table.number) {
                return Err(invalid(format_args!("table {} is listed more than once", table.number)));
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("RESERVATIONS_").ignore(&["CONFIG"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_when_file_is_missing() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 3000);
            assert_eq!(config.scheduling.max_guests, 10);
            assert_eq!(config.scheduling.min_duration, Decimal::new(5, 1));
            assert_eq!(config.orders.request_timeout, Duration::from_secs(10));
            assert_eq!(config.floor_plan.len(), 7);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
orders:
  url: http://orders.internal:3001
  request_timeout: 1500ms
scheduling:
  max_duration: 4.5
floor_plan:
  - { number: 12, capacity: 4 }
"#,
            )?;
            jail.set_env("RESERVATIONS_PORT", "8080");
            jail.set_env("RESERVATIONS_SCHEDULING__MAX_GUESTS", "6");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 8080);
            assert_eq!(config.orders.url.as_str(), "http://orders.internal:3001/");
            assert_eq!(config.orders.request_timeout, Duration::from_millis(1500));
            assert_eq!(config.scheduling.max_guests, 6);
            assert_eq!(config.scheduling.max_duration, Decimal::new(45, 1));
            assert_eq!(config.floor_plan, vec![TableSeed { number: 12, capacity: 4 }]);
            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "database:\n  url: postgres://yaml/reservations\n")?;
            jail.set_env("DATABASE_URL", "postgres://env/reservations");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.database.url, "postgres://env/reservations");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_scheduling_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("reversed.yaml", "scheduling:\n  min_guests: 8\n  max_guests: 2\n")?;
            jail.create_file("fine_grained.yaml", "scheduling:\n  max_duration: 2.25\n")?;

            assert!(Config::load(&args("reversed.yaml")).is_err());
            let err = Config::load(&args("fine_grained.yaml")).unwrap_err();
            assert!(err.to_string().contains("multiple of 0.1"));
            Ok(())
        });
    }

    #[test]
    fn test_floor_plan_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("dup.yaml", "floor_plan:\n  - { number: 1, capacity: 2 }\n  - { number: 1, capacity: 4 }\n")?;
            jail.create_file("empty_seat.yaml", "floor_plan:\n  - { number: 3, capacity: 0 }\n")?;

            assert!(Config::load(&args("dup.yaml")).unwrap_err().to_string().contains("more than once"));
            assert!(Config::load(&args("empty_seat.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_orders_url_must_be_http() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "orders:\n  url: ftp://orders/\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }
}
