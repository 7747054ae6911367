//! HTTP client for the Orders service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::LOCATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::OrdersServiceConfig;

#[derive(Debug, Error)]
pub enum OrdersClientError {
    /// The Orders service refused the request (4xx); `message` is its response body
    #[error("request rejected with {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    /// Anything other than the documented success shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("could not resolve order locator '{0}'")]
    InvalidLocator(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A meal as reported by the Orders service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMeal {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RemoteOrder {
    meals: Vec<RemoteMeal>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    meals: &'a [String],
}

#[async_trait]
pub trait OrdersClient: Send + Sync {
    /// Create an order and return the locator from its `Location` header.
    async fn create_order(&self, meals: &[String]) -> Result<String, OrdersClientError>;

    /// Read back the meals of a previously created order.
    async fn get_order(&self, locator: &str) -> Result<Vec<RemoteMeal>, OrdersClientError>;
}

pub struct OrdersClientReqwest {
    client: Client,
    base_url: Url,
}

fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

impl OrdersClientReqwest {
    pub fn new(config: &OrdersServiceConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            base_url: ensure_slash(&config.url),
        })
    }

    /// Locators are paths such as `/api/orders/7`; they resolve below the base URL so a
    /// path prefix on it is kept.
    fn resolve(&self, locator: &str) -> Result<Url, OrdersClientError> {
        self.base_url
            .join(locator.trim_start_matches('/'))
            .map_err(|_| OrdersClientError::InvalidLocator(locator.to_string()))
    }
}

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    crate::install_crypto_provider();
    Ok(Client::builder().timeout(timeout).build()?)
}

#[async_trait]
impl OrdersClient for OrdersClientReqwest {
    #[instrument(skip(self, meals), fields(meals = meals.len()), err)]
    async fn create_order(&self, meals: &[String]) -> Result<String, OrdersClientError> {
        let url = self.resolve("api/orders")?;
        debug!("Creating remote order at {}", url);

        let response = self.client.post(url).json(&CreateOrderRequest { meals }).send().await?;
        let status = response.status();

        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrdersClientError::Rejected { status, message });
        }
        if status != StatusCode::CREATED {
            return Err(OrdersClientError::UnexpectedResponse(format!("status {status}")));
        }

        let locator = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| OrdersClientError::UnexpectedResponse("201 without a Location header".to_string()))?;

        Ok(locator.to_string())
    }

    #[instrument(skip(self), err)]
    async fn get_order(&self, locator: &str) -> Result<Vec<RemoteMeal>, OrdersClientError> {
        let url = self.resolve(locator)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrdersClientError::Rejected { status, message });
        }
        if status != StatusCode::OK {
            return Err(OrdersClientError::UnexpectedResponse(format!("status {status}")));
        }

        let body = response.text().await?;
        let order: RemoteOrder = serde_json::from_str(&body)
            .map_err(|e| OrdersClientError::UnexpectedResponse(format!("invalid order body: {e}")))?;

        Ok(order.meals)
    }
}
