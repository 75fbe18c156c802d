//! Stock service over HTTP.
//!
//! Talks to a REST backend exposing `GET /stock/{id}` and `GET /products/{id}`.

use super::StockService;
use crate::error::{CartError, Result};
use crate::types::{Product, ProductId, StockRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP stock service configuration.
#[derive(Clone, Debug)]
pub struct HttpStockConfig {
    /// Base URL of the backend, without trailing slash.
    pub base_url: String,

    /// Per-request timeout.
    /// Default: 10 seconds
    pub timeout: Duration,
}

impl Default for HttpStockConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3333".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Stock service backed by a REST API.
#[derive(Clone, Debug)]
pub struct HttpStockService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStockService {
    /// Create a new client.
    pub fn new(config: HttpStockConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CartError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn stock_url(&self, product_id: ProductId) -> String {
        format!("{}/stock/{}", self.base_url, product_id)
    }

    fn product_url(&self, product_id: ProductId) -> String {
        format!("{}/products/{}", self.base_url, product_id)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CartError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CartError::Transport(format!("GET {} returned {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CartError::Transport(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| CartError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl StockService for HttpStockService {
    #[instrument(skip(self), fields(product_id = product_id.0))]
    async fn get_stock(&self, product_id: ProductId) -> Result<StockRecord> {
        let stock: StockRecord = self.fetch(&self.stock_url(product_id)).await?;
        if let Some(id) = stock.id {
            if id != product_id {
                return Err(CartError::MalformedResponse(format!(
                    "Asked for stock of {} but got {}",
                    product_id, id
                )));
            }
        }
        debug!(amount = stock.amount, "Fetched stock");
        Ok(stock)
    }

    #[instrument(skip(self), fields(product_id = product_id.0))]
    async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        let product: Product = self.fetch(&self.product_url(product_id)).await?;
        debug!("Fetched product metadata");
        Ok(product)
    }
}
