//! Data API REST client
//!
//! Thin HTTP client for the auto-generated REST API over the members
//! database. Every request carries the session's bearer token.

use reqwest::{header, Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;

use super::error::{DataApiError, DataApiResult};
use super::query::Table;
use crate::config::DataApiConfig;
use crate::identity::TokenSource;

/// Client for the data API
#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    base_url: String,
    token: Arc<dyn TokenSource>,
}

impl DataApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: &DataApiConfig, token: Arc<dyn TokenSource>) -> DataApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(DataApiError::Request)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request against `table`
    pub fn from(&self, table: &str) -> Table<'_> {
        Table::new(self, table)
    }

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Attach auth headers, send, and turn non-2xx answers into errors
    pub(crate) async fn send(&self, request: RequestBuilder, url: &str) -> DataApiResult<Response> {
        let token = self.token.bearer_token().await?;

        let response = request
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DataApiError::from_reqwest(e, url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = DataApiError::from_body(status.as_u16(), &body);
        tracing::warn!(url = %url, status = status.as_u16(), error = %err, "Data API request failed");
        Err(err)
    }
}
