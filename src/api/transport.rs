//! HTTP transport seam.
//!
//! `SessionClient` talks to the network through the `Transport` trait so the
//! retry/refresh pipeline and the creation workflow can be exercised against
//! a scripted mock. `HttpTransport` is the production implementation over
//! reqwest.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;

use super::ApiError;

/// One outgoing request as seen by the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Raw response: status plus unparsed body text.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Abstract request issuer. Timeouts are the transport's responsibility;
/// transport-level failures surface as `ApiError::Network`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn issue(&self, request: TransportRequest) -> Result<TransportResponse, ApiError>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    async fn issue(&self, request: TransportRequest) -> Result<TransportResponse, ApiError> {
        self.as_ref().issue(request).await
    }
}

/// Production transport over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder().timeout(Duration::from_millis(config.timeout_ms));
        // Cross-origin cookies ride alongside the bearer header when the
        // deployment uses cookie-scoped refresh tokens.
        if config.credentials_mode {
            builder = builder.cookie_store(true);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn issue(&self, request: TransportRequest) -> Result<TransportResponse, ApiError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        if let Some(ref token) = request.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("timeout: {}", e))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        debug!(method = %request.method, url = %request.url, status, "Request completed");

        Ok(TransportResponse { status, body })
    }
}
