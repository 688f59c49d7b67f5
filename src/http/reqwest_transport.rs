//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{ApiRequest, ApiResponse, HttpTransport};
use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};

/// Sends [`ApiRequest`]s relative to a fixed base URL.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeouts.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::Request(format!("bad path {}: {e}", request.path)))?;

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(value) = request.authorization_header() {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(map_send_error)?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "HTTP response"
        );

        Ok(ApiResponse::new(status, body))
    }
}
