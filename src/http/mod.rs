//! HTTP plumbing: request/response wrappers and the transport seam.
//!
//! Everything that goes over the wire is an [`ApiRequest`] dispatched by an
//! [`HttpTransport`]. The production transport is [`ReqwestTransport`]; the
//! token gateway sits on top and decides which credential each request carries.

mod reqwest_transport;
#[cfg(test)]
pub(crate) mod scripted;

pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::TransportError;

/// Whether a request has already been through the 401 refresh-and-retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryState {
    /// First dispatch; a 401 may trigger one refresh.
    #[default]
    Fresh,
    /// Already retried once; a 401 goes back to the caller.
    Retried,
}

/// Which credential policy applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScope {
    /// Carries the user's bearer token and may be refreshed-and-retried.
    #[default]
    User,
    /// Login, registration and other pre-session endpoints: sent as is.
    Public,
}

/// An outbound API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Correlation ID for logs.
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the API base URL, e.g. `api/tasks/tasks/`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    pub scope: AuthScope,
    pub retry: RetryState,
    bearer: Option<SecretString>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            scope: AuthScope::User,
            retry: RetryState::Fresh,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Builder: attach a JSON body.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Builder: mark as a pre-session endpoint.
    pub fn public(mut self) -> Self {
        self.scope = AuthScope::Public;
        self
    }

    /// Set (or clear) the bearer token this request will carry.
    pub fn set_bearer(&mut self, token: Option<SecretString>) {
        self.bearer = token;
    }

    /// The bearer token this request carries, if any.
    pub fn bearer(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    /// The one-shot retry of this request, carrying a fresh token.
    pub fn into_retry(mut self, token: SecretString) -> Self {
        self.bearer = Some(token);
        self.retry = RetryState::Retried;
        self
    }
}

/// A response as received, status and raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Dispatches a single request. Implementations never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
