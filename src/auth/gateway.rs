//! Token gateway: attaches the bearer token to every user request and
//! recovers once from an expired access token.
//!
//! Flow for a [`AuthScope::User`] request:
//! 1. attach the stored access token (if any),
//! 2. dispatch,
//! 3. on 401 with [`RetryState::Fresh`], refresh the access token and dispatch
//!    exactly once more as [`RetryState::Retried`],
//! 4. hand whatever came back to the caller unmodified.
//!
//! Refreshes are serialised. A request that lost the race finds a token that
//! differs from the one it was sent with and reuses it instead of refreshing
//! again.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::CredentialStore;
use crate::error::{ApiError, AuthError};
use crate::http::{ApiRequest, ApiResponse, AuthScope, HttpTransport, RetryState};

/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "api/auth/token/refresh/";

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshTokenResponse {
    access: Option<String>,
}

/// Sends API requests on behalf of the logged-in user.
pub struct TokenAuthGateway {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    refresh_lock: Mutex<()>,
}

impl TokenAuthGateway {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The credential store this gateway reads from.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Dispatch `request`, refreshing and retrying once on 401.
    ///
    /// Only transport, store and refresh failures are errors; every HTTP
    /// status (including a second 401) is returned as a response.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.scope == AuthScope::Public {
            return Ok(self.transport.execute(&request).await?);
        }

        let token = self.credentials.access_token().await?;
        request.set_bearer(token);

        let response = self.transport.execute(&request).await?;
        if !response.is_unauthorized() || request.retry == RetryState::Retried {
            return Ok(response);
        }

        debug!(
            request_id = %request.id,
            path = %request.path,
            "Got 401, refreshing access token"
        );

        let sent_with = request.bearer().map(|t| t.expose_secret().to_string());
        let fresh = self.refresh_after(sent_with.as_deref()).await?;

        let retried = request.into_retry(fresh);
        let response = self.transport.execute(&retried).await?;
        if response.is_unauthorized() {
            warn!(
                request_id = %retried.id,
                path = %retried.path,
                "Still unauthorized after token refresh"
            );
        }
        Ok(response)
    }

    /// Obtain a new access token from the refresh endpoint.
    ///
    /// On rejection (non-success status or a body without `access`) both
    /// tokens are purged and [`AuthError::SessionExpired`] is returned.
    pub async fn refresh(&self) -> Result<SecretString, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless someone else already replaced `stale` while we waited.
    async fn refresh_after(&self, stale: Option<&str>) -> Result<SecretString, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.credentials.access_token().await? {
            if stale != Some(current.expose_secret()) {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<SecretString, AuthError> {
        let refresh = self
            .credentials
            .refresh_token()
            .await?
            .ok_or(AuthError::NoSession)?;

        let request = ApiRequest::post(REFRESH_PATH)
            .public()
            .with_json(&RefreshTokenRequest {
                refresh: refresh.expose_secret(),
            })
            .map_err(|e| AuthError::SessionExpired {
                reason: format!("could not encode refresh request: {e}"),
            })?;

        let response = self.transport.execute(&request).await?;

        if !response.is_success() {
            return Err(self
                .expire(format!("refresh rejected with HTTP {}", response.status.as_u16()))
                .await);
        }

        let access = match response.json::<RefreshTokenResponse>() {
            Ok(RefreshTokenResponse {
                access: Some(access),
            }) if !access.is_empty() => access,
            Ok(_) => return Err(self.expire("refresh response has no access token").await),
            Err(e) => {
                return Err(self
                    .expire(format!("malformed refresh response: {e}"))
                    .await);
            }
        };

        let token = SecretString::from(access);
        self.credentials.save_access_token(&token).await?;
        info!("Access token refreshed");
        Ok(token)
    }

    /// Purge both tokens and build the session-expired error.
    async fn expire(&self, reason: impl Into<String>) -> AuthError {
        let reason = reason.into();
        warn!(reason = %reason, "Token refresh failed, clearing session");
        if let Err(e) = self.credentials.clear().await {
            return AuthError::Store(e);
        }
        AuthError::SessionExpired { reason }
    }
}
