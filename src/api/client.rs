//! Typed client for the LevelUp REST API.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::model::{
    AvatarResponse, Category, CategoryRequest, GenericResponse, LoginRequest, LoginResponse,
    PasswordResetRequest, RegisterRequest, ResetPasswordRequest, Stat, StatRequest, Task,
    TaskRequest, UserResponse,
};
use crate::auth::TokenAuthGateway;
use crate::error::ApiError;
use crate::http::{ApiRequest, ApiResponse, AuthScope};

const TASKS: &str = "api/tasks/tasks/";
const CATEGORIES: &str = "api/tasks/categories/";
const STATS: &str = "api/stats/stats/";

/// One method per remote endpoint. All calls go through the token gateway.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<TokenAuthGateway>,
}

impl ApiClient {
    pub fn new(gateway: Arc<TokenAuthGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<TokenAuthGateway> {
        &self.gateway
    }

    // ── Auth ────────────────────────────────────────────────────────

    pub async fn register(&self, body: &RegisterRequest) -> Result<GenericResponse, ApiError> {
        let req = ApiRequest::post("api/auth/register/").public().with_json(body)?;
        self.call("register", req).await
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let req = ApiRequest::post("api/auth/login/").public().with_json(body)?;
        self.call("login", req).await
    }

    /// Ask the server to send the confirmation email again.
    pub async fn resend_confirmation(&self, email: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: String::new(),
        };
        let req = ApiRequest::post("api/auth/resend-confirmation/")
            .public()
            .with_json(&body)?;
        self.call("resend_confirmation", req).await
    }

    pub async fn request_password_reset(
        &self,
        body: &PasswordResetRequest,
    ) -> Result<GenericResponse, ApiError> {
        let req = ApiRequest::post("api/auth/request-password-reset/")
            .public()
            .with_json(body)?;
        self.call("request_password_reset", req).await
    }

    pub async fn confirm_password_reset(
        &self,
        body: &ResetPasswordRequest,
    ) -> Result<GenericResponse, ApiError> {
        let req = ApiRequest::post("api/auth/confirm-password-reset/")
            .public()
            .with_json(body)?;
        self.call("confirm_password_reset", req).await
    }

    pub async fn confirm_email(&self, token: &str) -> Result<GenericResponse, ApiError> {
        let req = ApiRequest::get(format!("api/auth/confirm-email/{token}/")).public();
        self.call("confirm_email", req).await
    }

    pub async fn get_user(&self) -> Result<UserResponse, ApiError> {
        self.call("get_user", ApiRequest::get("api/auth/user/")).await
    }

    // ── Tasks ───────────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.call("list_tasks", ApiRequest::get(TASKS)).await
    }

    pub async fn create_task(&self, body: &TaskRequest) -> Result<Task, ApiError> {
        let req = ApiRequest::post(TASKS).with_json(body)?;
        self.call("create_task", req).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.call("get_task", ApiRequest::get(format!("{TASKS}{id}/")))
            .await
    }

    pub async fn update_task(&self, id: i64, body: &TaskRequest) -> Result<Task, ApiError> {
        let req = ApiRequest::patch(format!("{TASKS}{id}/")).with_json(body)?;
        self.call("update_task", req).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.call_unit("delete_task", ApiRequest::delete(format!("{TASKS}{id}/")))
            .await
    }

    // ── Categories ──────────────────────────────────────────────────

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.call("list_categories", ApiRequest::get(CATEGORIES))
            .await
    }

    pub async fn create_category(&self, body: &CategoryRequest) -> Result<Category, ApiError> {
        let req = ApiRequest::post(CATEGORIES).with_json(body)?;
        self.call("create_category", req).await
    }

    pub async fn update_category(
        &self,
        id: i64,
        body: &CategoryRequest,
    ) -> Result<Category, ApiError> {
        let req = ApiRequest::put(format!("{CATEGORIES}{id}/")).with_json(body)?;
        self.call("update_category", req).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.call_unit(
            "delete_category",
            ApiRequest::delete(format!("{CATEGORIES}{id}/")),
        )
        .await
    }

    // ── Stats ───────────────────────────────────────────────────────

    pub async fn list_stats(&self) -> Result<Vec<Stat>, ApiError> {
        self.call("list_stats", ApiRequest::get(STATS)).await
    }

    pub async fn create_stat(&self, body: &StatRequest) -> Result<Stat, ApiError> {
        let req = ApiRequest::post(STATS).with_json(body)?;
        self.call("create_stat", req).await
    }

    pub async fn get_stat(&self, id: i64) -> Result<Stat, ApiError> {
        self.call("get_stat", ApiRequest::get(format!("{STATS}{id}/")))
            .await
    }

    pub async fn update_stat(&self, id: i64, body: &StatRequest) -> Result<Stat, ApiError> {
        let req = ApiRequest::put(format!("{STATS}{id}/")).with_json(body)?;
        self.call("update_stat", req).await
    }

    pub async fn delete_stat(&self, id: i64) -> Result<(), ApiError> {
        self.call_unit("delete_stat", ApiRequest::delete(format!("{STATS}{id}/")))
            .await
    }

    pub async fn get_avatar(&self) -> Result<Vec<AvatarResponse>, ApiError> {
        self.call("get_avatar", ApiRequest::get("api/stats/avatar/"))
            .await
    }

    // ── Plumbing ────────────────────────────────────────────────────

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.dispatch(endpoint, request).await?;
        response.json().map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// For endpoints whose success body is irrelevant (deletes may be 204).
    async fn call_unit(&self, endpoint: &str, request: ApiRequest) -> Result<(), ApiError> {
        self.dispatch(endpoint, request).await.map(|_| ())
    }

    async fn dispatch(&self, endpoint: &str, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        debug!(endpoint, method = %request.method, path = %request.path, "API call");
        let scope = request.scope;
        let response = self.gateway.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }
        Err(status_error(endpoint, scope, &response))
    }
}

/// Map a non-success response to an [`ApiError`].
///
/// A 401 on a user request has already been through the refresh-and-retry,
/// so it means the session is gone. On public endpoints it is just a rejection.
fn status_error(endpoint: &str, scope: AuthScope, response: &ApiResponse) -> ApiError {
    if response.is_unauthorized() && scope == AuthScope::User {
        warn!(endpoint, "Unauthorized after token refresh");
        return ApiError::Unauthorized {
            endpoint: endpoint.to_string(),
        };
    }
    let status = response.status.as_u16();
    let message = GenericResponse::from_body(&response.body)
        .error_message()
        .unwrap_or_default();
    warn!(endpoint, status, message = %message, "API call failed");
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
        message,
    }
}
