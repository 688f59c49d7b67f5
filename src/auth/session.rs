//! Session flows: login, registration, email confirmation, password reset,
//! logout.
//!
//! Input is validated before any network call. Successful flows return the
//! server's message (or a default) for the success slot.

use std::sync::Arc;

use tracing::info;

use super::credentials::{CredentialPair, CredentialStore};
use crate::api::ApiClient;
use crate::api::model::{
    GenericResponse, LoginRequest, PasswordResetRequest, RegisterRequest, ResetPasswordRequest,
};
use crate::error::{ApiError, Error, Result, ValidationError};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Server phrases meaning "account exists but email is not confirmed".
const UNCONFIRMED_MARKERS: &[&str] = &[
    "Email не подтвержден",
    "Аккаунт не активирован",
    "Email not confirmed",
    "Account is not activated",
];

/// Registration form as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Whether a login failure should offer "resend confirmation email".
pub fn needs_confirmation(err: &Error) -> bool {
    match err {
        Error::Api(ApiError::Status { message, .. }) => {
            UNCONFIRMED_MARKERS.iter().any(|m| message.contains(m))
        }
        _ => false,
    }
}

fn require(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(())
}

fn check_new_password(password: &str, confirm: &str) -> std::result::Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn success_text(resp: &GenericResponse, default: &str) -> String {
    resp.message.clone().unwrap_or_else(|| default.to_string())
}

/// Account and session operations.
pub struct SessionService {
    api: ApiClient,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionService {
    pub fn new(api: ApiClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { api, credentials }
    }

    /// Log in and persist the issued token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        require("email", email)?;
        require("password", password)?;

        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        };
        let resp = self.api.login(&body).await?;

        let (Some(access), Some(refresh)) = (resp.access, resp.refresh) else {
            return Err(ApiError::InvalidResponse {
                endpoint: "login".to_string(),
                reason: "no tokens in response".to_string(),
            }
            .into());
        };

        self.credentials
            .save_tokens(&CredentialPair::new(access, refresh))
            .await?;
        info!(email = %body.email, "Logged in");
        Ok(())
    }

    /// Create an account. The user must confirm their email before logging in.
    pub async fn register(&self, form: &RegisterForm) -> Result<String> {
        check_new_password(&form.password, &form.confirm_password)?;

        let body = RegisterRequest {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.trim().to_string(),
        };
        let resp = self.api.register(&body).await?;
        info!(username = %body.username, "Registered");
        Ok(success_text(
            &resp,
            "Registration successful. Please confirm your email.",
        ))
    }

    pub async fn resend_confirmation(&self, email: &str) -> Result<String> {
        require("email", email)?;
        let resp = self.api.resend_confirmation(email.trim()).await?;
        Ok(resp
            .message
            .unwrap_or_else(|| "Confirmation email sent".to_string()))
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<String> {
        require("email", email)?;
        let body = PasswordResetRequest {
            email: email.trim().to_string(),
        };
        let resp = self.api.request_password_reset(&body).await?;
        Ok(success_text(
            &resp,
            "Password reset email sent. Check your inbox.",
        ))
    }

    /// Set a new password using the token from the reset link.
    /// Any stored session is dropped on success.
    pub async fn confirm_password_reset(
        &self,
        token: Option<&str>,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<String> {
        check_new_password(new_password, confirm_password)?;
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::MissingToken {
                link: "password reset",
            })?;

        let body = ResetPasswordRequest {
            new_password: new_password.trim().to_string(),
            token: token.to_string(),
        };
        let resp = self.api.confirm_password_reset(&body).await?;
        self.credentials.clear().await?;
        info!("Password reset, session cleared");
        Ok(success_text(
            &resp,
            "Password has been reset. You can now log in.",
        ))
    }

    /// Confirm the account email using the token from the confirmation link.
    /// Any stored session is dropped on success.
    pub async fn confirm_email(&self, token: Option<&str>) -> Result<String> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::MissingToken {
                link: "email confirmation",
            })?;

        let resp = self.api.confirm_email(token).await?;
        self.credentials.clear().await?;
        info!("Email confirmed, session cleared");
        Ok(success_text(
            &resp,
            "Email confirmed. You can now log in.",
        ))
    }

    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Both tokens are present.
    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.credentials.has_session().await?)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::auth::TokenAuthGateway;
    use crate::auth::credentials::MemoryCredentialStore;
    use crate::http::scripted::ScriptedTransport;

    fn service(
        transport: &Arc<ScriptedTransport>,
        store: &Arc<MemoryCredentialStore>,
    ) -> SessionService {
        let gateway = Arc::new(TokenAuthGateway::new(transport.clone(), store.clone()));
        SessionService::new(ApiClient::new(gateway), store.clone())
    }

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: "hero".into(),
            email: "hero@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[tokio::test]
    async fn login_saves_both_tokens() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::POST,
            "api/auth/login/",
            200,
            r#"{"access":"a1","refresh":"r1"}"#,
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        session.login(" hero@example.com ", "password1").await.unwrap();

        assert!(session.is_authenticated().await.unwrap());
        let access = store.access_token().await.unwrap().unwrap();
        assert_eq!(access.expose_secret(), "a1");
        let sent = &transport.requests()[0];
        assert_eq!(sent.body.as_ref().unwrap()["email"], "hero@example.com");
    }

    #[tokio::test]
    async fn login_blank_fields_never_hit_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let err = session.login("", "pw").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::Blank { field: "email" })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn login_without_tokens_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(Method::POST, "api/auth/login/", 200, r#"{"access":"a1"}"#);
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let err = session.login("a@b.c", "password1").await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::InvalidResponse { .. })));
        assert!(!store.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn unconfirmed_account_offers_resend() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::POST,
            "api/auth/login/",
            400,
            r#"{"non_field_errors":["Email не подтвержден"]}"#,
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let err = session.login("a@b.c", "password1").await.unwrap_err();
        assert!(needs_confirmation(&err));
        assert_eq!(err.user_message("Login failed"), "Email не подтвержден");
    }

    #[tokio::test]
    async fn register_rejects_mismatch_and_short_password() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let err = session.register(&form("password1", "password2")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PasswordMismatch)
        ));

        let err = session.register(&form("short", "short")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PasswordTooShort { min: 8 })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn register_returns_server_message() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::POST,
            "api/auth/register/",
            201,
            r#"{"message":"Check your inbox"}"#,
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let msg = session.register(&form("password1", "password1")).await.unwrap();
        assert_eq!(msg, "Check your inbox");
    }

    #[tokio::test]
    async fn password_reset_confirmation_clears_session() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::POST,
            "api/auth/confirm-password-reset/",
            200,
            "{}",
        );
        let store = Arc::new(MemoryCredentialStore::with_tokens(CredentialPair::new(
            "a1", "r1",
        )));
        let session = service(&transport, &store);

        let msg = session
            .confirm_password_reset(Some("reset-tok"), "newpassword", "newpassword")
            .await
            .unwrap();
        assert_eq!(msg, "Password has been reset. You can now log in.");
        assert!(!store.has_session().await.unwrap());
        assert!(store.refresh_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_reset_requires_token() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        let err = session
            .confirm_password_reset(None, "newpassword", "newpassword")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingToken { .. })
        ));
    }

    #[tokio::test]
    async fn failed_password_reset_keeps_session() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::POST,
            "api/auth/confirm-password-reset/",
            400,
            r#"{"error":"Token expired"}"#,
        );
        let store = Arc::new(MemoryCredentialStore::with_tokens(CredentialPair::new(
            "a1", "r1",
        )));
        let session = service(&transport, &store);

        let err = session
            .confirm_password_reset(Some("old"), "newpassword", "newpassword")
            .await
            .unwrap_err();
        assert_eq!(err.user_message("Reset failed"), "Token expired");
        assert!(store.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn confirm_email_clears_session() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.on(
            Method::GET,
            "api/auth/confirm-email/abc/",
            200,
            r#"{"message":"Confirmed"}"#,
        );
        let store = Arc::new(MemoryCredentialStore::with_tokens(CredentialPair::new(
            "a1", "r1",
        )));
        let session = service(&transport, &store);

        assert_eq!(session.confirm_email(Some("abc")).await.unwrap(), "Confirmed");
        assert!(!store.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn logout_clears_both_tokens() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::with_tokens(CredentialPair::new(
            "a1", "r1",
        )));
        let session = service(&transport, &store);

        session.logout().await.unwrap();
        assert!(!session.is_authenticated().await.unwrap());
        assert!(store.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_request_needs_email() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let session = service(&transport, &store);

        assert!(session.request_password_reset("  ").await.is_err());
        assert!(session.resend_confirmation("").await.is_err());
        assert!(transport.requests().is_empty());
    }
}
