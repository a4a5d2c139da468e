//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cms::{AuthError, CmsError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// CMS read failed.
    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),

    /// Login or registration failed. Rendered as JSON `{ "error": .. }`.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code sent to the client.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Cms(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
                AuthError::Rejected { status, .. } if status.is_client_error() => *status,
                AuthError::Rejected { .. } | AuthError::Cms(_) => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Cms(_) | Self::Internal(_) | Self::Auth(AuthError::Cms(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        match &self {
            Self::Auth(err) => {
                let message = match err {
                    AuthError::Invalid(form) => form.to_string(),
                    AuthError::Rejected { message, .. } => message.clone(),
                    AuthError::Cms(_) => "No se pudo conectar con el servidor.".to_string(),
                };
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::Cms(_) => (status, "External service error").into_response(),
            Self::Internal(_) => (status, "Internal server error").into_response(),
            _ => (status, self.to_string()).into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(username: Option<&str>, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: username.map(String::from),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("catalog", "Viewed product", Some(&[("slug", "casco-pro")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use tienda_core::FormError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let body = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("casco-pro".to_string());
        assert_eq!(err.to_string(), "Not found: casco-pro");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Cms(CmsError::Status {
                endpoint: "productos".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
                status_text: "Service Unavailable".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_auth_rejection_status() {
        let rejected = |status| {
            AppError::Auth(AuthError::Rejected {
                status,
                message: "nope".to_string(),
            })
        };
        assert_eq!(
            get_status(rejected(StatusCode::BAD_REQUEST)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(rejected(StatusCode::INTERNAL_SERVER_ERROR)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_auth_errors_render_json() {
        let body = body_json(AppError::Auth(AuthError::Invalid(
            FormError::MissingCredentials,
        )))
        .await;
        assert_eq!(
            body,
            json!({"error": "Por favor ingresa tu usuario y contraseña."})
        );

        let body = body_json(AppError::Auth(AuthError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid identifier or password".to_string(),
        }))
        .await;
        assert_eq!(body, json!({"error": "Invalid identifier or password"}));
    }
}
