//! Authentication route handlers.
//!
//! The CMS owns accounts. These pages render the forms; the proxy endpoints
//! forward submissions to the CMS and answer with the session payload as
//! JSON, which the client stores under `usuarioSesion`. Submissions may be
//! JSON (the client runtime) or urlencoded (a plain form post).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tienda_core::{LoginForm, RegistrationForm, StoredSession};
use tracing::instrument;

use crate::error::{Result, set_sentry_user};
use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Where the client sends users once they are logged in.
pub const AFTER_LOGIN_PATH: &str = "/tienda";

/// Where the client sends users once they have registered.
pub const AFTER_REGISTER_PATH: &str = "/success-register";

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub title: String,
    pub redirect_to: &'static str,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub title: String,
    pub redirect_to: &'static str,
}

/// Display the login page.
#[instrument(skip(state))]
pub async fn login_page(State(state): State<AppState>) -> LoginTemplate {
    let layout = Layout::load(&state).await;
    LoginTemplate {
        title: layout.title("Iniciar sesión"),
        layout,
        redirect_to: AFTER_LOGIN_PATH,
    }
}

/// Display the registration page.
#[instrument(skip(state))]
pub async fn register_page(State(state): State<AppState>) -> RegisterTemplate {
    let layout = Layout::load(&state).await;
    RegisterTemplate {
        title: layout.title("Crear cuenta"),
        layout,
        redirect_to: AFTER_REGISTER_PATH,
    }
}

/// Registration confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub layout: Layout,
    pub title: String,
}

/// Display the registration confirmation page.
#[instrument(skip(state))]
pub async fn register_success(State(state): State<AppState>) -> RegisterSuccessTemplate {
    let layout = Layout::load(&state).await;
    RegisterSuccessTemplate {
        title: layout.title("Cuenta creada"),
        layout,
    }
}

/// A form body sent either as JSON or as `application/x-www-form-urlencoded`.
#[derive(Debug)]
pub struct AuthSubmission<T>(pub T);

impl<T, S> FromRequest<S> for AuthSubmission<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let urlencoded = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if urlencoded {
            let Form(form) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(form))
        } else {
            let Json(form) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(form))
        }
    }
}

fn identify(session: &StoredSession) {
    let user = session.user.as_ref();
    set_sentry_user(
        user.and_then(|u| u.username.as_deref()),
        user.and_then(|u| u.email.as_deref()),
    );
}

/// Proxy a login to the CMS.
///
/// # Errors
///
/// Returns `AppError::Auth`, rendered as `{ "error": message }`.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    AuthSubmission(form): AuthSubmission<LoginForm>,
) -> Result<Json<StoredSession>> {
    let session = state.cms().login(form).await?;
    identify(&session);
    tracing::info!("Login succeeded");
    Ok(Json(session))
}

/// Proxy a registration to the CMS.
///
/// # Errors
///
/// Returns `AppError::Auth`, rendered as `{ "error": message }`.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    AuthSubmission(form): AuthSubmission<RegistrationForm>,
) -> Result<Json<StoredSession>> {
    let session = state.cms().register(form).await?;
    identify(&session);
    tracing::info!("Registration succeeded");
    Ok(Json(session))
}
