//! Login and registration forms.
//!
//! A `<form data-auth-form="login">` (or `"register"`) is checked on submit
//! with the same rules the storefront applies. A valid submission is queued
//! on the [`AuthForm`] and the host sends it with [`AuthForm::send_pending`],
//! which posts JSON to the storefront's auth proxy. On success a login
//! stores the session; either kind then navigates to the form's
//! `data-redirect`. Failures land in the form's `[data-auth-feedback]`
//! element. While a session is active every control of the form stays
//! disabled.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tienda_core::{FormError, LoginForm, RegistrationForm, SESSION_STORAGE_KEY, StoredSession};
use tracing::{debug, info, warn};
use url::Url;

use crate::dom::{Document, ElementId, EventKind, ListenerId, Selector, Target};
use crate::session::{SESSION_CHANGED_EVENT, has_active_session, save_session};

pub const AUTH_FORM_ATTRIBUTE: &str = "data-auth-form";
pub const FEEDBACK_ATTRIBUTE: &str = "data-auth-feedback";
pub const REDIRECT_ATTRIBUTE: &str = "data-redirect";
const READY_ATTRIBUTE: &str = "data-auth-ready";

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Where a visitor who already has a session is sent.
const SIGNED_IN_PATH: &str = "/tienda";

const ACTIVE_SESSION_MESSAGE: &str = "Ya tienes una sesión activa.";

/// Which form a `data-auth-form` element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFormKind {
    Login,
    Register,
}

impl AuthFormKind {
    #[must_use]
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            _ => None,
        }
    }

    const fn progress_message(self) -> &'static str {
        match self {
            Self::Login => "Verificando Usuario...",
            Self::Register => "Creando tu cuenta...",
        }
    }

    const fn success_message(self) -> &'static str {
        match self {
            Self::Login => "Inicio de sesión exitoso. Redirigiendo...",
            Self::Register => "Registro exitoso. Redirigiendo...",
        }
    }

    const fn failure_message(self) -> &'static str {
        match self {
            Self::Login => "No se pudo iniciar sesión.",
            Self::Register => "No se pudo completar el registro.",
        }
    }

    const fn default_redirect(self) -> &'static str {
        match self {
            Self::Login => SIGNED_IN_PATH,
            Self::Register => "/success-register",
        }
    }
}

/// Tone of the feedback line, mirrored in `data-variant` and its classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackVariant {
    Neutral,
    Success,
    Error,
}

impl FeedbackVariant {
    const ALL: [Self; 3] = [Self::Neutral, Self::Success, Self::Error];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    const fn classes(self) -> [&'static str; 2] {
        match self {
            Self::Neutral => ["text-zinc-500", "dark:text-zinc-300"],
            Self::Success => ["text-emerald-600", "dark:text-emerald-400"],
            Self::Error => ["text-rose-600", "dark:text-rose-400"],
        }
    }
}

/// A validated form waiting to be sent.
#[derive(Debug, Clone)]
pub enum AuthSubmission {
    Login(LoginForm),
    Register(RegistrationForm),
}

/// A failed call to the auth proxy.
#[derive(Debug, Error)]
pub enum AuthRequestError {
    #[error("auth request rejected with status {status}")]
    Rejected {
        status: u16,
        /// The proxy's `{ "error": .. }` message, when it sent one.
        message: Option<String>,
    },

    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthRequestError {
    /// Message fit for the visitor, if the proxy provided one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            Self::Http(_) => None,
        }
    }
}

/// Posts submissions to the storefront's auth proxy.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    login: Url,
    register: Url,
}

impl AuthClient {
    /// Create a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URLs cannot be built.
    pub fn new(base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            http: reqwest::Client::new(),
            login: base_url.join(LOGIN_PATH)?,
            register: base_url.join(REGISTER_PATH)?,
        })
    }

    /// Send one submission and read the session from the reply.
    ///
    /// # Errors
    ///
    /// Returns [`AuthRequestError::Rejected`] for non-success statuses and
    /// [`AuthRequestError::Http`] when the request or body decoding fails.
    pub async fn submit(
        &self,
        submission: &AuthSubmission,
    ) -> Result<StoredSession, AuthRequestError> {
        let request = match submission {
            AuthSubmission::Login(form) => self.http.post(self.login.clone()).json(form),
            AuthSubmission::Register(form) => self.http.post(self.register.clone()).json(form),
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<StoredSession>().await?);
        }

        let message = response.json::<Value>().await.ok().and_then(|body| {
            body.get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Err(AuthRequestError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

struct FormState {
    kind: AuthFormKind,
    form: ElementId,
    feedback: Option<ElementId>,
    submit: Option<ElementId>,
    redirect: String,
    busy: Cell<bool>,
    pending: RefCell<Option<AuthSubmission>>,
}

impl FormState {
    fn field(&self, doc: &Document, name: &str) -> String {
        doc.query(self.form, &Selector::attr_eq("name", name))
            .map(|input| doc.value(input))
            .unwrap_or_default()
    }

    fn read(&self, doc: &Document) -> Result<AuthSubmission, FormError> {
        match self.kind {
            AuthFormKind::Login => LoginForm {
                identifier: self.field(doc, "identifier"),
                password: self.field(doc, "password"),
            }
            .validate()
            .map(AuthSubmission::Login),
            AuthFormKind::Register => RegistrationForm {
                username: self.field(doc, "username"),
                email: self.field(doc, "email"),
                password: self.field(doc, "password"),
            }
            .validate()
            .map(AuthSubmission::Register),
        }
    }

    fn show(&self, doc: &Document, message: &str, variant: FeedbackVariant) {
        let Some(feedback) = self.feedback else {
            return;
        };
        doc.set_text(feedback, message);
        doc.set_attribute(feedback, "data-variant", variant.name());
        for class in FeedbackVariant::ALL.iter().flat_map(|v| v.classes()) {
            doc.remove_class(feedback, class);
        }
        for class in variant.classes() {
            doc.add_class(feedback, class);
        }
    }

    fn set_loading(&self, doc: &Document, loading: bool) {
        let Some(button) = self.submit else {
            return;
        };
        if loading {
            doc.set_attribute(button, "disabled", "");
        } else {
            doc.remove_attribute(button, "disabled");
        }
        doc.set_attribute(button, "data-loading", if loading { "true" } else { "false" });
    }

    fn set_locked(&self, doc: &Document, locked: bool) {
        let controls = doc
            .query_all(self.form, &Selector::Tag("input".to_string()))
            .into_iter()
            .chain(doc.query_all(self.form, &Selector::Tag("button".to_string())));
        for control in controls {
            if locked {
                doc.set_attribute(control, "disabled", "");
            } else {
                doc.remove_attribute(control, "disabled");
            }
        }
    }

    fn sync_lock(&self, doc: &Document) {
        if !self.busy.get() {
            self.set_locked(doc, has_active_session(doc));
        }
    }

    fn handle_submit(&self, doc: &Document) {
        if has_active_session(doc) {
            self.set_locked(doc, true);
            self.show(doc, ACTIVE_SESSION_MESSAGE, FeedbackVariant::Success);
            doc.navigate(SIGNED_IN_PATH);
            return;
        }
        if self.busy.get() {
            return;
        }

        match self.read(doc) {
            Ok(submission) => {
                self.busy.set(true);
                self.set_loading(doc, true);
                self.show(doc, self.kind.progress_message(), FeedbackVariant::Neutral);
                *self.pending.borrow_mut() = Some(submission);
                debug!(kind = ?self.kind, "Auth submission queued");
            }
            Err(e) => self.show(doc, &e.to_string(), FeedbackVariant::Error),
        }
    }
}

/// A bound login or registration form.
///
/// Cheap to clone; clones share the queued submission.
#[derive(Clone)]
pub struct AuthForm {
    state: Rc<FormState>,
    listeners: Rc<RefCell<Vec<ListenerId>>>,
}

impl std::fmt::Debug for AuthForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthForm")
            .field("kind", &self.state.kind)
            .field("busy", &self.state.busy.get())
            .finish_non_exhaustive()
    }
}

impl AuthForm {
    /// Bind the first `[data-auth-form]` under `scope`.
    ///
    /// Returns `None` when there is none, its kind is unknown, or it is
    /// already bound.
    pub fn mount(doc: &Document, scope: ElementId) -> Option<Self> {
        let form = doc.query(scope, &Selector::attr(AUTH_FORM_ATTRIBUTE))?;
        if doc.has_attribute(form, READY_ATTRIBUTE) {
            return None;
        }
        let kind = doc
            .attribute(form, AUTH_FORM_ATTRIBUTE)
            .as_deref()
            .and_then(AuthFormKind::from_attribute)?;
        let redirect = doc
            .attribute(form, REDIRECT_ATTRIBUTE)
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| kind.default_redirect().to_string());

        let state = Rc::new(FormState {
            kind,
            form,
            feedback: doc.query(form, &Selector::attr(FEEDBACK_ATTRIBUTE)),
            submit: doc.query(form, &Selector::attr_eq("type", "submit")),
            redirect,
            busy: Cell::new(false),
            pending: RefCell::new(None),
        });
        doc.set_attribute(form, READY_ATTRIBUTE, "");

        if has_active_session(doc) {
            state.set_locked(doc, true);
            state.show(doc, ACTIVE_SESSION_MESSAGE, FeedbackVariant::Success);
        }

        let s = Rc::clone(&state);
        let on_submit = doc.add_listener(form, EventKind::Submit, move |doc, event| {
            event.prevent_default();
            s.handle_submit(doc);
        });
        let s = Rc::clone(&state);
        let on_session = doc.add_listener(
            Target::Window,
            EventKind::custom(SESSION_CHANGED_EVENT),
            move |doc, _| s.sync_lock(doc),
        );
        let s = Rc::clone(&state);
        let on_storage = doc.add_listener(Target::Window, EventKind::Storage, move |doc, event| {
            if event
                .storage_change()
                .is_some_and(|change| change.affects(SESSION_STORAGE_KEY))
            {
                s.sync_lock(doc);
            }
        });

        Some(Self {
            state,
            listeners: Rc::new(RefCell::new(vec![on_submit, on_session, on_storage])),
        })
    }

    #[must_use]
    pub fn kind(&self) -> AuthFormKind {
        self.state.kind
    }

    /// The submission waiting for [`send_pending`](Self::send_pending).
    #[must_use]
    pub fn pending(&self) -> Option<AuthSubmission> {
        self.state.pending.borrow().clone()
    }

    /// Send the queued submission and show the outcome in the form.
    ///
    /// Returns false when nothing was queued.
    #[allow(clippy::future_not_send)]
    pub async fn send_pending(&self, doc: &Document, client: &AuthClient) -> bool {
        let Some(submission) = self.state.pending.take() else {
            return false;
        };
        let result = client.submit(&submission).await;

        let s = &self.state;
        s.busy.set(false);
        s.set_loading(doc, false);
        match result {
            Ok(session) => {
                if s.kind == AuthFormKind::Login {
                    save_session(doc, &session);
                    info!(user = ?session.display_name(), "Logged in");
                }
                s.show(doc, s.kind.success_message(), FeedbackVariant::Success);
                doc.navigate(&s.redirect);
            }
            Err(e) => {
                warn!(error = %e, kind = ?s.kind, "Auth request failed");
                let message = e.message().unwrap_or_else(|| s.kind.failure_message());
                s.show(doc, message, FeedbackVariant::Error);
            }
        }
        true
    }

    /// Remove every listener and drop any queued submission.
    pub fn teardown(&self, doc: &Document) {
        for listener in self.listeners.take() {
            doc.remove_listener(listener);
        }
        self.state.pending.take();
        self.state.busy.set(false);
        doc.remove_attribute(self.state.form, READY_ATTRIBUTE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tienda_core::SessionUser;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::dom::Markup;
    use crate::session::{clear_session, stored_session};

    struct Page {
        form: ElementId,
        feedback: ElementId,
        button: ElementId,
    }

    fn input(name: &str) -> Markup {
        Markup::new("input").attr("name", name)
    }

    fn login_page(doc: &Document) -> Page {
        page(doc, "login", "/tienda", &["identifier", "password"])
    }

    fn register_page(doc: &Document) -> Page {
        page(doc, "register", "/success-register", &["username", "email", "password"])
    }

    fn page(doc: &Document, kind: &str, redirect: &str, fields: &[&str]) -> Page {
        let form = doc.append(
            doc.body(),
            &Markup::new("form")
                .attr(AUTH_FORM_ATTRIBUTE, kind)
                .attr(REDIRECT_ATTRIBUTE, redirect)
                .children(fields.iter().map(|name| input(name))),
        );
        let feedback = doc.append(form, &Markup::new("p").attr(FEEDBACK_ATTRIBUTE, ""));
        let button = doc.append(form, &Markup::new("button").attr("type", "submit"));
        Page {
            form,
            feedback,
            button,
        }
    }

    fn fill(doc: &Document, page: &Page, name: &str, value: &str) {
        let field = doc
            .query(page.form, &Selector::attr_eq("name", name))
            .unwrap();
        doc.type_text(field, value);
    }

    fn active_session() -> StoredSession {
        StoredSession {
            jwt: Some("token".to_string()),
            user: Some(SessionUser {
                username: Some("ana".to_string()),
                confirmed: Some(true),
                ..SessionUser::default()
            }),
        }
    }

    fn client(server: &MockServer) -> AuthClient {
        AuthClient::new(&Url::parse(&server.uri()).unwrap()).unwrap()
    }

    fn disabled(doc: &Document, element: ElementId) -> bool {
        doc.has_attribute(element, "disabled")
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_blank_login_shows_error_and_queues_nothing() {
        let doc = Document::new();
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "identifier", "   ");

        let event = doc.submit(page.form);

        assert!(event.default_prevented());
        assert!(form.pending().is_none());
        assert_eq!(
            doc.text_content(page.feedback),
            "Por favor ingresa tu usuario y contraseña."
        );
        assert_eq!(doc.attribute(page.feedback, "data-variant").as_deref(), Some("error"));
        assert!(doc.has_class(page.feedback, "text-rose-600"));
        assert!(!disabled(&doc, page.button));
    }

    #[test]
    fn test_register_rejects_email_without_at() {
        let doc = Document::new();
        let page = register_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "username", "ana");
        fill(&doc, &page, "email", "ana.example.com");
        fill(&doc, &page, "password", "pw");

        doc.submit(page.form);

        assert!(form.pending().is_none());
        assert_eq!(
            doc.text_content(page.feedback),
            "Ingresa un correo válido para crear tu cuenta."
        );
    }

    #[test]
    fn test_valid_login_is_queued_with_loading_state() {
        let doc = Document::new();
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "identifier", " ana ");
        fill(&doc, &page, "password", "pw");

        doc.submit(page.form);

        let Some(AuthSubmission::Login(login)) = form.pending() else {
            panic!("expected a queued login");
        };
        assert_eq!(login.identifier, "ana");
        assert_eq!(doc.text_content(page.feedback), "Verificando Usuario...");
        assert_eq!(doc.attribute(page.feedback, "data-variant").as_deref(), Some("neutral"));
        assert!(disabled(&doc, page.button));
        assert_eq!(doc.attribute(page.button, "data-loading").as_deref(), Some("true"));
    }

    // =========================================================================
    // Sending
    // =========================================================================

    #[tokio::test]
    async fn test_login_success_stores_session_and_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"identifier": "ana", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "token",
                "user": {"username": "ana", "confirmed": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let doc = Document::new();
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "identifier", "ana");
        fill(&doc, &page, "password", "pw");
        doc.submit(page.form);

        assert!(form.send_pending(&doc, &client(&server)).await);

        assert!(has_active_session(&doc));
        assert_eq!(doc.location(), "/tienda");
        assert_eq!(
            doc.text_content(page.feedback),
            "Inicio de sesión exitoso. Redirigiendo..."
        );
        assert_eq!(doc.attribute(page.button, "data-loading").as_deref(), Some("false"));
        assert!(disabled(&doc, page.button));
        assert!(!form.send_pending(&doc, &client(&server)).await);
    }

    #[tokio::test]
    async fn test_rejected_login_shows_proxy_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "Invalid identifier or password"})),
            )
            .mount(&server)
            .await;

        let doc = Document::new();
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "identifier", "ana");
        fill(&doc, &page, "password", "wrong");
        doc.submit(page.form);

        assert!(form.send_pending(&doc, &client(&server)).await);

        assert!(stored_session(&doc).is_none());
        assert_eq!(doc.location(), "/");
        assert_eq!(doc.text_content(page.feedback), "Invalid identifier or password");
        assert_eq!(doc.attribute(page.feedback, "data-variant").as_deref(), Some("error"));
        assert!(!disabled(&doc, page.button));
    }

    #[tokio::test]
    async fn test_failure_without_message_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let doc = Document::new();
        let page = register_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "username", "ana");
        fill(&doc, &page, "email", "ana@example.com");
        fill(&doc, &page, "password", "pw");
        doc.submit(page.form);

        form.send_pending(&doc, &client(&server)).await;

        assert_eq!(doc.text_content(page.feedback), "No se pudo completar el registro.");
    }

    #[tokio::test]
    async fn test_registration_redirects_without_storing_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .and(body_json(json!({
                "username": "ana",
                "email": "ana@example.com",
                "password": "pw"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "token",
                "user": {"username": "ana", "confirmed": false}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let doc = Document::new();
        let page = register_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        fill(&doc, &page, "username", "ana");
        fill(&doc, &page, "email", " ana@example.com ");
        fill(&doc, &page, "password", "pw");
        doc.submit(page.form);

        assert!(form.send_pending(&doc, &client(&server)).await);

        assert!(stored_session(&doc).is_none());
        assert_eq!(doc.location(), "/success-register");
        assert_eq!(doc.text_content(page.feedback), "Registro exitoso. Redirigiendo...");
    }

    // =========================================================================
    // Session lock
    // =========================================================================

    #[test]
    fn test_active_session_locks_form_and_redirects_on_submit() {
        let doc = Document::new();
        save_session(&doc, &active_session());
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();

        assert!(disabled(&doc, page.button));
        assert_eq!(doc.text_content(page.feedback), "Ya tienes una sesión activa.");

        doc.submit(page.form);

        assert!(form.pending().is_none());
        assert_eq!(doc.location(), "/tienda");
    }

    #[test]
    fn test_session_changes_lock_and_unlock() {
        let doc = Document::new();
        let page = login_page(&doc);
        let _form = AuthForm::mount(&doc, doc.body()).unwrap();
        let identifier = doc
            .query(page.form, &Selector::attr_eq("name", "identifier"))
            .unwrap();
        assert!(!disabled(&doc, identifier));

        save_session(&doc, &active_session());
        assert!(disabled(&doc, identifier));
        assert!(disabled(&doc, page.button));

        clear_session(&doc);
        assert!(!disabled(&doc, identifier));
    }

    #[test]
    fn test_session_from_other_tab_locks_form() {
        let doc = Document::new();
        let other = Document::with_storage(doc.storage().open_context());
        let page = login_page(&doc);
        let _form = AuthForm::mount(&doc, doc.body()).unwrap();

        save_session(&other, &active_session());
        doc.deliver_storage_events();

        assert!(disabled(&doc, page.button));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[test]
    fn test_unknown_kind_is_not_bound() {
        let doc = Document::new();
        doc.append(doc.body(), &Markup::new("form").attr(AUTH_FORM_ATTRIBUTE, "reset"));

        assert!(AuthForm::mount(&doc, doc.body()).is_none());
    }

    #[test]
    fn test_mounting_twice_is_a_no_op_until_teardown() {
        let doc = Document::new();
        let page = login_page(&doc);
        let form = AuthForm::mount(&doc, doc.body()).unwrap();
        let listeners = doc.listener_count();

        assert!(AuthForm::mount(&doc, doc.body()).is_none());
        assert_eq!(doc.listener_count(), listeners);

        form.teardown(&doc);
        let event = doc.submit(page.form);
        assert!(!event.default_prevented());
        assert!(AuthForm::mount(&doc, doc.body()).is_some());
    }

    #[test]
    fn test_missing_redirect_uses_kind_default() {
        let doc = Document::new();
        let form = doc.append(
            doc.body(),
            &Markup::new("form")
                .attr(AUTH_FORM_ATTRIBUTE, "register")
                .child(input("username")),
        );
        let bound = AuthForm::mount(&doc, doc.body()).unwrap();

        assert_eq!(bound.kind(), AuthFormKind::Register);
        assert_eq!(bound.state.redirect, "/success-register");
        assert_eq!(doc.query(doc.body(), &Selector::attr(AUTH_FORM_ATTRIBUTE)), Some(form));
    }
}
