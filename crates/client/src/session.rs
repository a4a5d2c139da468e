//! Login session storage and `data-auth-visible` toggling.
//!
//! Elements marked `data-auth-visible="authenticated"` show only with an
//! active session; any other value, `anonymous` or empty included, shows
//! only without one. Visibility refreshes on storage events for the session key
//! from other tabs and on the `usuarioSesion:cambio` signal in this one.

use tienda_core::{SESSION_STORAGE_KEY, StoredSession};
use tracing::warn;

use crate::dom::{Document, EventKind, ListenerId, Selector, Target};

/// Signal dispatched on the window whenever this tab changes the session.
pub const SESSION_CHANGED_EVENT: &str = "usuarioSesion:cambio";

pub const AUTH_VISIBLE_ATTRIBUTE: &str = "data-auth-visible";

/// Read the stored session. Unreadable or malformed content counts as none.
#[must_use]
pub fn stored_session(doc: &Document) -> Option<StoredSession> {
    match doc.storage().get_item(SESSION_STORAGE_KEY) {
        Ok(raw) => raw.as_deref().and_then(StoredSession::parse),
        Err(e) => {
            warn!(error = %e, "Failed to read stored session");
            None
        }
    }
}

#[must_use]
pub fn has_active_session(doc: &Document) -> bool {
    stored_session(doc).is_some_and(|session| session.is_active())
}

/// Store the session and announce the change.
pub fn save_session(doc: &Document, session: &StoredSession) {
    match serde_json::to_string(session) {
        Ok(raw) => {
            if let Err(e) = doc.storage().set_item(SESSION_STORAGE_KEY, &raw) {
                warn!(error = %e, "Failed to save session");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode session"),
    }
    doc.dispatch_custom(Target::Window, SESSION_CHANGED_EVENT);
}

/// Forget the session and announce the change.
pub fn clear_session(doc: &Document) {
    if let Err(e) = doc.storage().remove_item(SESSION_STORAGE_KEY) {
        warn!(error = %e, "Failed to clear session");
    }
    doc.dispatch_custom(Target::Window, SESSION_CHANGED_EVENT);
}

/// Show or hide every `[data-auth-visible]` element.
pub fn refresh_auth_visibility(doc: &Document) {
    let logged_in = has_active_session(doc);
    for element in doc.query_all(doc.body(), &Selector::attr(AUTH_VISIBLE_ATTRIBUTE)) {
        let members_only =
            doc.attribute(element, AUTH_VISIBLE_ATTRIBUTE).as_deref() == Some("authenticated");
        let show = logged_in == members_only;
        doc.toggle_class(element, "hidden", !show);
        doc.set_attribute(element, "aria-hidden", if show { "false" } else { "true" });
    }
}

/// Refresh now and keep refreshing on session changes.
pub fn bind_auth_visibility(doc: &Document) -> Vec<ListenerId> {
    refresh_auth_visibility(doc);

    vec![
        doc.add_listener(Target::Window, EventKind::Storage, |doc, event| {
            if event
                .storage_change()
                .is_some_and(|change| change.affects(SESSION_STORAGE_KEY))
            {
                refresh_auth_visibility(doc);
            }
        }),
        doc.add_listener(
            Target::Window,
            EventKind::custom(SESSION_CHANGED_EVENT),
            |doc, _| refresh_auth_visibility(doc),
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::SessionUser;

    use super::*;
    use crate::dom::{ElementId, Markup};

    fn page(doc: &Document) -> (ElementId, ElementId, ElementId) {
        let account = doc.append(
            doc.body(),
            &Markup::new("a").attr(AUTH_VISIBLE_ATTRIBUTE, "authenticated"),
        );
        let login = doc.append(doc.body(), &Markup::new("a").attr(AUTH_VISIBLE_ATTRIBUTE, "anonymous"));
        let other = doc.append(doc.body(), &Markup::new("a").attr(AUTH_VISIBLE_ATTRIBUTE, ""));
        (account, login, other)
    }

    fn session(confirmed: Option<bool>) -> StoredSession {
        StoredSession {
            jwt: Some("token".to_string()),
            user: Some(SessionUser {
                confirmed,
                ..SessionUser::default()
            }),
        }
    }

    fn visible(doc: &Document, element: ElementId) -> bool {
        !doc.has_class(element, "hidden")
            && doc.attribute(element, "aria-hidden").as_deref() == Some("false")
    }

    #[test]
    fn test_anonymous_by_default() {
        let doc = Document::new();
        let (account, login, other) = page(&doc);
        bind_auth_visibility(&doc);

        assert!(!visible(&doc, account));
        assert!(visible(&doc, login));
        assert!(visible(&doc, other));
    }

    #[test]
    fn test_unknown_mode_is_anonymous_only() {
        let doc = Document::new();
        let (account, _, other) = page(&doc);
        let typo = doc.append(doc.body(), &Markup::new("a").attr(AUTH_VISIBLE_ATTRIBUTE, "autenticado"));
        bind_auth_visibility(&doc);
        assert!(visible(&doc, typo));

        save_session(&doc, &session(Some(true)));

        assert!(visible(&doc, account));
        assert!(!visible(&doc, other));
        assert!(!visible(&doc, typo));
    }

    #[test]
    fn test_save_and_clear_in_same_tab() {
        let doc = Document::new();
        let (account, login, _) = page(&doc);
        bind_auth_visibility(&doc);

        save_session(&doc, &session(Some(true)));
        assert!(visible(&doc, account));
        assert!(!visible(&doc, login));

        clear_session(&doc);
        assert!(!visible(&doc, account));
        assert!(visible(&doc, login));
    }

    #[test]
    fn test_unconfirmed_session_is_anonymous() {
        let doc = Document::new();
        let (account, _, _) = page(&doc);
        bind_auth_visibility(&doc);

        save_session(&doc, &session(Some(false)));
        assert!(!visible(&doc, account));
    }

    #[test]
    fn test_login_in_other_tab() {
        let first = Document::new();
        let second = Document::with_storage(first.storage().open_context());
        let (account, _, _) = page(&second);
        bind_auth_visibility(&second);

        save_session(&first, &session(None));
        assert!(!visible(&second, account));
        second.deliver_storage_events();
        assert!(visible(&second, account));
    }

    #[test]
    fn test_malformed_session_counts_as_none() {
        let doc = Document::new();
        doc.storage().set_item(SESSION_STORAGE_KEY, "{broken").unwrap();
        assert!(!has_active_session(&doc));
    }
}
