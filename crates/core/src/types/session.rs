//! Stored login session payload.
//!
//! After a successful login the CMS response (`{ jwt, user }`) is written to
//! storage under [`SESSION_STORAGE_KEY`]. The rest of the shop only checks it
//! for presence and validity; everything else in it is opaque.

use serde::{Deserialize, Serialize};

/// Storage key holding the serialized session.
pub const SESSION_STORAGE_KEY: &str = "usuarioSesion";

/// The `user` part of a stored session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Email confirmation flag; `Some(false)` marks an unconfirmed account.
    #[serde(default)]
    pub confirmed: Option<bool>,
    /// Display name, when the CMS provides one.
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A stored session as written after login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub jwt: Option<String>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl StoredSession {
    /// Parse a raw storage value. Malformed content counts as no session.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// A session is active when it carries a token and a user whose
    /// confirmation flag is not explicitly `false`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let has_token = self.jwt.as_deref().is_some_and(|jwt| !jwt.is_empty());
        let confirmed = self
            .user
            .as_ref()
            .is_some_and(|user| user.confirmed != Some(false));
        has_token && confirmed
    }

    /// Name to greet the user with: `nombre`, then `username`, then `email`.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.nombre
            .as_deref()
            .or(user.username.as_deref())
            .or(user.email.as_deref())
    }
}
