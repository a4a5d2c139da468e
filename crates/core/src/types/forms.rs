//! Login and registration form payloads.
//!
//! Both forms are validated before anything is sent to the CMS. Messages are
//! the storefront's user-facing copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure for a submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Por favor ingresa tu usuario y contraseña.")]
    MissingCredentials,

    #[error("Completa los campos para registrarte.")]
    MissingRegistrationFields,

    #[error("Ingresa un correo válido para crear tu cuenta.")]
    InvalidEmail,
}

/// Login form: identifier (username or email) and password.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Trim the identifier and check both fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::MissingCredentials`] when either field is blank.
    pub fn validate(self) -> Result<Self, FormError> {
        let identifier = self.identifier.trim().to_string();
        if identifier.is_empty() || self.password.is_empty() {
            return Err(FormError::MissingCredentials);
        }
        Ok(Self {
            identifier,
            password: self.password,
        })
    }
}

/// Registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegistrationForm {
    /// Trim username and email and check every field.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::MissingRegistrationFields`] when a field is blank
    /// and [`FormError::InvalidEmail`] when the email has no `@`.
    pub fn validate(self) -> Result<Self, FormError> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();
        if username.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err(FormError::MissingRegistrationFields);
        }
        if !email.contains('@') {
            return Err(FormError::InvalidEmail);
        }
        Ok(Self {
            username,
            email,
            password: self.password,
        })
    }
}
