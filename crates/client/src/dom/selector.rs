//! The small selector language used by binders.
//!
//! Supported forms: `tag`, `#id`, `[attr]`, `[attr=value]`, `[attr='value']`
//! and `[attr="value"]`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported selector: {0}")]
pub struct SelectorError(String);

/// A single simple selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Id(String),
    HasAttribute(String),
    AttributeEquals { name: String, value: String },
}

impl Selector {
    /// `[name]`
    pub fn attr(name: impl Into<String>) -> Self {
        Self::HasAttribute(name.into())
    }

    /// `[name="value"]`
    pub fn attr_eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttributeEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `#id`
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Parse a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] for anything outside the supported forms.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        let unsupported = || SelectorError(input.to_string());

        if let Some(id) = trimmed.strip_prefix('#') {
            return if is_ident(id) {
                Ok(Self::id(id))
            } else {
                Err(unsupported())
            };
        }

        if let Some(body) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return match body.split_once('=') {
                None if is_ident(body) => Ok(Self::attr(body)),
                None => Err(unsupported()),
                Some((name, value)) if is_ident(name) => {
                    Ok(Self::attr_eq(name, unquote(value).ok_or_else(unsupported)?))
                }
                Some(_) => Err(unsupported()),
            };
        }

        if is_ident(trimmed) {
            Ok(Self::Tag(trimmed.to_ascii_lowercase()))
        } else {
            Err(unsupported())
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::HasAttribute(name) => write!(f, "[{name}]"),
            Self::AttributeEquals { name, value } => write!(f, "[{name}=\"{value}\"]"),
        }
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn unquote(value: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    (!value.contains(['"', '\''])).then_some(value)
}
