//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note value and its remote-assigned identity.
//! - Provide the request bodies sent to the remote collection endpoint.
//!
//! # Invariants
//! - `id` is assigned by the remote authority and never generated locally.
//! - `NoteId` serializes back in the same JSON shape it was received in.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Remote-assigned note identity.
///
/// The remote may use numeric or string keys; both are kept verbatim so
/// that the id round-trips into request paths and bodies unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    /// Numeric key, e.g. an autoincrement primary key.
    Number(i64),
    /// Opaque string key.
    Text(String),
}

impl NoteId {
    /// Parses user-supplied text, preferring the numeric shape.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<i64>() {
            Ok(number) => Self::Number(number),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for NoteId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Canonical note value as rendered by the view and stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Remote-assigned stable identity.
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Returns a new value with the same id and replaced fields.
    pub fn with_fields(&self, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(self.id.clone(), title, content)
    }
}

/// Unsaved title/content pair, used as create request body and submit payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

impl Draft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Returns whether both fields carry non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    /// Returns whether both fields are empty strings.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}
