//! Remote note client contract.
//!
//! # Responsibility
//! - Describe the four remote operations the core needs.
//! - Define read/write error families shared by all transports.
//!
//! # Invariants
//! - All operations may suspend; callers must not assume synchronous completion.
//! - Callers treat every error variant uniformly as "revert and report".

use crate::model::note::{Draft, Note, NoteId};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error returned when the full listing cannot be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Endpoint unreachable, timed out or connection dropped.
    Transport(String),
    /// Endpoint answered with a non-success status.
    Status(u16),
    /// Response body is not a valid note listing.
    Decode(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "note listing unreachable: {message}"),
            Self::Status(status) => write!(f, "note listing rejected with status {status}"),
            Self::Decode(message) => write!(f, "note listing malformed: {message}"),
        }
    }
}

impl Error for FetchError {}

/// Error returned when a create/update/delete is rejected or unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteWriteError {
    /// Endpoint unreachable, timed out or connection dropped.
    Transport(String),
    /// Endpoint answered with a non-success status.
    Rejected { status: u16 },
    /// Response body could not be decoded (create only).
    Decode(String),
}

impl Display for RemoteWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote write unreachable: {message}"),
            Self::Rejected { status } => write!(f, "remote write rejected with status {status}"),
            Self::Decode(message) => write!(f, "remote write response malformed: {message}"),
        }
    }
}

impl Error for RemoteWriteError {}

/// Async contract for the remote note collection.
#[async_trait]
pub trait RemoteNoteClient: Send + Sync {
    /// Fetches the full collection in presentation order.
    async fn list(&self) -> Result<Vec<Note>, FetchError>;
    /// Creates one note and returns it with the remote-assigned id.
    async fn create(&self, draft: &Draft) -> Result<Note, RemoteWriteError>;
    /// Replaces one note wholesale. Response body is ignored.
    async fn update(&self, note: &Note) -> Result<(), RemoteWriteError>;
    /// Deletes one note by id.
    async fn delete(&self, id: &NoteId) -> Result<(), RemoteWriteError>;
}
