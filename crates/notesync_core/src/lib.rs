//! Client-side note synchronization core.
//! Keeps a local note collection consistent with a remote store using
//! optimistic updates that are reverted when the remote rejects them.

pub mod config;
pub mod controller;
pub mod logging;
pub mod model;
pub mod remote;
pub mod session;
pub mod store;

pub use config::{ConfigError, SyncConfig};
pub use controller::note_controller::{
    Intent, NoteController, SyncError, WriteOutcome, WriteTicket,
};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::note::{Draft, Note, NoteId};
pub use remote::client::{FetchError, RemoteNoteClient, RemoteWriteError};
pub use remote::http::{HttpClientError, HttpNoteClient};
pub use session::edit_session::{EditSession, SessionState, SubmitIntent};
pub use store::note_store::{
    NoteSnapshot, NoteStore, PendingWrite, Settlement, StoreError, WriteKind,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
