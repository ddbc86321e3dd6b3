//! Remote collection endpoint contracts and transport implementations.
//!
//! # Responsibility
//! - Define the async contract the store depends on (`RemoteNoteClient`).
//! - Keep HTTP details inside the transport boundary.
//!
//! # Invariants
//! - Transport faults and rejected responses surface as the same error type
//!   per operation family (`FetchError` for reads, `RemoteWriteError` for writes).

pub mod client;
pub mod http;
