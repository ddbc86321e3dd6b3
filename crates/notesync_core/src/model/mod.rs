//! Client-side domain model for synchronized notes.
//!
//! # Responsibility
//! - Define the note value shared by store, session and remote client.
//! - Keep wire shape and in-memory shape identical.
//!
//! # Invariants
//! - Every note is identified by a remote-assigned `NoteId`.
//! - Notes are immutable values; edits produce a new value with the same id.

pub mod note;
