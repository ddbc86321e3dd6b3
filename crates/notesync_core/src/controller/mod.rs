//! View-facing controller wiring intents to session, store and remote client.
//!
//! # Responsibility
//! - Expose the dispatch surface used by views.
//! - Run remote writes as background tasks and apply their completions on
//!   the single owner of store and session.
//!
//! # Invariants
//! - Spawned tasks never touch the store; they only enqueue completions.
//! - Remote failures are converted into reverts plus reported outcomes.

pub mod note_controller;
