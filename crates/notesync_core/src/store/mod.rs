//! In-memory note collection and optimistic-update protocol.
//!
//! # Responsibility
//! - Own the collection snapshot handed to the view.
//! - Apply optimistic writes and reconcile their remote outcome.
//!
//! # Invariants
//! - Published snapshots are never mutated; every change swaps the whole sequence.
//! - A revert never destroys a newer optimistic write on the same id.

pub mod note_store;
