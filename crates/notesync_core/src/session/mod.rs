//! Edit-session state machine for the note form.
//!
//! # Responsibility
//! - Track the selected note and the unsaved drafts.
//! - Turn a submit into a create or update intent.

pub mod edit_session;
