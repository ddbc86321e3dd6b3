//! Draft/selection state for the note form.
//!
//! # Responsibility
//! - Hold the optional selected note id plus draft title/content.
//! - Decide whether a submit means create or update.
//!
//! # Invariants
//! - `Idle` submit yields `Create`; `Editing(id)` submit yields `Update(id)`.
//! - Submit and cancel always leave the session `Idle` with empty drafts.
//! - The session has no error states.

use crate::model::note::{Draft, Note, NoteId};

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Editing(NoteId),
}

/// Intent produced by `EditSession::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitIntent {
    Create(Draft),
    Update { id: NoteId, draft: Draft },
}

/// Single-writer edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    selected: Option<NoteId>,
    draft: Draft,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match &self.selected {
            Some(id) => SessionState::Editing(id.clone()),
            None => SessionState::Idle,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected(&self) -> Option<&NoteId> {
        self.selected.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.draft.title
    }

    pub fn content(&self) -> &str {
        &self.draft.content
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Starts editing `note`, replacing any previous drafts.
    pub fn select(&mut self, note: &Note) {
        self.selected = Some(note.id.clone());
        self.draft = Draft::new(note.title.as_str(), note.content.as_str());
    }

    pub fn change_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn change_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    /// Consumes the drafts into an intent and returns to `Idle`.
    pub fn submit(&mut self) -> SubmitIntent {
        let draft = std::mem::take(&mut self.draft);
        match self.selected.take() {
            Some(id) => SubmitIntent::Update { id, draft },
            None => SubmitIntent::Create(draft),
        }
    }

    pub fn cancel(&mut self) {
        self.selected = None;
        self.draft = Draft::default();
    }

    /// Puts `draft` back when the form is idle and still empty.
    ///
    /// Returns whether the drafts were restored.
    pub fn restore_drafts(&mut self, draft: Draft) -> bool {
        if self.selected.is_some() || !self.draft.is_empty() {
            return false;
        }
        self.draft = draft;
        true
    }
}
