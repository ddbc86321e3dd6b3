//! Note controller.
//!
//! # Responsibility
//! - Own `NoteStore`, `EditSession` and the remote client handle.
//! - Translate view intents into store operations and remote calls.
//! - Report every remote write as a `WriteOutcome`.
//!
//! # Invariants
//! - Optimistic changes are published before the remote call is spawned.
//! - Creates are never shown before the remote confirms them.
//! - Completions are applied only by `next_outcome`/`try_next_outcome`.
//! - Every spawned write yields exactly one completion, even if its call panics.
//!
//! Writes call `tokio::spawn`, so they must run inside a Tokio runtime.

use crate::model::note::{Draft, Note, NoteId};
use crate::remote::client::{FetchError, RemoteNoteClient, RemoteWriteError};
use crate::session::edit_session::{EditSession, SubmitIntent};
use crate::store::note_store::{
    NoteSnapshot, NoteStore, PendingWrite, Settlement, StoreError, WriteKind,
};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;

/// Controller-level error returned to views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Full listing could not be fetched; previous state kept.
    Fetch(FetchError),
    /// Remote write failed.
    RemoteWrite(RemoteWriteError),
    /// Referenced note is not in the local collection.
    NotFound(NoteId),
    /// Submit with blank title or content.
    EmptyDraft,
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "{err}"),
            Self::RemoteWrite(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::EmptyDraft => write!(f, "title and content are required"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::RemoteWrite(err) => Some(err),
            Self::NotFound(_) | Self::EmptyDraft => None,
        }
    }
}

impl From<FetchError> for SyncError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

impl From<RemoteWriteError> for SyncError {
    fn from(value: RemoteWriteError) -> Self {
        Self::RemoteWrite(value)
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
        }
    }
}

/// Handle identifying one spawned remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteTicket(u64);

impl WriteTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for WriteTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Applied result of one remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Remote created the note; it is now first in the collection.
    Created { ticket: WriteTicket, note: Note },
    /// Remote create failed; nothing was added.
    CreateFailed {
        ticket: WriteTicket,
        draft: Draft,
        error: RemoteWriteError,
    },
    /// Remote accepted an update/delete.
    Confirmed {
        ticket: WriteTicket,
        kind: WriteKind,
        id: NoteId,
    },
    /// Remote rejected an update/delete and the id was restored.
    Reverted {
        ticket: WriteTicket,
        kind: WriteKind,
        id: NoteId,
        error: RemoteWriteError,
    },
    /// Remote rejected an update/delete that a newer write already replaced.
    Superseded {
        ticket: WriteTicket,
        kind: WriteKind,
        id: NoteId,
        error: RemoteWriteError,
    },
}

impl WriteOutcome {
    pub fn ticket(&self) -> WriteTicket {
        match self {
            Self::Created { ticket, .. }
            | Self::CreateFailed { ticket, .. }
            | Self::Confirmed { ticket, .. }
            | Self::Reverted { ticket, .. }
            | Self::Superseded { ticket, .. } => *ticket,
        }
    }

    /// Remote error carried by failed outcomes.
    pub fn error(&self) -> Option<&RemoteWriteError> {
        match self {
            Self::CreateFailed { error, .. }
            | Self::Reverted { error, .. }
            | Self::Superseded { error, .. } => Some(error),
            Self::Created { .. } | Self::Confirmed { .. } => None,
        }
    }
}

/// View intents accepted by `NoteController::dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Select(NoteId),
    ChangeTitle(String),
    ChangeContent(String),
    Submit,
    Cancel,
    Delete(NoteId),
}

enum Completion {
    Create {
        ticket: WriteTicket,
        draft: Draft,
        result: Result<Note, RemoteWriteError>,
    },
    Write {
        ticket: WriteTicket,
        pending: PendingWrite,
        result: Result<(), RemoteWriteError>,
    },
}

/// Owner of note state for one view.
pub struct NoteController {
    store: NoteStore,
    session: EditSession,
    client: Arc<dyn RemoteNoteClient>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    next_ticket: u64,
}

impl NoteController {
    pub fn new(client: Arc<dyn RemoteNoteClient>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            store: NoteStore::new(),
            session: EditSession::new(),
            client,
            completions_tx,
            completions_rx,
            in_flight: 0,
            next_ticket: 1,
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Current read-only collection snapshot.
    pub fn notes(&self) -> NoteSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<NoteSnapshot> {
        self.store.subscribe()
    }

    /// Remote writes spawned but not yet applied.
    pub fn pending_writes(&self) -> usize {
        self.in_flight
    }

    /// Fetches the full listing and replaces local state.
    ///
    /// On failure the previous collection is kept and the error returned.
    pub async fn load(&mut self) -> Result<usize, SyncError> {
        match self.client.list().await {
            Ok(notes) => {
                self.store.replace_all(notes);
                info!(
                    "event=notes_load module=controller status=ok count={}",
                    self.store.len()
                );
                Ok(self.store.len())
            }
            Err(err) => {
                error!("event=notes_load module=controller status=error error={err}");
                Err(err.into())
            }
        }
    }

    /// Applies one view intent. Write intents return their ticket.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Option<WriteTicket>, SyncError> {
        match intent {
            Intent::Select(id) => self.select(&id).map(|_| None),
            Intent::ChangeTitle(title) => {
                self.change_title(title);
                Ok(None)
            }
            Intent::ChangeContent(content) => {
                self.change_content(content);
                Ok(None)
            }
            Intent::Submit => self.submit().map(Some),
            Intent::Cancel => {
                self.cancel();
                Ok(None)
            }
            Intent::Delete(id) => self.delete_note(&id).map(Some),
        }
    }

    /// Starts editing the note with `id`.
    pub fn select(&mut self, id: &NoteId) -> Result<(), SyncError> {
        let note = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        self.session.select(&note);
        Ok(())
    }

    pub fn change_title(&mut self, title: impl Into<String>) {
        self.session.change_title(title);
    }

    pub fn change_content(&mut self, content: impl Into<String>) {
        self.session.change_content(content);
    }

    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    /// Submits the form as a create or update.
    ///
    /// Blank drafts are rejected and leave the session untouched.
    pub fn submit(&mut self) -> Result<WriteTicket, SyncError> {
        if !self.session.draft().is_complete() {
            return Err(SyncError::EmptyDraft);
        }
        match self.session.submit() {
            SubmitIntent::Create(draft) => Ok(self.spawn_create(draft)),
            SubmitIntent::Update { id, draft } => self.update(&id, draft.title, draft.content),
        }
    }

    /// Sends a create; the note appears only once the remote confirms it.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> WriteTicket {
        self.spawn_create(Draft::new(title, content))
    }

    /// Publishes the updated note and sends the update.
    pub fn update(
        &mut self,
        id: &NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<WriteTicket, SyncError> {
        let pending = self.store.begin_update(id, title, content)?;
        if self.session.selected() == Some(id) {
            self.session.cancel();
        }
        Ok(self.spawn_write(pending))
    }

    /// Removes the note locally and sends the delete.
    pub fn delete_note(&mut self, id: &NoteId) -> Result<WriteTicket, SyncError> {
        let pending = self.store.begin_delete(id)?;
        Ok(self.spawn_write(pending))
    }

    /// Waits for the next remote write and applies it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<WriteOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Applies one already-finished remote write, if any.
    pub fn try_next_outcome(&mut self) -> Option<WriteOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.try_recv().ok()?;
        Some(self.apply(completion))
    }

    /// Waits for every in-flight write and returns outcomes in arrival order.
    pub async fn settle_all(&mut self) -> Vec<WriteOutcome> {
        let mut outcomes = Vec::with_capacity(self.in_flight);
        while let Some(outcome) = self.next_outcome().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn issue_ticket(&mut self) -> WriteTicket {
        let ticket = WriteTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;
        ticket
    }

    fn spawn_create(&mut self, draft: Draft) -> WriteTicket {
        let ticket = self.issue_ticket();
        let client = Arc::clone(&self.client);
        let tx = self.completions_tx.clone();
        let request = draft.clone();
        let call = tokio::spawn(async move { client.create(&request).await });
        tokio::spawn(async move {
            let result = call.await.unwrap_or_else(|err| Err(aborted(ticket, err)));
            let _ = tx.send(Completion::Create {
                ticket,
                draft,
                result,
            });
        });
        ticket
    }

    fn spawn_write(&mut self, pending: PendingWrite) -> WriteTicket {
        let ticket = self.issue_ticket();
        let client = Arc::clone(&self.client);
        let tx = self.completions_tx.clone();
        let request = pending.clone();
        let call = tokio::spawn(async move {
            // Deletes carry no written value.
            match request.written() {
                Some(note) => client.update(note).await,
                None => client.delete(request.id()).await,
            }
        });
        tokio::spawn(async move {
            let result = call.await.unwrap_or_else(|err| Err(aborted(ticket, err)));
            let _ = tx.send(Completion::Write {
                ticket,
                pending,
                result,
            });
        });
        ticket
    }

    fn apply(&mut self, completion: Completion) -> WriteOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Create {
                ticket,
                result: Ok(note),
                ..
            } => {
                info!(
                    "event=note_create module=controller status=ok ticket={ticket} id={}",
                    note.id
                );
                self.store.commit_created(note.clone());
                WriteOutcome::Created { ticket, note }
            }
            Completion::Create {
                ticket,
                draft,
                result: Err(error),
            } => {
                let restored = self.session.restore_drafts(draft.clone());
                error!(
                    "event=note_create module=controller status=error ticket={ticket} drafts_restored={restored} error={error}"
                );
                WriteOutcome::CreateFailed {
                    ticket,
                    draft,
                    error,
                }
            }
            Completion::Write {
                ticket,
                pending,
                result: Ok(()),
            } => {
                let kind = pending.kind();
                let id = pending.id().clone();
                self.store.confirm(pending);
                info!(
                    "event=note_{kind} module=controller status=ok ticket={ticket} id={id}"
                );
                WriteOutcome::Confirmed { ticket, kind, id }
            }
            Completion::Write {
                ticket,
                pending,
                result: Err(error),
            } => {
                let kind = pending.kind();
                let id = pending.id().clone();
                match self.store.reject(pending) {
                    Settlement::Reverted => {
                        error!(
                            "event=note_{kind} module=controller status=reverted ticket={ticket} id={id} error={error}"
                        );
                        WriteOutcome::Reverted {
                            ticket,
                            kind,
                            id,
                            error,
                        }
                    }
                    Settlement::Superseded | Settlement::Confirmed => {
                        warn!(
                            "event=note_{kind} module=controller status=superseded ticket={ticket} id={id} error={error}"
                        );
                        WriteOutcome::Superseded {
                            ticket,
                            kind,
                            id,
                            error,
                        }
                    }
                }
            }
        }
    }
}

/// Maps a panicked or cancelled remote call to a transport failure.
fn aborted(ticket: WriteTicket, err: JoinError) -> RemoteWriteError {
    error!("event=remote_call module=controller status=aborted ticket={ticket} error={err}");
    RemoteWriteError::Transport(format!("remote call aborted: {err}"))
}
