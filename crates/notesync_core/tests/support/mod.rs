//! Scripted in-memory `RemoteNoteClient` for controller tests.
//!
//! Responses are keyed by operation and payload so that results do not
//! depend on task scheduling order. Gated responses wait until the test
//! releases them.

#![allow(dead_code)]

use async_trait::async_trait;
use notesync_core::{Draft, FetchError, Note, NoteId, RemoteNoteClient, RemoteWriteError};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(Draft),
    Update(Note),
    Delete(NoteId),
}

struct Step<T> {
    result: T,
    gate: Option<oneshot::Receiver<()>>,
}

pub struct ScriptedClient {
    listing: Mutex<Result<Vec<Note>, FetchError>>,
    creates: Mutex<HashMap<String, Step<Result<Note, RemoteWriteError>>>>,
    writes: Mutex<HashMap<String, Step<Result<(), RemoteWriteError>>>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self {
            listing: Mutex::new(Ok(Vec::new())),
            creates: Mutex::new(HashMap::new()),
            writes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

pub fn note(id: i64, title: &str, content: &str) -> Note {
    Note::new(NoteId::Number(id), title, content)
}

pub fn rejected() -> RemoteWriteError {
    RemoteWriteError::Rejected { status: 500 }
}

fn create_key(title: &str) -> String {
    format!("create:{title}")
}

fn update_key(id: &NoteId, title: &str) -> String {
    format!("update:{id}:{title}")
}

fn delete_key(id: &NoteId) -> String {
    format!("delete:{id}")
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listing(&self, notes: Vec<Note>) {
        *self.listing.lock().unwrap() = Ok(notes);
    }

    pub fn fail_listing(&self, error: FetchError) {
        *self.listing.lock().unwrap() = Err(error);
    }

    pub fn script_create(&self, title: &str, result: Result<Note, RemoteWriteError>) {
        self.creates.lock().unwrap().insert(
            create_key(title),
            Step { result, gate: None },
        );
    }

    pub fn gate_create(
        &self,
        title: &str,
        result: Result<Note, RemoteWriteError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.creates.lock().unwrap().insert(
            create_key(title),
            Step {
                result,
                gate: Some(rx),
            },
        );
        tx
    }

    pub fn script_update(&self, id: i64, title: &str, result: Result<(), RemoteWriteError>) {
        self.writes.lock().unwrap().insert(
            update_key(&NoteId::Number(id), title),
            Step { result, gate: None },
        );
    }

    pub fn gate_update(
        &self,
        id: i64,
        title: &str,
        result: Result<(), RemoteWriteError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.writes.lock().unwrap().insert(
            update_key(&NoteId::Number(id), title),
            Step {
                result,
                gate: Some(rx),
            },
        );
        tx
    }

    pub fn script_delete(&self, id: i64, result: Result<(), RemoteWriteError>) {
        self.writes.lock().unwrap().insert(
            delete_key(&NoteId::Number(id)),
            Step { result, gate: None },
        );
    }

    pub fn gate_delete(&self, id: i64, result: Result<(), RemoteWriteError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.writes.lock().unwrap().insert(
            delete_key(&NoteId::Number(id)),
            Step {
                result,
                gate: Some(rx),
            },
        );
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn take_write(&self, key: String) -> Result<(), RemoteWriteError> {
        let step = self.writes.lock().unwrap().remove(&key);
        match step {
            Some(step) => {
                if let Some(gate) = step.gate {
                    let _ = gate.await;
                }
                step.result
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteNoteClient for ScriptedClient {
    async fn list(&self) -> Result<Vec<Note>, FetchError> {
        self.record(Call::List);
        self.listing.lock().unwrap().clone()
    }

    async fn create(&self, draft: &Draft) -> Result<Note, RemoteWriteError> {
        self.record(Call::Create(draft.clone()));
        let step = self.creates.lock().unwrap().remove(&create_key(&draft.title));
        match step {
            Some(step) => {
                if let Some(gate) = step.gate {
                    let _ = gate.await;
                }
                step.result
            }
            None => Err(RemoteWriteError::Transport(format!(
                "unscripted create `{}`",
                draft.title
            ))),
        }
    }

    async fn update(&self, note: &Note) -> Result<(), RemoteWriteError> {
        self.record(Call::Update(note.clone()));
        self.take_write(update_key(&note.id, &note.title)).await
    }

    async fn delete(&self, id: &NoteId) -> Result<(), RemoteWriteError> {
        self.record(Call::Delete(id.clone()));
        self.take_write(delete_key(id)).await
    }
}
