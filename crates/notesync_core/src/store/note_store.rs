//! Note collection store.
//!
//! # Responsibility
//! - Hold the ordered note collection and publish snapshots to subscribers.
//! - Start optimistic updates/deletes and settle them once the remote answers.
//! - Track per-id write sequences so that stale reverts are dropped.
//!
//! # Invariants
//! - No two notes in a snapshot share an id.
//! - Order is presentation order: newest created first.
//! - Every write gets a sequence number greater than all earlier writes.
//! - The entry shown for an id with unsettled writes is the newest unsettled
//!   write newer than its last confirmation, or else its last confirmed value.
//! - A failed write is reverted only if no newer write on its id has started
//!   or confirmed and no full listing has replaced the collection since.
//! - Reverts touch only the failed write's id.

use crate::model::note::{Note, NoteId};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable whole-collection value handed to readers.
pub type NoteSnapshot = Arc<[Note]>;

/// Local store error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Target id is not in the current collection.
    NotFound(NoteId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
        }
    }
}

impl Error for StoreError {}

/// Kind of optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Update,
    Delete,
}

impl Display for WriteKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Optimistic write that has been published locally and awaits the remote.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    kind: WriteKind,
    id: NoteId,
    seq: u64,
    generation: u64,
    backup: NoteSnapshot,
    published: NoteSnapshot,
    written: Option<Note>,
}

impl PendingWrite {
    pub fn kind(&self) -> WriteKind {
        self.kind
    }

    pub fn id(&self) -> &NoteId {
        &self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Snapshot captured right before the optimistic change.
    pub fn backup(&self) -> &NoteSnapshot {
        &self.backup
    }

    /// New note value for updates, `None` for deletes.
    pub fn written(&self) -> Option<&Note> {
        self.written.as_ref()
    }
}

/// Result of settling a pending write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Remote accepted the write; local state already matches.
    Confirmed,
    /// Remote rejected the write; the id was restored.
    Reverted,
    /// Remote rejected the write, but a newer write or listing owns the id now.
    Superseded,
}

#[derive(Debug)]
struct InFlight {
    /// Unsettled writes by sequence; `None` is a delete.
    outstanding: BTreeMap<u64, Option<Note>>,
    /// Last confirmed value for the id; `None` means absent.
    base: Option<Note>,
    base_seq: u64,
}

impl InFlight {
    fn visible(&self) -> Option<&Note> {
        match self.outstanding.range(self.base_seq + 1..).next_back() {
            Some((_, written)) => written.as_ref(),
            None => self.base.as_ref(),
        }
    }

    fn is_newest(&self, seq: u64) -> bool {
        seq > self.base_seq
            && self
                .outstanding
                .keys()
                .next_back()
                .map_or(true, |latest| *latest < seq)
    }
}

/// Single-owner note store.
///
/// All methods run on the owner; remote calls happen elsewhere and come back
/// through `settle` (or `confirm`/`reject`).
#[derive(Debug)]
pub struct NoteStore {
    current: NoteSnapshot,
    publisher: watch::Sender<NoteSnapshot>,
    in_flight: HashMap<NoteId, InFlight>,
    next_seq: u64,
    generation: u64,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore {
    pub fn new() -> Self {
        let current: NoteSnapshot = Arc::from(Vec::new());
        let (publisher, _) = watch::channel(current.clone());
        Self {
            current,
            publisher,
            in_flight: HashMap::new(),
            next_seq: 1,
            generation: 0,
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> NoteSnapshot {
        self.current.clone()
    }

    /// Subscribes to snapshot changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<NoteSnapshot> {
        self.publisher.subscribe()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.current.iter().find(|note| &note.id == id)
    }

    /// Number of writes started but not yet settled.
    pub fn pending_writes(&self) -> usize {
        self.in_flight
            .values()
            .map(|entry| entry.outstanding.len())
            .sum()
    }

    /// Number of unsettled writes on `id`.
    pub fn pending_for(&self, id: &NoteId) -> usize {
        self.in_flight
            .get(id)
            .map_or(0, |entry| entry.outstanding.len())
    }

    /// Replaces the collection with a confirmed full listing.
    ///
    /// Duplicate ids keep their first occurrence. Writes still in flight can
    /// no longer revert: the listing is newer confirmed state.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(notes.len());
        for note in notes {
            if seen.insert(note.id.clone()) {
                unique.push(note);
            } else {
                warn!(
                    "event=store_replace_all module=store status=duplicate_dropped id={}",
                    note.id
                );
            }
        }

        self.generation += 1;
        self.in_flight.clear();
        debug!(
            "event=store_replace_all module=store status=ok count={} generation={}",
            unique.len(),
            self.generation
        );
        self.publish(Arc::from(unique));
    }

    /// Prepends a remote-confirmed created note.
    ///
    /// An existing entry with the same id is dropped so ids stay unique.
    pub fn commit_created(&mut self, note: Note) {
        let mut next = Vec::with_capacity(self.current.len() + 1);
        next.push(note.clone());
        let before = self.current.len();
        next.extend(
            self.current
                .iter()
                .filter(|existing| existing.id != note.id)
                .cloned(),
        );
        if next.len() == before {
            warn!(
                "event=store_create module=store status=replaced_existing id={}",
                note.id
            );
        }
        debug!("event=store_create module=store status=ok id={}", note.id);
        self.publish(Arc::from(next));
    }

    /// Publishes `{id, title, content}` in place of the current note.
    pub fn begin_update(
        &mut self,
        id: &NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<PendingWrite, StoreError> {
        let index = self.position(id)?;
        let backup = self.current.clone();
        let updated = backup[index].with_fields(title, content);

        let mut next = backup.to_vec();
        next[index] = updated.clone();
        let published: NoteSnapshot = Arc::from(next);

        let pending = self.track(
            WriteKind::Update,
            backup[index].clone(),
            Some(updated),
            backup,
            published.clone(),
        );
        self.publish(published);
        Ok(pending)
    }

    /// Publishes the collection without `id`.
    pub fn begin_delete(&mut self, id: &NoteId) -> Result<PendingWrite, StoreError> {
        let index = self.position(id)?;
        let backup = self.current.clone();

        let mut next = backup.to_vec();
        next.remove(index);
        let published: NoteSnapshot = Arc::from(next);

        let pending = self.track(
            WriteKind::Delete,
            backup[index].clone(),
            None,
            backup,
            published.clone(),
        );
        self.publish(published);
        Ok(pending)
    }

    /// Settles a write with the remote's answer.
    pub fn settle<E>(&mut self, pending: PendingWrite, result: &Result<(), E>) -> Settlement {
        match result {
            Ok(()) => self.confirm(pending),
            Err(_) => self.reject(pending),
        }
    }

    /// Settles a write the remote accepted.
    pub fn confirm(&mut self, pending: PendingWrite) -> Settlement {
        if pending.generation != self.generation {
            return Settlement::Confirmed;
        }
        if let Some(entry) = self.in_flight.get_mut(&pending.id) {
            entry.outstanding.remove(&pending.seq);
            if pending.seq > entry.base_seq {
                entry.base = pending.written.clone();
                entry.base_seq = pending.seq;
            }
            if entry.outstanding.is_empty() {
                self.in_flight.remove(&pending.id);
            }
        }
        debug!(
            "event=store_{} module=store status=confirmed id={} seq={}",
            pending.kind, pending.id, pending.seq
        );
        Settlement::Confirmed
    }

    /// Settles a write the remote rejected or never received.
    ///
    /// The id falls back to the newest write still in flight on it, or to
    /// its last confirmed value when none is left.
    pub fn reject(&mut self, pending: PendingWrite) -> Settlement {
        if pending.generation != self.generation {
            debug!(
                "event=store_{} module=store status=superseded_by_listing id={} seq={}",
                pending.kind, pending.id, pending.seq
            );
            return Settlement::Superseded;
        }

        let Some(entry) = self.in_flight.get_mut(&pending.id) else {
            return Settlement::Superseded;
        };
        entry.outstanding.remove(&pending.seq);
        let newest = entry.is_newest(pending.seq);
        let target = entry.visible().cloned();
        if entry.outstanding.is_empty() {
            self.in_flight.remove(&pending.id);
        }

        if !newest {
            debug!(
                "event=store_{} module=store status=superseded id={} seq={}",
                pending.kind, pending.id, pending.seq
            );
            return Settlement::Superseded;
        }

        let untouched = Arc::ptr_eq(&self.current, &pending.published)
            && pending
                .backup
                .iter()
                .find(|note| note.id == pending.id)
                == target.as_ref();
        let restored = if untouched {
            pending.backup.clone()
        } else {
            restore_entry(&self.current, &pending.id, target, &pending.backup)
        };

        warn!(
            "event=store_{} module=store status=reverted id={} seq={}",
            pending.kind, pending.id, pending.seq
        );
        self.publish(restored);
        Settlement::Reverted
    }

    fn position(&self, id: &NoteId) -> Result<usize, StoreError> {
        self.current
            .iter()
            .position(|note| &note.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn track(
        &mut self,
        kind: WriteKind,
        prior: Note,
        written: Option<Note>,
        backup: NoteSnapshot,
        published: NoteSnapshot,
    ) -> PendingWrite {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = self
            .in_flight
            .entry(prior.id.clone())
            .or_insert_with(|| InFlight {
                outstanding: BTreeMap::new(),
                base: Some(prior.clone()),
                base_seq: 0,
            });
        entry.outstanding.insert(seq, written.clone());

        debug!(
            "event=store_{} module=store status=optimistic id={} seq={}",
            kind, prior.id, seq
        );
        PendingWrite {
            kind,
            id: prior.id,
            seq,
            generation: self.generation,
            backup,
            published,
            written,
        }
    }

    fn publish(&mut self, next: NoteSnapshot) {
        self.current = next.clone();
        self.publisher.send_replace(next);
    }
}

/// Sets the entry for `id` in `current` to `target`, leaving other ids as they are.
///
/// A missing entry is reinserted before the first of its `backup` successors
/// that still exists, or at the end when none survives.
fn restore_entry(
    current: &NoteSnapshot,
    id: &NoteId,
    target: Option<Note>,
    backup: &NoteSnapshot,
) -> NoteSnapshot {
    let mut next = current.to_vec();
    let existing = next.iter().position(|note| &note.id == id);

    match (existing, target) {
        (Some(index), Some(note)) => next[index] = note,
        (Some(index), None) => {
            next.remove(index);
        }
        (None, Some(note)) => {
            let index = reinsert_index(&next, id, backup);
            next.insert(index, note);
        }
        (None, None) => {}
    }

    Arc::from(next)
}

fn reinsert_index(next: &[Note], id: &NoteId, backup: &NoteSnapshot) -> usize {
    let Some(origin) = backup.iter().position(|note| &note.id == id) else {
        return 0;
    };
    backup[origin + 1..]
        .iter()
        .find_map(|successor| next.iter().position(|note| note.id == successor.id))
        .unwrap_or(next.len())
}
