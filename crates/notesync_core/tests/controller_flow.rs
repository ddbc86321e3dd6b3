mod support;

use async_trait::async_trait;
use notesync_core::{
    Draft, FetchError, Intent, Note, NoteController, NoteId, RemoteNoteClient, RemoteWriteError,
    SyncError, WriteKind, WriteOutcome,
};
use std::collections::HashSet;
use std::sync::Arc;
use support::{note, rejected, Call, ScriptedClient};

async fn let_tasks_run() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn loaded(notes: Vec<Note>) -> (Arc<ScriptedClient>, NoteController) {
    let client = Arc::new(ScriptedClient::new());
    client.set_listing(notes);
    let mut controller = NoteController::new(client.clone());
    controller.load().await.unwrap();
    (client, controller)
}

#[tokio::test]
async fn create_is_not_shown_before_remote_confirms() {
    let (client, mut controller) = loaded(Vec::new()).await;
    let release = client.gate_create("T", Ok(note(7, "T", "C")));

    let ticket = controller.create("T", "C");
    let_tasks_run().await;

    assert!(controller.notes().is_empty());
    assert!(controller.try_next_outcome().is_none());
    assert_eq!(controller.pending_writes(), 1);

    release.send(()).unwrap();
    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(
        outcome,
        WriteOutcome::Created {
            ticket,
            note: note(7, "T", "C")
        }
    );
    assert_eq!(controller.notes().to_vec(), vec![note(7, "T", "C")]);
    assert_eq!(controller.pending_writes(), 0);
}

#[tokio::test]
async fn failed_create_leaves_collection_unchanged_and_gives_drafts_back() {
    let (_client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    controller.change_title("T");
    controller.change_content("C");

    let ticket = controller.submit().unwrap();
    assert_eq!(controller.session().title(), "");

    let outcome = controller.next_outcome().await.unwrap();
    assert!(matches!(
        outcome,
        WriteOutcome::CreateFailed { ticket: t, ref draft, .. } if t == ticket && *draft == Draft::new("T", "C")
    ));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "A", "x")]);
    assert_eq!(controller.session().title(), "T");
    assert_eq!(controller.session().content(), "C");
}

#[tokio::test]
async fn update_is_optimistic_and_fully_reverted_on_failure() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    let before = controller.notes();
    let release = client.gate_update(1, "B", Err(rejected()));

    let ticket = controller.update(&NoteId::Number(1), "B", "y").unwrap();
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "y")]);

    let_tasks_run().await;
    assert!(controller.try_next_outcome().is_none());
    assert_eq!(client.calls().last(), Some(&Call::Update(note(1, "B", "y"))));

    release.send(()).unwrap();
    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(
        outcome,
        WriteOutcome::Reverted {
            ticket,
            kind: WriteKind::Update,
            id: NoteId::Number(1),
            error: rejected(),
        }
    );
    assert_eq!(controller.notes().to_vec(), before.to_vec());
}

#[tokio::test]
async fn delete_is_optimistic_and_reverts_in_original_order() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x"), note(2, "B", "y")]).await;
    client.script_delete(1, Err(RemoteWriteError::Transport("connection refused".into())));

    controller.delete_note(&NoteId::Number(1)).unwrap();
    assert_eq!(controller.notes().to_vec(), vec![note(2, "B", "y")]);

    let outcome = controller.next_outcome().await.unwrap();
    assert!(matches!(outcome, WriteOutcome::Reverted { kind: WriteKind::Delete, .. }));
    assert_eq!(
        controller.notes().to_vec(),
        vec![note(1, "A", "x"), note(2, "B", "y")]
    );
}

#[tokio::test]
async fn confirmed_delete_stays_removed() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x"), note(2, "B", "y")]).await;

    let ticket = controller.delete_note(&NoteId::Number(2)).unwrap();
    let outcomes = controller.settle_all().await;

    assert_eq!(
        outcomes,
        vec![WriteOutcome::Confirmed {
            ticket,
            kind: WriteKind::Delete,
            id: NoteId::Number(2),
        }]
    );
    assert_eq!(controller.notes().to_vec(), vec![note(1, "A", "x")]);
    assert!(client.calls().contains(&Call::Delete(NoteId::Number(2))));
}

#[tokio::test]
async fn repeated_loads_of_unchanged_remote_are_element_wise_equal() {
    let (_client, mut controller) = loaded(vec![note(2, "B", "y"), note(1, "A", "x")]).await;
    let first = controller.notes();

    controller.load().await.unwrap();
    let second = controller.notes();

    assert_eq!(first.to_vec(), second.to_vec());
}

#[tokio::test]
async fn failed_load_keeps_previous_state() {
    let client = Arc::new(ScriptedClient::new());
    client.fail_listing(FetchError::Transport("unreachable".into()));
    let mut controller = NoteController::new(client.clone());

    let err = controller.load().await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch(FetchError::Transport(_))));
    assert!(controller.notes().is_empty());

    client.set_listing(vec![note(1, "A", "x")]);
    controller.load().await.unwrap();
    client.fail_listing(FetchError::Status(503));

    let err = controller.load().await.unwrap_err();
    assert_eq!(err, SyncError::Fetch(FetchError::Status(503)));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "A", "x")]);
}

#[tokio::test]
async fn end_to_end_create_then_failed_update_keeps_confirmed_content() {
    let (client, mut controller) = loaded(Vec::new()).await;
    client.script_create("T", Ok(note(7, "T", "C")));

    controller.create("T", "C");
    controller.settle_all().await;
    assert_eq!(controller.notes().to_vec(), vec![note(7, "T", "C")]);

    client.script_update(7, "T2", Err(rejected()));
    controller.update(&NoteId::Number(7), "T2", "C2").unwrap();
    assert_eq!(controller.notes().to_vec(), vec![note(7, "T2", "C2")]);

    controller.settle_all().await;
    assert_eq!(controller.notes().to_vec(), vec![note(7, "T", "C")]);
}

#[tokio::test]
async fn created_notes_never_share_an_id() {
    let (client, mut controller) = loaded(Vec::new()).await;
    client.script_create("one", Ok(note(1, "one", "a")));
    client.script_create("two", Ok(note(2, "two", "b")));
    client.script_create("dup", Ok(note(1, "dup", "c")));

    controller.create("one", "a");
    controller.create("two", "b");
    controller.create("dup", "c");
    let outcomes = controller.settle_all().await;
    assert_eq!(outcomes.len(), 3);

    let notes = controller.notes();
    let ids: HashSet<NoteId> = notes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids.len(), notes.len());
    assert_eq!(notes.len(), 2);
}

#[tokio::test]
async fn stale_failure_does_not_revert_newer_edit_of_same_note() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    let release = client.gate_update(1, "B", Err(rejected()));

    let first = controller.update(&NoteId::Number(1), "B", "y").unwrap();
    let second = controller.update(&NoteId::Number(1), "C", "z").unwrap();

    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket(), second);
    assert!(matches!(outcome, WriteOutcome::Confirmed { .. }));

    release.send(()).unwrap();
    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket(), first);
    assert!(matches!(outcome, WriteOutcome::Superseded { .. }));
    assert_eq!(outcome.error(), Some(&rejected()));

    assert_eq!(controller.notes().to_vec(), vec![note(1, "C", "z")]);
}

#[tokio::test]
async fn newer_failed_edit_falls_back_to_older_edit_that_later_confirms() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    let release = client.gate_update(1, "B", Ok(()));
    client.script_update(1, "C", Err(rejected()));

    let first = controller.update(&NoteId::Number(1), "B", "y").unwrap();
    let second = controller.update(&NoteId::Number(1), "C", "z").unwrap();

    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket(), second);
    assert!(matches!(outcome, WriteOutcome::Reverted { .. }));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "y")]);

    release.send(()).unwrap();
    let outcome = controller.next_outcome().await.unwrap();
    assert_eq!(outcome.ticket(), first);
    assert!(matches!(outcome, WriteOutcome::Confirmed { .. }));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "y")]);
    assert_eq!(controller.pending_writes(), 0);
}

#[tokio::test]
async fn failed_delete_after_pending_update_keeps_the_update() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    let release = client.gate_update(1, "B", Ok(()));
    client.script_delete(1, Err(rejected()));

    controller.update(&NoteId::Number(1), "B", "y").unwrap();
    controller.delete_note(&NoteId::Number(1)).unwrap();
    assert!(controller.notes().is_empty());

    let outcome = controller.next_outcome().await.unwrap();
    assert!(matches!(outcome, WriteOutcome::Reverted { kind: WriteKind::Delete, .. }));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "y")]);

    release.send(()).unwrap();
    controller.settle_all().await;
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "y")]);
}

/// Client whose writes panic mid-call.
struct PanickingClient;

#[async_trait]
impl RemoteNoteClient for PanickingClient {
    async fn list(&self) -> Result<Vec<Note>, FetchError> {
        Ok(vec![note(1, "A", "x")])
    }

    async fn create(&self, _draft: &Draft) -> Result<Note, RemoteWriteError> {
        panic!("create blew up");
    }

    async fn update(&self, _note: &Note) -> Result<(), RemoteWriteError> {
        panic!("update blew up");
    }

    async fn delete(&self, _id: &NoteId) -> Result<(), RemoteWriteError> {
        panic!("delete blew up");
    }
}

#[tokio::test]
async fn panicking_remote_call_still_settles_and_reverts() {
    let mut controller = NoteController::new(Arc::new(PanickingClient));
    controller.load().await.unwrap();

    controller.update(&NoteId::Number(1), "B", "y").unwrap();
    controller.create("T", "C");
    let outcomes = controller.settle_all().await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|outcome| matches!(outcome.error(), Some(RemoteWriteError::Transport(_)))));
    assert_eq!(controller.notes().to_vec(), vec![note(1, "A", "x")]);
    assert_eq!(controller.pending_writes(), 0);
}

#[tokio::test]
async fn submit_while_editing_updates_and_clears_session_immediately() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;

    controller.select(&NoteId::Number(1)).unwrap();
    assert_eq!(controller.session().title(), "A");
    controller.change_title("B");

    controller.submit().unwrap();
    assert!(!controller.session().is_editing());
    assert_eq!(controller.session().title(), "");
    assert_eq!(controller.notes().to_vec(), vec![note(1, "B", "x")]);

    let outcomes = controller.settle_all().await;
    assert!(matches!(outcomes[..], [WriteOutcome::Confirmed { kind: WriteKind::Update, .. }]));
    assert!(client.calls().contains(&Call::Update(note(1, "B", "x"))));
}

#[tokio::test]
async fn submit_rejects_blank_drafts_without_touching_session() {
    let (client, mut controller) = loaded(Vec::new()).await;
    controller.change_title("   ");
    controller.change_content("body");

    assert_eq!(controller.submit(), Err(SyncError::EmptyDraft));
    assert_eq!(controller.session().content(), "body");
    assert_eq!(controller.pending_writes(), 0);
    assert_eq!(client.calls(), vec![Call::List]);
}

#[tokio::test]
async fn dispatch_surface_routes_intents() {
    let (_client, mut controller) = loaded(vec![note(1, "A", "x")]).await;

    assert_eq!(
        controller.dispatch(Intent::Select(NoteId::Number(9))),
        Err(SyncError::NotFound(NoteId::Number(9)))
    );
    assert_eq!(controller.dispatch(Intent::Select(NoteId::Number(1))), Ok(None));
    assert_eq!(
        controller.dispatch(Intent::ChangeContent("edited".into())),
        Ok(None)
    );
    assert_eq!(controller.session().content(), "edited");
    assert_eq!(controller.dispatch(Intent::Cancel), Ok(None));
    assert!(!controller.session().is_editing());

    let ticket = controller.dispatch(Intent::Delete(NoteId::Number(1))).unwrap();
    assert!(ticket.is_some());
    assert!(controller.notes().is_empty());
    assert_eq!(
        controller.dispatch(Intent::Delete(NoteId::Number(1))),
        Err(SyncError::NotFound(NoteId::Number(1)))
    );
    controller.settle_all().await;
}

#[tokio::test]
async fn subscribers_observe_optimistic_change_and_revert() {
    let (client, mut controller) = loaded(vec![note(1, "A", "x")]).await;
    let mut rx = controller.subscribe();
    client.script_update(1, "B", Err(rejected()));

    controller.update(&NoteId::Number(1), "B", "y").unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update()[0].title, "B");

    controller.settle_all().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update()[0].title, "A");
}
