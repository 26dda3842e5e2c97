mod common;

use common::{event, TestDependencies};
use notes::cache::FORCE_EXCEPTION;
use notes::interactors::{RESTORE_NOTE_FAILED, RESTORE_NOTE_SUCCESS};
use notes::{NoteCacheDataSource, NoteListStateEvent, NoteNetworkDataSource};
use relay::testing::capture;
use relay::{MessageType, CACHE_ERROR_UNKNOWN};

#[tokio::test]
async fn restore_success_updates_cache_and_network() {
    let deps = TestDependencies::seeded(0).await;
    let interactors = deps.interactors();
    let note = deps.factory.create_single_note(None, "restored", "body");
    deps.network.insert_deleted_note(&note).await.unwrap();
    let ev = event(NoteListStateEvent::RestoreDeletedNote { note: note.clone() });

    let target = note.clone();
    let states = capture(|publisher| async move {
        interactors
            .restore_deleted_note
            .restore_deleted_note(&target, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].message_text(), Some(RESTORE_NOTE_SUCCESS));
    let pending = states[0]
        .payload()
        .and_then(|state| state.note_pending_delete.clone())
        .unwrap();
    assert_eq!(pending.note, note);

    assert_eq!(deps.cache.search_note_by_id(&note.id).await.unwrap(), Some(note.clone()));
    assert_eq!(deps.network.search_note(&note).await.unwrap(), Some(note.clone()));
    assert!(!deps.network.get_deleted_notes().await.unwrap().contains(&note));
}

#[tokio::test]
async fn restore_conflict_leaves_everything_unchanged() {
    let deps = TestDependencies::seeded(0).await;
    let interactors = deps.interactors();
    let note = deps.factory.create_single_note(None, "restored", "body");
    deps.network.insert_deleted_note(&note).await.unwrap();

    // Already in the cache: the insert is ignored
    deps.cache.insert_note(note.clone()).await.unwrap();
    let ev = event(NoteListStateEvent::RestoreDeletedNote { note: note.clone() });

    let target = note.clone();
    let states = capture(|publisher| async move {
        interactors
            .restore_deleted_note
            .restore_deleted_note(&target, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].message_text(), Some(RESTORE_NOTE_FAILED));
    assert_eq!(
        states[0].state_message().unwrap().response.message_type,
        MessageType::Error
    );
    assert!(states[0].payload().is_none());

    assert_eq!(deps.network.search_note(&note).await.unwrap(), None);
    assert!(deps.network.get_deleted_notes().await.unwrap().contains(&note));
}

#[tokio::test]
async fn restore_exception_reports_generic_error() {
    let deps = TestDependencies::seeded(0).await;
    let interactors = deps.interactors();
    let note = deps
        .factory
        .create_single_note(Some(FORCE_EXCEPTION.into()), "restored", "body");
    let ev = event(NoteListStateEvent::RestoreDeletedNote { note: note.clone() });

    let target = note.clone();
    let states = capture(|publisher| async move {
        interactors
            .restore_deleted_note
            .restore_deleted_note(&target, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert!(states[0].message_text().unwrap().contains(CACHE_ERROR_UNKNOWN));
    assert!(states[0]
        .message_text()
        .unwrap()
        .starts_with("Error restoring the deleted note."));
    assert_eq!(deps.cache.get_num_notes().await.unwrap(), 0);
}
