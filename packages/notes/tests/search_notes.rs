mod common;

use std::time::Duration;

use common::{event, TestDependencies, PAGE_SIZE};
use notes::cache::{FORCE_EXCEPTION, ORDER_BY_ASC_TITLE};
use notes::interactors::{SEARCH_NOTES_NO_MATCHING_RESULTS, SEARCH_NOTES_SUCCESS};
use notes::{InMemoryNoteCache, NoteCacheDataSource, NoteListStateEvent};
use relay::testing::capture;
use relay::{MessageType, UiComponentType, CACHE_ERROR_TIMEOUT, CACHE_ERROR_UNKNOWN};

fn search(query: &str, filter_and_order: &str, page: i32) -> NoteListStateEvent {
    NoteListStateEvent::SearchNotes {
        query: query.to_string(),
        filter_and_order: filter_and_order.to_string(),
        page,
    }
}

#[tokio::test]
async fn blank_query_returns_first_page() {
    let deps = TestDependencies::seeded(25).await;
    let interactors = deps.interactors();
    let ev = event(search("", "", 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", "", 1, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].message_text(), Some(SEARCH_NOTES_SUCCESS));
    let response = &states[0].state_message().unwrap().response;
    assert_eq!(response.ui_component_type, UiComponentType::None);

    let view_state = states[0].payload().unwrap();
    assert_eq!(view_state.note_list.as_ref().unwrap().len(), PAGE_SIZE);
    assert_eq!(view_state.page, Some(1));
}

#[tokio::test]
async fn non_positive_page_is_treated_as_first() {
    let deps = TestDependencies::seeded(25).await;
    let interactors = deps.interactors();
    let ev = event(search("", "", -3));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", "", -3, ev, &publisher)
            .await;
    })
    .await;

    let view_state = states[0].payload().unwrap();
    assert_eq!(view_state.page, Some(1));
    assert_eq!(view_state.note_list.as_ref().unwrap().len(), PAGE_SIZE);
}

#[tokio::test]
async fn page_zero_is_treated_as_first() {
    let deps = TestDependencies::seeded(25).await;
    let interactors = deps.interactors();
    let ev = event(search("", "", 0));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", "", 0, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    let view_state = states[0].payload().unwrap();
    assert_eq!(view_state.page, Some(1));
    assert_eq!(view_state.note_list.as_ref().unwrap().len(), PAGE_SIZE);
}

#[tokio::test]
async fn no_match_is_a_success_with_toast() {
    let deps = TestDependencies::seeded(5).await;
    let interactors = deps.interactors();
    let ev = event(search("zzzz-no-such-note", "", 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("zzzz-no-such-note", "", 1, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].message_text(), Some(SEARCH_NOTES_NO_MATCHING_RESULTS));
    let response = &states[0].state_message().unwrap().response;
    assert_eq!(response.ui_component_type, UiComponentType::Toast);
    assert_eq!(response.message_type, MessageType::Success);
    assert_eq!(states[0].payload().unwrap().note_list, Some(Vec::new()));
}

#[tokio::test]
async fn ordering_is_applied() {
    let deps = TestDependencies::seeded(0).await;
    for title in ["delta", "alpha", "charlie", "bravo"] {
        deps.cache
            .insert_note(deps.factory.create_single_note(None, title, ""))
            .await
            .unwrap();
    }
    let interactors = deps.interactors();
    let ev = event(search("", ORDER_BY_ASC_TITLE, 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", ORDER_BY_ASC_TITLE, 1, ev, &publisher)
            .await;
    })
    .await;

    let titles: Vec<_> = states[0]
        .payload()
        .unwrap()
        .note_list
        .as_ref()
        .unwrap()
        .iter()
        .map(|n| n.title.clone())
        .collect();
    assert_eq!(titles, vec!["alpha", "bravo", "charlie", "delta"]);
}

#[tokio::test]
async fn invalid_ordering_surfaces_safe_message() {
    let deps = TestDependencies::seeded(3).await;
    let interactors = deps.interactors();
    let ev = event(search("", "sideways", 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", "sideways", 1, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(
        states[0].message_text(),
        Some("Error getting list of notes.\n\nReason: Unknown sort order: sideways")
    );
    assert!(states[0].payload().is_none());
}

#[tokio::test]
async fn cache_exception_reports_generic_error() {
    let deps = TestDependencies::seeded(3).await;
    let interactors = deps.interactors();
    let ev = event(search(FORCE_EXCEPTION, "", 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes(FORCE_EXCEPTION, "", 1, ev, &publisher)
            .await;
    })
    .await;

    assert!(states[0].message_text().unwrap().ends_with(CACHE_ERROR_UNKNOWN));
}

#[tokio::test]
async fn slow_cache_times_out() {
    let cache = InMemoryNoteCache::new(PAGE_SIZE).with_latency(Duration::from_millis(50));
    let mut deps = TestDependencies::build(cache, 0).await;
    deps.timeouts.cache = Duration::from_millis(5);
    let interactors = deps.interactors();
    let ev = event(search("", "", 1));

    let states = capture(|publisher| async move {
        interactors
            .search_notes
            .search_notes("", "", 1, ev, &publisher)
            .await;
    })
    .await;

    assert_eq!(states.len(), 1);
    assert!(states[0].message_text().unwrap().ends_with(CACHE_ERROR_TIMEOUT));
    assert_eq!(
        states[0].state_message().unwrap().response.message_type,
        MessageType::Error
    );
}
