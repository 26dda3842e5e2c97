use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notes::{
    Config, InMemoryNoteCache, InMemoryNoteNetwork, NoteCacheDataSource, NoteFactory,
    NoteListInteractors, NoteListSession, NoteListStateEvent, NoteNetworkDataSource,
};
use relay::{Response, StateMessage, UiComponentType};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notes=debug,relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    // Seed collaborators
    let factory = NoteFactory::default();
    let cache = Arc::new(InMemoryNoteCache::new(config.page_size));
    let network = Arc::new(InMemoryNoteNetwork::new());
    let seed = factory.create_note_list(5);
    cache
        .insert_notes(seed.clone())
        .await
        .context("Failed to seed cache")?;
    network
        .insert_or_update_notes(&seed)
        .await
        .context("Failed to seed sync backend")?;

    let interactors =
        NoteListInteractors::new(cache, network.clone(), factory, config.timeouts());
    let session = NoteListSession::new(interactors, config.channel_config());
    session.setup().context("Failed to start session")?;

    session.set_state_event(NoteListStateEvent::GetNumNotesInCache);
    session.set_state_event(NoteListStateEvent::SearchNotes {
        query: String::new(),
        filter_and_order: String::new(),
        page: 1,
    });
    session.set_state_event(NoteListStateEvent::InsertNewNote {
        id: None,
        title: "Groceries".to_string(),
    });
    session.set_state_event(NoteListStateEvent::DeleteNote {
        note: seed[0].clone(),
    });
    session.set_state_event(NoteListStateEvent::CreateStateMessage {
        state_message: StateMessage::new(Response::success(
            "Demo finished queueing events",
            UiComponentType::Toast,
        )),
    });

    // Wait for every job to finish
    let mut waited = Duration::ZERO;
    while !session.channel().active_event_names().is_empty() && waited < config.network_timeout {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    let state = session.view_state();
    tracing::info!(
        notes_in_cache = ?state.num_notes_in_cache,
        listed = state.note_list.as_ref().map(Vec::len),
        new_note = ?state.new_note.as_ref().map(|n| &n.title),
        "Final view state"
    );

    while let Some(message) = session.channel().clear_state_message(0) {
        tracing::info!(
            kind = ?message.response.message_type,
            display = ?message.response.ui_component_type,
            "{}",
            message.text().unwrap_or_default()
        );
    }

    tracing::info!(backend_calls = network.calls().len(), "Sync backend activity");

    session.teardown();
    Ok(())
}
