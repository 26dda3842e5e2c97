//! Cloud sync backend.
//!
//! The backend keeps two collections: `notes` (live notes) and `deletes`
//! (tombstones kept so other devices can catch up). Documents are JSON with
//! real timestamps; [`NetworkMapper`] converts between them and cache [`Note`]s.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay::{Categorizable, ErrorCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::FORCE_EXCEPTION;
use crate::date_util::DateUtil;
use crate::model::Note;

pub const NOTES_COLLECTION: &str = "notes";
pub const DELETES_COLLECTION: &str = "deletes";

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("sync backend unavailable")]
    Unavailable,

    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("forced failure during {operation}")]
    Forced { operation: &'static str },
}

impl Categorizable for NetworkError {
    fn category(&self) -> ErrorCategory {
        match self {
            NetworkError::Unavailable => ErrorCategory::ExternalService,
            _ => ErrorCategory::Internal,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            NetworkError::Unavailable => "Sync service is unavailable".into(),
            _ => "Sync failure".into(),
        }
    }
}

/// A note as the sync backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDocument {
    pub id: String,
    pub title: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Converts between cache notes and backend documents.
#[derive(Debug, Clone, Default)]
pub struct NetworkMapper {
    date_util: DateUtil,
}

impl NetworkMapper {
    pub fn new(date_util: DateUtil) -> Self {
        Self { date_util }
    }

    pub fn to_document(&self, note: &Note) -> Result<NoteDocument, NetworkError> {
        let parse = |field: &str| {
            self.date_util
                .parse(field)
                .map_err(|e| NetworkError::Malformed {
                    id: note.id.clone(),
                    reason: e.to_string(),
                })
        };
        Ok(NoteDocument {
            id: note.id.clone(),
            title: note.title.clone(),
            body: note.body.clone(),
            updated_at: parse(&note.updated_at)?,
            created_at: parse(&note.created_at)?,
        })
    }

    pub fn from_document(&self, document: NoteDocument) -> Note {
        Note {
            id: document.id,
            title: document.title,
            body: document.body,
            updated_at: self.date_util.format(document.updated_at),
            created_at: self.date_util.format(document.created_at),
        }
    }
}

#[async_trait]
pub trait NoteNetworkDataSource: Send + Sync {
    async fn insert_or_update_note(&self, note: &Note) -> Result<(), NetworkError>;

    async fn delete_note(&self, primary_key: &str) -> Result<(), NetworkError>;

    async fn insert_deleted_note(&self, note: &Note) -> Result<(), NetworkError>;

    async fn insert_deleted_notes(&self, notes: &[Note]) -> Result<(), NetworkError>;

    async fn delete_deleted_note(&self, note: &Note) -> Result<(), NetworkError>;

    async fn get_deleted_notes(&self) -> Result<Vec<Note>, NetworkError>;

    /// Wipe the `notes` collection.
    async fn delete_all_notes(&self) -> Result<(), NetworkError>;

    async fn search_note(&self, note: &Note) -> Result<Option<Note>, NetworkError>;

    async fn get_all_notes(&self) -> Result<Vec<Note>, NetworkError>;

    async fn insert_or_update_notes(&self, notes: &[Note]) -> Result<(), NetworkError>;
}

/// Backend call, as recorded by [`InMemoryNoteNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCall {
    InsertOrUpdate(String),
    Delete(String),
    InsertDeleted(String),
    DeleteDeleted(String),
    GetDeleted,
    DeleteAll,
    Search(String),
    GetAll,
}

#[derive(Debug, Default)]
struct Collections {
    notes: BTreeMap<String, Value>,
    deletes: BTreeMap<String, Value>,
}

/// In-process sync backend. Records every call for assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteNetwork {
    collections: Arc<RwLock<Collections>>,
    calls: Arc<Mutex<Vec<NetworkCall>>>,
    offline: Arc<AtomicBool>,
    mapper: NetworkMapper,
    latency: Option<Duration>,
}

impl InMemoryNoteNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// While offline every call fails with [`NetworkError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<NetworkCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raw documents of `collection`, for inspection.
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        let collections = self.collections.read().await;
        let source = match collection {
            NOTES_COLLECTION => &collections.notes,
            DELETES_COLLECTION => &collections.deletes,
            _ => return Vec::new(),
        };
        source.values().cloned().collect()
    }

    async fn begin(&self, call: NetworkCall) -> Result<(), NetworkError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unavailable);
        }
        Ok(())
    }

    fn check_forced(operation: &'static str, id: &str) -> Result<(), NetworkError> {
        if id == FORCE_EXCEPTION {
            return Err(NetworkError::Forced { operation });
        }
        Ok(())
    }

    fn encode(&self, note: &Note) -> Result<Value, NetworkError> {
        Ok(serde_json::to_value(self.mapper.to_document(note)?)?)
    }

    fn decode(&self, value: &Value) -> Result<Note, NetworkError> {
        let document: NoteDocument = serde_json::from_value(value.clone())?;
        Ok(self.mapper.from_document(document))
    }

    fn decode_all(&self, values: &BTreeMap<String, Value>) -> Result<Vec<Note>, NetworkError> {
        values.values().map(|value| self.decode(value)).collect()
    }
}

#[async_trait]
impl NoteNetworkDataSource for InMemoryNoteNetwork {
    async fn insert_or_update_note(&self, note: &Note) -> Result<(), NetworkError> {
        self.begin(NetworkCall::InsertOrUpdate(note.id.clone())).await?;
        Self::check_forced("insert_or_update_note", &note.id)?;

        let document = self.encode(note)?;
        self.collections
            .write()
            .await
            .notes
            .insert(note.id.clone(), document);
        Ok(())
    }

    async fn delete_note(&self, primary_key: &str) -> Result<(), NetworkError> {
        self.begin(NetworkCall::Delete(primary_key.to_string())).await?;
        Self::check_forced("delete_note", primary_key)?;

        self.collections.write().await.notes.remove(primary_key);
        Ok(())
    }

    async fn insert_deleted_note(&self, note: &Note) -> Result<(), NetworkError> {
        self.begin(NetworkCall::InsertDeleted(note.id.clone())).await?;
        Self::check_forced("insert_deleted_note", &note.id)?;

        let document = self.encode(note)?;
        self.collections
            .write()
            .await
            .deletes
            .insert(note.id.clone(), document);
        Ok(())
    }

    async fn insert_deleted_notes(&self, notes: &[Note]) -> Result<(), NetworkError> {
        let mut documents = Vec::with_capacity(notes.len());
        for note in notes {
            self.begin(NetworkCall::InsertDeleted(note.id.clone())).await?;
            Self::check_forced("insert_deleted_notes", &note.id)?;
            documents.push((note.id.clone(), self.encode(note)?));
        }

        self.collections.write().await.deletes.extend(documents);
        Ok(())
    }

    async fn delete_deleted_note(&self, note: &Note) -> Result<(), NetworkError> {
        self.begin(NetworkCall::DeleteDeleted(note.id.clone())).await?;
        Self::check_forced("delete_deleted_note", &note.id)?;

        self.collections.write().await.deletes.remove(&note.id);
        Ok(())
    }

    async fn get_deleted_notes(&self) -> Result<Vec<Note>, NetworkError> {
        self.begin(NetworkCall::GetDeleted).await?;
        let collections = self.collections.read().await;
        self.decode_all(&collections.deletes)
    }

    async fn delete_all_notes(&self) -> Result<(), NetworkError> {
        self.begin(NetworkCall::DeleteAll).await?;
        self.collections.write().await.notes.clear();
        Ok(())
    }

    async fn search_note(&self, note: &Note) -> Result<Option<Note>, NetworkError> {
        self.begin(NetworkCall::Search(note.id.clone())).await?;
        Self::check_forced("search_note", &note.id)?;

        let collections = self.collections.read().await;
        collections
            .notes
            .get(&note.id)
            .map(|value| self.decode(value))
            .transpose()
    }

    async fn get_all_notes(&self) -> Result<Vec<Note>, NetworkError> {
        self.begin(NetworkCall::GetAll).await?;
        let collections = self.collections.read().await;
        self.decode_all(&collections.notes)
    }

    async fn insert_or_update_notes(&self, notes: &[Note]) -> Result<(), NetworkError> {
        let mut documents = Vec::with_capacity(notes.len());
        for note in notes {
            self.begin(NetworkCall::InsertOrUpdate(note.id.clone())).await?;
            Self::check_forced("insert_or_update_notes", &note.id)?;
            documents.push((note.id.clone(), self.encode(note)?));
        }

        self.collections.write().await.notes.extend(documents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteFactory;

    #[tokio::test]
    async fn test_note_survives_document_round_trip() {
        let network = InMemoryNoteNetwork::new();
        let note = NoteFactory::default().create_single_note(None, "title", "body");

        network.insert_or_update_note(&note).await.unwrap();

        assert_eq!(network.search_note(&note).await.unwrap(), Some(note.clone()));
        let raw = network.documents(NOTES_COLLECTION).await;
        assert_eq!(raw.len(), 1);
        assert!(raw[0]["updated_at"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_tombstones_are_separate() {
        let network = InMemoryNoteNetwork::new();
        let note = NoteFactory::default().create_single_note(None, "t", "b");

        network.insert_or_update_note(&note).await.unwrap();
        network.insert_deleted_note(&note).await.unwrap();
        network.delete_all_notes().await.unwrap();

        assert!(network.get_all_notes().await.unwrap().is_empty());
        assert_eq!(network.get_deleted_notes().await.unwrap(), vec![note.clone()]);

        network.delete_deleted_note(&note).await.unwrap();
        assert!(network.get_deleted_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_timestamp_is_rejected() {
        let network = InMemoryNoteNetwork::new();
        let mut note = NoteFactory::default().create_single_note(None, "t", "b");
        note.updated_at = "yesterday".into();

        let err = network.insert_or_update_note(&note).await.unwrap_err();
        assert!(matches!(err, NetworkError::Malformed { .. }));
        assert_eq!(err.safe_message(), "Sync failure");
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let network = InMemoryNoteNetwork::new();
        let note = NoteFactory::default().create_single_note(Some("n1".into()), "t", "b");

        network.delete_note(&note.id).await.unwrap();
        network.insert_deleted_note(&note).await.unwrap();

        assert_eq!(
            network.calls(),
            vec![
                NetworkCall::Delete("n1".into()),
                NetworkCall::InsertDeleted("n1".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_offline() {
        let network = InMemoryNoteNetwork::new();
        network.set_offline(true);

        let err = network.get_all_notes().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ExternalService);
        assert_eq!(network.calls(), vec![NetworkCall::GetAll]);

        network.set_offline(false);
        assert!(network.get_all_notes().await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_insert() {
        let network = InMemoryNoteNetwork::new();
        let notes = NoteFactory::default().create_note_list(5);

        network.insert_or_update_notes(&notes).await.unwrap();
        network.insert_deleted_notes(&notes[..2]).await.unwrap();

        assert_eq!(network.get_all_notes().await.unwrap().len(), 5);
        assert_eq!(network.get_deleted_notes().await.unwrap().len(), 2);
    }
}
