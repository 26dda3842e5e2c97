//! Local note cache.
//!
//! [`NoteCacheDataSource`] is what use cases talk to. [`InMemoryNoteCache`] is
//! the bundled implementation; it keeps the row-count conventions of a SQL
//! store (`insert_note` returns a row id or `-1`, writes return affected rows).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use relay::{Categorizable, ErrorCategory};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::date_util::DateUtil;
use crate::model::Note;

/// Any cache operation on this note id does nothing and reports zero rows.
pub const FORCE_GENERAL_FAILURE: &str = "FORCE_GENERAL_FAILURE";

/// Any cache operation on this note id (or search for this query) errors.
pub const FORCE_EXCEPTION: &str = "FORCE_EXCEPTION";

pub const ORDER_BY_ASC_DATE_UPDATED: &str = "+updated_at";
pub const ORDER_BY_DESC_DATE_UPDATED: &str = "-updated_at";
pub const ORDER_BY_ASC_TITLE: &str = "+title";
pub const ORDER_BY_DESC_TITLE: &str = "-title";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unknown ordering {0:?}")]
    UnknownOrdering(String),

    #[error("forced failure during {operation} on {key}")]
    Forced { operation: &'static str, key: String },
}

impl Categorizable for CacheError {
    fn category(&self) -> ErrorCategory {
        match self {
            CacheError::UnknownOrdering(_) => ErrorCategory::Validation,
            CacheError::Forced { .. } => ErrorCategory::Internal,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            CacheError::UnknownOrdering(order) => format!("Unknown sort order: {}", order).into(),
            CacheError::Forced { .. } => "Cache failure".into(),
        }
    }
}

/// Sort order for [`NoteCacheDataSource::search_notes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteOrdering {
    DateUpdatedAsc,
    #[default]
    DateUpdatedDesc,
    TitleAsc,
    TitleDesc,
}

impl FromStr for NoteOrdering {
    type Err = CacheError;

    /// Empty string selects the default (newest first).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | ORDER_BY_DESC_DATE_UPDATED => Ok(NoteOrdering::DateUpdatedDesc),
            ORDER_BY_ASC_DATE_UPDATED => Ok(NoteOrdering::DateUpdatedAsc),
            ORDER_BY_ASC_TITLE => Ok(NoteOrdering::TitleAsc),
            ORDER_BY_DESC_TITLE => Ok(NoteOrdering::TitleDesc),
            other => Err(CacheError::UnknownOrdering(other.to_string())),
        }
    }
}

impl NoteOrdering {
    fn sort(self, notes: &mut [Note]) {
        match self {
            NoteOrdering::DateUpdatedAsc => notes.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            NoteOrdering::DateUpdatedDesc => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            NoteOrdering::TitleAsc => notes.sort_by(|a, b| a.title.cmp(&b.title)),
            NoteOrdering::TitleDesc => notes.sort_by(|a, b| b.title.cmp(&a.title)),
        }
    }
}

#[async_trait]
pub trait NoteCacheDataSource: Send + Sync {
    /// Returns the new row id, or `-1` if nothing was inserted.
    async fn insert_note(&self, note: Note) -> Result<i64, CacheError>;

    /// Returns the number of deleted rows.
    async fn delete_note(&self, primary_key: &str) -> Result<i64, CacheError>;

    async fn delete_notes(&self, notes: &[Note]) -> Result<i64, CacheError>;

    /// Returns the number of updated rows.
    async fn update_note(
        &self,
        primary_key: &str,
        new_title: &str,
        new_body: &str,
    ) -> Result<i64, CacheError>;

    /// Notes whose title or body contains `query`, first `page * page_size` results.
    async fn search_notes(
        &self,
        query: &str,
        filter_and_order: &str,
        page: u32,
    ) -> Result<Vec<Note>, CacheError>;

    async fn search_note_by_id(&self, primary_key: &str) -> Result<Option<Note>, CacheError>;

    async fn get_num_notes(&self) -> Result<usize, CacheError>;

    async fn insert_notes(&self, notes: Vec<Note>) -> Result<Vec<i64>, CacheError>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<String, (i64, Note)>,
    next_row_id: i64,
}

/// In-process cache backed by a `BTreeMap`.
#[derive(Debug)]
pub struct InMemoryNoteCache {
    table: RwLock<Table>,
    page_size: usize,
    latency: Option<Duration>,
    date_util: DateUtil,
}

impl InMemoryNoteCache {
    pub fn new(page_size: usize) -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_row_id: 1,
            }),
            page_size: page_size.max(1),
            latency: None,
            date_util: DateUtil::new(),
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_forced(operation: &'static str, key: &str) -> Result<(), CacheError> {
        if key == FORCE_EXCEPTION {
            return Err(CacheError::Forced {
                operation,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn insert_row(table: &mut Table, note: Note) -> i64 {
        // Conflicting ids are ignored, like INSERT OR IGNORE
        if note.id == FORCE_GENERAL_FAILURE || table.rows.contains_key(&note.id) {
            return -1;
        }
        let row_id = table.next_row_id;
        table.next_row_id += 1;
        table.rows.insert(note.id.clone(), (row_id, note));
        row_id
    }
}

impl Default for InMemoryNoteCache {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl NoteCacheDataSource for InMemoryNoteCache {
    async fn insert_note(&self, note: Note) -> Result<i64, CacheError> {
        self.delay().await;
        Self::check_forced("insert_note", &note.id)?;

        let mut table = self.table.write().await;
        let row_id = Self::insert_row(&mut table, note);
        debug!(row_id, "cache insert");
        Ok(row_id)
    }

    async fn delete_note(&self, primary_key: &str) -> Result<i64, CacheError> {
        self.delay().await;
        Self::check_forced("delete_note", primary_key)?;

        let removed = self.table.write().await.rows.remove(primary_key).is_some();
        Ok(removed as i64)
    }

    async fn delete_notes(&self, notes: &[Note]) -> Result<i64, CacheError> {
        self.delay().await;
        for note in notes {
            Self::check_forced("delete_notes", &note.id)?;
        }

        let mut table = self.table.write().await;
        let removed = notes
            .iter()
            .filter(|note| table.rows.remove(&note.id).is_some())
            .count();
        Ok(removed as i64)
    }

    async fn update_note(
        &self,
        primary_key: &str,
        new_title: &str,
        new_body: &str,
    ) -> Result<i64, CacheError> {
        self.delay().await;
        Self::check_forced("update_note", primary_key)?;

        let mut table = self.table.write().await;
        match table.rows.get_mut(primary_key) {
            Some((_, note)) => {
                note.title = new_title.to_string();
                note.body = new_body.to_string();
                note.updated_at = self.date_util.current_timestamp();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn search_notes(
        &self,
        query: &str,
        filter_and_order: &str,
        page: u32,
    ) -> Result<Vec<Note>, CacheError> {
        self.delay().await;
        Self::check_forced("search_notes", query)?;
        let ordering: NoteOrdering = filter_and_order.parse()?;

        let needle = query.to_lowercase();
        let mut found: Vec<Note> = self
            .table
            .read()
            .await
            .rows
            .values()
            .map(|(_, note)| note)
            .filter(|note| {
                needle.is_empty()
                    || note.title.to_lowercase().contains(&needle)
                    || note.body.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        ordering.sort(&mut found);
        found.truncate(self.page_size.saturating_mul(page.max(1) as usize));
        Ok(found)
    }

    async fn search_note_by_id(&self, primary_key: &str) -> Result<Option<Note>, CacheError> {
        self.delay().await;
        Self::check_forced("search_note_by_id", primary_key)?;

        Ok(self
            .table
            .read()
            .await
            .rows
            .get(primary_key)
            .map(|(_, note)| note.clone()))
    }

    async fn get_num_notes(&self) -> Result<usize, CacheError> {
        self.delay().await;
        Ok(self.table.read().await.rows.len())
    }

    async fn insert_notes(&self, notes: Vec<Note>) -> Result<Vec<i64>, CacheError> {
        self.delay().await;
        for note in &notes {
            Self::check_forced("insert_notes", &note.id)?;
        }

        let mut table = self.table.write().await;
        Ok(notes
            .into_iter()
            .map(|note| Self::insert_row(&mut table, note))
            .collect())
    }
}
