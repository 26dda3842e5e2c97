use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date_util::DateUtil;

/// A note as the cache stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    pub updated_at: String,
    pub created_at: String,
}

/// Builds notes with fresh ids and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NoteFactory {
    date_util: DateUtil,
}

impl NoteFactory {
    pub fn new(date_util: DateUtil) -> Self {
        Self { date_util }
    }

    /// New note. A random id is generated when `id` is `None`.
    pub fn create_single_note(
        &self,
        id: Option<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Note {
        let now = self.date_util.current_timestamp();
        Note {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: title.into(),
            body: body.into(),
            updated_at: now.clone(),
            created_at: now,
        }
    }

    /// `count` notes with random ids, titles and bodies.
    pub fn create_note_list(&self, count: usize) -> Vec<Note> {
        (0..count)
            .map(|_| {
                self.create_single_note(
                    None,
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                )
            })
            .collect()
    }
}
