//! Per-song discussion thread claim.

use musicclub_core::song_topic::TopicState;
use musicclub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `song_topics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SongTopic {
    pub song_id: DbId,
    pub topic_id: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SongTopic {
    pub fn state(&self) -> TopicState {
        TopicState::from_column(self.topic_id)
    }
}
