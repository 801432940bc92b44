//! Song entity model and DTOs.

use musicclub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `songs` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Song {
    pub id: DbId,
    pub title: String,
    pub artist: String,
    pub description: String,
    pub link_url: String,
    pub thumbnail_url: Option<String>,
    pub is_featured: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a song.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSong {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link_url: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub created_by: Option<DbId>,
}
