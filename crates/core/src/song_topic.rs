//! Constants and helpers for per-song discussion threads.
//!
//! The `song_topics.topic_id` column encodes the claim state:
//!
//! | Value       | State                                             |
//! |-------------|---------------------------------------------------|
//! | row absent  | never claimed                                     |
//! | `NULL`      | released after a failed creation, may be re-claimed |
//! | `-1`        | claimed, thread creation in flight                 |
//! | `> 0`       | resolved to a real thread id                      |

use crate::types::ThreadId;

/// Sentinel stored while a thread is being created.
pub const TOPIC_CLAIM_SENTINEL: i64 = -1;

/// Telegram limit on forum topic names, in characters.
pub const TOPIC_NAME_LIMIT: usize = 128;

/// Sentinel claims older than this are reported as stuck by the backfill scan.
pub const STUCK_CLAIM_AGE_MINS: i32 = 10;

/// Title used when a song has neither title nor artist.
pub const FALLBACK_SONG_NAME: &str = "Song";

/// Decoded claim state of a song's topic row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    /// No row, or the claim was released.
    Unclaimed,
    /// Sentinel present: another caller is creating the thread.
    Claimed,
    /// Thread exists.
    Resolved(ThreadId),
}

impl TopicState {
    /// Decode the nullable `topic_id` column of an existing row.
    pub fn from_column(topic_id: Option<i64>) -> Self {
        match topic_id {
            Some(id) if id > 0 => TopicState::Resolved(id),
            Some(TOPIC_CLAIM_SENTINEL) => TopicState::Claimed,
            // Non-sentinel non-positive values are not written by this crate;
            // treat them like a release so they can be healed.
            _ => TopicState::Unclaimed,
        }
    }

    pub fn resolved_id(self) -> Option<ThreadId> {
        match self {
            TopicState::Resolved(id) => Some(id),
            _ => None,
        }
    }
}

/// `"Title — Artist"`, or whichever part is present, or `None` if neither is.
pub fn song_heading(title: &str, artist: &str) -> Option<String> {
    let title = title.trim();
    let artist = artist.trim();
    match (title.is_empty(), artist.is_empty()) {
        (false, false) => Some(format!("{title} — {artist}")),
        (false, true) => Some(title.to_string()),
        (true, false) => Some(artist.to_string()),
        (true, true) => None,
    }
}

/// Forum topic name for a song, truncated to [`TOPIC_NAME_LIMIT`] characters.
pub fn build_topic_title(title: &str, artist: &str) -> String {
    let name = song_heading(title, artist).unwrap_or_else(|| FALLBACK_SONG_NAME.to_string());
    truncate_chars(&name, TOPIC_NAME_LIMIT)
}

/// Truncate on a character boundary.
pub fn truncate_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
