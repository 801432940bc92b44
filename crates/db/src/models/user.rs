//! User entity model and DTOs.

use musicclub_core::announcements::Mention;
use musicclub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
    pub tg_user_id: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The parts of this user needed to mention them in a chat message.
    pub fn mention(&self) -> Mention {
        Mention {
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            telegram_id: self.tg_user_id,
        }
    }
}

/// DTO for creating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub display_name: String,
    pub tg_user_id: Option<i64>,
}
