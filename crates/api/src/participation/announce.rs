//! Best-effort chat announcements. Every failure is logged and swallowed.

use std::sync::Arc;

use musicclub_core::announcements::{completion_message, role_change_message, RoleChange};
use musicclub_core::types::ThreadId;
use musicclub_db::models::song::Song;
use musicclub_db::models::user::User;
use musicclub_notify::{Channel, Notifier};

/// Formats and sends participation messages through the notifier.
#[derive(Clone)]
pub struct Announcer {
    notifier: Arc<dyn Notifier>,
}

impl Announcer {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_enabled()
    }

    /// Post "<user> joined|left the role <role> in <song>".
    ///
    /// Goes into the song's thread when one is resolved, otherwise the main chat.
    pub async fn announce_role_change(
        &self,
        song: &Song,
        user: &User,
        role: &str,
        change: RoleChange,
        thread: Option<ThreadId>,
    ) {
        if !self.is_enabled() {
            tracing::debug!(song_id = song.id, "Notifier disabled, skipping role announcement");
            return;
        }

        let text = role_change_message(&user.mention(), role, &song.title, &song.artist, change);
        if let Err(e) = self
            .notifier
            .send_message(Channel::for_thread(thread), &text)
            .await
        {
            tracing::warn!(
                song_id = song.id,
                user_id = user.id,
                role,
                change = change.verb(),
                error = %e,
                "Failed to announce role change"
            );
        }
    }

    /// Post the "song is complete" message into the song's new thread.
    pub async fn announce_completion(&self, song: &Song, thread: ThreadId, participants: &[User]) {
        let mentions: Vec<_> = participants.iter().map(User::mention).collect();
        let text = completion_message(&song.title, &song.artist, &song.link_url, &mentions);
        if let Err(e) = self
            .notifier
            .send_message(Channel::Thread(thread), &text)
            .await
        {
            tracing::warn!(
                song_id = song.id,
                topic_id = thread,
                error = %e,
                "Failed to announce song completion"
            );
        }
    }
}
