//! Text of the messages posted to the club chat.
//!
//! Messages are sent with Telegram's HTML parse mode, so every piece of
//! user-supplied text goes through [`escape_html`].

use crate::song_topic::{song_heading, FALLBACK_SONG_NAME};

/// Label used when a participant has neither display name nor username.
const FALLBACK_PARTICIPANT: &str = "Participant";

/// The parts of a user needed to mention them in a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mention {
    pub display_name: String,
    pub username: String,
    pub telegram_id: Option<i64>,
}

/// Join or leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Joined,
    Left,
}

impl RoleChange {
    pub fn verb(self) -> &'static str {
        match self {
            RoleChange::Joined => "joined",
            RoleChange::Left => "left",
        }
    }
}

/// Escape `&`, `<`, `>` and `"` for Telegram HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a user as an HTML mention, linking to their Telegram profile if known.
pub fn mention(user: &Mention) -> String {
    let display = user.display_name.trim();
    let username = user.username.trim();
    let label = if !display.is_empty() {
        display.to_string()
    } else if !username.is_empty() {
        format!("@{username}")
    } else {
        FALLBACK_PARTICIPANT.to_string()
    };
    let escaped = escape_html(&label);
    match user.telegram_id {
        Some(id) => format!(r#"<a href="tg://user?id={id}">{escaped}</a>"#),
        None => escaped,
    }
}

fn escaped_heading(title: &str, artist: &str) -> String {
    escape_html(&song_heading(title, artist).unwrap_or_else(|| FALLBACK_SONG_NAME.to_string()))
}

/// Message posted into a freshly created song thread once every role is filled.
pub fn completion_message(title: &str, artist: &str, link: &str, participants: &[Mention]) -> String {
    let mut message = format!("Song is complete: {}", escaped_heading(title, artist));

    if !participants.is_empty() {
        let mentions: Vec<String> = participants.iter().map(mention).collect();
        message.push_str("\n\nParticipants: ");
        message.push_str(&mentions.join(", "));
    }

    let link = link.trim();
    if !link.is_empty() {
        message.push_str("\n\n");
        message.push_str(&escape_html(link));
    }
    message
}

/// Message announcing that a user joined or left a role on a song.
pub fn role_change_message(
    user: &Mention,
    role: &str,
    title: &str,
    artist: &str,
    change: RoleChange,
) -> String {
    format!(
        "{} {} the role <b>{}</b> in {}",
        mention(user),
        change.verb(),
        escape_html(role.trim()),
        escaped_heading(title, artist),
    )
}
