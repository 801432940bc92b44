//! The notifier gateway contract.

use async_trait::async_trait;
use musicclub_core::types::ThreadId;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure of a single outbound call. Never surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status without a readable body.
    #[error("Notifier returned HTTP {0}")]
    HttpStatus(u16),

    /// The API answered `ok: false`.
    #[error("Notifier API error {code}: {description}")]
    Api { code: i64, description: String },

    /// The API answered `ok: true` without the expected result.
    #[error("Notifier response is missing its result")]
    MissingResult,

    /// The call did not finish within its timeout.
    #[error("Notifier call timed out")]
    Timeout,

    /// No chat is configured.
    #[error("Notifier is disabled")]
    Disabled,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Where a message goes within the configured chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The chat's general feed.
    Main,
    /// A discussion thread inside the chat.
    Thread(ThreadId),
}

impl Channel {
    /// Post into `thread` when one is known, otherwise the general feed.
    pub fn for_thread(thread: Option<ThreadId>) -> Self {
        thread.map_or(Channel::Main, Channel::Thread)
    }

    pub fn thread_id(self) -> Option<ThreadId> {
        match self {
            Channel::Main => None,
            Channel::Thread(id) => Some(id),
        }
    }
}

/// Sends messages and creates discussion threads in the club chat.
///
/// Implementations bound every call with their own timeout. Callers treat
/// every error as best-effort: it is logged, never retried inline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether calls can reach a chat at all. Disabled notifiers must not be
    /// used to drive a topic claim.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Send an HTML-formatted message.
    async fn send_message(&self, channel: Channel, text: &str) -> Result<(), NotifyError>;

    /// Create a discussion thread and return its id.
    async fn create_thread(&self, title: &str) -> Result<ThreadId, NotifyError>;
}

/// Notifier used when no chat is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn send_message(&self, _channel: Channel, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Disabled)
    }

    async fn create_thread(&self, _title: &str) -> Result<ThreadId, NotifyError> {
        Err(NotifyError::Disabled)
    }
}
