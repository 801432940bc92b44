//! In-memory notifier that records every call.
//!
//! Used by integration tests to count thread creations and inspect the
//! messages the participation flow produced.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use musicclub_core::types::ThreadId;

use crate::notifier::{Channel, Notifier, NotifyError};

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: Channel,
    pub text: String,
}

#[derive(Debug, Default)]
struct Calls {
    messages: Vec<SentMessage>,
    thread_titles: Vec<String>,
}

/// Records messages and thread creations instead of sending them.
#[derive(Debug)]
pub struct RecordingNotifier {
    calls: Mutex<Calls>,
    next_thread_id: AtomicI64,
    fail_create: AtomicBool,
    delay_ms: AtomicU64,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every call sleeps for `delay` first, widening race windows in tests.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            next_thread_id: AtomicI64::new(100),
            fail_create: AtomicBool::new(false),
            delay_ms: AtomicU64::new(delay.as_millis() as u64),
        }
    }

    /// Make subsequent `create_thread` calls fail (they are still recorded).
    ///
    /// A call abandoned during its delay is not recorded.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Titles passed to `create_thread`, in call order.
    pub fn thread_titles(&self) -> Vec<String> {
        self.lock().thread_titles.clone()
    }

    pub fn thread_count(&self) -> usize {
        self.lock().thread_titles.len()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().messages.clone()
    }

    /// Messages whose text contains `needle`.
    pub fn messages_containing(&self, needle: &str) -> Vec<SentMessage> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.text.contains(needle))
            .cloned()
            .collect()
    }

    async fn pause(&self) {
        let delay = Duration::from_millis(self.delay_ms.load(Ordering::SeqCst));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Calls> {
        // A panicking test thread may poison the lock; the data is still usable.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, channel: Channel, text: &str) -> Result<(), NotifyError> {
        self.pause().await;
        self.lock().messages.push(SentMessage {
            channel,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn create_thread(&self, title: &str) -> Result<ThreadId, NotifyError> {
        self.pause().await;
        self.lock().thread_titles.push(title.to_string());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NotifyError::Api {
                code: 400,
                description: "Bad Request: forced failure".to_string(),
            });
        }
        Ok(self.next_thread_id.fetch_add(1, Ordering::SeqCst))
    }
}
