//! Outbound chat notifications for the music club.
//!
//! - [`Notifier`]: the gateway trait consumed by the participation flow.
//! - [`TelegramNotifier`]: Bot API implementation over `reqwest`.
//! - [`RecordingNotifier`]: in-memory implementation that records calls.
//! - [`Dispatcher`]: runs fire-and-forget notification work detached from
//!   the request, under its own deadline.

pub mod dispatch;
pub mod notifier;
pub mod recording;
pub mod telegram;

pub use dispatch::Dispatcher;
pub use notifier::{Channel, DisabledNotifier, Notifier, NotifyError};
pub use recording::RecordingNotifier;
pub use telegram::{TelegramConfig, TelegramNotifier};
