//! Domain logic shared by every music club crate.
//!
//! Nothing in here performs I/O: the database, HTTP and notifier layers
//! depend on this crate, never the other way round.

pub mod announcements;
pub mod error;
pub mod fullness;
pub mod permissions;
pub mod roles;
pub mod song_roles;
pub mod song_topic;
pub mod types;
