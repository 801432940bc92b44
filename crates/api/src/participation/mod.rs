//! Role participation: join/leave orchestration, the one-shot topic claim
//! and the chat announcements they trigger.
//!
//! Control flow for a join:
//!
//! ```text
//! RoleAssignmentService::join
//!   -> RoleLedgerRepo::join        (locked, before/after role sets)
//!   -> FullnessSnapshot::edge      (rising?)
//!   -> Dispatcher::spawn           (detached, own deadline)
//!        -> TopicClaimCoordinator::complete_song
//!        -> Announcer
//! ```

pub mod announce;
pub mod service;
pub mod topic;

pub use announce::Announcer;
pub use service::RoleAssignmentService;
pub use topic::{TopicClaimCoordinator, TopicError, TopicOutcome};
