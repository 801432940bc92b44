use std::sync::Arc;

use musicclub_notify::{Dispatcher, Notifier};

use crate::config::ServerConfig;
use crate::participation::{Announcer, RoleAssignmentService, TopicClaimCoordinator};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: musicclub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Join/leave/role-edit orchestration.
    pub participation: Arc<RoleAssignmentService>,
    /// One-shot topic creation, shared with the backfill task.
    pub topics: Arc<TopicClaimCoordinator>,
    /// Chat gateway used by the participation flow.
    pub notifier: Arc<dyn Notifier>,
    /// Tracks detached notification work so shutdown can drain it.
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Wire every component from its explicit dependencies.
    pub fn new(pool: musicclub_db::DbPool, config: ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let dispatcher = Dispatcher::new(config.notify_task_deadline());
        let topics = Arc::new(TopicClaimCoordinator::new(
            pool.clone(),
            Arc::clone(&notifier),
            config.telegram.timeout,
        ));
        let participation = Arc::new(RoleAssignmentService::new(
            pool.clone(),
            Arc::clone(&topics),
            Announcer::new(Arc::clone(&notifier)),
            dispatcher.clone(),
        ));

        Self {
            pool,
            config: Arc::new(config),
            participation,
            topics,
            notifier,
            dispatcher,
        }
    }
}
