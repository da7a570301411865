//! Wiring of the sync engine over one local store and one fetcher.

use std::sync::Arc;

use super::failed_queue::{DrainReport, FailedSyncQueue};
use super::locks::TableLocks;
use super::orchestrator::{SyncOrchestrator, SyncSession};
use super::router::{DispatchReport, NotificationRouter};
use super::status::SyncReport;
use crate::error::Result;
use crate::fetch::BatchFetcher;
use crate::services::DatabaseService;

/// Orchestrator, router and retry queue sharing one set of table locks.
pub struct SyncEngine {
    database: DatabaseService,
    orchestrator: Arc<SyncOrchestrator>,
    router: NotificationRouter,
}

impl SyncEngine {
    pub fn new(database: DatabaseService, fetcher: Arc<dyn BatchFetcher>) -> Self {
        let locks = TableLocks::new();
        let store = Arc::new(database.clone());
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&fetcher),
            store.clone(),
            store.clone(),
            locks.clone(),
        );
        let queue = FailedSyncQueue::new(store.clone());
        let router = NotificationRouter::new(fetcher, store, queue, locks);

        Self {
            database,
            orchestrator: Arc::new(orchestrator),
            router,
        }
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.database
    }

    pub const fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    pub const fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub const fn queue(&self) -> &FailedSyncQueue {
        self.router.queue()
    }

    /// Application start trigger: retry whatever failed in earlier sessions.
    pub async fn on_app_start(&self) -> Result<DrainReport> {
        self.queue().drain(&self.router).await
    }

    /// Explicit user-initiated retry.
    pub async fn retry_failed(&self) -> Result<DrainReport> {
        self.queue().drain(&self.router).await
    }

    pub async fn start_sync(&self, session: SyncSession) -> Result<SyncReport> {
        self.orchestrator.start_sync(session).await
    }

    pub async fn handle_notification(&self, raw: &str) -> Result<DispatchReport> {
        self.router.dispatch_json(raw).await
    }
}
