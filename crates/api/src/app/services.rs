use std::sync::Arc;

use taskgate_auth::RulePermissionChecker;
use taskgate_infra::{InMemoryBroker, InMemoryDocumentStore, InMemoryScheduler, JobsGateway};

use crate::config::ApiConfig;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub gateway: JobsGateway,
}

/// Wire the gateway over the in-memory broker, scheduler and store.
pub fn build_services(config: &ApiConfig) -> AppServices {
    let store = Arc::new(InMemoryDocumentStore::new());
    let broker = Arc::new(InMemoryBroker::new(
        store.clone(),
        config.workers.iter().cloned(),
        config.queue_capacity,
    ));
    let gateway = JobsGateway::new(
        broker,
        Arc::new(InMemoryScheduler::new()),
        store,
        Arc::new(RulePermissionChecker::new()),
    );

    tracing::info!(
        workers = ?config.workers,
        queue_capacity = config.queue_capacity,
        "jobs gateway ready"
    );

    AppServices { gateway }
}
