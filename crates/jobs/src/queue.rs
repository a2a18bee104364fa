use taskgate_auth::Resource;
use taskgate_core::TenantId;

use crate::job::JOBS_DOCTYPE;

/// Permission descriptor for the queue of one worker type.
///
/// Queues are not stored: listing one yields the `queued` jobs of the worker,
/// in the order the broker returns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueResource {
    pub tenant_id: TenantId,
    pub worker: String,
}

impl QueueResource {
    pub fn new(tenant_id: TenantId, worker: impl Into<String>) -> Self {
        Self {
            tenant_id,
            worker: worker.into(),
        }
    }
}

impl Resource for QueueResource {
    fn doc_type(&self) -> &str {
        JOBS_DOCTYPE
    }

    fn resource_id(&self) -> Option<String> {
        Some(self.worker.clone())
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn field(&self, key: &str) -> Option<String> {
        (key == "worker").then(|| self.worker.clone())
    }
}
