//! Jobs gateway: the permission-checked front door to the broker and scheduler.
//!
//! Every operation takes the calling [`Principal`] and the tenant it acts on,
//! checks the relevant permission, then delegates to a collaborator. The
//! gateway holds no state of its own and is cheap to clone.

mod error;
mod jobs;
mod reaper;
mod triggers;

use std::sync::Arc;

use taskgate_auth::PermissionChecker;

use crate::broker::Broker;
use crate::scheduler::Scheduler;
use crate::store::DocumentStore;

pub use error::{AggregateError, ErrorCategory, GatewayError, JobFailure, ReclaimError};
pub use reaper::{ReapReport, STALE_JOB_THRESHOLD_SECS};

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Clone)]
pub struct JobsGateway {
    broker: Arc<dyn Broker>,
    scheduler: Arc<dyn Scheduler>,
    store: Arc<dyn DocumentStore>,
    permissions: Arc<dyn PermissionChecker>,
}

impl JobsGateway {
    pub fn new(
        broker: Arc<dyn Broker>,
        scheduler: Arc<dyn Scheduler>,
        store: Arc<dyn DocumentStore>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            broker,
            scheduler,
            store,
            permissions,
        }
    }
}
