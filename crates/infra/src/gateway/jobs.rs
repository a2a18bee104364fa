use taskgate_auth::{Principal, Verb};
use taskgate_core::{JobId, TenantId};
use taskgate_jobs::{JobOptions, JobRecord, JobRequest, Message, QueueResource};

use super::{GatewayError, GatewayResult, JobsGateway};
use crate::store::{JobDocuments, StoreError};

impl JobsGateway {
    /// Submit a job to the queue of `worker`.
    ///
    /// The request is authorized as a whole before it reaches the broker; a
    /// broker refusal is returned as is, never retried.
    pub fn push_job(
        &self,
        principal: &Principal,
        tenant_id: TenantId,
        worker: &str,
        message: Option<Message>,
        options: Option<JobOptions>,
    ) -> GatewayResult<JobRecord> {
        let request = JobRequest {
            tenant_id,
            worker: worker.to_string(),
            message,
            options,
        };
        self.permissions.allow(principal, Verb::Post, &request)?;
        self.enqueue(request)
    }

    /// Jobs still waiting in the queue of `worker`, in broker order.
    pub fn queued_jobs(&self, principal: &Principal, tenant_id: TenantId, worker: &str) -> GatewayResult<Vec<JobRecord>> {
        let queue = QueueResource::new(tenant_id, worker);
        self.permissions.allow(principal, Verb::Get, &queue)?;
        Ok(self.broker.queued_jobs(tenant_id, worker)?)
    }

    pub fn get_job(&self, principal: &Principal, tenant_id: TenantId, job_id: JobId) -> GatewayResult<JobRecord> {
        let job = match self.store.load_job(tenant_id, job_id) {
            Ok(job) => job,
            Err(StoreError::NotFound(_) | StoreError::NoDatabase(_)) => return Err(GatewayError::NotFoundJob),
            Err(e) => return Err(e.into()),
        };
        self.permissions.allow(principal, Verb::Get, &job)?;
        Ok(job)
    }

    /// Hand an already authorized request to the broker.
    pub(super) fn enqueue(&self, request: JobRequest) -> GatewayResult<JobRecord> {
        let job = self.broker.push_job(request)?;
        tracing::debug!(
            tenant_id = %job.tenant_id,
            job_id = %job.id,
            worker = %job.worker,
            "job queued"
        );
        Ok(job)
    }
}
