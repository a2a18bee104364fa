//! Job broker: accepts job requests and keeps per-worker FIFO queues.
//!
//! The in-memory broker persists every job in the [`DocumentStore`] so that
//! job lookups and the reaper see the same records the queues point at.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use taskgate_core::{DomainError, JobId, TenantId};
use taskgate_jobs::{JobRecord, JobRequest, JobState};

use crate::store::{DocumentStore, JobDocuments, StoreError};

/// Job broker abstraction.
pub trait Broker: Send + Sync {
    /// Enqueue a job, returning the persisted record in state `queued`.
    fn push_job(&self, request: JobRequest) -> Result<JobRecord, BrokerError>;

    /// Jobs still `queued` for a worker type, oldest first.
    fn queued_jobs(&self, tenant_id: TenantId, worker: &str) -> Result<Vec<JobRecord>, BrokerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("unknown worker type: {0}")]
    UnknownWorker(String),
    #[error("queue for worker {worker} is full ({capacity} jobs)")]
    QueueFull { worker: String, capacity: usize },
    #[error("job transition refused: {0}")]
    Transition(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// In-memory broker for tests/dev.
pub struct InMemoryBroker {
    store: Arc<dyn DocumentStore>,
    workers: Vec<String>,
    capacity: usize,
    queues: RwLock<HashMap<(TenantId, String), VecDeque<JobId>>>,
}

impl InMemoryBroker {
    pub fn new(store: Arc<dyn DocumentStore>, workers: impl IntoIterator<Item = impl Into<String>>, capacity: usize) -> Self {
        Self {
            store,
            workers: workers.into_iter().map(Into::into).collect(),
            capacity,
            queues: RwLock::new(HashMap::new()),
        }
    }

    fn check_worker(&self, worker: &str) -> Result<(), BrokerError> {
        if self.workers.iter().any(|w| w == worker) {
            Ok(())
        } else {
            Err(BrokerError::UnknownWorker(worker.to_string()))
        }
    }

    /// Hand the oldest queued job of `worker` to a worker, marking it `running`.
    ///
    /// Returns `None` if the queue is empty. A job stays at the front of its
    /// queue until its `running` state has been saved.
    pub fn claim_next(&self, tenant_id: TenantId, worker: &str) -> Result<Option<JobRecord>, BrokerError> {
        self.check_worker(worker)?;

        let mut queues = self.queues.write();
        let Some(queue) = queues.get_mut(&(tenant_id, worker.to_string())) else {
            return Ok(None);
        };

        while let Some(&job_id) = queue.front() {
            let mut job = self.store.load_job(tenant_id, job_id)?;
            if job.state != JobState::Queued {
                queue.pop_front();
                continue;
            }
            job.mark_running(Utc::now())?;
            self.store.save_job(&mut job)?;
            queue.pop_front();
            tracing::debug!(job_id = %job.id, worker, "job claimed");
            return Ok(Some(job));
        }
        Ok(None)
    }
}

impl Broker for InMemoryBroker {
    fn push_job(&self, request: JobRequest) -> Result<JobRecord, BrokerError> {
        self.check_worker(&request.worker)?;

        let mut queues = self.queues.write();
        let queue = queues
            .entry((request.tenant_id, request.worker.clone()))
            .or_default();
        if queue.len() >= self.capacity {
            return Err(BrokerError::QueueFull {
                worker: request.worker,
                capacity: self.capacity,
            });
        }

        let mut job = JobRecord::queued(request, Utc::now());
        self.store.insert_job(&mut job)?;
        queue.push_back(job.id);
        Ok(job)
    }

    fn queued_jobs(&self, tenant_id: TenantId, worker: &str) -> Result<Vec<JobRecord>, BrokerError> {
        self.check_worker(worker)?;

        let queues = self.queues.read();
        let Some(queue) = queues.get(&(tenant_id, worker.to_string())) else {
            return Ok(Vec::new());
        };

        let mut jobs = Vec::with_capacity(queue.len());
        for job_id in queue {
            let job = self.store.load_job(tenant_id, *job_id)?;
            if job.state == JobState::Queued {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use taskgate_jobs::Message;

    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::{InMemoryDocumentStore, StoredDoc};

    /// Store whose updates can be switched off.
    #[derive(Default)]
    struct ReadOnlySwitchStore {
        inner: InMemoryDocumentStore,
        refuse_updates: AtomicBool,
    }

    impl DocumentStore for ReadOnlySwitchStore {
        fn exists_database(&self, tenant_id: TenantId, doc_type: &str) -> bool {
            self.inner.exists_database(tenant_id, doc_type)
        }

        fn create(&self, tenant_id: TenantId, doc_type: &str, id: &str, body: String) -> Result<String, StoreError> {
            self.inner.create(tenant_id, doc_type, id, body)
        }

        fn get(&self, tenant_id: TenantId, doc_type: &str, id: &str) -> Result<StoredDoc, StoreError> {
            self.inner.get(tenant_id, doc_type, id)
        }

        fn scan_all(&self, tenant_id: TenantId, doc_type: &str) -> Result<Vec<StoredDoc>, StoreError> {
            self.inner.scan_all(tenant_id, doc_type)
        }

        fn update(
            &self,
            tenant_id: TenantId,
            doc_type: &str,
            id: &str,
            rev: &str,
            body: String,
        ) -> Result<String, StoreError> {
            if self.refuse_updates.load(Ordering::SeqCst) {
                return Err(StoreError::Storage("updates refused".to_string()));
            }
            self.inner.update(tenant_id, doc_type, id, rev, body)
        }
    }

    fn broker(capacity: usize) -> InMemoryBroker {
        InMemoryBroker::new(Arc::new(InMemoryDocumentStore::new()), ["log", "thumbnail"], capacity)
    }

    #[test]
    fn pushed_jobs_are_listed_in_order() {
        let b = broker(10);
        let tenant = TenantId::new();

        let first = b.push_job(JobRequest::new(tenant, "log")).unwrap();
        let second = b
            .push_job(JobRequest::new(tenant, "log").with_message(Message::from_json(r#"{"n":2}"#).unwrap()))
            .unwrap();
        b.push_job(JobRequest::new(tenant, "thumbnail")).unwrap();

        let ids: Vec<JobId> = b.queued_jobs(tenant, "log").unwrap().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(first.state, JobState::Queued);
        assert!(b.queued_jobs(TenantId::new(), "log").unwrap().is_empty());
    }

    #[test]
    fn unknown_worker_is_rejected() {
        let b = broker(10);
        let err = b.push_job(JobRequest::new(TenantId::new(), "mystery")).unwrap_err();
        assert_eq!(err, BrokerError::UnknownWorker("mystery".to_string()));
        assert!(matches!(b.queued_jobs(TenantId::new(), "mystery"), Err(BrokerError::UnknownWorker(_))));
    }

    #[test]
    fn claimed_jobs_leave_the_queue() {
        let b = broker(10);
        let tenant = TenantId::new();
        let job = b.push_job(JobRequest::new(tenant, "log")).unwrap();

        let claimed = b.claim_next(tenant, "log").unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.state, JobState::Running);
        assert!(claimed.started_at.is_some());

        assert!(b.queued_jobs(tenant, "log").unwrap().is_empty());
        assert!(b.claim_next(tenant, "log").unwrap().is_none());
    }

    #[test]
    fn failed_claim_keeps_the_job_queued() {
        let store = Arc::new(ReadOnlySwitchStore::default());
        let b = InMemoryBroker::new(store.clone(), ["log"], 10);
        let tenant = TenantId::new();
        let job = b.push_job(JobRequest::new(tenant, "log")).unwrap();

        store.refuse_updates.store(true, Ordering::SeqCst);
        assert!(matches!(b.claim_next(tenant, "log"), Err(BrokerError::Store(StoreError::Storage(_)))));
        assert_eq!(store.load_job(tenant, job.id).unwrap().state, JobState::Queued);
        let ids: Vec<JobId> = b.queued_jobs(tenant, "log").unwrap().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![job.id]);

        store.refuse_updates.store(false, Ordering::SeqCst);
        let claimed = b.claim_next(tenant, "log").unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.state, JobState::Running);
    }

    #[test]
    fn refused_transitions_are_not_storage_failures() {
        let err: BrokerError = DomainError::invariant("done -> running").into();
        assert!(matches!(err, BrokerError::Transition(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn capacity_is_per_tenant_queue() {
        let b = broker(1);
        let tenant = TenantId::new();
        b.push_job(JobRequest::new(tenant, "log")).unwrap();

        assert_eq!(
            b.push_job(JobRequest::new(tenant, "log")).unwrap_err(),
            BrokerError::QueueFull {
                worker: "log".to_string(),
                capacity: 1
            }
        );
        assert!(b.push_job(JobRequest::new(tenant, "thumbnail")).is_ok());
        assert!(b.push_job(JobRequest::new(TenantId::new(), "log")).is_ok());

        b.claim_next(tenant, "log").unwrap();
        assert!(b.push_job(JobRequest::new(tenant, "log")).is_ok());
    }
}
