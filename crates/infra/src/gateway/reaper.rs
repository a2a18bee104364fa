//! Reclaims jobs stuck in `running`.
//!
//! A worker that dies mid-job leaves its record `running` forever. Any job
//! whose start is older than [`STALE_JOB_THRESHOLD_SECS`] is forced to `done`.
//! Every stale job is attempted even when some fail; the failures are returned
//! together with the number of jobs that did go through.

use chrono::{DateTime, TimeDelta, Utc};

use taskgate_auth::{Principal, Verb};
use taskgate_core::TenantId;
use taskgate_jobs::{JOBS_DOCTYPE, JobRecord};

use super::{AggregateError, GatewayError, GatewayResult, JobFailure, JobsGateway, ReclaimError};
use crate::store::{JobDocuments, StoreError};

/// Age after which a running job is considered abandoned.
pub const STALE_JOB_THRESHOLD_SECS: i64 = 60 * 60;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub reclaimed: usize,
}

impl JobsGateway {
    /// Reclaim the tenant's stale jobs. Requires read access to every job.
    pub fn clean_jobs(&self, principal: &Principal, tenant_id: TenantId) -> GatewayResult<ReapReport> {
        self.permissions
            .allow_whole_type(principal, Verb::Get, tenant_id, JOBS_DOCTYPE)?;
        self.clean_jobs_at(tenant_id, Utc::now())
    }

    /// Reclaim jobs that are stale as of `now`. No permission check.
    pub fn clean_jobs_at(&self, tenant_id: TenantId, now: DateTime<Utc>) -> GatewayResult<ReapReport> {
        let jobs = match self.store.all_jobs(tenant_id) {
            Ok(jobs) => jobs,
            Err(StoreError::NoDatabase(_)) => return Ok(ReapReport { reclaimed: 0 }),
            Err(e) => return Err(e.into()),
        };

        let threshold = TimeDelta::seconds(STALE_JOB_THRESHOLD_SECS);
        let outcomes: Vec<(JobRecord, Result<(), ReclaimError>)> = jobs
            .into_iter()
            .filter(|job| job.is_stale(now, threshold))
            .map(|mut job| {
                let outcome = self.reclaim(&mut job);
                (job, outcome)
            })
            .collect();

        let mut reclaimed = 0;
        let mut failures = Vec::new();
        for (job, outcome) in outcomes {
            match outcome {
                Ok(()) => reclaimed += 1,
                Err(error) => {
                    tracing::warn!(tenant_id = %tenant_id, job_id = %job.id, error = %error, "failed to reclaim stale job");
                    failures.push(JobFailure { job_id: job.id, error });
                }
            }
        }

        tracing::info!(
            tenant_id = %tenant_id,
            reclaimed,
            failed = failures.len(),
            "stale jobs cleaned"
        );

        if failures.is_empty() {
            Ok(ReapReport { reclaimed })
        } else {
            Err(GatewayError::Aggregate(AggregateError { reclaimed, failures }))
        }
    }

    fn reclaim(&self, job: &mut JobRecord) -> Result<(), ReclaimError> {
        job.mark_done()?;
        self.store.save_job(job)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use taskgate_auth::{Permission, PrincipalId, RulePermissionChecker};
    use taskgate_jobs::{JobRequest, JobState};

    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::scheduler::InMemoryScheduler;
    use crate::store::{DocumentStore, InMemoryDocumentStore, StoredDoc};

    /// Store whose updates fail for chosen document ids.
    struct FlakyStore {
        inner: InMemoryDocumentStore,
        failing: HashSet<String>,
    }

    impl DocumentStore for FlakyStore {
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
            if self.failing.contains(id) {
                return Err(StoreError::Storage(format!("write refused for {id}")));
            }
            self.inner.update(tenant_id, doc_type, id, rev, body)
        }
    }

    fn gateway_over(store: Arc<dyn DocumentStore>) -> JobsGateway {
        JobsGateway::new(
            Arc::new(InMemoryBroker::new(store.clone(), ["log"], 100)),
            Arc::new(InMemoryScheduler::new()),
            store,
            Arc::new(RulePermissionChecker::new()),
        )
    }

    fn running_since(store: &dyn DocumentStore, tenant: TenantId, started: DateTime<Utc>) -> JobRecord {
        let mut job = JobRecord::queued(JobRequest::new(tenant, "log"), started);
        job.mark_running(started).unwrap();
        store.insert_job(&mut job).unwrap();
        job
    }

    #[test]
    fn tenant_without_jobs_reaps_nothing() {
        let gw = gateway_over(Arc::new(InMemoryDocumentStore::new()));
        assert_eq!(gw.clean_jobs_at(TenantId::new(), Utc::now()).unwrap(), ReapReport { reclaimed: 0 });
    }

    #[test]
    fn only_running_jobs_past_the_threshold_are_reclaimed() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let gw = gateway_over(store.clone());
        let tenant = TenantId::new();
        let now = Utc::now();

        let exactly_one_hour = running_since(store.as_ref(), tenant, now - TimeDelta::hours(1));
        let just_over = running_since(store.as_ref(), tenant, now - TimeDelta::hours(1) - TimeDelta::seconds(1));

        assert_eq!(gw.clean_jobs_at(tenant, now).unwrap(), ReapReport { reclaimed: 1 });
        assert_eq!(store.load_job(tenant, exactly_one_hour.id).unwrap().state, JobState::Running);
        assert_eq!(store.load_job(tenant, just_over.id).unwrap().state, JobState::Done);

        // Done jobs are never touched again.
        assert_eq!(gw.clean_jobs_at(tenant, now).unwrap(), ReapReport { reclaimed: 0 });
    }

    #[test]
    fn partial_failure_reports_every_cause_and_the_count() {
        let inner = InMemoryDocumentStore::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let ok = running_since(&inner, tenant, now - TimeDelta::hours(2));
        let bad_a = running_since(&inner, tenant, now - TimeDelta::hours(3));
        let bad_b = running_since(&inner, tenant, now - TimeDelta::hours(4));

        let store = Arc::new(FlakyStore {
            inner,
            failing: [bad_a.id.to_string(), bad_b.id.to_string()].into_iter().collect(),
        });
        let gw = gateway_over(store.clone());

        let err = gw.clean_jobs_at(tenant, now).unwrap_err();
        let GatewayError::Aggregate(agg) = err else {
            panic!("expected aggregate error, got {err:?}");
        };
        assert_eq!(agg.reclaimed, 1);
        let failed: Vec<_> = agg.failures.iter().map(|f| f.job_id).collect();
        assert_eq!(failed, vec![bad_a.id, bad_b.id]);
        assert!(agg.failures.iter().all(|f| matches!(f.error, ReclaimError::Store(_))));

        assert_eq!(store.load_job(tenant, ok.id).unwrap().state, JobState::Done);
        assert_eq!(store.load_job(tenant, bad_a.id).unwrap().state, JobState::Running);
    }

    #[test]
    fn clean_requires_whole_type_read_on_jobs() {
        let gw = gateway_over(Arc::new(InMemoryDocumentStore::new()));
        let tenant = TenantId::new();
        let perms = |p: &[&'static str]| {
            Principal::new(PrincipalId::new(), tenant, p.iter().map(|s| Permission::new(*s)).collect())
        };

        assert!(gw.clean_jobs(&perms(&["jobs:GET"]), tenant).is_ok());
        assert!(matches!(
            gw.clean_jobs(&perms(&["jobs:GET:worker:log"]), tenant),
            Err(GatewayError::Unauthorized(_))
        ));
        assert!(matches!(
            gw.clean_jobs(&perms(&["triggers:ALL"]), tenant),
            Err(GatewayError::Unauthorized(_))
        ));
    }
}
