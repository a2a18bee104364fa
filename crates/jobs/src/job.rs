//! Job records and the requests that create them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use taskgate_auth::Resource;
use taskgate_core::{DomainError, DomainResult, JobId, TenantId};

use crate::payload::{JobOptions, Message};

/// Doctype of job records (and of queue views, which project them).
pub const JOBS_DOCTYPE: &str = "jobs";

/// Lifecycle state of a job.
///
/// `queued → running → {done | errored}`; states never regress.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Errored,
}

impl JobState {
    fn rank(self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Running => 1,
            JobState::Done | JobState::Errored => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Skipping `running` is allowed (a queued job can be force-closed), but
    /// terminal states are final.
    pub fn can_transition_to(self, next: JobState) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Errored => "errored",
        }
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to enqueue one unit of work on a worker type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub tenant_id: TenantId,
    pub worker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
}

impl JobRequest {
    pub fn new(tenant_id: TenantId, worker: impl Into<String>) -> Self {
        Self {
            tenant_id,
            worker: worker.into(),
            message: None,
            options: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Persisted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "_id")]
    pub id: JobId,
    /// Revision token of the stored document; `None` until persisted.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub tenant_id: TenantId,
    pub worker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
    pub state: JobState,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// Fresh `queued` record for a request.
    pub fn queued(request: JobRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            rev: None,
            tenant_id: request.tenant_id,
            worker: request.worker,
            message: request.message,
            options: request.options,
            state: JobState::Queued,
            queued_at: now,
            started_at: None,
            error: None,
        }
    }

    /// Move the job forward in its lifecycle.
    pub fn transition(&mut self, next: JobState) -> DomainResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "job {} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(JobState::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn mark_done(&mut self) -> DomainResult<()> {
        self.transition(JobState::Done)
    }

    pub fn mark_errored(&mut self, error: impl Into<String>) -> DomainResult<()> {
        self.transition(JobState::Errored)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// A running job whose start is older than `threshold` at `now`.
    ///
    /// A running job without a start timestamp is always stale.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        if self.state != JobState::Running {
            return false;
        }
        match self.started_at {
            Some(started) => started + threshold < now,
            None => true,
        }
    }

    pub fn self_link(&self) -> String {
        format!("/jobs/{}/{}", self.worker, self.id)
    }
}

impl Resource for JobRequest {
    fn doc_type(&self) -> &str {
        JOBS_DOCTYPE
    }

    fn resource_id(&self) -> Option<String> {
        None
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn field(&self, key: &str) -> Option<String> {
        match key {
            "worker" => Some(self.worker.clone()),
            _ => None,
        }
    }
}

impl Resource for JobRecord {
    fn doc_type(&self) -> &str {
        JOBS_DOCTYPE
    }

    fn resource_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn field(&self, key: &str) -> Option<String> {
        match key {
            "worker" => Some(self.worker.clone()),
            "state" => Some(self.state.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobRecord {
        JobRecord::queued(JobRequest::new(TenantId::new(), "thumbnail"), Utc::now())
    }

    #[test]
    fn lifecycle_moves_forward() {
        let mut j = job();
        assert_eq!(j.state, JobState::Queued);

        let started = Utc::now();
        j.mark_running(started).unwrap();
        assert_eq!(j.state, JobState::Running);
        assert_eq!(j.started_at, Some(started));

        j.mark_done().unwrap();
        assert!(j.state.is_terminal());
    }

    #[test]
    fn states_never_regress() {
        let mut j = job();
        j.mark_running(Utc::now()).unwrap();
        j.mark_errored("boom").unwrap();
        assert_eq!(j.error.as_deref(), Some("boom"));

        assert!(matches!(j.transition(JobState::Queued), Err(DomainError::InvariantViolation(_))));
        assert!(j.mark_running(Utc::now()).is_err());
        assert!(j.mark_done().is_err());
        assert_eq!(j.state, JobState::Errored);
    }

    #[test]
    fn only_old_running_jobs_are_stale() {
        let now = Utc::now();
        let hour = TimeDelta::hours(1);

        let mut queued = job();
        queued.queued_at = now - TimeDelta::hours(5);
        assert!(!queued.is_stale(now, hour));

        let mut recent = job();
        recent.mark_running(now - TimeDelta::minutes(30)).unwrap();
        assert!(!recent.is_stale(now, hour));

        let mut old = job();
        old.mark_running(now - TimeDelta::hours(2)).unwrap();
        assert!(old.is_stale(now, hour));

        let mut unknown_start = job();
        unknown_start.state = JobState::Running;
        assert!(unknown_start.is_stale(now, hour));
    }

    #[test]
    fn serialized_record_uses_document_keys() {
        let mut j = job();
        j.rev = Some("1-abc".to_string());
        let value = serde_json::to_value(&j).unwrap();
        assert_eq!(value["_id"], j.id.to_string());
        assert_eq!(value["_rev"], "1-abc");
        assert_eq!(value["state"], "queued");
        assert!(value.get("started_at").is_none());
    }

    #[test]
    fn request_exposes_worker_field() {
        let req = JobRequest::new(TenantId::new(), "log");
        assert_eq!(req.field("worker").as_deref(), Some("log"));
        assert_eq!(req.resource_id(), None);
        assert_eq!(req.doc_type(), JOBS_DOCTYPE);
    }
}
