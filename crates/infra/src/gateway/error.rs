//! Gateway errors and their classification.
//!
//! Collaborators report failures in their own vocabulary; conversion into
//! [`GatewayError`] turns their sentinel values into the gateway's not-found
//! and invalid-attribute kinds, and passes everything else through untouched.

use core::fmt;

use thiserror::Error;

use taskgate_auth::AuthzError;
use taskgate_core::{DomainError, JobId};

use crate::broker::BrokerError;
use crate::scheduler::SchedulerError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("trigger not found")]
    NotFoundTrigger,

    #[error("job not found")]
    NotFoundJob,

    #[error("unknown worker type: {0}")]
    UnknownWorker(String),

    #[error("unknown trigger type: {0}")]
    UnknownTrigger(String),

    #[error("invalid attribute {field}: {message}")]
    InvalidAttribute { field: &'static str, message: String },

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthzError),

    #[error("broker: {0}")]
    Broker(BrokerError),

    #[error("scheduler: {0}")]
    Scheduler(SchedulerError),

    #[error("store: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Aggregate(AggregateError),
}

impl GatewayError {
    pub fn invalid_attribute(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            field,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::NotFoundTrigger | GatewayError::NotFoundJob | GatewayError::UnknownWorker(_) => {
                ErrorCategory::NotFound
            }
            GatewayError::UnknownTrigger(_) => ErrorCategory::InvalidAttribute { field: "Type" },
            GatewayError::InvalidAttribute { field, .. } => ErrorCategory::InvalidAttribute { field: *field },
            GatewayError::Unauthorized(_) => ErrorCategory::Forbidden,
            GatewayError::Broker(BrokerError::QueueFull { .. }) => ErrorCategory::Unavailable,
            GatewayError::Aggregate(_) => ErrorCategory::Aggregate,
            GatewayError::Broker(_) | GatewayError::Scheduler(_) | GatewayError::Store(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Client-facing classification of a [`GatewayError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    InvalidAttribute { field: &'static str },
    Forbidden,
    /// The collaborator refused work for now (e.g. full queue).
    Unavailable,
    Aggregate,
    Internal,
}

impl From<BrokerError> for GatewayError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::UnknownWorker(worker) => GatewayError::UnknownWorker(worker),
            other => GatewayError::Broker(other),
        }
    }
}

impl From<SchedulerError> for GatewayError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NotFound(_) => GatewayError::NotFoundTrigger,
            SchedulerError::UnknownTrigger(ty) => GatewayError::UnknownTrigger(ty),
            SchedulerError::InvalidArguments { trigger_type, reason } => {
                GatewayError::invalid_attribute("arguments", format!("{trigger_type}: {reason}"))
            }
            other => GatewayError::Scheduler(other),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        GatewayError::Store(err)
    }
}

/// Why a single stale job could not be reclaimed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReclaimError {
    #[error(transparent)]
    Transition(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub job_id: JobId,
    pub error: ReclaimError,
}

/// Partial failure of a multi-item operation.
///
/// Carries every per-item failure, plus how many items went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    pub reclaimed: usize,
    pub failures: Vec<JobFailure>,
}

impl AggregateError {
    pub fn causes(&self) -> impl Iterator<Item = String> + '_ {
        self.failures.iter().map(|f| format!("job {}: {}", f.job_id, f.error))
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} job(s) failed, {} reclaimed",
            self.failures.len(),
            self.reclaimed
        )?;
        for cause in self.causes() {
            write!(f, "; {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
