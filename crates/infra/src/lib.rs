//! `taskgate-infra`: collaborators of the jobs gateway and the gateway itself.
//!
//! The broker, scheduler and document store are consumed through traits; the
//! in-memory implementations here back development servers and tests.

pub mod broker;
pub mod gateway;
pub mod scheduler;
pub mod store;


pub use broker::{Broker, BrokerError, InMemoryBroker};
pub use gateway::{
    AggregateError, ErrorCategory, GatewayError, GatewayResult, JobFailure, JobsGateway, ReapReport,
    ReclaimError, STALE_JOB_THRESHOLD_SECS,
};
pub use scheduler::{InMemoryScheduler, Scheduler, SchedulerError, TriggerKind};
pub use store::{DocumentStore, InMemoryDocumentStore, JobDocuments, StoreError, StoredDoc};
