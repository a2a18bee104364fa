//! `taskgate-jobs`: job and trigger records, the dispatch vocabulary shared by
//! the gateway, its collaborators and the HTTP layer.
//!
//! Payloads (`Message`, `JobOptions`) stay opaque here: they are carried as raw
//! JSON and only interpreted by workers.

pub mod job;
pub mod payload;
pub mod queue;
pub mod trigger;

pub use job::{JOBS_DOCTYPE, JobRecord, JobRequest, JobState};
pub use payload::{JobOptions, Message};
pub use queue::QueueResource;
pub use trigger::{TRIGGERS_DOCTYPE, TriggerInfos, TriggerRequest};
