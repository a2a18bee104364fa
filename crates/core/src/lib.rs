//! `taskgate-core`: identifiers and error primitives shared by every crate.
//!
//! This crate is **pure** (no IO, no async, no logging).

pub mod duration;
pub mod error;
pub mod id;

pub use duration::parse_duration;
pub use error::{DomainError, DomainResult};
pub use id::{JobId, TenantId, TriggerId};
