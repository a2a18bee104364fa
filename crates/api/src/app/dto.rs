use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use taskgate_jobs::{JobOptions, JobRecord, Message, TriggerInfos};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /jobs/queue/:worker_type`.
#[derive(Debug, Default, Deserialize)]
pub struct PushJobRequest {
    #[serde(default)]
    pub arguments: Option<Message>,
    #[serde(default)]
    pub options: Option<JobOptions>,
}

/// Query of `GET /jobs/triggers`.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerListQuery {
    #[serde(rename = "Worker", default)]
    pub worker: Option<String>,
}

/// Decode a JSON request body; malformed input becomes a 400 response.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body).map_err(errors::bad_request)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Serialize)]
pub struct JobDocument {
    #[serde(flatten)]
    pub job: JobRecord,
    pub links: Links,
}

impl From<JobRecord> for JobDocument {
    fn from(job: JobRecord) -> Self {
        let links = Links {
            self_link: job.self_link(),
        };
        Self { job, links }
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerDocument {
    #[serde(flatten)]
    pub trigger: TriggerInfos,
    pub links: Links,
}

impl From<TriggerInfos> for TriggerDocument {
    fn from(trigger: TriggerInfos) -> Self {
        let links = Links {
            self_link: trigger.self_link(),
        };
        Self { trigger, links }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemList<T> {
    pub items: Vec<T>,
}

impl<T> ItemList<T> {
    pub fn from_records<R>(records: Vec<R>) -> Self
    where
        T: From<R>,
    {
        Self {
            items: records.into_iter().map(T::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    pub deleted: usize,
}
