//! Triggers: persistent rules that produce job requests.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use taskgate_auth::Resource;
use taskgate_core::{DomainResult, TenantId, TriggerId, parse_duration};

use crate::job::JobRequest;
use crate::payload::{JobOptions, Message};

pub const TRIGGERS_DOCTYPE: &str = "triggers";

/// Client request to register a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default)]
    pub arguments: String,
    pub worker: String,
    #[serde(default)]
    pub worker_arguments: Option<Message>,
    #[serde(default)]
    pub debounce: Option<String>,
    #[serde(default)]
    pub options: Option<JobOptions>,
}

impl TriggerRequest {
    /// Debounce value, treating an empty string as absent.
    pub fn debounce(&self) -> Option<&str> {
        self.debounce.as_deref().filter(|d| !d.is_empty())
    }

    /// Parse the debounce interval, if any.
    pub fn parsed_debounce(&self) -> DomainResult<Option<TimeDelta>> {
        self.debounce().map(parse_duration).transpose()
    }

    /// Build the trigger definition for `tenant_id` with a fresh identifier.
    pub fn into_infos(self, tenant_id: TenantId) -> TriggerInfos {
        let debounce = self.debounce().map(str::to_string);
        TriggerInfos {
            id: TriggerId::new(),
            tenant_id,
            trigger_type: self.trigger_type,
            arguments: self.arguments,
            worker: self.worker,
            message: self.worker_arguments,
            debounce,
            options: self.options,
        }
    }
}

/// Trigger definition as persisted by the scheduler.
///
/// Triggers are never updated in place; changing one means deleting and
/// recreating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfos {
    #[serde(rename = "_id")]
    pub id: TriggerId,
    pub tenant_id: TenantId,
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub arguments: String,
    pub worker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
}

impl TriggerInfos {
    /// Template request enqueued whenever the trigger fires or is launched.
    pub fn job_request(&self) -> JobRequest {
        JobRequest {
            tenant_id: self.tenant_id,
            worker: self.worker.clone(),
            message: self.message.clone(),
            options: self.options.clone(),
        }
    }

    pub fn self_link(&self) -> String {
        format!("/jobs/triggers/{}", self.id)
    }
}

impl Resource for TriggerInfos {
    fn doc_type(&self) -> &str {
        TRIGGERS_DOCTYPE
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
            "type" => Some(self.trigger_type.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use taskgate_core::DomainError;

    use super::*;

    fn request(debounce: Option<&str>) -> TriggerRequest {
        TriggerRequest {
            trigger_type: "@event".to_string(),
            arguments: "files:CREATED".to_string(),
            worker: "thumbnail".to_string(),
            worker_arguments: Some(Message::from_json(r#"{"size":"large"}"#).unwrap()),
            debounce: debounce.map(str::to_string),
            options: Some(JobOptions::from_json(r#"{"max_exec_count":2}"#).unwrap()),
        }
    }

    #[test]
    fn body_uses_wire_field_names() {
        let body = r#"{
            "type": "@every",
            "arguments": "10m",
            "worker": "log",
            "worker_arguments": {"level": "info"},
            "debounce": "5s"
        }"#;
        let req: TriggerRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.trigger_type, "@every");
        assert_eq!(req.worker_arguments.unwrap().as_str(), r#"{"level": "info"}"#);
        assert_eq!(req.debounce.as_deref(), Some("5s"));
        assert!(req.options.is_none());
    }

    #[test]
    fn debounce_validation() {
        assert_eq!(request(None).parsed_debounce().unwrap(), None);
        assert_eq!(request(Some("")).parsed_debounce().unwrap(), None);
        assert_eq!(
            request(Some("1m30s")).parsed_debounce().unwrap(),
            Some(TimeDelta::seconds(90))
        );
        assert!(matches!(
            request(Some("not-a-duration")).parsed_debounce(),
            Err(DomainError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn empty_debounce_is_not_stored() {
        let infos = request(Some("")).into_infos(TenantId::new());
        assert_eq!(infos.debounce, None);
    }

    #[test]
    fn job_request_copies_the_template() {
        let tenant = TenantId::new();
        let infos = request(Some("10s")).into_infos(tenant);
        let job = infos.job_request();

        assert_eq!(job.tenant_id, tenant);
        assert_eq!(job.worker, "thumbnail");
        assert_eq!(job.message, infos.message);
        assert_eq!(job.options, infos.options);
    }

    proptest! {
        #[test]
        fn launch_request_round_trips_byte_for_byte(
            worker in "[a-z][a-z0-9-]{0,15}",
            key in "[a-z]{1,8}",
            text in "[ -~]{0,32}",
            spacing in prop::sample::select(vec!["", " ", "\n  "]),
        ) {
            let raw_args = format!("{{{spacing}\"{key}\":{}}}", serde_json::to_string(&text).unwrap());
            let mut req = request(None);
            req.worker = worker;
            req.worker_arguments = Some(Message::from_json(raw_args.clone()).unwrap());

            let launched = req.into_infos(TenantId::new()).job_request();
            let encoded = serde_json::to_string(&launched).unwrap();
            let decoded: JobRequest = serde_json::from_str(&encoded).unwrap();

            prop_assert_eq!(&decoded.worker, &launched.worker);
            prop_assert_eq!(decoded.message.as_ref().map(Message::as_str), Some(raw_args.as_str()));
            prop_assert_eq!(&decoded.options, &launched.options);
        }
    }
}
