//! Trigger scheduler: validates and stores trigger definitions.
//!
//! Firing triggers on time or events belongs to the scheduler's runtime and
//! is not modelled here; the gateway only registers, looks up and removes
//! definitions.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use taskgate_core::{TenantId, TriggerId, parse_duration};
use taskgate_jobs::TriggerInfos;

/// Trigger scheduler abstraction.
pub trait Scheduler: Send + Sync {
    /// Resolve a trigger definition without persisting it.
    fn validate(&self, infos: &TriggerInfos) -> Result<TriggerKind, SchedulerError>;

    /// Validate and persist a trigger.
    fn add(&self, infos: TriggerInfos) -> Result<TriggerInfos, SchedulerError>;

    fn get(&self, tenant_id: TenantId, trigger_id: TriggerId) -> Result<TriggerInfos, SchedulerError>;

    /// All triggers of a tenant, in registration order.
    fn get_all(&self, tenant_id: TenantId) -> Result<Vec<TriggerInfos>, SchedulerError>;

    fn delete(&self, tenant_id: TenantId, trigger_id: TriggerId) -> Result<(), SchedulerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("trigger not found: {0}")]
    NotFound(TriggerId),
    #[error("unknown trigger type: {0}")]
    UnknownTrigger(String),
    #[error("invalid arguments for {trigger_type} trigger: {reason}")]
    InvalidArguments { trigger_type: String, reason: String },
    #[error("trigger already exists: {0}")]
    AlreadyExists(TriggerId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Resolved trigger type with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    /// Fires once at a fixed instant.
    At(DateTime<Utc>),
    /// Fires once after a delay from registration.
    In(TimeDelta),
    /// Fires periodically.
    Every(TimeDelta),
    /// Fires on a cron schedule (seconds precision).
    Cron(String),
    /// Fires when a matching event is published.
    Event(Vec<String>),
}

impl TriggerKind {
    pub fn parse(trigger_type: &str, arguments: &str) -> Result<Self, SchedulerError> {
        let invalid = |reason: String| SchedulerError::InvalidArguments {
            trigger_type: trigger_type.to_string(),
            reason,
        };

        match trigger_type {
            "@at" => DateTime::parse_from_rfc3339(arguments.trim())
                .map(|at| TriggerKind::At(at.with_timezone(&Utc)))
                .map_err(|e| invalid(e.to_string())),
            "@in" => parse_duration(arguments.trim())
                .map(TriggerKind::In)
                .map_err(|e| invalid(e.to_string())),
            "@every" => {
                let every = parse_duration(arguments.trim()).map_err(|e| invalid(e.to_string()))?;
                if every <= TimeDelta::zero() {
                    return Err(invalid(format!("period must be positive, got {}", arguments.trim())));
                }
                Ok(TriggerKind::Every(every))
            }
            "@cron" => validate_cron(arguments)
                .map(TriggerKind::Cron)
                .map_err(invalid),
            "@event" => {
                let selectors: Vec<String> = arguments
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if selectors.is_empty() {
                    return Err(invalid("missing event selector".to_string()));
                }
                Ok(TriggerKind::Event(selectors))
            }
            other => Err(SchedulerError::UnknownTrigger(other.to_string())),
        }
    }
}

const CRON_PRESETS: &[&str] = &[
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

const MONTH_NAMES: &[&str] = &["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];
const DAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Bounds of one cron field; `names[i]` stands for `min + i`.
struct CronField {
    min: u32,
    max: u32,
    names: &'static [&'static str],
}

// seconds, minutes, hours, day of month, month, day of week (7 is Sunday too)
const CRON_FIELDS: [CronField; 6] = [
    CronField { min: 0, max: 59, names: &[] },
    CronField { min: 0, max: 59, names: &[] },
    CronField { min: 0, max: 23, names: &[] },
    CronField { min: 1, max: 31, names: &[] },
    CronField { min: 1, max: 12, names: MONTH_NAMES },
    CronField { min: 0, max: 7, names: DAY_NAMES },
];

/// Check a 6-field cron spec (or a preset), returning it normalized.
fn validate_cron(spec: &str) -> Result<String, String> {
    let spec = spec.trim();
    if CRON_PRESETS.contains(&spec) {
        return Ok(spec.to_string());
    }

    let fields: Vec<&str> = spec.split_whitespace().collect();
    if fields.len() != CRON_FIELDS.len() {
        return Err(format!("expected 6 fields, got {}", fields.len()));
    }
    for (field, bounds) in fields.iter().zip(&CRON_FIELDS) {
        for part in field.split(',') {
            validate_cron_part(part, bounds).map_err(|e| format!("field {field:?}: {e}"))?;
        }
    }
    Ok(fields.join(" "))
}

fn validate_cron_part(part: &str, field: &CronField) -> Result<(), String> {
    let CronField { min, max, names } = *field;
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (part, None),
    };

    if let Some(step) = step {
        let step: u32 = step.parse().map_err(|_| format!("bad step {step:?}"))?;
        if step == 0 {
            return Err("step must be positive".to_string());
        }
    }

    if range == "*" || range == "?" {
        return Ok(());
    }

    let bound = |v: &str| -> Result<u32, String> {
        let n: u32 = match names.iter().position(|name| name.eq_ignore_ascii_case(v)) {
            Some(i) => min + i as u32,
            None => v.parse().map_err(|_| format!("bad value {v:?}"))?,
        };
        if n < min || n > max {
            return Err(format!("{n} out of range {min}-{max}"));
        }
        Ok(n)
    };

    match range.split_once('-') {
        Some((lo, hi)) => {
            if bound(lo)? > bound(hi)? {
                return Err(format!("inverted range {range:?}"));
            }
            Ok(())
        }
        None => bound(range).map(|_| ()),
    }
}

/// In-memory scheduler for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    triggers: RwLock<HashMap<TenantId, Vec<TriggerInfos>>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for InMemoryScheduler {
    fn validate(&self, infos: &TriggerInfos) -> Result<TriggerKind, SchedulerError> {
        TriggerKind::parse(&infos.trigger_type, &infos.arguments)
    }

    fn add(&self, infos: TriggerInfos) -> Result<TriggerInfos, SchedulerError> {
        self.validate(&infos)?;

        let mut triggers = self.triggers.write();
        let tenant = triggers.entry(infos.tenant_id).or_default();
        if tenant.iter().any(|t| t.id == infos.id) {
            return Err(SchedulerError::AlreadyExists(infos.id));
        }
        tenant.push(infos.clone());
        Ok(infos)
    }

    fn get(&self, tenant_id: TenantId, trigger_id: TriggerId) -> Result<TriggerInfos, SchedulerError> {
        self.triggers
            .read()
            .get(&tenant_id)
            .and_then(|ts| ts.iter().find(|t| t.id == trigger_id))
            .cloned()
            .ok_or(SchedulerError::NotFound(trigger_id))
    }

    fn get_all(&self, tenant_id: TenantId) -> Result<Vec<TriggerInfos>, SchedulerError> {
        Ok(self
            .triggers
            .read()
            .get(&tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete(&self, tenant_id: TenantId, trigger_id: TriggerId) -> Result<(), SchedulerError> {
        let mut triggers = self.triggers.write();
        let tenant = triggers
            .get_mut(&tenant_id)
            .ok_or(SchedulerError::NotFound(trigger_id))?;
        let pos = tenant
            .iter()
            .position(|t| t.id == trigger_id)
            .ok_or(SchedulerError::NotFound(trigger_id))?;
        tenant.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use taskgate_jobs::TriggerRequest;

    use super::*;

    fn infos(tenant: TenantId, trigger_type: &str, arguments: &str) -> TriggerInfos {
        TriggerRequest {
            trigger_type: trigger_type.to_string(),
            arguments: arguments.to_string(),
            worker: "log".to_string(),
            worker_arguments: None,
            debounce: None,
            options: None,
        }
        .into_infos(tenant)
    }

    #[test]
    fn parses_known_trigger_types() {
        assert!(matches!(
            TriggerKind::parse("@at", "2026-01-02T03:04:05Z"),
            Ok(TriggerKind::At(_))
        ));
        assert_eq!(TriggerKind::parse("@in", "10m").unwrap(), TriggerKind::In(TimeDelta::minutes(10)));
        assert_eq!(
            TriggerKind::parse("@every", "1h30m").unwrap(),
            TriggerKind::Every(TimeDelta::minutes(90))
        );
        assert_eq!(
            TriggerKind::parse("@cron", "0  */5 * * * 1-5").unwrap(),
            TriggerKind::Cron("0 */5 * * * 1-5".to_string())
        );
        assert_eq!(
            TriggerKind::parse("@cron", "0 30 9 * jan-Jun MON-FRI").unwrap(),
            TriggerKind::Cron("0 30 9 * jan-Jun MON-FRI".to_string())
        );
        assert!(TriggerKind::parse("@cron", "0 0 0 * * 7").is_ok());
        assert_eq!(
            TriggerKind::parse("@cron", "@daily").unwrap(),
            TriggerKind::Cron("@daily".to_string())
        );
        assert_eq!(
            TriggerKind::parse("@event", "io.cozy.files:CREATED").unwrap(),
            TriggerKind::Event(vec!["io.cozy.files:CREATED".to_string()])
        );
    }

    #[test]
    fn unknown_type_is_distinct_from_bad_arguments() {
        assert_eq!(
            TriggerKind::parse("@sometimes", "").unwrap_err(),
            SchedulerError::UnknownTrigger("@sometimes".to_string())
        );
        for (ty, args) in [
            ("@at", "tomorrow"),
            ("@in", "soon"),
            ("@every", "0s"),
            ("@every", "-5m"),
            ("@cron", "* * * * *"),
            ("@cron", "61 * * * * *"),
            ("@cron", "0 0 12 * * 5-1"),
            ("@cron", "*/0 * * * * *"),
            ("@cron", "0 0 0 * * 8"),
            ("@cron", "0 0 0 * MON *"),
            ("@cron", "0 0 0 * DEC-JAN *"),
            ("@event", "   "),
        ] {
            assert!(
                matches!(TriggerKind::parse(ty, args), Err(SchedulerError::InvalidArguments { .. })),
                "{ty} {args:?} should be rejected"
            );
        }
    }

    #[test]
    fn add_get_delete() {
        let scheduler = InMemoryScheduler::new();
        let tenant = TenantId::new();
        let t = scheduler.add(infos(tenant, "@every", "5m")).unwrap();

        assert_eq!(scheduler.get(tenant, t.id).unwrap(), t);
        assert_eq!(scheduler.get(TenantId::new(), t.id), Err(SchedulerError::NotFound(t.id)));

        scheduler.delete(tenant, t.id).unwrap();
        assert_eq!(scheduler.get(tenant, t.id), Err(SchedulerError::NotFound(t.id)));
        assert_eq!(scheduler.delete(tenant, t.id), Err(SchedulerError::NotFound(t.id)));
    }

    #[test]
    fn add_rejects_invalid_definitions() {
        let scheduler = InMemoryScheduler::new();
        let tenant = TenantId::new();
        assert!(scheduler.add(infos(tenant, "@nope", "")).is_err());
        assert!(scheduler.get_all(tenant).unwrap().is_empty());

        let t = scheduler.add(infos(tenant, "@in", "1s")).unwrap();
        assert_eq!(scheduler.add(t.clone()), Err(SchedulerError::AlreadyExists(t.id)));
    }

    #[test]
    fn get_all_keeps_registration_order() {
        let scheduler = InMemoryScheduler::new();
        let tenant = TenantId::new();
        let ids: Vec<TriggerId> = ["1m", "2m", "3m"]
            .iter()
            .map(|a| scheduler.add(infos(tenant, "@every", a)).unwrap().id)
            .collect();

        let listed: Vec<TriggerId> = scheduler.get_all(tenant).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
    }
}
