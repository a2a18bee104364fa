use taskgate_auth::{Principal, Verb};
use taskgate_core::{TenantId, TriggerId};
use taskgate_jobs::{JobRecord, TRIGGERS_DOCTYPE, TriggerInfos, TriggerRequest};

use super::{GatewayError, GatewayResult, JobsGateway};

impl JobsGateway {
    /// Register a new trigger.
    ///
    /// The debounce interval is checked before the scheduler is consulted.
    /// The scheduler then resolves the definition, the caller is authorized
    /// against the resolved trigger, and only then is it persisted, so a
    /// rejected caller never leaves a trigger behind.
    pub fn add_trigger(
        &self,
        principal: &Principal,
        tenant_id: TenantId,
        request: TriggerRequest,
    ) -> GatewayResult<TriggerInfos> {
        request
            .parsed_debounce()
            .map_err(|e| GatewayError::invalid_attribute("debounce", e.to_string()))?;

        let infos = request.into_infos(tenant_id);
        self.scheduler.validate(&infos)?;
        self.permissions.allow(principal, Verb::Post, &infos)?;

        let infos = self.scheduler.add(infos)?;
        tracing::info!(
            tenant_id = %tenant_id,
            trigger_id = %infos.id,
            trigger_type = %infos.trigger_type,
            worker = %infos.worker,
            "trigger created"
        );
        Ok(infos)
    }

    pub fn get_trigger(&self, principal: &Principal, tenant_id: TenantId, trigger_id: TriggerId) -> GatewayResult<TriggerInfos> {
        let infos = self.scheduler.get(tenant_id, trigger_id)?;
        self.permissions.allow(principal, Verb::Get, &infos)?;
        Ok(infos)
    }

    /// All triggers of the tenant, optionally restricted to one worker type.
    ///
    /// An empty filter returns everything; order is the scheduler's.
    pub fn triggers(
        &self,
        principal: &Principal,
        tenant_id: TenantId,
        worker_filter: Option<&str>,
    ) -> GatewayResult<Vec<TriggerInfos>> {
        self.permissions
            .allow_whole_type(principal, Verb::Get, tenant_id, TRIGGERS_DOCTYPE)?;

        let mut all = self.scheduler.get_all(tenant_id)?;
        if let Some(worker) = worker_filter.filter(|w| !w.is_empty()) {
            all.retain(|t| t.worker == worker);
        }
        Ok(all)
    }

    pub fn delete_trigger(&self, principal: &Principal, tenant_id: TenantId, trigger_id: TriggerId) -> GatewayResult<()> {
        let infos = self.scheduler.get(tenant_id, trigger_id)?;
        self.permissions.allow(principal, Verb::Delete, &infos)?;
        self.scheduler.delete(tenant_id, trigger_id)?;
        tracing::info!(tenant_id = %tenant_id, trigger_id = %trigger_id, "trigger deleted");
        Ok(())
    }

    /// Enqueue the trigger's job right now.
    ///
    /// Goes straight to the broker: debounce and firing conditions do not
    /// apply to a manual launch.
    pub fn launch_trigger(&self, principal: &Principal, tenant_id: TenantId, trigger_id: TriggerId) -> GatewayResult<JobRecord> {
        let infos = self.scheduler.get(tenant_id, trigger_id)?;
        self.permissions.allow(principal, Verb::Post, &infos)?;

        let job = self.enqueue(infos.job_request())?;
        tracing::info!(
            tenant_id = %tenant_id,
            trigger_id = %trigger_id,
            job_id = %job.id,
            "trigger launched"
        );
        Ok(job)
    }
}
