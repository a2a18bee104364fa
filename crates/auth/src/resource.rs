//! Capability-bearing resources checked by the permission engine.

use taskgate_core::TenantId;

/// A resource the permission engine can reason about.
///
/// Jobs, job requests, queues and triggers all implement this so a single
/// `allow(verb, resource)` call covers every resource kind.
pub trait Resource {
    /// Doctype the resource belongs to (e.g. `"jobs"`, `"triggers"`).
    fn doc_type(&self) -> &str;

    /// Identifier of the resource, when it already has one.
    fn resource_id(&self) -> Option<String>;

    /// Tenant owning the resource.
    fn tenant_id(&self) -> TenantId;

    /// Value of a selectable field, used by permission selectors.
    fn field(&self, key: &str) -> Option<String>;
}
