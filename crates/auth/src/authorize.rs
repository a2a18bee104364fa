use thiserror::Error;

use taskgate_core::TenantId;

use crate::{Permission, PermissionRule, Principal, Resource, Verb};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: no permission for {0}")]
    Forbidden(String),
}

/// Permission engine consulted by the gateway before touching a resource.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub trait PermissionChecker: Send + Sync {
    /// Check that `principal` may apply `verb` to this specific resource.
    fn allow(&self, principal: &Principal, verb: Verb, resource: &dyn Resource) -> Result<(), AuthzError>;

    /// Check that `principal` may apply `verb` to every resource of `doc_type`
    /// owned by `tenant_id`.
    ///
    /// Selector-restricted grants do not satisfy a whole-type check.
    fn allow_whole_type(
        &self,
        principal: &Principal,
        verb: Verb,
        tenant_id: TenantId,
        doc_type: &str,
    ) -> Result<(), AuthzError>;
}

/// Checker that evaluates the principal's [`Permission`] rules.
#[derive(Debug, Default, Copy, Clone)]
pub struct RulePermissionChecker;

impl RulePermissionChecker {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionChecker for RulePermissionChecker {
    fn allow(&self, principal: &Principal, verb: Verb, resource: &dyn Resource) -> Result<(), AuthzError> {
        check_tenant(principal)?;
        if resource.tenant_id() != principal.active_tenant_id {
            return Err(AuthzError::TenantMismatch);
        }

        let granted = rules(principal).any(|rule| match rule {
            PermissionRule::Wildcard => true,
            PermissionRule::Scoped { doc_type, verbs, selector } => {
                doc_type == resource.doc_type()
                    && verbs.contains(verb)
                    && selector_matches(selector.as_ref(), resource)
            }
        });

        if granted {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(describe(verb, resource.doc_type(), resource.resource_id())))
        }
    }

    fn allow_whole_type(
        &self,
        principal: &Principal,
        verb: Verb,
        tenant_id: TenantId,
        doc_type: &str,
    ) -> Result<(), AuthzError> {
        check_tenant(principal)?;
        if tenant_id != principal.active_tenant_id {
            return Err(AuthzError::TenantMismatch);
        }

        let granted = rules(principal).any(|rule| match rule {
            PermissionRule::Wildcard => true,
            PermissionRule::Scoped { doc_type: d, verbs, selector } => {
                d == doc_type && verbs.contains(verb) && selector.is_none()
            }
        });

        if granted {
            Ok(())
        } else {
            Err(AuthzError::Forbidden(describe(verb, doc_type, None)))
        }
    }
}

fn check_tenant(principal: &Principal) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }
    Ok(())
}

fn rules(principal: &Principal) -> impl Iterator<Item = PermissionRule> + '_ {
    principal.permissions().iter().filter_map(|p: &Permission| {
        let rule = p.rule();
        if rule.is_none() {
            tracing::debug!(permission = %p, "ignoring malformed permission");
        }
        rule
    })
}

fn selector_matches(selector: Option<&(String, Vec<String>)>, resource: &dyn Resource) -> bool {
    let Some((field, values)) = selector else {
        return true;
    };
    let actual = if field == "id" {
        resource.resource_id()
    } else {
        resource.field(field)
    };
    actual.is_some_and(|v| values.iter().any(|allowed| *allowed == v))
}

fn describe(verb: Verb, doc_type: &str, id: Option<String>) -> String {
    match id {
        Some(id) => format!("{verb} {doc_type}/{id}"),
        None => format!("{verb} {doc_type}"),
    }
}
