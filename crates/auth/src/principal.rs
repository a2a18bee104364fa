use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use taskgate_core::TenantId;

use crate::{Permission, Role};

/// Identity of an authenticated principal (human user, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A principal's membership in a tenant.
///
/// States *which tenant* the principal acts within and which roles and
/// permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives the
/// membership from token claims and its role mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Principal acting in its own tenant with the given grants.
    pub fn new(principal_id: PrincipalId, tenant_id: TenantId, permissions: Vec<Permission>) -> Self {
        Self {
            principal_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: Vec::new(),
                permissions,
            },
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.membership.roles = roles;
        self
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.membership.permissions
    }
}
