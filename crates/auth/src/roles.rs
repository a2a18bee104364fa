use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; [`Role::grants`] holds the built-in
/// mapping, and tokens may add explicit permissions on top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const JOBS_VIEWER: Role = Role(Cow::Borrowed("jobs-viewer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by this role within the current tenant.
    pub fn grants(&self) -> Vec<Permission> {
        match self.as_str() {
            "admin" => vec![Permission::new("*")],
            "jobs-viewer" => vec![
                Permission::new("jobs:GET"),
                Permission::new("triggers:GET"),
            ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
