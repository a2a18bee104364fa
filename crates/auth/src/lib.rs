//! `taskgate-auth`: pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage. Callers build a
//! [`Principal`] from verified claims, then ask a [`PermissionChecker`] whether
//! a verb may be applied to a [`Resource`].

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod resource;
pub mod roles;

pub use authorize::{AuthzError, PermissionChecker, RulePermissionChecker};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::{Permission, PermissionRule, Verb, Verbs};
pub use principal::{Principal, PrincipalId, TenantMembership};
pub use resource::Resource;
pub use roles::Role;
