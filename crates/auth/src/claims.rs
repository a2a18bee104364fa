use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskgate_core::TenantId;

use crate::{Permission, Principal, PrincipalId, Role, TenantMembership};

/// JWT claims model (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Tenant context for the token.
    pub tenant_id: TenantId,

    /// RBAC roles granted within the tenant context.
    pub roles: Vec<Role>,

    /// Explicit grants on top of the roles.
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    /// Resolve the principal these claims describe, expanding roles into grants.
    pub fn principal(&self) -> Principal {
        let mut permissions: Vec<Permission> = self.roles.iter().flat_map(Role::grants).collect();
        for p in &self.permissions {
            if !permissions.contains(p) {
                permissions.push(p.clone());
            }
        }

        Principal {
            principal_id: self.sub,
            active_tenant_id: self.tenant_id,
            membership: TenantMembership {
                tenant_id: self.tenant_id,
                roles: self.roles.clone(),
                permissions,
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims.
///
/// This validates the *claims* only; signature checks live in [`JwtValidator`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Decodes and verifies a bearer token.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator with a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            key: DecodingKey::from_secret(&secret),
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Expiry lives in `expires_at`, checked by `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::JOBS_VIEWER],
            permissions: vec![Permission::new("jobs:POST:worker:log")],
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    fn mint(secret: &[u8], claims: &JwtClaims) -> String {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let now = Utc::now();
        let c = claims(now);
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());

        let decoded = validator.validate(&mint(b"s3cret", &c), now).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new(b"right".to_vec());
        let err = validator.validate(&mint(b"wrong", &claims(now)), now).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new(b"k".to_vec());
        let token = mint(b"k", &claims(now));
        let err = validator.validate(&token, now + Duration::minutes(10)).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn principal_merges_role_grants_and_explicit_permissions() {
        let c = claims(Utc::now());
        let p = c.principal();
        let perms: Vec<&str> = p.permissions().iter().map(|p| p.as_str()).collect();
        assert_eq!(perms, vec!["jobs:GET", "triggers:GET", "jobs:POST:worker:log"]);
        assert_eq!(p.active_tenant_id, c.tenant_id);
    }
}
