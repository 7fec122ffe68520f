//! Tenant scope derived from verified claims.

use crate::claims::SessionClaims;
use crate::{Error, Result};

/// The tenant every downstream data call must be scoped to.
///
/// Built only from [`SessionClaims`], which in turn only exist after signing or
/// successful verification. There is no way to make one from a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope {
    tenant_id: String,
}

impl TenantScope {
    /// Scope for the session, or `None` for a principal without a tenant.
    pub fn from_claims(claims: &SessionClaims) -> Option<Self> {
        claims.tenant_id().map(|t| Self {
            tenant_id: t.to_string(),
        })
    }

    /// Like [`TenantScope::from_claims`] but an error when unbound.
    pub fn require(claims: &SessionClaims) -> Result<Self> {
        Self::from_claims(claims).ok_or(Error::NoTenant)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::SessionSubject;

    fn claims(tenant: Option<&str>) -> SessionClaims {
        SessionClaims::issue(
            &SessionSubject {
                subject_id: "u1".to_string(),
                email: "a@b.co".to_string(),
                tenant_id: tenant.map(ToString::to_string),
            },
            0,
        )
    }

    #[test]
    fn scope_from_bound_session() {
        let scope = TenantScope::require(&claims(Some("acme"))).unwrap();
        assert_eq!(scope.tenant_id(), "acme");
    }

    #[test]
    fn unbound_session_has_no_scope() {
        assert!(TenantScope::from_claims(&claims(None)).is_none());
        assert!(matches!(TenantScope::require(&claims(None)), Err(Error::NoTenant)));
    }
}
