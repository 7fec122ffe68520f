//! Session claims.

use leadgate_api::{Principal, PrincipalId, TenantId};
use serde::{Deserialize, Serialize};

/// Fixed session lifetime: seven days.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Who a session is for. Input to signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub subject_id: PrincipalId,
    pub email: String,
    pub tenant_id: Option<TenantId>,
}

impl From<&Principal> for SessionSubject {
    fn from(p: &Principal) -> Self {
        Self {
            subject_id: p.id.clone(),
            email: p.email.clone(),
            tenant_id: p.tenant_id.clone(),
        }
    }
}

/// The claim set carried inside a session token.
///
/// Only [`crate::TokenCodec`] builds these, either while signing or after a
/// successful verification, so holding one means the signature checked out.
/// Fields are read-only; changing any of them means minting a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    subject_id: PrincipalId,
    email: String,
    #[serde(
        rename = "tenantId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    tenant_id: Option<TenantId>,
    iat: u64,
    exp: u64,
}

impl SessionClaims {
    pub(crate) fn issue(subject: &SessionSubject, issued_at: u64) -> Self {
        Self {
            subject_id: subject.subject_id.clone(),
            email: subject.email.clone(),
            tenant_id: subject.tenant_id.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(SESSION_TTL_SECS),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Issue time, Unix seconds.
    pub fn issued_at(&self) -> u64 {
        self.iat
    }

    /// Expiry, Unix seconds. The token is valid strictly before this instant.
    pub fn expires_at(&self) -> u64 {
        self.exp
    }

    pub(crate) fn is_live_at(&self, now: u64) -> bool {
        now < self.exp
    }
}
