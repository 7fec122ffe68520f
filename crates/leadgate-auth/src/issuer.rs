//! Minting sessions after a successful credential check.

use crate::claims::{SessionClaims, SessionSubject};
use crate::codec::{TokenCodec, now_unix};
use crate::cookie::{CookieOptions, build_clear_cookie, build_session_cookie};
use crate::Result;

/// What the login/sign-up flow hands back to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Raw token, for header-based use.
    pub token: String,
    pub claims: SessionClaims,
    /// `Set-Cookie` value carrying the same token, expiring with it.
    pub set_cookie: String,
}

#[derive(Debug, Clone)]
pub struct SessionIssuer {
    codec: TokenCodec,
    cookie: CookieOptions,
}

impl SessionIssuer {
    pub fn new(codec: TokenCodec, cookie: CookieOptions) -> Result<Self> {
        cookie.validate()?;
        Ok(Self { codec, cookie })
    }

    /// The cookie name a [`crate::TokenLocator`] must read.
    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    /// Mint a session for a principal whose credentials were just checked.
    /// Build the subject with `SessionSubject::from(&principal)`.
    pub fn issue(&self, subject: &SessionSubject) -> Result<IssuedSession> {
        self.issue_at(subject, now_unix())
    }

    pub fn issue_at(&self, subject: &SessionSubject, now: u64) -> Result<IssuedSession> {
        let signed = self.codec.sign_at(subject, now)?;
        // Cookie expiry comes from the claims, never from a second clock read.
        let set_cookie =
            build_session_cookie(&signed.token, signed.claims.expires_at(), &self.cookie)?;

        tracing::info!(
            subject = signed.claims.subject_id(),
            tenant = signed.claims.tenant_id().unwrap_or("-"),
            expires_at = signed.claims.expires_at(),
            "session issued"
        );

        Ok(IssuedSession {
            token: signed.token,
            claims: signed.claims,
            set_cookie,
        })
    }

    /// `Set-Cookie` value that removes the session cookie. Logout is client-side
    /// only; the token itself stays valid until it expires.
    pub fn clear_cookie(&self) -> Result<String> {
        build_clear_cookie(&self.cookie)
    }
}
