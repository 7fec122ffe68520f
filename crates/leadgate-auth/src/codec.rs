//! Session token signing and verification (HS256 JWT).

use crate::claims::{SessionClaims, SessionSubject};
use crate::{Error, Result};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ALG: Algorithm = Algorithm::HS256;

/// Server-held HMAC secret. `Debug` never prints the value.
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap a secret. Empty or blank input is a configuration error.
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(Error::MissingSecret);
        }
        Ok(Self(secret))
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: SessionClaims,
}

/// Signs and verifies session tokens with a single symmetric key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("alg", &ALG)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Keys for `secret`. Infallible; a blank secret is refused by
    /// [`SigningSecret::new`].
    pub fn new(secret: SigningSecret) -> Self {
        let bytes = secret.0.as_bytes();

        let mut validation = Validation::new(ALG);
        validation.leeway = 0;
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Sign a session for `subject`, valid for seven days from now.
    pub fn sign(&self, subject: &SessionSubject) -> Result<SignedToken> {
        self.sign_at(subject, now_unix())
    }

    /// Sign a session issued at `now` (Unix seconds).
    pub fn sign_at(&self, subject: &SessionSubject, now: u64) -> Result<SignedToken> {
        let claims = SessionClaims::issue(subject, now);
        let token = jsonwebtoken::encode(&Header::new(ALG), &claims, &self.encoding)?;
        Ok(SignedToken { token, claims })
    }

    /// Verify `token` against the current clock.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        self.verify_at(token, now_unix())
    }

    /// Verify `token` as of `now` (Unix seconds).
    ///
    /// Malformed input, a bad signature, a missing field and an expired token
    /// all come back as [`Error::InvalidToken`].
    pub fn verify_at(&self, token: &str, now: u64) -> Result<SessionClaims> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "session token failed to decode");
                Error::InvalidToken
            })?;

        if !data.claims.is_live_at(now) {
            tracing::debug!(exp = data.claims.expires_at(), now, "session token expired");
            return Err(Error::InvalidToken);
        }

        Ok(data.claims)
    }
}

/// Current Unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}
