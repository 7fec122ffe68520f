//! Cookie helpers.

use crate::{Error, Result};
use httpdate::fmt_http_date;
use std::time::{Duration, UNIX_EPOCH};

/// Name shared by the session cookie writer and the token locator.
pub const DEFAULT_COOKIE_NAME: &str = "auth_token";

/// SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// SameSite=Strict
    Strict,
    /// SameSite=Lax
    Lax,
    /// SameSite=None
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Options used to build the session cookie.
///
/// The cookie is never `HttpOnly`: client script reads it to send the same
/// token as a bearer header.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Cookie name.
    pub name: String,

    /// Cookie path.
    pub path: String,

    /// Optional cookie domain. Host-only when `None`.
    pub domain: Option<String>,

    /// Send on HTTPS only.
    pub secure: bool,

    /// SameSite attribute.
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieOptions {
    /// Defaults with `Secure` set only for production deployments.
    pub fn for_deployment(name: impl Into<String>, production: bool) -> Self {
        Self {
            name: name.into(),
            secure: production,
            ..Self::default()
        }
    }

    /// Check the name and attribute combination.
    pub fn validate(&self) -> Result<()> {
        if !is_cookie_token(&self.name) {
            return Err(Error::Validation(format!(
                "invalid cookie name: {:?}",
                self.name
            )));
        }
        if let Some(domain) = &self.domain {
            let ok = !domain.is_empty()
                && domain
                    .chars()
                    .all(|c| c.is_ascii_graphic() && c != ';' && c != ',');
            if !ok {
                return Err(Error::Validation(format!("invalid cookie domain: {domain:?}")));
            }
        }
        if !self.path.starts_with('/') {
            return Err(Error::Validation("cookie path must start with /".to_string()));
        }
        if self.same_site == SameSite::None && !self.secure {
            return Err(Error::Validation(
                "SameSite=None cookies must be Secure".to_string(),
            ));
        }
        Ok(())
    }

    fn attributes(&self, parts: &mut Vec<String>) {
        parts.push(format!("Path={}", self.path));

        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }

        if self.secure {
            parts.push("Secure".to_string());
        }

        parts.push(format!("SameSite={}", self.same_site.as_str()));
    }
}

/// Build the session `Set-Cookie` header value.
///
/// `expires_at` is the token's `exp` (Unix seconds); the cookie carries no
/// lifetime of its own.
pub fn build_session_cookie(value: &str, expires_at: u64, opts: &CookieOptions) -> Result<String> {
    opts.validate()?;

    let mut parts: Vec<String> = Vec::new();
    parts.push(format!("{}={value}", opts.name));
    opts.attributes(&mut parts);

    let expires = UNIX_EPOCH + Duration::from_secs(expires_at);
    parts.push(format!("Expires={}", fmt_http_date(expires)));

    Ok(parts.join("; "))
}

/// Build a `Set-Cookie` header value that clears the session cookie.
pub fn build_clear_cookie(opts: &CookieOptions) -> Result<String> {
    opts.validate()?;

    let mut parts: Vec<String> = Vec::new();
    parts.push(format!("{}=", opts.name));
    opts.attributes(&mut parts);
    parts.push("Max-Age=0".to_string());
    parts.push(format!("Expires={}", fmt_http_date(UNIX_EPOCH)));

    Ok(parts.join("; "))
}

// RFC 6265 cookie-name: a token, i.e. visible ASCII minus separators.
fn is_cookie_token(name: &str) -> bool {
    const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(c))
}
