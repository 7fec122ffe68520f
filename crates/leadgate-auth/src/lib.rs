//! leadgate-auth
//!
//! The session gate that runs in front of every dashboard request.
//! It covers five pieces that always travel together:
//!
//! - **Signing and verifying session tokens** (HS256, fixed seven day lifetime)
//! - **Locating a token** on a request (cookie first, then `Authorization: Bearer`)
//! - **Classifying routes** into auth pages, protected pages and everything else
//! - **Deciding access**: allow, redirect to login with a return target, or redirect home
//! - **Issuing sessions** with a cookie whose expiry matches the token
//!
//! Verified claims are the only source of a [`TenantScope`], the value every
//! downstream data call is scoped by.
//!
//! ## Quick start
//! ```no_run
//! use leadgate_auth::{AccessGate, GatePaths, RequestParts, RouteRules, RouteTable,
//!     SigningSecret, TokenCodec, TokenLocator};
//!
//! # fn demo() -> leadgate_auth::Result<()> {
//! let codec = TokenCodec::new(SigningSecret::new("change me")?);
//! let routes = RouteTable::compile(&RouteRules::default())?;
//! let gate = AccessGate::new(codec, TokenLocator::new("auth_token"), routes, GatePaths::default())?;
//!
//! let decision = gate.evaluate(&RequestParts::new("/dashboard/leads"));
//! assert_eq!(decision.outcome.location(), Some("/login?redirect=%2Fdashboard%2Fleads"));
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod claims;
mod codec;
mod cookie;
mod error;
mod gate;
mod issuer;
mod locator;
mod route;
mod tenant;

pub use claims::{SESSION_TTL_SECS, SessionClaims, SessionSubject};
pub use codec::{SignedToken, SigningSecret, TokenCodec, now_unix};
pub use cookie::{CookieOptions, SameSite, build_clear_cookie, build_session_cookie};
pub use error::{Error, Result};
pub use gate::{AccessGate, Decision, GatePaths, Outcome, TokenStatus, decide};
pub use issuer::{IssuedSession, SessionIssuer};
pub use locator::{
    BearerExtractor, CookieExtractor, LocatedToken, RequestParts, TokenChannel, TokenExtractor,
    TokenLocator,
};
pub use route::{RouteClass, RouteRules, RouteTable, normalize_path};
pub use tenant::TenantScope;
