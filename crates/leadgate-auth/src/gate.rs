//! The access decision engine.

use crate::claims::SessionClaims;
use crate::codec::{TokenCodec, now_unix};
use crate::locator::{RequestParts, TokenChannel, TokenLocator};
use crate::route::{RouteClass, RouteTable, normalize_path};
use crate::tenant::TenantScope;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};

/// Where the gate sends people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatePaths {
    /// Login page.
    pub login: String,
    /// Landing page for authenticated users.
    pub home: String,
    /// Query parameter carrying the return target on the login redirect.
    pub return_param: String,
}

impl GatePaths {
    /// Login and home must be absolute paths of visible ASCII, since they end
    /// up in a `Location` header. The return parameter goes into the query
    /// unencoded and is limited to URL unreserved characters.
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [("login", &self.login), ("home", &self.home)] {
            if !p.starts_with('/') {
                return Err(Error::Validation(format!("{name} path must start with /")));
            }
            if !p.chars().all(|c| c.is_ascii_graphic()) {
                return Err(Error::Validation(format!(
                    "{name} path must be visible ASCII: {p:?}"
                )));
            }
        }
        let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
        if self.return_param.is_empty() || !self.return_param.chars().all(unreserved) {
            return Err(Error::Validation(format!(
                "return parameter must be non-empty and use only A-Z a-z 0-9 - . _ ~: {:?}",
                self.return_param
            )));
        }
        Ok(())
    }
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/dashboard".to_string(),
            return_param: "redirect".to_string(),
        }
    }
}

/// One of exactly three results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    RedirectToLogin { location: String },
    RedirectToHome { location: String },
}

impl Outcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, Outcome::Allow)
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        match self {
            Outcome::Allow => None,
            Outcome::RedirectToLogin { location } | Outcome::RedirectToHome { location } => {
                Some(location)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::RedirectToLogin { .. } => "redirect-to-login",
            Outcome::RedirectToHome { .. } => "redirect-to-home",
        }
    }
}

/// What the gate saw of the token. Internal to the host (logs, metrics);
/// it never changes the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Absent,
    Valid(TokenChannel),
    Rejected(TokenChannel),
}

/// Full result of evaluating one request.
#[derive(Debug, Clone)]
pub struct Decision {
    pub outcome: Outcome,
    /// `None` when the path was excluded from the gate.
    pub route: Option<RouteClass>,
    pub token: TokenStatus,
    /// Verified claims, present only when the token was valid.
    pub session: Option<SessionClaims>,
}

impl Decision {
    /// Tenant scope for downstream data access, when the session carries one.
    pub fn tenant_scope(&self) -> Option<TenantScope> {
        self.session.as_ref().and_then(TenantScope::from_claims)
    }
}

/// The decision table, free of any I/O.
///
/// | route              | authenticated | outcome        |
/// |--------------------|---------------|----------------|
/// | public-auth-page   | yes           | home           |
/// | public-auth-page   | no            | allow          |
/// | protected          | yes           | allow          |
/// | protected          | no            | login + return |
/// | unclassified       | either        | allow          |
pub fn decide(route: RouteClass, authenticated: bool, path: &str, paths: &GatePaths) -> Outcome {
    match (route, authenticated) {
        (RouteClass::PublicAuthPage, true) => Outcome::RedirectToHome {
            location: paths.home.clone(),
        },
        (RouteClass::Protected, false) => Outcome::RedirectToLogin {
            location: format!(
                "{}?{}={}",
                paths.login,
                paths.return_param,
                urlencoding::encode(path)
            ),
        },
        (RouteClass::PublicAuthPage, false)
        | (RouteClass::Protected, true)
        | (RouteClass::Unclassified, _) => Outcome::Allow,
    }
}

/// Runs classification, token lookup, verification and the decision table.
#[derive(Debug)]
pub struct AccessGate {
    codec: TokenCodec,
    locator: TokenLocator,
    routes: RouteTable,
    paths: GatePaths,
}

impl AccessGate {
    /// Build a gate. Rejects path settings that would redirect in a loop.
    pub fn new(
        codec: TokenCodec,
        locator: TokenLocator,
        routes: RouteTable,
        paths: GatePaths,
    ) -> Result<Self> {
        paths.validate()?;
        if !routes.is_excluded(&paths.login) && routes.classify(&paths.login) == RouteClass::Protected
        {
            return Err(Error::Validation(format!(
                "login path {} is protected",
                paths.login
            )));
        }
        if !routes.is_excluded(&paths.home)
            && routes.classify(&paths.home) == RouteClass::PublicAuthPage
        {
            return Err(Error::Validation(format!(
                "home path {} is an auth page",
                paths.home
            )));
        }

        Ok(Self {
            codec,
            locator,
            routes,
            paths,
        })
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    pub fn evaluate(&self, req: &RequestParts<'_>) -> Decision {
        self.evaluate_at(req, now_unix())
    }

    pub fn evaluate_at(&self, req: &RequestParts<'_>, now: u64) -> Decision {
        let path = normalize_path(req.path);

        if self.routes.is_excluded(&path) {
            return Decision {
                outcome: Outcome::Allow,
                route: None,
                token: TokenStatus::Absent,
                session: None,
            };
        }

        let route = self.routes.classify(&path);

        let (token, session) = match self.locator.locate(req) {
            None => (TokenStatus::Absent, None),
            Some(found) => match self.codec.verify_at(found.token, now) {
                Ok(claims) => (TokenStatus::Valid(found.channel), Some(claims)),
                Err(_) => {
                    tracing::warn!(
                        path = %path,
                        channel = %found.channel,
                        route = %route,
                        "session token rejected"
                    );
                    (TokenStatus::Rejected(found.channel), None)
                }
            },
        };

        let outcome = decide(route, session.is_some(), &path, &self.paths);
        tracing::debug!(
            path = %path,
            route = %route,
            outcome = outcome.as_str(),
            "gate decision"
        );

        Decision {
            outcome,
            route: Some(route),
            token,
            session,
        }
    }
}
