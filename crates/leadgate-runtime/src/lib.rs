use leadgate_api::{
    CredentialStore, LeadgateError, Principal, Profile, Registration, SecretStore,
};
use leadgate_auth::{
    AccessGate, Decision, IssuedSession, RequestParts, RouteTable, SessionClaims, SessionIssuer,
    SessionSubject, SigningSecret, TokenCodec, TokenLocator,
};
use leadgate_connectors::{EnvSecretStore, MemoryCredentialStore};
use leadgate_core::{GateConfig, validate_config};

/// A freshly issued session plus the profile to show the client.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub session: IssuedSession,
    pub profile: Profile,
}

/// The gate and the login/sign-up flows, wired to one secret and one store.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct LeadgateRuntime {
    gate: AccessGate,
    issuer: SessionIssuer,
    codec: TokenCodec,
    api_locator: TokenLocator,
    store: Box<dyn CredentialStore>,
}

impl LeadgateRuntime {
    /// Secret from the environment, accounts in memory.
    pub fn from_config(cfg: &GateConfig) -> Result<Self, LeadgateError> {
        let store = MemoryCredentialStore::new()?;
        Self::from_config_with(cfg, &EnvSecretStore, Box::new(store))
    }

    pub fn from_config_with(
        cfg: &GateConfig,
        secrets: &dyn SecretStore,
        store: Box<dyn CredentialStore>,
    ) -> Result<Self, LeadgateError> {
        validate_config(cfg)?;

        let secret = SigningSecret::new(secrets.get(&cfg.secret_ref)?).map_err(map_auth_error)?;
        let codec = TokenCodec::new(secret);

        let issuer =
            SessionIssuer::new(codec.clone(), cfg.cookie_options()).map_err(map_auth_error)?;
        let routes = RouteTable::compile(&cfg.routes).map_err(map_auth_error)?;
        let gate = AccessGate::new(
            codec.clone(),
            TokenLocator::new(issuer.cookie_name()),
            routes,
            cfg.paths.clone(),
        )
        .map_err(map_auth_error)?;

        Ok(Self {
            gate,
            issuer,
            codec,
            api_locator: TokenLocator::bearer_only(),
            store,
        })
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Run the page gate for one request.
    pub fn evaluate(&self, req: &RequestParts<'_>) -> Decision {
        self.gate.evaluate(req)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<SessionGrant, LeadgateError> {
        let principal = self.store.verify_credentials(email, password)?;
        self.grant(principal)
    }

    pub fn register(&self, registration: &Registration) -> Result<SessionGrant, LeadgateError> {
        let (principal, _tenant) = self.store.register(registration)?;
        self.grant(principal)
    }

    /// Verify the bearer token of an API request.
    pub fn authenticate_api(&self, req: &RequestParts<'_>) -> Result<SessionClaims, LeadgateError> {
        let found = self
            .api_locator
            .locate(req)
            .ok_or_else(|| LeadgateError::Auth("unauthorized".to_string()))?;
        self.codec.verify(found.token).map_err(map_auth_error)
    }

    /// Profile of the caller of an API request.
    pub fn whoami(&self, req: &RequestParts<'_>) -> Result<Profile, LeadgateError> {
        let claims = self.authenticate_api(req)?;
        let principal = self.store.find_principal(claims.subject_id())?;
        Ok(self.profile(principal))
    }

    /// `Set-Cookie` value for logout.
    pub fn logout_cookie(&self) -> Result<String, LeadgateError> {
        self.issuer.clear_cookie().map_err(map_auth_error)
    }

    fn grant(&self, principal: Principal) -> Result<SessionGrant, LeadgateError> {
        let session = self
            .issuer
            .issue(&SessionSubject::from(&principal))
            .map_err(map_auth_error)?;
        Ok(SessionGrant {
            session,
            profile: self.profile(principal),
        })
    }

    fn profile(&self, principal: Principal) -> Profile {
        let tenant = principal
            .tenant_id
            .as_deref()
            .and_then(|id| self.store.find_tenant(id).ok());
        Profile::new(principal, tenant.as_ref())
    }
}

fn map_auth_error(e: leadgate_auth::Error) -> LeadgateError {
    use leadgate_auth::Error;
    match e {
        Error::MissingSecret => LeadgateError::Config(e.to_string()),
        Error::InvalidToken => LeadgateError::Auth("invalid token".to_string()),
        Error::NoTenant => LeadgateError::Auth(e.to_string()),
        Error::Validation(_) | Error::Pattern(_) => LeadgateError::Config(e.to_string()),
        Error::Jwt(_) => LeadgateError::Internal(e.to_string()),
    }
}
