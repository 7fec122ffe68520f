use std::collections::BTreeMap;
use std::sync::RwLock;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use leadgate_api::{
    CredentialStore, LeadgateError, Principal, Registration, Role, SecretStore, Tenant,
    normalize_email,
};
use password_hash::{PasswordHash, SaltString};

const INVALID_CREDENTIALS: &str = "invalid email or password";

pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, LeadgateError> {
        std::env::var(secret_ref)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| LeadgateError::Config(format!("missing secret env var {secret_ref}")))
    }
}

/// A fixed secret. Handy for tests and one-off token minting.
pub struct StaticSecretStore(String);

impl StaticSecretStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl SecretStore for StaticSecretStore {
    fn get(&self, _secret_ref: &str) -> Result<String, LeadgateError> {
        Ok(self.0.clone())
    }
}

struct UserRecord {
    principal: Principal,
    password_hash: String,
}

#[derive(Default)]
struct StoreState {
    // keyed by normalized email
    users: BTreeMap<String, UserRecord>,
    emails_by_id: BTreeMap<String, String>,
    tenants: BTreeMap<String, Tenant>,
}

/// Credential store held in process memory, passwords hashed with Argon2.
pub struct MemoryCredentialStore {
    state: RwLock<StoreState>,
    dummy_hash: String,
}

impl MemoryCredentialStore {
    pub fn new() -> Result<Self, LeadgateError> {
        Ok(Self {
            state: RwLock::new(StoreState::default()),
            dummy_hash: hash_password("leadgate-unknown-user")?,
        })
    }

    /// Insert a principal with a known password. Used for seeding.
    pub fn add_principal(
        &self,
        principal: Principal,
        password: &str,
        tenant: Option<Tenant>,
    ) -> Result<(), LeadgateError> {
        let password_hash = hash_password(password)?;
        let email = normalize_email(&principal.email);
        let mut guard = self.write()?;
        if guard.users.contains_key(&email) {
            return Err(LeadgateError::Conflict(format!(
                "user with email {email} already exists"
            )));
        }
        if let Some(t) = tenant {
            guard.tenants.insert(t.id.clone(), t);
        }
        guard.emails_by_id.insert(principal.id.clone(), email.clone());
        guard.users.insert(
            email,
            UserRecord {
                principal: Principal {
                    email: normalize_email(&principal.email),
                    ..principal
                },
                password_hash,
            },
        );
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>, LeadgateError> {
        self.state
            .read()
            .map_err(|_| LeadgateError::Internal("credential store poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>, LeadgateError> {
        self.state
            .write()
            .map_err(|_| LeadgateError::Internal("credential store poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn verify_credentials(&self, email: &str, password: &str) -> Result<Principal, LeadgateError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(LeadgateError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let guard = self.read()?;
        match guard.users.get(&email) {
            Some(user) if verify_password(&user.password_hash, password) => {
                Ok(user.principal.clone())
            }
            Some(_) => Err(LeadgateError::Auth(INVALID_CREDENTIALS.to_string())),
            None => {
                // Same Argon2 cost as a real miss.
                let _ = verify_password(&self.dummy_hash, password);
                Err(LeadgateError::Auth(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    fn register(&self, registration: &Registration) -> Result<(Principal, Tenant), LeadgateError> {
        registration.validate()?;
        let email = registration.normalized_email();
        if self.read()?.users.contains_key(&email) {
            return Err(LeadgateError::Conflict(
                "user with this email already exists".to_string(),
            ));
        }

        let tenant = Tenant {
            id: uuid::Uuid::new_v4().to_string(),
            name: registration.company_name.trim().to_string(),
        };
        let principal = Principal {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            full_name: registration.full_name.trim().to_string(),
            tenant_id: Some(tenant.id.clone()),
            role: Role::Owner,
        };

        // add_principal re-checks the email under the write lock.
        self.add_principal(principal.clone(), &registration.password, Some(tenant.clone()))
            .map_err(|e| match e {
                LeadgateError::Conflict(_) => {
                    LeadgateError::Conflict("user with this email already exists".to_string())
                }
                other => other,
            })?;

        tracing::info!(principal = %principal.id, tenant = %tenant.id, "principal registered");
        Ok((principal, tenant))
    }

    fn find_principal(&self, id: &str) -> Result<Principal, LeadgateError> {
        let guard = self.read()?;
        guard
            .emails_by_id
            .get(id)
            .and_then(|email| guard.users.get(email))
            .map(|u| u.principal.clone())
            .ok_or_else(|| LeadgateError::NotFound("user not found".to_string()))
    }

    fn find_tenant(&self, id: &str) -> Result<Tenant, LeadgateError> {
        self.read()?
            .tenants
            .get(id)
            .cloned()
            .ok_or_else(|| LeadgateError::NotFound(format!("tenant {id} not found")))
    }
}

fn hash_password(password: &str) -> Result<String, LeadgateError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| LeadgateError::Internal(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| LeadgateError::Internal(format!("salt encoding failed: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| LeadgateError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
