use serde::{Deserialize, Serialize};

pub type PrincipalId = String;
pub type TenantId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Sdr,
    SuperAdmin,
}

/// An authenticated principal as reported by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub full_name: String,
    pub tenant_id: Option<TenantId>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

/// Sign-up input. Validated with [`Registration::validate`] before it reaches a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub full_name: String,
    pub company_name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), LeadgateError> {
        check_len("full name", &self.full_name, 2, 100)?;
        check_len("company name", &self.company_name, 2, 150)?;
        if !is_plausible_email(&self.email) {
            return Err(LeadgateError::Validation("invalid email address".to_string()));
        }
        if self.password.is_empty() {
            return Err(LeadgateError::Validation("password is required".to_string()));
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// The "current user" view returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: PrincipalId,
    pub email: String,
    pub full_name: String,
    pub company_name: String,
    pub tenant_id: Option<TenantId>,
    pub role: Role,
}

impl Profile {
    pub fn new(principal: Principal, tenant: Option<&Tenant>) -> Self {
        Self {
            id: principal.id,
            email: principal.email,
            full_name: principal.full_name,
            company_name: tenant.map(|t| t.name.clone()).unwrap_or_default(),
            tenant_id: principal.tenant_id,
            role: principal.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeadgateError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("conflict error: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, LeadgateError>;
}

/// The account store behind login and sign-up.
///
/// `verify_credentials` must answer an unknown email and a wrong password with
/// the same `Auth` error.
pub trait CredentialStore: Send + Sync {
    fn verify_credentials(&self, email: &str, password: &str) -> Result<Principal, LeadgateError>;
    fn register(&self, registration: &Registration) -> Result<(Principal, Tenant), LeadgateError>;
    fn find_principal(&self, id: &str) -> Result<Principal, LeadgateError>;
    fn find_tenant(&self, id: &str) -> Result<Tenant, LeadgateError>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), LeadgateError> {
    let n = value.trim().chars().count();
    if n < min {
        return Err(LeadgateError::Validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if n > max {
        return Err(LeadgateError::Validation(format!("{field} is too long")));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            full_name: "Ada Lovelace".to_string(),
            company_name: "Analytical Engines".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
        assert_eq!(registration().normalized_email(), "ada@example.com");
    }

    #[test]
    fn short_names_are_rejected() {
        let mut r = registration();
        r.full_name = "A".to_string();
        assert!(matches!(r.validate(), Err(LeadgateError::Validation(_))));

        let mut r = registration();
        r.company_name = "x".repeat(151);
        assert!(matches!(r.validate(), Err(LeadgateError::Validation(_))));
    }

    #[test]
    fn email_shape() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
        assert!(!is_plausible_email("a@b..co"));
    }

    #[test]
    fn registration_reads_camel_case() {
        let r: Registration = serde_json::from_value(serde_json::json!({
            "fullName": "Ada Lovelace",
            "companyName": "Engines",
            "email": "ada@example.com",
            "password": "pw"
        }))
        .unwrap();
        assert_eq!(r.company_name, "Engines");
    }

    #[test]
    fn profile_without_tenant_has_empty_company() {
        let p = Principal {
            id: "u1".to_string(),
            email: "a@b.co".to_string(),
            full_name: "A B".to_string(),
            tenant_id: None,
            role: Role::Sdr,
        };
        let profile = Profile::new(p, None);
        assert_eq!(profile.company_name, "");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "sdr");
        assert!(json.get("fullName").is_some());
    }
}
