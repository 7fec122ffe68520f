use std::fs;
use std::path::{Path, PathBuf};

use leadgate_api::LeadgateError;
use leadgate_auth::{CookieOptions, GatePaths, RouteRules};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "gate.toml";
pub const DEFAULT_SECRET_REF: &str = "LEADGATE_SIGNING_SECRET";
pub const ENV_PRODUCTION: &str = "LEADGATE_PRODUCTION";
pub const ENV_SECRET_REF: &str = "LEADGATE_SECRET_REF";

const DEFAULT_GATE_TOML: &str = include_str!("../../../docs/leadgate/examples/gate.toml.example");

/// Everything the gate needs at startup, minus the secret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Name of the secret to resolve through a `SecretStore`.
    pub secret_ref: String,
    pub production: bool,
    pub cookie_name: String,
    /// `Domain` attribute for the session cookie; host-only when unset.
    pub cookie_domain: Option<String>,
    pub paths: GatePaths,
    pub routes: RouteRules,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            secret_ref: DEFAULT_SECRET_REF.to_string(),
            production: false,
            cookie_name: CookieOptions::default().name,
            cookie_domain: None,
            paths: GatePaths::default(),
            routes: RouteRules::default(),
        }
    }
}

impl GateConfig {
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            domain: self.cookie_domain.clone(),
            ..CookieOptions::for_deployment(self.cookie_name.clone(), self.production)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    secret_ref: Option<String>,
    production: Option<bool>,
    #[serde(default)]
    cookie: RawCookie,
    paths: Option<GatePaths>,
    routes: Option<RouteRules>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCookie {
    name: Option<String>,
    domain: Option<String>,
}

pub fn validate_config(cfg: &GateConfig) -> Result<(), LeadgateError> {
    if cfg.secret_ref.trim().is_empty() {
        return Err(LeadgateError::Validation("secret_ref must not be empty".to_string()));
    }
    cfg.paths
        .validate()
        .map_err(|e| LeadgateError::Validation(format!("[paths] {e}")))?;
    for p in cfg.routes.auth_pages.iter().chain(&cfg.routes.excluded_exact) {
        if !p.starts_with('/') {
            return Err(LeadgateError::Validation(format!("route must start with /: {p}")));
        }
    }
    cfg.cookie_options()
        .validate()
        .map_err(|e| LeadgateError::Validation(e.to_string()))
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("leadgate")
    } else {
        PathBuf::from(".leadgate")
    }
}

pub fn parse_config(content: &str) -> Result<GateConfig, LeadgateError> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| LeadgateError::Validation(format!("invalid gate config: {e}")))?;

    let defaults = GateConfig::default();
    let cfg = GateConfig {
        secret_ref: raw.secret_ref.unwrap_or(defaults.secret_ref),
        production: raw.production.unwrap_or(defaults.production),
        cookie_name: raw.cookie.name.unwrap_or(defaults.cookie_name),
        cookie_domain: raw.cookie.domain.or(defaults.cookie_domain),
        paths: raw.paths.unwrap_or(defaults.paths),
        routes: raw.routes.unwrap_or(defaults.routes),
    };
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn load_config_from_file(path: &Path) -> Result<GateConfig, LeadgateError> {
    let content = fs::read_to_string(path)
        .map_err(|e| LeadgateError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    parse_config(&content).map_err(|e| match e {
        LeadgateError::Validation(msg) => {
            LeadgateError::Validation(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Load `gate.toml` from `dir`. A missing file means built-in defaults; a file
/// that exists but does not parse is an error.
pub fn load_config_or_default(dir: &Path) -> Result<GateConfig, LeadgateError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::info!(path = %path.display(), "no gate config found, using defaults");
        return Ok(GateConfig::default());
    }
    load_config_from_file(&path)
}

/// Apply `LEADGATE_PRODUCTION` and `LEADGATE_SECRET_REF` from `lookup`
/// (normally `std::env::var`).
pub fn apply_env_overrides<F>(cfg: &mut GateConfig, lookup: F) -> Result<(), LeadgateError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_PRODUCTION) {
        cfg.production = parse_flag(&v).ok_or_else(|| {
            LeadgateError::Validation(format!("{ENV_PRODUCTION} must be a boolean, got {v:?}"))
        })?;
    }
    if let Some(v) = lookup(ENV_SECRET_REF).filter(|v| !v.trim().is_empty()) {
        cfg.secret_ref = v;
    }
    validate_config(cfg)
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

pub fn write_default_config_files(dir: &Path) -> Result<(), LeadgateError> {
    fs::create_dir_all(dir)
        .map_err(|e| LeadgateError::Internal(format!("failed to create {}: {e}", dir.display())))?;

    let files: [(&str, &str); 1] = [(CONFIG_FILE, DEFAULT_GATE_TOML)];

    for (name, body) in files {
        let path = dir.join(name);
        if !path.exists() {
            fs::write(&path, body).map_err(|e| {
                LeadgateError::Internal(format!("failed to write {}: {e}", path.display()))
            })?;
        }
    }

    Ok(())
}
