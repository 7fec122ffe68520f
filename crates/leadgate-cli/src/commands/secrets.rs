use anyhow::{bail, ensure};
use clap::Subcommand;
use leadgate_api::{LeadgateError, SecretStore};
use rand::RngCore;

const KEYRING_SERVICE: &str = "leadgate";

/// Keychain entry holding the HMAC signing secret.
pub const SIGNING_SECRET_KEY: &str = "signing_secret";

const SECRET_BYTES: usize = 32;

#[derive(Debug, Subcommand)]
pub enum SecretCommands {
    /// Generate a random signing secret and store it in the keychain
    Generate {
        /// Replace an existing secret (invalidates every issued session)
        #[arg(long)]
        force: bool,
    },
    /// Store a signing secret in the keychain (prompted, never echoed)
    Set,
    /// Show where the signing secret would be loaded from (never the value)
    Status,
    /// Remove the signing secret from the keychain
    Rm,
}

pub fn store_credential(key: &str, value: &str) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, key)
        .map_err(|e| anyhow::anyhow!("Keychain error: {e}"))?;
    entry
        .set_password(value)
        .map_err(|e| anyhow::anyhow!("Failed to store '{key}' in keychain: {e}"))?;
    Ok(())
}

pub fn load_credential(key: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, key).ok()?;
    entry.get_password().ok().filter(|v| !v.trim().is_empty())
}

pub fn load_credential_or_env(keychain_key: &str, env_var: &str) -> Option<String> {
    if let Some(val) = load_credential(keychain_key) {
        return Some(val);
    }
    std::env::var(env_var).ok().filter(|v| !v.trim().is_empty())
}

fn delete_credential(key: &str) -> anyhow::Result<bool> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, key)
        .map_err(|e| anyhow::anyhow!("Keychain error: {e}"))?;
    match entry.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => bail!("Failed to delete '{key}': {e}"),
    }
}

/// Keychain first, then the environment variable named by `secret_ref`.
pub struct KeychainSecretStore;

impl SecretStore for KeychainSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, LeadgateError> {
        load_credential_or_env(SIGNING_SECRET_KEY, secret_ref).ok_or_else(|| {
            LeadgateError::Config(format!(
                "no signing secret: run `leadgate secret generate` or set {secret_ref}"
            ))
        })
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn cmd_secret(command: SecretCommands, secret_ref: &str, json: bool) -> anyhow::Result<()> {
    match command {
        SecretCommands::Generate { force } => {
            if load_credential(SIGNING_SECRET_KEY).is_some() && !force {
                bail!(
                    "A signing secret is already stored. Use --force to replace it \
                     (every issued session becomes invalid)."
                );
            }
            store_credential(SIGNING_SECRET_KEY, &generate_secret())?;
            crate::pout(
                json,
                serde_json::json!({"ok": true, "key": SIGNING_SECRET_KEY, "bytes": SECRET_BYTES}),
                &format!("Generated {SECRET_BYTES}-byte signing secret -> Keychain"),
            )
        }
        SecretCommands::Set => {
            let value = rpassword::prompt_password("Signing secret (hidden): ")?;
            ensure!(!value.trim().is_empty(), "Secret cannot be empty");
            store_credential(SIGNING_SECRET_KEY, value.trim())?;
            crate::pout(
                json,
                serde_json::json!({"ok": true, "key": SIGNING_SECRET_KEY}),
                &format!("Stored: {SIGNING_SECRET_KEY} -> Keychain"),
            )
        }
        SecretCommands::Status => {
            let in_keychain = load_credential(SIGNING_SECRET_KEY).is_some();
            let in_env = std::env::var(secret_ref).is_ok_and(|v| !v.trim().is_empty());
            let source = match (in_keychain, in_env) {
                (true, _) => "keychain",
                (false, true) => "env",
                (false, false) => "none",
            };
            let mark = |b: bool| if b { "✓" } else { "✗" };
            crate::pout(
                json,
                serde_json::json!({
                    "keychain": in_keychain,
                    "env_var": secret_ref,
                    "env": in_env,
                    "source": source,
                }),
                &format!(
                    "  {:<30} {}\n  {:<30} {}\n  active source: {source}",
                    format!("keychain:{SIGNING_SECRET_KEY}"),
                    mark(in_keychain),
                    format!("env:{secret_ref}"),
                    mark(in_env),
                ),
            )
        }
        SecretCommands::Rm => {
            if delete_credential(SIGNING_SECRET_KEY)? {
                crate::pout(
                    json,
                    serde_json::json!({"ok": true, "key": SIGNING_SECRET_KEY}),
                    &format!("Removed: {SIGNING_SECRET_KEY}"),
                )
            } else {
                crate::pout(
                    json,
                    serde_json::json!({"ok": false, "key": SIGNING_SECRET_KEY, "reason": "not_found"}),
                    &format!("'{SIGNING_SECRET_KEY}' was not stored"),
                )
            }
        }
    }
}
