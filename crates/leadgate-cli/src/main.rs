mod commands;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use leadgate_connectors::MemoryCredentialStore;
use leadgate_core::{
    CONFIG_FILE, GateConfig, apply_env_overrides, default_config_dir, load_config_or_default,
    write_default_config_files,
};
use leadgate_runtime::LeadgateRuntime;
use tracing_subscriber::EnvFilter;

use crate::commands::{check, secrets, serve, token};

#[derive(Debug, Parser)]
#[command(name = "leadgate", about = "Leadgate: session tokens and route gate")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the default gate.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Signing secret in the OS keychain
    Secret {
        #[command(subcommand)]
        command: secrets::SecretCommands,
    },
    /// Mint or inspect session tokens
    Token {
        #[command(subcommand)]
        command: token::TokenCommands,
    },
    /// Run the gate for one path and print the decision
    Check {
        path: String,
        /// Session token sent as the session cookie
        #[arg(long)]
        cookie: Option<String>,
        /// Session token sent as `Authorization: Bearer`
        #[arg(long)]
        bearer: Option<String>,
    },
    /// Serve the gate and the auth endpoints over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);

    match cli.command {
        Commands::Init { force } => {
            init(&cfg_dir, force)?;
            pout(
                cli.json,
                serde_json::json!({"message": "init complete", "config_dir": cfg_dir}),
                "Init complete",
            )?;
        }
        Commands::Secret { command } => {
            let cfg = load_config(&cfg_dir)?;
            secrets::cmd_secret(command, &cfg.secret_ref, cli.json)?;
        }
        Commands::Token { command } => {
            let runtime = build_runtime(&load_config(&cfg_dir)?)?;
            token::cmd_token(command, &runtime, cli.json)?;
        }
        Commands::Check {
            path,
            cookie,
            bearer,
        } => {
            let runtime = build_runtime(&load_config(&cfg_dir)?)?;
            check::cmd_check(&runtime, &path, cookie.as_deref(), bearer.as_deref(), cli.json)?;
        }
        Commands::Serve { addr } => {
            let runtime = Arc::new(build_runtime(&load_config(&cfg_dir)?)?);
            tokio::runtime::Runtime::new()?.block_on(serve::run(runtime, addr))?;
        }
    }

    Ok(())
}

fn init(cfg_dir: &Path, force: bool) -> anyhow::Result<()> {
    let path = cfg_dir.join(CONFIG_FILE);
    if force && path.exists() {
        fs::remove_file(&path)?;
    }
    write_default_config_files(cfg_dir)?;
    Ok(())
}

fn load_config(cfg_dir: &Path) -> anyhow::Result<GateConfig> {
    let mut cfg = load_config_or_default(cfg_dir)?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    Ok(cfg)
}

fn build_runtime(cfg: &GateConfig) -> anyhow::Result<LeadgateRuntime> {
    let store = MemoryCredentialStore::new()?;
    let runtime =
        LeadgateRuntime::from_config_with(cfg, &secrets::KeychainSecretStore, Box::new(store))?;
    Ok(runtime)
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
