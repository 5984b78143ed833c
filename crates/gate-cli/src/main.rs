//! Tenant Gate CLI - operator tooling for the tenant resolution gate

mod import;
mod request;

use anyhow::Context;
use clap::Parser;
use gate_core::{GateConfig, SledMappingStore, TenantGate, TenantHash};
use gate_credential::{CredentialIssuer, MintRequest, StaticSecretStore};
use gate_registry::normalize::{canonical_path, normalize_host, normalize_origin};
use request::RequestFile;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tenant-gate")]
#[command(about = "Tenant Gate - fail-closed tenant resolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as TOML
    Defaults,
    /// Import mapping documents (`<tenant hash>.json`) from a directory
    Import {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of mapping documents
        dir: PathBuf,
    },
    /// Resolve a request described by a JSON file
    Resolve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Request file
        request: PathBuf,
    },
    /// Sign a credential with the configured verification key
    Mint {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value = "streaming")]
        audience: String,
        #[arg(long, default_value = "stream")]
        purpose: String,
        #[arg(long)]
        session: Option<String>,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 900)]
        ttl_secs: u64,
    },
    /// Show the canonical form of a host, origin or path
    Normalize {
        #[command(subcommand)]
        target: NormalizeTarget,
    },
}

#[derive(clap::Subcommand)]
enum NormalizeTarget {
    Host {
        value: String,
    },
    Origin {
        value: String,
        /// Reject plain http, as production does
        #[arg(long)]
        require_https: bool,
    },
    Path {
        value: String,
    },
}

/// Environment variable holding the signing and verification key.
const KEY_VAR: &str = "TENANT_GATE_KEY";

fn signing_key() -> anyhow::Result<String> {
    std::env::var(KEY_VAR).with_context(|| format!("{KEY_VAR} is not set"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GateConfig> {
    let config = match path {
        Some(path) => GateConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GateConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Check { config } => {
            let config = load_config(config.as_deref())?;
            let store = SledMappingStore::open(&config.registry.db_path)?;
            println!("Configuration OK");
            println!("  environment:  {:?}", config.global.environment);
            println!("  issuer:       {}", config.credential.issuer);
            println!("  mapping db:   {}", config.registry.db_path.display());
            println!("  documents:    {}", store.len());
        }
        Commands::Defaults => {
            print!("{}", GateConfig::default().to_toml_string()?);
        }
        Commands::Import { config, dir } => {
            let config = load_config(config.as_deref())?;
            let documents = import::read_documents(&dir)?;
            let store = SledMappingStore::open(&config.registry.db_path)?;
            let written = import::write_documents(&store, &config.registry.prefix, &documents)?;
            info!("Imported {} mapping documents into {}", written, config.registry.db_path.display());
        }
        Commands::Resolve { config, request } => {
            let config = load_config(config.as_deref())?;
            let raw = std::fs::read(&request).with_context(|| format!("reading {}", request.display()))?;
            let file: RequestFile =
                serde_json::from_slice(&raw).with_context(|| format!("parsing {}", request.display()))?;

            let secrets = StaticSecretStore::with_secret(config.credential.secret_name.clone(), signing_key()?);
            let gate = TenantGate::builder(config).secret_store(Arc::new(secrets)).build()?;
            let outcome = gate.resolve(&file.into_context()).await;
            println!("{}", serde_json::to_string_pretty(&outcome.to_response())?);
            if outcome.is_denied() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Mint {
            config,
            tenant,
            audience,
            purpose,
            session,
            ttl_secs,
        } => {
            let config = load_config(config.as_deref())?;
            let secret = signing_key()?;

            let mut mint = MintRequest::new(TenantHash::parse(&tenant)?, audience, purpose)
                .with_ttl(Duration::from_secs(ttl_secs));
            if let Some(session) = session {
                mint = mint.with_session(session);
            }
            let token = CredentialIssuer::new(config.credential.issuer.clone(), &secret).mint(&mint)?;
            println!("{token}");
        }
        Commands::Normalize { target } => {
            let canonical = match target {
                NormalizeTarget::Host { value } => Some(normalize_host(Some(&value))).filter(|s| !s.is_empty()),
                NormalizeTarget::Origin { value, require_https } => {
                    Some(normalize_origin(Some(&value), require_https)).filter(|s| !s.is_empty())
                }
                NormalizeTarget::Path { value } => canonical_path(Some(&value)),
            };
            match canonical {
                Some(canonical) => println!("{canonical}"),
                None => {
                    eprintln!("rejected");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
