//! capgate CLI
//!
//! Runs the capability gate against a simulated host: grant decisions are
//! persisted in a JSON store and permission dialogs are answered on the
//! terminal or by a fixed policy.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use capgate_cli::commands;
use capgate_cli::host::{AnswerPolicy, DialogHost, GrantStore, SimulatedPlatform};
use capgate_cli::toast::ToastObserver;
use capgate_core::config::{self, Config};
use capgate_core::{CapabilityState, PermissionGate};

#[derive(Parser, Debug)]
#[command(name = "capgate")]
#[command(version, about = "Runtime capability request gate", long_about = None)]
struct Cli {
    /// Grant store file (defaults to the capgate config directory)
    #[arg(long, global = true, env = "CAPGATE_GRANT_STORE")]
    store: Option<PathBuf>,

    /// Project directory to read `.capgate/settings.json` from
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, global = true, env = "CAPGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true, env = "CAPGATE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Make sure a capability is available, requesting it if needed
    Ensure {
        /// Capability identifier (see `capgate list`)
        capability: String,

        /// Running platform version
        #[arg(long)]
        platform_version: u32,

        /// How to answer the permission dialog
        #[arg(long, value_enum, default_value_t = Answer::Prompt)]
        answer: Answer,

        /// Also show a message when the capability is implicitly available
        #[arg(long)]
        notify_not_required: bool,
    },
    /// Show the persisted decision for a capability, or all decisions
    Status { capability: Option<String> },
    /// Clear the persisted decision for a capability
    Revoke { capability: String },
    /// List recognised capabilities
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Answer {
    Prompt,
    Allow,
    Deny,
    Dismiss,
}

impl From<Answer> for AnswerPolicy {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Prompt => Self::Prompt,
            Answer::Allow => Self::Fixed(true),
            Answer::Deny => Self::Fixed(false),
            Answer::Dismiss => Self::Dismiss,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = config::load_config(cli.project_dir.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.host.log_level);
    capgate_core::tracing_init::init_tracing(level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting capgate");

    let store_path =
        commands::resolve_store_path(cli.store, &config, config::default_grant_store_path)
            .context("No grant store path: pass --store or set CAPGATE_GRANT_STORE")?;

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Ensure {
            capability,
            platform_version,
            answer,
            notify_not_required,
        } => {
            let state = ensure(
                &config,
                store_path,
                &capability,
                platform_version,
                answer.into(),
                notify_not_required,
            )
            .await?;
            return Ok(if state.is_available() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Status { capability } => {
            commands::status(&config, &store_path, capability.as_deref(), &mut stdout)?;
        }
        Command::Revoke { capability } => {
            commands::revoke(&config, &store_path, &capability, &mut stdout)?;
        }
        Command::List => commands::list(&config, &mut stdout)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Ensure `capability`, answering any dialog under `policy`, and print the
/// resulting state.
#[allow(clippy::print_stdout)]
async fn ensure(
    config: &Config,
    store_path: PathBuf,
    capability: &str,
    platform_version: u32,
    policy: AnswerPolicy,
    notify_not_required: bool,
) -> anyhow::Result<CapabilityState> {
    let store = Arc::new(Mutex::new(GrantStore::open(store_path)?));
    let (platform, dialogs) = SimulatedPlatform::new(Arc::clone(&store));
    let toast = Arc::new(ToastObserver::stdout(config.catalog()));

    let gate = Arc::new(
        PermissionGate::from_config(config, Arc::new(platform), toast)
            .notify_not_required(config.gate.notify_not_required || notify_not_required),
    );

    let request = gate.ensure(capability, platform_version)?;
    let final_state = if request.state == CapabilityState::Requested {
        let mut host = DialogHost::new(Arc::clone(&gate), store, policy, dialogs);
        host.drain().await?;
        gate.state_of(capability)
    } else {
        request.state
    };

    println!("{capability}: {final_state}");
    Ok(final_state)
}
