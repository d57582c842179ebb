mod approval;
mod output;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::catalog::ToolCatalog;
use crate::core::config::GateConfig;
use crate::core::event::EventBus;
use crate::core::permission::{PermissionRequest, PermissionTier};
use crate::gateway::ExecutionGateway;
use crate::permission::ApprovalCoordinator;
use crate::storage::PolicyStore;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "tool-gate", version, about = "Permission gate for running tools from the terminal")]
struct Cli {
    /// Working directory
    #[arg(short = 'c', long = "cwd", env = "TOOL_GATE_CWD", global = true)]
    working_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(short = 'f', long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive loop (the default)
    Repl,
    /// Run a single tool call
    Exec {
        tool: String,
        /// Parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
    },
    /// Print the JSON schema of every registered tool
    Schemas,
    /// Inspect or change persisted permission tiers
    Policy {
        #[command(subcommand)]
        action: PolicyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
    List,
    Get { tool: String },
    Set { tool: String, tier: String },
    Reset { tool: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Everything the frontends need, wired from one config.
pub struct App {
    pub gateway: Arc<ExecutionGateway>,
    pub coordinator: Arc<ApprovalCoordinator>,
    pub policy: PolicyStore,
    pub config: GateConfig,
}

pub fn build_app(config: GateConfig) -> Result<(App, mpsc::Receiver<PermissionRequest>)> {
    let mut catalog = ToolCatalog::new();
    crate::tools::register_builtin_tools(&mut catalog)?;

    let events = EventBus::new();
    let policy = PolicyStore::load(
        config.policy_path(),
        catalog.default_tiers(),
        config.policy_debounce(),
    );
    policy.attach_events(events.clone());

    let (coordinator, requests) =
        ApprovalCoordinator::new(policy.clone(), config.approval_timeout());
    let coordinator = Arc::new(coordinator.with_events(events.clone()));

    let gateway = ExecutionGateway::new(catalog, coordinator.clone(), config.working_dir.clone())
        .with_policy_store(policy.clone())
        .with_events(events)
        .with_slow_threshold(config.slow_threshold());

    tracing::debug!(
        tools = gateway.catalog().count(),
        policy = %config.policy_path().display(),
        "Gateway ready"
    );

    Ok((
        App {
            gateway: Arc::new(gateway),
            coordinator,
            policy,
            config,
        },
        requests,
    ))
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let config = crate::core::config::load_config(cli.working_dir.clone())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let filter = if cli.debug || config.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (app, requests) = build_app(config)?;

    match cli.command {
        None | Some(Command::Repl) => {
            let approver = approval::spawn_terminal_approver(app.coordinator.clone(), requests);
            let result = repl::run(&app, cli.format).await;
            app.gateway.shutdown();
            approver.abort();
            result
        }
        Some(Command::Exec {
            tool,
            params,
            correlation_id,
        }) => {
            let params = match params {
                Some(raw) => serde_json::from_str(&raw).context("--params must be valid JSON")?,
                None => serde_json::Value::Null,
            };
            let approver = approval::spawn_terminal_approver(app.coordinator.clone(), requests);
            let outcome = app.gateway.execute(&tool, params, correlation_id).await;
            output::print_outcome(&outcome, cli.format)?;
            app.gateway.shutdown();
            approver.abort();
            if !outcome.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Schemas) => {
            println!("{}", serde_json::to_string_pretty(&app.gateway.export_schemas())?);
            Ok(())
        }
        Some(Command::Policy { action }) => run_policy(&app, action, cli.format),
    }
}

fn run_policy(app: &App, action: PolicyCommand, format: OutputFormat) -> Result<()> {
    match action {
        PolicyCommand::List => output::print_tiers(&app.policy, format)?,
        PolicyCommand::Get { tool } => {
            let tier = app.policy.get_tier(&tool);
            output::print_tier(&tool, tier, format)?;
        }
        PolicyCommand::Set { tool, tier } => {
            let tier: PermissionTier = tier.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            warn_if_unknown(app, &tool);
            app.policy.set_tier(&tool, tier);
            app.policy.flush_now()?;
            output::print_tier(&tool, tier, format)?;
        }
        PolicyCommand::Reset { tool } => {
            match app.policy.reset_tier(&tool) {
                Some(previous) => eprintln!("Removed override {previous} for '{tool}'"),
                None => eprintln!("No override set for '{tool}'"),
            }
            app.policy.flush_now()?;
            output::print_tier(&tool, app.policy.get_tier(&tool), format)?;
        }
    }
    Ok(())
}

fn warn_if_unknown(app: &App, tool: &str) {
    if app.gateway.catalog().lookup(tool).is_none() {
        eprintln!(
            "\x1b[33mwarning:\x1b[0m '{tool}' is not a registered tool; the tier is stored anyway"
        );
    }
}
