use anyhow::Result;
use std::io::{self, Write};

use super::output;
use super::{App, OutputFormat};

pub async fn run(app: &App, format: OutputFormat) -> Result<()> {
    println!("\x1b[1mtool-gate\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!("Working dir: \x1b[36m{}\x1b[0m", app.config.working_dir.display());
    println!("Type \x1b[33m/help\x1b[0m for commands, \x1b[33mCtrl-D\x1b[0m to exit.\n");

    loop {
        eprint!("\x1b[32;1mgate>\x1b[0m ");
        io::stderr().flush().ok();

        let line = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            io::stdin().read_line(&mut input).map(|n| (n, input))
        })
        .await?;

        let input = match line {
            Ok((0, _)) => {
                // EOF (Ctrl-D)
                println!("\nGoodbye!");
                break;
            }
            Ok((_, input)) => input,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            if handle_command(input, app) {
                continue;
            }
            break;
        }

        let (tool, params) = match parse_call(input) {
            Ok(call) => call,
            Err(e) => {
                eprintln!("\x1b[31m{e}\x1b[0m");
                continue;
            }
        };

        let outcome = app.gateway.execute(tool, params, None).await;
        match format {
            OutputFormat::Json => output::print_outcome(&outcome, format)?,
            OutputFormat::Text if outcome.success => {
                println!("{}", output::preview(outcome.output.as_deref().unwrap_or_default()));
            }
            OutputFormat::Text => output::print_outcome(&outcome, format)?,
        }
    }

    Ok(())
}

/// Split `<tool> [json]` into a name and parameters.
pub(crate) fn parse_call(input: &str) -> Result<(&str, serde_json::Value), String> {
    let (tool, rest) = match input.split_once(char::is_whitespace) {
        Some((tool, rest)) => (tool, rest.trim()),
        None => (input, ""),
    };
    if rest.is_empty() {
        return Ok((tool, serde_json::Value::Null));
    }
    serde_json::from_str(rest)
        .map(|params| (tool, params))
        .map_err(|e| format!("Parameters must be JSON: {e}"))
}

/// Returns `false` when the loop should stop.
fn handle_command(input: &str, app: &App) -> bool {
    let (command, arg) = match input.split_once(' ') {
        Some((command, arg)) => (command, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (input, None),
    };

    match command {
        "/help" | "/h" => {
            println!("\x1b[1mCommands:\x1b[0m");
            println!("  <tool> [json]     Run a tool, e.g. read_file {{\"path\": \"Cargo.toml\"}}");
            println!("  /tools            List registered tools");
            println!("  /trust            List tools trusted for this session");
            println!("  /untrust [tool]   Revoke session trust (all tools if omitted)");
            println!("  /pending          Show approval requests still waiting");
            println!("  /quit             Exit");
        }
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            return false;
        }
        "/tools" | "/t" => {
            for schema in app.gateway.export_schemas() {
                let tier = app.policy.get_tier(&schema.name);
                println!(
                    "  \x1b[36m{:<16}\x1b[0m {:<6} {:<12} {}",
                    schema.name, schema.risk_level.to_string(), tier.as_str(), schema.description
                );
            }
        }
        "/trust" => {
            let trusted = app.coordinator.trusted_tools();
            if trusted.is_empty() {
                println!("No session trust granted.");
            }
            for entry in trusted {
                println!(
                    "  {}  \x1b[90msince {}\x1b[0m",
                    entry.tool_name,
                    entry.granted_at.format("%H:%M:%S")
                );
            }
        }
        "/untrust" => {
            let removed = app.coordinator.clear_session_trust(arg);
            println!("Revoked session trust for {removed} tool(s).");
        }
        "/pending" => {
            let pending = app.coordinator.pending_requests();
            if pending.is_empty() {
                println!("No pending approvals.");
            }
            for request in pending {
                println!(
                    "  \x1b[90m{}\x1b[0m  {}  {}",
                    &request.id[..8],
                    request.tool_name,
                    request.created_at.format("%H:%M:%S")
                );
            }
        }
        other => eprintln!("Unknown command: {other} (try /help)"),
    }
    true
}
