use anyhow::Result;
use std::collections::BTreeMap;

use super::OutputFormat;
use crate::core::permission::PermissionTier;
use crate::gateway::ExecutionOutcome;
use crate::storage::PolicyStore;

const PREVIEW_CHARS: usize = 2000;

pub fn print_outcome(outcome: &ExecutionOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => {
            if outcome.success {
                println!("{}", outcome.output.as_deref().unwrap_or_default());
                eprintln!(
                    "\x1b[90m[{}: ok in {}ms]\x1b[0m",
                    outcome.tool_name, outcome.duration_ms
                );
            } else {
                eprintln!(
                    "\x1b[31;1m[error: {}]\x1b[0m {}",
                    outcome.tool_name,
                    outcome.message()
                );
            }
        }
    }
    Ok(())
}

/// Shortened rendering for the interactive loop.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}... ({} chars)", &text[..cut], text.chars().count()),
        None => text.to_string(),
    }
}

pub fn print_tier(tool: &str, tier: PermissionTier, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "tool": tool, "tier": tier }))?
        ),
        OutputFormat::Text => println!("{tool}: {tier}"),
    }
    Ok(())
}

pub fn print_tiers(policy: &PolicyStore, format: OutputFormat) -> Result<()> {
    let effective: BTreeMap<String, PermissionTier> = policy.get_all().into_iter().collect();
    let overrides = policy.overrides();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&effective)?),
        OutputFormat::Text => {
            if effective.is_empty() {
                println!("No tools configured.");
            }
            for (tool, tier) in &effective {
                let marker = if overrides.contains_key(tool) {
                    "  (override)"
                } else {
                    ""
                };
                println!("  {tool:<20} {tier}{marker}");
            }
        }
    }
    Ok(())
}
