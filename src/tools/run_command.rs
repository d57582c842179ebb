use async_trait::async_trait;
use crate::core::error::ToolError;
use crate::core::tool::*;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Command;

const MAX_OUTPUT: usize = 30_000;
const DEFAULT_TIMEOUT: u64 = 120;
const MAX_TIMEOUT: u64 = 600;

/// Refused even when the operator approves the call
const DANGEROUS_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "dd if=/dev",
    "mkfs.",
    "> /dev/sda",
    "chmod 777 /",
    "chmod -R 777 /",
    ":(){ :|:& };:", // fork bomb
    "wget -O- | sh",
    "curl | sh",
    "curl | bash",
    "wget -O- | bash",
    "shutdown",
    "reboot",
    "init 0",
    "init 6",
    "kill -9 1",
    "killall",
    "pkill -9",
];

pub struct RunCommandTool;

impl RunCommandTool {
    pub(crate) fn is_dangerous_command(command: &str) -> bool {
        let lower = command.to_lowercase();
        DANGEROUS_PATTERNS.iter().any(|pat| lower.contains(pat))
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn definition(&self) -> ToolDefinition {
        let mut params = HashMap::new();
        params.insert(
            "command".into(),
            ParamSchema::new("string", "The bash command to execute"),
        );
        params.insert(
            "timeout".into(),
            ParamSchema::new("integer", "Timeout in seconds (max 600, default 120)"),
        );

        ToolDefinition {
            name: "run_command".into(),
            description: "Execute a bash command in the working directory. \
                Every call requires operator approval."
                .into(),
            risk_level: RiskLevel::High,
            permission: PermissionRequirement::AlwaysPrompt,
            parameters: params,
            required: vec!["command".into()],
        }
    }

    async fn run(&self, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let command = ctx.params["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParams("missing 'command'".into()))?;

        let timeout = ctx.params["timeout"]
            .as_u64()
            .unwrap_or(DEFAULT_TIMEOUT)
            .min(MAX_TIMEOUT);

        if Self::is_dangerous_command(command) {
            tracing::warn!(command = %command, "Refusing dangerous command");
            return Err(ToolError::AccessDenied(format!("blocked command: {command}")));
        }

        let child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.working_dir)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            res = tokio::time::timeout(Duration::from_secs(timeout), child) => {
                res.map_err(|_| ToolError::Timeout(timeout))?
                    .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
            }
            _ = ctx.cancel_token.cancelled() => {
                return Err(ToolError::ExecutionFailed("cancelled".into()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = String::new();
        if !stdout.is_empty() {
            result.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str("STDERR:\n");
            result.push_str(&stderr);
        }

        if result.len() > MAX_OUTPUT {
            let cut = floor_boundary(&result, MAX_OUTPUT);
            result.truncate(cut);
            result.push_str("\n... (output truncated)");
        }

        if result.is_empty() {
            result = "(no output)".into();
        }

        let code = output.status.code().unwrap_or(-1);
        if output.status.success() {
            Ok(ToolResult::success(result).with_metadata(serde_json::json!({ "exit_code": code })))
        } else {
            Ok(ToolResult::error(format!("Exit code {code}\n{result}")))
        }
    }
}

fn floor_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
