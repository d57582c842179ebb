use async_trait::async_trait;
use crate::core::error::ToolError;
use crate::core::tool::*;
use std::collections::HashMap;

use super::fs_error;

const DEFAULT_LIMIT: u64 = 2000;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        let mut params = HashMap::new();
        params.insert(
            "path".into(),
            ParamSchema::new("string", "Absolute or relative file path to read"),
        );
        params.insert(
            "offset".into(),
            ParamSchema::new("integer", "Line number to start reading from (1-based)"),
        );
        params.insert(
            "limit".into(),
            ParamSchema::new("integer", "Maximum number of lines to read (default: 2000)"),
        );

        ToolDefinition {
            name: "read_file".into(),
            description: "Read a text file with optional line offset and limit. \
                Returns content with line numbers."
                .into(),
            risk_level: RiskLevel::Low,
            permission: PermissionRequirement::None,
            parameters: params,
            required: vec!["path".into()],
        }
    }

    async fn run(&self, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path_str = ctx.params["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParams("missing 'path'".into()))?;
        let path = ctx.resolve_path(path_str);

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| fs_error(&path, e))?;
        if meta.is_dir() {
            return Err(ToolError::WrongEntryType {
                path: path.display().to_string(),
                expected: "file".into(),
            });
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| fs_error(&path, e))?;

        let offset = ctx.params["offset"].as_u64().unwrap_or(1).max(1) as usize;
        let limit = ctx.params["limit"].as_u64().unwrap_or(DEFAULT_LIMIT) as usize;

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();
        let start = (offset - 1).min(total_lines);
        let end = start.saturating_add(limit).min(total_lines);

        let mut result = String::new();
        for (i, line) in lines[start..end].iter().enumerate() {
            result.push_str(&format!("{:>6}\t{}\n", start + i + 1, line));
        }

        if end < total_lines {
            result.push_str(&format!(
                "\n... ({} more lines, {} total)",
                total_lines - end,
                total_lines
            ));
        }

        Ok(ToolResult::success(result).with_metadata(serde_json::json!({
            "path": path.display().to_string(),
            "total_lines": total_lines,
        })))
    }
}
