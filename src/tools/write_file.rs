use async_trait::async_trait;
use crate::core::error::ToolError;
use crate::core::tool::*;
use std::collections::HashMap;

use super::fs_error;

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        let mut params = HashMap::new();
        params.insert("path".into(), ParamSchema::new("string", "File path to write to"));
        params.insert(
            "content".into(),
            ParamSchema::new("string", "Content to write to the file"),
        );

        ToolDefinition {
            name: "write_file".into(),
            description: "Write content to a file. Creates the file if it doesn't exist, \
                or overwrites if it does. Creates parent directories as needed."
                .into(),
            risk_level: RiskLevel::Medium,
            permission: PermissionRequirement::Prompt,
            parameters: params,
            required: vec!["path".into(), "content".into()],
        }
    }

    async fn run(&self, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path_str = ctx.params["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParams("missing 'path'".into()))?;
        let content = ctx.params["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParams("missing 'content'".into()))?;

        let path = ctx.resolve_path(path_str);
        if path.is_dir() {
            return Err(ToolError::WrongEntryType {
                path: path.display().to_string(),
                expected: "file".into(),
            });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fs_error(parent, e))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| fs_error(&path, e))?;

        let lines = content.lines().count();
        tracing::debug!(path = %path.display(), lines, "File written");
        Ok(ToolResult::success(format!(
            "Wrote {} lines to {}",
            lines,
            path.display()
        )))
    }
}
