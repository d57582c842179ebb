use async_trait::async_trait;
use crate::core::error::ToolError;
use crate::core::tool::*;
use std::collections::HashMap;

use super::fs_error;

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        let mut params = HashMap::new();
        params.insert(
            "path".into(),
            ParamSchema::new("string", "Directory path to list (default: working directory)"),
        );

        ToolDefinition {
            name: "list_directory".into(),
            description: "List directory contents with file types and sizes.".into(),
            risk_level: RiskLevel::Low,
            permission: PermissionRequirement::None,
            parameters: params,
            required: vec![],
        }
    }

    async fn run(&self, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path_str = ctx.params["path"].as_str().unwrap_or(".");
        let path = ctx.resolve_path(path_str);

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| fs_error(&path, e))?;
        if !meta.is_dir() {
            return Err(ToolError::WrongEntryType {
                path: path.display().to_string(),
                expected: "directory".into(),
            });
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| fs_error(&path, e))?;

        while let Some(entry) = dir.next_entry().await.map_err(|e| fs_error(&path, e))? {
            let meta = entry.metadata().await.ok();
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = meta.as_ref().is_some_and(|m| m.is_dir());
            let size = meta.as_ref().map_or(0, |m| m.len());

            if is_dir {
                entries.push(format!("  {name}/"));
            } else {
                entries.push(format!("  {name}  ({size} bytes)"));
            }
        }

        entries.sort();
        let count = entries.len();
        let mut result = format!("{}:\n", path.display());
        result.push_str(&entries.join("\n"));

        Ok(ToolResult::success(result).with_metadata(serde_json::json!({ "entries": count })))
    }
}
