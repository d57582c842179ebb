use serde::Serialize;
use std::io::ErrorKind;

use crate::core::error::{ErrorCategory, ExecutionError, ToolError};
use crate::core::tool::ToolResult;

/// Uniform result of one gateway call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub tool_name: String,
    pub correlation_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    /// Time spent inside the handler; zero when it was never invoked
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    pub(crate) fn from_result(
        tool_name: &str,
        correlation_id: String,
        result: Result<ToolResult, ExecutionError>,
        duration_ms: u64,
    ) -> Self {
        match result {
            Ok(output) => Self {
                tool_name: tool_name.to_string(),
                correlation_id,
                success: true,
                output: Some(output.content),
                metadata: output.metadata,
                error: None,
                duration_ms,
            },
            Err(error) => Self {
                tool_name: tool_name.to_string(),
                correlation_id,
                success: false,
                output: None,
                metadata: None,
                error: Some(error),
                duration_ms,
            },
        }
    }

    /// Output on success, the error message otherwise.
    pub fn message(&self) -> String {
        match (&self.output, &self.error) {
            (_, Some(error)) => error.to_string(),
            (Some(output), None) => output.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Map a handler fault to a user-facing error. Raw internal detail stays in
/// the logs.
pub(crate) fn categorize(tool_name: &str, error: ToolError) -> ExecutionError {
    tracing::warn!(tool = %tool_name, error = %error, "Tool execution failed");

    let (category, message) = match error {
        ToolError::NotFound(what) => (
            ErrorCategory::NotFound,
            format!("Tool '{tool_name}' could not find: {what}"),
        ),
        ToolError::AccessDenied(what) => (
            ErrorCategory::AccessDenied,
            format!("Tool '{tool_name}' was denied access to: {what}"),
        ),
        ToolError::WrongEntryType { path, expected } => (
            ErrorCategory::WrongEntryType,
            format!("Tool '{tool_name}' expected a {expected} at: {path}"),
        ),
        ToolError::Io(e) => match e.kind() {
            ErrorKind::NotFound => (
                ErrorCategory::NotFound,
                format!("Tool '{tool_name}' could not find the requested file or directory"),
            ),
            ErrorKind::PermissionDenied => (
                ErrorCategory::AccessDenied,
                format!("Tool '{tool_name}' was denied access by the operating system"),
            ),
            ErrorKind::IsADirectory => (
                ErrorCategory::WrongEntryType,
                format!("Tool '{tool_name}' expected a file but found a directory"),
            ),
            ErrorKind::NotADirectory => (
                ErrorCategory::WrongEntryType,
                format!("Tool '{tool_name}' expected a directory but found a file"),
            ),
            kind => (
                ErrorCategory::Generic,
                format!("Tool '{tool_name}' failed: {kind}"),
            ),
        },
        ToolError::InvalidParams(msg) => (
            ErrorCategory::Generic,
            format!("Tool '{tool_name}' rejected its parameters: {msg}"),
        ),
        ToolError::ExecutionFailed(msg) => (
            ErrorCategory::Generic,
            format!("Tool '{tool_name}' failed: {msg}"),
        ),
        ToolError::Timeout(secs) => (
            ErrorCategory::Generic,
            format!("Tool '{tool_name}' timed out after {secs}s"),
        ),
    };

    ExecutionError::Execution {
        tool: tool_name.to_string(),
        category,
        message,
    }
}
