use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

/// Faults raised by tool handlers. The gateway never returns these directly;
/// they are categorized into an [`ExecutionError`] first.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Expected a {expected}: {path}")]
    WrongEntryType { path: String, expected: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// User-facing category of a handler fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    AccessDenied,
    WrongEntryType,
    Generic,
}

/// One offending parameter in a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub expected: String,
    pub received: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}': expected {}, received {}",
            self.field, self.expected, self.received
        )
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every failure the gateway can report. Returned inside an outcome, never
/// thrown across the gateway boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("Unknown tool '{name}'. Available tools: {}", .available.join(", "))]
    UnknownTool { name: String, available: Vec<String> },

    #[error("Invalid parameters for '{tool}': {}", join_fields(.fields))]
    Validation { tool: String, fields: Vec<FieldError> },

    #[error("Permission denied for tool '{tool}'")]
    PermissionDenied { tool: String },

    #[error("Permission request for tool '{tool}' timed out after {window_secs}s")]
    PermissionTimeout { tool: String, window_secs: u64 },

    #[error("{message}")]
    Execution {
        tool: String,
        category: ErrorCategory,
        message: String,
    },
}

impl ExecutionError {
    pub fn tool(&self) -> &str {
        match self {
            Self::UnknownTool { name, .. } => name,
            Self::Validation { tool, .. }
            | Self::PermissionDenied { tool }
            | Self::PermissionTimeout { tool, .. }
            | Self::Execution { tool, .. } => tool,
        }
    }
}
