use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::error::ToolError;

/// Qualitative impact of a tool. Selects the default permission tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Whether a tool goes through the approval coordinator at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionRequirement {
    /// Dispatched without a permission check.
    None,
    /// Checked against policy; approvals may be trusted for the session.
    Prompt,
    /// Checked against policy; session trust is never offered.
    AlwaysPrompt,
}

impl PermissionRequirement {
    pub fn requires_check(self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn allows_session_trust(self) -> bool {
        matches!(self, Self::Prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_values: Option<Vec<String>>,
}

impl ParamSchema {
    pub fn new(param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            description: description.into(),
            enum_values: None,
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub permission: PermissionRequirement,
    pub parameters: HashMap<String, ParamSchema>,
    pub required: Vec<String>,
}

impl ToolDefinition {
    /// JSON-schema object describing the parameters.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort();

        let properties: serde_json::Map<String, serde_json::Value> = names
            .into_iter()
            .map(|k| {
                let v = &self.parameters[k];
                let mut schema = serde_json::Map::new();
                schema.insert(
                    "type".into(),
                    serde_json::Value::String(v.param_type.clone()),
                );
                schema.insert(
                    "description".into(),
                    serde_json::Value::String(v.description.clone()),
                );
                if let Some(enums) = &v.enum_values {
                    schema.insert("enum".into(), serde_json::json!(enums));
                }
                (k.clone(), serde_json::Value::Object(schema))
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema(),
            risk_level: self.risk_level,
            permission: self.permission,
        }
    }
}

/// What an automated caller sees when discovering tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub risk_level: RiskLevel,
    pub permission: PermissionRequirement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn success(content: String) -> Self {
        Self {
            content,
            is_error: false,
            metadata: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: message,
            is_error: true,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Everything a handler receives for one invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tool_name: String,
    pub params: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub working_dir: PathBuf,
    pub cancel_token: tokio_util::sync::CancellationToken,
}

impl ToolContext {
    /// Resolve a path parameter against the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if std::path::Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.working_dir.join(path)
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn run(&self, ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}
