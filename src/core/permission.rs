use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::tool::RiskLevel;

/// Per-tool policy setting, persisted by the policy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionTier {
    AlwaysAllow,
    Prompt,
    AlwaysDeny,
}

impl PermissionTier {
    /// Built-in tier for a tool that has no persisted override.
    pub fn default_for(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Low => Self::AlwaysAllow,
            RiskLevel::Medium | RiskLevel::High => Self::Prompt,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysAllow => "always_allow",
            Self::Prompt => "prompt",
            Self::AlwaysDeny => "always_deny",
        }
    }
}

impl Default for PermissionTier {
    fn default() -> Self {
        Self::Prompt
    }
}

impl std::fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "always_allow" | "allow" => Ok(Self::AlwaysAllow),
            "prompt" | "ask" => Ok(Self::Prompt),
            "always_deny" | "deny" => Ok(Self::AlwaysDeny),
            other => Err(format!(
                "unknown permission tier '{other}' (expected always_allow, prompt or always_deny)"
            )),
        }
    }
}

/// One pending human-approval round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: String,
    pub tool_name: String,
    pub params: serde_json::Value,
    pub risk_level: RiskLevel,
    pub allow_session_trust: bool,
    pub created_at: DateTime<Utc>,
}

impl PermissionRequest {
    pub fn new(
        tool_name: impl Into<String>,
        params: serde_json::Value,
        risk_level: RiskLevel,
        allow_session_trust: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            params,
            risk_level,
            allow_session_trust,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Approved,
    Denied,
    Timeout,
}

impl PermissionDecision {
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// The approver's answer to a [`PermissionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub request_id: String,
    pub decision: PermissionDecision,
    #[serde(default)]
    pub trust_for_session: bool,
}

impl PermissionResponse {
    pub fn approve(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            decision: PermissionDecision::Approved,
            trust_for_session: false,
        }
    }

    pub fn approve_for_session(request_id: impl Into<String>) -> Self {
        Self {
            trust_for_session: true,
            ..Self::approve(request_id)
        }
    }

    pub fn deny(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            decision: PermissionDecision::Denied,
            trust_for_session: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTrustEntry {
    pub tool_name: String,
    pub granted_at: DateTime<Utc>,
}

#[async_trait]
pub trait PermissionService: Send + Sync {
    async fn check_permission(
        &self,
        tool_name: &str,
        params: &serde_json::Value,
        risk_level: RiskLevel,
        allow_session_trust: bool,
    ) -> PermissionDecision;

    /// How long a prompt may stay unanswered before it resolves to timeout.
    fn approval_window(&self) -> Duration;

    /// Resolve everything still pending as denied and drop session trust.
    fn shutdown(&self);
}
