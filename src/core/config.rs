use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Directory (relative to the working dir) holding the policy file
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub debug: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            data_dir: default_data_dir(),
            approval: ApprovalConfig::default(),
            policy: PolicyConfig::default(),
            gateway: GatewayConfig::default(),
            debug: false,
        }
    }
}

fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_data_dir() -> String {
    ".tool-gate".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Seconds a prompt waits for an answer before timing out
    #[serde(default = "default_approval_timeout")]
    pub timeout_secs: u64,
}

fn default_approval_timeout() -> u64 {
    300
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_approval_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_file")]
    pub file_name: String,

    /// Tier changes inside this window are coalesced into one write
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_policy_file() -> String {
    "policy.json".into()
}

fn default_debounce_ms() -> u64 {
    1_000
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            file_name: default_policy_file(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Executions slower than this are logged as warnings
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

fn default_slow_threshold_ms() -> u64 {
    1_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

pub fn load_config(working_dir: Option<PathBuf>) -> Result<GateConfig, ConfigError> {
    let wd = working_dir.unwrap_or_else(default_working_dir);

    let mut config = GateConfig::default();
    config.working_dir = wd.clone();

    // Global config first, project config overrides it
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("tool-gate").join("config.json");
        if global_path.exists() {
            merge_config(&mut config, read_config_file(&global_path)?);
        }
    }

    let local_path = wd.join("tool-gate.json");
    if local_path.exists() {
        merge_config(&mut config, read_config_file(&local_path)?);
    }

    apply_env_overrides(&mut config)?;

    Ok(config)
}

fn read_config_file(path: &std::path::Path) -> Result<GateConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))
}

fn merge_config(base: &mut GateConfig, overlay: GateConfig) {
    if overlay.data_dir != default_data_dir() {
        base.data_dir = overlay.data_dir;
    }
    if overlay.approval.timeout_secs != default_approval_timeout() {
        base.approval.timeout_secs = overlay.approval.timeout_secs;
    }
    if overlay.policy.file_name != default_policy_file() {
        base.policy.file_name = overlay.policy.file_name;
    }
    if overlay.policy.debounce_ms != default_debounce_ms() {
        base.policy.debounce_ms = overlay.policy.debounce_ms;
    }
    if overlay.gateway.slow_threshold_ms != default_slow_threshold_ms() {
        base.gateway.slow_threshold_ms = overlay.gateway.slow_threshold_ms;
    }
    if overlay.debug {
        base.debug = true;
    }
}

fn apply_env_overrides(config: &mut GateConfig) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var("TOOL_GATE_APPROVAL_TIMEOUT") {
        if !value.is_empty() {
            config.approval.timeout_secs = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "TOOL_GATE_APPROVAL_TIMEOUT must be a number of seconds, got '{value}'"
                ))
            })?;
        }
    }

    if let Ok(dir) = std::env::var("TOOL_GATE_DATA_DIR") {
        if !dir.is_empty() {
            config.data_dir = dir;
        }
    }

    Ok(())
}

impl GateConfig {
    pub fn data_path(&self) -> PathBuf {
        self.working_dir.join(&self.data_dir)
    }

    pub fn policy_path(&self) -> PathBuf {
        self.data_path().join(&self.policy.file_name)
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval.timeout_secs)
    }

    pub fn policy_debounce(&self) -> Duration {
        Duration::from_millis(self.policy.debounce_ms)
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.gateway.slow_threshold_ms)
    }
}
