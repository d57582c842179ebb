use super::config::*;
use super::error::*;
use super::event::*;
use super::permission::*;
use super::tool::*;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_config_defaults() {
    let config = GateConfig::default();
    assert_eq!(config.data_dir, ".tool-gate");
    assert_eq!(config.approval.timeout_secs, 300);
    assert_eq!(config.approval_timeout(), Duration::from_secs(300));
    assert_eq!(config.policy.file_name, "policy.json");
    assert_eq!(config.policy_debounce(), Duration::from_secs(1));
    assert_eq!(config.slow_threshold(), Duration::from_millis(1000));
    assert!(!config.debug);
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let config: GateConfig = serde_json::from_str(r#"{"approval": {"timeout_secs": 30}}"#).unwrap();
    assert_eq!(config.approval.timeout_secs, 30);
    assert_eq!(config.policy.debounce_ms, 1000);
    assert_eq!(config.data_dir, ".tool-gate");
}

// Env overrides are process-wide, so file and env loading share one test
#[test]
fn test_load_config_layers() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("tool-gate.json"),
        r#"{"data_dir": "state", "gateway": {"slow_threshold_ms": 250}, "debug": true}"#,
    )
    .unwrap();

    let config = load_config(Some(tmp.path().to_path_buf())).unwrap();
    assert_eq!(config.working_dir, tmp.path());
    assert_eq!(config.data_dir, "state");
    assert_eq!(config.slow_threshold(), Duration::from_millis(250));
    assert!(config.debug);
    assert_eq!(
        config.policy_path(),
        tmp.path().join("state").join("policy.json")
    );

    std::env::set_var("TOOL_GATE_APPROVAL_TIMEOUT", "42");
    std::env::set_var("TOOL_GATE_DATA_DIR", "elsewhere");
    let config = load_config(Some(tmp.path().to_path_buf()));
    std::env::set_var("TOOL_GATE_APPROVAL_TIMEOUT", "soon");
    let invalid = load_config(Some(tmp.path().to_path_buf()));
    std::env::remove_var("TOOL_GATE_APPROVAL_TIMEOUT");
    std::env::remove_var("TOOL_GATE_DATA_DIR");

    let config = config.unwrap();
    assert_eq!(config.approval_timeout(), Duration::from_secs(42));
    assert_eq!(config.data_dir, "elsewhere");
    assert!(matches!(invalid, Err(ConfigError::Invalid(_))));

    std::fs::write(tmp.path().join("tool-gate.json"), "{ broken").unwrap();
    assert!(matches!(
        load_config(Some(tmp.path().to_path_buf())),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_tier_serialization() {
    assert_eq!(
        serde_json::to_string(&PermissionTier::AlwaysAllow).unwrap(),
        r#""always_allow""#
    );
    let tier: PermissionTier = serde_json::from_str(r#""always_deny""#).unwrap();
    assert_eq!(tier, PermissionTier::AlwaysDeny);
    assert!(serde_json::from_str::<PermissionTier>(r#""sometimes""#).is_err());
}

#[test]
fn test_default_tier_follows_risk() {
    assert_eq!(PermissionTier::default_for(RiskLevel::Low), PermissionTier::AlwaysAllow);
    assert_eq!(PermissionTier::default_for(RiskLevel::Medium), PermissionTier::Prompt);
    assert_eq!(PermissionTier::default_for(RiskLevel::High), PermissionTier::Prompt);
}

#[test]
fn test_permission_requirement() {
    assert!(!PermissionRequirement::None.requires_check());
    assert!(PermissionRequirement::Prompt.requires_check());
    assert!(PermissionRequirement::AlwaysPrompt.requires_check());
    assert!(PermissionRequirement::Prompt.allows_session_trust());
    assert!(!PermissionRequirement::AlwaysPrompt.allows_session_trust());
    assert!(!PermissionRequirement::None.allows_session_trust());
}

#[test]
fn test_response_defaults_trust_to_false() {
    let resp: PermissionResponse =
        serde_json::from_str(r#"{"request_id": "abc", "decision": "approved"}"#).unwrap();
    assert!(resp.decision.is_approved());
    assert!(!resp.trust_for_session);
}

#[test]
fn test_input_schema_export() {
    let mut params = HashMap::new();
    params.insert("path".into(), ParamSchema::new("string", "File path"));
    params.insert(
        "mode".into(),
        ParamSchema::new("string", "Mode").with_enum(&["fast", "slow"]),
    );
    let def = ToolDefinition {
        name: "probe".into(),
        description: "Probe a path".into(),
        risk_level: RiskLevel::Medium,
        permission: PermissionRequirement::Prompt,
        parameters: params,
        required: vec!["path".into()],
    };

    let schema = def.to_schema();
    assert_eq!(schema.name, "probe");
    assert_eq!(schema.parameters["type"], "object");
    assert_eq!(schema.parameters["required"], json!(["path"]));
    assert_eq!(schema.parameters["properties"]["mode"]["enum"], json!(["fast", "slow"]));
    assert!(schema.parameters["properties"]["path"].get("enum").is_none());

    let value = serde_json::to_value(&schema).unwrap();
    assert_eq!(value["risk_level"], "medium");
    assert_eq!(value["permission"], "prompt");
}

#[test]
fn test_resolve_path() {
    let ctx = ToolContext {
        tool_name: "t".into(),
        params: json!({}),
        timestamp: chrono::Utc::now(),
        correlation_id: "c".into(),
        working_dir: "/work".into(),
        cancel_token: tokio_util::sync::CancellationToken::new(),
    };
    assert_eq!(ctx.resolve_path("a/b.txt"), std::path::PathBuf::from("/work/a/b.txt"));
    assert_eq!(ctx.resolve_path("/etc/hosts"), std::path::PathBuf::from("/etc/hosts"));
}

#[test]
fn test_execution_error_messages() {
    let unknown = ExecutionError::UnknownTool {
        name: "nope".into(),
        available: vec!["a".into(), "b".into()],
    };
    assert_eq!(unknown.to_string(), "Unknown tool 'nope'. Available tools: a, b");
    assert_eq!(unknown.tool(), "nope");

    let validation = ExecutionError::Validation {
        tool: "probe".into(),
        fields: vec![FieldError {
            field: "path".into(),
            expected: "string".into(),
            received: "missing".into(),
        }],
    };
    assert_eq!(
        validation.to_string(),
        "Invalid parameters for 'probe': 'path': expected string, received missing"
    );

    let timeout = ExecutionError::PermissionTimeout {
        tool: "probe".into(),
        window_secs: 300,
    };
    assert_eq!(
        timeout.to_string(),
        "Permission request for tool 'probe' timed out after 300s"
    );
}

#[test]
fn test_execution_error_serialization() {
    let err = ExecutionError::Execution {
        tool: "probe".into(),
        category: ErrorCategory::WrongEntryType,
        message: "expected a file".into(),
    };
    let value = serde_json::to_value(&err).unwrap();
    assert_eq!(value["kind"], "execution");
    assert_eq!(value["category"], "wrong_entry_type");
    assert_eq!(value["tool"], "probe");
}

#[tokio::test]
async fn test_event_bus() {
    let bus = EventBus::new();
    // No subscribers is fine
    assert_eq!(
        bus.publish(GateEvent::PolicyChanged {
            tool_name: "x".into(),
            tier: None
        }),
        0
    );

    let mut rx = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);
    bus.publish(GateEvent::ToolStarted {
        tool_name: "probe".into(),
        correlation_id: "c-1".into(),
    });

    let event = rx.recv().await.unwrap();
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "tool_started");
    assert_eq!(value["correlation_id"], "c-1");
}
