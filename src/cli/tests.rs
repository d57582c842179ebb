use super::*;
use crate::core::permission::PermissionDecision;
use crate::core::tool::RiskLevel;
use clap::Parser;
use serde_json::json;

fn test_config(dir: &std::path::Path) -> GateConfig {
    GateConfig {
        working_dir: dir.to_path_buf(),
        ..GateConfig::default()
    }
}

#[test]
fn test_cli_parsing() {
    let cli = Cli::try_parse_from([
        "tool-gate",
        "exec",
        "read_file",
        "--params",
        r#"{"path":"a"}"#,
        "--format",
        "json",
    ])
    .unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    match cli.command {
        Some(Command::Exec { tool, params, .. }) => {
            assert_eq!(tool, "read_file");
            assert_eq!(params.as_deref(), Some(r#"{"path":"a"}"#));
        }
        other => panic!("Expected exec, got {other:?}"),
    }

    let cli = Cli::try_parse_from(["tool-gate", "policy", "set", "write_file", "deny"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Command::Policy {
            action: PolicyCommand::Set { .. }
        })
    ));

    let cli = Cli::try_parse_from(["tool-gate"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.format, OutputFormat::Text);
}

#[test]
fn test_parse_call() {
    let (tool, params) = repl::parse_call(r#"read_file {"path": "Cargo.toml"}"#).unwrap();
    assert_eq!(tool, "read_file");
    assert_eq!(params, json!({"path": "Cargo.toml"}));

    let (tool, params) = repl::parse_call("list_directory").unwrap();
    assert_eq!(tool, "list_directory");
    assert!(params.is_null());

    assert!(repl::parse_call("read_file {not json").is_err());
}

#[test]
fn test_approval_answers() {
    let offered = PermissionRequest::new("write_file", json!({}), RiskLevel::Medium, true);
    let not_offered = PermissionRequest::new("run_command", json!({}), RiskLevel::High, false);

    let r = approval::response_for("y\n", &offered);
    assert_eq!(r.decision, PermissionDecision::Approved);
    assert!(!r.trust_for_session);

    let r = approval::response_for("S", &offered);
    assert_eq!(r.decision, PermissionDecision::Approved);
    assert!(r.trust_for_session);
    assert_eq!(r.request_id, offered.id);

    let r = approval::response_for("session", &not_offered);
    assert_eq!(r.decision, PermissionDecision::Approved);
    assert!(!r.trust_for_session);

    assert_eq!(
        approval::response_for("", &offered).decision,
        PermissionDecision::Denied
    );
    assert_eq!(
        approval::response_for("maybe", &offered).decision,
        PermissionDecision::Denied
    );
}

#[tokio::test]
async fn test_approver_skips_requests_no_longer_pending() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, mut requests) = build_app(test_config(tmp.path())).unwrap();

    let gateway = app.gateway.clone();
    let stale_call = tokio::spawn(async move {
        gateway
            .execute("write_file", json!({"path": "stale.txt", "content": "x"}), None)
            .await
    });
    let stale = requests.recv().await.unwrap();
    app.coordinator.shutdown();
    assert!(!stale_call.await.unwrap().success);

    let gateway = app.gateway.clone();
    let fresh_call = tokio::spawn(async move {
        gateway
            .execute("write_file", json!({"path": "fresh.txt", "content": "y"}), None)
            .await
    });
    let fresh = requests.recv().await.unwrap();

    let (tx, rx) = mpsc::channel(4);
    tx.send(stale).await.unwrap();
    tx.send(fresh.clone()).await.unwrap();
    drop(tx);

    let asked = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = asked.clone();
    let approver = approval::spawn_approver(app.coordinator.clone(), rx, move |request| {
        seen.lock().unwrap().push(request.id.clone());
        Some("y".to_string())
    });
    approver.await.unwrap();

    assert!(fresh_call.await.unwrap().success);
    assert_eq!(*asked.lock().unwrap(), vec![fresh.id]);
    assert!(tmp.path().join("fresh.txt").exists());
    assert!(!tmp.path().join("stale.txt").exists());
}

#[test]
fn test_output_preview_truncates() {
    let short = "hello";
    assert_eq!(output::preview(short), "hello");

    let long = "é".repeat(2500);
    let shown = output::preview(&long);
    assert!(shown.ends_with("... (2500 chars)"));
}

#[tokio::test]
async fn test_build_app_wires_builtin_tools() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "first\nsecond\n").unwrap();

    let (app, mut requests) = build_app(test_config(tmp.path())).unwrap();
    assert_eq!(app.gateway.catalog().count(), 4);

    // Low risk: runs without asking
    let outcome = app
        .gateway
        .execute("read_file", json!({"path": "notes.txt"}), Some("c-1".into()))
        .await;
    assert!(outcome.success, "{}", outcome.message());
    assert!(outcome.output.unwrap().contains("second"));
    assert!(requests.try_recv().is_err());

    // Medium risk: prompts, session trust then skips the prompt
    let gateway = app.gateway.clone();
    let first = tokio::spawn(async move {
        gateway
            .execute("write_file", json!({"path": "out.txt", "content": "x"}), None)
            .await
    });
    let request = requests.recv().await.unwrap();
    assert_eq!(request.tool_name, "write_file");
    app.coordinator
        .handle_response(approval::response_for("s", &request));
    assert!(first.await.unwrap().success);
    assert!(tmp.path().join("out.txt").exists());

    let second = app
        .gateway
        .execute("write_file", json!({"path": "out2.txt", "content": "y"}), None)
        .await;
    assert!(second.success);
    assert!(requests.try_recv().is_err());

    app.gateway.shutdown();
    assert!(!app.coordinator.has_session_trust("write_file"));
}

#[tokio::test]
async fn test_policy_changes_persist_under_data_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let policy_path = config.policy_path();

    let (app, _requests) = build_app(config.clone()).unwrap();
    run_policy(
        &app,
        PolicyCommand::Set {
            tool: "write_file".into(),
            tier: "always-deny".into(),
        },
        OutputFormat::Json,
    )
    .unwrap();
    assert!(policy_path.exists());
    assert!(policy_path.starts_with(tmp.path().join(".tool-gate")));

    let (reloaded, _requests) = build_app(config).unwrap();
    assert_eq!(
        reloaded.policy.get_tier("write_file"),
        PermissionTier::AlwaysDeny
    );
    let outcome = reloaded
        .gateway
        .execute("write_file", json!({"path": "a", "content": "b"}), None)
        .await;
    assert_eq!(outcome.message(), "Permission denied for tool 'write_file'");
}

#[tokio::test]
async fn test_policy_set_rejects_unknown_tier() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _requests) = build_app(test_config(tmp.path())).unwrap();

    let err = run_policy(
        &app,
        PolicyCommand::Set {
            tool: "write_file".into(),
            tier: "sometimes".into(),
        },
        OutputFormat::Text,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown permission tier"));
    assert_eq!(app.policy.get_tier("write_file"), PermissionTier::Prompt);
}
