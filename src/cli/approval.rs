use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::permission::{PermissionRequest, PermissionResponse};
use crate::permission::ApprovalCoordinator;

/// Terminal approval surface: prompts on stderr for every request the
/// coordinator emits and reports the answer back.
pub fn spawn_terminal_approver(
    coordinator: Arc<ApprovalCoordinator>,
    requests: mpsc::Receiver<PermissionRequest>,
) -> JoinHandle<()> {
    spawn_approver(coordinator, requests, prompt)
}

/// Drives `ask` for each request still awaiting a decision. Requests that
/// timed out or were resolved while queued are skipped without asking.
pub(crate) fn spawn_approver<F>(
    coordinator: Arc<ApprovalCoordinator>,
    mut requests: mpsc::Receiver<PermissionRequest>,
    ask: F,
) -> JoinHandle<()>
where
    F: Fn(&PermissionRequest) -> Option<String> + Send + Sync + 'static,
{
    let ask = Arc::new(ask);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            if !coordinator.is_pending(&request.id) {
                tracing::debug!(
                    request_id = %request.id,
                    tool = %request.tool_name,
                    "Skipping request that is no longer pending"
                );
                continue;
            }

            let ask = Arc::clone(&ask);
            let prompt_request = request.clone();
            let answer = tokio::task::spawn_blocking(move || ask(&prompt_request))
                .await
                .unwrap_or(None);

            let response = match answer {
                Some(input) => response_for(&input, &request),
                None => PermissionResponse::deny(&request.id),
            };
            if !coordinator.handle_response(response) {
                eprintln!(
                    "  \x1b[90mRequest for {} already timed out or was resolved; answer not applied.\x1b[0m",
                    request.tool_name
                );
            }
        }
        tracing::debug!("Approval channel closed");
    })
}

fn prompt(request: &PermissionRequest) -> Option<String> {
    eprintln!();
    eprintln!(
        "\x1b[33m[Permission Required]\x1b[0m {} (risk: {})",
        request.tool_name, request.risk_level
    );
    if !request.params.is_null() {
        eprintln!("  Params: {}", request.params);
    }
    if request.allow_session_trust {
        eprint!("  Allow? [y]es / [n]o / [s]ession: ");
    } else {
        eprint!("  Allow? [y]es / [n]o: ");
    }
    io::stderr().flush().ok();

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input),
    }
}

/// Anything other than an explicit yes denies.
pub(crate) fn response_for(input: &str, request: &PermissionRequest) -> PermissionResponse {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => PermissionResponse::approve(&request.id),
        "s" | "session" if request.allow_session_trust => {
            PermissionResponse::approve_for_session(&request.id)
        }
        "s" | "session" => {
            eprintln!("  Session trust is not available for this tool; approving once.");
            PermissionResponse::approve(&request.id)
        }
        _ => PermissionResponse::deny(&request.id),
    }
}
