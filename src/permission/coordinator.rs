use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::core::event::{EventBus, GateEvent};
use crate::core::permission::{
    PermissionDecision, PermissionRequest, PermissionResponse, PermissionService,
    PermissionTier, SessionTrustEntry,
};
use crate::core::tool::RiskLevel;
use crate::storage::PolicyStore;

pub const DEFAULT_APPROVAL_WINDOW: Duration = Duration::from_secs(5 * 60);

const REQUEST_CHANNEL_CAPACITY: usize = 32;

struct PendingEntry {
    request: PermissionRequest,
    responder: oneshot::Sender<PermissionDecision>,
}

enum Wait {
    Decided(PermissionDecision),
    NoSurface,
    ResponderDropped,
}

impl Wait {
    fn from_responder(received: Result<PermissionDecision, oneshot::error::RecvError>) -> Self {
        match received {
            Ok(decision) => Self::Decided(decision),
            Err(_) => Self::ResponderDropped,
        }
    }
}

/// Decides whether a tool call may proceed, asking a human when policy says so.
///
/// Prompts are sent on the request channel returned by [`ApprovalCoordinator::new`].
/// Whoever consumes that channel answers through [`ApprovalCoordinator::handle_response`].
/// Each request resolves exactly once: the first of response, timeout or
/// shutdown to claim its pending entry decides the outcome.
pub struct ApprovalCoordinator {
    policy: PolicyStore,
    requests: mpsc::Sender<PermissionRequest>,
    pending: Mutex<HashMap<String, PendingEntry>>,
    session_trust: Mutex<HashMap<String, SessionTrustEntry>>,
    window: Duration,
    events: EventBus,
}

impl ApprovalCoordinator {
    pub fn new(policy: PolicyStore, window: Duration) -> (Self, mpsc::Receiver<PermissionRequest>) {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        (
            Self {
                policy,
                requests: tx,
                pending: Mutex::new(HashMap::new()),
                session_trust: Mutex::new(HashMap::new()),
                window,
                events: EventBus::new(),
            },
            rx,
        )
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub async fn check_permission(
        &self,
        tool_name: &str,
        params: &serde_json::Value,
        risk_level: RiskLevel,
        allow_session_trust: bool,
    ) -> PermissionDecision {
        if allow_session_trust && self.has_session_trust(tool_name) {
            tracing::debug!(tool = %tool_name, "Approved by session trust");
            return PermissionDecision::Approved;
        }

        match self.policy.get_tier(tool_name) {
            PermissionTier::AlwaysAllow => {
                tracing::debug!(tool = %tool_name, "Approved by policy");
                return PermissionDecision::Approved;
            }
            PermissionTier::AlwaysDeny => {
                tracing::info!(tool = %tool_name, "Denied by policy");
                return PermissionDecision::Denied;
            }
            PermissionTier::Prompt => {}
        }

        let request =
            PermissionRequest::new(tool_name, params.clone(), risk_level, allow_session_trust);
        let id = request.id.clone();
        let (tx, mut rx) = oneshot::channel();

        self.lock_pending().insert(
            id.clone(),
            PendingEntry {
                request: request.clone(),
                responder: tx,
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        tracing::info!(tool = %tool_name, request_id = %id, risk = %risk_level, "Awaiting approval");
        self.events.publish(GateEvent::PermissionRequested {
            request: request.clone(),
        });

        // The send can block on a full channel; the responder must still win
        // if shutdown resolves the request in the meantime.
        let waited = tokio::time::timeout(self.window, async {
            tokio::select! {
                received = &mut rx => return Wait::from_responder(received),
                sent = self.requests.send(request) => {
                    if sent.is_err() {
                        return Wait::NoSurface;
                    }
                }
            }
            Wait::from_responder((&mut rx).await)
        })
        .await;

        let decision = match waited {
            Ok(Wait::Decided(decision)) => decision,
            Ok(Wait::ResponderDropped) => PermissionDecision::Denied,
            Ok(Wait::NoSurface) => {
                tracing::warn!(tool = %tool_name, request_id = %id, "No approval surface is listening");
                self.claim_or_await(&id, rx, PermissionDecision::Denied).await
            }
            Err(_) => {
                tracing::warn!(
                    tool = %tool_name,
                    request_id = %id,
                    window_ms = self.window.as_millis() as u64,
                    "Approval request timed out"
                );
                self.claim_or_await(&id, rx, PermissionDecision::Timeout).await
            }
        };

        self.events.publish(GateEvent::PermissionResolved {
            request_id: id,
            tool_name: tool_name.to_string(),
            decision,
        });
        decision
    }

    /// Resolve a pending request. Returns `false` (and changes nothing) when
    /// the id is unknown or was already resolved.
    pub fn handle_response(&self, response: PermissionResponse) -> bool {
        let Some(entry) = self.take_pending(&response.request_id) else {
            tracing::debug!(
                request_id = %response.request_id,
                "Ignoring response for unknown or already resolved request"
            );
            return false;
        };

        let tool_name = &entry.request.tool_name;
        if response.decision.is_approved() && response.trust_for_session {
            if entry.request.allow_session_trust {
                self.grant_session_trust(tool_name);
            } else {
                tracing::debug!(tool = %tool_name, "Session trust not offered, approving once");
            }
        }

        tracing::info!(
            tool = %tool_name,
            request_id = %response.request_id,
            decision = ?response.decision,
            "Approval response received"
        );
        if entry.responder.send(response.decision).is_err() {
            tracing::debug!(request_id = %response.request_id, "Requester no longer waiting");
        }
        true
    }

    /// Remove trust for one tool, or for all tools when `tool_name` is `None`.
    /// Returns how many entries were removed.
    pub fn clear_session_trust(&self, tool_name: Option<&str>) -> usize {
        let mut trust = self.lock_trust();
        match tool_name {
            Some(name) => usize::from(trust.remove(name).is_some()),
            None => {
                let count = trust.len();
                trust.clear();
                count
            }
        }
    }

    /// Deny every pending request and drop all session trust.
    pub fn shutdown(&self) {
        let drained: Vec<PendingEntry> = self.lock_pending().drain().map(|(_, e)| e).collect();
        let denied = drained.len();
        for entry in drained {
            let _ = entry.responder.send(PermissionDecision::Denied);
        }
        let cleared = self.clear_session_trust(None);
        tracing::info!(denied, cleared, "Approval coordinator shut down");
    }

    pub fn has_session_trust(&self, tool_name: &str) -> bool {
        self.lock_trust().contains_key(tool_name)
    }

    pub fn trusted_tools(&self) -> Vec<SessionTrustEntry> {
        let mut entries: Vec<SessionTrustEntry> = self.lock_trust().values().cloned().collect();
        entries.sort_by(|a, b| a.tool_name.cmp(&b.tool_name));
        entries
    }

    /// Whether `request_id` is still awaiting a decision.
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.lock_pending().contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn pending_requests(&self) -> Vec<PermissionRequest> {
        let mut requests: Vec<PermissionRequest> = self
            .lock_pending()
            .values()
            .map(|e| e.request.clone())
            .collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    pub fn approval_window(&self) -> Duration {
        self.window
    }

    fn grant_session_trust(&self, tool_name: &str) {
        tracing::info!(tool = %tool_name, "Session trust granted");
        self.lock_trust().insert(
            tool_name.to_string(),
            SessionTrustEntry {
                tool_name: tool_name.to_string(),
                granted_at: Utc::now(),
            },
        );
    }

    /// Claim the entry for `if_claimed`, or, if someone else already claimed
    /// it, take the decision they delivered.
    async fn claim_or_await(
        &self,
        id: &str,
        rx: oneshot::Receiver<PermissionDecision>,
        if_claimed: PermissionDecision,
    ) -> PermissionDecision {
        if self.take_pending(id).is_some() {
            return if_claimed;
        }
        rx.await.unwrap_or(PermissionDecision::Denied)
    }

    fn take_pending(&self, id: &str) -> Option<PendingEntry> {
        self.lock_pending().remove(id)
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingEntry>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_trust(&self) -> MutexGuard<'_, HashMap<String, SessionTrustEntry>> {
        self.session_trust.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drops the pending entry if the waiting caller goes away mid-wait.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<String, PendingEntry>>,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let removed = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
        if removed.is_some() {
            tracing::debug!(request_id = %self.id, "Approval wait abandoned");
        }
    }
}

#[async_trait]
impl PermissionService for ApprovalCoordinator {
    async fn check_permission(
        &self,
        tool_name: &str,
        params: &serde_json::Value,
        risk_level: RiskLevel,
        allow_session_trust: bool,
    ) -> PermissionDecision {
        ApprovalCoordinator::check_permission(self, tool_name, params, risk_level, allow_session_trust)
            .await
    }

    fn approval_window(&self) -> Duration {
        self.window
    }

    fn shutdown(&self) {
        ApprovalCoordinator::shutdown(self);
    }
}
