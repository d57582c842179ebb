use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::{validate_params, ToolCatalog};
use crate::core::error::{ErrorCategory, ExecutionError};
use crate::core::event::{EventBus, GateEvent};
use crate::core::permission::{PermissionDecision, PermissionService};
use crate::core::tool::{ToolContext, ToolResult, ToolSchema};
use crate::gateway::outcome::{categorize, ExecutionOutcome};
use crate::storage::PolicyStore;

pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);

/// Single entry point for running tools: lookup, validation, permission,
/// dispatch. Every failure comes back inside the [`ExecutionOutcome`].
pub struct ExecutionGateway {
    catalog: ToolCatalog,
    permissions: Arc<dyn PermissionService>,
    policy: Option<PolicyStore>,
    events: EventBus,
    working_dir: PathBuf,
    slow_threshold: Duration,
    cancel: CancellationToken,
}

impl ExecutionGateway {
    pub fn new(
        catalog: ToolCatalog,
        permissions: Arc<dyn PermissionService>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            permissions,
            policy: None,
            events: EventBus::new(),
            working_dir,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            cancel: CancellationToken::new(),
        }
    }

    /// Flushed on shutdown so no tier change is lost.
    pub fn with_policy_store(mut self, policy: PolicyStore) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn export_schemas(&self) -> Vec<ToolSchema> {
        self.catalog.export_schemas()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn execute(
        &self,
        tool_name: &str,
        params: Value,
        correlation_id: Option<String>,
    ) -> ExecutionOutcome {
        let correlation_id = correlation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let (result, duration_ms) = self.dispatch(tool_name, params, &correlation_id).await;
        ExecutionOutcome::from_result(tool_name, correlation_id, result, duration_ms)
    }

    async fn dispatch(
        &self,
        tool_name: &str,
        params: Value,
        correlation_id: &str,
    ) -> (Result<ToolResult, ExecutionError>, u64) {
        let Some(entry) = self.catalog.lookup(tool_name) else {
            tracing::warn!(tool = %tool_name, "Unknown tool requested");
            return (
                Err(ExecutionError::UnknownTool {
                    name: tool_name.to_string(),
                    available: self.catalog.names(),
                }),
                0,
            );
        };
        let definition = &entry.definition;

        let params = if params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params
        };

        let fields = validate_params(definition, &params);
        if !fields.is_empty() {
            tracing::debug!(tool = %tool_name, invalid = fields.len(), "Parameter validation failed");
            return (
                Err(ExecutionError::Validation {
                    tool: tool_name.to_string(),
                    fields,
                }),
                0,
            );
        }

        if definition.permission.requires_check() {
            let decision = self
                .permissions
                .check_permission(
                    tool_name,
                    &params,
                    definition.risk_level,
                    definition.permission.allows_session_trust(),
                )
                .await;

            match decision {
                PermissionDecision::Approved => {}
                PermissionDecision::Denied => {
                    return (
                        Err(ExecutionError::PermissionDenied {
                            tool: tool_name.to_string(),
                        }),
                        0,
                    );
                }
                PermissionDecision::Timeout => {
                    return (
                        Err(ExecutionError::PermissionTimeout {
                            tool: tool_name.to_string(),
                            window_secs: whole_secs_rounded_up(self.permissions.approval_window()),
                        }),
                        0,
                    );
                }
            }
        }

        let ctx = ToolContext {
            tool_name: tool_name.to_string(),
            params,
            timestamp: chrono::Utc::now(),
            correlation_id: correlation_id.to_string(),
            working_dir: self.working_dir.clone(),
            cancel_token: self.cancel.child_token(),
        };
        let tool = Arc::clone(&entry.tool);

        self.events.publish(GateEvent::ToolStarted {
            tool_name: tool_name.to_string(),
            correlation_id: correlation_id.to_string(),
        });

        // Spawned so a panicking handler surfaces as a join error
        let started = Instant::now();
        let joined = tokio::spawn(async move { tool.run(&ctx).await }).await;
        let elapsed = started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let result = match joined {
            Ok(Ok(output)) if !output.is_error => Ok(output),
            Ok(Ok(output)) => Err(ExecutionError::Execution {
                tool: tool_name.to_string(),
                category: ErrorCategory::Generic,
                message: output.content,
            }),
            Ok(Err(e)) => Err(categorize(tool_name, e)),
            Err(e) => {
                tracing::error!(tool = %tool_name, correlation_id = %correlation_id, "Tool handler aborted: {e}");
                Err(ExecutionError::Execution {
                    tool: tool_name.to_string(),
                    category: ErrorCategory::Generic,
                    message: format!("Tool '{tool_name}' failed unexpectedly"),
                })
            }
        };

        if elapsed > self.slow_threshold {
            let threshold_ms = u64::try_from(self.slow_threshold.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                tool = %tool_name,
                correlation_id = %correlation_id,
                duration_ms,
                threshold_ms,
                "Slow tool execution"
            );
            self.events.publish(GateEvent::SlowExecution {
                tool_name: tool_name.to_string(),
                correlation_id: correlation_id.to_string(),
                duration_ms,
                threshold_ms,
            });
        }

        tracing::debug!(
            tool = %tool_name,
            correlation_id = %correlation_id,
            success = result.is_ok(),
            duration_ms,
            "Tool execution finished"
        );
        self.events.publish(GateEvent::ToolCompleted {
            tool_name: tool_name.to_string(),
            correlation_id: correlation_id.to_string(),
            success: result.is_ok(),
            duration_ms,
        });

        (result, duration_ms)
    }

    /// Cancel running handlers, deny everything still awaiting approval and
    /// write out unsaved policy changes.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.permissions.shutdown();
        if let Some(policy) = &self.policy {
            if let Err(e) = policy.flush_now() {
                tracing::error!("Failed to save permission policy on shutdown: {e}");
            }
        }
    }
}

/// Sub-second windows report as 1s rather than 0s.
fn whole_secs_rounded_up(window: Duration) -> u64 {
    window.as_secs() + u64::from(window.subsec_nanos() > 0)
}
