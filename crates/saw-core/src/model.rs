// saw-core/src/model.rs
// ============================================================================
// Module: SAW Data Model
// Description: Specification, run context, and audit-record types shared by
//              every SAW crate.
// Purpose: Define the entities in the data model without committing to any
//          storage or transport representation.
// Dependencies: serde, serde_json
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::NodeId;
use crate::identifiers::PolicyId;
use crate::identifiers::RunId;
use crate::identifiers::SawId;

// ============================================================================
// SECTION: SAW specification
// ============================================================================

/// Node kind inside a SAW graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// The single entry point of the graph.
    Start,
    /// The single exit point of the graph.
    End,
    /// A node that invokes a registered tool.
    ToolCall,
    /// A node that requires an externally supplied approval signal.
    ApprovalGate,
}

/// One node in a SAW graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SawNode {
    /// Node identifier, unique within the graph.
    pub id: NodeId,
    /// Node kind.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Tool name invoked by this node. Empty for non-`tool_call` nodes.
    #[serde(default)]
    pub tool: String,
    /// Informational sensitivity classification for this node's tool (e.g.
    /// `"low"`, `"medium"`, `"high"`). Not read by the policy engine or
    /// engine directly; it documents the blast radius a tool implementation
    /// claims for itself and is surfaced to operators reviewing a spec.
    #[serde(default)]
    pub sensitivity: String,
    /// Whether this node's tool performs a write (subject to write
    /// restrictions in the policy bundle).
    #[serde(default)]
    pub write_action: bool,
}

/// A directed edge from one node to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SawEdge {
    /// Source node id.
    pub from: NodeId,
    /// Destination node id.
    pub to: NodeId,
}

/// The graph portion of a SAW specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SawGraph {
    /// All nodes in the graph.
    pub nodes: Vec<SawNode>,
    /// All edges in the graph.
    pub edges: Vec<SawEdge>,
}

/// Egress capability gates evaluated by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressPolicy {
    /// Whether `tool_external_http` is permitted.
    #[serde(default)]
    pub allow_external_http: bool,
    /// Domains permitted for external HTTP egress, when enabled.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Whether `tool_email_send` is permitted.
    #[serde(default)]
    pub allow_email_send: bool,
    /// Whether `tool_slack_dm` is permitted.
    #[serde(default)]
    pub allow_slack_dm: bool,
}

/// Write restriction entry for a single write-capable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRestriction {
    /// Opaque target identifiers this tool may write to.
    #[serde(default)]
    pub allowed_template_ids: Vec<String>,
    /// Whether this tool may create a new target rather than writing to an
    /// existing one.
    #[serde(default)]
    pub allow_create_new_decks: bool,
}

/// Tool allow/deny lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLists {
    /// Tools explicitly permitted under this policy.
    pub allowlist: BTreeSet<String>,
    /// Tools explicitly forbidden under this policy, checked before the
    /// allowlist.
    pub denylist: BTreeSet<String>,
}

/// Policy bundle embedded in a SAW specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBundle {
    /// Policy identifier, used in deny reasons and the run's policy snapshot.
    pub policy_id: PolicyId,
    /// Informational sensitivity classification.
    pub sensitivity_level: String,
    /// Allow/deny lists for tool names.
    pub tools: ToolLists,
    /// Egress capability gates.
    pub egress: EgressPolicy,
    /// Per-tool write restrictions, keyed by tool name.
    #[serde(default)]
    pub write_restrictions: BTreeMap<String, WriteRestriction>,
}

/// A complete SAW specification: graph plus policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SawSpec {
    /// Identifier of this workflow definition.
    pub saw_id: SawId,
    /// The execution graph.
    pub graph: SawGraph,
    /// The policy bundle governing tool calls in this run.
    pub policy_bundle: PolicyBundle,
}

// ============================================================================
// SECTION: Run context
// ============================================================================

/// Mutable, per-run accumulator threaded through every node execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Run identifier.
    pub run_id: RunId,
    /// SAW identifier this run executes.
    pub saw_id: SawId,
    /// Policy identifier this run was opened under.
    pub policy_id: PolicyId,
    /// RFC 3339 timestamp the run started at.
    pub started_at: String,
    /// Human operator attribution.
    pub operator: String,
    /// Human approver attribution.
    pub approver: String,
    /// Node output accumulator, plus reserved `_`-prefixed control keys
    /// (`_approval_granted`, `_approval_wait_ms`, `_inputs_<node_id>`, ...).
    #[serde(default)]
    pub state: BTreeMap<String, Value>,
}

impl RunContext {
    /// Creates a new run context with an empty state accumulator.
    #[must_use]
    pub fn new(
        run_id: RunId,
        saw_id: SawId,
        policy_id: PolicyId,
        started_at: impl Into<String>,
        operator: impl Into<String>,
        approver: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            saw_id,
            policy_id,
            started_at: started_at.into(),
            operator: operator.into(),
            approver: approver.into(),
            state: BTreeMap::new(),
        }
    }

    /// Returns the value a prior node stored under `node_id`, if any.
    #[must_use]
    pub fn node_output(&self, node_id: &str) -> Option<&Value> {
        self.state.get(node_id)
    }

    /// Returns whether `_approval_granted` is set to the boolean `true`.
    ///
    /// Any other representation (missing key, string `"true"`, `1`) is
    /// treated as not granted; approval is an explicit boolean signal only.
    #[must_use]
    pub fn approval_granted(&self) -> bool {
        matches!(self.state.get("_approval_granted"), Some(Value::Bool(true)))
    }

    /// Returns the observed approval wait time in milliseconds, defaulting
    /// to `0.0` when unset.
    #[must_use]
    pub fn approval_wait_ms(&self) -> f64 {
        self.state
            .get("_approval_wait_ms")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

// ============================================================================
// SECTION: Tool contract
// ============================================================================

/// Standard return envelope from every tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that produced this result.
    pub tool_name: String,
    /// Whether the tool invocation succeeded.
    pub success: bool,
    /// Structured output payload. Empty object on failure.
    #[serde(default)]
    pub data: Value,
    /// Error message when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Builds a successful result.
    #[must_use]
    pub fn ok(tool_name: impl Into<String>, data: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data,
            error: None,
        }
    }

    /// Builds a failed result.
    #[must_use]
    pub fn fail(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Additional metadata attached to results from non-deterministic
/// (LLM-backed) tools, recorded by the LLM invocation recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmInvocationMeta {
    /// Upstream provider name (e.g. `"anthropic"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Model version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Sampling temperature used for this invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Max tokens requested for this invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// The raw tool input handed to the model.
    pub raw_tool_input: Value,
    /// The sanitized (secrets/PII stripped) prompt input.
    pub sanitized_prompt_input: Value,
    /// The raw text the model returned.
    pub llm_output_text: String,
}

// ============================================================================
// SECTION: Policy decision
// ============================================================================

/// Allow/deny outcome, used both standalone and embedded in a `Decision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The call is permitted.
    Allow,
    /// The call is forbidden.
    Deny,
}

impl Decision {
    /// Returns the lowercase wire representation (`"allow"` / `"deny"`),
    /// matching the ledger's `decision` column values.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

/// Result of a policy evaluation for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The allow/deny outcome.
    pub decision: Decision,
    /// Name of the tool the decision was evaluated for.
    pub tool_name: String,
    /// Ordered reasons supporting the decision. `["all_checks_passed"]` on
    /// allow; one or more human-readable reasons on deny.
    pub reasons: Vec<String>,
}

// ============================================================================
// SECTION: Run summary
// ============================================================================

/// Terminal or in-flight status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is still walking the graph.
    Running,
    /// The run reached its end node.
    Completed,
    /// A policy or approval deny, or tool failure, halted the run.
    Denied,
    /// A structural or storage fault halted the run.
    Error,
}

impl RunStatus {
    /// Returns the lowercase wire representation, matching the `runs.status`
    /// column values.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Denied => "denied",
            RunStatus::Error => "error",
        }
    }
}

/// Final output of a SAW engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,
    /// SAW identifier.
    pub saw_id: SawId,
    /// Terminal status.
    pub status: RunStatus,
    /// Sum of `latency_ms` over non-approval ledger entries.
    #[serde(default)]
    pub system_time_ms: f64,
    /// Sum of `latency_ms` over approval-gate ledger entries.
    #[serde(default)]
    pub human_wait_time_ms: f64,
    /// `system_time_ms + human_wait_time_ms`.
    #[serde(default)]
    pub total_time_ms: f64,
    /// Per-node result snapshot: the tool's `data` on success, or its error
    /// string on failure.
    #[serde(default)]
    pub node_results: BTreeMap<String, Value>,
    /// The last successful tool node's `data`, surfaced at the `end` node.
    #[serde(default)]
    pub final_outputs: Value,
    /// Reason the run was denied or errored, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
}

impl RunSummary {
    /// Starts a new in-flight summary for `run_id`/`saw_id`.
    #[must_use]
    pub fn running(run_id: RunId, saw_id: SawId) -> Self {
        Self {
            run_id,
            saw_id,
            status: RunStatus::Running,
            system_time_ms: 0.0,
            human_wait_time_ms: 0.0,
            total_time_ms: 0.0,
            node_results: BTreeMap::new(),
            final_outputs: Value::Null,
            denial_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Decision;
    use super::RunStatus;
    use super::ToolResult;
    use serde_json::json;

    #[test]
    fn decision_wire_strings_match_ledger_column_values() {
        assert_eq!(Decision::Allow.as_str(), "allow");
        assert_eq!(Decision::Deny.as_str(), "deny");
    }

    #[test]
    fn run_status_wire_strings_match_runs_column_values() {
        assert_eq!(RunStatus::Running.as_str(), "running");
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(RunStatus::Denied.as_str(), "denied");
        assert_eq!(RunStatus::Error.as_str(), "error");
    }

    #[test]
    fn tool_result_fail_carries_null_data() {
        let result = ToolResult::fail("tool_x", "boom");
        assert!(!result.success);
        assert_eq!(result.data, json!(null));
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
