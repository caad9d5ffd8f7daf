// saw-engine/src/engine.rs
// ============================================================================
// Module: SAW Engine
// Description: Graph walker that orchestrates policy checks, tool calls,
//              and approval gates for a single run.
// Purpose: Own the state machine: running -> {running, completed, denied,
//          error}.
// Dependencies: saw-core, saw-policy, saw-registry
// ============================================================================

//! ## Overview
//! `Engine<L, R, Rec>` is generic over the storage traits it needs
//! (`Ledger`, `RunStore`, `LlmInvocationRecorder`), mirroring a control
//! plane parameterized over its collaborators rather than hand-rolling
//! dependency injection. The policy decider and tool registry are passed by
//! reference into [`Engine::run`] rather than held as type parameters, since
//! a single engine instance commonly serves many distinct SAW specs with the
//! same storage backend but different policy/tool configurations.

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use saw_core::Decision;
use saw_core::NodeId;
use saw_core::NodeType;
use saw_core::RunContext;
use saw_core::RunStatus;
use saw_core::RunSummary;
use saw_core::SawNode;
use saw_core::SawSpec;
use saw_core::canonical::to_canonical_string;
use saw_core::hashing::sha256_hex;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::LedgerEntryDraft;
use saw_core::interfaces::LlmInvocationDraft;
use saw_core::interfaces::LlmInvocationRecorder;
use saw_core::interfaces::RunRecord;
use saw_core::interfaces::RunStore;
use saw_core::time::now_iso;
use saw_policy::PolicyDecider;
use saw_registry::ToolRegistry;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::resolver::DefaultInputResolver;
use crate::resolver::InputResolver;

/// Errors that terminate a run before it reaches a summary at all (graph
/// construction, or a fatal storage fault). Denials and tool failures are
/// not represented here — they are reflected in the returned
/// [`RunSummary`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The graph did not have exactly one `start` node.
    #[error("expected exactly 1 start node, found {0}")]
    StartNodeCount(usize),
    /// A node had more than one outgoing edge; branching graphs are not
    /// supported in this version.
    #[error("node '{0}' has >1 outgoing edge: branching graphs are not supported")]
    UnsupportedBranching(String),
    /// A node's `type` was not one of the four known variants.
    #[error("unknown node type at node '{0}'")]
    UnknownNodeType(String),
    /// The ledger rejected a write.
    #[error("ledger error: {0}")]
    Ledger(#[from] saw_core::interfaces::LedgerError),
    /// The run store rejected a write or read.
    #[error("run store error: {0}")]
    RunStore(#[from] saw_core::interfaces::RunStoreError),
    /// The LLM invocation recorder rejected a write.
    #[error("llm invocation recorder error: {0}")]
    LlmRecorder(#[from] saw_core::interfaces::LlmRecorderError),
    /// The policy decider itself failed (not a deny — an actual fault).
    #[error("policy decider error: {0}")]
    Policy(#[from] saw_policy::PolicyError),
    /// The tool registry faulted on an invocation that passed its
    /// `contains` pre-check (should not happen in practice).
    #[error("tool registry error: {0}")]
    Registry(#[from] saw_registry::RegistryError),
    /// The run exceeded its caller-supplied wall-clock deadline.
    #[error("wave timeout after {0:?}")]
    Timeout(Duration),
}

struct Graph {
    nodes: BTreeMap<NodeId, SawNode>,
    adjacency: BTreeMap<NodeId, NodeId>,
    start: NodeId,
}

fn build_graph(spec: &SawSpec) -> Result<Graph, EngineError> {
    let nodes: BTreeMap<NodeId, SawNode> = spec.graph.nodes.iter().map(|n| (n.id.clone(), n.clone())).collect();

    let mut adjacency = BTreeMap::new();
    for edge in &spec.graph.edges {
        if adjacency.contains_key(&edge.from) {
            return Err(EngineError::UnsupportedBranching(edge.from.as_str().to_string()));
        }
        adjacency.insert(edge.from.clone(), edge.to.clone());
    }

    let starts: Vec<&NodeId> = nodes.iter().filter(|(_, n)| n.node_type == NodeType::Start).map(|(id, _)| id).collect();
    if starts.len() != 1 {
        return Err(EngineError::StartNodeCount(starts.len()));
    }
    #[allow(clippy::indexing_slicing, reason = "length checked to be exactly 1 above")]
    let start = starts[0].clone();

    Ok(Graph { nodes, adjacency, start })
}

/// Orchestrates a single run of a [`SawSpec`] against injected storage
/// collaborators.
pub struct Engine<'a, L, S, R> {
    ledger: &'a L,
    run_store: &'a S,
    llm_recorder: &'a R,
}

impl<'a, L, S, R> Engine<'a, L, S, R>
where
    L: Ledger,
    S: RunStore,
    R: LlmInvocationRecorder,
{
    /// Builds an engine over the given storage collaborators.
    #[must_use]
    pub fn new(ledger: &'a L, run_store: &'a S, llm_recorder: &'a R) -> Self {
        Self { ledger, run_store, llm_recorder }
    }

    /// Walks `spec`'s graph to completion, denial, or error.
    ///
    /// Uses [`DefaultInputResolver`] and the given `policy`/`registry`. Pass
    /// `deadline` to enforce a wall-clock cap; `None` preserves the
    /// uncapped core contract.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the graph is malformed or a storage
    /// collaborator faults. Policy denials and tool failures are not
    /// errors: they are reflected in the returned summary's
    /// [`RunStatus::Denied`].
    pub fn run(&self, spec: &SawSpec, mut ctx: RunContext, policy: &dyn PolicyDecider, registry: &ToolRegistry, deadline: Option<Duration>) -> Result<RunSummary, EngineError> {
        self.run_with_resolver(spec, &mut ctx, policy, registry, &DefaultInputResolver, deadline)
    }

    /// Same as [`Engine::run`] but with a caller-supplied input resolver.
    ///
    /// # Errors
    ///
    /// See [`Engine::run`].
    pub fn run_with_resolver(&self, spec: &SawSpec, ctx: &mut RunContext, policy: &dyn PolicyDecider, registry: &ToolRegistry, resolver: &dyn InputResolver, deadline: Option<Duration>) -> Result<RunSummary, EngineError> {
        let graph = build_graph(spec)?;
        let started_at_instant = Instant::now();

        let policy_snapshot = to_canonical_string(&spec.policy_bundle).map_err(|err| EngineError::Ledger(saw_core::interfaces::LedgerError::Canonicalization(err.to_string())))?;
        let policy_hash = sha256_hex(policy_snapshot.as_bytes());

        self.run_store.upsert_start(&RunRecord {
            run_id: ctx.run_id.clone(),
            saw_id: spec.saw_id.as_str().to_string(),
            started_at: ctx.started_at.clone(),
            status: RunStatus::Running.as_str().to_string(),
            policy_hash,
            policy_version: spec.policy_bundle.policy_id.as_str().to_string(),
            policy_snapshot,
        })?;

        let mut summary = RunSummary::running(ctx.run_id.clone(), spec.saw_id.clone());
        let mut current_id = graph.start.clone();
        let mut last_tool_data: Option<Value> = None;

        loop {
            if let Some(limit) = deadline {
                if started_at_instant.elapsed() > limit {
                    summary.status = RunStatus::Error;
                    summary.denial_reason = Some(format!("wave timeout after {limit:?}"));
                    self.append_terminal(spec, ctx, &current_id, "wave timeout")?;
                    self.run_store.update_status(&ctx.run_id, summary.status.as_str())?;
                    return Err(EngineError::Timeout(limit));
                }
            }

            let node = graph.nodes.get(&current_id).ok_or_else(|| EngineError::UnknownNodeType(current_id.as_str().to_string()))?.clone();

            match node.node_type {
                NodeType::Start => {
                    self.ledger.append(LedgerEntryDraft {
                        run_id: ctx.run_id.clone(),
                        saw_id: spec.saw_id.as_str().to_string(),
                        node_id: current_id.as_str().to_string(),
                        tool_name: String::new(),
                        decision: Some(Decision::Allow),
                        latency_ms: 0.0,
                        error: None,
                    })?;
                }
                NodeType::End => {
                    self.ledger.append(LedgerEntryDraft {
                        run_id: ctx.run_id.clone(),
                        saw_id: spec.saw_id.as_str().to_string(),
                        node_id: current_id.as_str().to_string(),
                        tool_name: String::new(),
                        decision: Some(Decision::Allow),
                        latency_ms: 0.0,
                        error: None,
                    })?;
                    summary.status = RunStatus::Completed;
                    if let Some(data) = last_tool_data {
                        summary.final_outputs = data;
                    }
                    info!(run_id = %ctx.run_id, "run completed");
                    break;
                }
                NodeType::ApprovalGate => {
                    let approved = ctx.approval_granted();
                    let wait_ms = ctx.approval_wait_ms();
                    summary.human_wait_time_ms += wait_ms;

                    let error = if approved { None } else { Some("Approval not provided".to_string()) };
                    self.ledger.append(LedgerEntryDraft {
                        run_id: ctx.run_id.clone(),
                        saw_id: spec.saw_id.as_str().to_string(),
                        node_id: current_id.as_str().to_string(),
                        tool_name: String::new(),
                        decision: Some(if approved { Decision::Allow } else { Decision::Deny }),
                        latency_ms: wait_ms,
                        error: error.clone(),
                    })?;

                    if !approved {
                        summary.status = RunStatus::Denied;
                        summary.denial_reason = error;
                        warn!(run_id = %ctx.run_id, node_id = %current_id, "approval gate denied");
                        break;
                    }
                }
                NodeType::ToolCall => {
                    let inputs = resolver.resolve(current_id.as_str(), &node, ctx);
                    ctx.state.insert(format!("_inputs_{current_id}"), inputs.clone());

                    if !saw_policy::is_infra_tool(&node.tool) {
                        let decision = policy.decide(&node.tool, &inputs, ctx, node.write_action, &spec.policy_bundle)?;
                        if decision.decision == Decision::Deny {
                            let error_msg = format!("Policy denied: {}", decision.reasons.join("; "));
                            self.ledger.append(LedgerEntryDraft {
                                run_id: ctx.run_id.clone(),
                                saw_id: spec.saw_id.as_str().to_string(),
                                node_id: current_id.as_str().to_string(),
                                tool_name: node.tool.clone(),
                                decision: Some(Decision::Deny),
                                latency_ms: 0.0,
                                error: Some(error_msg.clone()),
                            })?;
                            summary.node_results.insert(current_id.as_str().to_string(), Value::String(error_msg.clone()));
                            summary.status = RunStatus::Denied;
                            summary.denial_reason = Some(error_msg);
                            warn!(run_id = %ctx.run_id, node_id = %current_id, tool = %node.tool, "policy denied tool call");
                            break;
                        }
                    }

                    if !registry.contains(&node.tool) {
                        let error_msg = format!("Tool '{}' not found", node.tool);
                        self.ledger.append(LedgerEntryDraft {
                            run_id: ctx.run_id.clone(),
                            saw_id: spec.saw_id.as_str().to_string(),
                            node_id: current_id.as_str().to_string(),
                            tool_name: node.tool.clone(),
                            decision: Some(Decision::Deny),
                            latency_ms: 0.0,
                            error: Some(error_msg.clone()),
                        })?;
                        summary.node_results.insert(current_id.as_str().to_string(), Value::String(error_msg.clone()));
                        summary.status = RunStatus::Denied;
                        summary.denial_reason = Some(error_msg);
                        break;
                    }

                    let t0 = Instant::now();
                    let result = registry.invoke(&node.tool, &inputs, ctx)?;
                    #[allow(clippy::cast_precision_loss, reason = "sub-millisecond precision loss is immaterial to audit timing")]
                    let latency_ms = (t0.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

                    self.ledger.append(LedgerEntryDraft {
                        run_id: ctx.run_id.clone(),
                        saw_id: spec.saw_id.as_str().to_string(),
                        node_id: current_id.as_str().to_string(),
                        tool_name: node.tool.clone(),
                        decision: Some(Decision::Allow),
                        latency_ms,
                        error: result.error.clone(),
                    })?;

                    if let Some(tool) = registry.get(&node.tool) {
                        if tool.is_non_deterministic() && result.success {
                            self.llm_recorder.record(LlmInvocationDraft {
                                run_id: ctx.run_id.clone(),
                                node_id: current_id.as_str().to_string(),
                                invoked_at: now_iso(),
                                provider: result.data.get("provider").and_then(Value::as_str).map(str::to_string),
                                model_name: result.data.get("model_name").and_then(Value::as_str).map(str::to_string),
                                model_version: result.data.get("model_version").and_then(Value::as_str).map(str::to_string),
                                temperature: result.data.get("temperature").and_then(Value::as_f64),
                                max_tokens: result.data.get("max_tokens").and_then(Value::as_i64),
                                raw_tool_input: inputs.clone(),
                                sanitized_prompt_input: result.data.get("sanitized_prompt_input").cloned().unwrap_or(Value::Null),
                                llm_output_text: result.data.get("llm_output_text").and_then(Value::as_str).unwrap_or("").to_string(),
                            })?;
                        }
                    }

                    summary.node_results.insert(current_id.as_str().to_string(), if result.success { result.data.clone() } else { Value::String(result.error.clone().unwrap_or_default()) });

                    if !result.success {
                        summary.status = RunStatus::Denied;
                        summary.denial_reason = result.error.clone();
                        break;
                    }

                    ctx.state.insert(current_id.as_str().to_string(), result.data.clone());
                    last_tool_data = Some(result.data);
                    summary.system_time_ms += latency_ms;
                }
            }

            match graph.adjacency.get(&current_id) {
                Some(next) => current_id = next.clone(),
                None => {
                    summary.status = RunStatus::Error;
                    summary.denial_reason = Some(format!("No outgoing edge from node '{current_id}'"));
                    break;
                }
            }
        }

        summary.system_time_ms = round2(summary.system_time_ms);
        summary.human_wait_time_ms = round2(summary.human_wait_time_ms);
        summary.total_time_ms = round2(summary.system_time_ms + summary.human_wait_time_ms);

        self.run_store.update_status(&ctx.run_id, summary.status.as_str())?;
        if let Some(approved_by) = ctx.state.get("_approved_by").and_then(Value::as_str) {
            self.run_store.update_approval(
                &ctx.run_id,
                Some(approved_by),
                ctx.state.get("_approved_at").and_then(Value::as_str),
                ctx.state.get("_approval_note").and_then(Value::as_str),
            )?;
        }

        Ok(summary)
    }

    fn append_terminal(&self, spec: &SawSpec, ctx: &RunContext, node_id: &NodeId, error: &str) -> Result<(), EngineError> {
        self.ledger.append(LedgerEntryDraft {
            run_id: ctx.run_id.clone(),
            saw_id: spec.saw_id.as_str().to_string(),
            node_id: node_id.as_str().to_string(),
            tool_name: String::new(),
            decision: Some(Decision::Deny),
            latency_ms: 0.0,
            error: Some(error.to_string()),
        })?;
        Ok(())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
