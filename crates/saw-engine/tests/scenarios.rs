// crates/saw-engine/tests/scenarios.rs
// ============================================================================
// Module: SAW Engine Worked Scenarios
// Description: End-to-end runs of the engine against the two bundled demo
//              workflows, covering the golden path, approval denial, policy
//              denial on a write, unsupported graph topology, tamper
//              detection, and policy fingerprint stability.
// Purpose: Exercise the full stack (engine, policy, registry, resolver,
//          `SQLite`-backed storage) the way a single run is actually driven,
//          rather than unit-testing each layer in isolation.
// Dependencies: saw-engine, saw-core, saw-policy, saw-registry,
//               saw-store-sqlite, board-metrics-tools, rusqlite, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use saw_core::EgressPolicy;
use saw_core::NodeType;
use saw_core::PolicyBundle;
use saw_core::RunContext;
use saw_core::RunStatus;
use saw_core::SawEdge;
use saw_core::SawGraph;
use saw_core::SawNode;
use saw_core::SawSpec;
use saw_core::ToolLists;
use saw_core::WriteRestriction;
use saw_core::canonical::to_canonical_string;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::RunStore;
use saw_engine::DefaultInputResolver;
use saw_engine::Engine;
use saw_engine::EngineError;
use saw_engine::InputResolver;
use saw_policy::DefaultPolicyEngine;
use saw_registry::ToolRegistry;
use serde_json::Value;
use serde_json::json;

fn node(id: &str, node_type: NodeType, tool: &str, write_action: bool) -> SawNode {
    SawNode { id: id.into(), node_type, tool: tool.to_string(), sensitivity: String::new(), write_action }
}

fn chain(ids: &[&str]) -> Vec<SawEdge> {
    ids.windows(2).map(|pair| SawEdge { from: pair[0].into(), to: pair[1].into() }).collect()
}

fn board_metrics_spec() -> SawSpec {
    let ids = ["n_start", "n_salesforce_pull", "n_stripe_pull", "n_reconcile", "n_generate_summary", "n_approval", "n_update_slides", "n_end"];
    let nodes = vec![
        node("n_start", NodeType::Start, "", false),
        node("n_salesforce_pull", NodeType::ToolCall, "tool_salesforce_read_pipeline", false),
        node("n_stripe_pull", NodeType::ToolCall, "tool_stripe_read_revenue", false),
        node("n_reconcile", NodeType::ToolCall, "tool_reconcile_metrics", false),
        node("n_generate_summary", NodeType::ToolCall, "tool_generate_board_summary", false),
        node("n_approval", NodeType::ApprovalGate, "", false),
        node("n_update_slides", NodeType::ToolCall, "tool_slides_update_template", true),
        node("n_end", NodeType::End, "", false),
    ];

    let mut write_restrictions = BTreeMap::new();
    write_restrictions.insert(
        "tool_slides_update_template".to_string(),
        WriteRestriction { allowed_template_ids: vec!["TEMPLATE_DECK_V1".to_string()], allow_create_new_decks: false },
    );

    let policy_bundle = PolicyBundle {
        policy_id: "policy_board_metrics_v1".into(),
        sensitivity_level: "medium".to_string(),
        tools: ToolLists {
            allowlist: BTreeSet::from([
                "tool_salesforce_read_pipeline".to_string(),
                "tool_stripe_read_revenue".to_string(),
                "tool_reconcile_metrics".to_string(),
                "tool_generate_board_summary".to_string(),
                "tool_slides_update_template".to_string(),
            ]),
            denylist: BTreeSet::from(["tool_browser".to_string(), "tool_shell_exec".to_string()]),
        },
        egress: EgressPolicy { allow_external_http: false, allowed_domains: Vec::new(), allow_email_send: false, allow_slack_dm: false },
        write_restrictions,
    };

    SawSpec { saw_id: "saw_board_metrics_v1".into(), graph: SawGraph { nodes, edges: chain(&ids) }, policy_bundle }
}

fn ctx(run_id: &str) -> RunContext {
    RunContext::new(run_id.into(), "saw_board_metrics_v1".into(), "policy_board_metrics_v1".into(), "2025-01-01T00:00:00Z", "op", "ap")
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    board_metrics_tools::register_all(&mut registry).expect("register demo tools");
    registry
}

/// Overrides `n_update_slides`'s `template_id`, reproducing worked Scenario C
/// without hand-wiring scenario logic into the engine itself.
struct RogueTemplateResolver;

impl InputResolver for RogueTemplateResolver {
    fn resolve(&self, node_id: &str, node: &SawNode, run_ctx: &RunContext) -> Value {
        let mut resolved = DefaultInputResolver.resolve(node_id, node, run_ctx);
        if node_id == "n_update_slides" {
            if let Value::Object(map) = &mut resolved {
                map.insert("template_id".to_string(), Value::String("ROGUE_TEMPLATE".to_string()));
            }
        }
        resolved
    }
}

#[test]
fn scenario_a_golden_path_completes_with_the_expected_reconciliation_delta() {
    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(":memory:").expect("open store");
    let spec = board_metrics_spec();
    let mut run_ctx = ctx("run_scenario_a");
    run_ctx.state.insert("_approval_granted".to_string(), Value::Bool(true));
    run_ctx.state.insert("_approval_wait_ms".to_string(), json!(950.0));

    let policy = DefaultPolicyEngine;
    let reg = registry();
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);
    let run_id = run_ctx.run_id.clone();

    let summary = engine.run(&spec, run_ctx, &policy, &reg, None).expect("run");

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.human_wait_time_ms, 950.0);
    assert_eq!(summary.final_outputs["status"], json!("updated"));
    assert_eq!(summary.node_results["n_reconcile"]["reconciled_metrics"]["bookings_revenue_delta_usd"], json!(-180_000.0));

    let entries = ledger.entries(&run_id).expect("entries");
    let expected_node_order = ["n_start", "n_salesforce_pull", "n_stripe_pull", "n_reconcile", "n_generate_summary", "n_approval", "n_update_slides", "n_end"];
    assert_eq!(entries.len(), expected_node_order.len());
    for (entry, expected_id) in entries.iter().zip(expected_node_order.iter()) {
        assert_eq!(entry.node_id, *expected_id);
        assert_ne!(entry.decision, "deny");
    }
}

#[test]
fn scenario_b_missing_approval_denies_before_the_write_node() {
    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(":memory:").expect("open store");
    let spec = board_metrics_spec();
    let run_ctx = ctx("run_scenario_b");

    let policy = DefaultPolicyEngine;
    let reg = registry();
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);

    let summary = engine.run(&spec, run_ctx, &policy, &reg, None).expect("run");

    assert_eq!(summary.status, RunStatus::Denied);
    assert!(summary.denial_reason.expect("denial reason").contains("not provided"));

    let entries = ledger.entries(&"run_scenario_b".into()).expect("entries");
    assert_eq!(entries.last().expect("at least one entry").node_id, "n_approval");
    assert!(entries.iter().all(|e| e.node_id != "n_update_slides" && e.node_id != "n_end"));
}

#[test]
fn scenario_c_policy_denies_a_write_to_an_unlisted_template() {
    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(":memory:").expect("open store");
    let spec = board_metrics_spec();
    let mut run_ctx = ctx("run_scenario_c");
    run_ctx.state.insert("_approval_granted".to_string(), Value::Bool(true));

    let policy = DefaultPolicyEngine;
    let reg = registry();
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);

    let summary = engine.run_with_resolver(&spec, &mut run_ctx, &policy, &reg, &RogueTemplateResolver, None).expect("run");

    assert_eq!(summary.status, RunStatus::Denied);
    assert!(summary.denial_reason.expect("denial reason").contains("ROGUE_TEMPLATE"));

    let entries = ledger.entries(&"run_scenario_c".into()).expect("entries");
    let write_row = entries.iter().find(|e| e.node_id == "n_update_slides").expect("write row present");
    assert_eq!(write_row.decision, "deny");
    assert!(write_row.error.as_deref().unwrap_or_default().contains("ROGUE_TEMPLATE"));
    assert!(entries.iter().all(|e| e.node_id != "n_end"));
}

#[test]
fn scenario_d_a_second_outgoing_edge_is_rejected_as_unsupported_branching() {
    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(":memory:").expect("open store");
    let mut spec = board_metrics_spec();
    spec.graph.edges.push(SawEdge { from: "n_reconcile".into(), to: "n_end".into() });
    let run_ctx = ctx("run_scenario_d");

    let policy = DefaultPolicyEngine;
    let reg = registry();
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);

    let outcome = engine.run(&spec, run_ctx, &policy, &reg, None);
    assert!(matches!(outcome, Err(EngineError::UnsupportedBranching(ref id)) if id == "n_reconcile"));

    let loaded = run_store.load(&"run_scenario_d".into());
    assert!(loaded.is_err(), "no run record should advance past construction when the graph is rejected");
}

#[test]
fn scenario_e_tampering_a_row_after_the_fact_is_caught_at_the_first_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scenario_e.db");
    let path_str = path.to_str().expect("utf8 path").to_string();

    {
        let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(&path_str).expect("open store");
        let spec = board_metrics_spec();
        let mut run_ctx = ctx("run_scenario_e");
        run_ctx.state.insert("_approval_granted".to_string(), Value::Bool(true));
        run_ctx.state.insert("_approval_wait_ms".to_string(), json!(950.0));

        let policy = DefaultPolicyEngine;
        let reg = registry();
        let engine = Engine::new(&ledger, &run_store, &llm_recorder);
        let summary = engine.run(&spec, run_ctx, &policy, &reg, None).expect("run");
        assert_eq!(summary.status, RunStatus::Completed);
    }

    {
        let tamper_connection = rusqlite::Connection::open(&path_str).expect("reopen for tamper");
        tamper_connection
            .execute(
                "UPDATE execution_log SET latency_ms = latency_ms + 1.0 WHERE run_id = 'run_scenario_e' AND node_id = 'n_reconcile'",
                [],
            )
            .expect("tamper row");
    }

    let (ledger, _run_store, _llm_recorder) = saw_store_sqlite::open(&path_str).expect("reopen store");
    let report = ledger.verify(&"run_scenario_e".into()).expect("verify");
    assert!(!report.valid);
    assert_eq!(report.first_mismatch_index, Some(3));
    assert_ne!(report.expected_hash, report.found_hash);
}

#[test]
fn scenario_f_structurally_identical_policy_bundles_hash_identically() {
    let spec_one = board_metrics_spec();
    let spec_two = board_metrics_spec();

    let hash_one = to_canonical_string(&spec_one.policy_bundle).expect("canonicalize");
    let hash_two = to_canonical_string(&spec_two.policy_bundle).expect("canonicalize");
    assert_eq!(hash_one, hash_two);

    let mut spec_three = board_metrics_spec();
    spec_three.policy_bundle.egress.allow_external_http = true;
    let hash_three = to_canonical_string(&spec_three.policy_bundle).expect("canonicalize");
    assert_ne!(hash_one, hash_three);
}

#[test]
fn scenario_g_revenue_reconciliation_completes_with_no_approval_gate() {
    let ids = ["n_start", "n_qb_pull", "n_stripe_pull", "n_reconcile", "n_gen_report", "n_write_report", "n_end"];
    let nodes = vec![
        node("n_start", NodeType::Start, "", false),
        node("n_qb_pull", NodeType::ToolCall, "tool_quickbooks_read_expenses", false),
        node("n_stripe_pull", NodeType::ToolCall, "tool_stripe_read_payouts", false),
        node("n_reconcile", NodeType::ToolCall, "tool_reconcile_revenue", false),
        node("n_gen_report", NodeType::ToolCall, "tool_generate_revenue_report", false),
        node("n_write_report", NodeType::ToolCall, "tool_write_revenue_report", true),
        node("n_end", NodeType::End, "", false),
    ];

    let policy_bundle = PolicyBundle {
        policy_id: "policy_revenue_reconciliation_v1".into(),
        sensitivity_level: "high".to_string(),
        tools: ToolLists {
            allowlist: BTreeSet::from([
                "tool_quickbooks_read_expenses".to_string(),
                "tool_stripe_read_payouts".to_string(),
                "tool_reconcile_revenue".to_string(),
                "tool_generate_revenue_report".to_string(),
                "tool_write_revenue_report".to_string(),
            ]),
            denylist: BTreeSet::new(),
        },
        egress: EgressPolicy { allow_external_http: false, allowed_domains: Vec::new(), allow_email_send: false, allow_slack_dm: false },
        write_restrictions: BTreeMap::new(),
    };
    let spec = SawSpec { saw_id: "saw_revenue_reconciliation_v1".into(), graph: SawGraph { nodes, edges: chain(&ids) }, policy_bundle };

    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(":memory:").expect("open store");
    let run_ctx = RunContext::new("run_scenario_g".into(), "saw_revenue_reconciliation_v1".into(), "policy_revenue_reconciliation_v1".into(), "2025-01-01T00:00:00Z", "op", "ap");

    let policy = DefaultPolicyEngine;
    let reg = registry();
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);
    let summary = engine.run(&spec, run_ctx, &policy, &reg, None).expect("run");

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.human_wait_time_ms, 0.0);
    assert_eq!(summary.final_outputs["status"], json!("written"));
}
