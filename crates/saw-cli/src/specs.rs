// saw-cli/src/specs.rs
// ============================================================================
// Module: Bundled Demo SAW Specifications
// Description: The two worked SAW specs this substrate ships with: Board
//              Metrics Aggregation and Revenue Reconciliation.
// Purpose: Give the `run` subcommand something runnable out of the box,
//          matching the node ids `saw_engine::DefaultInputResolver` already
//          knows how to wire.
// Dependencies: saw-core
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use clap::ValueEnum;
use saw_core::EgressPolicy;
use saw_core::NodeType;
use saw_core::PolicyBundle;
use saw_core::PolicyId;
use saw_core::SawEdge;
use saw_core::SawGraph;
use saw_core::SawId;
use saw_core::SawNode;
use saw_core::SawSpec;
use saw_core::ToolLists;
use saw_core::WriteRestriction;

/// Selects one of the two bundled demo workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoSaw {
    /// Pulls Salesforce pipeline and Stripe revenue, reconciles them, and
    /// drafts a board summary slide update.
    BoardMetrics,
    /// Pulls QuickBooks expenses and Stripe payouts, reconciles them, and
    /// writes a finance report.
    RevenueReconciliation,
}

fn node(id: &str, node_type: NodeType, tool: &str, sensitivity: &str, write_action: bool) -> SawNode {
    SawNode {
        id: id.into(),
        node_type,
        tool: tool.to_string(),
        sensitivity: sensitivity.to_string(),
        write_action,
    }
}

fn edge(from: &str, to: &str) -> SawEdge {
    SawEdge { from: from.into(), to: to.into() }
}

fn chain(ids: &[&str]) -> Vec<SawEdge> {
    ids.windows(2).map(|pair| edge(pair[0], pair[1])).collect()
}

/// Builds the Board Metrics Aggregation SAW spec.
#[must_use]
pub fn board_metrics() -> SawSpec {
    let node_ids = ["n_start", "n_salesforce_pull", "n_stripe_pull", "n_reconcile", "n_generate_summary", "n_approval", "n_update_slides", "n_end"];

    let nodes = vec![
        node("n_start", NodeType::Start, "", "", false),
        node("n_salesforce_pull", NodeType::ToolCall, "tool_salesforce_read_pipeline", "low", false),
        node("n_stripe_pull", NodeType::ToolCall, "tool_stripe_read_revenue", "low", false),
        node("n_reconcile", NodeType::ToolCall, "tool_reconcile_metrics", "low", false),
        node("n_generate_summary", NodeType::ToolCall, "tool_generate_board_summary", "medium", false),
        node("n_approval", NodeType::ApprovalGate, "", "", false),
        node("n_update_slides", NodeType::ToolCall, "tool_slides_update_template", "high", true),
        node("n_end", NodeType::End, "", "", false),
    ];

    let mut write_restrictions = BTreeMap::new();
    write_restrictions.insert(
        "tool_slides_update_template".to_string(),
        WriteRestriction { allowed_template_ids: vec!["TEMPLATE_DECK_V1".to_string()], allow_create_new_decks: false },
    );

    let policy_bundle = PolicyBundle {
        policy_id: PolicyId::new("policy_board_metrics_v1"),
        sensitivity_level: "medium".to_string(),
        tools: ToolLists {
            allowlist: BTreeSet::from([
                "tool_salesforce_read_pipeline".to_string(),
                "tool_stripe_read_revenue".to_string(),
                "tool_reconcile_metrics".to_string(),
                "tool_generate_board_summary".to_string(),
                "tool_slides_update_template".to_string(),
            ]),
            denylist: BTreeSet::from([
                "tool_browser".to_string(),
                "tool_shell_exec".to_string(),
                "tool_external_http".to_string(),
                "tool_email_send".to_string(),
                "tool_slack_dm".to_string(),
            ]),
        },
        egress: EgressPolicy { allow_external_http: false, allowed_domains: Vec::new(), allow_email_send: false, allow_slack_dm: false },
        write_restrictions,
    };

    SawSpec { saw_id: SawId::new("saw_board_metrics_v1"), graph: SawGraph { nodes, edges: chain(&node_ids) }, policy_bundle }
}

/// Builds the Revenue Reconciliation SAW spec. Unlike Board Metrics
/// Aggregation, this workflow carries no approval gate: the write node
/// follows reconciliation and report generation directly.
#[must_use]
pub fn revenue_reconciliation() -> SawSpec {
    let node_ids = ["n_start", "n_qb_pull", "n_stripe_pull", "n_reconcile", "n_gen_report", "n_write_report", "n_end"];

    let nodes = vec![
        node("n_start", NodeType::Start, "", "", false),
        node("n_qb_pull", NodeType::ToolCall, "tool_quickbooks_read_expenses", "low", false),
        node("n_stripe_pull", NodeType::ToolCall, "tool_stripe_read_payouts", "low", false),
        node("n_reconcile", NodeType::ToolCall, "tool_reconcile_revenue", "low", false),
        node("n_gen_report", NodeType::ToolCall, "tool_generate_revenue_report", "medium", false),
        node("n_write_report", NodeType::ToolCall, "tool_write_revenue_report", "high", true),
        node("n_end", NodeType::End, "", "", false),
    ];

    // `tool_write_revenue_report` carries no entry in `write_restrictions`:
    // the resolver never supplies a `template_id` for it, so a restriction
    // keyed on that field would deny every run. Absence of an entry means
    // step 4 of policy evaluation passes unconditionally for this tool.
    let write_restrictions = BTreeMap::new();

    let policy_bundle = PolicyBundle {
        policy_id: PolicyId::new("policy_revenue_reconciliation_v1"),
        sensitivity_level: "high".to_string(),
        tools: ToolLists {
            allowlist: BTreeSet::from([
                "tool_quickbooks_read_expenses".to_string(),
                "tool_stripe_read_payouts".to_string(),
                "tool_reconcile_revenue".to_string(),
                "tool_generate_revenue_report".to_string(),
                "tool_write_revenue_report".to_string(),
            ]),
            denylist: BTreeSet::from([
                "tool_browser".to_string(),
                "tool_shell_exec".to_string(),
                "tool_external_http".to_string(),
                "tool_email_send".to_string(),
                "tool_slack_dm".to_string(),
            ]),
        },
        egress: EgressPolicy { allow_external_http: false, allowed_domains: Vec::new(), allow_email_send: false, allow_slack_dm: false },
        write_restrictions,
    };

    SawSpec { saw_id: SawId::new("saw_revenue_reconciliation_v1"), graph: SawGraph { nodes, edges: chain(&node_ids) }, policy_bundle }
}

impl DemoSaw {
    /// Builds the [`SawSpec`] this variant names.
    #[must_use]
    pub fn build(self) -> SawSpec {
        match self {
            Self::BoardMetrics => board_metrics(),
            Self::RevenueReconciliation => revenue_reconciliation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DemoSaw;

    #[test]
    fn board_metrics_spec_has_eight_nodes_in_a_linear_chain() {
        let spec = DemoSaw::BoardMetrics.build();
        assert_eq!(spec.graph.nodes.len(), 8);
        assert_eq!(spec.graph.edges.len(), 7);
    }

    #[test]
    fn revenue_reconciliation_spec_has_seven_nodes_in_a_linear_chain() {
        let spec = DemoSaw::RevenueReconciliation.build();
        assert_eq!(spec.graph.nodes.len(), 7);
        assert_eq!(spec.graph.edges.len(), 6);
    }
}
