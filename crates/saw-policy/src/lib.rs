// saw-policy/src/lib.rs
// ============================================================================
// Module: SAW Policy Engine
// Description: Pre-invocation authorization decisions for tool calls.
// Purpose: Decide allow/deny for a specific tool call under a specific
//          policy bundle, in the fixed evaluation order the runtime depends
//          on for audit-reason stability.
// Dependencies: saw-core, serde_json
// ============================================================================

//! ## Overview
//! Evaluation order, short-circuiting on the first deny: denylist,
//! allowlist, egress capability gates (reasons accumulate), write
//! restrictions (reasons accumulate). `check` is a pure function of its
//! inputs: identical inputs always produce identical decisions in the same
//! order of reasons.

use std::collections::BTreeSet;

use saw_core::Decision;
use saw_core::PolicyBundle;
use saw_core::PolicyDecision;
use saw_core::RunContext;
use serde_json::Value;
use thiserror::Error;

/// Tools that are infrastructure and exempt from policy evaluation.
///
/// The engine must not call [`check`] for these; otherwise writing an audit
/// entry would itself require authorization, which has no sound answer.
pub fn infra_tools() -> BTreeSet<&'static str> {
    BTreeSet::from(["tool_logger_write"])
}

/// Returns true when `tool_name` is exempt from policy evaluation.
#[must_use]
pub fn is_infra_tool(tool_name: &str) -> bool {
    infra_tools().contains(tool_name)
}

/// Errors raised while evaluating a policy decision.
///
/// The fixed rule sequence in [`check`] never itself fails; this exists so
/// that callers consuming [`PolicyDecider`] trait objects have a uniform
/// error type to propagate for out-of-process implementations.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy decider reported an error.
    #[error("policy evaluation error: {0}")]
    Evaluation(String),
}

/// Evaluates whether a tool call is permitted under `policy`.
///
/// Checks in order:
/// 1. Denylist (explicit block).
/// 2. Allowlist (must be present).
/// 3. Egress rules, if the tool would make an external call.
/// 4. Write restrictions, when `is_write` is set.
///
/// Returns deny on the first failing step, with accumulated reasons for
/// steps 3 and 4.
#[must_use]
pub fn check(tool_name: &str, tool_inputs: &Value, _ctx: &RunContext, is_write: bool, policy: &PolicyBundle) -> PolicyDecision {
    if policy.tools.denylist.contains(tool_name) {
        return deny(tool_name, vec![format!("Tool '{tool_name}' is on the denylist.")]);
    }

    if !policy.tools.allowlist.contains(tool_name) {
        return deny(
            tool_name,
            vec![format!(
                "Tool '{tool_name}' is not on the allowlist for policy '{}'.",
                policy.policy_id
            )],
        );
    }

    let mut reasons = Vec::new();
    if tool_name == "tool_external_http" && !policy.egress.allow_external_http {
        reasons.push("External HTTP egress is disabled by policy.".to_string());
    }
    if tool_name == "tool_email_send" && !policy.egress.allow_email_send {
        reasons.push("Email send is disabled by policy.".to_string());
    }
    if tool_name == "tool_slack_dm" && !policy.egress.allow_slack_dm {
        reasons.push("Slack DM is disabled by policy.".to_string());
    }
    if !reasons.is_empty() {
        return deny(tool_name, reasons);
    }

    if is_write {
        if let Some(restriction) = policy.write_restrictions.get(tool_name) {
            let mut reasons = Vec::new();
            let template_id = tool_inputs.get("template_id").and_then(Value::as_str).unwrap_or("");
            if !restriction.allowed_template_ids.iter().any(|id| id == template_id) {
                reasons.push(format!(
                    "Template ID '{template_id}' is not in the allowed list: {:?}.",
                    restriction.allowed_template_ids
                ));
            }
            let create_new = tool_inputs.get("create_new_deck").and_then(Value::as_bool).unwrap_or(false);
            if create_new && !restriction.allow_create_new_decks {
                reasons.push("Creating new decks is not allowed by policy.".to_string());
            }
            if !reasons.is_empty() {
                return deny(tool_name, reasons);
            }
        }
    }

    PolicyDecision {
        decision: Decision::Allow,
        tool_name: tool_name.to_string(),
        reasons: vec!["all_checks_passed".to_string()],
    }
}

fn deny(tool_name: &str, reasons: Vec<String>) -> PolicyDecision {
    PolicyDecision {
        decision: Decision::Deny,
        tool_name: tool_name.to_string(),
        reasons,
    }
}

/// Backend-agnostic policy decider, so the engine can depend on a trait
/// rather than the free function directly.
pub trait PolicyDecider {
    /// Evaluates a tool call. See [`check`] for the rule sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the decider itself fails (the built-in
    /// [`DefaultPolicyEngine`] never does).
    fn decide(&self, tool_name: &str, tool_inputs: &Value, ctx: &RunContext, is_write: bool, policy: &PolicyBundle) -> Result<PolicyDecision, PolicyError>;
}

/// The built-in policy decider, implementing the fixed rule sequence above.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicyEngine;

impl PolicyDecider for DefaultPolicyEngine {
    fn decide(&self, tool_name: &str, tool_inputs: &Value, ctx: &RunContext, is_write: bool, policy: &PolicyBundle) -> Result<PolicyDecision, PolicyError> {
        Ok(check(tool_name, tool_inputs, ctx, is_write, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::check;
    use super::is_infra_tool;
    use saw_core::Decision;
    use saw_core::EgressPolicy;
    use saw_core::PolicyBundle;
    use saw_core::PolicyId;
    use saw_core::RunContext;
    use saw_core::SawId;
    use saw_core::ToolLists;
    use saw_core::WriteRestriction;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    fn board_metrics_policy() -> PolicyBundle {
        let mut write_restrictions = BTreeMap::new();
        write_restrictions.insert(
            "tool_slides_update_template".to_string(),
            WriteRestriction {
                allowed_template_ids: vec!["TEMPLATE_DECK_V1".to_string()],
                allow_create_new_decks: false,
            },
        );
        PolicyBundle {
            policy_id: PolicyId::new("policy_board_metrics_v1"),
            sensitivity_level: "medium".to_string(),
            tools: ToolLists {
                allowlist: BTreeSet::from([
                    "tool_salesforce_read_pipeline".to_string(),
                    "tool_stripe_read_revenue".to_string(),
                    "tool_reconcile_metrics".to_string(),
                    "tool_generate_board_summary".to_string(),
                    "tool_slides_update_template".to_string(),
                    "tool_logger_write".to_string(),
                ]),
                denylist: BTreeSet::from([
                    "tool_browser".to_string(),
                    "tool_shell_exec".to_string(),
                    "tool_external_http".to_string(),
                    "tool_email_send".to_string(),
                    "tool_slack_dm".to_string(),
                ]),
            },
            egress: EgressPolicy {
                allow_external_http: false,
                allowed_domains: Vec::new(),
                allow_email_send: false,
                allow_slack_dm: false,
            },
            write_restrictions,
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(
            "r1".into(),
            SawId::new("saw_board_metrics_v1"),
            PolicyId::new("policy_board_metrics_v1"),
            "2026-01-01T00:00:00Z",
            "bizops_analyst",
            "bizops_manager",
        )
    }

    #[test]
    fn denylisted_tool_is_denied_before_allowlist_check() {
        let decision = check("tool_shell_exec", &json!({}), &ctx(), false, &board_metrics_policy());
        assert_eq!(decision.decision, Decision::Deny);
        assert!(decision.reasons[0].contains("denylist"));
    }

    #[test]
    fn unlisted_tool_is_denied_with_policy_id_in_reason() {
        let decision = check("tool_unknown", &json!({}), &ctx(), false, &board_metrics_policy());
        assert_eq!(decision.decision, Decision::Deny);
        assert!(decision.reasons[0].contains("policy_board_metrics_v1"));
    }

    #[test]
    fn egress_gate_denies_external_http_by_default() {
        let policy = board_metrics_policy();
        let decision = check("tool_external_http", &json!({}), &ctx(), false, &policy);
        assert_eq!(decision.decision, Decision::Deny);
    }

    #[test]
    fn write_restriction_denies_unknown_template() {
        let decision = check(
            "tool_slides_update_template",
            &json!({"template_id": "ROGUE_TEMPLATE"}),
            &ctx(),
            true,
            &board_metrics_policy(),
        );
        assert_eq!(decision.decision, Decision::Deny);
        assert!(decision.reasons[0].contains("ROGUE_TEMPLATE"));
    }

    #[test]
    fn write_restriction_allows_known_template() {
        let decision = check(
            "tool_slides_update_template",
            &json!({"template_id": "TEMPLATE_DECK_V1"}),
            &ctx(),
            true,
            &board_metrics_policy(),
        );
        assert_eq!(decision.decision, Decision::Allow);
        assert_eq!(decision.reasons, vec!["all_checks_passed".to_string()]);
    }

    #[test]
    fn read_only_tool_allows_without_write_check() {
        let decision = check("tool_salesforce_read_pipeline", &json!({}), &ctx(), false, &board_metrics_policy());
        assert_eq!(decision.decision, Decision::Allow);
    }

    #[test]
    fn logger_write_is_an_infra_tool() {
        assert!(is_infra_tool("tool_logger_write"));
        assert!(!is_infra_tool("tool_slides_update_template"));
    }
}
