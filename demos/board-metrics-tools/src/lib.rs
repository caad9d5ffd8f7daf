// board-metrics-tools/src/lib.rs
// ============================================================================
// Module: Board Metrics Demo Tools
// Description: Mock tool implementations for the two demo workflows this
//              substrate ships with: Board Metrics Aggregation and Revenue
//              Reconciliation.
// Purpose: Give `saw-cli` (and tests) a concrete, deterministic-data
//          `ToolRegistry` to run the worked scenarios against, without
//          reaching any real upstream system.
// Dependencies: saw-core, saw-registry, serde_json
// ============================================================================

//! ## Overview
//! Every tool here is a static-data mock: read-only tools return canned
//! figures regardless of input, the two reconciliation tools compute their
//! output deterministically from their declared inputs, and the two
//! summary-generation tools are marked non-deterministic and carry the
//! `llm_meta` fields the engine lifts into an LLM invocation record.

use saw_core::RunContext;
use saw_core::ToolResult;
use saw_registry::RegistryError;
use saw_registry::Tool;
use saw_registry::ToolRegistry;
use serde_json::Value;
use serde_json::json;

/// Registers every tool this crate ships under its canonical name.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateTool`] if `registry` already has an
/// entry under one of these names.
pub fn register_all(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register("tool_salesforce_read_pipeline", std::sync::Arc::new(SalesforceReadPipeline))?;
    registry.register("tool_stripe_read_revenue", std::sync::Arc::new(StripeReadRevenue))?;
    registry.register("tool_reconcile_metrics", std::sync::Arc::new(ReconcileMetrics))?;
    registry.register("tool_generate_board_summary", std::sync::Arc::new(GenerateBoardSummary))?;
    registry.register("tool_slides_update_template", std::sync::Arc::new(SlidesUpdateTemplate))?;
    registry.register("tool_logger_write", std::sync::Arc::new(LoggerWrite))?;
    registry.register("tool_quickbooks_read_expenses", std::sync::Arc::new(QuickbooksReadExpenses))?;
    registry.register("tool_stripe_read_payouts", std::sync::Arc::new(StripeReadPayouts))?;
    registry.register("tool_reconcile_revenue", std::sync::Arc::new(ReconcileRevenue))?;
    registry.register("tool_generate_revenue_report", std::sync::Arc::new(GenerateRevenueReport))?;
    registry.register("tool_write_revenue_report", std::sync::Arc::new(WriteRevenueReport))?;
    Ok(())
}

fn usd(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

// ── Board Metrics Aggregation ──────────────────────────────────────────

/// Mock: returns pipeline and bookings for a given period/segment.
struct SalesforceReadPipeline;

impl Tool for SalesforceReadPipeline {
    fn invoke(&self, _inputs: &Value, _ctx: &RunContext) -> ToolResult {
        ToolResult::ok(
            "tool_salesforce_read_pipeline",
            json!({
                "pipeline_usd": 4_250_000.0,
                "bookings_usd": 1_875_000.0,
                "notes": "Includes 2 deals awaiting legal review.",
            }),
        )
    }
}

/// Mock: returns gross, refunded, and net revenue.
struct StripeReadRevenue;

impl Tool for StripeReadRevenue {
    fn invoke(&self, _inputs: &Value, _ctx: &RunContext) -> ToolResult {
        ToolResult::ok(
            "tool_stripe_read_revenue",
            json!({
                "gross_revenue_usd": 2_100_000.0,
                "refunds_usd": 45_000.0,
                "net_revenue_usd": 2_055_000.0,
            }),
        )
    }
}

/// Deterministic reconciliation of Salesforce bookings against Stripe net
/// revenue. Flags a large delta when it exceeds 10% of bookings.
struct ReconcileMetrics;

impl Tool for ReconcileMetrics {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let salesforce = inputs.get("salesforce").cloned().unwrap_or(Value::Null);
        let stripe = inputs.get("stripe").cloned().unwrap_or(Value::Null);

        let bookings = usd(&salesforce, "bookings_usd");
        let net_revenue = usd(&stripe, "net_revenue_usd");
        let delta = bookings - net_revenue;

        let mut discrepancies = Vec::new();
        let mut flags = Vec::new();

        if delta.abs() > 0.0 {
            discrepancies.push(json!({
                "field": "bookings_vs_net_revenue",
                "salesforce_value": bookings,
                "stripe_value": net_revenue,
                "delta_usd": delta,
            }));
        }
        if delta.abs() / bookings.max(1.0) > 0.10 {
            flags.push("LARGE_DELTA: bookings vs net revenue diverges >10%");
        }

        let reconciled = json!({
            "pipeline_usd": usd(&salesforce, "pipeline_usd"),
            "bookings_usd": bookings,
            "gross_revenue_usd": usd(&stripe, "gross_revenue_usd"),
            "refunds_usd": usd(&stripe, "refunds_usd"),
            "net_revenue_usd": net_revenue,
            "bookings_revenue_delta_usd": delta,
        });

        ToolResult::ok(
            "tool_reconcile_metrics",
            json!({
                "discrepancies": discrepancies,
                "flags": flags,
                "reconciled_metrics": reconciled,
            }),
        )
    }
}

/// Stub LLM tool: renders a canned markdown table and commentary from the
/// reconciled metrics. Marked non-deterministic so the engine records an LLM
/// invocation for it.
struct GenerateBoardSummary;

impl Tool for GenerateBoardSummary {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let metrics = inputs.get("reconciled_metrics").cloned().unwrap_or(Value::Null);
        let table = format!(
            "| Metric | Value |\n|---|---|\n| Pipeline | ${:.0} |\n| Bookings | ${:.0} |\n| Gross Revenue | ${:.0} |\n| Refunds | ${:.0} |\n| Net Revenue | ${:.0} |\n| Bookings\u{2013}Revenue Delta | ${:.0} |",
            usd(&metrics, "pipeline_usd"),
            usd(&metrics, "bookings_usd"),
            usd(&metrics, "gross_revenue_usd"),
            usd(&metrics, "refunds_usd"),
            usd(&metrics, "net_revenue_usd"),
            usd(&metrics, "bookings_revenue_delta_usd"),
        );
        let commentary = "Pipeline remains healthy. Net revenue tracks within expected range. \
            Bookings-to-revenue delta reflects timing of contract activations; \
            2 deals pending legal review."
            .to_string();

        ToolResult::ok(
            "tool_generate_board_summary",
            json!({
                "metrics_table_markdown": table,
                "commentary": commentary,
                "provider": "anthropic",
                "model_name": "claude-3-5-sonnet",
                "temperature": 0.2,
                "max_tokens": 1024,
                "sanitized_prompt_input": inputs.clone(),
                "llm_output_text": format!("{table}\n\n{commentary}"),
            }),
        )
    }

    fn is_non_deterministic(&self) -> bool {
        true
    }
}

/// Mock write: requires `template_id`, otherwise fails closed.
struct SlidesUpdateTemplate;

impl Tool for SlidesUpdateTemplate {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let template_id = inputs.get("template_id").and_then(Value::as_str).unwrap_or("");
        if template_id.is_empty() {
            return ToolResult::fail("tool_slides_update_template", "template_id is required");
        }
        ToolResult::ok(
            "tool_slides_update_template",
            json!({
                "status": "updated",
                "updated_slide_ids": ["slide_3", "slide_4"],
            }),
        )
    }
}

/// Infra tool, exempt from policy checks. The ledger itself is the record of
/// truth; this stub exists to satisfy the tool registry contract.
struct LoggerWrite;

impl Tool for LoggerWrite {
    fn invoke(&self, _inputs: &Value, _ctx: &RunContext) -> ToolResult {
        ToolResult::ok("tool_logger_write", json!({"status": "logged"}))
    }
}

// ── Revenue Reconciliation ─────────────────────────────────────────────

/// Mock: returns total expenses for the requested period.
struct QuickbooksReadExpenses;

impl Tool for QuickbooksReadExpenses {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let period = inputs.get("period").and_then(Value::as_str).unwrap_or("2025-Q1").to_string();
        ToolResult::ok(
            "tool_quickbooks_read_expenses",
            json!({
                "total_expenses_usd": 1_240_000.0,
                "payroll_usd": 820_000.0,
                "opex_usd": 420_000.0,
                "period": period,
            }),
        )
    }
}

/// Mock: returns total payouts for the period.
struct StripeReadPayouts;

impl Tool for StripeReadPayouts {
    fn invoke(&self, _inputs: &Value, _ctx: &RunContext) -> ToolResult {
        ToolResult::ok(
            "tool_stripe_read_payouts",
            json!({
                "total_payouts_usd": 1_980_000.0,
                "pending_usd": 75_000.0,
                "failed_usd": 12_000.0,
            }),
        )
    }
}

/// Deterministic reconciliation of payouts against expenses. Flags a margin
/// below 20%.
struct ReconcileRevenue;

impl Tool for ReconcileRevenue {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let expenses = inputs.get("expenses").cloned().unwrap_or(Value::Null);
        let payouts = inputs.get("payouts").cloned().unwrap_or(Value::Null);

        let total_payouts = usd(&payouts, "total_payouts_usd");
        let total_expenses = usd(&expenses, "total_expenses_usd");
        let net_position = total_payouts - total_expenses;
        let margin_pct = ((net_position / total_payouts.max(1.0)) * 100.0 * 10.0).round() / 10.0;

        ToolResult::ok(
            "tool_reconcile_revenue",
            json!({
                "net_position_usd": net_position,
                "margin_pct": margin_pct,
                "flagged": margin_pct < 20.0,
            }),
        )
    }
}

/// Stub LLM tool: renders the revenue reconciliation report.
struct GenerateRevenueReport;

impl Tool for GenerateRevenueReport {
    fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
        let reconciled = inputs.get("reconciled").cloned().unwrap_or(Value::Null);
        let net_position = usd(&reconciled, "net_position_usd");
        let margin_pct = usd(&reconciled, "margin_pct");
        let flagged = reconciled.get("flagged").and_then(Value::as_bool).unwrap_or(false);

        let flag_cell = if flagged { "\u{26a0}\u{fe0f} Below 20% threshold" } else { "\u{2705} Within range" };
        let table = format!(
            "| Metric | Value |\n|---|---|\n| Total Payouts | $1,980,000 |\n| Total Expenses | $1,240,000 |\n| Net Position | ${net_position:.0} |\n| Margin | {margin_pct}% |\n| Flag | {flag_cell} |"
        );
        let commentary = if flagged {
            format!("Net position of ${net_position:.0} reflects a {margin_pct}% margin. Margin is below the 20% threshold \u{2014} review recommended before write.")
        } else {
            format!("Net position of ${net_position:.0} reflects a {margin_pct}% margin. Margin is within expected range. No anomalies detected.")
        };

        ToolResult::ok(
            "tool_generate_revenue_report",
            json!({
                "metrics_table_markdown": table,
                "commentary": commentary,
                "provider": "anthropic",
                "model_name": "claude-3-5-sonnet",
                "temperature": 0.2,
                "max_tokens": 1024,
                "sanitized_prompt_input": inputs.clone(),
                "llm_output_text": format!("{table}\n\n{commentary}"),
            }),
        )
    }

    fn is_non_deterministic(&self) -> bool {
        true
    }
}

/// Mock write: pretends to write the finance report to storage.
struct WriteRevenueReport;

impl Tool for WriteRevenueReport {
    fn invoke(&self, _inputs: &Value, _ctx: &RunContext) -> ToolResult {
        ToolResult::ok(
            "tool_write_revenue_report",
            json!({
                "status": "written",
                "destination": "finance_reports/q1_revenue_reconciliation.pdf",
            }),
        )
    }
}
