// saw-cli/src/main.rs
// ============================================================================
// Module: SAW CLI Entry Point
// Description: Local command dispatcher for running bundled demo SAWs and
//              inspecting/verifying their ledgers.
// Purpose: A runnable front door to the engine/policy/ledger substrate for
//          local development and manual audits, deliberately without the
//          HTTP façade, dashboard, or report generation this specification
//          puts out of core scope.
// Dependencies: clap, saw-core, saw-engine, saw-policy, saw-registry,
//               saw-store-sqlite, board-metrics-tools
// ============================================================================

//! ## Overview
//! Three subcommands: `run` executes one of the two bundled demo SAWs
//! against a local `SQLite` ledger, `verify` re-walks a run's hash chain
//! from `GENESIS`, and `show` prints a run's header and ledger entries.
//! `--run-id` accepts either a full id or an unambiguous prefix, resolved
//! via [`saw_core::interfaces::RunStore::resolve_prefix`]; the engine itself
//! never accepts a prefix.

mod error;
mod ids;
mod resolver_override;
mod specs;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use saw_core::RunContext;
use saw_core::RunId;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::RunStore;
use saw_engine::Engine;
use saw_policy::DefaultPolicyEngine;
use saw_registry::ToolRegistry;
use serde_json::Value;
use serde_json::json;

use crate::error::CliError;
use crate::specs::DemoSaw;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "saw", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs one of the bundled demo SAWs to completion, denial, or error.
    Run(RunArgs),
    /// Re-walks a run's hash chain from `GENESIS` and reports its validity.
    Verify(RunLookupArgs),
    /// Prints a run's header and every ledger entry recorded for it.
    Show(RunLookupArgs),
}

/// Arguments shared by any subcommand that looks a run up by id or prefix.
#[derive(Args, Debug)]
struct RunLookupArgs {
    /// Path to the `SQLite` database file.
    #[arg(long, value_name = "PATH", default_value = "saw_runs.db")]
    db: PathBuf,
    /// Full run id, or an unambiguous prefix of one.
    #[arg(long, value_name = "ID")]
    run_id: String,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the `SQLite` database file.
    #[arg(long, value_name = "PATH", default_value = "saw_runs.db")]
    db: PathBuf,
    /// Which bundled demo workflow to execute.
    #[arg(long, value_enum)]
    saw: DemoSaw,
    /// Grant the run's approval gate.
    #[arg(long)]
    approve: bool,
    /// Observed approval wait time in milliseconds, recorded whether or not
    /// `--approve` is set.
    #[arg(long, default_value_t = 0.0)]
    approval_wait_ms: f64,
    /// Approver attribution, recorded when `--approve` is set.
    #[arg(long, default_value = "cli_approver")]
    approved_by: String,
    /// Free-form approval note.
    #[arg(long)]
    approval_note: Option<String>,
    /// Operator attribution for this run.
    #[arg(long, default_value = "cli_operator")]
    operator: String,
    /// Overrides the write node's `template_id`, to exercise a policy
    /// write-restriction denial from the command line.
    #[arg(long, value_name = "TEMPLATE_ID")]
    override_template_id: Option<String>,
    /// Wall-clock cap for the run, in milliseconds. Unset preserves the
    /// uncapped core contract.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run(args) => command_run(&args),
        Commands::Verify(args) => command_verify(&args),
        Commands::Show(args) => command_show(&args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Ok(envelope) = serde_json::to_string_pretty(&err) {
                eprintln!("{envelope}");
            }
            ExitCode::FAILURE
        }
    }
}

fn command_run(args: &RunArgs) -> Result<(), CliError> {
    let db_path = args.db.to_string_lossy().into_owned();
    let (ledger, run_store, llm_recorder) = saw_store_sqlite::open(&db_path)?;

    let mut registry = ToolRegistry::new();
    board_metrics_tools::register_all(&mut registry).map_err(|err| CliError::new("WAVE_EXECUTION_ERROR", err.to_string()))?;

    let spec = args.saw.build();
    let run_id = ids::new_run_id();
    let started_at = saw_core::time::now_iso();

    let mut ctx = RunContext::new(run_id.clone(), spec.saw_id.clone(), spec.policy_bundle.policy_id.clone(), started_at, args.operator.clone(), args.approved_by.clone());
    ctx.state.insert("_approval_granted".to_string(), Value::Bool(args.approve));
    ctx.state.insert("_approval_wait_ms".to_string(), json!(args.approval_wait_ms));
    if args.approve {
        ctx.state.insert("_approved_by".to_string(), Value::String(args.approved_by.clone()));
        ctx.state.insert("_approved_at".to_string(), Value::String(saw_core::time::now_iso()));
        if let Some(note) = &args.approval_note {
            ctx.state.insert("_approval_note".to_string(), Value::String(note.clone()));
        }
    }

    let policy = DefaultPolicyEngine;
    let engine = Engine::new(&ledger, &run_store, &llm_recorder);
    let deadline = args.timeout_ms.map(Duration::from_millis);

    let summary = if let Some(template_id) = &args.override_template_id {
        let resolver = resolver_override::TemplateIdOverride::new(template_id.clone());
        engine.run_with_resolver(&spec, &mut ctx, &policy, &registry, &resolver, deadline)?
    } else {
        engine.run(&spec, ctx, &policy, &registry, deadline)?
    };

    let rendered = serde_json::to_string_pretty(&summary).map_err(CliError::from)?;
    println!("{rendered}");
    Ok(())
}

fn resolve_run_id(run_store: &saw_store_sqlite::SqliteRunStore, raw: &str) -> Result<RunId, CliError> {
    if run_store.load(&RunId::new(raw)).is_ok() {
        return Ok(RunId::new(raw));
    }
    Ok(run_store.resolve_prefix(raw)?)
}

fn command_verify(args: &RunLookupArgs) -> Result<(), CliError> {
    let db_path = args.db.to_string_lossy().into_owned();
    let (ledger, run_store, _llm) = saw_store_sqlite::open(&db_path)?;
    let run_id = resolve_run_id(&run_store, &args.run_id)?;

    let report = ledger.verify(&run_id)?;
    let rendered = json!({
        "run_id": run_id.as_str(),
        "valid": report.valid,
        "first_mismatch_index": report.first_mismatch_index,
        "expected_hash": report.expected_hash,
        "found_hash": report.found_hash,
    });
    println!("{}", serde_json::to_string_pretty(&rendered).map_err(CliError::from)?);
    Ok(())
}

fn command_show(args: &RunLookupArgs) -> Result<(), CliError> {
    let db_path = args.db.to_string_lossy().into_owned();
    let (ledger, run_store, _llm) = saw_store_sqlite::open(&db_path)?;
    let run_id = resolve_run_id(&run_store, &args.run_id)?;

    let record = run_store.load(&run_id)?;
    let entries = ledger.entries(&run_id)?;

    let rendered = json!({
        "run": {
            "run_id": record.run_id.as_str(),
            "saw_id": record.saw_id,
            "started_at": record.started_at,
            "status": record.status,
            "policy_hash": record.policy_hash,
            "policy_version": record.policy_version,
            "approved_by": record.approved_by,
            "approved_at": record.approved_at,
            "approval_note": record.approval_note,
        },
        "entries": entries.iter().map(|e| json!({
            "id": e.id,
            "timestamp_iso": e.timestamp_iso,
            "node_id": e.node_id,
            "tool_name": e.tool_name,
            "decision": e.decision,
            "latency_ms": e.latency_ms,
            "prev_hash": e.prev_hash,
            "event_hash": e.event_hash,
            "error": e.error,
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&rendered).map_err(CliError::from)?);
    Ok(())
}
