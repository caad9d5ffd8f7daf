// saw-store-sqlite/src/llm_store.rs
// ============================================================================
// Module: SQLite LLM Invocation Recorder
// Description: `SQLite`-backed implementation of
//              `saw_core::interfaces::LlmInvocationRecorder`.
// Purpose: Record a hashed, preview-truncated trace of every
//          non-deterministic tool invocation without persisting the full
//          prompt or completion text.
// Dependencies: rusqlite, saw-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::params;
use saw_core::canonical::to_canonical_string;
use saw_core::hashing::normalize_text;
use saw_core::hashing::normalized_payload_hash;
use saw_core::interfaces::LlmInvocationDraft;
use saw_core::interfaces::LlmInvocationRecorder;
use saw_core::interfaces::LlmRecorderError;

/// Previews are truncated to this many characters of normalized text.
const PREVIEW_CHARS: usize = 300;

/// `SQLite`-backed [`LlmInvocationRecorder`].
#[derive(Clone)]
pub struct SqliteLlmRecorder {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteLlmRecorder {
    /// Wraps an already-initialized connection.
    #[must_use]
    pub fn new(connection: Arc<Mutex<rusqlite::Connection>>) -> Self {
        Self { connection }
    }
}

fn truncate_preview(value: &str) -> String {
    value.chars().take(PREVIEW_CHARS).collect()
}

impl LlmInvocationRecorder for SqliteLlmRecorder {
    fn record(&self, draft: LlmInvocationDraft) -> Result<(), LlmRecorderError> {
        let raw_json = to_canonical_string(&draft.raw_tool_input)
            .map_err(|err| LlmRecorderError::Storage(err.to_string()))?;
        let sanitized_json = to_canonical_string(&draft.sanitized_prompt_input)
            .map_err(|err| LlmRecorderError::Storage(err.to_string()))?;

        let raw_hash = normalized_payload_hash(&raw_json);
        let sanitized_hash = normalized_payload_hash(&sanitized_json);
        let output_hash = normalized_payload_hash(&draft.llm_output_text);

        let raw_preview = truncate_preview(&normalize_text(&raw_json));
        let output_preview = truncate_preview(&normalize_text(&draft.llm_output_text));

        let guard = self.connection.lock().map_err(|_| LlmRecorderError::Storage("llm recorder mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO llm_invocations
                    (run_id, node_id, invoked_at, provider, model_name, model_version, temperature, max_tokens,
                     raw_tool_input_hash, sanitized_prompt_input_hash, llm_output_text_hash,
                     raw_tool_input_preview, llm_output_preview)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    draft.run_id.as_str(),
                    draft.node_id,
                    draft.invoked_at,
                    draft.provider,
                    draft.model_name,
                    draft.model_version,
                    draft.temperature,
                    draft.max_tokens,
                    raw_hash,
                    sanitized_hash,
                    output_hash,
                    raw_preview,
                    output_preview,
                ],
            )
            .map_err(|err| LlmRecorderError::Storage(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteLlmRecorder;
    use crate::schema::initialize_schema;
    use crate::schema::open_connection;
    use saw_core::RunId;
    use saw_core::interfaces::LlmInvocationDraft;
    use saw_core::interfaces::LlmInvocationRecorder;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn recorder_in_memory() -> Option<SqliteLlmRecorder> {
        let connection = open_connection(":memory:").ok()?;
        initialize_schema(&connection).ok()?;
        Some(SqliteLlmRecorder::new(Arc::new(Mutex::new(connection))))
    }

    #[test]
    fn record_succeeds_for_a_well_formed_draft() {
        let recorder = recorder_in_memory();
        assert!(recorder.is_some());
        if let Some(recorder) = recorder {
            let draft = LlmInvocationDraft {
                run_id: RunId::new("r1"),
                node_id: "n_generate_summary".to_string(),
                invoked_at: "2025-01-01T00:00:00Z".to_string(),
                provider: Some("openai".to_string()),
                model_name: Some("gpt-4o".to_string()),
                model_version: None,
                temperature: Some(0.2),
                max_tokens: Some(2048),
                raw_tool_input: json!({"reconciled_metrics": {"pipeline_usd": 4_250_000.0}}),
                sanitized_prompt_input: json!({"reconciled_metrics": {"pipeline_usd": 4_250_000.0}}),
                llm_output_text: "| Metric | Value |\n| --- | --- |\n".to_string(),
            };
            assert!(recorder.record(draft).is_ok());
        }
    }
}
