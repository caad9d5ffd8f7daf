// saw-registry/src/lib.rs
// ============================================================================
// Module: SAW Tool Registry
// Description: Name-to-tool mapping and the tool invocation contract.
// Purpose: Let the engine resolve a node's `tool` name to an invocable
//          implementation without depending on any concrete tool crate.
// Dependencies: saw-core, thiserror
// ============================================================================

//! ## Overview
//! Tools are opaque, infallible-signature functions: `(inputs, ctx) ->
//! ToolResult`. Failure is reported through `ToolResult { success: false,
//! .. }`, never through an `Err`; `invoke` itself has no error path.

use std::collections::BTreeMap;
use std::sync::Arc;

use saw_core::RunContext;
use saw_core::ToolResult;
use serde_json::Value;
use thiserror::Error;

/// A single invocable tool.
///
/// Implementations must not mutate `ctx` beyond what their declared
/// sensitivity and egress permissions imply, and must return within a
/// bounded time budget; the engine does not itself enforce a per-tool
/// timeout.
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given resolved inputs.
    fn invoke(&self, inputs: &Value, ctx: &RunContext) -> ToolResult;

    /// Returns true when this tool is non-deterministic (e.g. LLM-backed)
    /// and its invocations must be recorded by the LLM invocation recorder.
    fn is_non_deterministic(&self) -> bool {
        false
    }
}

/// Errors raised while registering or looking up a tool.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
    /// No tool is registered under this name.
    #[error("tool '{0}' not found")]
    NotFound(String),
}

/// Name-to-tool mapping consulted by the engine for every `tool_call` node.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Registers `tool` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] if `name` is already
    /// registered.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = name.into();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Invokes the tool registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no tool is registered under
    /// `name`.
    pub fn invoke(&self, name: &str, inputs: &Value, ctx: &RunContext) -> Result<ToolResult, RegistryError> {
        self.tools.get(name).map_or_else(|| Err(RegistryError::NotFound(name.to_string())), |tool| Ok(tool.invoke(inputs, ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::RegistryError;
    use super::Tool;
    use super::ToolRegistry;
    use saw_core::RunContext;
    use saw_core::ToolResult;
    use serde_json::Value;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo;

    impl Tool for Echo {
        fn invoke(&self, inputs: &Value, _ctx: &RunContext) -> ToolResult {
            ToolResult::ok("echo", inputs.clone())
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register("echo", Arc::new(Echo)).is_ok());
        let second = registry.register("echo", Arc::new(Echo));
        assert!(matches!(second, Err(RegistryError::DuplicateTool(name)) if name == "echo"));
    }

    #[test]
    fn unknown_tool_lookup_fails() {
        let registry = ToolRegistry::new();
        let ctx = RunContext::new("r1".into(), "saw1".into(), "p1".into(), "t", "op", "ap");
        let result = registry.invoke("missing", &json!({}), &ctx);
        assert!(matches!(result, Err(RegistryError::NotFound(name)) if name == "missing"));
    }

    #[test]
    fn registered_tool_invokes_and_echoes_inputs() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register("echo", Arc::new(Echo)).is_ok());
        let ctx = RunContext::new("r1".into(), "saw1".into(), "p1".into(), "t", "op", "ap");
        let outcome = registry.invoke("echo", &json!({"x": 1}), &ctx);
        assert!(outcome.is_ok());
        if let Ok(result) = outcome {
            assert!(result.success);
            assert_eq!(result.data, json!({"x": 1}));
        }
    }
}
