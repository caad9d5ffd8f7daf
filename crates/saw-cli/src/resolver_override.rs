// saw-cli/src/resolver_override.rs
// ============================================================================
// Module: Template-Id-Overriding Resolver
// Description: Wraps the engine's default resolver to force a caller-chosen
//              `template_id` onto the board-metrics write node.
// Purpose: Lets `saw run --override-template-id ROGUE_TEMPLATE` demonstrate
//          a policy write-restriction denial from the command line, the way
//          the core contract's worked Scenario C does in tests.
// Dependencies: saw-core, saw-engine
// ============================================================================

use saw_core::RunContext;
use saw_core::SawNode;
use saw_engine::DefaultInputResolver;
use saw_engine::InputResolver;
use serde_json::Value;

/// Delegates to [`DefaultInputResolver`] for every node except
/// `n_update_slides`, whose resolved `template_id` is replaced with the
/// caller-supplied override.
pub struct TemplateIdOverride {
    template_id: String,
    inner: DefaultInputResolver,
}

impl TemplateIdOverride {
    /// Builds an override resolver forcing `template_id` onto the write node.
    #[must_use]
    pub fn new(template_id: String) -> Self {
        Self { template_id, inner: DefaultInputResolver }
    }
}

impl InputResolver for TemplateIdOverride {
    fn resolve(&self, node_id: &str, node: &SawNode, ctx: &RunContext) -> Value {
        let mut resolved = self.inner.resolve(node_id, node, ctx);
        if node_id == "n_update_slides" {
            if let Value::Object(map) = &mut resolved {
                map.insert("template_id".to_string(), Value::String(self.template_id.clone()));
            }
        }
        resolved
    }
}
