// saw-core/src/lib.rs
// ============================================================================
// Module: SAW Core Library
// Description: Public API surface for the SAW core.
// Purpose: Expose the data model, identifiers, and canonical hashing
//          primitives shared by every other SAW crate.
// ============================================================================

//! ## Overview
//! `saw-core` has no knowledge of storage, policy evaluation, or graph
//! walking. It defines the vocabulary those crates share: identifiers, the
//! SAW specification and run context, the tool contract, and the canonical
//! JSON / SHA-256 hashing primitives the ledger builds its hash chain from.

pub mod canonical;
pub mod hashing;
pub mod identifiers;
pub mod interfaces;
pub mod model;
pub mod time;

pub use identifiers::NodeId;
pub use identifiers::PolicyId;
pub use identifiers::RunId;
pub use identifiers::SawId;
pub use model::Decision;
pub use model::EgressPolicy;
pub use model::LlmInvocationMeta;
pub use model::NodeType;
pub use model::PolicyBundle;
pub use model::PolicyDecision;
pub use model::RunContext;
pub use model::RunStatus;
pub use model::RunSummary;
pub use model::SawEdge;
pub use model::SawGraph;
pub use model::SawNode;
pub use model::SawSpec;
pub use model::ToolLists;
pub use model::ToolResult;
pub use model::WriteRestriction;
