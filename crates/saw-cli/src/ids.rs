// saw-cli/src/ids.rs
// ============================================================================
// Module: Run Identifier Generation
// Description: Generates fresh run identifiers for the `run` subcommand.
// Purpose: Opaque, collision-resistant ids; not a core-engine concern, since
//          the engine only ever consumes a `RunId` a caller already picked.
// Dependencies: rand, saw-core
// ============================================================================

use rand::RngCore;
use rand::rngs::OsRng;
use saw_core::RunId;
use saw_core::hashing::hex_encode;

/// Generates a fresh run id: `run_` followed by 32 hex characters of
/// OS-entropy randomness.
#[must_use]
pub fn new_run_id() -> RunId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    RunId::new(format!("run_{}", hex_encode(&bytes)))
}
