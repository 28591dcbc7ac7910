//! Optimization passes over an instruction sequence.
//!
//! `optimize` is a pure function: it returns a new sequence, leaves the input
//! untouched, is deterministic, and is idempotent (optimizing an already
//! optimized sequence returns it unchanged). The four passes run in a fixed
//! order, each consuming the previous pass's output. Jump offsets are stored
//! relative and are not rewritten here.

use crate::Instruction;

pub mod const_fold;
pub mod dce;
pub mod moves;
pub mod peephole;

/// Run all passes in order: dead-code elimination, peephole rewriting,
/// constant folding, redundant-move elimination.
pub fn optimize(instructions: &[Instruction]) -> Vec<Instruction> {
    log::debug!("optimizing {} instructions", instructions.len());

    let reachable = dce::run(instructions);
    let rewritten = peephole::run(&reachable);
    let folded = const_fold::run(&rewritten);
    let out = moves::run(&folded);

    log::debug!(
        "optimization complete: {} -> {} instructions",
        instructions.len(),
        out.len()
    );

    out
}
