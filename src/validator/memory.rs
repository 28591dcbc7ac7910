//! Memory and stack bounds checks.
//!
//! Stack accesses are instructions whose source register is `r10`. The stack
//! grows downward, so a positive frame-relative offset reaches above the
//! frame base.

use crate::validator::{IssuePattern, SecurityIssue, ValidatorConfig};
use crate::{Instruction, Register};

/// Check frame-relative access depth and offset magnitudes.
pub fn run(instructions: &[Instruction], config: &ValidatorConfig) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();
    let mut max_depth: u32 = 0;

    for (index, insn) in instructions.iter().enumerate() {
        let Some(offset) = insn.offset else { continue };
        let magnitude = (offset as i32).unsigned_abs();

        if magnitude > 0x7fff {
            issues.push(SecurityIssue::warning(
                IssuePattern::LargeMemoryOffset,
                format!("memory offset {offset} exceeds the signed 16-bit range"),
                Some(index),
            ));
        }

        if insn.src == Some(Register::R10) {
            if offset > 0 {
                issues.push(SecurityIssue::warning(
                    IssuePattern::StackUnderflow,
                    format!("positive frame-relative offset {offset} reads above the stack frame"),
                    Some(index),
                ));
            }
            if magnitude > max_depth {
                max_depth = magnitude;
                if max_depth > config.max_stack_depth {
                    issues.push(SecurityIssue::error(
                        IssuePattern::StackOverflow,
                        format!(
                            "stack access depth {} exceeds the {}-byte limit",
                            magnitude, config.max_stack_depth
                        ),
                        Some(index),
                    ));
                }
            }
        }
    }

    issues
}
