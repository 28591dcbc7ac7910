//! Wide 64-bit immediate load checks.
//!
//! A wide `lddw` occupies two consecutive 8-byte slots, so it cannot be the
//! final instruction: the second slot would fall off the end of the stream.
//! A narrow `lddw` must carry a value the single 32-bit slot field can hold.

use crate::validator::{IssuePattern, SecurityIssue};
use crate::{Instruction, Opcode};

/// Check wide-load placement and narrow-load value range.
pub fn run(instructions: &[Instruction]) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();

    for (index, insn) in instructions.iter().enumerate() {
        if insn.opcode != Opcode::Lddw {
            continue;
        }

        if insn.is_wide() && index + 1 == instructions.len() {
            issues.push(SecurityIssue::error(
                IssuePattern::IncompleteWideImmediate,
                "wide lddw reserves the following slot and cannot be the last instruction",
                Some(index),
            ));
        }

        if let Some(immediate) = insn.immediate {
            if !insn.is_wide() && !Instruction::fits_imm_slot(immediate) {
                issues.push(SecurityIssue::error(
                    IssuePattern::ImmediateOverflow,
                    format!(
                        "immediate {immediate:#x} does not fit the single-slot 32-bit field"
                    ),
                    Some(index),
                ));
            }
        }
    }

    issues
}
