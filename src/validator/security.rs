//! Arithmetic and syscall heuristics.
//!
//! These are documentation-grade lints: every add/mul is flagged as a
//! potential overflow and every division as needing a divisor check, with no
//! range inference. Only a literal zero immediate divisor is an error.

use crate::validator::{IssuePattern, SecurityIssue, ValidatorConfig};
use crate::{Instruction, Opcode};

/// Flag overflow-prone arithmetic, zero divisors, and sensitive syscalls.
pub fn run(instructions: &[Instruction], config: &ValidatorConfig) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();

    for (index, insn) in instructions.iter().enumerate() {
        let mnemonic = insn.opcode.mnemonic();

        if insn.opcode.is_add() || insn.opcode.is_mul() {
            issues.push(SecurityIssue::info(
                IssuePattern::PotentialOverflow,
                format!("{mnemonic} result may wrap; no overflow check is emitted"),
                Some(index),
            ));
        }

        if insn.opcode.is_div_or_mod() {
            if insn.immediate == Some(0) {
                issues.push(SecurityIssue::error(
                    IssuePattern::DivisionByZero,
                    format!("{mnemonic} by a literal zero divisor"),
                    Some(index),
                ));
            } else {
                issues.push(SecurityIssue::info(
                    IssuePattern::DivisionOperation,
                    format!("{mnemonic}: register divisors need a runtime zero check"),
                    Some(index),
                ));
            }
        }

        if insn.opcode == Opcode::Call {
            if let Some(number) = insn.immediate {
                if config.sensitive_syscalls.contains(&number) {
                    issues.push(SecurityIssue::warning(
                        IssuePattern::SensitiveSyscall,
                        format!("call to sensitive syscall {number}"),
                        Some(index),
                    ));
                }
            }
        }
    }

    issues
}
