//! Jump-target bounds, unreachable code, and exit presence.

use crate::validator::{IssuePattern, SecurityIssue};
use crate::{Instruction, Opcode};

/// Check that every branch lands inside the program and that the program
/// terminates.
pub fn run(instructions: &[Instruction]) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();
    let len = instructions.len() as i64;

    for (index, insn) in instructions.iter().enumerate() {
        if !insn.opcode.is_jump() {
            continue;
        }
        let Some(offset) = insn.offset else { continue };
        let target = index as i64 + 1 + offset as i64;
        if target < 0 || target >= len {
            issues.push(SecurityIssue::error(
                IssuePattern::InvalidJumpTarget,
                format!(
                    "jump target {} is outside the program (0..{})",
                    target, len
                ),
                Some(index),
            ));
        }
    }

    match instructions.iter().position(|i| i.opcode == Opcode::Exit) {
        Some(first_exit) => {
            for index in first_exit + 1..instructions.len() {
                issues.push(SecurityIssue::warning(
                    IssuePattern::UnreachableCode,
                    format!("instruction follows the exit at #{first_exit}"),
                    Some(index),
                ));
            }
        }
        None => {
            issues.push(SecurityIssue::error(
                IssuePattern::MissingExit,
                "program has no exit instruction",
                None,
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Register;

    #[test]
    fn test_in_range_jumps_pass() {
        let program = vec![
            Instruction::jump_if(Opcode::JeqImm, Register::R1, 0, 1),
            Instruction::load_imm(Register::R0, 1),
            Instruction::exit(),
        ];
        assert!(run(&program).is_empty());
    }

    #[test]
    fn test_forward_jump_out_of_range() {
        let program = vec![Instruction::jump(5), Instruction::exit()];
        let issues = run(&program);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].pattern, IssuePattern::InvalidJumpTarget);
        assert_eq!(issues[0].instruction_index, Some(0));
    }

    #[test]
    fn test_backward_jump_before_entry() {
        let program = vec![
            Instruction::exit(),
            Instruction::jump(-3),
        ];
        let issues = run(&program);
        assert!(issues.iter().any(|i| i.pattern == IssuePattern::InvalidJumpTarget));
    }

    #[test]
    fn test_missing_exit_is_fatal() {
        let program = vec![Instruction::load_imm(Register::R0, 0)];
        let issues = run(&program);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].pattern, IssuePattern::MissingExit);
        assert!(issues[0].is_fatal());
        assert_eq!(issues[0].instruction_index, None);
    }

    #[test]
    fn test_code_after_exit_warns_per_instruction() {
        let program = vec![
            Instruction::exit(),
            Instruction::alu(Opcode::Add64Imm, Register::R1, 5),
            Instruction::alu(Opcode::Add64Imm, Register::R1, 6),
        ];
        let issues = run(&program);
        let unreachable: Vec<_> = issues
            .iter()
            .filter(|i| i.pattern == IssuePattern::UnreachableCode)
            .collect();
        assert_eq!(unreachable.len(), 2);
        assert_eq!(unreachable[0].instruction_index, Some(1));
        assert_eq!(unreachable[1].instruction_index, Some(2));
    }
}
