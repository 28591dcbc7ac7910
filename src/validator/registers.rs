//! Register range and usage checks.
//!
//! The write-set is tracked across the linear instruction order only: a
//! register defined under one branch of a conditional jump counts as defined
//! for all later instructions, whichever path execution takes. This is a
//! deliberate straight-line heuristic, not a dataflow analysis.

use std::collections::HashSet;

use crate::validator::{IssuePattern, SecurityIssue};
use crate::{Instruction, Register};

/// Check register numbers and straight-line initialization.
pub fn run(instructions: &[Instruction]) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();
    let mut written: HashSet<u8> = HashSet::new();

    for (index, insn) in instructions.iter().enumerate() {
        if !insn.dst.is_valid() {
            issues.push(SecurityIssue::error(
                IssuePattern::InvalidRegister,
                format!("destination register r{} is out of range", insn.dst.number()),
                Some(index),
            ));
        }

        if let Some(src) = insn.src {
            if !src.is_valid() {
                issues.push(SecurityIssue::error(
                    IssuePattern::InvalidRegister,
                    format!("source register r{} is out of range", src.number()),
                    Some(index),
                ));
            } else if src != Register::R1
                && !src.is_frame_pointer()
                && !written.contains(&src.number())
            {
                // r1 carries the entry argument, r10 is the frame pointer
                issues.push(SecurityIssue::warning(
                    IssuePattern::UninitializedRegisterRead,
                    format!("{src} is read before any write to it"),
                    Some(index),
                ));
            }
        }

        if insn.opcode.writes_dst() && insn.dst.is_valid() {
            written.insert(insn.dst.number());
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;

    #[test]
    fn test_out_of_range_registers_are_errors() {
        let insn = Instruction::alu_reg(
            Opcode::Add64Reg,
            Register::from_raw(11),
            Register::from_raw(12),
        );
        let issues = run(&[insn]);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.pattern == IssuePattern::InvalidRegister));
        assert!(issues.iter().all(|i| i.is_fatal()));
    }

    #[test]
    fn test_read_before_write_warns() {
        let program = vec![
            Instruction::alu_reg(Opcode::Add64Reg, Register::R0, Register::R2),
            Instruction::exit(),
        ];
        let issues = run(&program);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].pattern, IssuePattern::UninitializedRegisterRead);
        assert_eq!(issues[0].instruction_index, Some(0));
    }

    #[test]
    fn test_write_then_read_is_clean() {
        let program = vec![
            Instruction::load_imm(Register::R2, 9),
            Instruction::alu_reg(Opcode::Add64Reg, Register::R0, Register::R2),
        ];
        assert!(run(&program).is_empty());
    }

    #[test]
    fn test_entry_argument_and_frame_pointer_are_exempt() {
        let program = vec![
            Instruction::alu_reg(Opcode::Mov64Reg, Register::R6, Register::R1),
            Instruction::load(Opcode::LdxDw, Register::R0, Register::R10, -8),
        ];
        assert!(run(&program).is_empty());
    }

    #[test]
    fn test_store_does_not_define_its_base_register() {
        // stx reads dst as an address base; a later read of that register
        // should still warn if nothing ever wrote it
        let program = vec![
            Instruction::store_reg(Opcode::StxW, Register::R2, -4, Register::R1),
            Instruction::alu_reg(Opcode::Add64Reg, Register::R0, Register::R2),
        ];
        let issues = run(&program);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].pattern, IssuePattern::UninitializedRegisterRead);
        assert_eq!(issues[0].instruction_index, Some(1));
    }
}
