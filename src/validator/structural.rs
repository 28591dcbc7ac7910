//! Opcode and operand structure checks.
//!
//! Each instruction class dictates which operands must be present. Unknown
//! opcodes cannot be represented in the IR (the [`crate::Opcode`] enum is
//! closed), so this pass only has to confirm that the operands the class
//! requires were actually supplied.

use crate::validator::{IssuePattern, SecurityIssue};
use crate::{Instruction, InstructionClass};

/// Check operand presence per instruction class.
pub fn run(instructions: &[Instruction]) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();

    for (index, insn) in instructions.iter().enumerate() {
        let mnemonic = insn.opcode.mnemonic();
        match insn.class() {
            InstructionClass::Ld => {
                if insn.immediate.is_none() {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingImmediate,
                        format!("{mnemonic} requires an immediate value"),
                        Some(index),
                    ));
                }
            }
            InstructionClass::Ldx => {
                if insn.src.is_none() || insn.offset.is_none() {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingLoadOperands,
                        format!("{mnemonic} requires a source register and an offset"),
                        Some(index),
                    ));
                }
            }
            InstructionClass::St => {
                if insn.offset.is_none() || insn.immediate.is_none() {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingStoreOperands,
                        format!("{mnemonic} requires an offset and an immediate value"),
                        Some(index),
                    ));
                }
            }
            InstructionClass::Stx => {
                if insn.offset.is_none() || insn.src.is_none() {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingStoreOperands,
                        format!("{mnemonic} requires an offset and a source register"),
                        Some(index),
                    ));
                }
            }
            InstructionClass::Alu32 | InstructionClass::Alu64 => {
                if insn.opcode.is_source_register() && insn.src.is_none() {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingAluOperands,
                        format!("register-form {mnemonic} requires a source register"),
                        Some(index),
                    ));
                } else if !insn.opcode.is_source_register()
                    && !insn.opcode.is_neg()
                    && insn.immediate.is_none()
                {
                    issues.push(SecurityIssue::error(
                        IssuePattern::MissingAluOperands,
                        format!("immediate-form {mnemonic} requires an immediate value"),
                        Some(index),
                    ));
                }
            }
            InstructionClass::Jmp | InstructionClass::Jmp32 => match insn.opcode {
                crate::Opcode::Exit => {}
                crate::Opcode::Call => {
                    if insn.immediate.is_none() {
                        issues.push(SecurityIssue::error(
                            IssuePattern::MissingImmediate,
                            "call requires a syscall number immediate",
                            Some(index),
                        ));
                    }
                }
                _ => {
                    let missing_src = insn.opcode.is_source_register() && insn.src.is_none();
                    if insn.offset.is_none() || missing_src {
                        issues.push(SecurityIssue::error(
                            IssuePattern::MissingJumpOperands,
                            format!("{mnemonic} requires a jump offset and comparison operands"),
                            Some(index),
                        ));
                    }
                }
            },
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Opcode, Register};

    fn patterns(program: &[Instruction]) -> Vec<IssuePattern> {
        run(program).into_iter().map(|i| i.pattern).collect()
    }

    #[test]
    fn test_well_formed_instructions_pass() {
        let program = vec![
            Instruction::load_imm(Register::R0, 1),
            Instruction::alu(Opcode::Add64Imm, Register::R0, 2),
            Instruction::alu_reg(Opcode::Add64Reg, Register::R0, Register::R1),
            Instruction::load(Opcode::LdxW, Register::R2, Register::R10, -4),
            Instruction::store(Opcode::StW, Register::R10, -4, 0),
            Instruction::store_reg(Opcode::StxW, Register::R10, -8, Register::R0),
            Instruction::jump_if(Opcode::JeqImm, Register::R0, 0, 1),
            Instruction::call(1),
            Instruction::exit(),
        ];
        assert!(patterns(&program).is_empty());
    }

    #[test]
    fn test_load_without_offset_is_flagged() {
        let mut insn = Instruction::load(Opcode::LdxDw, Register::R1, Register::R2, 0);
        insn.offset = None;
        assert_eq!(patterns(&[insn]), vec![IssuePattern::MissingLoadOperands]);
    }

    #[test]
    fn test_store_without_operands_is_flagged() {
        let mut insn = Instruction::store(Opcode::StDw, Register::R10, -8, 1);
        insn.immediate = None;
        assert_eq!(patterns(&[insn]), vec![IssuePattern::MissingStoreOperands]);
    }

    #[test]
    fn test_register_form_alu_needs_src() {
        let mut insn = Instruction::alu_reg(Opcode::Mul64Reg, Register::R1, Register::R2);
        insn.src = None;
        assert_eq!(patterns(&[insn]), vec![IssuePattern::MissingAluOperands]);
    }

    #[test]
    fn test_lddw_and_call_need_immediates() {
        let mut wide = Instruction::load_imm(Register::R0, 0);
        wide.immediate = None;
        let mut call = Instruction::call(1);
        call.immediate = None;
        assert_eq!(
            patterns(&[wide, call]),
            vec![IssuePattern::MissingImmediate, IssuePattern::MissingImmediate]
        );
    }

    #[test]
    fn test_neg_requires_no_operands() {
        let insn = Instruction::alu_unary(Opcode::Neg64, Register::R3);
        assert!(patterns(&[insn]).is_empty());
    }

    #[test]
    fn test_jump_without_offset_is_flagged() {
        let mut insn = Instruction::jump_if(Opcode::Jne32Imm, Register::R0, 1, 1);
        insn.offset = None;
        assert_eq!(patterns(&[insn]), vec![IssuePattern::MissingJumpOperands]);
    }
}
