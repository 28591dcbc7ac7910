//! Constant folding for literal immediates.
//!
//! `add 0` is re-checked here because dead-code elimination can expose new
//! instances after the peephole pass has already run.

use crate::{Instruction, InstructionClass};

/// Fold arithmetic with literal immediates: drop `add 0` and `mul 1`,
/// collapse `mul 0` into loading zero.
pub fn run(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());

    for insn in instructions {
        if is_immediate_alu(insn) {
            if insn.opcode.is_add() && insn.immediate == Some(0) {
                continue;
            }
            if insn.opcode.is_mul() {
                match insn.immediate {
                    Some(0) => {
                        out.push(Instruction::load_imm(insn.dst, 0));
                        continue;
                    }
                    Some(1) => continue,
                    _ => {}
                }
            }
        }
        out.push(insn.clone());
    }

    out
}

fn is_immediate_alu(insn: &Instruction) -> bool {
    matches!(
        insn.class(),
        InstructionClass::Alu32 | InstructionClass::Alu64
    ) && !insn.opcode.is_source_register()
}
