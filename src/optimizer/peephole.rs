//! Local pattern rewrites over a small sliding window.

use crate::{Instruction, InstructionClass};

/// One left-to-right scan with in-place removal: self-move loads, `add 0`,
/// `mul 1`, and cancelling `neg` pairs are deleted.
pub fn run(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    let mut index = 0;

    while index < instructions.len() {
        let insn = &instructions[index];

        // ldx rX, [rX+0] moves a register onto itself
        if insn.class() == InstructionClass::Ldx
            && insn.src == Some(insn.dst)
            && insn.offset == Some(0)
        {
            index += 1;
            continue;
        }

        if is_immediate_alu(insn) {
            if insn.opcode.is_add() && insn.immediate == Some(0) {
                index += 1;
                continue;
            }
            if insn.opcode.is_mul() && insn.immediate == Some(1) {
                index += 1;
                continue;
            }
        }

        // neg; neg on the same register cancels
        if insn.opcode.is_neg() {
            if let Some(next) = instructions.get(index + 1) {
                if next.opcode == insn.opcode && next.dst == insn.dst {
                    index += 2;
                    continue;
                }
            }
        }

        out.push(insn.clone());
        index += 1;
    }

    out
}

fn is_immediate_alu(insn: &Instruction) -> bool {
    matches!(
        insn.class(),
        InstructionClass::Alu32 | InstructionClass::Alu64
    ) && !insn.opcode.is_source_register()
}
