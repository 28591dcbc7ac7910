//! Redundant-move elimination.

use crate::{Instruction, InstructionClass};

/// Detect the two-instruction swap idiom — `ldx ra, [rb+0]` immediately
/// followed by `ldx rb, [ra+0]` — and drop the second instruction.
pub fn run(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    let mut index = 0;

    while index < instructions.len() {
        let insn = &instructions[index];
        if let Some(next) = instructions.get(index + 1) {
            if is_zero_offset_load(insn)
                && is_zero_offset_load(next)
                && insn.src == Some(next.dst)
                && next.src == Some(insn.dst)
            {
                out.push(insn.clone());
                index += 2;
                continue;
            }
        }
        out.push(insn.clone());
        index += 1;
    }

    out
}

fn is_zero_offset_load(insn: &Instruction) -> bool {
    insn.class() == InstructionClass::Ldx && insn.offset == Some(0)
}
