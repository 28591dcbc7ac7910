//! Decoding an encoded slot stream back into instructions.
//!
//! This is the inverse of [`crate::assembler::encode`], used to inspect and
//! re-validate already-compiled programs (for example a `.text` payload
//! pulled out of a parsed ELF). Unknown opcode bytes are rejected here —
//! with the IR's closed opcode enumeration, this boundary is where an
//! invalid opcode can actually occur.

use crate::{Instruction, InstructionClass, Opcode, Register};

/// Errors for a malformed bytecode stream.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Byte does not name any opcode in the ISA
    #[error("invalid opcode {code:#04x} at byte offset {offset}")]
    UnknownOpcode { code: u8, offset: usize },

    /// Stream ends inside an instruction slot
    #[error("truncated instruction slot at byte offset {offset}")]
    Truncated { offset: usize },
}

/// Slot size in bytes.
pub const SLOT_SIZE: usize = 8;

/// Decode a flat slot stream into instructions.
///
/// A wide `lddw` is recognized by its continuation slot: the following slot
/// carries zeroed format fields and the upper immediate half. A `lddw` slot
/// followed by anything else is the narrow single-slot form.
pub fn disassemble(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::with_capacity(bytes.len() / SLOT_SIZE);
    let mut offset = 0;

    while offset < bytes.len() {
        if offset + SLOT_SIZE > bytes.len() {
            return Err(DecodeError::Truncated { offset });
        }
        let slot = &bytes[offset..offset + SLOT_SIZE];
        let code = slot[0];
        let opcode = Opcode::from_code(code).ok_or(DecodeError::UnknownOpcode { code, offset })?;

        let mut insn = decode_slot(opcode, slot);
        offset += SLOT_SIZE;

        if opcode == Opcode::Lddw {
            if let Some(continuation) = continuation_slot(&bytes[offset..]) {
                let lo = u32::from_le_bytes(slot[4..8].try_into().unwrap()) as u64;
                let hi = u32::from_le_bytes(continuation[4..8].try_into().unwrap()) as u64;
                insn.immediate = Some(((hi << 32) | lo) as i64);
                insn.encoded_width = 16;
                offset += SLOT_SIZE;
            }
        }

        instructions.push(insn);
    }

    log::trace!(
        "disassembled {} bytes into {} instructions",
        bytes.len(),
        instructions.len()
    );

    Ok(instructions)
}

/// A continuation slot has all four format bytes zeroed. No real opcode is
/// 0x00, so this cannot shadow a following instruction.
fn continuation_slot(rest: &[u8]) -> Option<&[u8]> {
    let slot = rest.get(..SLOT_SIZE)?;
    slot[..4].iter().all(|byte| *byte == 0).then_some(slot)
}

fn decode_slot(opcode: Opcode, slot: &[u8]) -> Instruction {
    let dst = Register::from_raw(slot[1] & 0x0f);
    let src = Register::from_raw(slot[1] >> 4);
    let offset = i16::from_le_bytes(slot[2..4].try_into().unwrap());
    let immediate = i32::from_le_bytes(slot[4..8].try_into().unwrap()) as i64;

    let mut insn = Instruction {
        opcode,
        dst,
        src: None,
        offset: None,
        immediate: None,
        encoded_width: 8,
        comment: None,
    };

    match opcode.class() {
        InstructionClass::Ld => {
            insn.immediate = Some(immediate);
        }
        InstructionClass::Ldx => {
            insn.src = Some(src);
            insn.offset = Some(offset);
        }
        InstructionClass::St => {
            insn.offset = Some(offset);
            insn.immediate = Some(immediate);
        }
        InstructionClass::Stx => {
            insn.src = Some(src);
            insn.offset = Some(offset);
        }
        InstructionClass::Alu32 | InstructionClass::Alu64 => {
            if opcode.is_source_register() {
                insn.src = Some(src);
            } else if !opcode.is_neg() {
                insn.immediate = Some(immediate);
            }
        }
        InstructionClass::Jmp | InstructionClass::Jmp32 => match opcode {
            Opcode::Exit => {}
            Opcode::Call => insn.immediate = Some(immediate),
            Opcode::Ja => insn.offset = Some(offset),
            _ => {
                insn.offset = Some(offset);
                if opcode.is_source_register() {
                    insn.src = Some(src);
                } else {
                    insn.immediate = Some(immediate);
                }
            }
        },
    }

    insn
}
