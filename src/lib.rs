//! Core IR, validation, optimization and encoding for Solana-flavored BPF programs.
//!
//! This library takes a sequence of abstract instructions and statically
//! validates them, applies optimization passes, and encodes them into the
//! fixed-width 8-byte-slot instruction stream consumed by BPF-compatible
//! virtual machines. It also parses existing ELF binaries (both widths, both
//! endiannesses) back into program/section/symbol metadata, and decodes raw
//! bytecode back into instructions for re-validation.
//!
//! # Basic Usage
//!
//! ```rust
//! use sbpf_forge::{Instruction, Register};
//! use sbpf_forge::assembler::{assemble, CompilationResult, ProgramMetadata};
//!
//! // r0 := 0; exit
//! let program = vec![
//!     Instruction::load_imm(Register::R0, 0),
//!     Instruction::exit(),
//! ];
//!
//! let metadata = ProgramMetadata::new("noop", "entrypoint");
//! match assemble(&program, &metadata) {
//!     CompilationResult::Success { bytecode, .. } => {
//!         assert_eq!(bytecode.len(), 16);
//!     }
//!     CompilationResult::Failure { errors } => panic!("{errors:?}"),
//! }
//! ```

pub mod assembler;
pub mod disasm;
pub mod elf;
pub mod format;
pub mod isa;
pub mod optimizer;
pub mod validator;

pub use isa::{InstructionClass, Opcode};

use std::fmt;

/// One of the 11 machine registers, `r0` through `r10`.
///
/// The newtype deliberately admits out-of-range numbers so that the validator
/// can report them; `new` is the checked constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u8);

impl Register {
    pub const R0: Register = Register(0);
    pub const R1: Register = Register(1);
    pub const R2: Register = Register(2);
    pub const R3: Register = Register(3);
    pub const R4: Register = Register(4);
    pub const R5: Register = Register(5);
    pub const R6: Register = Register(6);
    pub const R7: Register = Register(7);
    pub const R8: Register = Register(8);
    pub const R9: Register = Register(9);
    /// Reserved stack-frame pointer, read-only by convention.
    pub const R10: Register = Register(10);

    /// Checked constructor: `None` for numbers above `r10`.
    pub fn new(number: u8) -> Option<Register> {
        (number <= 10).then_some(Register(number))
    }

    /// Unchecked constructor for callers working from raw encodings.
    /// The validator reports out-of-range values as `invalid-register`.
    pub fn from_raw(number: u8) -> Register {
        Register(number)
    }

    /// The register number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Whether the number is within `r0..=r10`.
    pub fn is_valid(self) -> bool {
        self.0 <= 10
    }

    /// Whether this is `r10`, the stack-frame pointer.
    pub fn is_frame_pointer(self) -> bool {
        self.0 == 10
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One abstract instruction, the unit a program is built from.
///
/// `encoded_width` is 16 only for wide 64-bit immediate loads, which consume
/// two consecutive 8-byte slots in the binary stream; every other instruction
/// occupies one. Tracking the width on the instruction (instead of inferring
/// it at encode time) keeps offsets correct after optimization passes
/// reorder or delete instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: Register,
    pub src: Option<Register>,
    pub offset: Option<i16>,
    pub immediate: Option<i64>,
    pub encoded_width: u8,
    pub comment: Option<String>,
}

impl Instruction {
    fn base(opcode: Opcode, dst: Register) -> Instruction {
        Instruction {
            opcode,
            dst,
            src: None,
            offset: None,
            immediate: None,
            encoded_width: 8,
            comment: None,
        }
    }

    /// Whether an immediate round-trips through the 32-bit slot field.
    pub fn fits_imm_slot(immediate: i64) -> bool {
        immediate as i32 as i64 == immediate
    }

    /// `lddw dst, imm`. Values that do not fit the 32-bit slot make the
    /// instruction wide (two slots).
    pub fn load_imm(dst: Register, immediate: i64) -> Instruction {
        let mut insn = Instruction::base(Opcode::Lddw, dst);
        insn.immediate = Some(immediate);
        if !Instruction::fits_imm_slot(immediate) {
            insn.encoded_width = 16;
        }
        insn
    }

    /// Immediate-form ALU operation, e.g. `add64 dst, imm`.
    pub fn alu(opcode: Opcode, dst: Register, immediate: i64) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.immediate = Some(immediate);
        insn
    }

    /// Register-form ALU operation, e.g. `add64 dst, src`.
    pub fn alu_reg(opcode: Opcode, dst: Register, src: Register) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.src = Some(src);
        insn
    }

    /// Unary ALU operation (`neg32`/`neg64`).
    pub fn alu_unary(opcode: Opcode, dst: Register) -> Instruction {
        Instruction::base(opcode, dst)
    }

    /// Memory load, `ldx{b,h,w,dw} dst, [src+offset]`.
    pub fn load(opcode: Opcode, dst: Register, src: Register, offset: i16) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.src = Some(src);
        insn.offset = Some(offset);
        insn
    }

    /// Immediate store, `st{b,h,w,dw} [dst+offset], imm`.
    pub fn store(opcode: Opcode, dst: Register, offset: i16, immediate: i64) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.offset = Some(offset);
        insn.immediate = Some(immediate);
        insn
    }

    /// Register store, `stx{b,h,w,dw} [dst+offset], src`.
    pub fn store_reg(opcode: Opcode, dst: Register, offset: i16, src: Register) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.offset = Some(offset);
        insn.src = Some(src);
        insn
    }

    /// Unconditional jump, `ja offset`.
    pub fn jump(offset: i16) -> Instruction {
        let mut insn = Instruction::base(Opcode::Ja, Register::R0);
        insn.offset = Some(offset);
        insn
    }

    /// Immediate-form conditional jump, e.g. `jeq dst, imm, offset`.
    pub fn jump_if(opcode: Opcode, dst: Register, immediate: i64, offset: i16) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.immediate = Some(immediate);
        insn.offset = Some(offset);
        insn
    }

    /// Register-form conditional jump, e.g. `jeq dst, src, offset`.
    pub fn jump_if_reg(opcode: Opcode, dst: Register, src: Register, offset: i16) -> Instruction {
        let mut insn = Instruction::base(opcode, dst);
        insn.src = Some(src);
        insn.offset = Some(offset);
        insn
    }

    /// `call imm` (syscall number in the immediate).
    pub fn call(immediate: i64) -> Instruction {
        let mut insn = Instruction::base(Opcode::Call, Register::R0);
        insn.immediate = Some(immediate);
        insn
    }

    /// `exit`.
    pub fn exit() -> Instruction {
        Instruction::base(Opcode::Exit, Register::R0)
    }

    /// Attach a listing comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Instruction {
        self.comment = Some(comment.into());
        self
    }

    /// Whether this instruction spans two 8-byte slots.
    pub fn is_wide(&self) -> bool {
        self.encoded_width == 16
    }

    /// Structural class of the opcode.
    pub fn class(&self) -> InstructionClass {
        self.opcode.class()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", assembler::render_operands(self))
    }
}

/// Error type for toolkit operations that cross a fallible boundary.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// ELF input could not be parsed
    #[error("ELF parse error: {0}")]
    Elf(#[from] elf::ElfError),

    /// Bytecode stream could not be decoded
    #[error("bytecode decode error: {0}")]
    Decode(#[from] disasm::DecodeError),

    /// Report serialization failed
    #[error("report serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_bounds() {
        assert_eq!(Register::new(10), Some(Register::R10));
        assert_eq!(Register::new(11), None);
        assert_eq!(Register::from_raw(13).number(), 13);
        assert!(!Register::from_raw(13).is_valid());
        assert!(Register::R10.is_frame_pointer());
        assert_eq!(Register::R3.to_string(), "r3");
    }

    #[test]
    fn test_load_imm_width() {
        assert_eq!(Instruction::load_imm(Register::R0, 0).encoded_width, 8);
        assert_eq!(Instruction::load_imm(Register::R0, -1).encoded_width, 8);
        assert_eq!(
            Instruction::load_imm(Register::R0, i32::MAX as i64).encoded_width,
            8
        );
        assert_eq!(
            Instruction::load_imm(Register::R0, i32::MAX as i64 + 1).encoded_width,
            16
        );
        assert_eq!(
            Instruction::load_imm(Register::R0, 0x1_2345_6789).encoded_width,
            16
        );
    }

    #[test]
    fn test_constructors_fill_operands() {
        let ld = Instruction::load(Opcode::LdxDw, Register::R1, Register::R10, -8);
        assert_eq!(ld.src, Some(Register::R10));
        assert_eq!(ld.offset, Some(-8));
        assert_eq!(ld.immediate, None);

        let st = Instruction::store(Opcode::StW, Register::R10, -4, 7);
        assert_eq!(st.offset, Some(-4));
        assert_eq!(st.immediate, Some(7));

        let jmp = Instruction::jump_if(Opcode::JeqImm, Register::R0, 1, 3);
        assert_eq!(jmp.offset, Some(3));
        assert_eq!(jmp.immediate, Some(1));

        assert_eq!(Instruction::exit().opcode, Opcode::Exit);
        assert_eq!(Instruction::call(42).immediate, Some(42));
    }

    #[test]
    fn test_comment_attaches() {
        let insn = Instruction::exit().with_comment("done");
        assert_eq!(insn.comment.as_deref(), Some("done"));
    }
}
