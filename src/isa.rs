//! The closed opcode enumeration and its structural classes.
//!
//! Discriminants are the actual encoding bytes: the low 3 bits select the
//! instruction class, bit 3 is the source-is-register flag for ALU and jump
//! forms, and the high nibble selects the operation. Anything outside this
//! table is an invalid opcode, not an unimplemented one.

use std::fmt;

/// Structural class of an opcode (low 3 bits of the encoding byte).
///
/// The class dictates which operands an instruction carries and how its
/// 8-byte slot is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionClass {
    /// Immediate load (only `lddw` in this ISA)
    Ld,
    /// Register-indirect load
    Ldx,
    /// Store with immediate source
    St,
    /// Store with register source
    Stx,
    /// 32-bit ALU
    Alu32,
    /// 64-bit jump
    Jmp,
    /// 32-bit jump
    Jmp32,
    /// 64-bit ALU
    Alu64,
}

impl InstructionClass {
    /// Derive the class from an opcode byte.
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0x00 => InstructionClass::Ld,
            0x01 => InstructionClass::Ldx,
            0x02 => InstructionClass::St,
            0x03 => InstructionClass::Stx,
            0x04 => InstructionClass::Alu32,
            0x05 => InstructionClass::Jmp,
            0x06 => InstructionClass::Jmp32,
            _ => InstructionClass::Alu64,
        }
    }
}

impl fmt::Display for InstructionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionClass::Ld => write!(f, "ld"),
            InstructionClass::Ldx => write!(f, "ldx"),
            InstructionClass::St => write!(f, "st"),
            InstructionClass::Stx => write!(f, "stx"),
            InstructionClass::Alu32 => write!(f, "alu32"),
            InstructionClass::Jmp => write!(f, "jmp"),
            InstructionClass::Jmp32 => write!(f, "jmp32"),
            InstructionClass::Alu64 => write!(f, "alu64"),
        }
    }
}

/// Every opcode this toolkit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Wide immediate load (the only two-slot instruction)
    Lddw = 0x18,

    // Register-indirect loads
    LdxW = 0x61,
    LdxH = 0x69,
    LdxB = 0x71,
    LdxDw = 0x79,

    // Stores, immediate source
    StW = 0x62,
    StH = 0x6a,
    StB = 0x72,
    StDw = 0x7a,

    // Stores, register source
    StxW = 0x63,
    StxH = 0x6b,
    StxB = 0x73,
    StxDw = 0x7b,

    // 32-bit ALU
    Add32Imm = 0x04,
    Add32Reg = 0x0c,
    Sub32Imm = 0x14,
    Sub32Reg = 0x1c,
    Mul32Imm = 0x24,
    Mul32Reg = 0x2c,
    Div32Imm = 0x34,
    Div32Reg = 0x3c,
    Or32Imm = 0x44,
    Or32Reg = 0x4c,
    And32Imm = 0x54,
    And32Reg = 0x5c,
    Lsh32Imm = 0x64,
    Lsh32Reg = 0x6c,
    Rsh32Imm = 0x74,
    Rsh32Reg = 0x7c,
    Neg32 = 0x84,
    Mod32Imm = 0x94,
    Mod32Reg = 0x9c,
    Xor32Imm = 0xa4,
    Xor32Reg = 0xac,
    Mov32Imm = 0xb4,
    Mov32Reg = 0xbc,
    Arsh32Imm = 0xc4,
    Arsh32Reg = 0xcc,

    // 64-bit ALU
    Add64Imm = 0x07,
    Add64Reg = 0x0f,
    Sub64Imm = 0x17,
    Sub64Reg = 0x1f,
    Mul64Imm = 0x27,
    Mul64Reg = 0x2f,
    Div64Imm = 0x37,
    Div64Reg = 0x3f,
    Or64Imm = 0x47,
    Or64Reg = 0x4f,
    And64Imm = 0x57,
    And64Reg = 0x5f,
    Lsh64Imm = 0x67,
    Lsh64Reg = 0x6f,
    Rsh64Imm = 0x77,
    Rsh64Reg = 0x7f,
    Neg64 = 0x87,
    Mod64Imm = 0x97,
    Mod64Reg = 0x9f,
    Xor64Imm = 0xa7,
    Xor64Reg = 0xaf,
    Mov64Imm = 0xb7,
    Mov64Reg = 0xbf,
    Arsh64Imm = 0xc7,
    Arsh64Reg = 0xcf,

    // 64-bit jumps
    Ja = 0x05,
    JeqImm = 0x15,
    JeqReg = 0x1d,
    JgtImm = 0x25,
    JgtReg = 0x2d,
    JgeImm = 0x35,
    JgeReg = 0x3d,
    JsetImm = 0x45,
    JsetReg = 0x4d,
    JneImm = 0x55,
    JneReg = 0x5d,
    JsgtImm = 0x65,
    JsgtReg = 0x6d,
    JsgeImm = 0x75,
    JsgeReg = 0x7d,
    Call = 0x85,
    Exit = 0x95,
    JltImm = 0xa5,
    JltReg = 0xad,
    JleImm = 0xb5,
    JleReg = 0xbd,
    JsltImm = 0xc5,
    JsltReg = 0xcd,
    JsleImm = 0xd5,
    JsleReg = 0xdd,

    // 32-bit jumps
    Jeq32Imm = 0x16,
    Jeq32Reg = 0x1e,
    Jgt32Imm = 0x26,
    Jgt32Reg = 0x2e,
    Jge32Imm = 0x36,
    Jge32Reg = 0x3e,
    Jset32Imm = 0x46,
    Jset32Reg = 0x4e,
    Jne32Imm = 0x56,
    Jne32Reg = 0x5e,
    Jsgt32Imm = 0x66,
    Jsgt32Reg = 0x6e,
    Jsge32Imm = 0x76,
    Jsge32Reg = 0x7e,
    Jlt32Imm = 0xa6,
    Jlt32Reg = 0xae,
    Jle32Imm = 0xb6,
    Jle32Reg = 0xbe,
    Jslt32Imm = 0xc6,
    Jslt32Reg = 0xce,
    Jsle32Imm = 0xd6,
    Jsle32Reg = 0xde,
}

use Opcode::*;

/// All valid opcodes, in encoding-byte order within each class group.
pub const ALL_OPCODES: [Opcode; 110] = [
    Lddw,
    LdxW, LdxH, LdxB, LdxDw,
    StW, StH, StB, StDw,
    StxW, StxH, StxB, StxDw,
    Add32Imm, Add32Reg, Sub32Imm, Sub32Reg, Mul32Imm, Mul32Reg, Div32Imm, Div32Reg,
    Or32Imm, Or32Reg, And32Imm, And32Reg, Lsh32Imm, Lsh32Reg, Rsh32Imm, Rsh32Reg,
    Neg32, Mod32Imm, Mod32Reg, Xor32Imm, Xor32Reg, Mov32Imm, Mov32Reg, Arsh32Imm, Arsh32Reg,
    Add64Imm, Add64Reg, Sub64Imm, Sub64Reg, Mul64Imm, Mul64Reg, Div64Imm, Div64Reg,
    Or64Imm, Or64Reg, And64Imm, And64Reg, Lsh64Imm, Lsh64Reg, Rsh64Imm, Rsh64Reg,
    Neg64, Mod64Imm, Mod64Reg, Xor64Imm, Xor64Reg, Mov64Imm, Mov64Reg, Arsh64Imm, Arsh64Reg,
    Ja, JeqImm, JeqReg, JgtImm, JgtReg, JgeImm, JgeReg, JsetImm, JsetReg,
    JneImm, JneReg, JsgtImm, JsgtReg, JsgeImm, JsgeReg, Call, Exit,
    JltImm, JltReg, JleImm, JleReg, JsltImm, JsltReg, JsleImm, JsleReg,
    Jeq32Imm, Jeq32Reg, Jgt32Imm, Jgt32Reg, Jge32Imm, Jge32Reg, Jset32Imm, Jset32Reg,
    Jne32Imm, Jne32Reg, Jsgt32Imm, Jsgt32Reg, Jsge32Imm, Jsge32Reg,
    Jlt32Imm, Jlt32Reg, Jle32Imm, Jle32Reg, Jslt32Imm, Jslt32Reg, Jsle32Imm, Jsle32Reg,
];

impl Opcode {
    /// The raw encoding byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up an opcode from its encoding byte. `None` for unknown bytes.
    pub fn from_code(code: u8) -> Option<Opcode> {
        ALL_OPCODES.iter().copied().find(|op| op.code() == code)
    }

    /// Structural class, derived from the low 3 bits.
    pub fn class(self) -> InstructionClass {
        InstructionClass::from_code(self.code())
    }

    /// True for ALU/jump forms whose second operand is a register (bit 3).
    pub fn is_source_register(self) -> bool {
        matches!(
            self.class(),
            InstructionClass::Alu32
                | InstructionClass::Alu64
                | InstructionClass::Jmp
                | InstructionClass::Jmp32
        ) && self.code() & 0x08 != 0
    }

    fn is_alu(self) -> bool {
        matches!(self.class(), InstructionClass::Alu32 | InstructionClass::Alu64)
    }

    /// 32- or 64-bit add, either operand form.
    pub fn is_add(self) -> bool {
        self.is_alu() && self.code() >> 4 == 0x0
    }

    /// 32- or 64-bit multiply, either operand form.
    pub fn is_mul(self) -> bool {
        self.is_alu() && self.code() >> 4 == 0x2
    }

    /// 32- or 64-bit divide or modulo, either operand form.
    pub fn is_div_or_mod(self) -> bool {
        self.is_alu() && matches!(self.code() >> 4, 0x3 | 0x9)
    }

    /// Register negation (`neg32`/`neg64`).
    pub fn is_neg(self) -> bool {
        matches!(self, Neg32 | Neg64)
    }

    /// Any instruction with a branch target: `ja` and all conditional jumps.
    pub fn is_jump(self) -> bool {
        matches!(self.class(), InstructionClass::Jmp | InstructionClass::Jmp32)
            && !matches!(self, Call | Exit)
    }

    /// A jump with a fall-through successor as well as a target.
    pub fn is_conditional_jump(self) -> bool {
        self.is_jump() && self != Ja
    }

    /// True when executing this instruction defines `dst`.
    pub fn writes_dst(self) -> bool {
        matches!(
            self.class(),
            InstructionClass::Ld | InstructionClass::Ldx | InstructionClass::Alu32 | InstructionClass::Alu64
        )
    }

    /// Canonical listing mnemonic (`lddw`, `add64`, `jeq32`, `exit`, ...).
    pub fn mnemonic(self) -> String {
        let code = self.code();
        match self.class() {
            InstructionClass::Ld => "lddw".to_string(),
            InstructionClass::Ldx => format!("ldx{}", size_suffix(code)),
            InstructionClass::St => format!("st{}", size_suffix(code)),
            InstructionClass::Stx => format!("stx{}", size_suffix(code)),
            InstructionClass::Alu32 => format!("{}32", alu_name(code)),
            InstructionClass::Alu64 => format!("{}64", alu_name(code)),
            InstructionClass::Jmp => jmp_name(code).to_string(),
            InstructionClass::Jmp32 => format!("{}32", jmp_name(code)),
        }
    }
}

fn size_suffix(code: u8) -> &'static str {
    match code & 0x18 {
        0x00 => "w",
        0x08 => "h",
        0x10 => "b",
        _ => "dw",
    }
}

fn alu_name(code: u8) -> &'static str {
    match code >> 4 {
        0x0 => "add",
        0x1 => "sub",
        0x2 => "mul",
        0x3 => "div",
        0x4 => "or",
        0x5 => "and",
        0x6 => "lsh",
        0x7 => "rsh",
        0x8 => "neg",
        0x9 => "mod",
        0xa => "xor",
        0xb => "mov",
        _ => "arsh",
    }
}

fn jmp_name(code: u8) -> &'static str {
    match code >> 4 {
        0x0 => "ja",
        0x1 => "jeq",
        0x2 => "jgt",
        0x3 => "jge",
        0x4 => "jset",
        0x5 => "jne",
        0x6 => "jsgt",
        0x7 => "jsge",
        0x8 => "call",
        0x9 => "exit",
        0xa => "jlt",
        0xb => "jle",
        0xc => "jslt",
        _ => "jsle",
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
