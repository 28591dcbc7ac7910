//! Validation, optimization, encoding, and listing in one entry point.
//!
//! `assemble` is the compilation front door: it runs the validator (any
//! `Error`-severity issue aborts), the optimizer, and then encodes each
//! instruction into its fixed 8-byte slot layout. The result is always a
//! [`CompilationResult`] value; nothing in here throws for malformed input.

use crate::optimizer::optimize;
use crate::validator::{validate_with, IssuePattern, SecurityIssue, ValidatorConfig};
use crate::{Instruction, InstructionClass, Opcode};

/// A named region in the program's declared memory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: String,
    pub start: u64,
    pub length: u64,
}

/// Program-level metadata supplied by the caller.
#[derive(Debug, Clone)]
pub struct ProgramMetadata {
    pub name: String,
    pub version: String,
    pub targets: Vec<String>,
    pub entry_point: String,
    /// Declared compute-unit budget; 0 means undeclared.
    pub compute_budget: u64,
    pub memory_layout: Vec<MemoryRegion>,
}

impl ProgramMetadata {
    pub fn new(name: impl Into<String>, entry_point: impl Into<String>) -> Self {
        ProgramMetadata {
            name: name.into(),
            version: "0.1.0".to_string(),
            targets: Vec::new(),
            entry_point: entry_point.into(),
            compute_budget: 0,
            memory_layout: Vec::new(),
        }
    }
}

/// Knobs for a single compilation.
#[derive(Debug, Clone, Default)]
pub struct AssemblerOptions {
    pub validator: ValidatorConfig,
    /// Skip the optimizer entirely; listings then match the input 1:1.
    pub skip_optimization: bool,
}

/// Outcome of a compilation. Success carries the encoded stream plus
/// advisory issues; failure carries every fatal issue the validator found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationResult {
    Success {
        bytecode: Vec<u8>,
        assembly_listing: String,
        warnings: Vec<SecurityIssue>,
        compute_units: u64,
    },
    Failure {
        errors: Vec<SecurityIssue>,
    },
}

impl CompilationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CompilationResult::Success { .. })
    }

    /// Fatal issues rendered as strings, empty on success.
    pub fn error_strings(&self) -> Vec<String> {
        match self {
            CompilationResult::Success { .. } => Vec::new(),
            CompilationResult::Failure { errors } => {
                errors.iter().map(|issue| issue.to_string()).collect()
            }
        }
    }
}

/// Compile with default options.
pub fn assemble(instructions: &[Instruction], metadata: &ProgramMetadata) -> CompilationResult {
    assemble_with(instructions, metadata, &AssemblerOptions::default())
}

/// Compile: validate, optimize, encode, render the listing, estimate cost.
///
/// Empty metadata is a caller contract violation, not a data error.
pub fn assemble_with(
    instructions: &[Instruction],
    metadata: &ProgramMetadata,
    options: &AssemblerOptions,
) -> CompilationResult {
    assert!(!metadata.name.is_empty(), "program metadata needs a name");
    assert!(
        !metadata.entry_point.is_empty(),
        "program metadata needs an entry point symbol"
    );

    log::debug!(
        "assembling '{}': {} instructions",
        metadata.name,
        instructions.len()
    );

    let issues = validate_with(instructions, &options.validator);
    let (errors, mut warnings): (Vec<_>, Vec<_>) =
        issues.into_iter().partition(|issue| issue.is_fatal());
    if !errors.is_empty() {
        log::debug!("assembly of '{}' aborted: {} errors", metadata.name, errors.len());
        return CompilationResult::Failure { errors };
    }

    let optimized = if options.skip_optimization {
        instructions.to_vec()
    } else {
        optimize(instructions)
    };

    let bytecode = encode(&optimized);
    let assembly_listing = render_listing(&optimized);
    let compute_units = estimate_compute_units(&optimized);

    if metadata.compute_budget > 0 && compute_units > metadata.compute_budget {
        warnings.push(SecurityIssue::warning(
            IssuePattern::ComputeBudgetExceeded,
            format!(
                "estimated {} compute units exceeds the declared budget of {}",
                compute_units, metadata.compute_budget
            ),
            None,
        ));
    }

    CompilationResult::Success {
        bytecode,
        assembly_listing,
        warnings,
        compute_units,
    }
}

/// Encode a sequence into the flat 8-byte-slot stream.
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
    let capacity = instructions
        .iter()
        .map(|insn| insn.encoded_width as usize)
        .sum();
    let mut bytecode = Vec::with_capacity(capacity);
    for insn in instructions {
        encode_into(insn, &mut bytecode);
    }
    bytecode
}

fn encode_into(insn: &Instruction, out: &mut Vec<u8>) {
    let dst = insn.dst.number() & 0x0f;
    let src = insn.src.map(|r| r.number() & 0x0f).unwrap_or(0);
    let offset = insn.offset.unwrap_or(0);
    let immediate = insn.immediate.unwrap_or(0);

    out.push(insn.opcode.code());
    out.push(dst | (src << 4));
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&(immediate as u32).to_le_bytes());

    if insn.is_wide() {
        // second slot: format fields zero, upper immediate half in the
        // immediate position
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&(((immediate as u64) >> 32) as u32).to_le_bytes());
    }
}

/// Render the human-readable listing with zero-padded 4-digit line indices
/// matching the post-optimization instruction order.
pub fn render_listing(instructions: &[Instruction]) -> String {
    let mut listing = String::new();
    for (index, insn) in instructions.iter().enumerate() {
        listing.push_str(&format!("{index:04}: {}", render_operands(insn)));
        if let Some(comment) = &insn.comment {
            listing.push_str(&format!(" ; {comment}"));
        }
        listing.push('\n');
    }
    listing
}

/// Canonical text for one instruction, mnemonic included.
pub(crate) fn render_operands(insn: &Instruction) -> String {
    let mnemonic = insn.opcode.mnemonic();
    let dst = insn.dst;
    let offset = insn.offset.unwrap_or(0);
    let immediate = insn.immediate.unwrap_or(0);

    match insn.class() {
        InstructionClass::Ld => format!("{mnemonic} {dst}, {immediate}"),
        InstructionClass::Ldx => {
            let src = insn.src.unwrap_or(crate::Register::R0);
            format!("{mnemonic} {dst}, [{src}{}]", signed(offset))
        }
        InstructionClass::St => {
            format!("{mnemonic} [{dst}{}], {immediate}", signed(offset))
        }
        InstructionClass::Stx => {
            let src = insn.src.unwrap_or(crate::Register::R0);
            format!("{mnemonic} [{dst}{}], {src}", signed(offset))
        }
        InstructionClass::Alu32 | InstructionClass::Alu64 => {
            if insn.opcode.is_neg() {
                format!("{mnemonic} {dst}")
            } else if let Some(src) = insn.src {
                format!("{mnemonic} {dst}, {src}")
            } else {
                format!("{mnemonic} {dst}, {immediate}")
            }
        }
        InstructionClass::Jmp | InstructionClass::Jmp32 => match insn.opcode {
            Opcode::Exit => mnemonic,
            Opcode::Call => format!("{mnemonic} {immediate}"),
            Opcode::Ja => format!("{mnemonic} {}", signed(offset)),
            _ => {
                if let Some(src) = insn.src {
                    format!("{mnemonic} {dst}, {src}, {}", signed(offset))
                } else {
                    format!("{mnemonic} {dst}, {immediate}, {}", signed(offset))
                }
            }
        },
    }
}

fn signed(value: i16) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// Fixed per-class cost model, summed over the final sequence. The values
/// are part of the contract: cross-implementation comparisons depend on
/// reproducing them exactly.
pub fn estimate_compute_units(instructions: &[Instruction]) -> u64 {
    instructions
        .iter()
        .map(|insn| {
            let base = match insn.class() {
                InstructionClass::Ld => 1,
                InstructionClass::Ldx => 3,
                InstructionClass::St | InstructionClass::Stx => 2,
                InstructionClass::Alu32 => 1,
                InstructionClass::Alu64 => 2,
                InstructionClass::Jmp | InstructionClass::Jmp32 => match insn.opcode {
                    Opcode::Exit => 1,
                    Opcode::Call => 100,
                    _ => 2,
                },
            };
            let divisor_surcharge = if insn.opcode.is_div_or_mod() { 10 } else { 0 };
            base + divisor_surcharge
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Register;

    fn metadata() -> ProgramMetadata {
        ProgramMetadata::new("test-program", "entrypoint")
    }

    #[test]
    fn test_minimal_program_assembles() {
        let program = vec![
            Instruction::load_imm(Register::R0, 0),
            Instruction::exit(),
        ];
        match assemble(&program, &metadata()) {
            CompilationResult::Success {
                bytecode,
                assembly_listing,
                ..
            } => {
                assert_eq!(bytecode.len(), 16);
                assert!(assembly_listing.contains("lddw"));
                assert!(assembly_listing.contains("exit"));
            }
            CompilationResult::Failure { errors } => panic!("{errors:?}"),
        }
    }

    #[test]
    fn test_fatal_issues_abort_compilation() {
        let program = vec![
            Instruction::alu(Opcode::Div64Imm, Register::R1, 0),
            Instruction::exit(),
        ];
        let result = assemble(&program, &metadata());
        assert!(!result.is_success());
        let errors = result.error_strings();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("division-by-zero"));
    }

    #[test]
    fn test_missing_exit_fails() {
        let program = vec![Instruction::load_imm(Register::R0, 0)];
        match assemble(&program, &metadata()) {
            CompilationResult::Failure { errors } => {
                assert!(errors
                    .iter()
                    .any(|issue| issue.pattern == IssuePattern::MissingExit));
            }
            CompilationResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_advisory_issues_ride_along_on_success() {
        let program = vec![
            Instruction::load_imm(Register::R1, 2),
            Instruction::alu(Opcode::Add64Imm, Register::R1, 5),
            Instruction::exit(),
        ];
        match assemble(&program, &metadata()) {
            CompilationResult::Success { warnings, .. } => {
                assert!(warnings
                    .iter()
                    .any(|issue| issue.pattern == IssuePattern::PotentialOverflow));
            }
            CompilationResult::Failure { errors } => panic!("{errors:?}"),
        }
    }

    #[test]
    fn test_slot_layout() {
        let program = vec![Instruction::load(Opcode::LdxDw, Register::R3, Register::R10, -8)];
        let bytecode = encode(&program);
        assert_eq!(bytecode.len(), 8);
        assert_eq!(bytecode[0], 0x79);
        assert_eq!(bytecode[1], 0x03 | (0x0a << 4));
        assert_eq!(&bytecode[2..4], &(-8i16).to_le_bytes());
        assert_eq!(&bytecode[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_wide_load_spans_two_slots() {
        let insn = Instruction::load_imm(Register::R2, 0x1122_3344_5566_7788);
        let bytecode = encode(&[insn]);
        assert_eq!(bytecode.len(), 16);
        assert_eq!(bytecode[0], 0x18);
        assert_eq!(bytecode[1], 0x02);
        assert_eq!(&bytecode[4..8], &0x5566_7788u32.to_le_bytes());
        assert_eq!(&bytecode[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytecode[12..16], &0x1122_3344u32.to_le_bytes());
    }

    #[test]
    fn test_encoded_length_matches_widths() {
        let program = vec![
            Instruction::load_imm(Register::R0, 0x1_0000_0000), // wide
            Instruction::alu(Opcode::Add64Imm, Register::R0, 1),
            Instruction::exit(),
        ];
        let wide = program.iter().filter(|insn| insn.is_wide()).count();
        let narrow = program.len() - wide;
        assert_eq!(encode(&program).len(), 8 * narrow + 16 * wide);
    }

    #[test]
    fn test_register_form_sets_source_flag_bit() {
        let imm = encode(&[Instruction::alu(Opcode::Add64Imm, Register::R1, 1)]);
        let reg = encode(&[Instruction::alu_reg(Opcode::Add64Reg, Register::R1, Register::R2)]);
        assert_eq!(imm[0] & 0x08, 0);
        assert_eq!(reg[0] & 0x08, 0x08);
        assert_eq!(reg[0] & !0x08, imm[0]);
    }

    #[test]
    fn test_listing_indices_follow_optimization() {
        let program = vec![
            Instruction::load_imm(Register::R0, 1).with_comment("result code"),
            Instruction::alu(Opcode::Add64Imm, Register::R0, 0), // optimized away
            Instruction::exit(),
        ];
        match assemble(&program, &metadata()) {
            CompilationResult::Success {
                assembly_listing, ..
            } => {
                assert!(assembly_listing.contains("0000: lddw r0, 1 ; result code"));
                assert!(assembly_listing.contains("0001: exit"));
                assert!(!assembly_listing.contains("add64"));
            }
            CompilationResult::Failure { errors } => panic!("{errors:?}"),
        }
    }

    #[test]
    fn test_operand_rendering_per_class() {
        let store = Instruction::store_reg(Opcode::StxW, Register::R10, -4, Register::R1);
        assert_eq!(render_operands(&store), "stxw [r10-4], r1");

        let load = Instruction::load(Opcode::LdxB, Register::R2, Register::R1, 12);
        assert_eq!(render_operands(&load), "ldxb r2, [r1+12]");

        let branch = Instruction::jump_if_reg(Opcode::Jne32Reg, Register::R2, Register::R3, -2);
        assert_eq!(render_operands(&branch), "jne32 r2, r3, -2");

        assert_eq!(render_operands(&Instruction::call(11)), "call 11");
        assert_eq!(render_operands(&Instruction::jump(4)), "ja +4");
        assert_eq!(
            render_operands(&Instruction::alu_unary(Opcode::Neg32, Register::R5)),
            "neg32 r5"
        );
    }

    #[test]
    fn test_compute_unit_model() {
        let program = vec![
            Instruction::load_imm(Register::R0, 0),                              // 1
            Instruction::load(Opcode::LdxDw, Register::R1, Register::R10, -8),   // 3
            Instruction::store(Opcode::StW, Register::R10, -4, 1),               // 2
            Instruction::alu(Opcode::Add32Imm, Register::R0, 1),                 // 1
            Instruction::alu(Opcode::Div64Imm, Register::R0, 2),                 // 2 + 10
            Instruction::jump(0),                                                // 2
            Instruction::call(1),                                                // 100
            Instruction::exit(),                                                 // 1
        ];
        assert_eq!(estimate_compute_units(&program), 122);
    }

    #[test]
    fn test_compute_budget_warning() {
        let mut meta = metadata();
        meta.compute_budget = 1;
        let program = vec![
            Instruction::load_imm(Register::R0, 0),
            Instruction::exit(),
        ];
        match assemble(&program, &meta) {
            CompilationResult::Success { warnings, compute_units, .. } => {
                assert_eq!(compute_units, 2);
                assert!(warnings
                    .iter()
                    .any(|issue| issue.pattern == IssuePattern::ComputeBudgetExceeded));
            }
            CompilationResult::Failure { errors } => panic!("{errors:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "needs a name")]
    fn test_empty_metadata_is_a_contract_violation() {
        let meta = ProgramMetadata::new("", "entrypoint");
        let _ = assemble(&[Instruction::exit()], &meta);
    }
}
