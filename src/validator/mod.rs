//! Static validation passes over an instruction sequence.
//!
//! `validate` never fails and never panics on malformed input: every problem
//! it finds becomes a severity-tagged [`SecurityIssue`] in the returned list,
//! in pass order. Callers compiling a program treat `Error`-severity issues
//! as fatal; `Warning` and `Info` are advisory.

use std::fmt;

use crate::Instruction;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational lint, never fatal
    Info,
    /// Suspicious but compilable
    Warning,
    /// Fatal to compilation
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Machine-readable issue tag. Tests and tooling key off these, not off
/// message text; the string form only appears at the display boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssuePattern {
    InvalidOpcode,
    MissingAluOperands,
    MissingLoadOperands,
    MissingStoreOperands,
    MissingJumpOperands,
    MissingImmediate,
    InvalidRegister,
    UninitializedRegisterRead,
    StackOverflow,
    StackUnderflow,
    LargeMemoryOffset,
    InvalidJumpTarget,
    UnreachableCode,
    MissingExit,
    ImmediateOverflow,
    IncompleteWideImmediate,
    PotentialOverflow,
    DivisionByZero,
    DivisionOperation,
    SensitiveSyscall,
    ComputeBudgetExceeded,
}

impl IssuePattern {
    /// The stable kebab-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            IssuePattern::InvalidOpcode => "invalid-opcode",
            IssuePattern::MissingAluOperands => "missing-alu-operands",
            IssuePattern::MissingLoadOperands => "missing-load-operands",
            IssuePattern::MissingStoreOperands => "missing-store-operands",
            IssuePattern::MissingJumpOperands => "missing-jump-operands",
            IssuePattern::MissingImmediate => "missing-immediate",
            IssuePattern::InvalidRegister => "invalid-register",
            IssuePattern::UninitializedRegisterRead => "uninitialized-register-read",
            IssuePattern::StackOverflow => "stack-overflow",
            IssuePattern::StackUnderflow => "stack-underflow",
            IssuePattern::LargeMemoryOffset => "large-memory-offset",
            IssuePattern::InvalidJumpTarget => "invalid-jump-target",
            IssuePattern::UnreachableCode => "unreachable-code",
            IssuePattern::MissingExit => "missing-exit",
            IssuePattern::ImmediateOverflow => "64bit-immediate-overflow",
            IssuePattern::IncompleteWideImmediate => "incomplete-64bit-immediate",
            IssuePattern::PotentialOverflow => "potential-overflow",
            IssuePattern::DivisionByZero => "division-by-zero",
            IssuePattern::DivisionOperation => "division-operation",
            IssuePattern::SensitiveSyscall => "sensitive-syscall",
            IssuePattern::ComputeBudgetExceeded => "compute-budget-exceeded",
        }
    }
}

impl fmt::Display for IssuePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finding from the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityIssue {
    pub severity: Severity,
    pub pattern: IssuePattern,
    pub message: String,
    /// Index into the validated instruction sequence, when the issue is
    /// attributable to a single instruction.
    pub instruction_index: Option<usize>,
}

impl SecurityIssue {
    pub fn error(pattern: IssuePattern, message: impl Into<String>, index: Option<usize>) -> Self {
        SecurityIssue {
            severity: Severity::Error,
            pattern,
            message: message.into(),
            instruction_index: index,
        }
    }

    pub fn warning(pattern: IssuePattern, message: impl Into<String>, index: Option<usize>) -> Self {
        SecurityIssue {
            severity: Severity::Warning,
            pattern,
            message: message.into(),
            instruction_index: index,
        }
    }

    pub fn info(pattern: IssuePattern, message: impl Into<String>, index: Option<usize>) -> Self {
        SecurityIssue {
            severity: Severity::Info,
            pattern,
            message: message.into(),
            instruction_index: index,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for SecurityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instruction_index {
            Some(i) => write!(f, "[{}] {} at #{}: {}", self.severity, self.pattern, i, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.pattern, self.message),
        }
    }
}

/// Validator tuning knobs.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Largest stack-relative access depth, in bytes, before `stack-overflow`.
    pub max_stack_depth: u32,
    /// Enable the wide-immediate pass.
    pub check_wide_immediates: bool,
    /// Enable the security-heuristic pass.
    pub security_heuristics: bool,
    /// Syscall numbers whose invocation is flagged `sensitive-syscall`.
    pub sensitive_syscalls: Vec<i64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            max_stack_depth: 64,
            check_wide_immediates: true,
            security_heuristics: true,
            sensitive_syscalls: Vec::new(),
        }
    }
}

/// Run every pass with the default configuration.
pub fn validate(instructions: &[Instruction]) -> Vec<SecurityIssue> {
    validate_with(instructions, &ValidatorConfig::default())
}

/// Run every pass. Passes are independent and additive; the issue list is
/// ordered by pass, then by instruction index within a pass.
pub fn validate_with(instructions: &[Instruction], config: &ValidatorConfig) -> Vec<SecurityIssue> {
    log::debug!("validating {} instructions", instructions.len());

    let mut issues = Vec::new();
    issues.extend(structural::run(instructions));
    issues.extend(registers::run(instructions));
    issues.extend(memory::run(instructions, config));
    issues.extend(control_flow::run(instructions));
    if config.check_wide_immediates {
        issues.extend(wide_imm::run(instructions));
    }
    if config.security_heuristics {
        issues.extend(security::run(instructions, config));
    }

    log::debug!(
        "validation complete: {} issues ({} fatal)",
        issues.len(),
        issues.iter().filter(|i| i.is_fatal()).count()
    );

    issues
}

/// Whether an issue list permits compilation to proceed.
pub fn passes(issues: &[SecurityIssue]) -> bool {
    !issues.iter().any(|i| i.is_fatal())
}

pub mod control_flow;
pub mod memory;
pub mod registers;
pub mod security;
pub mod structural;
pub mod wide_imm;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Opcode, Register};
    use rstest::rstest;

    #[test]
    fn test_clean_program_has_no_fatal_issues() {
        let program = vec![
            Instruction::load_imm(Register::R0, 0),
            Instruction::exit(),
        ];
        let issues = validate(&program);
        assert!(passes(&issues), "{issues:?}");
    }

    #[test]
    fn test_validator_is_deterministic() {
        let program = vec![
            Instruction::alu(Opcode::Div64Imm, Register::R1, 0),
            Instruction::load(Opcode::LdxDw, Register::R2, Register::R10, -128),
            Instruction::exit(),
            Instruction::alu(Opcode::Add64Imm, Register::R1, 5),
        ];
        let first = validate(&program);
        let second = validate(&program);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[rstest]
    #[case(vec![Instruction::alu(Opcode::Div64Imm, Register::R1, 0), Instruction::exit()], IssuePattern::DivisionByZero)]
    #[case(vec![Instruction::load_imm(Register::R0, 0)], IssuePattern::MissingExit)]
    #[case(vec![Instruction::exit(), Instruction::alu(Opcode::Add64Imm, Register::R1, 5)], IssuePattern::UnreachableCode)]
    #[case(vec![Instruction::jump(9), Instruction::exit()], IssuePattern::InvalidJumpTarget)]
    fn test_pattern_is_reported(
        #[case] program: Vec<Instruction>,
        #[case] expected: IssuePattern,
    ) {
        let issues = validate(&program);
        assert!(
            issues.iter().any(|i| i.pattern == expected),
            "expected {expected} in {issues:?}"
        );
    }

    #[test]
    fn test_issue_display_carries_tag_and_index() {
        let issue = SecurityIssue::error(IssuePattern::StackOverflow, "too deep", Some(3));
        let text = issue.to_string();
        assert!(text.contains("stack-overflow"));
        assert!(text.contains("#3"));
    }
}
