//! Output formats for compilation reports.

mod csv;
mod json;

pub use self::csv::*;
pub use self::json::*;

use std::fmt;
use std::str::FromStr;

use crate::assembler::CompilationResult;
use crate::ForgeError;

/// Supported report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON format (hierarchical)
    Json,
    /// JSON Lines format (one JSON object per line)
    JsonLines,
    /// CSV format (one row per issue)
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Get all available output formats.
    pub fn available_formats() -> &'static [Self] {
        &[
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::JsonLines,
            OutputFormat::Csv,
        ]
    }

    /// Get a formatter for this output format.
    pub fn get_formatter(&self) -> Box<dyn ReportFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

/// Formatter trait for compilation reports.
pub trait ReportFormatter {
    /// Render a compilation result for the named program.
    fn format(&self, result: &CompilationResult, program: &str) -> Result<String, ForgeError>;
}

/// Render a report in plain text.
pub struct TextFormatter;

/// Render a report in JSON.
pub struct JsonFormatter;

/// Render a report in JSON Lines.
pub struct JsonLinesFormatter;

/// Render a report in CSV.
pub struct CsvFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, result: &CompilationResult, program: &str) -> Result<String, ForgeError> {
        let mut output = String::new();

        match result {
            CompilationResult::Success {
                bytecode,
                assembly_listing,
                warnings,
                compute_units,
            } => {
                output.push_str(&format!("compilation of '{program}': success\n"));
                output.push_str(&format!("  bytecode: {} bytes\n", bytecode.len()));
                output.push_str(&format!("  estimated compute units: {compute_units}\n"));

                if warnings.is_empty() {
                    output.push_str("  no advisories\n");
                } else {
                    output.push_str(&format!("  {} advisories:\n", warnings.len()));
                    for issue in warnings {
                        output.push_str(&format!("    {issue}\n"));
                    }
                }

                output.push('\n');
                output.push_str(assembly_listing);
            }
            CompilationResult::Failure { errors } => {
                output.push_str(&format!("compilation of '{program}': failed\n"));
                for issue in errors {
                    output.push_str(&format!("  {issue}\n"));
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assembler::{assemble, ProgramMetadata};
    use crate::{Instruction, Opcode, Register};

    pub(crate) fn sample_success() -> CompilationResult {
        let program = vec![
            Instruction::load_imm(Register::R0, 1).with_comment("status"),
            Instruction::alu(Opcode::Add64Imm, Register::R0, 2),
            Instruction::exit(),
        ];
        assemble(&program, &ProgramMetadata::new("sample", "entrypoint"))
    }

    pub(crate) fn sample_failure() -> CompilationResult {
        let program = vec![Instruction::alu(Opcode::Div64Imm, Register::R1, 0)];
        assemble(&program, &ProgramMetadata::new("sample", "entrypoint"))
    }

    #[test]
    fn test_text_formatter_success() {
        let report = TextFormatter.format(&sample_success(), "sample").unwrap();
        assert!(report.contains("'sample': success"));
        assert!(report.contains("bytecode: 24 bytes"));
        assert!(report.contains("potential-overflow"));
        assert!(report.contains("0000: lddw r0, 1 ; status"));
    }

    #[test]
    fn test_text_formatter_failure() {
        let report = TextFormatter.format(&sample_failure(), "sample").unwrap();
        assert!(report.contains("'sample': failed"));
        assert!(report.contains("division-by-zero"));
        assert!(report.contains("missing-exit"));
    }

    #[test]
    fn test_format_selection() {
        for format in OutputFormat::available_formats() {
            let formatter = format.get_formatter();
            assert!(formatter.format(&sample_success(), "sample").is_ok());
        }
    }

    #[test]
    fn test_format_names_round_trip() {
        for format in OutputFormat::available_formats() {
            assert_eq!(format.to_string().parse::<OutputFormat>(), Ok(*format));
        }
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
