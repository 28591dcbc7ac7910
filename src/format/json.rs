//! JSON and JSON Lines report formatters.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::assembler::CompilationResult;
use crate::validator::SecurityIssue;
use crate::ForgeError;

use super::ReportFormatter;

/// Serializable issue for JSON output.
#[derive(Serialize, Deserialize)]
struct IssueJson {
    severity: String,
    pattern: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruction_index: Option<usize>,
}

/// Serializable compilation report for JSON output.
#[derive(Serialize, Deserialize)]
struct ReportJson {
    program: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    compute_units: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytecode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    listing: Option<String>,
    issues: Vec<IssueJson>,
}

impl ReportFormatter for super::JsonFormatter {
    fn format(&self, result: &CompilationResult, program: &str) -> Result<String, ForgeError> {
        let report = match result {
            CompilationResult::Success {
                bytecode,
                assembly_listing,
                warnings,
                compute_units,
            } => ReportJson {
                program: program.to_string(),
                success: true,
                compute_units: Some(*compute_units),
                bytecode: Some(hex_string(bytecode)),
                listing: Some(assembly_listing.clone()),
                issues: warnings.iter().map(issue_to_json).collect(),
            },
            CompilationResult::Failure { errors } => ReportJson {
                program: program.to_string(),
                success: false,
                compute_units: None,
                bytecode: None,
                listing: None,
                issues: errors.iter().map(issue_to_json).collect(),
            },
        };

        serde_json::to_string_pretty(&report)
            .map_err(|e| ForgeError::Serialization(format!("JSON serialization error: {}", e)))
    }
}

impl ReportFormatter for super::JsonLinesFormatter {
    fn format(&self, result: &CompilationResult, program: &str) -> Result<String, ForgeError> {
        let mut output = String::new();

        let (success, issues): (bool, &[SecurityIssue]) = match result {
            CompilationResult::Success { warnings, .. } => (true, warnings),
            CompilationResult::Failure { errors } => (false, errors),
        };

        let header = json!({
            "type": "report",
            "program": program,
            "success": success,
        });
        push_line(&mut output, &header)?;

        for issue in issues {
            let line = json!({
                "type": "issue",
                "program": program,
                "severity": issue.severity.to_string(),
                "pattern": issue.pattern.as_str(),
                "message": issue.message,
                "instruction_index": issue.instruction_index,
            });
            push_line(&mut output, &line)?;
        }

        Ok(output)
    }
}

fn push_line(output: &mut String, value: &serde_json::Value) -> Result<(), ForgeError> {
    let line = serde_json::to_string(value)
        .map_err(|e| ForgeError::Serialization(format!("JSON serialization error: {}", e)))?;
    output.push_str(&line);
    output.push('\n');
    Ok(())
}

/// Convert an issue to its JSON mirror.
fn issue_to_json(issue: &SecurityIssue) -> IssueJson {
    IssueJson {
        severity: issue.severity.to_string(),
        pattern: issue.pattern.as_str().to_string(),
        message: issue.message.clone(),
        instruction_index: issue.instruction_index,
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}
