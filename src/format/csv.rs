//! CSV report formatter.

use crate::assembler::CompilationResult;
use crate::ForgeError;

use super::ReportFormatter;

impl ReportFormatter for super::CsvFormatter {
    fn format(&self, result: &CompilationResult, program: &str) -> Result<String, ForgeError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record([
                "program",
                "outcome",
                "severity",
                "pattern",
                "instruction_index",
                "message",
            ])
            .map_err(csv_error)?;

        let (outcome, issues) = match result {
            CompilationResult::Success { warnings, .. } => ("success", warnings),
            CompilationResult::Failure { errors } => ("failure", errors),
        };

        for issue in issues {
            let severity = issue.severity.to_string();
            let index = issue
                .instruction_index
                .map(|index| index.to_string())
                .unwrap_or_default();
            writer
                .write_record([
                    program,
                    outcome,
                    severity.as_str(),
                    issue.pattern.as_str(),
                    index.as_str(),
                    issue.message.as_str(),
                ])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ForgeError::Serialization(format!("CSV serialization error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ForgeError::Serialization(format!("CSV serialization error: {}", e)))
    }
}

fn csv_error(error: csv::Error) -> ForgeError {
    ForgeError::Serialization(format!("CSV serialization error: {}", error))
}
