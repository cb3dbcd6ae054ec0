//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use unbox_core::ArchiveKind;
use unbox_core::ExtractionReport;
use unbox_core::ProtectionStatus;

pub struct JsonFormatter;

#[derive(Serialize)]
struct ExtractionOutput {
    kind: &'static str,
    output_dir: String,
    files_extracted: usize,
    directories_created: usize,
    pages_rendered: usize,
    bytes_written: u64,
    duration_ms: u128,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ProbeOutput {
    source: String,
    kind: &'static str,
    protected: Option<bool>,
    status: String,
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

fn extraction_output(output_dir: &Path, report: &ExtractionReport) -> ExtractionOutput {
    ExtractionOutput {
        kind: report.kind.as_str(),
        output_dir: output_dir.display().to_string(),
        files_extracted: report.files_extracted,
        directories_created: report.directories_created,
        pages_rendered: report.pages_rendered,
        bytes_written: report.bytes_written,
        duration_ms: report.duration.as_millis(),
        warnings: report.warnings.clone(),
    }
}

fn probe_output(source: &Path, kind: ArchiveKind, status: ProtectionStatus) -> ProbeOutput {
    ProbeOutput {
        source: source.display().to_string(),
        kind: kind.as_str(),
        protected: (status != ProtectionStatus::Indeterminate).then_some(status.is_protected()),
        status: status.to_string(),
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(
        &self,
        output_dir: &Path,
        report: &ExtractionReport,
    ) -> Result<()> {
        Self::output(&JsonOutput::success(
            "extract",
            extraction_output(output_dir, report),
        ))
    }

    fn format_probe_result(
        &self,
        source: &Path,
        kind: ArchiveKind,
        status: ProtectionStatus,
    ) -> Result<()> {
        Self::output(&JsonOutput::success("probe", probe_output(source, kind, status)))
    }

    fn format_error(&self, operation: &str, error: &anyhow::Error) {
        let output = JsonOutput::error(operation, format!("{error:#}"));
        let _ = Self::output(&output);
    }
}
