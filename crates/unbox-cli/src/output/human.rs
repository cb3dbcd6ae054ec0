//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use std::path::Path;
use unbox_core::ArchiveKind;
use unbox_core::ExtractionReport;
use unbox_core::ProtectionStatus;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn check_mark(&self) -> String {
        if self.use_colors {
            format!("{} ", style("✓").green().bold())
        } else {
            String::new()
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(
        &self,
        output_dir: &Path,
        report: &ExtractionReport,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let _ = self.term.write_line(&format!(
            "{}Extraction complete: {}",
            self.check_mark(),
            output_dir.display()
        ));

        if report.kind == ArchiveKind::PdfPages {
            let _ = self
                .term
                .write_line(&format!("  Pages rendered: {}", report.pages_rendered));
        } else {
            let _ = self
                .term
                .write_line(&format!("  Files extracted: {}", report.files_extracted));
            let _ = self
                .term
                .write_line(&format!("  Directories: {}", report.directories_created));
        }
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written)
        ));

        if self.verbose {
            let _ = self.term.write_line(&format!("  Kind: {}", report.kind));
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        for warning in &report.warnings {
            let _ = self.err_term.write_line(&format!("WARNING: {warning}"));
        }

        Ok(())
    }

    fn format_probe_result(
        &self,
        source: &Path,
        kind: ArchiveKind,
        status: ProtectionStatus,
    ) -> Result<()> {
        // Printed even in quiet mode.
        let status_str = if self.use_colors {
            match status {
                ProtectionStatus::Protected => style(status.to_string()).yellow().bold().to_string(),
                ProtectionStatus::Unprotected => style(status.to_string()).green().to_string(),
                ProtectionStatus::Indeterminate => style(status.to_string()).dim().to_string(),
            }
        } else {
            status.to_string()
        };

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("{} ({kind}): {status_str}", source.display()));
        } else {
            let _ = self.term.write_line(&status_str);
        }

        Ok(())
    }

    fn format_error(&self, _operation: &str, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(HumanFormatter::format_size(1024), "1.0 KB");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(HumanFormatter::format_size(1024 * 1024), "1.0 MB");
        assert_eq!(HumanFormatter::format_size(1536 * 1024), "1.5 MB");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(HumanFormatter::format_size(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(HumanFormatter::format_size(u64::MAX), "17179869184.0 GB");
    }
}
