//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;
use unbox_core::ArchiveKind;

#[derive(Parser)]
#[command(name = "unbox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tell whether a container needs a password
    Probe(ProbeArgs),
    /// Extract an archive, or render the pages of a pdf to JPEG files
    Extract(ExtractArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

impl Commands {
    /// Operation name used in JSON output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Probe(_) => "probe",
            Self::Extract(_) => "extract",
            Self::Completion(_) => "completion",
        }
    }
}

/// Options selecting the collaborators that do the decoding.
#[derive(clap::Args)]
pub struct BackendArgs {
    /// Container kind (zip, rar, 7z, pdf); detected from the file when omitted
    #[arg(short, long, value_parser = parse_kind)]
    pub kind: Option<ArchiveKind>,

    /// Use this 7z binary for 7z archives instead of the built-in decoder
    #[arg(long, value_name = "PATH")]
    pub seven_zip_binary: Option<PathBuf>,

    /// Directory or file of the pdfium library
    #[arg(long, value_name = "PATH", env = "PDFIUM_LIBRARY")]
    pub pdfium_library: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ProbeArgs {
    /// Path to the archive or pdf
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive or pdf
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Password of a protected container
    #[arg(short, long, conflicts_with = "password_env")]
    pub password: Option<String>,

    /// Read the password from this environment variable
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// JPEG quality of rendered pdf pages (1-100)
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Scale factor applied to pdf page sizes
    #[arg(long, default_value = "1.0", value_parser = parse_scale)]
    pub scale: f32,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_kind(s: &str) -> Result<ArchiveKind, String> {
    s.parse::<ArchiveKind>()
        .map_err(|_| format!("unknown kind '{s}' (expected zip, rar, 7z or pdf)"))
}

fn parse_scale(s: &str) -> Result<f32, String> {
    let scale: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid scale: {s}"))?;
    if scale.is_finite() && scale > 0.0 && scale <= unbox_core::config::MAX_RENDER_SCALE {
        Ok(scale)
    } else {
        Err(format!(
            "scale must be greater than 0 and at most {}",
            unbox_core::config::MAX_RENDER_SCALE
        ))
    }
}
