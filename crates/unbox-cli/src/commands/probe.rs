//! Probe command implementation.

use anyhow::Result;
use tracing::debug;
use unbox_core::ExtractConfig;

use super::build_extractor;
use super::resolve_kind;
use crate::cli::ProbeArgs;
use crate::error::add_source_context;
use crate::output::OutputFormatter;

pub fn execute(args: &ProbeArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let kind = resolve_kind(&args.backend, &args.source)?;
    debug!(%kind, "probing");

    let extractor = build_extractor(&args.backend, ExtractConfig::default())?;
    let status = add_source_context(extractor.probe(kind, &args.source), &args.source)?;

    formatter.format_probe_result(&args.source, kind, status)
}
