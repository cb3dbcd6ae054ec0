//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_source_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use std::env;
use unbox_core::Credential;
use unbox_core::ExtractConfig;
use unbox_core::ExtractionRequest;
use unbox_core::NoopProgress;

use super::build_extractor;
use super::resolve_kind;

fn credential(args: &ExtractArgs) -> Result<Option<Credential>> {
    if let Some(password) = &args.password {
        return Ok(Some(Credential::new(password.clone())));
    }
    match &args.password_env {
        Some(var) => {
            let password = env::var(var)
                .with_context(|| format!("password variable '{var}' is not set"))?;
            Ok(Some(Credential::new(password)))
        }
        None => Ok(None),
    }
}

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, silent: bool) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let kind = resolve_kind(&args.backend, &args.source)?;
    let config = ExtractConfig::default()
        .with_jpeg_quality(args.quality)
        .with_render_scale(args.scale);
    let extractor = build_extractor(&args.backend, config)?;

    let request = ExtractionRequest::new(kind, &args.source, &output_dir)
        .with_optional_credential(credential(args)?);

    let report = if !silent && CliProgress::should_show() {
        let mut progress = CliProgress::new(kind);
        add_source_context(
            extractor.extract_with_progress(&request, &mut progress),
            &args.source,
        )?
    } else {
        add_source_context(
            extractor.extract_with_progress(&request, &mut NoopProgress),
            &args.source,
        )?
    };

    formatter.format_extraction_result(&output_dir, &report)?;

    Ok(())
}
