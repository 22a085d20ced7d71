//! `wxr convert` and `wxr check`: read an export, run the core converter,
//! report.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use wxr_convert_core::{ConversionSummary, Converter};

use crate::config::Config;
use crate::export::JsonSink;

/// Read and convert one export file. Fatal document errors abort; every
/// other problem ends up in the converter's diagnostics.
pub fn load(config: &Config, input: &Path) -> Result<Converter> {
    let xml = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read export file: {}", input.display()))?;

    let mut converter = Converter::new(config.convert.clone())?;
    converter
        .convert_str(&xml)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    Ok(converter)
}

/// Convert `input` and write the JSON export. `output` overrides
/// `[output].path`; with neither set the JSON goes to stdout and the
/// summary to stderr.
pub fn run_convert(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let converter = load(config, input)?;
    let summary = converter.summary();

    if dry_run {
        let mut out = std::io::stdout();
        writeln!(out, "convert {} (dry-run)", input.display())?;
        print_summary(&mut out, &summary)?;
        return Ok(());
    }

    let mut sink = JsonSink::new();
    let emitted = converter.emit(&mut sink)?;
    tracing::debug!(emitted, "entities emitted");

    let output = output.or(config.output.path.as_deref());
    sink.write(output, config.output.pretty)?;

    let mut out: Box<dyn Write> = match output {
        Some(_) => Box::new(std::io::stdout()),
        None => Box::new(std::io::stderr()),
    };
    writeln!(out, "convert {}", input.display())?;
    print_summary(&mut out, &summary)?;
    writeln!(out, "ok")?;
    Ok(())
}

/// Convert `input` without writing anything and list every diagnostic.
pub fn run_check(config: &Config, input: &Path) -> Result<()> {
    let converter = load(config, input)?;
    let summary = converter.summary();

    let mut out = std::io::stdout();
    writeln!(out, "check {}", input.display())?;
    if let Some(site) = converter.site() {
        writeln!(out, "  site: {} ({})", site.item.title, site.item.link)?;
        writeln!(out, "  wxr version: {}", site.wxr_version)?;
    }
    print_summary(&mut out, &summary)?;

    if !converter.diagnostics().is_empty() {
        writeln!(out)?;
        writeln!(out, "{:<20} {:<24} MESSAGE", "KIND", "SUBJECT")?;
        for d in converter.diagnostics().iter() {
            writeln!(out, "{:<20} {:<24} {}", d.kind, d.subject, d.message)?;
        }
    }
    Ok(())
}

fn print_summary(out: &mut dyn Write, summary: &ConversionSummary) -> Result<()> {
    writeln!(out, "  pages: {}", summary.pages)?;
    writeln!(out, "  files: {}", summary.files)?;
    writeln!(out, "  authors: {}", summary.authors)?;
    writeln!(out, "  delegated: {}", summary.delegated)?;
    writeln!(out, "  discarded: {}", summary.discarded)?;
    writeln!(out, "  skipped: {}", summary.skipped)?;
    writeln!(out, "  diagnostics: {}", summary.diagnostics)?;
    for (kind, count) in &summary.diagnostics_by_kind {
        writeln!(out, "    {}: {}", kind, count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxr_convert_core::diagnostics::DiagnosticKind;

    #[test]
    fn summary_lists_counts_and_kinds() {
        let mut summary = ConversionSummary {
            pages: 3,
            files: 2,
            diagnostics: 1,
            ..Default::default()
        };
        summary
            .diagnostics_by_kind
            .insert(DiagnosticKind::UnresolvedAuthor, 1);

        let mut buf = Vec::new();
        print_summary(&mut buf, &summary).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("  pages: 3\n"));
        assert!(text.contains("  files: 2\n"));
        assert!(text.contains("    unresolved_author: 1\n"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = load(&Config::default(), Path::new("/nonexistent/export.xml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read export file"));
    }
}
