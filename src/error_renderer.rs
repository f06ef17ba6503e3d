//! Error rendering using ariadne
//!
//! Expressions reach the engine as trees, so the source text is optional.
//! When the host has it, diagnostics are rendered as annotated snippets;
//! otherwise they fall back to a single line plus any help text.

use crate::{Diagnostic, Error};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;
use std::ops::Range;

const SOURCE_ID: &str = "<expr>";

/// Render an error to stderr.
///
/// # Example
/// ```no_run
/// use sift::{Bump, Engine, EngineOptions, Expr, render_error};
///
/// let arena = Bump::new();
/// let engine = Engine::new(&arena, EngineOptions::default(), |_, _| {});
///
/// if let Err(e) = engine.compile(&Expr::ident("missing", 0), &[]) {
///     render_error(&e, Some("missing"));
/// }
/// ```
pub fn render_error(error: &Error, source: Option<&str>) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer.
pub fn render_error_to(
    error: &Error,
    source: Option<&str>,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String (useful for logs and web UIs).
pub fn render_error_to_string(error: &Error, source: Option<&str>) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Same as [`render_error_to_string`] without ANSI color codes.
pub fn render_error_to_string_no_color(error: &Error, source: Option<&str>) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: Option<&str>,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation(diagnostic) | Error::Runtime(diagnostic) => match source {
            Some(source) => render_snippet(source, diagnostic, writer, use_color),
            None => render_plain(diagnostic, writer),
        },
        Error::Api(msg) => writeln!(writer, "API error: {}", msg),
        Error::Host(err) => writeln!(writer, "{}", err),
    }
}

fn render_plain(diag: &Diagnostic, writer: &mut dyn Write) -> std::io::Result<()> {
    writeln!(writer, "error[{}]: {}", diag.code, diag)?;
    if let Some(help) = &diag.help {
        writeln!(writer, "  help: {}", help)?;
    }
    Ok(())
}

fn render_snippet(
    source: &str,
    diag: &Diagnostic,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let span = label_range(source, &diag.span.0);
    let mut report = Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
        .with_message(&diag.message)
        .with_code(diag.code)
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new((SOURCE_ID, span))
                .with_message(&diag.message)
                .with_color(colors.next()),
        );

    for help_msg in &diag.help {
        report = report.with_help(help_msg);
    }

    report
        .finish()
        .write((SOURCE_ID, Source::from(source)), &mut *writer)
}

/// Clamp `range` to `source` and widen empty ranges to the character at
/// their start, so zero-width node positions still get an underline.
fn label_range(source: &str, range: &Range<usize>) -> Range<usize> {
    let start = range.start.min(source.len());
    let end = range.end.clamp(start, source.len());
    if start < end {
        return start..end;
    }
    let width = source
        .get(start..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8);
    start..start + width
}
