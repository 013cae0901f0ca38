//! Ariadne-based rendering of transformation errors.
//!
//! Human-readable reports are colorless for stable test output. The JSON
//! form carries the same code, message and span for tooling.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;
use weave_common::{LineIndex, Position};

use crate::error::{TransformErrorKind, TransformationError};

// ── Error Codes ────────────────────────────────────────────────────────

fn error_code(err: &TransformationError) -> &'static str {
    match err.kind {
        TransformErrorKind::UnknownNamespace { .. } => "X0001",
        TransformErrorKind::UnresolvedType { .. } => "X0002",
        TransformErrorKind::UnresolvedProperty { .. } => "X0003",
        TransformErrorKind::InvalidAssignmentTarget { .. } => "X0004",
        TransformErrorKind::PropertyOutsideObject { .. } => "X0005",
        TransformErrorKind::NoConstructor { .. } => "X0006",
        TransformErrorKind::MissingProvideValue { .. } => "X0007",
        TransformErrorKind::AmbiguousMarkupExtension { .. } => "X0008",
        TransformErrorKind::NoMatchingSetter { .. } => "X0009",
        TransformErrorKind::MissingSlot { .. } => "X0010",
        TransformErrorKind::EmptyDocument => "X0011",
        TransformErrorKind::TypeSystem { .. } => "X0012",
    }
}

fn label_message(err: &TransformationError) -> String {
    match &err.kind {
        TransformErrorKind::UnknownNamespace { .. } => "namespace has no CLR mapping".to_string(),
        TransformErrorKind::UnresolvedType { name, .. } => format!("no type named {}", name),
        TransformErrorKind::UnresolvedProperty { property, .. } => format!("unknown property {}", property),
        TransformErrorKind::InvalidAssignmentTarget { .. } => "cannot be assigned".to_string(),
        TransformErrorKind::PropertyOutsideObject { .. } => "no enclosing object".to_string(),
        TransformErrorKind::NoConstructor { .. } => "constructed here".to_string(),
        TransformErrorKind::MissingProvideValue { .. } | TransformErrorKind::AmbiguousMarkupExtension { .. } => {
            "used as a markup extension here".to_string()
        }
        TransformErrorKind::NoMatchingSetter { .. } => "assigned here".to_string(),
        TransformErrorKind::MissingSlot { .. } | TransformErrorKind::EmptyDocument => "here".to_string(),
        TransformErrorKind::TypeSystem { .. } => "while resolving this".to_string(),
    }
}

fn help(err: &TransformationError) -> Option<&'static str> {
    match err.kind {
        TransformErrorKind::UnknownNamespace { .. } => {
            Some("register an alias for this namespace or use a clr-namespace: URI")
        }
        TransformErrorKind::NoConstructor { .. } => Some("add a public constructor taking these arguments"),
        TransformErrorKind::AmbiguousMarkupExtension { .. } => {
            Some("declare a single ProvideValue overload on the extension type")
        }
        TransformErrorKind::MissingSlot { .. } => Some("reorder the pipeline so the producing pass runs first"),
        _ => None,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render a transformation error against its markup source.
/// Labels and the report header point into `filename`.
pub fn render_diagnostic(error: &TransformationError, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span = (filename.to_string(), clamp(error.span.to_range()));

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label_message(error))
                .with_color(Color::Red),
        );
    if let Some(help) = help(error) {
        builder = builder.with_help(help);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    let _ = report.write((filename.to_string(), Source::from(source)), &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

// ── JSON ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticSummary {
    pub code: &'static str,
    pub severity: &'static str,
    pub message: String,
    pub file: String,
    pub start: Position,
    pub end: Position,
}

impl DiagnosticSummary {
    pub fn new(error: &TransformationError, index: &LineIndex, filename: &str) -> Self {
        Self {
            code: error_code(error),
            severity: "error",
            message: error.to_string(),
            file: filename.to_string(),
            start: index.position(error.span.start),
            end: index.position(error.span.end),
        }
    }
}

/// One JSON object per line, in input order.
pub fn diagnostics_to_json(errors: &[TransformationError], source: &str, filename: &str) -> String {
    let index = LineIndex::new(source);
    errors
        .iter()
        .map(|e| DiagnosticSummary::new(e, &index, filename))
        .filter_map(|d| serde_json::to_string(&d).ok())
        .map(|line| line + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_common::Span;

    fn unresolved(span: Span) -> TransformationError {
        TransformationError::new(
            TransformErrorKind::UnresolvedType {
                xml_namespace: "urn:ui".into(),
                name: "Buton".into(),
            },
            span,
        )
    }

    #[test]
    fn report_carries_code_message_and_label() {
        let src = "<Buton Content=\"Hi\"/>";
        let output = render_diagnostic(&unresolved(Span::new(1, 6)), src, "page.xml");
        assert!(output.contains("X0002"), "missing code:\n{}", output);
        assert!(output.contains("unable to resolve type Buton"), "missing message:\n{}", output);
        assert!(output.contains("no type named Buton"), "missing label:\n{}", output);
    }

    #[test]
    fn out_of_range_spans_are_clamped() {
        let src = "<A/>";
        let output = render_diagnostic(&unresolved(Span::new(40, 50)), src, "page.xml");
        assert!(output.contains("X0002"));
    }

    #[test]
    fn report_header_names_the_file() {
        let src = "<Root>\n  <Buton/>\n</Root>";
        let output = render_diagnostic(&unresolved(Span::new(10, 15)), src, "views/page.xml");
        assert!(output.contains("views/page.xml"), "missing file name:\n{}", output);
    }

    #[test]
    fn json_lines_use_line_and_column() {
        let src = "<Root>\n  <Buton/>\n</Root>";
        let json = diagnostics_to_json(&[unresolved(Span::new(10, 15))], src, "page.xml");
        let value: serde_json::Value = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(value["code"], "X0002");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["file"], "page.xml");
        assert_eq!(value["start"]["line"], 2);
    }
}
