//! Formatting engine.
//!
//! Ties the pipeline together for one buffer snapshot:
//! locate → decode → parse → lay out → encode → edit. The engine does no
//! I/O and keeps no state, so buffers can be formatted in parallel.

use serde::Serialize;

use crate::codec;
use crate::config::FormatConfig;
use crate::error::{DiagnosticKind, OctoError, OctoResult};
use crate::fmt::format_script;
use crate::locator::{self, Candidate, HostLanguage, LocatedLiteral, SourceMode};
use crate::parser::{self, Dialect};
use crate::patch::{self, FormattingEdit};
use crate::span::{SourceBuffer, SourceSpan};

/// A literal that was left untouched, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: SourceSpan,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn from_error(span: SourceSpan, error: &OctoError) -> Option<Self> {
        error.diagnostic_kind().map(|kind| Self {
            span,
            kind,
            message: error.to_string(),
        })
    }
}

/// Result of formatting one buffer: edits in source order plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatOutcome {
    pub edits: Vec<FormattingEdit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FormatOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }

    fn record(&mut self, span: SourceSpan, result: OctoResult<Option<FormattingEdit>>) {
        match result {
            Ok(Some(edit)) => self.edits.push(edit),
            Ok(None) => {}
            Err(error) => {
                tracing::debug!(%span, %error, "literal skipped");
                if let Some(diagnostic) = Diagnostic::from_error(span, &error) {
                    self.diagnostics.push(diagnostic);
                }
            }
        }
    }
}

/// Format a logical query string.
pub fn format_query(text: &str, dialect: Dialect, config: &FormatConfig) -> OctoResult<String> {
    let script = parser::parse(text, dialect)?;
    Ok(format_script(&script, config))
}

/// Format every query in a buffer.
///
/// Never fails: per-literal problems become diagnostics and the literal is
/// left as it was.
pub fn format_source(
    buffer: &SourceBuffer<'_>,
    mode: &SourceMode,
    config: &FormatConfig,
) -> FormatOutcome {
    let mut outcome = FormatOutcome::default();
    match mode {
        SourceMode::Standalone => {
            let span = buffer.span(0, buffer.text.len());
            outcome.record(span, format_standalone(buffer, config));
        }
        SourceMode::Annotated {
            language,
            annotations,
        } => {
            for candidate in locator::locate(buffer, *language, annotations) {
                match candidate {
                    Candidate::Literal(literal) => {
                        let result = format_literal(buffer, &literal, *language, config);
                        outcome.record(literal.span, result);
                    }
                    Candidate::Skipped { span, error } => outcome.record(span, Err(error)),
                }
            }
        }
    }
    tracing::debug!(
        buffer = buffer.id.0,
        edits = outcome.edits.len(),
        diagnostics = outcome.diagnostics.len(),
        "formatted buffer"
    );
    outcome
}

fn format_standalone(
    buffer: &SourceBuffer<'_>,
    config: &FormatConfig,
) -> OctoResult<Option<FormattingEdit>> {
    let text = buffer.text;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut formatted = format_query(text, Dialect::Native, config)?;
    if text.ends_with('\n') {
        formatted.push('\n');
    }
    Ok(patch::make_edit(
        buffer,
        buffer.span(0, text.len()),
        &formatted,
    ))
}

fn format_literal(
    buffer: &SourceBuffer<'_>,
    literal: &LocatedLiteral,
    language: HostLanguage,
    config: &FormatConfig,
) -> OctoResult<Option<FormattingEdit>> {
    let (text, hints) = codec::decode(buffer, literal, language)?;
    let formatted = format_query(&text, literal.dialect, config)?;
    if formatted == text {
        tracing::debug!(span = %literal.span, "literal already formatted");
        return Ok(None);
    }
    let replacement = codec::encode(&formatted, &hints, config)?;
    tracing::debug!(
        span = %literal.span,
        annotation = %literal.annotation,
        dialect = ?literal.dialect,
        "formatted literal"
    );
    Ok(patch::make_edit(buffer, literal.span, &replacement))
}
