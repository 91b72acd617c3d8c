//! Error types for octoquery.

use serde::Serialize;
use thiserror::Error;

/// The main error type for octoquery operations.
///
/// Everything except `Config` and `Io` is scoped to a single literal: the
/// engine turns it into a [`crate::engine::Diagnostic`] and moves on to the
/// next literal.
#[derive(Debug, Error)]
pub enum OctoError {
    /// The annotation argument is not a string literal (variable, call, template...).
    #[error("Literal not extractable: {0}")]
    NotExtractable(String),

    /// Unterminated string, quoted identifier or comment.
    #[error("Lexical error at offset {offset}: {message}")]
    Lexical { offset: usize, message: String },

    /// Unbalanced parentheses.
    #[error("Structural error at offset {offset}: {message}")]
    Structural { offset: usize, message: String },

    /// Escape sequence the decoder cannot interpret.
    #[error("Unsupported escape at offset {offset}: {message}")]
    UnsupportedEscape { offset: usize, message: String },

    /// Formatted text cannot be written back in the literal's quote style.
    #[error("Cannot encode literal: {0}")]
    EncodeUnsupported(String),

    /// Edits overlap or fall outside the buffer.
    #[error("Invalid edit batch: {0}")]
    InvalidEdits(String),

    /// Projection interface could not be generated.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of a per-literal diagnostic, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    LiteralNotExtractable,
    LexicalError,
    StructuralError,
    UnsupportedEscape,
    EncodeUnsupported,
}

impl DiagnosticKind {
    /// Lexical and structural errors both mean the query text could not be parsed.
    pub fn is_unparseable(self) -> bool {
        matches!(self, Self::LexicalError | Self::StructuralError)
    }
}

impl OctoError {
    /// Create a lexical error at the given offset of the logical text.
    pub fn lexical(offset: usize, message: impl Into<String>) -> Self {
        Self::Lexical {
            offset,
            message: message.into(),
        }
    }

    /// Create a structural error at the given offset of the logical text.
    pub fn structural(offset: usize, message: impl Into<String>) -> Self {
        Self::Structural {
            offset,
            message: message.into(),
        }
    }

    /// Create an unsupported-escape error at the given offset of the source buffer.
    pub fn escape(offset: usize, message: impl Into<String>) -> Self {
        Self::UnsupportedEscape {
            offset,
            message: message.into(),
        }
    }

    pub fn not_extractable(message: impl Into<String>) -> Self {
        Self::NotExtractable(message.into())
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::EncodeUnsupported(message.into())
    }

    /// Diagnostic kind for per-literal errors; `None` for request-level failures.
    pub fn diagnostic_kind(&self) -> Option<DiagnosticKind> {
        match self {
            Self::NotExtractable(_) => Some(DiagnosticKind::LiteralNotExtractable),
            Self::Lexical { .. } => Some(DiagnosticKind::LexicalError),
            Self::Structural { .. } => Some(DiagnosticKind::StructuralError),
            Self::UnsupportedEscape { .. } => Some(DiagnosticKind::UnsupportedEscape),
            Self::EncodeUnsupported(_) => Some(DiagnosticKind::EncodeUnsupported),
            Self::InvalidEdits(_) | Self::Projection(_) | Self::Config(_) | Self::Io(_) => {
                None
            }
        }
    }
}

/// Result type alias for octoquery operations.
pub type OctoResult<T> = Result<T, OctoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OctoError::lexical(5, "unterminated string literal");
        assert_eq!(
            err.to_string(),
            "Lexical error at offset 5: unterminated string literal"
        );
    }

    #[test]
    fn test_diagnostic_kind_mapping() {
        assert_eq!(
            OctoError::structural(0, "x").diagnostic_kind(),
            Some(DiagnosticKind::StructuralError)
        );
        assert_eq!(
            OctoError::not_extractable("x").diagnostic_kind(),
            Some(DiagnosticKind::LiteralNotExtractable)
        );
        assert_eq!(OctoError::Config("x".into()).diagnostic_kind(), None);
        assert!(DiagnosticKind::LexicalError.is_unparseable());
        assert!(!DiagnosticKind::EncodeUnsupported.is_unparseable());
    }

    #[test]
    fn test_diagnostic_kind_serializes_screaming() {
        let json = serde_json::to_string(&DiagnosticKind::LiteralNotExtractable).unwrap();
        assert_eq!(json, "\"LITERAL_NOT_EXTRACTABLE\"");
    }
}
