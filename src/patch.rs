//! Edits against a buffer snapshot.

use serde::Serialize;

use crate::error::{OctoError, OctoResult};
use crate::span::{SourceBuffer, SourceSpan};

/// Replace `span` with `replacement`. The only observable mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattingEdit {
    pub span: SourceSpan,
    pub replacement: String,
}

/// Byte length of the common prefix, on a char boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i)
}

/// Byte length of the common suffix, on a char boundary.
fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Edit turning the text at `span` into `replacement`, trimmed to the bytes
/// that actually differ. `None` when nothing changes.
pub fn make_edit(
    buffer: &SourceBuffer<'_>,
    span: SourceSpan,
    replacement: &str,
) -> Option<FormattingEdit> {
    let original = buffer.slice(span);
    if original == replacement {
        return None;
    }
    let prefix = common_prefix(original, replacement);
    let suffix = common_suffix(&original[prefix..], &replacement[prefix..]);
    Some(FormattingEdit {
        span: buffer.span(span.start + prefix, span.end - suffix),
        replacement: replacement[prefix..replacement.len() - suffix].to_string(),
    })
}

/// Apply a batch of non-overlapping edits, last edit first.
pub fn apply_edits(text: &str, edits: &[FormattingEdit]) -> OctoResult<String> {
    let mut sorted: Vec<&FormattingEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));

    for pair in sorted.windows(2) {
        if pair[0].span.end > pair[1].span.start {
            return Err(OctoError::InvalidEdits(format!(
                "edits at {} and {} overlap",
                pair[0].span, pair[1].span
            )));
        }
    }

    let mut out = text.to_string();
    for edit in sorted.iter().rev() {
        let span = edit.span;
        if span.end > out.len()
            || !out.is_char_boundary(span.start)
            || !out.is_char_boundary(span.end)
        {
            return Err(OctoError::InvalidEdits(format!(
                "edit at {span} is outside the buffer"
            )));
        }
        out.replace_range(span.start..span.end, &edit.replacement);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::BufferId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_make_edit_is_minimal() {
        let text = "x = \"select  a\";";
        let buffer = SourceBuffer::new(BufferId(1), text);
        let edit = make_edit(&buffer, buffer.span(4, 15), "\"SELECT a\"").unwrap();
        assert_eq!(edit.span, buffer.span(5, 12));
        assert_eq!(edit.replacement, "SELECT");
        assert_eq!(
            apply_edits(text, &[edit]).unwrap(),
            "x = \"SELECT a\";"
        );
    }

    #[test]
    fn test_make_edit_identical() {
        let buffer = SourceBuffer::new(BufferId(1), "\"é\"");
        assert_eq!(make_edit(&buffer, buffer.span(0, 4), "\"é\""), None);
        let edit = make_edit(&buffer, buffer.span(0, 4), "\"è\"").unwrap();
        assert_eq!(edit.replacement, "è");
        assert_eq!(edit.span, buffer.span(1, 3));
    }

    #[test]
    fn test_apply_edits_in_reverse_order() {
        let buffer = SourceBuffer::new(BufferId(1), "aaa bbb ccc");
        let edits = vec![
            FormattingEdit {
                span: buffer.span(0, 3),
                replacement: "A".into(),
            },
            FormattingEdit {
                span: buffer.span(8, 11),
                replacement: "CCCC".into(),
            },
        ];
        assert_eq!(apply_edits(buffer.text, &edits).unwrap(), "A bbb CCCC");
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let buffer = SourceBuffer::new(BufferId(1), "abcdef");
        let edits = vec![
            FormattingEdit {
                span: buffer.span(0, 3),
                replacement: String::new(),
            },
            FormattingEdit {
                span: buffer.span(2, 4),
                replacement: String::new(),
            },
        ];
        assert!(matches!(
            apply_edits(buffer.text, &edits),
            Err(OctoError::InvalidEdits(_))
        ));
    }
}
