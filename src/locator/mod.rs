//! Finds query string literals in host source.
//!
//! The locator walks Java, Kotlin or Python source, skipping comments and
//! strings so that `@Query` inside either is never matched, and returns
//! every recognized annotation's query argument as a sequence of literal
//! fragments.
//!
//! ```text
//! @Query("select u " + "from User u")
//!        └─ fragment ─┘ └── fragment ──┘   joiner: Concatenation
//! ```

mod scanner;

#[cfg(test)]
mod tests;

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::AnnotationSet;
use crate::error::{OctoError, OctoResult};
use crate::parser::Dialect;
use crate::span::{SourceBuffer, SourceSpan};
use scanner::{Cursor, preceded_by_word, read_string};

static ANNOTATION_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("annotation pattern is valid")
});

static NAMED_ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("named argument pattern is valid")
});

/// Source language of an annotated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLanguage {
    Java,
    Kotlin,
    Python,
}

impl HostLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "java" => Some(Self::Java),
            "kt" | "kts" => Some(Self::Kotlin),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// How a buffer holds its queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Queries live in string literals passed to recognized annotations.
    Annotated {
        language: HostLanguage,
        annotations: AnnotationSet,
    },
    /// The whole buffer is one query (a `.sql` file).
    Standalone,
}

impl SourceMode {
    pub fn for_path(path: &Path, annotations: &AnnotationSet) -> Option<Self> {
        if path.extension().is_some_and(|e| e == "sql") {
            return Some(Self::Standalone);
        }
        HostLanguage::from_path(path).map(|language| Self::Annotated {
            language,
            annotations: annotations.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `"""..."""` or `'''...'''`
    Triple,
    /// Single-line raw string, Python `r"..."`.
    Raw,
}

/// How a fragment connects to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Joiner {
    /// `"a" + "b"`
    Concatenation,
    /// Python `"a" \` newline `"b"`
    LineContinuation,
    /// Python `"a" "b"`
    Juxtaposition,
}

/// One quoted segment of a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralFragment {
    /// Whole fragment including prefix and delimiters.
    pub span: SourceSpan,
    /// Text between the delimiters.
    pub content: SourceSpan,
    pub style: QuoteStyle,
    pub prefix: String,
    pub delimiter: &'static str,
    /// Connection to the next fragment, `None` for the last one.
    pub joiner: Option<Joiner>,
}

impl LiteralFragment {
    /// Raw fragments are not unescaped: Python `r` prefixes and Kotlin `"""`.
    pub fn is_raw(&self, language: HostLanguage) -> bool {
        self.style == QuoteStyle::Raw
            || self.prefix.contains(['r', 'R'])
            || (language == HostLanguage::Kotlin && self.style == QuoteStyle::Triple)
    }
}

/// A query literal: a non-empty, ordered sequence of fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLiteral {
    /// Annotation name as written, e.g. `Query` or `jakarta.persistence.NamedQuery`.
    pub annotation: String,
    /// From the first fragment's start to the last fragment's end.
    pub span: SourceSpan,
    pub fragments: Vec<LiteralFragment>,
    pub dialect: Dialect,
}

impl LocatedLiteral {
    /// Source text between fragment `i` and fragment `i + 1`.
    pub fn separator<'a>(&self, buffer: &SourceBuffer<'a>, i: usize) -> Option<&'a str> {
        let left = self.fragments.get(i)?;
        let right = self.fragments.get(i + 1)?;
        Some(&buffer.text[left.span.end..right.span.start])
    }
}

/// What the locator found at one recognized annotation.
#[derive(Debug)]
pub enum Candidate {
    Literal(LocatedLiteral),
    /// Recognized but not formattable; reported and skipped.
    Skipped { span: SourceSpan, error: OctoError },
}

#[derive(Debug)]
struct Argument {
    name: Option<String>,
    value_start: usize,
    end: usize,
}

/// Scan a buffer for recognized annotations, in source order.
pub fn locate(
    buffer: &SourceBuffer<'_>,
    language: HostLanguage,
    annotations: &AnnotationSet,
) -> Vec<Candidate> {
    let text = buffer.text;
    let mut cursor = Cursor::new(text, language);
    let mut found = Vec::new();

    while let Some(c) = cursor.peek() {
        if cursor.skip_comment() || cursor.skip_literal() {
            continue;
        }
        if c == '@'
            && !preceded_by_word(text, cursor.pos)
            && let Some(caps) = ANNOTATION_HEAD.captures(cursor.rest())
            && let (Some(head), Some(name)) = (caps.get(0), caps.get(1))
        {
            let start = cursor.pos;
            let head_end = start + head.end();
            if annotations.recognizes(name.as_str()) {
                let (candidate, resume) =
                    annotation(buffer, start, head_end, name.as_str(), language, annotations);
                tracing::trace!(annotation = name.as_str(), offset = start, "found annotation");
                found.push(candidate);
                cursor.pos = resume;
            } else {
                cursor.pos = head_end;
            }
            continue;
        }
        cursor.bump();
    }
    found
}

fn skipped(span: SourceSpan, error: OctoError) -> Candidate {
    Candidate::Skipped { span, error }
}

/// Extracts the query literal of one annotation. Also returns where scanning
/// should resume.
fn annotation(
    buffer: &SourceBuffer<'_>,
    start: usize,
    head_end: usize,
    name: &str,
    language: HostLanguage,
    annotations: &AnnotationSet,
) -> (Candidate, usize) {
    let text = buffer.text;
    let mut cursor = Cursor::at(text, head_end, language);
    cursor.skip_trivia();
    let head = buffer.span(start, head_end);
    if cursor.peek() != Some('(') {
        let error = OctoError::not_extractable(format!("@{name} has no argument list"));
        return (skipped(head, error), head_end);
    }

    let arguments = match split_arguments(&mut cursor) {
        Ok(arguments) => arguments,
        Err(error) => return (skipped(head, error), head_end),
    };
    let end = cursor.pos;

    let native = annotations.is_native(name)
        || arguments.iter().any(|a| {
            a.name.as_deref() == Some("nativeQuery") && text[a.value_start..a.end].trim() == "true"
        });
    let dialect = if native { Dialect::Native } else { Dialect::Jpql };

    let query = arguments.iter().find(|a| a.name.is_none()).or_else(|| {
        arguments
            .iter()
            .find(|a| a.name.as_deref().is_some_and(|n| annotations.is_query_attribute(n)))
    });
    let Some(query) = query else {
        let error = OctoError::not_extractable(format!("@{name} has no query argument"));
        return (skipped(buffer.span(start, end), error), end);
    };

    let candidate = match fragments(buffer, query.value_start, query.end, language) {
        Ok(fragments) => {
            let first = fragments[0].span.start;
            let last = fragments[fragments.len() - 1].span.end;
            Candidate::Literal(LocatedLiteral {
                annotation: name.to_string(),
                span: buffer.span(first, last),
                fragments,
                dialect,
            })
        }
        Err(error) => skipped(buffer.span(query.value_start, query.end), error),
    };
    (candidate, end)
}

/// Splits a parenthesized argument list at top-level commas. The cursor
/// starts on `(` and ends just past the matching `)`.
fn split_arguments(cursor: &mut Cursor<'_>) -> OctoResult<Vec<Argument>> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    cursor.bump();
    let mut arg_start = cursor.pos;

    loop {
        let Some(c) = cursor.peek() else {
            return Err(OctoError::not_extractable("unterminated argument list"));
        };
        if cursor.skip_comment() || cursor.skip_literal() {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            ')' => {
                arguments.extend(argument(cursor, arg_start, cursor.pos));
                cursor.bump();
                return Ok(arguments);
            }
            ',' if depth == 0 => {
                arguments.extend(argument(cursor, arg_start, cursor.pos));
                arg_start = cursor.pos + 1;
            }
            _ => {}
        }
        cursor.bump();
    }
}

fn argument(cursor: &Cursor<'_>, start: usize, end: usize) -> Option<Argument> {
    let text = cursor.text;
    let mut inner = Cursor::at(text, start, cursor.language);
    inner.skip_trivia();
    if inner.pos >= end {
        return None;
    }
    let start = inner.pos;
    let end = start + text[start..end].trim_end().len();

    let arg = &text[start..end];
    if let Some(caps) = NAMED_ARGUMENT.captures(arg)
        && let (Some(all), Some(name)) = (caps.get(0), caps.get(1))
        && !arg[all.end()..].starts_with('=')
    {
        let mut value = Cursor::at(text, start + all.end(), cursor.language);
        value.skip_trivia();
        return Some(Argument {
            name: Some(name.as_str().to_string()),
            value_start: value.pos.min(end),
            end,
        });
    }
    Some(Argument {
        name: None,
        value_start: start,
        end,
    })
}

/// Parses a literal expression: string fragments joined by `+`, Python
/// juxtaposition or `\` continuation. Anything else is not extractable.
fn fragments(
    buffer: &SourceBuffer<'_>,
    start: usize,
    end: usize,
    language: HostLanguage,
) -> OctoResult<Vec<LiteralFragment>> {
    let text = buffer.text;
    let mut cursor = Cursor::at(text, start, language);
    let mut fragments: Vec<LiteralFragment> = Vec::new();

    loop {
        let raw = match read_string(text, cursor.pos, language) {
            Some(raw) => raw?,
            None => {
                return Err(OctoError::not_extractable(
                    "argument is not a string literal",
                ));
            }
        };
        if raw.end > end {
            return Err(OctoError::not_extractable("argument is not a string literal"));
        }
        if raw.prefix.contains(['f', 'F']) {
            return Err(OctoError::not_extractable("f-strings are not supported"));
        }
        if raw.prefix.contains(['b', 'B']) {
            return Err(OctoError::not_extractable("bytes literals are not supported"));
        }
        cursor.pos = raw.end;
        let fragment = LiteralFragment {
            span: buffer.span(raw.start, raw.end),
            content: buffer.span(raw.content_start, raw.content_end),
            style: raw.style,
            prefix: raw.prefix,
            delimiter: raw.delimiter,
            joiner: None,
        };
        fragments.push(fragment);

        let continued = cursor.skip_trivia();
        if cursor.pos >= end {
            return Ok(fragments);
        }
        let joiner = if cursor.peek() == Some('+') {
            cursor.bump();
            cursor.skip_trivia();
            Joiner::Concatenation
        } else if language == HostLanguage::Python
            && read_string(text, cursor.pos, language).is_some()
        {
            if continued {
                Joiner::LineContinuation
            } else {
                Joiner::Juxtaposition
            }
        } else {
            return Err(OctoError::not_extractable(
                "argument is not a plain string literal",
            ));
        };
        if let Some(last) = fragments.last_mut() {
            last.joiner = Some(joiner);
        }
    }
}
