//! Literal codec: source fragments to logical query text and back.
//!
//! `decode` unescapes each fragment, strips triple-quote margins and joins
//! the fragments into one string. `encode` writes formatted text back in the
//! style the literal was written in, so that
//! `decode(encode(text)) == text` for every layout engine output.

mod block;
mod escape;

#[cfg(test)]
mod tests;

use std::borrow::Cow;

use crate::config::FormatConfig;
use crate::error::{OctoError, OctoResult};
use crate::locator::{HostLanguage, LiteralFragment, LocatedLiteral, QuoteStyle};
use crate::span::SourceBuffer;

pub use block::BlockLayout;
use escape::Target;

/// What `encode` needs to write text back in the literal's original style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleHints {
    pub language: HostLanguage,
    /// Quote style, prefix and delimiter of the first fragment.
    pub style: QuoteStyle,
    pub prefix: String,
    pub delimiter: &'static str,
    pub raw: bool,
    pub fragment_count: usize,
    /// Source text between the first two fragments.
    pub separator: Option<String>,
    /// Some separator carries a host comment.
    pub separator_comments: bool,
    /// Some fragment is triple-quoted.
    pub has_triple: bool,
    /// Layout of the first triple-quoted fragment.
    pub block: Option<BlockLayout>,
    /// Indentation of the source line holding the literal.
    pub line_indent: String,
    /// Some escaped fragment spells characters as `\uXXXX`; non-ASCII text
    /// is written back the same way.
    pub unicode_escapes: bool,
}

impl StyleHints {
    fn quote(&self) -> char {
        self.delimiter.chars().next().unwrap_or('"')
    }
}

fn has_host_comment(text: &str, language: HostLanguage) -> bool {
    match language {
        HostLanguage::Python => text.contains('#'),
        HostLanguage::Java | HostLanguage::Kotlin => text.contains("//") || text.contains("/*"),
    }
}

fn line_indent(text: &str, offset: usize) -> String {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Decode a located literal into its logical query text.
pub fn decode(
    buffer: &SourceBuffer<'_>,
    literal: &LocatedLiteral,
    language: HostLanguage,
) -> OctoResult<(String, StyleHints)> {
    let first = literal
        .fragments
        .first()
        .ok_or_else(|| OctoError::not_extractable("literal has no fragments"))?;

    let mut text = String::new();
    let mut block = None;
    for fragment in &literal.fragments {
        let (decoded, layout) = decode_fragment(buffer, fragment, language)?;
        if block.is_none() {
            block = layout;
        }
        append(&mut text, &decoded);
    }

    let separators: Vec<&str> = (0..literal.fragments.len().saturating_sub(1))
        .filter_map(|i| literal.separator(buffer, i))
        .collect();

    let hints = StyleHints {
        language,
        style: first.style,
        prefix: first.prefix.clone(),
        delimiter: first.delimiter,
        raw: first.is_raw(language),
        fragment_count: literal.fragments.len(),
        separator: separators.first().map(|s| s.to_string()),
        separator_comments: separators.iter().any(|s| has_host_comment(s, language)),
        has_triple: literal
            .fragments
            .iter()
            .any(|f| f.style == QuoteStyle::Triple),
        block,
        line_indent: line_indent(buffer.text, literal.span.start),
        unicode_escapes: literal.fragments.iter().any(|f| {
            !f.is_raw(language) && escape::uses_unicode_escapes(buffer.slice(f.content), language)
        }),
    };
    Ok((text, hints))
}

fn decode_fragment(
    buffer: &SourceBuffer<'_>,
    fragment: &LiteralFragment,
    language: HostLanguage,
) -> OctoResult<(String, Option<BlockLayout>)> {
    let content = buffer.slice(fragment.content);
    let raw = fragment.is_raw(language);
    if language == HostLanguage::Kotlin
        && let Some(at) = escape::template_start(content, raw)
    {
        return Err(OctoError::not_extractable(format!(
            "string template at offset {}",
            fragment.content.start + at
        )));
    }

    let (body, layout) = if fragment.style == QuoteStyle::Triple {
        let (body, layout) = block::strip(content, language == HostLanguage::Java);
        (Cow::Owned(body), Some(layout))
    } else {
        (Cow::Borrowed(content), None)
    };
    let text = if raw {
        body.into_owned()
    } else {
        escape::unescape(&body, language, fragment.content.start)?
    };
    Ok((text, layout))
}

/// Concatenate, adding a space where two words would otherwise fuse.
fn append(text: &mut String, next: &str) {
    let left = text.chars().next_back().is_some_and(|c| !c.is_whitespace());
    let right = next.chars().next().is_some_and(|c| !c.is_whitespace());
    if left && right {
        text.push(' ');
    }
    text.push_str(next);
}

/// Encode formatted text as replacement source for the literal.
pub fn encode(text: &str, hints: &StyleHints, config: &FormatConfig) -> OctoResult<String> {
    if hints.fragment_count > 1 {
        return encode_split(text, hints);
    }
    if let Some(block) = &hints.block {
        return encode_block(text, hints, block, config);
    }
    if config.promote_text_blocks
        && hints.language == HostLanguage::Java
        && hints.style == QuoteStyle::Double
        && text.contains('\n')
    {
        let margin = format!("{}{}", hints.line_indent, config.indent(1));
        let block = BlockLayout {
            margin: margin.clone(),
            opens_on_new_line: true,
            closes_on_own_line: true,
            closing_indent: margin,
        };
        let promoted = StyleHints {
            style: QuoteStyle::Triple,
            delimiter: "\"\"\"",
            ..hints.clone()
        };
        return encode_block(text, &promoted, &block, config);
    }
    encode_line(text, hints)
}

fn encode_line(text: &str, hints: &StyleHints) -> OctoResult<String> {
    let quote = hints.quote();
    let body = if hints.raw {
        if text.contains(['\n', '\r']) {
            return Err(OctoError::encode("line break in a single-line raw string"));
        }
        if text.contains(quote) {
            return Err(OctoError::encode("quote character in a raw string"));
        }
        if text.ends_with('\\') {
            return Err(OctoError::encode("trailing backslash in a raw string"));
        }
        text.to_string()
    } else {
        escape::escape(
            text,
            hints.language,
            quote,
            Target::Line,
            hints.unicode_escapes,
        )
    };
    Ok(format!(
        "{}{}{}{}",
        hints.prefix, hints.delimiter, body, hints.delimiter
    ))
}

fn encode_block(
    text: &str,
    hints: &StyleHints,
    block: &BlockLayout,
    config: &FormatConfig,
) -> OctoResult<String> {
    let mut block = block.clone();
    // With an inline first line, indented later lines would be read back as
    // margin, and unindented ones would sit at column 0 under indented code.
    let indented_source = !hints.line_indent.is_empty();
    if !block.opens_on_new_line
        && text.contains('\n')
        && (indented_source
            || text
                .split('\n')
                .skip(1)
                .filter(|l| !l.is_empty())
                .all(|l| l.starts_with([' ', '\t'])))
    {
        block.opens_on_new_line = true;
        if indented_source && block.margin.is_empty() {
            let margin = format!("{}{}", hints.line_indent, config.indent(1));
            block.closes_on_own_line = true;
            block.closing_indent = margin.clone();
            block.margin = margin;
        }
    }

    let quote = hints.quote();
    let closes_inline = !block.closes_on_own_line;
    let body = if hints.raw {
        if text.contains(hints.delimiter) {
            return Err(OctoError::encode("closing delimiter in a raw string"));
        }
        if hints.language == HostLanguage::Kotlin && escape::template_start(text, true).is_some()
        {
            return Err(OctoError::encode("`$` template start in a raw string"));
        }
        if hints.language == HostLanguage::Python
            && closes_inline
            && (text.ends_with('\\') || text.ends_with(quote))
        {
            return Err(OctoError::encode("raw string cannot end with this character"));
        }
        text.to_string()
    } else {
        escape::escape(
            text,
            hints.language,
            quote,
            Target::Block {
                guard_end: closes_inline,
            },
            hints.unicode_escapes,
        )
    };
    Ok(format!(
        "{}{}{}{}",
        hints.prefix,
        hints.delimiter,
        block::layout(&body, &block),
        hints.delimiter
    ))
}

/// One fragment per line, joined by the original separator.
fn encode_split(text: &str, hints: &StyleHints) -> OctoResult<String> {
    if hints.has_triple {
        return Err(OctoError::encode(
            "triple-quoted fragments cannot be re-split",
        ));
    }
    if hints.separator_comments {
        return Err(OctoError::encode(
            "comments between fragments cannot be redistributed",
        ));
    }
    let separator = hints.separator.as_deref().unwrap_or(" + ");
    let lines: Vec<&str> = text.split('\n').collect();
    let mut fragments = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let piece = if i + 1 < lines.len() {
            Cow::Owned(format!("{line}\n"))
        } else {
            Cow::Borrowed(*line)
        };
        fragments.push(encode_line(&piece, hints)?);
    }
    Ok(fragments.join(separator))
}
