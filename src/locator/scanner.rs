//! Host-language aware cursor.
//!
//! Knows just enough about Java, Kotlin and Python lexing to step over
//! comments, string literals and text blocks without misreading their
//! contents as code.

use super::{HostLanguage, QuoteStyle};
use crate::error::{OctoError, OctoResult};

/// A string literal as it appears in host source, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawString {
    pub start: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub end: usize,
    pub prefix: String,
    pub delimiter: &'static str,
    pub style: QuoteStyle,
}

pub(crate) struct Cursor<'a> {
    pub text: &'a str,
    pub pos: usize,
    pub language: HostLanguage,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str, language: HostLanguage) -> Self {
        Self::at(text, 0, language)
    }

    pub fn at(text: &'a str, pos: usize, language: HostLanguage) -> Self {
        Self {
            text,
            pos,
            language,
        }
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_line(&mut self) {
        self.pos = self
            .rest()
            .find('\n')
            .map_or(self.text.len(), |i| self.pos + i);
    }

    /// Steps over a comment starting at the cursor, if any.
    pub fn skip_comment(&mut self) -> bool {
        let rest = self.rest();
        match self.language {
            HostLanguage::Python if rest.starts_with('#') => {
                self.skip_line();
                true
            }
            HostLanguage::Java | HostLanguage::Kotlin if rest.starts_with("//") => {
                self.skip_line();
                true
            }
            HostLanguage::Java | HostLanguage::Kotlin if rest.starts_with("/*") => {
                self.skip_block_comment();
                true
            }
            _ => false,
        }
    }

    /// Kotlin block comments nest, Java ones do not.
    fn skip_block_comment(&mut self) {
        let nested = self.language == HostLanguage::Kotlin;
        let mut depth = 0usize;
        while self.pos < self.text.len() {
            let rest = self.rest();
            if rest.starts_with("/*") && (depth == 0 || nested) {
                depth += 1;
                self.pos += 2;
            } else if rest.starts_with("*/") {
                self.pos += 2;
                depth -= 1;
                if depth == 0 {
                    return;
                }
            } else {
                self.bump();
            }
        }
    }

    /// Skips whitespace and comments. Returns true when a Python `\`
    /// line continuation was crossed.
    pub fn skip_trivia(&mut self) -> bool {
        let mut continued = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.bump(),
                Some('\\') if self.language == HostLanguage::Python => {
                    let after = &self.rest()[1..];
                    let Some(newline) = line_break_len(after) else {
                        return continued;
                    };
                    continued = true;
                    self.pos += 1 + newline;
                }
                Some(_) if self.skip_comment() => {}
                _ => return continued,
            }
        }
    }

    /// Steps over a string, text block or char literal starting at the cursor.
    pub fn skip_literal(&mut self) -> bool {
        match read_string(self.text, self.pos, self.language) {
            Some(Ok(raw)) => {
                self.pos = raw.end;
                true
            }
            Some(Err(_)) => {
                self.skip_line();
                true
            }
            None if self.language != HostLanguage::Python && self.peek() == Some('\'') => {
                self.skip_char_literal();
                true
            }
            None => false,
        }
    }

    fn skip_char_literal(&mut self) {
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '\'' => {
                    self.bump();
                    return;
                }
                '\n' => return,
                _ => self.bump(),
            }
        }
    }
}

fn line_break_len(s: &str) -> Option<usize> {
    if s.starts_with("\r\n") {
        Some(2)
    } else if s.starts_with('\n') {
        Some(1)
    } else {
        None
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn preceded_by_word(text: &str, pos: usize) -> bool {
    text[..pos].chars().next_back().is_some_and(is_word_char)
}

fn python_prefix_len(text: &str, start: usize) -> usize {
    if preceded_by_word(text, start) {
        return 0;
    }
    let len = text[start..]
        .chars()
        .take(2)
        .take_while(|c| "rRbBuUfF".contains(*c))
        .count();
    let after = &text[start + len..];
    if len > 0 && (after.starts_with('"') || after.starts_with('\'')) {
        len
    } else {
        0
    }
}

/// Recognizes a string literal starting at `start`.
///
/// `None` when no string starts there, `Some(Err(..))` when one starts but
/// never closes.
pub(crate) fn read_string(
    text: &str,
    start: usize,
    language: HostLanguage,
) -> Option<OctoResult<RawString>> {
    let python = language == HostLanguage::Python;
    let prefix_len = if python {
        python_prefix_len(text, start)
    } else {
        0
    };
    let after = &text[start + prefix_len..];
    let delimiter = if after.starts_with("\"\"\"") {
        "\"\"\""
    } else if python && after.starts_with("'''") {
        "'''"
    } else if after.starts_with('"') {
        "\""
    } else if python && after.starts_with('\'') {
        "'"
    } else {
        return None;
    };

    let prefix = text[start..start + prefix_len].to_string();
    let triple = delimiter.len() == 3;
    let raw = (python && prefix.contains(['r', 'R']))
        || (language == HostLanguage::Kotlin && triple);
    let style = if triple {
        QuoteStyle::Triple
    } else if python && raw {
        QuoteStyle::Raw
    } else if delimiter == "'" {
        QuoteStyle::Single
    } else {
        QuoteStyle::Double
    };

    let content_start = start + prefix_len + delimiter.len();
    let mut i = content_start;
    while i < text.len() {
        let rest = &text[i..];
        let Some(c) = rest.chars().next() else { break };
        // Backslash protects the next char everywhere except Kotlin raw strings.
        if c == '\\' && !(language == HostLanguage::Kotlin && triple) {
            i += 1 + rest[1..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if c == '\n' && !triple {
            break;
        }
        if language == HostLanguage::Kotlin && !triple && rest.starts_with("${") {
            i += skip_template(rest);
            continue;
        }
        if rest.starts_with(delimiter) {
            let mut close = i;
            if language == HostLanguage::Kotlin && triple {
                // The closing delimiter is the last three quotes of a run.
                while text[close + 3..].starts_with('"') {
                    close += 1;
                }
            }
            return Some(Ok(RawString {
                start,
                content_start,
                content_end: close,
                end: close + delimiter.len(),
                prefix,
                delimiter,
                style,
            }));
        }
        i += c.len_utf8();
    }
    Some(Err(OctoError::not_extractable(format!(
        "unterminated string literal at offset {start}"
    ))))
}

/// Length of a `${...}` template expression, braces balanced.
fn skip_template(rest: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            '\n' => return i,
            _ => {}
        }
    }
    rest.len()
}
