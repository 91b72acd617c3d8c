//! Escape sequences of the host languages.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{OctoError, OctoResult};
use crate::locator::HostLanguage;

/// Where escaped text is going to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// Single-line `"..."` / `'...'` literal.
    Line,
    /// Triple-quoted literal. `guard_end` is set when the closing delimiter
    /// follows the last character directly.
    Block { guard_end: bool },
}

struct Unescaper<'a> {
    chars: Peekable<CharIndices<'a>>,
    base: usize,
    out: String,
}

impl<'a> Unescaper<'a> {
    fn new(content: &'a str, base: usize) -> Self {
        Self {
            chars: content.char_indices().peekable(),
            base,
            out: String::with_capacity(content.len()),
        }
    }

    fn error(&self, at: usize, message: impl Into<String>) -> OctoError {
        OctoError::escape(self.base + at, message)
    }

    fn hex(&mut self, at: usize, digits: usize) -> OctoResult<u32> {
        let mut value = 0u32;
        for _ in 0..digits {
            let digit = self
                .chars
                .next_if(|(_, c)| c.is_ascii_hexdigit())
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| self.error(at, format!("expected {digits} hex digits")))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn octal(&mut self, first: char, max_digits: usize) -> u32 {
        let mut value = first.to_digit(8).unwrap_or(0);
        for _ in 1..max_digits {
            match self.chars.next_if(|(_, c)| matches!(c, '0'..='7')) {
                Some((_, c)) => value = value * 8 + c.to_digit(8).unwrap_or(0),
                None => break,
            }
        }
        value
    }

    fn push_code(&mut self, at: usize, code: u32) -> OctoResult<()> {
        let c = char::from_u32(code)
            .ok_or_else(|| self.error(at, format!("invalid code point {code:#x}")))?;
        self.out.push(c);
        Ok(())
    }

    /// `\uXXXX`, pairing a high surrogate with a following `\uXXXX` low one.
    fn utf16(&mut self, at: usize, repeated_u: bool) -> OctoResult<()> {
        if repeated_u {
            while self.chars.next_if(|(_, c)| *c == 'u').is_some() {}
        }
        let unit = self.hex(at, 4)?;
        if !(0xD800..0xDC00).contains(&unit) {
            return self.push_code(at, unit);
        }
        let mut ahead = self.chars.clone();
        let low = match (ahead.next(), ahead.next()) {
            (Some((_, '\\')), Some((_, 'u'))) => {
                if repeated_u {
                    while ahead.next_if(|(_, c)| *c == 'u').is_some() {}
                }
                let digits: String = ahead.by_ref().take(4).map(|(_, c)| c).collect();
                u32::from_str_radix(&digits, 16).ok()
            }
            _ => None,
        };
        match low {
            Some(low) if (0xDC00..0xE000).contains(&low) => {
                self.chars = ahead;
                self.push_code(at, 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
            }
            _ => Err(self.error(at, "unpaired surrogate")),
        }
    }

    fn skip_line_break(&mut self, c: char) {
        if c == '\r' {
            self.chars.next_if(|(_, c)| *c == '\n');
        }
    }

    fn java(mut self) -> OctoResult<String> {
        while let Some((i, c)) = self.chars.next() {
            if c != '\\' {
                self.out.push(c);
                continue;
            }
            let Some((_, e)) = self.chars.next() else {
                return Err(self.error(i, "dangling backslash"));
            };
            match e {
                'b' => self.out.push('\u{8}'),
                't' => self.out.push('\t'),
                'n' => self.out.push('\n'),
                'f' => self.out.push('\u{c}'),
                'r' => self.out.push('\r'),
                's' => self.out.push(' '),
                '"' | '\'' | '\\' => self.out.push(e),
                '\n' | '\r' => self.skip_line_break(e),
                '0'..='7' => {
                    let max = if e <= '3' { 3 } else { 2 };
                    let code = self.octal(e, max);
                    self.push_code(i, code)?;
                }
                'u' => self.utf16(i, true)?,
                other => return Err(self.error(i, format!("unknown escape `\\{other}`"))),
            }
        }
        Ok(self.out)
    }

    fn kotlin(mut self) -> OctoResult<String> {
        while let Some((i, c)) = self.chars.next() {
            if c != '\\' {
                self.out.push(c);
                continue;
            }
            let Some((_, e)) = self.chars.next() else {
                return Err(self.error(i, "dangling backslash"));
            };
            match e {
                't' => self.out.push('\t'),
                'b' => self.out.push('\u{8}'),
                'n' => self.out.push('\n'),
                'r' => self.out.push('\r'),
                '\'' | '"' | '\\' | '$' => self.out.push(e),
                'u' => self.utf16(i, false)?,
                other => return Err(self.error(i, format!("unknown escape `\\{other}`"))),
            }
        }
        Ok(self.out)
    }

    fn python(mut self) -> OctoResult<String> {
        while let Some((i, c)) = self.chars.next() {
            if c != '\\' {
                self.out.push(c);
                continue;
            }
            let Some((_, e)) = self.chars.next() else {
                return Err(self.error(i, "dangling backslash"));
            };
            match e {
                '\\' | '\'' | '"' => self.out.push(e),
                'a' => self.out.push('\u{7}'),
                'b' => self.out.push('\u{8}'),
                'f' => self.out.push('\u{c}'),
                'n' => self.out.push('\n'),
                'r' => self.out.push('\r'),
                't' => self.out.push('\t'),
                'v' => self.out.push('\u{b}'),
                '\n' | '\r' => self.skip_line_break(e),
                '0'..='7' => {
                    let code = self.octal(e, 3);
                    self.push_code(i, code)?;
                }
                'x' => {
                    let code = self.hex(i, 2)?;
                    self.push_code(i, code)?;
                }
                'u' => {
                    let code = self.hex(i, 4)?;
                    self.push_code(i, code)?;
                }
                'U' => {
                    let code = self.hex(i, 8)?;
                    self.push_code(i, code)?;
                }
                'N' => return Err(self.error(i, "named unicode escapes are not supported")),
                other => {
                    self.out.push('\\');
                    self.out.push(other);
                }
            }
        }
        Ok(self.out)
    }
}

/// Interpret escape sequences. `base` is the buffer offset of `content`, used
/// in error positions.
pub(crate) fn unescape(content: &str, language: HostLanguage, base: usize) -> OctoResult<String> {
    let unescaper = Unescaper::new(content, base);
    match language {
        HostLanguage::Java => unescaper.java(),
        HostLanguage::Kotlin => unescaper.kotlin(),
        HostLanguage::Python => unescaper.python(),
    }
}

fn starts_template(next: Option<char>) -> bool {
    next.is_some_and(|c| c == '{' || c == '_' || c.is_alphabetic())
}

/// Offset of the first Kotlin string template (`$name` or `${`).
pub(crate) fn template_start(content: &str, raw: bool) -> Option<usize> {
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if !raw => {
                chars.next();
            }
            '$' if starts_template(chars.peek().map(|(_, c)| *c)) => return Some(i),
            _ => {}
        }
    }
    None
}

/// The escaped content spells some character as `\\uXXXX` (or Python `\\U`).
pub(crate) fn uses_unicode_escapes(content: &str, language: HostLanguage) -> bool {
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            continue;
        }
        match chars.next() {
            Some('u') => return true,
            Some('U') if language == HostLanguage::Python => return true,
            _ => {}
        }
    }
    false
}

fn push_unicode(out: &mut String, c: char, language: HostLanguage) {
    match language {
        HostLanguage::Python if c as u32 > 0xFFFF => {
            out.push_str(&format!("\\U{:08x}", c as u32))
        }
        HostLanguage::Python => out.push_str(&format!("\\u{:04x}", c as u32)),
        HostLanguage::Java | HostLanguage::Kotlin => {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
}

fn push_control(out: &mut String, c: char, language: HostLanguage) {
    match language {
        HostLanguage::Python => out.push_str(&format!("\\x{:02x}", c as u32)),
        HostLanguage::Java | HostLanguage::Kotlin => {
            out.push_str(&format!("\\u{:04x}", c as u32))
        }
    }
}

/// Escape logical text for an escaped (non-raw) literal. With `ascii`, every
/// non-ASCII character is written as a unicode escape.
pub(crate) fn escape(
    text: &str,
    language: HostLanguage,
    quote: char,
    target: Target,
    ascii: bool,
) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let chars: Vec<char> = text.chars().collect();
    let mut quote_run = 0usize;

    for (i, &c) in chars.iter().enumerate() {
        if c == quote {
            let escaped = match target {
                Target::Line => true,
                Target::Block { guard_end } => {
                    quote_run % 3 == 2 || (guard_end && i + 1 == chars.len())
                }
            };
            quote_run += 1;
            if escaped {
                out.push('\\');
            }
            out.push(c);
            continue;
        }
        quote_run = 0;
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' if matches!(target, Target::Block { .. }) => {
                protect_trailing_space(&mut out, language);
                out.push('\n');
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '$' if language == HostLanguage::Kotlin
                && starts_template(chars.get(i + 1).copied()) =>
            {
                out.push_str("\\$")
            }
            c if c.is_control() => push_control(&mut out, c, language),
            c if ascii && !c.is_ascii() => push_unicode(&mut out, c, language),
            c => out.push(c),
        }
    }
    if matches!(target, Target::Block { .. }) {
        protect_trailing_space(&mut out, language);
    }
    out
}

/// Java text blocks strip trailing spaces, so the last one becomes `\s`.
fn protect_trailing_space(out: &mut String, language: HostLanguage) {
    if language == HostLanguage::Java && out.ends_with(' ') {
        out.pop();
        out.push_str("\\s");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_java_escapes() {
        let decoded = unescape(r#"a\tb\"c\\d\s\101\u0041\uuu00e9"#, HostLanguage::Java, 0).unwrap();
        assert_eq!(decoded, "a\tb\"c\\d AAé");
        assert_eq!(
            unescape(r"\uD83D\uDE00", HostLanguage::Java, 0).unwrap(),
            "\u{1F600}"
        );
        assert!(matches!(
            unescape(r"ab\q", HostLanguage::Java, 10),
            Err(OctoError::UnsupportedEscape { offset: 12, .. })
        ));
    }

    #[test]
    fn test_python_keeps_unknown_escapes() {
        let decoded = unescape(r"\d+\x41\n", HostLanguage::Python, 0).unwrap();
        assert_eq!(decoded, "\\d+A\n");
        assert!(unescape(r"\N{DASH}", HostLanguage::Python, 0).is_err());
    }

    #[test]
    fn test_kotlin_dollar() {
        assert_eq!(unescape(r"\$x", HostLanguage::Kotlin, 0).unwrap(), "$x");
        assert_eq!(template_start(r"a \$b $c", false), Some(6));
        assert_eq!(template_start("cost $ 5", false), None);
        assert_eq!(escape("$x", HostLanguage::Kotlin, '"', Target::Line, false), r"\$x");
    }

    #[test]
    fn test_escape_line() {
        assert_eq!(
            escape("a \"b\"\n\tc\\", HostLanguage::Java, '"', Target::Line, false),
            r#"a \"b\"\n\tc\\"#
        );
        assert_eq!(
            escape("it's \"x\"", HostLanguage::Python, '\'', Target::Line, false),
            r#"it\'s "x""#
        );
        assert_eq!(escape("\u{1}", HostLanguage::Python, '"', Target::Line, false), r"\x01");
    }

    #[test]
    fn test_unicode_escape_style() {
        assert!(uses_unicode_escapes(r"caf\u00e9", HostLanguage::Java));
        assert!(!uses_unicode_escapes(r"caf\\u00e9", HostLanguage::Java));
        assert!(uses_unicode_escapes(r"\U0001f600", HostLanguage::Python));
        assert!(!uses_unicode_escapes(r"\U0001f600", HostLanguage::Kotlin));

        assert_eq!(
            escape("'café' 😀", HostLanguage::Java, '"', Target::Line, true),
            r"'caf\u00e9' \ud83d\ude00"
        );
        assert_eq!(
            escape("'café' 😀", HostLanguage::Python, '"', Target::Line, true),
            r"'caf\u00e9' \U0001f600"
        );
        assert_eq!(
            escape("'café'", HostLanguage::Kotlin, '"', Target::Line, false),
            "'café'"
        );
    }

    #[test]
    fn test_escape_block_quote_runs() {
        let target = Target::Block { guard_end: true };
        assert_eq!(
            escape("a \"\"\"\" b \"", HostLanguage::Java, '"', target, false),
            "a \"\"\\\"\" b \\\""
        );
        assert_eq!(
            escape("x  \ny ", HostLanguage::Java, '"', Target::Block { guard_end: false }, false),
            "x \\s\ny\\s"
        );
    }
}
