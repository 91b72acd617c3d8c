//! Margin handling for triple-quoted literals.

use serde::Serialize;

/// Layout of a triple-quoted literal, kept so it can be re-emitted the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockLayout {
    /// Common indentation stripped from every content line.
    pub margin: String,
    /// Content starts on the line after the opening delimiter.
    pub opens_on_new_line: bool,
    /// The closing delimiter sits on its own line.
    pub closes_on_own_line: bool,
    /// Indentation in front of an own-line closing delimiter.
    pub closing_indent: String,
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i);
    &a[..len]
}

/// Strips the margin from raw (still escaped) block content.
pub(crate) fn strip(content: &str, strip_trailing: bool) -> (String, BlockLayout) {
    let content = content.replace("\r\n", "\n");
    let (opens_on_new_line, body) = match content.split_once('\n') {
        Some((first, rest)) if is_blank(first) => (true, rest),
        _ => (false, content.as_str()),
    };

    let mut lines: Vec<&str> = body.split('\n').collect();
    let closes_on_own_line = lines
        .last()
        .is_some_and(|last| is_blank(last) && (lines.len() > 1 || opens_on_new_line));
    let closing_indent = if closes_on_own_line {
        lines.pop().unwrap_or_default().to_string()
    } else {
        String::new()
    };

    let inline_first = usize::from(!opens_on_new_line);
    let mut margin: Option<&str> = closes_on_own_line.then_some(closing_indent.as_str());
    for line in lines.iter().skip(inline_first).filter(|l| !is_blank(l)) {
        let indent = leading_whitespace(line);
        margin = Some(margin.map_or(indent, |m| common_prefix(m, indent)));
    }
    let margin = margin.unwrap_or_default().to_string();

    let stripped: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, &line)| {
            let line = if i < inline_first {
                line
            } else if is_blank(line) {
                ""
            } else {
                line.strip_prefix(margin.as_str()).unwrap_or(line)
            };
            if strip_trailing {
                line.trim_end_matches([' ', '\t', '\u{c}'])
            } else {
                line
            }
        })
        .collect();

    let layout = BlockLayout {
        margin,
        opens_on_new_line,
        closes_on_own_line,
        closing_indent,
    };
    (stripped.join("\n"), layout)
}

/// Lays out already escaped text between the delimiters.
pub(crate) fn layout(text: &str, block: &BlockLayout) -> String {
    let mut out = String::with_capacity(text.len() + block.margin.len() * 8);
    if block.opens_on_new_line {
        out.push('\n');
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let inline_first = i == 0 && !block.opens_on_new_line;
        if !inline_first && !line.is_empty() {
            out.push_str(&block.margin);
        }
        out.push_str(line);
    }
    if block.closes_on_own_line {
        out.push('\n');
        out.push_str(&block.closing_indent);
    }
    out
}
