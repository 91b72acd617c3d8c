//! Projection interface generation.
//!
//! Reads the column aliases of a native SELECT list and emits a Spring Data
//! style interface with one getter per alias:
//!
//! ```text
//! select u.id as id, count(o.id) as "orderCount" from ...
//!
//! public interface UserSummary {
//!     Object getId();
//!     Object getOrderCount();
//! }
//! ```

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{OctoError, OctoResult};
use crate::parser::tokens::{Token, TokenKind, tokenize};

static INVALID_IDENTIFIER_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_$]").expect("identifier pattern is valid")
});

/// Column aliases of the first SELECT list, deduplicated in order.
pub fn extract_aliases(sql: &str) -> OctoResult<Vec<String>> {
    let tokens: Vec<Token> = tokenize(sql)?
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect();
    let start = tokens
        .iter()
        .position(|t| t.is_keyword("SELECT"))
        .ok_or_else(|| OctoError::Projection("no SELECT clause found".into()))?;

    let mut aliases: Vec<String> = Vec::new();
    let mut column: Vec<&Token> = Vec::new();
    let mut depth = 0usize;
    for token in &tokens[start + 1..] {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                push_alias(&mut aliases, &column);
                column.clear();
                continue;
            }
            TokenKind::Keyword if depth == 0 && token.is_keyword("FROM") => break,
            _ => {}
        }
        column.push(token);
    }
    push_alias(&mut aliases, &column);

    if aliases.is_empty() {
        return Err(OctoError::Projection(
            "no `AS <alias>` found in the SELECT list".into(),
        ));
    }
    Ok(aliases)
}

/// The last `AS <alias>` of a column that is not a type in `CAST(x AS t(n))`.
fn column_alias(column: &[&Token]) -> Option<String> {
    column
        .windows(3)
        .map(|w| (w[0], w[1], Some(w[2])))
        .chain(column.len().checked_sub(2).map(|i| (column[i], column[i + 1], None)))
        .filter(|(as_kw, _, next)| {
            as_kw.is_keyword("AS") && !next.is_some_and(|n| n.kind == TokenKind::OpenParen)
        })
        .filter_map(|(_, alias, _)| alias_text(alias))
        .last()
}

fn alias_text(token: &Token) -> Option<String> {
    match token.kind {
        TokenKind::Identifier | TokenKind::Keyword => Some(token.text.clone()),
        TokenKind::QuotedIdentifier | TokenKind::String => {
            let inner = token.text.get(1..token.text.len().saturating_sub(1))?;
            (!inner.is_empty()).then(|| inner.to_string())
        }
        _ => None,
    }
}

fn push_alias(aliases: &mut Vec<String>, column: &[&Token]) {
    if let Some(alias) = column_alias(column)
        && !aliases.contains(&alias)
    {
        aliases.push(alias);
    }
}

/// Turn user input into a Java type name: quotes dropped, invalid characters
/// replaced, first letter upper-cased and the rest lower-cased.
pub fn interface_name(raw: &str) -> OctoResult<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| trimmed.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(trimmed);
    let cleaned = INVALID_IDENTIFIER_CHARS.replace_all(unquoted, "_");

    let mut chars = cleaned.chars();
    let Some(first) = chars.next() else {
        return Err(OctoError::Projection("interface name is empty".into()));
    };
    let mut name: String = first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect();
    if first.is_ascii_digit() {
        name.insert(0, '_');
    }
    Ok(name)
}

fn getter(alias: &str) -> String {
    let cleaned = INVALID_IDENTIFIER_CHARS.replace_all(alias, "_");
    let mut chars = cleaned.chars();
    let head: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
    format!("get{head}{}", chars.as_str())
}

/// Java source for a projection interface.
pub fn generate_interface(name: &str, package: Option<&str>, aliases: &[String]) -> String {
    let mut out = String::new();
    if let Some(package) = package.map(str::trim).filter(|p| !p.is_empty()) {
        out.push_str(&format!("package {package};\n\n"));
    }
    out.push_str(&format!("public interface {name} {{\n"));
    for alias in aliases {
        out.push_str(&format!("    Object {}();\n", getter(alias)));
    }
    out.push('}');
    out
}

/// Aliases of `sql` rendered as a named projection interface.
pub fn projection(sql: &str, name: &str, package: Option<&str>) -> OctoResult<String> {
    let aliases = extract_aliases(sql)?;
    let name = interface_name(name)?;
    tracing::debug!(%name, aliases = aliases.len(), "generated projection");
    Ok(generate_interface(&name, package, &aliases))
}
