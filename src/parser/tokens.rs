//! SQL/JPQL tokenizer built from nom combinators.
//!
//! The lexer is forgiving: anything it does not recognize becomes a
//! single-character operator token. Only unterminated strings, quoted
//! identifiers and block comments are errors.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{not, opt, recognize},
    multi::many0,
    sequence::{pair, terminated, tuple},
    IResult,
};

use crate::error::{OctoError, OctoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    /// `"name"` or `` `name` ``
    QuotedIdentifier,
    Operator,
    Comma,
    OpenParen,
    CloseParen,
    Dot,
    Semicolon,
    String,
    Number,
    /// `:name`, `?`, `?1`, `$1`, `:#{...}`
    Parameter,
    LineComment,
    BlockComment,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset in the logical query text.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_trivia(&self) -> bool {
        self.kind == TokenKind::Whitespace || self.is_comment()
    }
}

/// Words recognized as keywords (case-insensitive) unless they touch a `.`.
pub const KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DELETE", "DESC",
    "DISTINCT", "ELSE", "EMPTY", "END", "ESCAPE", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FIRST",
    "FROM", "FULL", "GROUP", "HAVING", "ILIKE", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS",
    "JOIN", "LAST", "LEFT", "LIKE", "LIMIT", "MEMBER", "NATURAL", "NEW", "NOT", "NULL", "NULLS",
    "OF", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "RECURSIVE", "RIGHT",
    "SELECT", "SET", "SOME", "THEN", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHEN",
    "WHERE", "WITH",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tokenize logical query text. Whitespace and comments are kept as tokens.
pub fn tokenize(input: &str) -> OctoResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = input.len() - rest.len();
        let prev = input[..offset].chars().next_back();
        let (remaining, kind, text) = next_token(rest, offset, prev)?;
        tokens.push(Token::new(kind, text, offset));
        rest = remaining;
    }

    refine_keywords(&mut tokens);
    tracing::trace!(count = tokens.len(), "tokenized query");
    Ok(tokens)
}

/// Demote context-dependent keywords that are used as names, so that
/// `FROM Order o` or `SELECT first FROM` keep the identifier's case.
fn refine_keywords(tokens: &mut [Token]) {
    let significant: Vec<usize> = (0..tokens.len())
        .filter(|&i| !tokens[i].is_trivia())
        .collect();

    let mut demote = Vec::new();
    for (pos, &index) in significant.iter().enumerate() {
        let token = &tokens[index];
        if token.kind != TokenKind::Keyword {
            continue;
        }
        let prev = pos
            .checked_sub(1)
            .and_then(|p| significant.get(p))
            .map(|&i| &tokens[i]);
        let next = significant.get(pos + 1).map(|&i| &tokens[i]);
        let prev_is = |words: &[&str]| prev.is_some_and(|t| t.is_any_keyword(words));
        let next_is = |words: &[&str]| next.is_some_and(|t| t.is_any_keyword(words));

        let keep = match token.text.to_ascii_uppercase().as_str() {
            "ORDER" | "GROUP" | "PARTITION" => next_is(&["BY"]),
            "NULLS" => next_is(&["FIRST", "LAST"]),
            "FIRST" | "LAST" => prev_is(&["NULLS", "FETCH"]),
            "MEMBER" => next_is(&["OF"]),
            "OF" => prev_is(&["MEMBER"]),
            "EMPTY" => prev_is(&["IS", "NOT"]),
            "OVER" => next.is_some_and(|t| t.kind == TokenKind::OpenParen),
            _ => true,
        };
        if !keep {
            demote.push(index);
        }
    }
    for index in demote {
        tokens[index].kind = TokenKind::Identifier;
    }
}

fn next_token(
    input: &str,
    offset: usize,
    prev: Option<char>,
) -> OctoResult<(&str, TokenKind, &str)> {
    if input.starts_with("/*") {
        let (rest, text) = block_comment(input)
            .map_err(|_| OctoError::lexical(offset, "unterminated block comment"))?;
        return Ok((rest, TokenKind::BlockComment, text));
    }

    match input.chars().next() {
        Some('\'') => {
            let (rest, text) = string_literal(input)
                .map_err(|_| OctoError::lexical(offset, "unterminated string literal"))?;
            return Ok((rest, TokenKind::String, text));
        }
        Some('"') => {
            let (rest, text) = double_quoted(input)
                .map_err(|_| OctoError::lexical(offset, "unterminated quoted identifier"))?;
            return Ok((rest, TokenKind::QuotedIdentifier, text));
        }
        Some('`') => {
            let (rest, text) = backtick_quoted(input)
                .map_err(|_| OctoError::lexical(offset, "unterminated quoted identifier"))?;
            return Ok((rest, TokenKind::QuotedIdentifier, text));
        }
        _ => {}
    }

    if let Ok((rest, text)) = multispace1::<_, nom::error::Error<&str>>(input) {
        return Ok((rest, TokenKind::Whitespace, text));
    }
    if let Ok((rest, text)) = line_comment(input) {
        return Ok((rest, TokenKind::LineComment, text));
    }
    if let Ok((rest, text)) = number(input) {
        return Ok((rest, TokenKind::Number, text));
    }
    if let Ok((rest, text)) = parameter(input) {
        return Ok((rest, TokenKind::Parameter, text));
    }
    if let Ok((rest, text)) = word(input) {
        let touches_dot = prev == Some('.') || rest.starts_with('.');
        let kind = if !touches_dot && is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        return Ok((rest, kind, text));
    }
    if let Ok((rest, text)) = punctuation(input) {
        let kind = match text {
            "(" => TokenKind::OpenParen,
            ")" => TokenKind::CloseParen,
            "," => TokenKind::Comma,
            "." => TokenKind::Dot,
            _ => TokenKind::Semicolon,
        };
        return Ok((rest, kind, text));
    }
    if let Ok((rest, text)) = operator(input) {
        return Ok((rest, TokenKind::Operator, text));
    }

    // Unknown character: keep it verbatim as an operator.
    let (rest, text) = recognize(anychar::<_, nom::error::Error<&str>>)(input)
        .map_err(|_| OctoError::lexical(offset, "unexpected end of input"))?;
    Ok((rest, TokenKind::Operator, text))
}

/// `-- ...` up to (not including) the line break.
fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), take_while(|c| c != '\n' && c != '\r')))(input)
}

/// `/* ... */`, not nested.
fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// `'...'` with `''` as the embedded quote.
fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('\''),
        many0(alt((is_not("'"), tag("''")))),
        char('\''),
    )))(input)
}

fn double_quoted(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('"'),
        many0(alt((is_not("\""), tag("\"\"")))),
        char('"'),
    )))(input)
}

fn backtick_quoted(input: &str) -> IResult<&str, &str> {
    recognize(tuple((char('`'), take_while(|c| c != '`'), char('`'))))(input)
}

/// `42`, `3.14`, `1e-9`, `10L`; must not run into a word (`2nd` is a word).
fn number(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit0)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            opt(one_of("lLfFdD")),
        ))),
        not(satisfy(is_word_char)),
    )(input)
}

fn parameter(input: &str) -> IResult<&str, &str> {
    alt((
        // SpEL: :#{...} or ?#{...}
        recognize(tuple((one_of(":?"), tag("#{"), take_until("}"), char('}')))),
        recognize(pair(char(':'), take_while1(is_word_char))),
        recognize(pair(char('?'), digit0)),
        recognize(pair(char('$'), digit1)),
    ))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char)(input)
}

fn punctuation(input: &str) -> IResult<&str, &str> {
    recognize(one_of("(),.;"))(input)
}

fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("<>"),
            tag("!="),
            tag("<="),
            tag(">="),
            tag("||"),
            tag("::"),
            tag("->>"),
            tag("->"),
            tag("#>>"),
            tag("@>"),
            tag("<@"),
        )),
        recognize(one_of("=<>+-*/%!^&|~[]{}:@#")),
    ))(input)
}
