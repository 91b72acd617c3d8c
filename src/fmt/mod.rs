//! Layout engine: renders a clause tree as indented query text.
//!
//! Output depends only on the token sequence and comment placement, never on
//! the original whitespace, so formatting is idempotent.

use crate::config::FormatConfig;
use crate::parser::clauses::{is_compound_predicate, split_predicates};
use crate::parser::{
    Clause, ClauseBody, ClauseKind, Comment, Constructor, Group, GroupBody, Item, Node, Script,
    Statement, Token, TokenKind,
};

#[cfg(test)]
mod tests;

/// Render a parsed script with the given layout rules.
pub fn format_script(script: &Script, config: &FormatConfig) -> String {
    Formatter::new(config).format(script)
}

/// Spacing state: the last thing written on a line.
#[derive(Debug, Clone)]
struct Prev {
    kind: TokenKind,
    upper: String,
    /// End offset in the source text, for adjacency checks.
    end: usize,
    unary: bool,
}

#[derive(Debug, Default)]
struct Line {
    indent: usize,
    code: String,
    /// Trailing `--` comment; nothing else may follow it on this line.
    comment: Option<String>,
    last: Option<Prev>,
}

impl Line {
    fn new(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }

    fn width(&self) -> usize {
        self.indent + self.code.chars().count()
    }

    /// Closed for further code: ends in a line comment or is a separator.
    fn is_closed(&self) -> bool {
        self.comment.is_some() || self.code.is_empty()
    }

    fn render(&self) -> String {
        if self.code.is_empty() && self.comment.is_none() {
            return String::new();
        }
        let mut out = " ".repeat(self.indent);
        out.push_str(&self.code);
        if let Some(comment) = &self.comment {
            if !self.code.is_empty() {
                out.push(' ');
            }
            out.push_str(comment);
        }
        out
    }
}

pub struct Formatter<'a> {
    config: &'a FormatConfig,
    lines: Vec<Line>,
    /// Indent of the line the next token must start.
    fresh: Option<usize>,
    /// Indent for wrapped continuation lines of the current item.
    cont_indent: usize,
    /// Measuring mode: everything on one line, nothing expands.
    flat: bool,
}

impl<'a> Formatter<'a> {
    pub fn new(config: &'a FormatConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            fresh: None,
            cont_indent: 0,
            flat: false,
        }
    }

    pub fn format(mut self, script: &Script) -> String {
        self.visit_script(script, 0);
        self.finish()
    }

    fn finish(self) -> String {
        let rendered: Vec<String> = self.lines.iter().map(Line::render).collect();
        rendered.join("\n").trim_end_matches('\n').to_string()
    }

    fn step(&self) -> usize {
        self.config.indent_width
    }

    fn visit_script(&mut self, script: &Script, indent: usize) {
        for (i, statement) in script.statements.iter().enumerate() {
            if i > 0 && !self.flat && !statement.is_comment_only() {
                self.lines.push(Line::default());
                self.fresh = None;
            }
            self.visit_statement(statement, indent);
        }
    }

    fn visit_statement(&mut self, statement: &Statement, indent: usize) {
        for clause in &statement.clauses {
            self.visit_clause(clause, indent);
        }
        if statement.terminated {
            self.attach(";");
        }
        for comment in &statement.trailing {
            self.comment(comment);
        }
    }

    fn visit_clause(&mut self, clause: &Clause, indent: usize) {
        for comment in &clause.leading {
            self.break_line(indent);
            self.comment(comment);
        }

        let items = match &clause.body {
            ClauseBody::Constructor(ctor) => {
                self.break_line(indent);
                for keyword in &clause.keywords {
                    self.token(keyword);
                }
                self.constructor(ctor, indent);
                self.trailing(clause, indent);
                return;
            }
            ClauseBody::Items(items) => items,
        };

        let merged;
        let items = if clause.kind == ClauseKind::From && !self.config.one_join_per_line {
            merged = merge_joins(items);
            merged.as_slice()
        } else {
            items.as_slice()
        };

        if clause.keywords.is_empty() {
            for item in items {
                self.item(item, indent);
            }
            self.trailing(clause, indent);
            return;
        }

        self.break_line(indent);
        for keyword in &clause.keywords {
            self.token(keyword);
        }
        match items {
            [] => {}
            [item] if self.fits_on_line(item) => {
                self.cont_indent = indent + self.step();
                self.nodes(&item.nodes);
                if item.comma {
                    self.attach(",");
                }
            }
            [first, rest @ ..] if clause.kind.is_predicate() => {
                self.cont_indent = indent + self.step();
                self.nodes(&first.nodes);
                for item in rest {
                    self.item(item, indent);
                }
            }
            _ => {
                for item in items {
                    self.item(item, indent + self.step());
                }
            }
        }
        self.trailing(clause, indent);
    }

    fn trailing(&mut self, clause: &Clause, indent: usize) {
        for comment in &clause.trailing {
            if comment.own_line {
                self.break_line(indent);
            }
            self.comment(comment);
        }
    }

    /// `NEW Type(` on the keyword line, one argument per line two levels
    /// deeper, `)` under `NEW`.
    fn constructor(&mut self, ctor: &Constructor, indent: usize) {
        self.token(&ctor.new);
        let new_col = self.current_width() - ctor.new.text.chars().count();
        for part in &ctor.type_name {
            self.token(part);
        }
        self.glue(&ctor.open);
        if ctor.args.is_empty() {
            self.glue(&ctor.close);
            return;
        }
        for arg in &ctor.args {
            self.item(arg, indent + 2 * self.step());
        }
        self.break_line(new_col);
        self.glue(&ctor.close);
    }

    /// One item on its own line. Leading inline comments stay on the
    /// previous line, own-line comments get their own lines.
    fn item(&mut self, item: &Item, indent: usize) {
        self.cont_indent = indent + self.step();
        let mut nodes = item.nodes.as_slice();
        while let [Node::Comment(comment), rest @ ..] = nodes {
            if comment.own_line {
                self.break_line(indent);
            }
            self.comment(comment);
            nodes = rest;
        }
        self.break_line(indent);
        self.nodes(nodes);
        if item.comma {
            self.attach(",");
        }
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Token(token) => match token.kind {
                    TokenKind::Comma | TokenKind::CloseParen | TokenKind::Semicolon => {
                        self.punct(token)
                    }
                    _ => self.token(token),
                },
                Node::Comment(comment) => self.comment(comment),
                Node::Group(group) => self.group(group),
            }
        }
    }

    fn group(&mut self, group: &Group) {
        match &group.body {
            GroupBody::Query(script) if !self.flat => {
                self.token(&group.open);
                let base = self.line_indent();
                let cont = self.cont_indent;
                self.visit_script(script, base + self.step());
                self.break_line(base);
                self.token(&group.close);
                self.cont_indent = cont;
            }
            GroupBody::Nodes(nodes) if !self.flat && self.overflows(group, nodes) => {
                self.token(&group.open);
                let base = self.line_indent();
                let cont = self.cont_indent;
                for operand in split_predicates(nodes.clone()) {
                    self.item(&operand, base + self.step());
                }
                self.break_line(base);
                self.token(&group.close);
                self.cont_indent = cont;
            }
            GroupBody::Query(script) => {
                self.token(&group.open);
                self.visit_script(script, 0);
                self.punct(&group.close);
            }
            GroupBody::Nodes(nodes) => {
                self.token(&group.open);
                self.nodes(nodes);
                self.punct(&group.close);
            }
        }
    }

    /// A compound predicate group too wide for the current line.
    fn overflows(&self, group: &Group, nodes: &[Node]) -> bool {
        if !is_compound_predicate(nodes) {
            return false;
        }
        let width = self.flat_width(std::slice::from_ref(&Node::Group(group.clone())));
        self.current_width() + 1 + width > self.config.max_line_width
    }

    fn fits_on_line(&self, item: &Item) -> bool {
        if self.flat {
            return true;
        }
        // a trailing `-- note` may stay at the end of the keyword line
        let core_len = item
            .nodes
            .iter()
            .rposition(|n| !matches!(n, Node::Comment(c) if !c.own_line))
            .map_or(0, |i| i + 1);
        let core = &item.nodes[..core_len];
        if core.iter().any(Node::has_comments) {
            return false;
        }
        core.iter()
            .any(|n| matches!(n, Node::Group(g) if g.is_query()))
            || self.current_width() + 1 + self.flat_width(core) <= self.config.max_line_width
    }

    fn flat_width(&self, nodes: &[Node]) -> usize {
        let mut flat = Formatter {
            config: self.config,
            lines: Vec::new(),
            fresh: None,
            cont_indent: 0,
            flat: true,
        };
        flat.nodes(nodes);
        flat.lines.iter().map(|l| l.code.chars().count()).sum()
    }

    fn current_width(&self) -> usize {
        match (self.fresh, self.lines.last()) {
            (Some(indent), _) => indent,
            (None, Some(line)) => line.width(),
            (None, None) => 0,
        }
    }

    fn line_indent(&self) -> usize {
        self.lines.last().map_or(0, |l| l.indent)
    }

    /// The next token starts a new line at `indent`.
    fn break_line(&mut self, indent: usize) {
        if !self.flat {
            self.fresh = Some(indent);
        }
    }

    fn ensure_line(&mut self) {
        if let Some(indent) = self.fresh.take() {
            self.lines.push(Line::new(indent));
            return;
        }
        match self.lines.last() {
            None => self.lines.push(Line::new(self.cont_indent)),
            Some(line) if line.is_closed() && !self.flat => {
                self.lines.push(Line::new(self.cont_indent))
            }
            _ => {}
        }
    }

    fn token(&mut self, token: &Token) {
        self.ensure_line();
        let text = match token.kind {
            TokenKind::Keyword => self.config.keyword_case.apply(&token.text),
            _ => token.text.clone(),
        };
        let Some(line) = self.lines.last_mut() else {
            return;
        };
        if line.last.as_ref().is_some_and(|prev| space_between(prev, token)) {
            line.code.push(' ');
        }
        line.code.push_str(&text);
        line.last = Some(Prev::of(line.last.as_ref(), token));
    }

    /// Append without a leading space.
    fn glue(&mut self, token: &Token) {
        self.ensure_line();
        if let Some(line) = self.lines.last_mut() {
            line.code.push_str(&token.text);
            line.last = Some(Prev::of(None, token));
        }
    }

    /// `,` `)` `;` go before a trailing line comment rather than after it.
    fn punct(&mut self, token: &Token) {
        let closed = self.fresh.is_none()
            && !self.flat
            && self.lines.last().is_some_and(Line::is_closed);
        if closed {
            self.attach(&token.text);
        } else {
            self.token(token);
        }
    }

    /// Append to the last line that holds code.
    fn attach(&mut self, text: &str) {
        match self.lines.iter_mut().rev().find(|l| !l.code.is_empty()) {
            Some(line) => {
                line.code.push_str(text);
                line.last = Some(Prev::punct(text));
            }
            None => {
                self.ensure_line();
                if let Some(line) = self.lines.last_mut() {
                    line.code.push_str(text);
                    line.last = Some(Prev::punct(text));
                }
            }
        }
    }

    fn comment(&mut self, comment: &Comment) {
        if self.flat {
            self.ensure_line();
        } else if comment.own_line {
            let indent = self.fresh.take().unwrap_or(self.cont_indent);
            self.lines.push(Line::new(indent));
        } else {
            self.ensure_line();
        }
        let Some(line) = self.lines.last_mut() else {
            return;
        };
        if comment.is_line() && !self.flat {
            line.comment = Some(comment.text().trim_end().to_string());
        } else {
            if !line.code.is_empty() {
                line.code.push(' ');
            }
            line.code.push_str(comment.text());
            line.last = Some(Prev {
                kind: comment.token.kind,
                upper: String::new(),
                end: usize::MAX,
                unary: false,
            });
        }
    }
}

impl Prev {
    fn of(prev: Option<&Prev>, token: &Token) -> Self {
        Self {
            kind: token.kind,
            upper: token.text.to_ascii_uppercase(),
            end: token.offset + token.text.len(),
            unary: is_unary(prev, token),
        }
    }

    fn punct(text: &str) -> Self {
        let kind = match text {
            "," => TokenKind::Comma,
            ";" => TokenKind::Semicolon,
            _ => TokenKind::CloseParen,
        };
        Self {
            kind,
            upper: text.to_string(),
            end: usize::MAX,
            unary: false,
        }
    }
}

/// A `+`/`-` that starts an operand rather than joining two.
fn is_unary(prev: Option<&Prev>, token: &Token) -> bool {
    if token.kind != TokenKind::Operator || !matches!(token.text.as_str(), "-" | "+") {
        return false;
    }
    match prev {
        None => true,
        Some(p) => match p.kind {
            TokenKind::Operator | TokenKind::OpenParen | TokenKind::Comma => true,
            TokenKind::Keyword => !matches!(p.upper.as_str(), "END" | "NULL" | "TRUE" | "FALSE"),
            _ => false,
        },
    }
}

fn space_between(prev: &Prev, next: &Token) -> bool {
    use TokenKind::*;

    // never glue `-` `-` or `/` `*` into a comment opener
    if (prev.upper.ends_with('-') && next.text.starts_with('-'))
        || (prev.upper.ends_with('/') && next.text.starts_with('*'))
    {
        return true;
    }
    if matches!(next.kind, Comma | CloseParen | Dot | Semicolon) {
        return false;
    }
    if matches!(prev.kind, OpenParen | Dot) || prev.unary {
        return false;
    }
    if next.text == "::" || prev.upper == "::" || next.text == "]" || prev.upper == "[" {
        return false;
    }

    let adjacent = prev.end == next.offset;
    match next.kind {
        OpenParen => match prev.kind {
            Identifier | QuotedIdentifier => !adjacent,
            Keyword if matches!(prev.upper.as_str(), "LEFT" | "RIGHT") => !adjacent,
            _ => true,
        },
        // E'...', N'...', X'...'
        String if prev.kind == Identifier => !adjacent,
        Operator if next.text == "[" => !adjacent,
        _ => true,
    }
}

fn merge_joins(items: &[Item]) -> Vec<Item> {
    let mut merged: Vec<Item> = Vec::with_capacity(items.len());
    for item in items {
        match merged.last_mut() {
            Some(prev) if item.is_join() && !prev.comma => {
                prev.nodes.extend(item.nodes.iter().cloned());
                prev.comma = item.comma;
            }
            _ => merged.push(item.clone()),
        }
    }
    merged
}
