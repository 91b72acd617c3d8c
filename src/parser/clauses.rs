//! Clause segmentation.
//!
//! Turns the flat token stream into `Script → Statement → Clause → Item →
//! Node`. Parentheses are the only structure that is validated; every
//! parenthesized region becomes a [`Group`], and groups that start with
//! `SELECT` or `WITH` are segmented recursively as their own script.

use std::collections::VecDeque;

use super::Dialect;
use super::tokens::{Token, TokenKind};
use crate::error::{OctoError, OctoResult};

/// Keywords that may open a join run (`LEFT OUTER JOIN`, `NATURAL JOIN`, ...).
const JOIN_PREFIX: &[&str] = &["NATURAL", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub token: Token,
    /// The comment was the first thing on its line.
    pub own_line: bool,
}

impl Comment {
    pub fn is_line(&self) -> bool {
        self.token.kind == TokenKind::LineComment
    }

    pub fn text(&self) -> &str {
        &self.token.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Token(Token),
    Comment(Comment),
    Group(Group),
}

impl Node {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        self.as_token().is_some_and(|t| t.is_any_keyword(keywords))
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.as_token().is_some_and(|t| t.kind == kind)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn has_comments(&self) -> bool {
        match self {
            Node::Token(_) => false,
            Node::Comment(_) => true,
            Node::Group(group) => group.has_comments(),
        }
    }
}

/// A parenthesized region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub open: Token,
    pub body: GroupBody,
    pub close: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBody {
    /// Subquery or CTE body.
    Query(Script),
    /// Argument list, value tuple, grouped predicate...
    Nodes(Vec<Node>),
}

impl Group {
    pub fn is_query(&self) -> bool {
        matches!(self.body, GroupBody::Query(_))
    }

    pub fn has_comments(&self) -> bool {
        match &self.body {
            GroupBody::Query(script) => script.has_comments(),
            GroupBody::Nodes(nodes) => nodes.iter().any(Node::has_comments),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn has_comments(&self) -> bool {
        self.statements.iter().any(|s| {
            !s.trailing.is_empty()
                || s.clauses.iter().any(|c| {
                    !c.leading.is_empty()
                        || !c.trailing.is_empty()
                        || match &c.body {
                            ClauseBody::Items(items) => items.iter().any(Item::has_comments),
                            ClauseBody::Constructor(ctor) => {
                                ctor.args.iter().any(Item::has_comments)
                            }
                        }
                })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
    /// Ended with `;`.
    pub terminated: bool,
    /// Comments on the same line after the `;`.
    pub trailing: Vec<Comment>,
}

impl Statement {
    /// Holds nothing but comments (e.g. notes after the last `;`).
    pub fn is_comment_only(&self) -> bool {
        self.clauses.iter().all(|c| {
            c.keywords.is_empty()
                && match &c.body {
                    ClauseBody::Items(items) => items
                        .iter()
                        .all(|i| !i.comma && i.nodes.iter().all(Node::is_comment)),
                    ClauseBody::Constructor(_) => false,
                }
        }) && !self.terminated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// Tokens before the first clause keyword.
    Preamble,
    With,
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    /// `UNION`, `INTERSECT`, `EXCEPT`
    SetOperation,
    Limit,
    Offset,
    Update,
    Set,
    Delete,
    Insert,
    Values,
}

impl ClauseKind {
    pub fn is_comma_list(self) -> bool {
        matches!(
            self,
            ClauseKind::With
                | ClauseKind::Select
                | ClauseKind::GroupBy
                | ClauseKind::OrderBy
                | ClauseKind::Update
                | ClauseKind::Set
                | ClauseKind::Insert
                | ClauseKind::Values
        )
    }

    pub fn is_predicate(self) -> bool {
        matches!(self, ClauseKind::Where | ClauseKind::Having)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub kind: ClauseKind,
    /// `GROUP BY` is two tokens; the preamble has none.
    pub keywords: Vec<Token>,
    /// Own-line comments printed above the keyword.
    pub leading: Vec<Comment>,
    pub body: ClauseBody,
    /// Own-line comments after the last clause of a statement.
    pub trailing: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseBody {
    Items(Vec<Item>),
    Constructor(Constructor),
}

/// `new com.example.Dto(arg, ...)` projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub new: Token,
    /// Dotted type name: identifiers and dots.
    pub type_name: Vec<Token>,
    pub open: Token,
    pub args: Vec<Item>,
    pub close: Token,
}

impl Constructor {
    pub fn type_name(&self) -> String {
        self.type_name.iter().map(|t| t.text.as_str()).collect()
    }
}

/// One column, table reference, join, assignment or predicate operand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub nodes: Vec<Node>,
    /// Followed by a `,` in the source.
    pub comma: bool,
}

impl Item {
    pub fn has_comments(&self) -> bool {
        self.nodes.iter().any(Node::has_comments)
    }

    pub fn has_subquery(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, Node::Group(g) if g.is_query()))
    }

    /// Starts with a join run such as `LEFT OUTER JOIN`.
    pub fn is_join(&self) -> bool {
        let significant: Vec<&Node> = self.nodes.iter().filter(|n| !n.is_comment()).collect();
        join_run_at(&significant, 0)
    }
}

/// Segment a token stream. Fails only on unbalanced parentheses.
pub fn segment(tokens: Vec<Token>, dialect: Dialect) -> OctoResult<Script> {
    let nodes = build_nodes(tokens, dialect)?;
    Ok(split_statements(nodes, dialect))
}

struct Frame {
    open: Option<Token>,
    nodes: Vec<Node>,
}

fn build_nodes(tokens: Vec<Token>, dialect: Dialect) -> OctoResult<Vec<Node>> {
    let mut stack = vec![Frame {
        open: None,
        nodes: Vec::new(),
    }];
    let mut line_start = true;

    for token in tokens {
        match token.kind {
            TokenKind::Whitespace => {
                if token.text.contains('\n') {
                    line_start = true;
                }
                continue;
            }
            TokenKind::OpenParen => stack.push(Frame {
                open: Some(token),
                nodes: Vec::new(),
            }),
            TokenKind::CloseParen => {
                let frame = match stack.pop() {
                    Some(Frame {
                        open: Some(open),
                        nodes,
                    }) => (open, nodes),
                    _ => return Err(OctoError::structural(token.offset, "unmatched ')'")),
                };
                let (open, nodes) = frame;
                let group = make_group(open, nodes, token, dialect);
                if let Some(parent) = stack.last_mut() {
                    parent.nodes.push(Node::Group(group));
                }
            }
            TokenKind::LineComment | TokenKind::BlockComment => {
                if let Some(frame) = stack.last_mut() {
                    frame.nodes.push(Node::Comment(Comment {
                        token,
                        own_line: line_start,
                    }));
                }
            }
            _ => {
                if let Some(frame) = stack.last_mut() {
                    frame.nodes.push(Node::Token(token));
                }
            }
        }
        line_start = false;
    }

    match stack.pop() {
        Some(Frame { open: None, nodes }) if stack.is_empty() => Ok(nodes),
        Some(Frame {
            open: Some(open), ..
        }) => Err(OctoError::structural(open.offset, "unclosed '('")),
        _ => {
            let offset = stack
                .iter()
                .find_map(|f| f.open.as_ref().map(|t| t.offset))
                .unwrap_or(0);
            Err(OctoError::structural(offset, "unclosed '('"))
        }
    }
}

fn make_group(open: Token, nodes: Vec<Node>, close: Token, dialect: Dialect) -> Group {
    let is_query = nodes
        .iter()
        .find(|n| !n.is_comment())
        .is_some_and(|n| n.is_keyword("SELECT") || n.is_keyword("WITH"));
    let body = if is_query {
        GroupBody::Query(split_statements(nodes, dialect))
    } else {
        GroupBody::Nodes(nodes)
    };
    Group { open, body, close }
}

fn split_statements(nodes: Vec<Node>, dialect: Dialect) -> Script {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    let mut nodes = nodes.into_iter().peekable();

    while let Some(node) = nodes.next() {
        if !node.is_kind(TokenKind::Semicolon) {
            current.push(node);
            continue;
        }
        let mut trailing = Vec::new();
        while let Some(Node::Comment(comment)) =
            nodes.next_if(|n| matches!(n, Node::Comment(c) if !c.own_line))
        {
            trailing.push(comment);
        }
        statements.push(build_statement(
            std::mem::take(&mut current),
            true,
            trailing,
            dialect,
        ));
    }
    if !current.is_empty() {
        statements.push(build_statement(current, false, Vec::new(), dialect));
    }

    Script { statements }
}

fn build_statement(
    nodes: Vec<Node>,
    terminated: bool,
    trailing: Vec<Comment>,
    dialect: Dialect,
) -> Statement {
    let clauses = split_clauses(nodes)
        .into_iter()
        .map(|raw| finish_clause(raw, dialect))
        .collect();
    Statement {
        clauses,
        terminated,
        trailing,
    }
}

struct RawClause {
    kind: ClauseKind,
    keywords: Vec<Token>,
    leading: Vec<Comment>,
    body: Vec<Node>,
}

impl RawClause {
    fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.leading.is_empty() && self.body.is_empty()
    }
}

fn split_clauses(nodes: Vec<Node>) -> Vec<RawClause> {
    let mut nodes: VecDeque<Node> = nodes.into();
    let mut clauses = Vec::new();
    let mut current = RawClause {
        kind: ClauseKind::Preamble,
        keywords: Vec::new(),
        leading: Vec::new(),
        body: Vec::new(),
    };
    let mut prev: Option<Token> = None;
    let mut started = false;

    while let Some(node) = nodes.pop_front() {
        let node = match node {
            Node::Token(token) => match clause_start(&token, &nodes, prev.as_ref(), started) {
                Some((kind, extra)) => {
                    let mut keywords = vec![token];
                    for _ in 0..extra {
                        if let Some(Node::Token(next)) = nodes.pop_front() {
                            keywords.push(next);
                        }
                    }
                    let leading = into_comments(take_trailing_comments(&mut current.body));
                    let finished = std::mem::replace(
                        &mut current,
                        RawClause {
                            kind,
                            keywords,
                            leading,
                            body: Vec::new(),
                        },
                    );
                    if !finished.is_empty() {
                        clauses.push(finished);
                    }
                    prev = current.keywords.last().cloned();
                    started = true;
                    continue;
                }
                None => Node::Token(token),
            },
            other => other,
        };

        match &node {
            Node::Token(token) => {
                prev = Some(token.clone());
                started = true;
            }
            Node::Group(_) => {
                prev = None;
                started = true;
            }
            Node::Comment(_) => {}
        }
        current.body.push(node);
    }

    if !current.is_empty() {
        clauses.push(current);
    }
    clauses
}

/// Recognize a clause keyword at `token`; returns the kind and how many
/// further keyword tokens belong to it.
fn clause_start(
    token: &Token,
    rest: &VecDeque<Node>,
    prev: Option<&Token>,
    started: bool,
) -> Option<(ClauseKind, usize)> {
    if token.kind != TokenKind::Keyword {
        return None;
    }
    let next_is = |i: usize, words: &[&str]| rest.get(i).is_some_and(|n| n.is_any_keyword(words));
    let prev_is = |words: &[&str]| {
        prev.is_some_and(|t| words.iter().any(|w| t.text.eq_ignore_ascii_case(w)))
    };
    let optional = |words: &[&str]| usize::from(next_is(0, words));

    let start = match token.text.to_ascii_uppercase().as_str() {
        "WITH" if !started => (ClauseKind::With, optional(&["RECURSIVE"])),
        "SELECT" => (ClauseKind::Select, optional(&["DISTINCT", "ALL"])),
        "FROM" if !prev_is(&["DISTINCT"]) => (ClauseKind::From, 0),
        "WHERE" => (ClauseKind::Where, 0),
        "GROUP" if next_is(0, &["BY"]) => (ClauseKind::GroupBy, 1),
        "HAVING" => (ClauseKind::Having, 0),
        "ORDER" if next_is(0, &["BY"]) => (ClauseKind::OrderBy, 1),
        "UNION" => (ClauseKind::SetOperation, optional(&["ALL", "DISTINCT"])),
        "INTERSECT" | "EXCEPT" => (ClauseKind::SetOperation, optional(&["ALL"])),
        "LIMIT" => (ClauseKind::Limit, 0),
        "OFFSET" => (ClauseKind::Offset, 0),
        "UPDATE" if !prev_is(&["FOR", "DO", "ON"]) => (ClauseKind::Update, 0),
        "SET" => (ClauseKind::Set, 0),
        "DELETE" if !prev_is(&["ON"]) => (ClauseKind::Delete, optional(&["FROM"])),
        "INSERT" => (ClauseKind::Insert, optional(&["INTO"])),
        "VALUES" => (ClauseKind::Values, 0),
        _ => return None,
    };
    Some(start)
}

/// Remove the run of comments at the end of `nodes`, starting at the first
/// own-line comment of that run.
fn take_trailing_comments(nodes: &mut Vec<Node>) -> Vec<Node> {
    let run_start = nodes
        .iter()
        .rposition(|n| !n.is_comment())
        .map_or(0, |i| i + 1);
    let first_own_line = nodes[run_start..]
        .iter()
        .position(|n| matches!(n, Node::Comment(c) if c.own_line));
    match first_own_line {
        Some(pos) => nodes.split_off(run_start + pos),
        None => Vec::new(),
    }
}

fn finish_clause(mut raw: RawClause, dialect: Dialect) -> Clause {
    let trailing = into_comments(take_trailing_comments(&mut raw.body));
    let constructor = if raw.kind == ClauseKind::Select && dialect == Dialect::Jpql {
        constructor(&raw.body)
    } else {
        None
    };
    let body = match constructor {
        Some(ctor) => ClauseBody::Constructor(ctor),
        None => ClauseBody::Items(split_items(raw.kind, raw.body)),
    };
    Clause {
        kind: raw.kind,
        keywords: raw.keywords,
        leading: raw.leading,
        body,
        trailing,
    }
}

fn into_comments(nodes: Vec<Node>) -> Vec<Comment> {
    nodes
        .into_iter()
        .filter_map(|n| match n {
            Node::Comment(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Match a body that is exactly `new <dotted-identifier>(<args>)`.
fn constructor(body: &[Node]) -> Option<Constructor> {
    let (Node::Token(new), rest) = body.split_first()? else {
        return None;
    };
    let (Node::Group(group), name) = rest.split_last()? else {
        return None;
    };
    if !new.is_keyword("NEW") || name.is_empty() {
        return None;
    }
    let GroupBody::Nodes(args) = &group.body else {
        return None;
    };

    let mut type_name = Vec::with_capacity(name.len());
    for (i, node) in name.iter().enumerate() {
        let expected = if i % 2 == 0 {
            TokenKind::Identifier
        } else {
            TokenKind::Dot
        };
        match node {
            Node::Token(t) if t.kind == expected => type_name.push(t.clone()),
            _ => return None,
        }
    }
    if name.len() % 2 == 0 {
        // ends with a dot
        return None;
    }

    Some(Constructor {
        new: new.clone(),
        type_name,
        open: group.open.clone(),
        args: split_commas(args.clone()),
        close: group.close.clone(),
    })
}

enum Cut {
    /// Drop this node and end the current item with a comma.
    Comma,
    /// Start a new item with this node.
    Before,
}

fn split_items(kind: ClauseKind, body: Vec<Node>) -> Vec<Item> {
    if kind.is_comma_list() {
        return split_commas(body);
    }
    let cuts = match kind {
        ClauseKind::From => from_cuts(&body),
        ClauseKind::Where | ClauseKind::Having => predicate_cuts(&body),
        _ => body.iter().map(|_| None).collect(),
    };
    split_at(body, cuts)
}

/// Split at commas that are not nested in parentheses.
pub(crate) fn split_commas(nodes: Vec<Node>) -> Vec<Item> {
    let cuts = nodes
        .iter()
        .map(|n| n.is_kind(TokenKind::Comma).then_some(Cut::Comma))
        .collect();
    split_at(nodes, cuts)
}

/// Split a predicate at top-level `AND`/`OR`; the operator leads each item.
pub(crate) fn split_predicates(nodes: Vec<Node>) -> Vec<Item> {
    let cuts = predicate_cuts(&nodes);
    split_at(nodes, cuts)
}

/// Has a top-level `AND`/`OR` that would split it.
pub(crate) fn is_compound_predicate(nodes: &[Node]) -> bool {
    predicate_cuts(nodes)
        .iter()
        .any(|c| matches!(c, Some(Cut::Before)))
}

fn from_cuts(nodes: &[Node]) -> Vec<Option<Cut>> {
    let significant: Vec<&Node> = nodes.iter().filter(|n| !n.is_comment()).collect();
    let mut sig_index = 0;
    nodes
        .iter()
        .map(|node| {
            if node.is_comment() {
                return None;
            }
            let i = sig_index;
            sig_index += 1;
            if node.is_kind(TokenKind::Comma) {
                return Some(Cut::Comma);
            }
            let continues_run = i > 0 && significant[i - 1].is_any_keyword(JOIN_PREFIX);
            (i > 0 && !continues_run && join_run_at(&significant, i)).then_some(Cut::Before)
        })
        .collect()
}

/// A run of join prefixes ending in `JOIN` starts at `i`.
fn join_run_at(nodes: &[&Node], i: usize) -> bool {
    let mut j = i;
    while nodes.get(j).is_some_and(|n| n.is_any_keyword(JOIN_PREFIX)) {
        j += 1;
    }
    nodes.get(j).is_some_and(|n| n.is_keyword("JOIN"))
}

fn predicate_cuts(nodes: &[Node]) -> Vec<Option<Cut>> {
    let mut case_depth = 0usize;
    let mut in_between = false;
    let mut seen_token = false;

    nodes
        .iter()
        .map(|node| {
            let Node::Token(token) = node else {
                if !node.is_comment() {
                    seen_token = true;
                }
                return None;
            };
            let first = !seen_token;
            seen_token = true;
            if token.is_keyword("CASE") {
                case_depth += 1;
            } else if token.is_keyword("END") && case_depth > 0 {
                case_depth -= 1;
            } else if token.is_keyword("BETWEEN") && case_depth == 0 {
                in_between = true;
            } else if token.is_keyword("AND") && case_depth == 0 {
                if in_between {
                    in_between = false;
                } else if !first {
                    return Some(Cut::Before);
                }
            } else if token.is_keyword("OR") && case_depth == 0 && !first {
                return Some(Cut::Before);
            }
            None
        })
        .collect()
}

/// `cuts` holds one entry per node.
fn split_at(nodes: Vec<Node>, cuts: Vec<Option<Cut>>) -> Vec<Item> {
    debug_assert_eq!(nodes.len(), cuts.len(), "every node needs a cut decision");
    let mut items = Vec::new();
    let mut current = Item::default();

    for (node, cut) in nodes.into_iter().zip(cuts) {
        match cut {
            Some(Cut::Comma) => {
                current.comma = true;
                items.push(std::mem::take(&mut current));
            }
            Some(Cut::Before) => {
                let moved = take_trailing_comments(&mut current.nodes);
                if !current.nodes.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
                current.nodes = moved;
                current.nodes.push(node);
            }
            None => current.nodes.push(node),
        }
    }
    if !current.nodes.is_empty() {
        items.push(current);
    }
    items
}
