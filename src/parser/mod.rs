//! SQL/JPQL front end: tokenizer and clause segmenter.
//!
//! The parser only understands as much structure as the layout engine needs:
//! statements, top-level clauses, their items, and parenthesized groups.
//!
//! ```text
//! select u from User u where u.active = true and u.age > 18
//! └ Select [u] ─ From [User u] ─ Where [u.active = true] [and u.age > 18]
//! ```

pub mod clauses;
pub mod tokens;


use serde::Serialize;

use crate::error::OctoResult;

pub use clauses::{
    Clause, ClauseBody, ClauseKind, Comment, Constructor, Group, GroupBody, Item, Node, Script,
    Statement,
};
pub use tokens::{Token, TokenKind};

/// Query language of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// JPQL / HQL: enables constructor projections.
    #[default]
    Jpql,
    /// Native SQL.
    Native,
}

/// Tokenize and segment a logical query string.
pub fn parse(input: &str, dialect: Dialect) -> OctoResult<Script> {
    let tokens = tokens::tokenize(input)?;
    let script = clauses::segment(tokens, dialect)?;
    tracing::trace!(
        statements = script.statements.len(),
        ?dialect,
        "segmented query"
    );
    Ok(script)
}
