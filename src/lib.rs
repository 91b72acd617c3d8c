//! # octoquery: formatter for embedded SQL and JPQL
//!
//! Formats the query text inside `@Query`-style annotation literals in Java,
//! Kotlin and Python sources, and standalone `.sql` files.
//!
//! ## Quick Example
//!
//! ```
//! use octoquery::prelude::*;
//!
//! let source = r#"@Query("select u from User u where u.active = true and u.age > 18")"#;
//! let buffer = SourceBuffer::new(BufferId(1), source);
//! let mode = SourceMode::Annotated {
//!     language: HostLanguage::Java,
//!     annotations: AnnotationSet::default(),
//! };
//!
//! let outcome = format_source(&buffer, &mode, &FormatConfig::default());
//! let formatted = apply_edits(source, &outcome.edits).unwrap();
//! assert!(formatted.contains(r"\nWHERE u.active = TRUE\nAND u.age > 18"));
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module             | Produces                         |
//! |------------|--------------------|----------------------------------|
//! | Locate     | [`locator`]        | literal fragments in host source |
//! | Decode     | [`codec`]          | logical query text + style hints |
//! | Lex        | [`parser::tokens`] | tokens, comments kept            |
//! | Segment    | [`parser::clauses`]| statements, clauses, items       |
//! | Lay out    | [`fmt`]            | formatted query text             |
//! | Encode     | [`codec`]          | replacement literal source       |
//! | Patch      | [`patch`]          | minimal edits                    |

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod locator;
pub mod parser;
pub mod patch;
pub mod projection;
pub mod span;

pub mod prelude {
    pub use crate::config::{AnnotationSet, ConfigFile, FormatConfig, KeywordCase};
    pub use crate::engine::{Diagnostic, FormatOutcome, format_query, format_source};
    pub use crate::error::*;
    pub use crate::locator::{HostLanguage, SourceMode};
    pub use crate::parser::Dialect;
    pub use crate::patch::{FormattingEdit, apply_edits};
    pub use crate::span::{BufferId, SourceBuffer, SourceSpan};
}

pub use engine::{format_query, format_source};
