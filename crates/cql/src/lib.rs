//! Contextual Query Language support for the codex multiplexer.
//!
//! Only what federation needs is implemented: parsing a CQL 1.2 query with an
//! optional `sortby` clause, serializing it back, and a few operations over
//! the boolean tree under an assumed term:
//!
//! - [`could_be_true`]: 3-valued evaluation, `false` only when the query is
//!   unsatisfiable given the assumption.
//! - [`simplify`]: substitutes decided terms and folds the constants.
//! - [`reduce`]: eliminates every clause the matcher relates to the assumed
//!   term, collapsing the tree around it.
//!
//! ```
//! use mux_cql::{could_be_true, exact_equal, fuzzy_equal, CqlQuery, TermNode};
//!
//! let query: CqlQuery = "topic=y and source=kb".parse().unwrap();
//! let kb = TermNode::new("source", "=", "kb");
//!
//! assert!(could_be_true(&query, &kb, fuzzy_equal));
//! assert_eq!(query.reduce(&kb, exact_equal).to_cql().as_deref(), Some("topic=y"));
//! ```

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod reduce;

pub use ast::{BooleanOp, CqlNode, CqlQuery, Modifier, Relation, SortKey, TermNode};
pub use error::CqlError;
pub use eval::{could_be_true, evaluate, exact_equal, fuzzy_equal, TermMatcher, Truth};
pub use reduce::{reduce, simplify, Simplified};

/// Index name assumed for a bare search term.
pub const SERVER_CHOICE: &str = "cql.serverChoice";

/// Clause standing in for a fully eliminated tree.
pub const ALL_RECORDS: &str = "cql.allRecords";
