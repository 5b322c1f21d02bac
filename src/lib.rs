//! Syntax tree of the Plorth programming language.
//!
//! A parsed program is a sequence of [`Token`]s. Composite tokens hold their
//! children through shared [`TokenRef`] handles, and nothing is mutable once
//! constructed, so a finished tree may be shared freely between threads.
//!
//! ```
//! use plorth_ast::{Kind, Token};
//!
//! let tokens = plorth_ast::parse("<repl>", ": square dup * ; (1 2 +)").unwrap();
//! assert_eq!(tokens[0].kind(), Kind::Word);
//! assert!(matches!(tokens.last().map(|t| t.as_ref()), Some(Token::Quote(q)) if q.children().len() == 3));
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod position;

use std::sync::Arc;

pub use ast::{Array, Kind, Object, Property, Quote, Str, Symbol, Token, TokenRef, Word};
pub use error::{Error, Result};
pub use parser::Parser;
pub use position::Position;

/// Parse `input` with the default [`Parser`] settings
pub fn parse(source: impl Into<Arc<str>>, input: &str) -> Result<Vec<TokenRef>> {
    Parser::new(source).parse(input)
}
