//! Parser for JavaScript source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//!
//! ## Structure
//!
//! - `parser` - Parser state, token helpers and statement dispatch
//! - `statements` - Statements, declarations, import/export
//! - `expressions` - Expressions and binding patterns
//!
//! ## Usage
//!
//! ```rust
//! use modshim_syntax::parser::Parser;
//!
//! let mut parser = Parser::new("exports.answer = 42;");
//! let program = parser.parse_program().expect("Should parse");
//! assert_eq!(program.body.len(), 1);
//! ```
//!
//! For ECMAScript modules:
//!
//! ```rust
//! use modshim_syntax::parser::Parser;
//!
//! let mut parser = Parser::new_module("export const answer = 42;");
//! let program = parser.parse_program().expect("Should parse");
//! ```

#[allow(clippy::module_inception)]
mod parser;

mod expressions;
mod statements;

pub use parser::Parser;
