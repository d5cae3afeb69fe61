// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # modshim-syntax
//!
//! JavaScript front end for the modshim interop analyzer.
//!
//! ## Overview
//!
//! This crate provides:
//! - A lexer for ECMAScript 2024 source text
//! - A recursive descent parser for both script (CommonJS) and module goals
//! - A span-carrying AST and a read-only [`ast::Visitor`]
//! - [`LineIndex`] for turning byte offsets into line/column pairs
//! - [`bindings`] for collision-free name generation in codemods
//!
//! ## Quick Start
//!
//! ```rust
//! use modshim_syntax::{parse_script, ast::Statement};
//!
//! let program = parse_script("exports.answer = 42;").expect("valid source");
//! assert!(matches!(program.body[0], Statement::Expression(_)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bindings;
pub mod lexer;
mod line_index;
pub mod parser;

pub use line_index::LineIndex;
pub use lexer::Span;

use thiserror::Error;

/// A syntax error with the location of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct SyntaxError {
    /// Human-readable description
    pub message: String,
    /// Location of the offending token
    pub span: Span,
}

impl SyntaxError {
    /// Creates a new syntax error.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Parses a classic script, the goal CommonJS module bodies use.
pub fn parse_script(source: &str) -> Result<ast::Program, SyntaxError> {
    parser::Parser::new(source).parse_program()
}

/// Parses an ECMAScript module.
pub fn parse_module(source: &str) -> Result<ast::Program, SyntaxError> {
    parser::Parser::new_module(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_and_module() {
        assert!(parse_script("module.exports = function () {};").is_ok());
        assert!(parse_module("export default function () {}").is_ok());
        assert!(parse_script("export default 1;").is_err());
    }

    #[test]
    fn test_syntax_error_display() {
        let err = parse_script("exports.a = ;").unwrap_err();
        assert_eq!(err.span, Span::new(12, 13));
        assert!(err.to_string().contains("at 12..13"));
    }
}
