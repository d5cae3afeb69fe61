//! Lexical analysis (tokenization) for JavaScript source code.
//!
//! The lexer transforms JavaScript source text into a stream of tokens
//! that can be consumed by the parser. Every token records whether a line
//! terminator preceded it so the parser can apply automatic semicolon
//! insertion, which CommonJS sources lean on heavily.
//!
//! ## Usage
//!
//! ```rust
//! use modshim_syntax::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("exports.answer = 42");
//!
//! loop {
//!     let token = scanner.next_token();
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
