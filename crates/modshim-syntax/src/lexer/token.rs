//! Token definitions for the JavaScript lexer.

use serde::Serialize;
use std::fmt;

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Slices the source text covered by this span.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or_default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// Whether a line terminator precedes this token (drives ASI)
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }

    /// Marks the token as preceded by a line terminator.
    pub fn after_newline(mut self, newline: bool) -> Self {
        self.newline_before = newline;
        self
    }
}

/// The different kinds of tokens in JavaScript.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal (integer or floating point)
    Number(f64),
    /// BigInt literal
    BigInt(String),
    /// String literal (escapes resolved)
    String(String),
    /// Whole template literal, raw text between the backticks
    Template(String),
    /// Regular expression literal
    RegExp {
        pattern: String,
        flags: String,
    },
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// null
    Null,

    // Identifiers and Keywords
    /// Identifier
    Identifier(String),
    /// Private identifier (#name)
    PrivateIdentifier(String),

    // Keywords
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Static,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,
    Async,

    // Punctuation
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// <=
    LessThanEqual,
    /// >=
    GreaterThanEqual,
    /// ==
    EqualEqual,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// **
    StarStar,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// &
    Ampersand,
    /// |
    Pipe,
    /// ^
    Caret,
    /// !
    Bang,
    /// ~
    Tilde,
    /// &&
    AmpersandAmpersand,
    /// ||
    PipePipe,
    /// ??
    QuestionQuestion,
    /// ?
    Question,
    /// ?.
    QuestionDot,
    /// :
    Colon,
    /// =
    Equal,
    /// +=
    PlusEqual,
    /// -=
    MinusEqual,
    /// *=
    StarEqual,
    /// /=
    SlashEqual,
    /// %=
    PercentEqual,
    /// **=
    StarStarEqual,
    /// <<=
    LeftShiftEqual,
    /// >>=
    RightShiftEqual,
    /// >>>=
    UnsignedRightShiftEqual,
    /// &=
    AmpersandEqual,
    /// |=
    PipeEqual,
    /// ^=
    CaretEqual,
    /// &&=
    AmpersandAmpersandEqual,
    /// ||=
    PipePipeEqual,
    /// ??=
    QuestionQuestionEqual,
    /// =>
    Arrow,

    // Special
    /// End of file
    Eof,
    /// Invalid token (unterminated literal, stray character)
    Invalid,
}

impl TokenKind {
    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Await
                | TokenKind::Break
                | TokenKind::Case
                | TokenKind::Catch
                | TokenKind::Class
                | TokenKind::Const
                | TokenKind::Continue
                | TokenKind::Debugger
                | TokenKind::Default
                | TokenKind::Delete
                | TokenKind::Do
                | TokenKind::Else
                | TokenKind::Enum
                | TokenKind::Export
                | TokenKind::Extends
                | TokenKind::Finally
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::In
                | TokenKind::Instanceof
                | TokenKind::Let
                | TokenKind::New
                | TokenKind::Return
                | TokenKind::Static
                | TokenKind::Super
                | TokenKind::Switch
                | TokenKind::This
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Typeof
                | TokenKind::Var
                | TokenKind::Void
                | TokenKind::While
                | TokenKind::With
                | TokenKind::Yield
                | TokenKind::Async
        )
    }

    /// Returns true for keywords that are only reserved in some positions
    /// and may still name a binding (`async`, `static`, `yield`, `await`, `let`).
    pub fn is_contextual_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Async | TokenKind::Static | TokenKind::Yield | TokenKind::Await | TokenKind::Let
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::String(_)
                | TokenKind::Template(_)
                | TokenKind::RegExp { .. }
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Returns true if this token is usable as a property name after `.`
    /// or as an object key written without quotes.
    pub fn is_identifier_name(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_) | TokenKind::True | TokenKind::False | TokenKind::Null
        ) || self.is_keyword()
    }

    /// Returns true if a `/` following this token starts a regular
    /// expression rather than a division.
    pub fn allows_regex_after(&self) -> bool {
        !matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::String(_)
                | TokenKind::Template(_)
                | TokenKind::RegExp { .. }
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Identifier(_)
                | TokenKind::PrivateIdentifier(_)
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len_and_empty() {
        let span = Span::new(5, 15);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::new(3, 3).is_empty());
    }

    #[test]
    fn test_span_to_covers_both() {
        let joined = Span::new(4, 8).to(Span::new(1, 5));
        assert_eq!(joined, Span::new(1, 8));
    }

    #[test]
    fn test_span_text() {
        let source = "module.exports = foo;";
        assert_eq!(Span::new(0, 6).text(source), "module");
        assert_eq!(Span::new(40, 50).text(source), "");
    }

    #[test]
    fn test_token_after_newline() {
        let token = Token::new(TokenKind::Plus, Span::new(0, 1)).after_newline(true);
        assert!(token.newline_before);
    }

    #[test]
    fn test_contextual_keywords_are_keywords() {
        for kind in [TokenKind::Async, TokenKind::Static, TokenKind::Yield, TokenKind::Await] {
            assert!(kind.is_keyword());
            assert!(kind.is_contextual_keyword());
        }
        assert!(!TokenKind::Function.is_contextual_keyword());
    }

    #[test]
    fn test_identifier_names_include_keywords() {
        assert!(TokenKind::Default.is_identifier_name());
        assert!(TokenKind::Identifier("exports".into()).is_identifier_name());
        assert!(!TokenKind::Plus.is_identifier_name());
    }

    #[test]
    fn test_regex_position() {
        assert!(TokenKind::Equal.allows_regex_after());
        assert!(TokenKind::LeftParen.allows_regex_after());
        assert!(TokenKind::Return.allows_regex_after());
        assert!(!TokenKind::Identifier("a".into()).allows_regex_after());
        assert!(!TokenKind::RightParen.allows_regex_after());
    }

    #[test]
    fn test_is_literal() {
        assert!(TokenKind::Template("x".into()).is_literal());
        assert!(TokenKind::Null.is_literal());
        assert!(!TokenKind::Identifier("x".into()).is_literal());
    }
}
