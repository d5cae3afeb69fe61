//! The main parser implementation.

use crate::SyntaxError;
use crate::ast::*;
use crate::lexer::{Scanner, Span, Token, TokenKind};

pub(super) type ParseResult<T> = Result<T, SyntaxError>;

/// A recursive descent parser for JavaScript.
pub struct Parser<'a> {
    pub(super) source: &'a str,
    pub(super) scanner: Scanner<'a>,
    pub(super) current: Token,
    pub(super) previous: Token,
    pub(super) source_type: SourceType,
    /// `in` is not a binary operator inside a for-statement head
    pub(super) no_in: bool,
    pub(super) in_async: bool,
    pub(super) in_generator: bool,
}

impl<'a> Parser<'a> {
    /// Creates a parser for a classic script (CommonJS module body).
    pub fn new(source: &'a str) -> Self {
        Self::with_source_type(source, SourceType::Script)
    }

    /// Creates a parser for an ECMAScript module.
    pub fn new_module(source: &'a str) -> Self {
        Self::with_source_type(source, SourceType::Module)
    }

    fn with_source_type(source: &'a str, source_type: SourceType) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            source,
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            source_type,
            no_in: false,
            in_async: false,
            in_generator: false,
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement_list_item()?);
        }

        Ok(Program {
            body,
            source_type: self.source_type,
            span: Span::new(0, self.source.len()),
        })
    }

    /// Parses a statement, or an import/export declaration at module level.
    pub(super) fn parse_statement_list_item(&mut self) -> ParseResult<Statement> {
        match &self.current.kind {
            TokenKind::Import if !self.import_is_expression() => self.parse_import_declaration(),
            TokenKind::Export => self.parse_export_declaration(),
            _ => self.parse_statement(),
        }
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Const => self.parse_variable_statement(),
            TokenKind::Let if self.let_starts_declaration() => self.parse_variable_statement(),
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Async if self.async_starts_function() => self.parse_function_declaration(),
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => self.parse_jump_statement(true),
            TokenKind::Continue => self.parse_jump_statement(false),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Debugger => {
                let start = self.current.span.start;
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Debugger(self.span_from(start)))
            }
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                let span = self.current.span;
                self.advance();
                Ok(Statement::Empty(span))
            }
            TokenKind::Identifier(_) if self.peek().kind == TokenKind::Colon => self.parse_labeled_statement(),
            TokenKind::Import if !self.import_is_expression() => {
                Err(self.error("import and export may only appear at the top level"))
            }
            TokenKind::Export => Err(self.error("import and export may only appear at the top level")),
            _ => self.parse_expression_statement(),
        }
    }

    // ==================== Token helpers ====================

    pub(super) fn advance(&mut self) {
        let next = self.scanner.next_token();
        self.previous = std::mem::replace(&mut self.current, next);
    }

    /// Returns the token after `current` without consuming anything.
    pub(super) fn peek(&self) -> Token {
        self.scanner.clone().next_token()
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    pub(super) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Span> {
        if self.check(kind) {
            let span = self.current.span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error(format!("expected {:?}", kind)))
        }
    }

    /// Checks for a contextual word such as `of`, `from`, `as`, `get`.
    pub(super) fn check_identifier(&self, name: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(n) if n == name)
    }

    pub(super) fn expect_contextual(&mut self, name: &str) -> ParseResult<()> {
        if self.check_identifier(name) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", name)))
        }
    }

    /// Automatic semicolon insertion: a statement ends at `;`, before `}`,
    /// at end of input, or before a token on a new line.
    pub(super) fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace) || self.is_at_end() || self.current.newline_before {
            return Ok(());
        }
        Err(self.error("expected ';'"))
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Span from `start` to the end of the last consumed token.
    pub(super) fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.previous.span.end.max(start))
    }

    pub(super) fn error(&self, message: impl Into<String>) -> SyntaxError {
        let message = message.into();
        let found = match &self.current.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.current.span.text(self.source)),
        };
        SyntaxError::new(format!("{}, found {}", message, found), self.current.span)
    }

    /// Text of the current token as written in the source.
    pub(super) fn current_text(&self) -> &'a str {
        self.current.span.text(self.source)
    }

    // ==================== Identifiers ====================

    /// Returns true if the current token can be used as a binding or
    /// reference identifier.
    pub(super) fn at_identifier(&self) -> bool {
        match &self.current.kind {
            TokenKind::Identifier(_) => true,
            TokenKind::Yield => !self.in_generator,
            TokenKind::Await => !self.in_async && self.source_type == SourceType::Script,
            kind => kind.is_contextual_keyword(),
        }
    }

    pub(super) fn expect_identifier(&mut self) -> ParseResult<Identifier> {
        if !self.at_identifier() {
            return Err(self.error("expected identifier"));
        }
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => self.current_text().to_string(),
        };
        let span = self.current.span;
        self.advance();
        Ok(Identifier { name, span })
    }

    /// Parses any IdentifierName (keywords included), as used after `.`
    /// and in property keys.
    pub(super) fn expect_identifier_name(&mut self) -> ParseResult<Identifier> {
        if !self.current.kind.is_identifier_name() {
            return Err(self.error("expected property name"));
        }
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => self.current_text().to_string(),
        };
        let span = self.current.span;
        self.advance();
        Ok(Identifier { name, span })
    }

    // ==================== Lookahead ====================

    fn import_is_expression(&self) -> bool {
        matches!(self.peek().kind, TokenKind::LeftParen | TokenKind::Dot)
    }

    fn let_starts_declaration(&self) -> bool {
        let next = self.peek();
        matches!(
            next.kind,
            TokenKind::Identifier(_) | TokenKind::LeftBracket | TokenKind::LeftBrace
        ) || next.kind.is_contextual_keyword()
    }

    pub(super) fn async_starts_function(&self) -> bool {
        let next = self.peek();
        next.kind == TokenKind::Function && !next.newline_before
    }

    /// With `current` at `(`, reports whether the parenthesized list is
    /// an arrow function's parameters.
    pub(super) fn paren_starts_arrow(&self) -> bool {
        closes_into_arrow(self.scanner.clone())
    }

    /// Returns true if `async` starts an async arrow function:
    /// `async x => ...` or `async (...) => ...`.
    pub(super) fn async_starts_arrow(&self) -> bool {
        let mut scanner = self.scanner.clone();
        let next = scanner.next_token();
        if next.newline_before {
            return false;
        }
        match next.kind {
            TokenKind::LeftParen => closes_into_arrow(scanner),
            TokenKind::Identifier(_) => {
                let arrow = scanner.next_token();
                arrow.kind == TokenKind::Arrow && !arrow.newline_before
            }
            _ => false,
        }
    }
}

/// Scans from just after a `(` to its matching `)` and checks for `=>` on
/// the same line.
fn closes_into_arrow(mut scanner: Scanner<'_>) -> bool {
    let mut depth = 1usize;
    loop {
        let token = scanner.next_token();
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            TokenKind::Eof => return false,
            _ => {}
        }
    }
    let next = scanner.next_token();
    next.kind == TokenKind::Arrow && !next.newline_before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        Parser::new(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
    }

    fn parse_module_ok(src: &str) -> Program {
        Parser::new_module(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
    }

    fn parse_stmt(src: &str) -> Statement {
        let mut program = parse_ok(src);
        assert_eq!(program.body.len(), 1, "expected one statement in {:?}", src);
        program.body.remove(0)
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse_ok("");
        assert!(program.body.is_empty());
        assert_eq!(program.source_type, SourceType::Script);
    }

    #[test]
    fn test_parse_multiple_statements() {
        let program = parse_ok("let x = 1; let y = 2; let z = 3;");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_asi_on_newline() {
        let program = parse_ok("const a = 1\nconst b = 2\nexports.c = a + b");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_asi_restricted_return() {
        let stmt = parse_stmt("function f() { return\n42 }");
        let Statement::FunctionDeclaration(function) = stmt else {
            panic!("expected function declaration");
        };
        assert!(matches!(
            &function.body[0],
            Statement::Return(ReturnStatement { argument: None, .. })
        ));
        assert_eq!(function.body.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_on_same_line_is_error() {
        assert!(Parser::new("let x = 1 let y = 2").parse_program().is_err());
    }

    #[test]
    fn test_statement_spans_cover_semicolon() {
        let src = "exports.a = 1; exports.b = 2;";
        let program = parse_ok(src);
        assert_eq!(program.body[0].span().text(src), "exports.a = 1;");
        assert_eq!(program.body[1].span().text(src), "exports.b = 2;");
    }

    #[test]
    fn test_labeled_statement() {
        let stmt = parse_stmt("outer: for (;;) { break outer; }");
        assert!(matches!(stmt, Statement::Labeled(_)));
    }

    #[test]
    fn test_let_as_identifier() {
        let stmt = parse_stmt("let = 5;");
        assert!(matches!(stmt, Statement::Expression(_)));
    }

    #[test]
    fn test_import_outside_module_is_error() {
        let err = Parser::new("{ import x from 'y'; }").parse_program().unwrap_err();
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn test_dynamic_import_in_script() {
        let stmt = parse_stmt("import('./lazy.js').then(m => m.default);");
        assert!(matches!(stmt, Statement::Expression(_)));
    }

    #[test]
    fn test_module_goal() {
        let program = parse_module_ok("import a from 'a'; export default a;");
        assert_eq!(program.source_type, SourceType::Module);
        assert!(matches!(program.body[0], Statement::Import(_)));
        assert!(matches!(program.body[1], Statement::Export(_)));
    }

    #[test]
    fn test_error_reports_location() {
        let err = Parser::new("let = = 1;").parse_program().unwrap_err();
        assert_eq!(err.span, Span::new(6, 7));
    }
}
