//! Statement and declaration parsing.
//!
//! | Statement | Method |
//! |-----------|--------|
//! | Variable | `parse_variable_statement` |
//! | Function | `parse_function_declaration` |
//! | Class | `parse_class_declaration` |
//! | If | `parse_if_statement` |
//! | Switch | `parse_switch_statement` |
//! | While / Do-While | `parse_while_statement` / `parse_do_while_statement` |
//! | For / For-In / For-Of | `parse_for_statement` |
//! | Return / Throw | `parse_return_statement` / `parse_throw_statement` |
//! | Break / Continue | `parse_jump_statement` |
//! | Try | `parse_try_statement` |
//! | Import / Export | `parse_import_declaration` / `parse_export_declaration` |

use super::parser::{ParseResult, Parser};
use crate::ast::*;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    pub(super) fn parse_variable_statement(&mut self) -> ParseResult<Statement> {
        let mut decl = self.parse_variable_declaration()?;
        self.consume_semicolon()?;
        decl.span = self.span_from(decl.span.start);
        Ok(Statement::VariableDeclaration(decl))
    }

    /// Parses `var|let|const` declarators without the trailing semicolon.
    pub(super) fn parse_variable_declaration(&mut self) -> ParseResult<VariableDeclaration> {
        let start = self.current.span.start;
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(self.error("expected variable declaration")),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let declarator_start = self.current.span.start;
            let id = self.parse_binding_target()?;
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator {
                id,
                init,
                span: self.span_from(declarator_start),
            });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(VariableDeclaration {
            kind,
            declarations,
            span: self.span_from(start),
        })
    }

    pub(super) fn parse_function_declaration(&mut self) -> ParseResult<Statement> {
        let function = self.parse_function(true)?;
        Ok(Statement::FunctionDeclaration(function))
    }

    /// Parses `[async] function [*] [name] (params) { body }`.
    pub(super) fn parse_function(&mut self, require_name: bool) -> ParseResult<Function> {
        let start = self.current.span.start;
        let is_async = self.eat(&TokenKind::Async);
        self.expect(&TokenKind::Function)?;
        let is_generator = self.eat(&TokenKind::Star);

        let id = if self.at_identifier() {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(self.error("expected function name"));
        } else {
            None
        };

        self.parse_function_rest(start, id, is_async, is_generator)
    }

    /// Parses parameters and body once the function head is consumed.
    pub(super) fn parse_function_rest(
        &mut self,
        start: usize,
        id: Option<Identifier>,
        is_async: bool,
        is_generator: bool,
    ) -> ParseResult<Function> {
        let saved = (self.in_async, self.in_generator, self.no_in);
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.no_in = false;

        let params = self.parse_parameters();
        let body = params.and_then(|params| Ok((params, self.parse_function_body()?)));

        (self.in_async, self.in_generator, self.no_in) = saved;
        let (params, body) = body?;

        Ok(Function {
            id,
            params,
            body,
            is_async,
            is_generator,
            span: self.span_from(start),
        })
    }

    pub(super) fn parse_parameters(&mut self) -> ParseResult<Vec<Pattern>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();

        while !self.check(&TokenKind::RightParen) {
            if self.check(&TokenKind::Ellipsis) {
                params.push(self.parse_rest_element()?);
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightParen)?;
        Ok(params)
    }

    pub(super) fn parse_function_body(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    pub(super) fn parse_class_declaration(&mut self) -> ParseResult<Statement> {
        let class = self.parse_class(true)?;
        Ok(Statement::ClassDeclaration(class))
    }

    /// Parses `class [name] [extends expr] { members }`.
    pub(super) fn parse_class(&mut self, require_name: bool) -> ParseResult<Class> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Class)?;

        let id = if self.at_identifier() {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(self.error("expected class name"));
        } else {
            None
        };

        let super_class = if self.eat(&TokenKind::Extends) {
            Some(Box::new(self.parse_left_hand_side()?))
        } else {
            None
        };

        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if self.is_at_end() {
                return Err(self.error("unterminated class body"));
            }
            body.push(self.parse_class_member()?);
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Class {
            id,
            super_class,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_class_member(&mut self) -> ParseResult<ClassMember> {
        let start = self.current.span.start;

        let is_static = self.check(&TokenKind::Static) && !self.modifier_is_key();
        if is_static {
            self.advance();
            if self.check(&TokenKind::LeftBrace) {
                let block = self.parse_block()?;
                return Ok(ClassMember::StaticBlock(block));
            }
        }

        let is_async = self.check(&TokenKind::Async) && !self.modifier_is_key() && !self.peek().newline_before;
        if is_async {
            self.advance();
        }
        let is_generator = self.eat(&TokenKind::Star);

        let mut kind = MethodKind::Method;
        if !is_async && !is_generator && (self.check_identifier("get") || self.check_identifier("set")) && !self.modifier_is_key() {
            kind = if self.check_identifier("get") { MethodKind::Get } else { MethodKind::Set };
            self.advance();
        }

        let key = self.parse_property_key()?;

        if self.check(&TokenKind::LeftParen) {
            let function_start = self.current.span.start;
            if kind == MethodKind::Method && !is_static && matches!(&key, PropertyKey::Identifier(id) if id.name == "constructor") {
                kind = MethodKind::Constructor;
            }
            let function = self.parse_function_rest(function_start, None, is_async, is_generator)?;
            return Ok(ClassMember::Method(MethodDefinition {
                key,
                kind,
                function,
                is_static,
                span: self.span_from(start),
            }));
        }

        let value = if self.eat(&TokenKind::Equal) {
            let saved = (self.in_async, self.in_generator);
            self.in_async = false;
            self.in_generator = false;
            let value = self.parse_assignment();
            (self.in_async, self.in_generator) = saved;
            Some(value?)
        } else {
            None
        };
        self.consume_semicolon()?;

        Ok(ClassMember::Field(FieldDefinition {
            key,
            value,
            is_static,
            span: self.span_from(start),
        }))
    }

    /// Returns true when the current modifier-like word (`static`, `async`,
    /// `get`, `set`) is itself the member's name.
    pub(super) fn modifier_is_key(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::LeftParen
                | TokenKind::Equal
                | TokenKind::Semicolon
                | TokenKind::RightBrace
                | TokenKind::Comma
                | TokenKind::Colon
        )
    }

    pub(super) fn parse_block(&mut self) -> ParseResult<BlockStatement> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(BlockStatement {
            body,
            span: self.span_from(start),
        })
    }

    pub(super) fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_switch_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'switch'
        self.expect(&TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let case_start = self.current.span.start;
            let test = if self.eat(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.error("expected 'case' or 'default'"));
            };
            self.expect(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement {
            test,
            body,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_do_while_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.eat(&TokenKind::Semicolon);
        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            test,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_for_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'for'
        let is_await = self.eat(&TokenKind::Await);
        self.expect(&TokenKind::LeftParen)?;

        let saved_no_in = self.no_in;
        self.no_in = true;
        let init = match &self.current.kind {
            TokenKind::Semicolon => Ok(None),
            TokenKind::Var | TokenKind::Const => self.parse_variable_declaration().map(|d| Some(ForInit::Declaration(d))),
            TokenKind::Let if self.let_starts_for_declaration() => {
                self.parse_variable_declaration().map(|d| Some(ForInit::Declaration(d)))
            }
            _ => self.parse_expression().map(|e| Some(ForInit::Expression(e))),
        };
        self.no_in = saved_no_in;
        let init = init?;

        let is_of = self.check_identifier("of");
        if is_of || self.check(&TokenKind::In) {
            self.advance();
            let left = match init {
                Some(ForInit::Declaration(decl)) => ForInLeft::Declaration(decl),
                Some(ForInit::Expression(expr)) => ForInLeft::Expression(expr),
                None => return Err(self.error("expected loop binding")),
            };
            let right = if is_of { self.parse_assignment()? } else { self.parse_expression()? };
            self.expect(&TokenKind::RightParen)?;
            let body = Box::new(self.parse_statement()?);
            let span = self.span_from(start);

            return Ok(if is_of {
                Statement::ForOf(ForOfStatement {
                    left,
                    right,
                    body,
                    is_await,
                    span,
                })
            } else {
                Statement::ForIn(ForInStatement { left, right, body, span })
            });
        }

        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        }))
    }

    fn let_starts_for_declaration(&self) -> bool {
        let next = self.peek();
        !matches!(next.kind, TokenKind::In | TokenKind::Equal | TokenKind::Semicolon)
            && !matches!(&next.kind, TokenKind::Identifier(n) if n == "of")
    }

    pub(super) fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'return'
        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(ReturnStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    /// Parses `break` or `continue` with an optional same-line label.
    pub(super) fn parse_jump_statement(&mut self, is_break: bool) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance();
        let label = if !self.current.newline_before && self.at_identifier() {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.consume_semicolon()?;
        let jump = JumpStatement {
            label,
            span: self.span_from(start),
        };
        Ok(if is_break { Statement::Break(jump) } else { Statement::Continue(jump) })
    }

    pub(super) fn parse_throw_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(self.error("illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(ThrowStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_try_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span.start;
            self.advance();
            let param = if self.eat(&TokenKind::LeftParen) {
                let param = self.parse_binding_target()?;
                self.expect(&TokenKind::RightParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("expected 'catch' or 'finally'"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_with_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        self.advance(); // consume 'with'
        self.expect(&TokenKind::LeftParen)?;
        let object = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::With(WithStatement {
            object,
            body,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_labeled_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        let label = self.expect_identifier()?;
        self.expect(&TokenKind::Colon)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::Labeled(LabeledStatement {
            label,
            body,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current.span.start;
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(ExpressionStatement {
            expression,
            span: self.span_from(start),
        }))
    }

    fn at_statement_end(&self) -> bool {
        self.current.newline_before
            || matches!(
                self.current.kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            )
    }

    // ==================== Modules ====================

    fn require_module_goal(&self, what: &str) -> ParseResult<()> {
        if self.source_type == SourceType::Module {
            Ok(())
        } else {
            Err(self.error(format!("{} declarations require the module goal", what)))
        }
    }

    pub(super) fn parse_import_declaration(&mut self) -> ParseResult<Statement> {
        self.require_module_goal("import")?;
        let start = self.current.span.start;
        self.advance(); // consume 'import'

        let mut specifiers = Vec::new();
        if let TokenKind::String(_) = self.current.kind {
            let source = self.parse_module_specifier()?;
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(Statement::Import(ImportDeclaration {
                specifiers,
                source,
                span: self.span_from(start),
            }));
        }

        if self.at_identifier() {
            specifiers.push(ImportSpecifier::Default(self.expect_identifier()?));
            if !self.eat(&TokenKind::Comma) {
                return self.finish_import(start, specifiers);
            }
        }

        if self.eat(&TokenKind::Star) {
            self.expect_contextual("as")?;
            specifiers.push(ImportSpecifier::Namespace(self.expect_identifier()?));
        } else if self.eat(&TokenKind::LeftBrace) {
            while !self.check(&TokenKind::RightBrace) {
                let imported = self.parse_module_export_name()?;
                let local = if self.check_identifier("as") {
                    self.advance();
                    self.expect_identifier()?
                } else if imported.is_string {
                    return Err(self.error("string import names require 'as'"));
                } else {
                    Identifier {
                        name: imported.name.clone(),
                        span: imported.span,
                    }
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RightBrace)?;
        } else {
            return Err(self.error("expected import bindings"));
        }

        self.finish_import(start, specifiers)
    }

    fn finish_import(&mut self, start: usize, specifiers: Vec<ImportSpecifier>) -> ParseResult<Statement> {
        self.expect_contextual("from")?;
        let source = self.parse_module_specifier()?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;
        Ok(Statement::Import(ImportDeclaration {
            specifiers,
            source,
            span: self.span_from(start),
        }))
    }

    /// Import attributes (`with { type: 'json' }`) do not affect bindings.
    fn skip_import_attributes(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::With) && !self.current.newline_before {
            self.advance();
            self.parse_object_literal()?;
        }
        Ok(())
    }

    fn parse_module_specifier(&mut self) -> ParseResult<StringLiteral> {
        match &self.current.kind {
            TokenKind::String(value) => {
                let literal = StringLiteral {
                    value: value.clone(),
                    span: self.current.span,
                };
                self.advance();
                Ok(literal)
            }
            _ => Err(self.error("expected module specifier string")),
        }
    }

    fn parse_module_export_name(&mut self) -> ParseResult<ModuleExportName> {
        if let TokenKind::String(value) = &self.current.kind {
            let name = ModuleExportName {
                name: value.clone(),
                is_string: true,
                span: self.current.span,
            };
            self.advance();
            return Ok(name);
        }
        let id = self.expect_identifier_name()?;
        Ok(ModuleExportName {
            name: id.name,
            is_string: false,
            span: id.span,
        })
    }

    pub(super) fn parse_export_declaration(&mut self) -> ParseResult<Statement> {
        self.require_module_goal("export")?;
        let start = self.current.span.start;
        self.advance(); // consume 'export'

        let export = match &self.current.kind {
            TokenKind::Star => {
                self.advance();
                let exported = if self.check_identifier("as") {
                    self.advance();
                    Some(self.parse_module_export_name()?)
                } else {
                    None
                };
                self.expect_contextual("from")?;
                let source = self.parse_module_specifier()?;
                self.skip_import_attributes()?;
                self.consume_semicolon()?;
                ExportDeclaration::All(ExportAll {
                    exported,
                    source,
                    span: self.span_from(start),
                })
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(&TokenKind::RightBrace) {
                    let spec_start = self.current.span.start;
                    let local = self.parse_module_export_name()?;
                    let exported = if self.check_identifier("as") {
                        self.advance();
                        self.parse_module_export_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier {
                        local,
                        exported,
                        span: self.span_from(spec_start),
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightBrace)?;
                let source = if self.check_identifier("from") {
                    self.advance();
                    let source = self.parse_module_specifier()?;
                    self.skip_import_attributes()?;
                    Some(source)
                } else {
                    None
                };
                self.consume_semicolon()?;
                ExportDeclaration::Named(ExportNamed {
                    specifiers,
                    source,
                    span: self.span_from(start),
                })
            }
            TokenKind::Default => {
                self.advance();
                let declaration = match &self.current.kind {
                    TokenKind::Function => ExportDefaultKind::Function(self.parse_function(false)?),
                    TokenKind::Async if self.async_starts_function() => {
                        ExportDefaultKind::Function(self.parse_function(false)?)
                    }
                    TokenKind::Class => ExportDefaultKind::Class(self.parse_class(false)?),
                    _ => {
                        let expr = self.parse_assignment()?;
                        self.consume_semicolon()?;
                        ExportDefaultKind::Expression(expr)
                    }
                };
                ExportDeclaration::Default(ExportDefault {
                    declaration,
                    span: self.span_from(start),
                })
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const | TokenKind::Function | TokenKind::Class | TokenKind::Async => {
                let declaration = Box::new(self.parse_statement()?);
                ExportDeclaration::Declaration(ExportDecl {
                    declaration,
                    span: self.span_from(start),
                })
            }
            _ => return Err(self.error("unexpected token after export")),
        };

        Ok(Statement::Export(export))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::Parser;

    fn parse(src: &str) -> Vec<Statement> {
        Parser::new(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
            .body
    }

    fn parse_module(src: &str) -> Vec<Statement> {
        Parser::new_module(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
            .body
    }

    #[test]
    fn test_parse_var_let_const() {
        for src in ["var x = 1;", "let x = 1;", "const x = 1;"] {
            assert!(matches!(parse(src)[0], Statement::VariableDeclaration(_)));
        }
    }

    #[test]
    fn test_parse_destructuring_declaration() {
        let body = parse("const { readFile, join: j = 1, ...rest } = require('fs');");
        let Statement::VariableDeclaration(decl) = &body[0] else {
            panic!("expected declaration");
        };
        let mut names = Vec::new();
        decl.declarations[0].id.bound_names(&mut names);
        assert_eq!(names, vec!["readFile", "j", "rest"]);
    }

    #[test]
    fn test_parse_function_declarations() {
        parse("function f(a, b = 2, ...rest) { return a; }");
        parse("async function g() { await x; }");
        parse("function* h() { yield 1; yield* other(); }");
    }

    #[test]
    fn test_parse_class_members() {
        let body = parse(
            "class A extends B { static count = 0; #secret = 1; constructor() { super(); } get x() { return 1; } set x(v) {} static { init(); } async *gen() {} static() {} get() {} }",
        );
        let Statement::ClassDeclaration(class) = &body[0] else {
            panic!("expected class");
        };
        assert_eq!(class.body.len(), 9);
        assert!(matches!(&class.body[2], ClassMember::Method(m) if m.kind == MethodKind::Constructor));
        assert!(matches!(&class.body[3], ClassMember::Method(m) if m.kind == MethodKind::Get));
        assert!(matches!(&class.body[5], ClassMember::StaticBlock(_)));
        assert!(matches!(&class.body[8], ClassMember::Method(m) if !m.is_static));
    }

    #[test]
    fn test_parse_control_flow() {
        parse("if (a) b(); else if (c) d(); else { e(); }");
        parse("switch (x) { case 1: a(); break; default: b(); }");
        parse("while (a) { b(); }");
        parse("do { a(); } while (b)");
        parse("try { a(); } catch { b(); } finally { c(); }");
        parse("try { a(); } catch ({ message }) { b(message); }");
        parse("with (obj) { x = 1; }");
    }

    #[test]
    fn test_parse_for_variants() {
        assert!(matches!(parse("for (var i = 0; i < 10; i++) {}")[0], Statement::For(_)));
        assert!(matches!(parse("for (const k in obj) {}")[0], Statement::ForIn(_)));
        assert!(matches!(parse("for (const [k, v] of Object.entries(o)) {}")[0], Statement::ForOf(_)));
        assert!(matches!(parse("for (x of list) {}")[0], Statement::ForOf(_)));
        assert!(matches!(parse("for (;;) { break; }")[0], Statement::For(_)));
        assert!(matches!(
            parse("for (var i = ('a' in o) ? 0 : 1; i < 2; i++) {}")[0],
            Statement::For(_)
        ));
    }

    #[test]
    fn test_parse_imports() {
        let body = parse_module(
            "import 'side'; import a from 'a'; import b, { c as d, e } from 'b'; import * as ns from 'ns'; import x, * as y from 'xy'; import { 'str name' as s } from 's'; import j from './data.json' with { type: 'json' };",
        );
        assert_eq!(body.len(), 7);
        let Statement::Import(side) = &body[0] else { panic!() };
        assert!(side.specifiers.is_empty());
        let Statement::Import(named) = &body[2] else { panic!() };
        assert_eq!(named.specifiers.len(), 3);
        assert!(matches!(
            &named.specifiers[1],
            ImportSpecifier::Named { imported, local } if imported.name == "c" && local.name == "d"
        ));
    }

    #[test]
    fn test_parse_exports() {
        let body = parse_module(
            "export const a = 1, b = 2; export function f() {} export class C {} export { a as default, b as 'module.exports' }; export * from './x'; export * as ns from './y'; export { default } from './z'; export default function () {}",
        );
        assert_eq!(body.len(), 8);
        let Statement::Export(ExportDeclaration::Named(list)) = &body[3] else {
            panic!("expected export list");
        };
        assert!(list.specifiers[1].exported.is_string);
        assert_eq!(list.specifiers[1].exported.name, "module.exports");
        assert!(matches!(
            &body[7],
            Statement::Export(ExportDeclaration::Default(ExportDefault {
                declaration: ExportDefaultKind::Function(Function { id: None, .. }),
                ..
            }))
        ));
    }

    #[test]
    fn test_export_default_expression() {
        let body = parse_module("export default { a, b };");
        assert!(matches!(
            &body[0],
            Statement::Export(ExportDeclaration::Default(ExportDefault {
                declaration: ExportDefaultKind::Expression(Expression::Object(_)),
                ..
            }))
        ));
    }

    #[test]
    fn test_import_requires_module_goal() {
        assert!(Parser::new("import a from 'a';").parse_program().is_err());
        assert!(Parser::new("export default 1;").parse_program().is_err());
    }

    #[test]
    fn test_break_label_requires_same_line() {
        let body = parse("a: while (x) { break\na; }");
        let Statement::Labeled(labeled) = &body[0] else { panic!() };
        let Statement::While(w) = labeled.body.as_ref() else { panic!() };
        let Statement::Block(block) = w.body.as_ref() else { panic!() };
        assert!(matches!(&block.body[0], Statement::Break(JumpStatement { label: None, .. })));
        assert_eq!(block.body.len(), 2);
    }
}
