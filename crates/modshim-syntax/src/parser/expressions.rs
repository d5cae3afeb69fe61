//! Expression and binding-pattern parsing.
//!
//! Binary operators use precedence climbing; everything else is plain
//! recursive descent.
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `??` `\|\|` |
//! | 2 | `&&` |
//! | 3 | `\|` |
//! | 4 | `^` |
//! | 5 | `&` |
//! | 6 | `==` `!=` `===` `!==` |
//! | 7 | `<` `>` `<=` `>=` `instanceof` `in` |
//! | 8 | `<<` `>>` `>>>` |
//! | 9 | `+` `-` |
//! | 10 | `*` `/` `%` |
//! | 11 | `**` (right-associative) |

use super::parser::{ParseResult, Parser};
use crate::ast::*;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// Parses an expression, including comma sequences.
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(SequenceExpression {
            expressions,
            span: self.span_from(start),
        }))
    }

    /// Runs `f` with `in` re-enabled as a binary operator.
    fn allow_in<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let saved = self.no_in;
        self.no_in = false;
        let result = f(self);
        self.no_in = saved;
        result
    }

    pub(super) fn parse_assignment(&mut self) -> ParseResult<Expression> {
        if self.check(&TokenKind::Yield) && self.in_generator {
            return self.parse_yield();
        }
        if self.check(&TokenKind::Async) && self.async_starts_arrow() {
            return self.parse_arrow(true);
        }
        if self.check(&TokenKind::LeftParen) && self.paren_starts_arrow() {
            return self.parse_arrow(false);
        }
        if self.at_identifier() {
            let next = self.peek();
            if next.kind == TokenKind::Arrow && !next.newline_before {
                return self.parse_arrow(false);
            }
        }

        let start = self.current.span.start;
        let left = self.parse_conditional()?;
        let Some(operator) = self.assignment_operator() else {
            return Ok(left);
        };

        let valid_target = match &left {
            Expression::Identifier(_) | Expression::Member(_) => true,
            Expression::Object(_) | Expression::Array(_) => operator == AssignmentOperator::Assign,
            _ => false,
        };
        if !valid_target {
            return Err(self.error("invalid assignment target"));
        }

        self.advance();
        let right = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span_from(start),
        }))
    }

    fn assignment_operator(&self) -> Option<AssignmentOperator> {
        let operator = match self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::AddAssign,
            TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
            TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
            TokenKind::SlashEqual => AssignmentOperator::DivideAssign,
            TokenKind::PercentEqual => AssignmentOperator::ModuloAssign,
            TokenKind::StarStarEqual => AssignmentOperator::ExponentAssign,
            TokenKind::LeftShiftEqual => AssignmentOperator::LeftShiftAssign,
            TokenKind::RightShiftEqual => AssignmentOperator::RightShiftAssign,
            TokenKind::UnsignedRightShiftEqual => AssignmentOperator::UnsignedRightShiftAssign,
            TokenKind::AmpersandEqual => AssignmentOperator::BitwiseAndAssign,
            TokenKind::PipeEqual => AssignmentOperator::BitwiseOrAssign,
            TokenKind::CaretEqual => AssignmentOperator::BitwiseXorAssign,
            TokenKind::AmpersandAmpersandEqual => AssignmentOperator::LogicalAndAssign,
            TokenKind::PipePipeEqual => AssignmentOperator::LogicalOrAssign,
            TokenKind::QuestionQuestionEqual => AssignmentOperator::NullishCoalescingAssign,
            _ => return None,
        };
        Some(operator)
    }

    fn parse_yield(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        self.advance(); // consume 'yield'

        let delegate = !self.current.newline_before && self.eat(&TokenKind::Star);
        let ends_here = self.current.newline_before
            || matches!(
                self.current.kind,
                TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::Comma
                    | TokenKind::Semicolon
                    | TokenKind::Colon
                    | TokenKind::Eof
            );
        let argument = if delegate || !ends_here {
            Some(Box::new(self.parse_assignment()?))
        } else {
            None
        };

        Ok(Expression::Yield(YieldExpression {
            argument,
            delegate,
            span: self.span_from(start),
        }))
    }

    fn parse_arrow(&mut self, is_async: bool) -> ParseResult<Expression> {
        let start = self.current.span.start;
        if is_async {
            self.advance(); // consume 'async'
        }

        let params = if self.check(&TokenKind::LeftParen) {
            self.parse_parameters()?
        } else {
            vec![Pattern::Identifier(self.expect_identifier()?)]
        };
        self.expect(&TokenKind::Arrow)?;

        let saved = (self.in_async, self.in_generator);
        self.in_async = is_async;
        self.in_generator = false;
        let body = if self.check(&TokenKind::LeftBrace) {
            self.allow_in(|p| p.parse_function_body()).map(ArrowBody::Block)
        } else {
            self.parse_assignment().map(|expr| ArrowBody::Expression(Box::new(expr)))
        };
        (self.in_async, self.in_generator) = saved;

        Ok(Expression::Arrow(ArrowFunctionExpression {
            params,
            body: body?,
            is_async,
            span: self.span_from(start),
        }))
    }

    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }

        let consequent = self.allow_in(|p| p.parse_assignment())?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span_from(start),
        }))
    }

    fn binary_operator(&self) -> Option<(BinaryOperator, u8)> {
        let entry = match self.current.kind {
            TokenKind::QuestionQuestion => (BinaryOperator::NullishCoalescing, 1),
            TokenKind::PipePipe => (BinaryOperator::LogicalOr, 1),
            TokenKind::AmpersandAmpersand => (BinaryOperator::LogicalAnd, 2),
            TokenKind::Pipe => (BinaryOperator::BitwiseOr, 3),
            TokenKind::Caret => (BinaryOperator::BitwiseXor, 4),
            TokenKind::Ampersand => (BinaryOperator::BitwiseAnd, 5),
            TokenKind::EqualEqual => (BinaryOperator::Equal, 6),
            TokenKind::NotEqual => (BinaryOperator::NotEqual, 6),
            TokenKind::StrictEqual => (BinaryOperator::StrictEqual, 6),
            TokenKind::StrictNotEqual => (BinaryOperator::StrictNotEqual, 6),
            TokenKind::LessThan => (BinaryOperator::LessThan, 7),
            TokenKind::GreaterThan => (BinaryOperator::GreaterThan, 7),
            TokenKind::LessThanEqual => (BinaryOperator::LessThanEqual, 7),
            TokenKind::GreaterThanEqual => (BinaryOperator::GreaterThanEqual, 7),
            TokenKind::Instanceof => (BinaryOperator::InstanceOf, 7),
            TokenKind::In if !self.no_in => (BinaryOperator::In, 7),
            TokenKind::LeftShift => (BinaryOperator::LeftShift, 8),
            TokenKind::RightShift => (BinaryOperator::RightShift, 8),
            TokenKind::UnsignedRightShift => (BinaryOperator::UnsignedRightShift, 8),
            TokenKind::Plus => (BinaryOperator::Add, 9),
            TokenKind::Minus => (BinaryOperator::Subtract, 9),
            TokenKind::Star => (BinaryOperator::Multiply, 10),
            TokenKind::Slash => (BinaryOperator::Divide, 10),
            TokenKind::Percent => (BinaryOperator::Modulo, 10),
            TokenKind::StarStar => (BinaryOperator::Exponent, 11),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let mut left = self.parse_unary()?;

        while let Some((operator, precedence)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let next_min = if operator == BinaryOperator::Exponent {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_binary(next_min)?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let operator = match self.current.kind {
            TokenKind::Bang => Some(UnaryOperator::LogicalNot),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Tilde => Some(UnaryOperator::BitwiseNot),
            TokenKind::Typeof => Some(UnaryOperator::Typeof),
            TokenKind::Void => Some(UnaryOperator::Void),
            TokenKind::Delete => Some(UnaryOperator::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                argument: Box::new(argument),
                span: self.span_from(start),
            }));
        }

        let update = match self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(argument),
                prefix: true,
                span: self.span_from(start),
            }));
        }

        if self.check(&TokenKind::Await) && !self.at_identifier() {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Await(AwaitExpression {
                argument: Box::new(argument),
                span: self.span_from(start),
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let expr = self.parse_left_hand_side()?;

        if self.current.newline_before {
            return Ok(expr);
        }
        let operator = match self.current.kind {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(expr),
        };
        self.advance();
        Ok(Expression::Update(UpdateExpression {
            operator,
            argument: Box::new(expr),
            prefix: false,
            span: self.span_from(start),
        }))
    }

    /// Parses member accesses, calls, `new` and tagged templates.
    pub(super) fn parse_left_hand_side(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        self.parse_member_tail(start, expr, true)
    }

    fn parse_member_tail(&mut self, start: usize, mut expr: Expression, allow_call: bool) -> ParseResult<Expression> {
        loop {
            match &self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_member_name()?;
                    expr = Expression::Member(MemberExpression {
                        object: Box::new(expr),
                        property,
                        optional: false,
                        span: self.span_from(start),
                    });
                }
                TokenKind::QuestionDot if allow_call => {
                    self.advance();
                    expr = match &self.current.kind {
                        TokenKind::LeftParen => {
                            let arguments = self.parse_arguments()?;
                            Expression::Call(CallExpression {
                                callee: Box::new(expr),
                                arguments,
                                optional: true,
                                span: self.span_from(start),
                            })
                        }
                        TokenKind::LeftBracket => {
                            let property = self.parse_computed_member()?;
                            Expression::Member(MemberExpression {
                                object: Box::new(expr),
                                property,
                                optional: true,
                                span: self.span_from(start),
                            })
                        }
                        _ => {
                            let property = self.parse_member_name()?;
                            Expression::Member(MemberExpression {
                                object: Box::new(expr),
                                property,
                                optional: true,
                                span: self.span_from(start),
                            })
                        }
                    };
                }
                TokenKind::LeftBracket => {
                    let property = self.parse_computed_member()?;
                    expr = Expression::Member(MemberExpression {
                        object: Box::new(expr),
                        property,
                        optional: false,
                        span: self.span_from(start),
                    });
                }
                TokenKind::LeftParen if allow_call => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                        optional: false,
                        span: self.span_from(start),
                    });
                }
                TokenKind::Template(raw) => {
                    let quasi = TemplateLiteral {
                        raw: raw.clone(),
                        span: self.current.span,
                    };
                    self.advance();
                    expr = Expression::TaggedTemplate(TaggedTemplateExpression {
                        tag: Box::new(expr),
                        quasi,
                        span: self.span_from(start),
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> ParseResult<MemberProperty> {
        if let TokenKind::PrivateIdentifier(name) = &self.current.kind {
            let id = Identifier {
                name: name.clone(),
                span: self.current.span,
            };
            self.advance();
            return Ok(MemberProperty::Private(id));
        }
        Ok(MemberProperty::Identifier(self.expect_identifier_name()?))
    }

    fn parse_computed_member(&mut self) -> ParseResult<MemberProperty> {
        self.expect(&TokenKind::LeftBracket)?;
        let property = self.allow_in(|p| p.parse_expression())?;
        self.expect(&TokenKind::RightBracket)?;
        Ok(MemberProperty::Expression(Box::new(property)))
    }

    fn parse_new(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let new_span = self.current.span;
        self.advance(); // consume 'new'

        if self.eat(&TokenKind::Dot) {
            let property = self.expect_identifier_name()?;
            return Ok(Expression::MetaProperty(MetaProperty {
                meta: Identifier {
                    name: "new".to_string(),
                    span: new_span,
                },
                property,
                span: self.span_from(start),
            }));
        }

        let callee_start = self.current.span.start;
        let callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_member_tail(callee_start, callee, false)?;
        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::New(NewExpression {
            callee: Box::new(callee),
            arguments,
            span: self.span_from(start),
        }))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect(&TokenKind::LeftParen)?;
        let arguments = self.allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.check(&TokenKind::RightParen) {
                arguments.push(p.parse_spread_or_assignment()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(arguments)
        })?;
        self.expect(&TokenKind::RightParen)?;
        Ok(arguments)
    }

    fn parse_spread_or_assignment(&mut self) -> ParseResult<Expression> {
        if !self.check(&TokenKind::Ellipsis) {
            return self.parse_assignment();
        }
        let start = self.current.span.start;
        self.advance();
        let argument = self.parse_assignment()?;
        Ok(Expression::Spread(SpreadElement {
            argument: Box::new(argument),
            span: self.span_from(start),
        }))
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;
        let value = match &self.current.kind {
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::BigInt(digits) => Some(Literal::BigInt(digits.clone())),
            TokenKind::True => Some(Literal::Boolean(true)),
            TokenKind::False => Some(Literal::Boolean(false)),
            TokenKind::Null => Some(Literal::Null),
            _ => None,
        };
        if let Some(value) = value {
            self.advance();
            return Ok(Expression::Literal(LiteralExpression { value, span }));
        }

        match &self.current.kind {
            TokenKind::Template(raw) => {
                let template = TemplateLiteral { raw: raw.clone(), span };
                self.advance();
                Ok(Expression::Template(template))
            }
            TokenKind::Slash | TokenKind::SlashEqual => self.parse_regex(),
            TokenKind::This => {
                self.advance();
                Ok(Expression::This(span))
            }
            TokenKind::Super => {
                self.advance();
                Ok(Expression::Super(span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.allow_in(|p| p.parse_expression())?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Function => Ok(Expression::Function(self.parse_function(false)?)),
            TokenKind::Async if self.async_starts_function() => Ok(Expression::Function(self.parse_function(false)?)),
            TokenKind::Class => Ok(Expression::Class(self.parse_class(false)?)),
            TokenKind::Import => self.parse_import_call(),
            _ if self.at_identifier() => Ok(Expression::Identifier(self.expect_identifier()?)),
            _ => Err(self.error("unexpected token")),
        }
    }

    fn parse_regex(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        self.current = self.scanner.rescan_regex(start, self.current.newline_before);
        match &self.current.kind {
            TokenKind::RegExp { pattern, flags } => {
                let value = Literal::RegExp {
                    pattern: pattern.clone(),
                    flags: flags.clone(),
                };
                let span = self.current.span;
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value, span }))
            }
            _ => Err(self.error("unterminated regular expression")),
        }
    }

    /// Parses `import(specifier)` or `import.meta`.
    fn parse_import_call(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        let import_span = self.current.span;
        self.advance(); // consume 'import'

        if self.eat(&TokenKind::Dot) {
            let property = self.expect_identifier_name()?;
            return Ok(Expression::MetaProperty(MetaProperty {
                meta: Identifier {
                    name: "import".to_string(),
                    span: import_span,
                },
                property,
                span: self.span_from(start),
            }));
        }

        self.expect(&TokenKind::LeftParen)?;
        let source = self.allow_in(|p| p.parse_assignment())?;
        if self.eat(&TokenKind::Comma) && !self.check(&TokenKind::RightParen) {
            self.allow_in(|p| p.parse_assignment())?;
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(Expression::Import(ImportCall {
            source: Box::new(source),
            span: self.span_from(start),
        }))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LeftBracket)?;

        let elements = self.allow_in(|p| {
            let mut elements = Vec::new();
            loop {
                if p.check(&TokenKind::RightBracket) {
                    break;
                }
                if p.eat(&TokenKind::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assignment()?));
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(elements)
        })?;
        self.expect(&TokenKind::RightBracket)?;

        Ok(Expression::Array(ArrayExpression {
            elements,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_object_literal(&mut self) -> ParseResult<Expression> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LeftBrace)?;

        let properties = self.allow_in(|p| {
            let mut properties = Vec::new();
            while !p.check(&TokenKind::RightBrace) {
                properties.push(p.parse_object_member()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(properties)
        })?;
        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Object(ObjectExpression {
            properties,
            span: self.span_from(start),
        }))
    }

    fn parse_object_member(&mut self) -> ParseResult<ObjectMember> {
        let start = self.current.span.start;

        if self.eat(&TokenKind::Ellipsis) {
            let argument = self.parse_assignment()?;
            return Ok(ObjectMember::Spread(SpreadElement {
                argument: Box::new(argument),
                span: self.span_from(start),
            }));
        }

        let is_async = self.check(&TokenKind::Async) && !self.modifier_is_key() && !self.peek().newline_before;
        if is_async {
            self.advance();
        }
        let is_generator = self.eat(&TokenKind::Star);

        let mut kind = PropertyKind::Init;
        if !is_async && !is_generator && (self.check_identifier("get") || self.check_identifier("set")) && !self.modifier_is_key() {
            kind = if self.check_identifier("get") { PropertyKind::Get } else { PropertyKind::Set };
            self.advance();
        }

        let key = self.parse_property_key()?;

        if self.check(&TokenKind::LeftParen) {
            let function_start = self.current.span.start;
            let function = self.parse_function_rest(function_start, None, is_async, is_generator)?;
            if kind == PropertyKind::Init {
                kind = PropertyKind::Method;
            }
            return Ok(ObjectMember::Property(Property {
                key,
                value: Expression::Function(function),
                kind,
                shorthand: false,
                span: self.span_from(start),
            }));
        }

        if kind != PropertyKind::Init || is_async || is_generator {
            return Err(self.error("expected '(' after method name"));
        }

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_assignment()?;
            return Ok(ObjectMember::Property(Property {
                key,
                value,
                kind,
                shorthand: false,
                span: self.span_from(start),
            }));
        }

        let PropertyKey::Identifier(id) = &key else {
            return Err(self.error("expected ':' after property key"));
        };
        let mut value = Expression::Identifier(id.clone());
        // `{ a = 1 } = obj` destructuring-assignment default
        if self.eat(&TokenKind::Equal) {
            let default = self.parse_assignment()?;
            value = Expression::Assignment(AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left: Box::new(value),
                right: Box::new(default),
                span: self.span_from(start),
            });
        }

        Ok(ObjectMember::Property(Property {
            key,
            value,
            kind,
            shorthand: true,
            span: self.span_from(start),
        }))
    }

    /// Parses an object-literal, class-member or pattern key.
    pub(super) fn parse_property_key(&mut self) -> ParseResult<PropertyKey> {
        let span = self.current.span;
        let literal = match &self.current.kind {
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::BigInt(digits) => Some(Literal::BigInt(digits.clone())),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(PropertyKey::Literal(LiteralExpression { value, span }));
        }

        match &self.current.kind {
            TokenKind::LeftBracket => {
                self.advance();
                let expr = self.allow_in(|p| p.parse_assignment())?;
                self.expect(&TokenKind::RightBracket)?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            TokenKind::PrivateIdentifier(name) => {
                let id = Identifier { name: name.clone(), span };
                self.advance();
                Ok(PropertyKey::Private(id))
            }
            _ => Ok(PropertyKey::Identifier(self.expect_identifier_name()?)),
        }
    }

    // ==================== Binding patterns ====================

    /// Parses an identifier, object pattern or array pattern.
    pub(super) fn parse_binding_target(&mut self) -> ParseResult<Pattern> {
        match &self.current.kind {
            TokenKind::LeftBrace => self.parse_object_pattern(),
            TokenKind::LeftBracket => self.parse_array_pattern(),
            _ => Ok(Pattern::Identifier(self.expect_identifier()?)),
        }
    }

    /// Parses a binding target with an optional default value.
    pub(super) fn parse_binding_element(&mut self) -> ParseResult<Pattern> {
        let start = self.current.span.start;
        let target = self.parse_binding_target()?;
        if !self.eat(&TokenKind::Equal) {
            return Ok(target);
        }
        let default = self.allow_in(|p| p.parse_assignment())?;
        Ok(Pattern::Assignment(AssignmentPattern {
            left: Box::new(target),
            right: Box::new(default),
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_rest_element(&mut self) -> ParseResult<Pattern> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Ellipsis)?;
        let argument = self.parse_binding_target()?;
        Ok(Pattern::Rest(RestElement {
            argument: Box::new(argument),
            span: self.span_from(start),
        }))
    }

    fn parse_object_pattern(&mut self) -> ParseResult<Pattern> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LeftBrace)?;

        let mut properties = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RightBrace) {
            if self.eat(&TokenKind::Ellipsis) {
                rest = Some(Box::new(Pattern::Identifier(self.expect_identifier()?)));
                break;
            }

            let prop_start = self.current.span.start;
            let key = self.parse_property_key()?;
            let (value, shorthand) = if self.eat(&TokenKind::Colon) {
                (self.parse_binding_element()?, false)
            } else {
                let PropertyKey::Identifier(id) = &key else {
                    return Err(self.error("expected ':' in object pattern"));
                };
                let target = Pattern::Identifier(id.clone());
                if self.eat(&TokenKind::Equal) {
                    let default = self.allow_in(|p| p.parse_assignment())?;
                    let pattern = Pattern::Assignment(AssignmentPattern {
                        left: Box::new(target),
                        right: Box::new(default),
                        span: self.span_from(prop_start),
                    });
                    (pattern, true)
                } else {
                    (target, true)
                }
            };

            properties.push(ObjectPatternProperty {
                key,
                value,
                shorthand,
                span: self.span_from(prop_start),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Pattern::Object(ObjectPattern {
            properties,
            rest,
            span: self.span_from(start),
        }))
    }

    fn parse_array_pattern(&mut self) -> ParseResult<Pattern> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LeftBracket)?;

        let mut elements = Vec::new();
        loop {
            if self.check(&TokenKind::RightBracket) {
                break;
            }
            if self.eat(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.check(&TokenKind::Ellipsis) {
                elements.push(Some(self.parse_rest_element()?));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBracket)?;

        Ok(Pattern::Array(ArrayPattern {
            elements,
            span: self.span_from(start),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::Parser;

    fn expr(src: &str) -> Expression {
        let program = Parser::new(src)
            .parse_program()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e));
        match program.body.into_iter().next() {
            Some(Statement::Expression(stmt)) => stmt.expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let Expression::Binary(add) = expr("1 + 2 * 3;") else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator, BinaryOperator::Add);
        assert!(matches!(*add.right, Expression::Binary(BinaryExpression { operator: BinaryOperator::Multiply, .. })));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let Expression::Binary(outer) = expr("2 ** 3 ** 2;") else {
            panic!("expected binary expression");
        };
        assert!(matches!(*outer.left, Expression::Literal(_)));
        assert!(matches!(*outer.right, Expression::Binary(_)));
    }

    #[test]
    fn test_logical_and_nullish() {
        let Expression::Binary(or) = expr("a || b && c;") else {
            panic!("expected binary expression");
        };
        assert_eq!(or.operator, BinaryOperator::LogicalOr);
        let Expression::Binary(nullish) = expr("a ?? b;") else {
            panic!("expected binary expression");
        };
        assert_eq!(nullish.operator, BinaryOperator::NullishCoalescing);
    }

    #[test]
    fn test_chained_assignment_is_right_associative() {
        let Expression::Assignment(outer) = expr("module.exports = exports = fn;") else {
            panic!("expected assignment");
        };
        assert!(matches!(*outer.left, Expression::Member(_)));
        assert!(matches!(*outer.right, Expression::Assignment(_)));
    }

    #[test]
    fn test_member_and_call_chain() {
        let Expression::Member(member) = expr("require('./a').b;") else {
            panic!("expected member expression");
        };
        assert_eq!(member.static_property(), Some("b"));
        assert!(matches!(*member.object, Expression::Call(_)));

        let Expression::Member(computed) = expr("exports['default'];") else {
            panic!("expected member expression");
        };
        assert!(computed.is_computed());
        assert_eq!(computed.static_property(), Some("default"));
    }

    #[test]
    fn test_optional_chaining() {
        let Expression::Call(call) = expr("a?.b?.(c);") else {
            panic!("expected call");
        };
        assert!(call.optional);
    }

    #[test]
    fn test_arrow_functions() {
        assert!(matches!(expr("x => x * 2;"), Expression::Arrow(_)));
        assert!(matches!(expr("(a, { b }, [c] = [], ...d) => a;"), Expression::Arrow(_)));
        assert!(matches!(expr("async () => { await f(); };"), Expression::Arrow(ArrowFunctionExpression { is_async: true, .. })));
        assert!(matches!(expr("async x => x;"), Expression::Arrow(_)));
        assert!(matches!(expr("async(x);"), Expression::Call(_)));
        assert!(matches!(expr("(a, b);"), Expression::Sequence(_)));
    }

    #[test]
    fn test_object_literal_members() {
        let Expression::Object(obj) = expr("({ a, b: 1, 'c-d': 2, 3: x, [k]: v, m() {}, get g() { return 1; }, set g(v) {}, async am() {}, *gen() {}, ...rest, default: 1, get: 2 });") else {
            panic!("expected object");
        };
        assert_eq!(obj.properties.len(), 13);
        let ObjectMember::Property(shorthand) = &obj.properties[0] else { panic!() };
        assert!(shorthand.shorthand);
        let ObjectMember::Property(method) = &obj.properties[5] else { panic!() };
        assert_eq!(method.kind, PropertyKind::Method);
        assert!(matches!(&obj.properties[10], ObjectMember::Spread(_)));
        let ObjectMember::Property(get_key) = &obj.properties[12] else { panic!() };
        assert_eq!(get_key.kind, PropertyKind::Init);
        assert_eq!(get_key.key.static_name().as_deref(), Some("get"));
    }

    #[test]
    fn test_regex_literal() {
        let Expression::Call(call) = expr("/a\\/b/g.test(s);") else {
            panic!("expected call");
        };
        let Expression::Member(member) = call.callee.as_ref() else { panic!() };
        assert!(matches!(
            member.object.as_ref(),
            Expression::Literal(LiteralExpression { value: Literal::RegExp { .. }, .. })
        ));
        assert!(matches!(expr("a / b / c;"), Expression::Binary(_)));
    }

    #[test]
    fn test_new_expressions() {
        let Expression::New(new) = expr("new Foo.Bar(1);") else {
            panic!("expected new");
        };
        assert!(matches!(new.callee.as_ref(), Expression::Member(_)));
        assert_eq!(new.arguments.len(), 1);
        assert!(matches!(expr("new Foo;"), Expression::New(_)));
        assert!(matches!(expr("new Foo().bar();"), Expression::Call(_)));
    }

    #[test]
    fn test_templates() {
        assert!(matches!(expr("`a ${b} c`;"), Expression::Template(_)));
        assert!(matches!(expr("tag`x`;"), Expression::TaggedTemplate(_)));
    }

    #[test]
    fn test_dynamic_import_and_meta() {
        let Expression::Import(import) = expr("import('./x.js');") else {
            panic!("expected import call");
        };
        assert_eq!(import.source.as_string_literal(), Some("./x.js"));
        assert!(Parser::new_module("const url = import.meta.url;").parse_program().is_ok());
    }

    #[test]
    fn test_update_and_unary() {
        assert!(matches!(expr("i++;"), Expression::Update(UpdateExpression { prefix: false, .. })));
        assert!(matches!(expr("--i;"), Expression::Update(UpdateExpression { prefix: true, .. })));
        assert!(matches!(expr("typeof module;"), Expression::Unary(_)));
        assert!(matches!(expr("delete exports.a;"), Expression::Unary(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(Parser::new("f() = 1;").parse_program().is_err());
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(expr("a ? b : c ? d : e;"), Expression::Conditional(_)));
    }

    #[test]
    fn test_expression_spans() {
        let src = "module.exports.foo = bar;";
        let Expression::Assignment(assign) = expr(src) else {
            panic!("expected assignment");
        };
        assert_eq!(assign.left.span().text(src), "module.exports.foo");
        assert_eq!(assign.right.span().text(src), "bar");
        assert_eq!(assign.span.text(src), "module.exports.foo = bar");
    }
}
