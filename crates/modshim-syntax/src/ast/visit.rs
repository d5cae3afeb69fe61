//! Read-only AST traversal.
//!
//! A [`Visitor`] receives every statement and expression in evaluation
//! order. Whenever the walk descends into code that does not run exactly
//! once, unconditionally, as part of the enclosing code, the visitor is
//! told through [`Visitor::enter`] / [`Visitor::leave`] which kind of
//! nesting it is in. Analyses use this to tell top-level, guaranteed
//! effects apart from conditional ones.

use super::*;

/// Why a region of code may not execute exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// `if`/`else`, `switch` cases, ternary arms, logical right operands,
    /// default values and `with` bodies
    Branch,
    /// Loop bodies, loop updates and for-in/of heads
    Loop,
    /// Function, method, arrow and class field bodies
    Function,
    /// `catch` clauses
    Catch,
}

/// A visitor over the AST.
///
/// Every method has a default that continues the walk, so implementors
/// override only what they inspect and call the matching `walk_*`
/// function to keep descending.
pub trait Visitor {
    /// Called before descending into nested code.
    fn enter(&mut self, _nesting: Nesting) {}

    /// Called after leaving nested code.
    fn leave(&mut self, _nesting: Nesting) {}

    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }

    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }

    fn visit_class(&mut self, class: &Class) {
        walk_class(self, class);
    }
}

fn nested<V: Visitor + ?Sized>(visitor: &mut V, nesting: Nesting, f: impl FnOnce(&mut V)) {
    visitor.enter(nesting);
    f(visitor);
    visitor.leave(nesting);
}

fn walk_body<V: Visitor + ?Sized>(visitor: &mut V, body: &[Statement]) {
    for stmt in body {
        visitor.visit_statement(stmt);
    }
}

fn walk_declaration<V: Visitor + ?Sized>(visitor: &mut V, decl: &VariableDeclaration) {
    for declarator in &decl.declarations {
        visitor.visit_pattern(&declarator.id);
        if let Some(init) = &declarator.init {
            visitor.visit_expression(init);
        }
    }
}

fn walk_for_left<V: Visitor + ?Sized>(visitor: &mut V, left: &ForInLeft) {
    match left {
        ForInLeft::Declaration(decl) => walk_declaration(visitor, decl),
        ForInLeft::Expression(expr) => visitor.visit_expression(expr),
    }
}

fn walk_property_key<V: Visitor + ?Sized>(visitor: &mut V, key: &PropertyKey) {
    if let PropertyKey::Computed(expr) = key {
        visitor.visit_expression(expr);
    }
}

/// Walks the children of a statement.
pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::VariableDeclaration(decl) => walk_declaration(visitor, decl),
        Statement::FunctionDeclaration(function) => visitor.visit_function(function),
        Statement::ClassDeclaration(class) => visitor.visit_class(class),
        Statement::Expression(s) => visitor.visit_expression(&s.expression),
        Statement::Block(block) => walk_body(visitor, &block.body),
        Statement::If(s) => {
            visitor.visit_expression(&s.test);
            nested(visitor, Nesting::Branch, |v| v.visit_statement(&s.consequent));
            if let Some(alternate) = &s.alternate {
                nested(visitor, Nesting::Branch, |v| v.visit_statement(alternate));
            }
        }
        Statement::Switch(s) => {
            visitor.visit_expression(&s.discriminant);
            for case in &s.cases {
                nested(visitor, Nesting::Branch, |v| {
                    if let Some(test) = &case.test {
                        v.visit_expression(test);
                    }
                    walk_body(v, &case.consequent);
                });
            }
        }
        Statement::While(s) => {
            visitor.visit_expression(&s.test);
            nested(visitor, Nesting::Loop, |v| v.visit_statement(&s.body));
        }
        Statement::DoWhile(s) => {
            nested(visitor, Nesting::Loop, |v| {
                v.visit_statement(&s.body);
                v.visit_expression(&s.test);
            });
        }
        Statement::For(s) => {
            match &s.init {
                Some(ForInit::Declaration(decl)) => walk_declaration(visitor, decl),
                Some(ForInit::Expression(expr)) => visitor.visit_expression(expr),
                None => {}
            }
            if let Some(test) = &s.test {
                visitor.visit_expression(test);
            }
            nested(visitor, Nesting::Loop, |v| {
                v.visit_statement(&s.body);
                if let Some(update) = &s.update {
                    v.visit_expression(update);
                }
            });
        }
        Statement::ForIn(s) => {
            visitor.visit_expression(&s.right);
            nested(visitor, Nesting::Loop, |v| {
                walk_for_left(v, &s.left);
                v.visit_statement(&s.body);
            });
        }
        Statement::ForOf(s) => {
            visitor.visit_expression(&s.right);
            nested(visitor, Nesting::Loop, |v| {
                walk_for_left(v, &s.left);
                v.visit_statement(&s.body);
            });
        }
        Statement::Return(s) => {
            if let Some(argument) = &s.argument {
                visitor.visit_expression(argument);
            }
        }
        Statement::Throw(s) => visitor.visit_expression(&s.argument),
        Statement::Try(s) => {
            walk_body(visitor, &s.block.body);
            if let Some(handler) = &s.handler {
                nested(visitor, Nesting::Catch, |v| {
                    if let Some(param) = &handler.param {
                        v.visit_pattern(param);
                    }
                    walk_body(v, &handler.body.body);
                });
            }
            if let Some(finalizer) = &s.finalizer {
                walk_body(visitor, &finalizer.body);
            }
        }
        Statement::With(s) => {
            visitor.visit_expression(&s.object);
            nested(visitor, Nesting::Branch, |v| v.visit_statement(&s.body));
        }
        Statement::Labeled(s) => visitor.visit_statement(&s.body),
        Statement::Export(export) => match export {
            ExportDeclaration::Declaration(decl) => visitor.visit_statement(&decl.declaration),
            ExportDeclaration::Default(default) => match &default.declaration {
                ExportDefaultKind::Function(function) => visitor.visit_function(function),
                ExportDefaultKind::Class(class) => visitor.visit_class(class),
                ExportDefaultKind::Expression(expr) => visitor.visit_expression(expr),
            },
            ExportDeclaration::Named(_) | ExportDeclaration::All(_) => {}
        },
        Statement::Import(_)
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Debugger(_)
        | Statement::Empty(_) => {}
    }
}

/// Walks the children of an expression.
pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Literal(_)
        | Expression::Identifier(_)
        | Expression::This(_)
        | Expression::Super(_)
        | Expression::Template(_)
        | Expression::MetaProperty(_) => {}
        Expression::Array(array) => {
            for element in array.elements.iter().flatten() {
                visitor.visit_expression(element);
            }
        }
        Expression::Object(object) => {
            for member in &object.properties {
                match member {
                    ObjectMember::Property(prop) => {
                        walk_property_key(visitor, &prop.key);
                        visitor.visit_expression(&prop.value);
                    }
                    ObjectMember::Spread(spread) => visitor.visit_expression(&spread.argument),
                }
            }
        }
        Expression::Binary(binary) => {
            visitor.visit_expression(&binary.left);
            if binary.operator.is_logical() {
                nested(visitor, Nesting::Branch, |v| v.visit_expression(&binary.right));
            } else {
                visitor.visit_expression(&binary.right);
            }
        }
        Expression::Unary(unary) => visitor.visit_expression(&unary.argument),
        Expression::Update(update) => visitor.visit_expression(&update.argument),
        Expression::Assignment(assign) => {
            visitor.visit_expression(&assign.left);
            let short_circuits = matches!(
                assign.operator,
                AssignmentOperator::LogicalAndAssign
                    | AssignmentOperator::LogicalOrAssign
                    | AssignmentOperator::NullishCoalescingAssign
            );
            if short_circuits {
                nested(visitor, Nesting::Branch, |v| v.visit_expression(&assign.right));
            } else {
                visitor.visit_expression(&assign.right);
            }
        }
        Expression::Call(call) => {
            visitor.visit_expression(&call.callee);
            for argument in &call.arguments {
                visitor.visit_expression(argument);
            }
        }
        Expression::New(new) => {
            visitor.visit_expression(&new.callee);
            for argument in &new.arguments {
                visitor.visit_expression(argument);
            }
        }
        Expression::Member(member) => {
            visitor.visit_expression(&member.object);
            if let MemberProperty::Expression(property) = &member.property {
                visitor.visit_expression(property);
            }
        }
        Expression::Conditional(cond) => {
            visitor.visit_expression(&cond.test);
            nested(visitor, Nesting::Branch, |v| v.visit_expression(&cond.consequent));
            nested(visitor, Nesting::Branch, |v| v.visit_expression(&cond.alternate));
        }
        Expression::Function(function) => visitor.visit_function(function),
        Expression::Arrow(arrow) => nested(visitor, Nesting::Function, |v| {
            for param in &arrow.params {
                v.visit_pattern(param);
            }
            match &arrow.body {
                ArrowBody::Expression(body) => v.visit_expression(body),
                ArrowBody::Block(body) => walk_body(v, body),
            }
        }),
        Expression::Class(class) => visitor.visit_class(class),
        Expression::Sequence(seq) => {
            for expr in &seq.expressions {
                visitor.visit_expression(expr);
            }
        }
        Expression::TaggedTemplate(tagged) => visitor.visit_expression(&tagged.tag),
        Expression::Spread(spread) => visitor.visit_expression(&spread.argument),
        Expression::Yield(y) => {
            if let Some(argument) = &y.argument {
                visitor.visit_expression(argument);
            }
        }
        Expression::Await(a) => visitor.visit_expression(&a.argument),
        Expression::Import(import) => visitor.visit_expression(&import.source),
    }
}

/// Walks the children of a binding pattern. Default values are conditional.
pub fn walk_pattern<V: Visitor + ?Sized>(visitor: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Identifier(_) => {}
        Pattern::Object(obj) => {
            for prop in &obj.properties {
                walk_property_key(visitor, &prop.key);
                visitor.visit_pattern(&prop.value);
            }
            if let Some(rest) = &obj.rest {
                visitor.visit_pattern(rest);
            }
        }
        Pattern::Array(arr) => {
            for element in arr.elements.iter().flatten() {
                visitor.visit_pattern(element);
            }
        }
        Pattern::Assignment(p) => {
            visitor.visit_pattern(&p.left);
            nested(visitor, Nesting::Branch, |v| v.visit_expression(&p.right));
        }
        Pattern::Rest(p) => visitor.visit_pattern(&p.argument),
    }
}

/// Walks a function's parameters and body inside [`Nesting::Function`].
pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, function: &Function) {
    nested(visitor, Nesting::Function, |v| {
        for param in &function.params {
            v.visit_pattern(param);
        }
        walk_body(v, &function.body);
    });
}

/// Walks a class. The heritage clause, computed keys, static fields and
/// static blocks run when the class is defined; everything else is deferred.
pub fn walk_class<V: Visitor + ?Sized>(visitor: &mut V, class: &Class) {
    if let Some(super_class) = &class.super_class {
        visitor.visit_expression(super_class);
    }
    for member in &class.body {
        match member {
            ClassMember::Method(method) => {
                walk_property_key(visitor, &method.key);
                visitor.visit_function(&method.function);
            }
            ClassMember::Field(field) => {
                walk_property_key(visitor, &field.key);
                if let Some(value) = &field.value {
                    if field.is_static {
                        visitor.visit_expression(value);
                    } else {
                        nested(visitor, Nesting::Function, |v| v.visit_expression(value));
                    }
                }
            }
            ClassMember::StaticBlock(block) => walk_body(visitor, &block.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_script;

    #[derive(Default)]
    struct DepthRecorder {
        depth: usize,
        identifiers: Vec<(String, usize)>,
    }

    impl Visitor for DepthRecorder {
        fn enter(&mut self, _nesting: Nesting) {
            self.depth += 1;
        }

        fn leave(&mut self, _nesting: Nesting) {
            self.depth -= 1;
        }

        fn visit_expression(&mut self, expr: &Expression) {
            if let Expression::Identifier(id) = expr {
                self.identifiers.push((id.name.clone(), self.depth));
            }
            walk_expression(self, expr);
        }
    }

    fn depths(source: &str) -> Vec<(String, usize)> {
        let program = parse_script(source).expect("parses");
        let mut recorder = DepthRecorder::default();
        for stmt in &program.body {
            recorder.visit_statement(stmt);
        }
        recorder.identifiers
    }

    #[test]
    fn test_if_branches_are_nested() {
        let seen = depths("if (a) { b; } else { c; }");
        assert_eq!(seen, vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 1)]);
    }

    #[test]
    fn test_logical_right_operand_is_nested() {
        let seen = depths("a && b;");
        assert_eq!(seen, vec![("a".into(), 0), ("b".into(), 1)]);
    }

    #[test]
    fn test_function_body_is_nested() {
        let seen = depths("function f() { x; } y;");
        assert_eq!(seen, vec![("x".into(), 1), ("y".into(), 0)]);
    }

    #[test]
    fn test_try_block_is_not_nested_but_catch_is() {
        let seen = depths("try { a; } catch (e) { b; } finally { c; }");
        assert_eq!(seen, vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 0)]);
    }

    #[test]
    fn test_for_head_and_body() {
        let seen = depths("for (i = start; i < end; i++) { body; }");
        let names: Vec<_> = seen.iter().map(|(n, d)| (n.as_str(), *d)).collect();
        assert_eq!(
            names,
            vec![("i", 0), ("start", 0), ("i", 0), ("end", 0), ("body", 1), ("i", 1)]
        );
    }
}
