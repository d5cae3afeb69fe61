// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Consumer scanning: how a module uses the modules it depends on.
//!
//! Every `import`, `export ... from`, `import()` and `require()` becomes a
//! [`ConsumerUse`] naming the kind of binding it takes. Membership probes
//! (`'x' in ns`, `ns.hasOwnProperty('x')`) on those bindings are attached
//! to the use they probe.

use modshim_syntax::Span;
use modshim_syntax::ast::{
    BinaryOperator, CallExpression, ExportDeclaration, Expression, ImportSpecifier, MemberProperty, Nesting, Pattern,
    Program, Statement, VariableDeclaration, Visitor, walk_expression, walk_statement,
};
use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::infer::require_source;

/// Which kind of binding a consumer takes from a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum BindingKind {
    /// `import x from`, `import { default as x } from`
    Default,
    /// `import { x } from`, `require('m').x`, `const { x } = require('m')`
    Named(String),
    /// `import * as ns from`, `export * from`, `import()`
    Namespace,
    /// `require('m')` used as a whole value
    DynamicRequireWhole,
}

/// The syntax a consumer binding was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerSyntax {
    /// Static `import` declaration
    EsmImport,
    /// `export ... from`
    EsmReExport,
    /// `require()` call
    Require,
    /// `import()` expression
    DynamicImport,
}

impl ConsumerSyntax {
    /// Returns true for syntax that links at module instantiation.
    pub fn is_static_esm(&self) -> bool {
        matches!(self, ConsumerSyntax::EsmImport | ConsumerSyntax::EsmReExport)
    }
}

/// One use of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerUse {
    /// Specifier as written
    pub specifier: String,
    /// Binding taken
    pub kind: BindingKind,
    /// Syntax used
    pub syntax: ConsumerSyntax,
    /// Local name the binding is stored in
    pub local: Option<String>,
    /// Names tested for membership on the binding
    pub probes: Vec<String>,
    /// Location of the import or call
    pub span: Span,
}

/// A `require()` call with a literal specifier, for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequireCall {
    pub specifier: String,
    pub span: Span,
    /// Inside a branch, loop, catch clause or function
    pub nested: bool,
}

/// Result of scanning one module.
#[derive(Debug, Clone, Default)]
pub struct ConsumerScan {
    /// Uses in source order
    pub uses: Vec<ConsumerUse>,
    /// Warnings about dependencies that cannot be followed
    pub diagnostics: Vec<Diagnostic>,
    pub(crate) requires: Vec<RequireCall>,
}

/// Scans a parsed module for the bindings it takes from other modules.
pub fn scan_consumers(program: &Program) -> ConsumerScan {
    let mut scanner = Scanner::default();
    for stmt in &program.body {
        scanner.visit_statement(stmt);
    }
    let mut scan = scanner.scan;
    for (local, name) in scanner.probes {
        if let Some(consumer) = scan.uses.iter_mut().rev().find(|u| u.local.as_deref() == Some(local.as_str())) {
            if !consumer.probes.contains(&name) {
                consumer.probes.push(name);
            }
        }
    }
    scan
}

#[derive(Default)]
struct Scanner {
    depth: usize,
    scan: ConsumerScan,
    probes: Vec<(String, String)>,
}

impl Scanner {
    fn push(&mut self, specifier: &str, kind: BindingKind, syntax: ConsumerSyntax, local: Option<&str>, span: Span) {
        self.scan.uses.push(ConsumerUse {
            specifier: specifier.to_string(),
            kind,
            syntax,
            local: local.map(str::to_string),
            probes: Vec::new(),
            span,
        });
    }

    fn require_call(&mut self, specifier: &str, span: Span) {
        self.scan.requires.push(RequireCall {
            specifier: specifier.to_string(),
            span,
            nested: self.depth > 0,
        });
    }

    fn declaration(&mut self, decl: &VariableDeclaration) {
        for declarator in &decl.declarations {
            let Some(init) = &declarator.init else {
                self.visit_pattern(&declarator.id);
                continue;
            };
            let Some(specifier) = require_source(init) else {
                self.visit_pattern(&declarator.id);
                self.visit_expression(init);
                continue;
            };
            self.require_call(specifier, init.span());
            match &declarator.id {
                Pattern::Identifier(id) => self.push(
                    specifier,
                    BindingKind::DynamicRequireWhole,
                    ConsumerSyntax::Require,
                    Some(&id.name),
                    declarator.span,
                ),
                Pattern::Object(object) if object.rest.is_none() => {
                    for prop in &object.properties {
                        match prop.key.static_name() {
                            Some(name) => {
                                let local = prop.value.as_identifier().map(|id| id.name.as_str());
                                self.push(specifier, BindingKind::Named(name), ConsumerSyntax::Require, local, prop.span);
                            }
                            None => self.push(
                                specifier,
                                BindingKind::DynamicRequireWhole,
                                ConsumerSyntax::Require,
                                None,
                                prop.span,
                            ),
                        }
                    }
                    self.visit_pattern(&declarator.id);
                }
                _ => {
                    self.push(
                        specifier,
                        BindingKind::DynamicRequireWhole,
                        ConsumerSyntax::Require,
                        None,
                        declarator.span,
                    );
                    self.visit_pattern(&declarator.id);
                }
            }
        }
    }

    /// `Object.hasOwn(x, 'k')`, `Reflect.has(x, 'k')`, `x.hasOwnProperty('k')`,
    /// `Object.prototype.hasOwnProperty.call(x, 'k')`
    fn membership_call<'e>(call: &'e CallExpression) -> Option<(&'e Expression, &'e str)> {
        let Expression::Member(callee) = &*call.callee else {
            return None;
        };
        let method = callee.static_property()?;
        match (callee.object.as_identifier(), method, call.arguments.as_slice()) {
            (Some("Object"), "hasOwn", [target, key]) | (Some("Reflect"), "has", [target, key]) => {
                Some((target, key.as_string_literal()?))
            }
            (_, "hasOwnProperty", [key]) => Some((&*callee.object, key.as_string_literal()?)),
            (_, "call", [target, key]) => {
                let Expression::Member(inner) = &*callee.object else {
                    return None;
                };
                (inner.static_property() == Some("hasOwnProperty")).then_some(())?;
                Some((target, key.as_string_literal()?))
            }
            _ => None,
        }
    }

    fn probe(&mut self, target: &Expression, name: &str, span: Span) -> bool {
        if let Some(local) = target.as_identifier() {
            self.probes.push((local.to_string(), name.to_string()));
            return false;
        }
        if let Some(specifier) = require_source(target) {
            self.require_call(specifier, target.span());
            self.scan.uses.push(ConsumerUse {
                specifier: specifier.to_string(),
                kind: BindingKind::DynamicRequireWhole,
                syntax: ConsumerSyntax::Require,
                local: None,
                probes: vec![name.to_string()],
                span,
            });
            return true;
        }
        false
    }
}

impl Visitor for Scanner {
    fn enter(&mut self, _nesting: Nesting) {
        self.depth += 1;
    }

    fn leave(&mut self, _nesting: Nesting) {
        self.depth -= 1;
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Import(import) => {
                let specifier = &import.source.value;
                for spec in &import.specifiers {
                    match spec {
                        ImportSpecifier::Default(local) => self.push(
                            specifier,
                            BindingKind::Default,
                            ConsumerSyntax::EsmImport,
                            Some(&local.name),
                            import.span,
                        ),
                        ImportSpecifier::Namespace(local) => self.push(
                            specifier,
                            BindingKind::Namespace,
                            ConsumerSyntax::EsmImport,
                            Some(&local.name),
                            import.span,
                        ),
                        ImportSpecifier::Named { imported, local } => {
                            let kind = match imported.name.as_str() {
                                "default" => BindingKind::Default,
                                name => BindingKind::Named(name.to_string()),
                            };
                            self.push(specifier, kind, ConsumerSyntax::EsmImport, Some(&local.name), import.span);
                        }
                    }
                }
            }
            Statement::Export(ExportDeclaration::Named(named)) => {
                if let Some(source) = &named.source {
                    for spec in &named.specifiers {
                        let kind = match spec.local.name.as_str() {
                            "default" => BindingKind::Default,
                            name => BindingKind::Named(name.to_string()),
                        };
                        self.push(&source.value, kind, ConsumerSyntax::EsmReExport, None, spec.span);
                    }
                }
            }
            Statement::Export(ExportDeclaration::All(all)) => {
                self.push(
                    &all.source.value,
                    BindingKind::Namespace,
                    ConsumerSyntax::EsmReExport,
                    None,
                    all.span,
                );
            }
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::Expression(s) => match require_source(&s.expression) {
                // side-effect only
                Some(specifier) => self.require_call(specifier, s.expression.span()),
                None => walk_statement(self, stmt),
            },
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Member(member) => {
                if let Some(specifier) = require_source(&member.object) {
                    self.require_call(specifier, member.object.span());
                    let kind = match member.static_property() {
                        Some(name) => BindingKind::Named(name.to_string()),
                        None => BindingKind::DynamicRequireWhole,
                    };
                    self.push(specifier, kind, ConsumerSyntax::Require, None, member.span);
                    if let MemberProperty::Expression(property) = &member.property {
                        self.visit_expression(property);
                    }
                    return;
                }
            }
            Expression::Call(call) => {
                if let Some(specifier) = require_source(expr) {
                    self.require_call(specifier, call.span);
                    self.push(
                        specifier,
                        BindingKind::DynamicRequireWhole,
                        ConsumerSyntax::Require,
                        None,
                        call.span,
                    );
                    return;
                }
                if call.callee.as_identifier() == Some("require") && !call.arguments.is_empty() {
                    self.scan.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::DynamicSpecifier,
                            "require() with a computed specifier cannot be followed statically",
                        )
                        .with_span(call.span),
                    );
                }
                if let Some((target, name)) = Self::membership_call(call) {
                    if self.probe(target, name, call.span) {
                        return;
                    }
                }
            }
            Expression::Import(import) => match import.source.as_string_literal() {
                Some(specifier) => self.push(
                    specifier,
                    BindingKind::Namespace,
                    ConsumerSyntax::DynamicImport,
                    None,
                    import.span,
                ),
                None => self.scan.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::DynamicSpecifier,
                        "import() with a computed specifier cannot be followed statically",
                    )
                    .with_span(import.span),
                ),
            },
            Expression::Binary(binary) if binary.operator == BinaryOperator::In => {
                if let Some(name) = binary.left.as_string_literal() {
                    if self.probe(&binary.right, name, binary.span) {
                        return;
                    }
                }
            }
            _ => {}
        }
        walk_expression(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modshim_syntax::{parse_module, parse_script};

    fn kinds(scan: &ConsumerScan) -> Vec<(&str, BindingKind, ConsumerSyntax)> {
        scan.uses
            .iter()
            .map(|u| (u.specifier.as_str(), u.kind.clone(), u.syntax))
            .collect()
    }

    #[test]
    fn test_esm_imports() {
        let program = parse_module(
            "import a from './a';\n\
             import { b, default as c, d as e } from './b';\n\
             import * as ns from './ns';\n\
             import './side';\n\
             export { f } from './f';\n\
             export * from './all';",
        )
        .expect("parses");
        let scan = scan_consumers(&program);
        assert_eq!(
            kinds(&scan),
            vec![
                ("./a", BindingKind::Default, ConsumerSyntax::EsmImport),
                ("./b", BindingKind::Named("b".into()), ConsumerSyntax::EsmImport),
                ("./b", BindingKind::Default, ConsumerSyntax::EsmImport),
                ("./b", BindingKind::Named("d".into()), ConsumerSyntax::EsmImport),
                ("./ns", BindingKind::Namespace, ConsumerSyntax::EsmImport),
                ("./f", BindingKind::Named("f".into()), ConsumerSyntax::EsmReExport),
                ("./all", BindingKind::Namespace, ConsumerSyntax::EsmReExport),
            ]
        );
        assert_eq!(scan.uses[3].local.as_deref(), Some("e"));
    }

    #[test]
    fn test_requires() {
        let program = parse_script(
            "const fs = require('fs');\n\
             const { join, resolve: res } = require('path');\n\
             const helper = require('./util').helper;\n\
             require('./polyfill');\n\
             function lazy() { return require('./lazy'); }",
        )
        .expect("parses");
        let scan = scan_consumers(&program);
        assert_eq!(
            kinds(&scan),
            vec![
                ("fs", BindingKind::DynamicRequireWhole, ConsumerSyntax::Require),
                ("path", BindingKind::Named("join".into()), ConsumerSyntax::Require),
                ("path", BindingKind::Named("resolve".into()), ConsumerSyntax::Require),
                ("./util", BindingKind::Named("helper".into()), ConsumerSyntax::Require),
                ("./lazy", BindingKind::DynamicRequireWhole, ConsumerSyntax::Require),
            ]
        );
        assert_eq!(scan.requires.len(), 5);
        assert!(scan.requires[4].nested);
        assert!(!scan.requires[3].nested);
    }

    #[test]
    fn test_membership_probes() {
        let program = parse_module(
            "import * as ns from './dyn';\n\
             if ('foo' in ns) ns.initialize('foo');\n\
             Object.hasOwn(ns, 'bar');\n\
             Object.prototype.hasOwnProperty.call(ns, 'baz');",
        )
        .expect("parses");
        let scan = scan_consumers(&program);
        assert_eq!(scan.uses.len(), 1);
        assert_eq!(scan.uses[0].probes, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_probe_on_require_call() {
        let program = parse_script("if ('x' in require('./m')) {}").expect("parses");
        let scan = scan_consumers(&program);
        assert_eq!(scan.uses.len(), 1);
        assert_eq!(scan.uses[0].kind, BindingKind::DynamicRequireWhole);
        assert_eq!(scan.uses[0].probes, vec!["x"]);
    }

    #[test]
    fn test_dynamic_specifiers_warn() {
        let program = parse_script("require(name); import(`./${x}`);").expect("parses");
        let scan = scan_consumers(&program);
        assert!(scan.uses.is_empty());
        assert_eq!(scan.diagnostics.len(), 2);
        assert_eq!(scan.diagnostics[0].code, DiagnosticCode::DynamicSpecifier);
    }

    #[test]
    fn test_dynamic_import() {
        let program = parse_script("async function f() { const m = await import('./m'); }").expect("parses");
        let scan = scan_consumers(&program);
        assert_eq!(kinds(&scan), vec![("./m", BindingKind::Namespace, ConsumerSyntax::DynamicImport)]);
    }
}
