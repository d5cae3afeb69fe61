// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Export shape inference.
//!
//! CommonJS modules are walked once to collect every write to `exports` /
//! `module.exports` in evaluation order, tagged with whether it runs
//! unconditionally at module level. The writes are then folded into an
//! [`ExportShapeDescriptor`]: the last unconditional whole-value
//! assignment wins and discards earlier named writes, property writes
//! accumulate onto whatever object is current.
//!
//! Any use of the export object that cannot be enumerated statically
//! (aliasing it, passing it to a function, indexing it with a computed
//! key) fails with [`InteropError::Analysis`].

use modshim_syntax::Span;
use modshim_syntax::ast::{
    ArrowBody, AssignmentExpression, AssignmentOperator, CallExpression, Expression, ExportDeclaration,
    ExportDefaultKind, MemberExpression, Nesting, ObjectExpression, ObjectMember, Program, PropertyKind,
    SourceType, Statement, UnaryOperator, Visitor, walk_expression, walk_statement,
};

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::{InteropError, Result};
use crate::shape::{DefaultProvenance, ExportShapeDescriptor, NamedBinding, ShapeTag, ValueProvenance};

/// Infers the export shape of a parsed module. Scripts are analyzed as
/// CommonJS, module-goal programs as native ESM.
pub fn infer(program: &Program, source: &str) -> Result<ExportShapeDescriptor> {
    match program.source_type {
        SourceType::Script => infer_commonjs(program, source),
        SourceType::Module => Ok(infer_esm(program, source)),
    }
}

/// Infers the export shape of a CommonJS module.
pub fn infer_commonjs(program: &Program, source: &str) -> Result<ExportShapeDescriptor> {
    let collected = collect(program, source)?;
    let mut folder = ShapeFolder::default();
    for write in &collected.writes {
        folder.apply(write)?;
    }
    folder.finish()
}

/// Summarizes the export declarations of an ECMAScript module.
pub fn infer_esm(program: &Program, source: &str) -> ExportShapeDescriptor {
    let mut shape = ExportShapeDescriptor::new(ShapeTag::NamedOnly);
    shape.native_esm = true;

    for stmt in &program.body {
        let Statement::Export(export) = stmt else {
            continue;
        };
        match export {
            ExportDeclaration::Declaration(decl) => match &*decl.declaration {
                Statement::VariableDeclaration(var) => {
                    let mut names = Vec::new();
                    for declarator in &var.declarations {
                        declarator.id.bound_names(&mut names);
                    }
                    for name in names {
                        push_export(&mut shape, name, ValueProvenance::local(name), decl.span);
                    }
                }
                Statement::FunctionDeclaration(function) => {
                    if let Some(id) = &function.id {
                        push_export(&mut shape, &id.name, ValueProvenance::local(&id.name), decl.span);
                    }
                }
                Statement::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        push_export(&mut shape, &id.name, ValueProvenance::local(&id.name), decl.span);
                    }
                }
                _ => {}
            },
            ExportDeclaration::Named(named) => {
                for spec in &named.specifiers {
                    let provenance = match &named.source {
                        Some(source) => ValueProvenance::reexport(&source.value, &spec.local.name),
                        None => ValueProvenance::local(&spec.local.name),
                    };
                    push_export(&mut shape, &spec.exported.name, provenance, spec.span);
                }
            }
            ExportDeclaration::Default(default) => {
                let provenance = match &default.declaration {
                    ExportDefaultKind::Function(f) => f.id.as_ref().map(|id| ValueProvenance::local(&id.name)),
                    ExportDefaultKind::Class(c) => c.id.as_ref().map(|id| ValueProvenance::local(&id.name)),
                    ExportDefaultKind::Expression(expr) => Some(provenance_of(expr, source)),
                }
                .unwrap_or_else(|| ValueProvenance::expression(text_of(default.span, source)));
                shape.default = DefaultProvenance::Explicit(provenance);
            }
            ExportDeclaration::All(all) => match &all.exported {
                Some(name) => push_export(
                    &mut shape,
                    &name.name,
                    ValueProvenance::Namespace {
                        source: all.source.value.clone(),
                    },
                    all.span,
                ),
                None => shape.reexport_sources.push(all.source.value.clone()),
            },
        }
    }

    if shape.named.is_empty() && shape.default == DefaultProvenance::Absent && !shape.reexport_sources.is_empty() {
        shape.tag = ShapeTag::ReExportAll;
    }
    shape
}

fn push_export(shape: &mut ExportShapeDescriptor, name: &str, provenance: ValueProvenance, span: Span) {
    if name == "default" {
        shape.default = DefaultProvenance::Explicit(provenance);
    } else {
        shape.named.push(NamedBinding {
            name: name.to_string(),
            provenance,
            span,
        });
    }
}

/// How a property value was spelled, for the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueForm {
    /// `name: value` or `exports.name = value`
    Plain,
    /// `{ name }`
    Shorthand,
    /// `name() {}`, possibly async and/or a generator
    Method { is_async: bool, is_generator: bool },
}

/// One export property being written.
#[derive(Debug, Clone)]
pub(crate) struct PropertyWrite {
    pub name: String,
    pub provenance: ValueProvenance,
    /// The `exports.name` target, or the whole object-literal member
    pub span: Span,
    /// The `exports` / `module.exports` expression written through
    pub target: Option<Span>,
    pub value_span: Span,
    pub form: ValueForm,
}

/// The right-hand side of `module.exports = ...`.
#[derive(Debug, Clone)]
pub(crate) enum WholeValue {
    Object {
        properties: Vec<PropertyWrite>,
        spreads: Vec<String>,
        span: Span,
    },
    Require {
        source: String,
    },
    Value {
        provenance: ValueProvenance,
        /// Name of a named function or class expression
        declares: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum WriteTarget {
    /// `module.exports = value`
    Whole(WholeValue),
    /// `exports.name = value`, `Object.defineProperty(exports, 'name', ...)`
    Property(PropertyWrite),
    /// `Object.assign(module.exports, { ... })`
    Members {
        properties: Vec<PropertyWrite>,
        object: Span,
        target: Span,
    },
    /// `exports = value`
    Detached,
}

/// A write to the export object.
#[derive(Debug, Clone)]
pub(crate) struct ExportWrite {
    pub target: WriteTarget,
    /// Runs inside a branch, loop, catch clause or function
    pub conditional: bool,
    /// Uses a compound operator (`exports.n += 1`)
    pub compound: bool,
    /// The whole write expression
    pub span: Span,
    /// The value being written
    pub value_span: Span,
    /// Top-level function the write happens in
    pub initializer: Option<String>,
}

/// A read of `exports.name`.
#[derive(Debug, Clone)]
pub(crate) struct ExportRead {
    pub name: String,
    pub span: Span,
}

/// Every interaction a CommonJS module has with its export object.
#[derive(Debug, Clone, Default)]
pub(crate) struct Collected {
    pub writes: Vec<ExportWrite>,
    pub reads: Vec<ExportRead>,
    /// `__esModule` interop markers
    pub markers: Vec<Span>,
}

pub(crate) fn collect(program: &Program, source: &str) -> Result<Collected> {
    let mut collector = Collector {
        source,
        depth: 0,
        functions: 0,
        initializer: None,
        collected: Collected::default(),
        error: None,
    };
    for stmt in &program.body {
        collector.visit_statement(stmt);
    }
    match collector.error {
        Some(err) => Err(err),
        None => Ok(collector.collected),
    }
}

struct Collector<'s> {
    source: &'s str,
    depth: usize,
    functions: usize,
    initializer: Option<String>,
    collected: Collected,
    error: Option<InteropError>,
}

impl Collector<'_> {
    fn fail(&mut self, reason: &str, span: Span) {
        if self.error.is_none() {
            self.error = Some(InteropError::analysis(reason, span));
        }
    }

    fn record(&mut self, target: WriteTarget, span: Span, value_span: Span, compound: bool) {
        let initializer = if self.functions > 0 { self.initializer.clone() } else { None };
        self.collected.writes.push(ExportWrite {
            target,
            conditional: self.depth > 0,
            compound,
            span,
            value_span,
            initializer,
        });
    }

    /// Visits `expr` attributing export writes in it to `name` when it is
    /// a function written at module level.
    fn visit_maybe_initializer(&mut self, name: &str, expr: &Expression) {
        let is_function = matches!(expr, Expression::Function(_) | Expression::Arrow(_));
        if self.depth == 0 && is_function {
            let saved = self.initializer.replace(name.to_string());
            self.visit_expression(expr);
            self.initializer = saved;
        } else {
            self.visit_expression(expr);
        }
    }

    fn member_name(&mut self, member: &MemberExpression) -> Option<String> {
        match member.static_property() {
            Some(name) => Some(name.to_string()),
            None => {
                self.fail("export object indexed with a computed key", member.span);
                None
            }
        }
    }

    fn assignment(&mut self, assign: &AssignmentExpression) -> bool {
        if is_export_object(&assign.left) {
            let mut through_module = is_module_exports(&assign.left);
            let mut value = &*assign.right;
            while let Expression::Assignment(inner) = value {
                if inner.operator != AssignmentOperator::Assign || !is_export_object(&inner.left) {
                    break;
                }
                through_module |= is_module_exports(&inner.left);
                value = &*inner.right;
            }
            if assign.operator != AssignmentOperator::Assign {
                self.fail("compound assignment to the export object", assign.span);
                return true;
            }
            let target = if through_module {
                match self.whole_value(value) {
                    Some(whole) => WriteTarget::Whole(whole),
                    None => return true,
                }
            } else {
                WriteTarget::Detached
            };
            self.record(target, assign.span, value.span(), false);
            self.visit_expression(value);
            return true;
        }

        let Expression::Member(member) = &*assign.left else {
            return false;
        };
        if !is_export_object(&member.object) {
            return false;
        }
        let Some(name) = self.member_name(member) else {
            return true;
        };
        if name == "__esModule" {
            self.collected.markers.push(assign.span);
            return true;
        }
        let compound = assign.operator != AssignmentOperator::Assign;
        let provenance = if compound {
            ValueProvenance::expression(text_of(assign.span, self.source))
        } else {
            provenance_of(&assign.right, self.source)
        };
        let write = PropertyWrite {
            name: name.clone(),
            provenance,
            span: member.span,
            target: Some(member.object.span()),
            value_span: assign.right.span(),
            form: ValueForm::Plain,
        };
        self.record(WriteTarget::Property(write), assign.span, assign.right.span(), compound);
        self.visit_maybe_initializer(&name, &assign.right);
        true
    }

    fn whole_value(&mut self, value: &Expression) -> Option<WholeValue> {
        if let Some(source) = require_source(value) {
            return Some(WholeValue::Require {
                source: source.to_string(),
            });
        }
        if let Expression::Object(object) = value {
            return match object_properties(object, self.source) {
                Ok((properties, spreads)) => Some(WholeValue::Object {
                    properties,
                    spreads,
                    span: object.span,
                }),
                Err(err) => {
                    if self.error.is_none() {
                        self.error = Some(err);
                    }
                    None
                }
            };
        }
        let declares = match value {
            Expression::Function(f) => f.id.as_ref().map(|id| id.name.clone()),
            Expression::Class(c) => c.id.as_ref().map(|id| id.name.clone()),
            _ => None,
        };
        Some(WholeValue::Value {
            provenance: provenance_of(value, self.source),
            declares,
        })
    }

    fn call(&mut self, call: &CallExpression) -> bool {
        let Expression::Member(callee) = &*call.callee else {
            return false;
        };
        if callee.object.as_identifier() != Some("Object") {
            return false;
        }
        match callee.static_property() {
            Some("defineProperty") => {
                let [target, key, descriptor] = call.arguments.as_slice() else {
                    return false;
                };
                if !is_export_object(target) {
                    return false;
                }
                let Some(name) = key.as_string_literal() else {
                    self.fail("export defined under a computed name", key.span());
                    return true;
                };
                if name == "__esModule" {
                    self.collected.markers.push(call.span);
                    return true;
                }
                let Some(value) = descriptor_value(descriptor) else {
                    self.fail("export property descriptor is neither a value nor a simple getter", descriptor.span());
                    return true;
                };
                let write = PropertyWrite {
                    name: name.to_string(),
                    provenance: provenance_of(value, self.source),
                    span: call.span,
                    target: Some(target.span()),
                    value_span: value.span(),
                    form: ValueForm::Plain,
                };
                self.record(WriteTarget::Property(write), call.span, value.span(), false);
                self.visit_expression(value);
                true
            }
            Some("assign") => {
                let [target, object] = call.arguments.as_slice() else {
                    return false;
                };
                if !is_export_object(target) {
                    return false;
                }
                let Expression::Object(literal) = object else {
                    self.fail("Object.assign onto the export object from a non-literal", object.span());
                    return true;
                };
                match object_properties(literal, self.source) {
                    Ok((properties, spreads)) if spreads.is_empty() => {
                        let members = WriteTarget::Members {
                            properties,
                            object: literal.span,
                            target: target.span(),
                        };
                        self.record(members, call.span, literal.span, false);
                        self.visit_expression(object);
                    }
                    Ok(_) => self.fail("Object.assign onto the export object with spread members", literal.span),
                    Err(err) => {
                        if self.error.is_none() {
                            self.error = Some(err);
                        }
                    }
                }
                true
            }
            _ => false,
        }
    }
}

impl Visitor for Collector<'_> {
    fn enter(&mut self, nesting: Nesting) {
        self.depth += 1;
        if nesting == Nesting::Function {
            self.functions += 1;
        }
    }

    fn leave(&mut self, nesting: Nesting) {
        self.depth -= 1;
        if nesting == Nesting::Function {
            self.functions -= 1;
        }
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        if self.error.is_some() {
            return;
        }
        if self.depth == 0 {
            match stmt {
                Statement::FunctionDeclaration(function) => {
                    let saved = self.initializer.clone();
                    self.initializer = function.id.as_ref().map(|id| id.name.clone());
                    walk_statement(self, stmt);
                    self.initializer = saved;
                    return;
                }
                Statement::VariableDeclaration(decl) => {
                    for declarator in &decl.declarations {
                        self.visit_pattern(&declarator.id);
                        let Some(init) = &declarator.init else {
                            continue;
                        };
                        match declarator.id.as_identifier() {
                            Some(id) => self.visit_maybe_initializer(&id.name, init),
                            None => self.visit_expression(init),
                        }
                    }
                    return;
                }
                _ => {}
            }
        }
        walk_statement(self, stmt);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        if self.error.is_some() {
            return;
        }
        if is_export_object(expr) {
            self.fail("export object used as a value", expr.span());
            return;
        }
        match expr {
            Expression::Assignment(assign) => {
                if self.assignment(assign) {
                    return;
                }
            }
            Expression::Call(call) => {
                if self.call(call) {
                    return;
                }
            }
            Expression::Member(member) if is_export_object(&member.object) => {
                if let Some(name) = self.member_name(member) {
                    self.collected.reads.push(ExportRead { name, span: member.span });
                }
                return;
            }
            Expression::Unary(unary) if unary.operator == UnaryOperator::Typeof && is_export_object(&unary.argument) => {
                return;
            }
            _ => {}
        }
        walk_expression(self, expr);
    }
}

/// Returns true for `exports` and `module.exports`.
pub(crate) fn is_export_object(expr: &Expression) -> bool {
    expr.as_identifier() == Some("exports") || is_module_exports(expr)
}

fn is_module_exports(expr: &Expression) -> bool {
    match expr {
        Expression::Member(member) => {
            member.object.as_identifier() == Some("module") && member.static_property() == Some("exports")
        }
        _ => false,
    }
}

/// Returns the specifier of `require('x')`.
pub(crate) fn require_source(expr: &Expression) -> Option<&str> {
    let Expression::Call(call) = expr else {
        return None;
    };
    if call.callee.as_identifier() != Some("require") || call.optional {
        return None;
    }
    match call.arguments.as_slice() {
        [argument] => argument.as_string_literal(),
        _ => None,
    }
}

/// Where the value of `expr` comes from.
pub(crate) fn provenance_of(expr: &Expression, source: &str) -> ValueProvenance {
    if let Some(name) = expr.as_identifier() {
        return ValueProvenance::local(name);
    }
    if let Some(specifier) = require_source(expr) {
        return ValueProvenance::whole(specifier);
    }
    match expr {
        Expression::Member(member) => {
            if let (Some(specifier), Some(name)) = (require_source(&member.object), member.static_property()) {
                return ValueProvenance::reexport(specifier, name);
            }
        }
        Expression::Function(f) => {
            if let Some(id) = &f.id {
                return ValueProvenance::local(&id.name);
            }
        }
        Expression::Class(c) => {
            if let Some(id) = &c.id {
                return ValueProvenance::local(&id.name);
            }
        }
        _ => {}
    }
    ValueProvenance::expression(text_of(expr.span(), source))
}

/// Source text of `span` with whitespace runs collapsed.
pub(crate) fn text_of(span: Span, source: &str) -> String {
    span.text(source).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits an object literal into export properties and `...require(x)`
/// spread sources.
pub(crate) fn object_properties(object: &ObjectExpression, source: &str) -> Result<(Vec<PropertyWrite>, Vec<String>)> {
    let mut properties = Vec::new();
    let mut spreads = Vec::new();
    for member in &object.properties {
        match member {
            ObjectMember::Spread(spread) => match require_source(&spread.argument) {
                Some(specifier) => spreads.push(specifier.to_string()),
                None => {
                    return Err(InteropError::analysis(
                        "spread of a value other than a required module into the export object",
                        spread.span,
                    ));
                }
            },
            ObjectMember::Property(prop) => {
                let name = prop
                    .key
                    .static_name()
                    .ok_or_else(|| InteropError::analysis("computed key in the export object", prop.key.span()))?;
                let (provenance, form) = match prop.kind {
                    PropertyKind::Get | PropertyKind::Set => {
                        return Err(InteropError::analysis("accessor property on the export object", prop.span));
                    }
                    PropertyKind::Method => {
                        let (is_async, is_generator) = match &prop.value {
                            Expression::Function(f) => (f.is_async, f.is_generator),
                            _ => (false, false),
                        };
                        (
                            ValueProvenance::expression(text_of(prop.span, source)),
                            ValueForm::Method { is_async, is_generator },
                        )
                    }
                    PropertyKind::Init if prop.shorthand => {
                        if !matches!(prop.value, Expression::Identifier(_)) {
                            return Err(InteropError::analysis("invalid shorthand property", prop.span));
                        }
                        (provenance_of(&prop.value, source), ValueForm::Shorthand)
                    }
                    PropertyKind::Init => (provenance_of(&prop.value, source), ValueForm::Plain),
                };
                if name == "__esModule" {
                    continue;
                }
                properties.push(PropertyWrite {
                    name,
                    provenance,
                    span: prop.span,
                    target: None,
                    value_span: prop.value.span(),
                    form,
                });
            }
        }
    }
    Ok((properties, spreads))
}

/// The value carried by a property descriptor: `{ value: x }` or a getter
/// whose body is a single `return x`.
fn descriptor_value(descriptor: &Expression) -> Option<&Expression> {
    let Expression::Object(object) = descriptor else {
        return None;
    };
    for member in &object.properties {
        let ObjectMember::Property(prop) = member else {
            continue;
        };
        match prop.key.static_name().as_deref() {
            Some("value") if prop.kind == PropertyKind::Init => return Some(&prop.value),
            Some("get") if matches!(prop.kind, PropertyKind::Init | PropertyKind::Method) => {
                return match &prop.value {
                    Expression::Function(f) => single_return(&f.body),
                    Expression::Arrow(arrow) => match &arrow.body {
                        ArrowBody::Expression(body) => Some(body),
                        ArrowBody::Block(body) => single_return(body),
                    },
                    _ => None,
                };
            }
            _ => {}
        }
    }
    None
}

fn single_return(body: &[Statement]) -> Option<&Expression> {
    match body {
        [Statement::Return(ret)] => ret.argument.as_ref(),
        _ => None,
    }
}

/// What `module.exports` currently is while folding writes.
#[derive(Debug, Clone, Default)]
enum Base {
    /// The original exports object
    #[default]
    Exports,
    /// A replaced plain object literal
    Object,
    /// An object literal of `require(x).y` values
    ReExportNamed,
    /// Another module's exports object
    Require(String),
    /// Members merged from several modules
    Aggregate,
    /// A function, class, primitive or opaque expression
    Value(ValueProvenance),
}

#[derive(Debug, Default)]
struct ShapeFolder {
    base: Base,
    named: Vec<NamedBinding>,
    conditional: Vec<String>,
    dynamic: bool,
    sources: Vec<String>,
    initializers: Vec<String>,
    default_properties: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ShapeFolder {
    fn apply(&mut self, write: &ExportWrite) -> Result<()> {
        if let Some(name) = &write.initializer {
            push_unique(&mut self.initializers, name);
        }
        match &write.target {
            WriteTarget::Detached => {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::DetachedExports,
                        "`exports` is reassigned; later writes through it no longer reach module.exports",
                    )
                    .with_span(write.span),
                );
            }
            WriteTarget::Whole(value) if write.conditional => match value {
                WholeValue::Object {
                    properties, spreads, ..
                } if spreads.is_empty() => {
                    self.dynamic = true;
                    for prop in properties {
                        push_unique(&mut self.conditional, &prop.name);
                    }
                }
                _ => {
                    return Err(InteropError::analysis(
                        "module.exports is replaced by a non-object value on some paths only",
                        write.span,
                    ));
                }
            },
            WriteTarget::Whole(value) => self.replace(value),
            WriteTarget::Property(prop) => self.property(prop, write.conditional),
            WriteTarget::Members { properties, .. } => {
                for prop in properties {
                    self.property(prop, write.conditional);
                }
            }
        }
        Ok(())
    }

    fn replace(&mut self, value: &WholeValue) {
        self.named.clear();
        self.default_properties.clear();
        self.sources.clear();
        match value {
            WholeValue::Object {
                properties, spreads, ..
            } => {
                for prop in properties {
                    self.upsert(prop);
                }
                let all_reexports = !properties.is_empty()
                    && properties
                        .iter()
                        .all(|p| matches!(&p.provenance, ValueProvenance::ReExport { name, .. } if name != "*"));
                if !spreads.is_empty() {
                    self.base = Base::Aggregate;
                    for source in spreads {
                        push_unique(&mut self.sources, source);
                    }
                } else if all_reexports {
                    self.base = Base::ReExportNamed;
                    for prop in properties {
                        if let ValueProvenance::ReExport { source, .. } = &prop.provenance {
                            push_unique(&mut self.sources, source);
                        }
                    }
                } else {
                    self.base = Base::Object;
                }
            }
            WholeValue::Require { source } => {
                self.sources.push(source.clone());
                self.base = Base::Require(source.clone());
            }
            WholeValue::Value { provenance, .. } => self.base = Base::Value(provenance.clone()),
        }
    }

    fn property(&mut self, prop: &PropertyWrite, conditional: bool) {
        let reexport_source = match &prop.provenance {
            ValueProvenance::ReExport { source, .. } => Some(source.clone()),
            _ => None,
        };
        let opaque_default = match self.base {
            Base::Value(_) => true,
            Base::Require(_) => reexport_source.is_none(),
            _ => false,
        };
        if opaque_default {
            push_unique(&mut self.default_properties, &prop.name);
            self.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::PropertyOnNonObjectDefault,
                    format!(
                        "property added to a non-plain default export; \
                         unreachable via static export binding after rewrite ('{}')",
                        prop.name
                    ),
                )
                .with_span(prop.span),
            );
            return;
        }
        if conditional {
            self.dynamic = true;
            push_unique(&mut self.conditional, &prop.name);
            return;
        }
        match self.base {
            Base::Require(_) | Base::Aggregate => {
                self.base = Base::Aggregate;
                if let Some(source) = &reexport_source {
                    push_unique(&mut self.sources, source);
                }
            }
            Base::ReExportNamed => match &reexport_source {
                Some(source) => push_unique(&mut self.sources, source),
                None => self.base = Base::Object,
            },
            _ => {}
        }
        self.upsert(prop);
    }

    fn upsert(&mut self, prop: &PropertyWrite) {
        match self.named.iter_mut().find(|b| b.name == prop.name) {
            Some(binding) => {
                binding.provenance = prop.provenance.clone();
                binding.span = prop.span;
            }
            None => self.named.push(NamedBinding {
                name: prop.name.clone(),
                provenance: prop.provenance.clone(),
                span: prop.span,
            }),
        }
    }

    fn finish(self) -> Result<ExportShapeDescriptor> {
        let tag = match (&self.base, self.dynamic) {
            (Base::Exports | Base::Object | Base::ReExportNamed, true) => ShapeTag::DynamicConditional,
            (_, true) => {
                return Err(InteropError::Analysis {
                    reason: "exports are added on some paths only to a value re-exported from another module".into(),
                    span: None,
                });
            }
            (Base::Exports, false) => ShapeTag::NamedOnly,
            (Base::Object, false) => ShapeTag::ObjectLiteralNamed,
            (Base::ReExportNamed, false) => ShapeTag::ReExportNamed,
            (Base::Require(_), false) => ShapeTag::ReExportAll,
            (Base::Aggregate, false) => ShapeTag::ReExportDefaultAggregate,
            (Base::Value(_), false) => ShapeTag::NonObjectDefault,
        };

        let mut shape = ExportShapeDescriptor::new(tag);
        shape.named = self.named;
        shape.conditional_names = self
            .conditional
            .into_iter()
            .filter(|name| !shape.named.iter().any(|b| &b.name == name))
            .collect();
        if tag == ShapeTag::DynamicConditional {
            shape.initializers = self.initializers;
        }
        shape.default = match (&self.base, tag) {
            (_, ShapeTag::DynamicConditional) => DefaultProvenance::Explicit(ValueProvenance::LiveAggregate {
                names: shape.all_names(),
            }),
            (Base::Require(source), _) => DefaultProvenance::Explicit(ValueProvenance::whole(source)),
            (Base::Aggregate, _) => DefaultProvenance::Explicit(ValueProvenance::ReExportMany {
                sources: self.sources.clone(),
            }),
            (Base::Value(provenance), _) => DefaultProvenance::Explicit(provenance.clone()),
            _ => DefaultProvenance::SynthesizedFromNamed,
        };
        shape.reexport_sources = self.sources;
        shape.default_properties = self.default_properties;
        shape.diagnostics = self.diagnostics;
        Ok(shape)
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modshim_syntax::{parse_module, parse_script};

    fn shape(source: &str) -> ExportShapeDescriptor {
        let program = parse_script(source).expect("parses");
        infer_commonjs(&program, source).expect("analyzable")
    }

    fn failure(source: &str) -> InteropError {
        let program = parse_script(source).expect("parses");
        infer_commonjs(&program, source).expect_err("unanalyzable")
    }

    #[test]
    fn test_named_only() {
        let s = shape("exports.Foo = class {}; exports.bar = 'bar';");
        assert_eq!(s.tag, ShapeTag::NamedOnly);
        assert_eq!(s.named_names(), vec!["Foo", "bar"]);
        assert_eq!(s.default, DefaultProvenance::SynthesizedFromNamed);
        assert_eq!(s.named[1].provenance, ValueProvenance::expression("'bar'"));
    }

    #[test]
    fn test_no_exports_is_empty_named_only() {
        let s = shape("const x = 1; console.log(x);");
        assert_eq!(s.tag, ShapeTag::NamedOnly);
        assert!(s.named.is_empty());
    }

    #[test]
    fn test_object_literal_named() {
        let s = shape("function a() {} module.exports = { a, b: 2, c() {} };");
        assert_eq!(s.tag, ShapeTag::ObjectLiteralNamed);
        assert_eq!(s.named_names(), vec!["a", "b", "c"]);
        assert_eq!(s.named[0].provenance, ValueProvenance::local("a"));
    }

    #[test]
    fn test_last_whole_write_wins() {
        let s = shape("exports.old = 1; module.exports = { fresh: 2 }; module.exports.extra = 3;");
        assert_eq!(s.tag, ShapeTag::ObjectLiteralNamed);
        assert_eq!(s.named_names(), vec!["fresh", "extra"]);
    }

    #[test]
    fn test_non_object_default() {
        let s = shape("module.exports = function qux() {};");
        assert_eq!(s.tag, ShapeTag::NonObjectDefault);
        assert_eq!(s.default, DefaultProvenance::Explicit(ValueProvenance::local("qux")));
        assert!(s.named.is_empty());
    }

    #[test]
    fn test_property_on_function_default_warns() {
        let s = shape("module.exports = function qux() {}; module.exports.helper = 1;");
        assert_eq!(s.tag, ShapeTag::NonObjectDefault);
        assert_eq!(s.default_properties, vec!["helper"]);
        assert_eq!(s.diagnostics.len(), 1);
        assert_eq!(s.diagnostics[0].code, DiagnosticCode::PropertyOnNonObjectDefault);
        assert!(
            s.diagnostics[0]
                .message
                .starts_with("property added to a non-plain default export; unreachable via static export binding after rewrite"),
            "{}",
            s.diagnostics[0].message
        );
    }

    #[test]
    fn test_dynamic_conditional() {
        let s = shape(
            "exports.initialize = function (name) { if (name === 'foo') exports.foo = 'foo'; };\n\
             if (process.env.DEBUG) { exports.debug = true; }",
        );
        assert_eq!(s.tag, ShapeTag::DynamicConditional);
        assert_eq!(s.named_names(), vec!["initialize"]);
        assert_eq!(s.conditional_names, vec!["foo", "debug"]);
        assert_eq!(s.initializers, vec!["initialize"]);
        assert_eq!(
            s.default,
            DefaultProvenance::Explicit(ValueProvenance::LiveAggregate {
                names: vec!["initialize".into(), "foo".into(), "debug".into()]
            })
        );
    }

    #[test]
    fn test_catch_write_makes_module_dynamic() {
        let s = shape("try { exports.a = require('a'); } catch (e) { exports.a = null; }");
        assert_eq!(s.tag, ShapeTag::DynamicConditional);
        assert_eq!(s.named_names(), vec!["a"]);
        assert!(s.conditional_names.is_empty());
    }

    #[test]
    fn test_reexport_all() {
        let s = shape("module.exports = require('./impl');");
        assert_eq!(s.tag, ShapeTag::ReExportAll);
        assert_eq!(s.reexport_sources, vec!["./impl"]);
        assert_eq!(s.default, DefaultProvenance::Explicit(ValueProvenance::whole("./impl")));
    }

    #[test]
    fn test_reexport_aggregate() {
        let s = shape("module.exports = require('./a'); module.exports.b = require('./b');");
        assert_eq!(s.tag, ShapeTag::ReExportDefaultAggregate);
        assert_eq!(s.reexport_sources, vec!["./a", "./b"]);
        assert_eq!(s.named_names(), vec!["b"]);
    }

    #[test]
    fn test_reexport_named() {
        let s = shape("module.exports = { a: require('./x').a, y: require('./y').z };");
        assert_eq!(s.tag, ShapeTag::ReExportNamed);
        assert_eq!(s.named[1].provenance, ValueProvenance::reexport("./y", "z"));
        assert_eq!(s.reexport_sources, vec!["./x", "./y"]);
    }

    #[test]
    fn test_spread_aggregate() {
        let s = shape("module.exports = { ...require('./a'), ...require('./b'), c: 1 };");
        assert_eq!(s.tag, ShapeTag::ReExportDefaultAggregate);
        assert_eq!(s.named_names(), vec!["c"]);
    }

    #[test]
    fn test_define_property_and_assign() {
        let s = shape(
            "Object.defineProperty(exports, '__esModule', { value: true });\n\
             Object.defineProperty(exports, 'a', { enumerable: true, get: function () { return impl.a; } });\n\
             Object.assign(module.exports, { b: 1 });",
        );
        assert_eq!(s.tag, ShapeTag::NamedOnly);
        assert_eq!(s.named_names(), vec!["a", "b"]);
        assert_eq!(s.named[0].provenance, ValueProvenance::expression("impl.a"));
    }

    #[test]
    fn test_chained_assignment() {
        let s = shape("module.exports = exports = function main() {};");
        assert_eq!(s.tag, ShapeTag::NonObjectDefault);
    }

    #[test]
    fn test_detached_exports_warns() {
        let s = shape("exports = { a: 1 };");
        assert_eq!(s.tag, ShapeTag::NamedOnly);
        assert_eq!(s.diagnostics[0].code, DiagnosticCode::DetachedExports);
    }

    #[test]
    fn test_escapes_fail() {
        assert!(matches!(failure("const e = module.exports; e.a = 1;"), InteropError::Analysis { .. }));
        assert!(matches!(failure("register(exports);"), InteropError::Analysis { .. }));
        assert!(matches!(failure("for (const k of keys) exports[k] = 1;"), InteropError::Analysis { .. }));
        assert!(matches!(failure("module.exports = { get a() { return 1; } };"), InteropError::Analysis { .. }));
        assert!(matches!(failure("if (x) module.exports = 1;"), InteropError::Analysis { .. }));
    }

    #[test]
    fn test_typeof_and_reads_are_fine() {
        let s = shape("if (typeof exports === 'object') {} exports.a = 1; console.log(exports.a);");
        assert_eq!(s.named_names(), vec!["a"]);
    }

    #[test]
    fn test_esm_shape() {
        let source = "export const a = 1, b = 2;\n\
                      export function f() {}\n\
                      const qux = () => {};\n\
                      export { qux as 'module.exports', qux as default };\n\
                      export * from './more';\n\
                      export * as ns from './ns';";
        let program = parse_module(source).expect("parses");
        let s = infer(&program, source).expect("esm");
        assert!(s.native_esm);
        assert_eq!(s.named_names(), vec!["a", "b", "f", "module.exports", "ns"]);
        assert_eq!(s.default, DefaultProvenance::Explicit(ValueProvenance::local("qux")));
        assert_eq!(s.reexport_sources, vec!["./more"]);
        assert_eq!(s.whole_value(), Some(ValueProvenance::local("qux")));
    }

    #[test]
    fn test_esm_star_only_is_reexport_all() {
        let source = "export * from './a';";
        let program = parse_module(source).expect("parses");
        assert_eq!(infer_esm(&program, source).tag, ShapeTag::ReExportAll);
    }
}
