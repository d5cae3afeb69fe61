// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source emission.
//!
//! Applies a [`CompatibilityPlan`] to the original text. The emitter never
//! prints an AST: it records replacements over source spans and renders
//! the text with them applied, so comments and formatting outside the
//! rewritten constructs survive untouched. A replacement can splice in
//! other source ranges, which are rendered with their own replacements.
//!
//! Export writes become `const`/`let` locals, `export` lists and the
//! default and `'module.exports'` exports. Top-level `require()`
//! declarations become `import` declarations; remaining `require()` calls
//! and `__filename`/`__dirname` get `node:` based shims.

use modshim_syntax::Span;
use modshim_syntax::ast::{ObjectPattern, Pattern, Program, SourceType, Statement, VariableKind};
use modshim_syntax::bindings::{NameSet, is_binding_identifier, nested_bindings, top_level_declarations};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::graph::{Module, is_builtin};
use crate::imports::scan_consumers;
use crate::infer::{Collected, ExportWrite, PropertyWrite, ValueForm, WholeValue, WriteTarget, collect, require_source};
use crate::options::AnalyzerOptions;
use crate::shape::{ExportShapeDescriptor, ShapeTag, ValueProvenance};
use crate::synth::{CompatibilityPlan, ReExportDirective};

/// Globals a new top-level binding must not shadow.
const GLOBALS: &[&str] = &[
    "Array", "Boolean", "Error", "Infinity", "JSON", "Map", "Math", "NaN", "Number", "Object", "Promise",
    "Reflect", "Set", "String", "Symbol", "__dirname", "__filename", "console", "exports", "globalThis",
    "module", "process", "require", "undefined",
];

/// What the module a specifier names exports after migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A Node.js built-in; every named export links
    Builtin,
    /// A module exporting exactly these names
    Names(Vec<String>),
    /// Nothing is known; only the default import is safe
    Opaque,
}

/// Per-specifier knowledge used to turn `require()` into `import`.
#[derive(Debug, Clone, Default)]
pub struct ImportRewrites {
    targets: FxHashMap<String, ImportTarget>,
}

impl ImportRewrites {
    /// Creates an empty set. Unknown specifiers are treated as opaque
    /// unless they name a built-in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records what `specifier` exports.
    pub fn insert(&mut self, specifier: impl Into<String>, target: ImportTarget) {
        self.targets.insert(specifier.into(), target);
    }

    /// Returns true if `import { name } from specifier` links.
    pub fn links(&self, specifier: &str, name: &str) -> bool {
        match self.targets.get(specifier) {
            Some(ImportTarget::Builtin) => true,
            Some(ImportTarget::Names(names)) => names.iter().any(|n| n == name),
            Some(ImportTarget::Opaque) => false,
            None => is_builtin(specifier),
        }
    }
}

/// Renders the ESM text of `module` according to `plan`.
///
/// Modules that already are ESM, and no-op plans, are returned unchanged.
pub fn emit(
    module: &Module,
    program: &Program,
    shape: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    imports: &ImportRewrites,
    options: &AnalyzerOptions,
) -> Result<String> {
    if plan.is_noop() || program.source_type == SourceType::Module {
        return Ok(module.source().to_string());
    }
    let collected = collect(program, module.source())?;
    let mut emitter = Emitter::new(module.source(), program, shape, plan);
    if options.strip_use_strict {
        emitter.strip_use_strict();
    }
    emitter.exports(&collected);
    emitter.requires(imports, options.rewrite_requires);
    if options.context_shims {
        emitter.context_shims();
    }
    tracing::debug!(module = %module.id(), edits = emitter.edits.len(), "Emitted ESM source");
    Ok(emitter.finish())
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    /// Original source, rendered with the edits inside it
    Source(Span),
}

#[derive(Debug, Clone)]
struct Edit {
    span: Span,
    pieces: Vec<Piece>,
}

/// How an export name is bound in the rewritten module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// An existing immutable top-level binding is exported directly
    Alias,
    /// The single write becomes `const local = value`
    Const,
    /// The write turns a named function or class expression into a
    /// declaration
    Declare,
    /// `let local;` up front, writes become assignments
    Let,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiteKind {
    /// `exports.name = value`
    Assign,
    /// `Object.defineProperty(exports, 'name', ...)`
    Define,
    /// `Object.assign(exports, { name })`
    Member,
    /// `module.exports = { name }`
    Object,
}

#[derive(Clone, Copy)]
struct Site<'c> {
    write: &'c ExportWrite,
    prop: &'c PropertyWrite,
    kind: SiteKind,
}

struct Emitter<'a> {
    source: &'a str,
    program: &'a Program,
    shape: &'a ExportShapeDescriptor,
    plan: &'a CompatibilityPlan,
    names: NameSet,
    taken: FxHashSet<String>,
    declared: FxHashSet<String>,
    immutable: FxHashSet<String>,
    /// Names some nested scope binds; a top-level local spelled like one
    /// would be shadowed there
    shadowed: FxHashSet<String>,
    /// Expression span of each top-level expression statement, to its
    /// statement span
    statements: FxHashMap<Span, Span>,
    edits: Vec<Edit>,
    imports: Vec<String>,
    prelude: Vec<String>,
    lets: Vec<String>,
    locals: FxHashMap<String, (String, Binding)>,
    whole: Option<(String, Binding)>,
    imported: FxHashMap<(String, String), String>,
}

impl<'a> Emitter<'a> {
    fn new(
        source: &'a str,
        program: &'a Program,
        shape: &'a ExportShapeDescriptor,
        plan: &'a CompatibilityPlan,
    ) -> Self {
        let declared = top_level_declarations(program);
        let mut immutable = FxHashSet::default();
        let mut statements = FxHashMap::default();
        for stmt in &program.body {
            match stmt {
                Statement::Expression(s) => {
                    statements.insert(s.expression.span(), s.span);
                }
                Statement::VariableDeclaration(decl) if decl.kind == VariableKind::Const => {
                    let mut bound = Vec::new();
                    for declarator in &decl.declarations {
                        declarator.id.bound_names(&mut bound);
                    }
                    immutable.extend(bound.into_iter().map(str::to_string));
                }
                Statement::FunctionDeclaration(f) => {
                    if let Some(id) = &f.id {
                        immutable.insert(id.name.clone());
                    }
                }
                Statement::ClassDeclaration(c) => {
                    if let Some(id) = &c.id {
                        immutable.insert(id.name.clone());
                    }
                }
                _ => {}
            }
        }
        Self {
            source,
            program,
            shape,
            plan,
            names: NameSet::from_source(source),
            taken: declared.clone(),
            declared,
            immutable,
            shadowed: nested_bindings(program),
            statements,
            edits: Vec::new(),
            imports: Vec::new(),
            prelude: Vec::new(),
            lets: Vec::new(),
            locals: FxHashMap::default(),
            whole: None,
            imported: FxHashMap::default(),
        }
    }

    // ---- names ----

    /// A top-level binding named as close to `wanted` as possible, visible
    /// everywhere in the file.
    fn local_name(&mut self, wanted: &str) -> String {
        if is_binding_identifier(wanted) && !self.taken.contains(wanted) && self.visible(wanted) {
            self.taken.insert(wanted.to_string());
            self.names.reserve(wanted);
            return wanted.to_string();
        }
        self.helper_name(&sanitize(wanted))
    }

    /// Returns true if no nested scope shadows a top-level `name`.
    fn visible(&self, name: &str) -> bool {
        !self.shadowed.contains(name) && !GLOBALS.contains(&name)
    }

    /// A binding no identifier in the source spells.
    fn helper_name(&mut self, base: &str) -> String {
        let name = self.names.fresh(base);
        self.taken.insert(name.clone());
        name
    }

    /// A local holding export `name` of `source`, imported on first use.
    fn import_local(&mut self, source: &str, name: &str) -> String {
        let key = (source.to_string(), name.to_string());
        if let Some(local) = self.imported.get(&key) {
            return local.clone();
        }
        let local = if name == "default" {
            self.local_name(&specifier_stem(source))
        } else {
            self.local_name(name)
        };
        let line = if name == "default" {
            format!("import {} from {}{};", local, quote(source), import_attributes(source))
        } else {
            format!("import {{ {} }} from {};", import_spec(name, &local), quote(source))
        };
        self.imports.push(line);
        self.imported.insert(key, local.clone());
        local
    }

    fn directive_for(&self, name: &str) -> Option<(&'a str, &'a str)> {
        let plan: &'a CompatibilityPlan = self.plan;
        plan.reexports.iter().find_map(|directive| match directive {
            ReExportDirective::Named {
                source,
                imported,
                exported,
            } if exported == name => Some((source.as_str(), imported.as_str())),
            _ => None,
        })
    }

    /// The local holding the module's whole default value, if it has one.
    fn whole_local(&mut self) -> Option<String> {
        if let Some((local, _)) = &self.whole {
            return Some(local.clone());
        }
        let shape = self.shape;
        match (self.plan.tag, shape.reexport_sources.as_slice()) {
            (ShapeTag::ReExportAll, [source]) => Some(self.import_local(source, "default")),
            _ => None,
        }
    }

    /// An expression for export `name` usable in the epilogue.
    fn value_of(&mut self, name: &str) -> String {
        if let Some((local, _)) = self.locals.get(name) {
            return local.clone();
        }
        if let Some((source, imported)) = self.directive_for(name) {
            return self.import_local(source, imported);
        }
        "undefined".into()
    }

    // ---- edits ----

    fn replace(&mut self, span: Span, pieces: Vec<Piece>) {
        self.edits.push(Edit { span, pieces });
    }

    fn replace_text(&mut self, span: Span, text: impl Into<String>) {
        self.replace(span, vec![Piece::Text(text.into())]);
    }

    fn statement_of(&self, expr: Span) -> Option<Span> {
        self.statements.get(&expr).copied()
    }

    /// Removes a statement together with the blanks and line break after it.
    fn remove_statement(&mut self, stmt: Span) {
        let rest = &self.source[stmt.end..];
        let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let rest = &rest[blanks..];
        let trailing = if rest.starts_with("\r\n") {
            2
        } else if rest.starts_with('\n') {
            1
        } else {
            0
        };
        self.replace(Span::new(stmt.start, stmt.end + blanks + trailing), Vec::new());
    }

    /// Removes an expression, keeping nothing of it.
    fn remove_expression(&mut self, expr: Span) {
        match self.statement_of(expr) {
            Some(stmt) => self.remove_statement(stmt),
            None => self.replace_text(expr, "void 0"),
        }
    }

    /// Removes a write but keeps evaluating its value.
    fn keep_value(&mut self, write: &ExportWrite) {
        self.replace(
            write.span,
            vec![
                Piece::Text("(".into()),
                Piece::Source(write.value_span),
                Piece::Text(")".into()),
            ],
        );
    }

    /// Returns false if no rendering of the output contains `span`.
    fn survives(&self, span: Span) -> bool {
        self.edits.iter().all(|edit| {
            !contains(edit.span, span)
                || edit
                    .pieces
                    .iter()
                    .any(|piece| matches!(piece, Piece::Source(inner) if contains(*inner, span)))
        })
    }

    fn render(&self, span: Span, parent: Option<Span>, out: &mut String) {
        let mut cursor = span.start;
        for edit in &self.edits {
            if edit.span.start < cursor || edit.span.end > span.end || Some(edit.span) == parent {
                continue;
            }
            out.push_str(&self.source[cursor..edit.span.start]);
            for piece in &edit.pieces {
                match piece {
                    Piece::Text(text) => out.push_str(text),
                    Piece::Source(inner) => self.render(*inner, Some(edit.span), out),
                }
            }
            cursor = edit.span.end;
        }
        out.push_str(&self.source[cursor..span.end]);
    }

    // ---- passes ----

    fn strip_use_strict(&mut self) {
        let program = self.program;
        let Some(Statement::Expression(first)) = program.body.first() else {
            return;
        };
        if first.expression.as_string_literal() == Some("use strict") {
            self.remove_statement(first.span);
        }
    }

    fn exports(&mut self, collected: &Collected) {
        let writes = &collected.writes;
        let last_whole = writes
            .iter()
            .rposition(|w| !w.conditional && matches!(w.target, WriteTarget::Whole(_)));
        let live: Vec<bool> = writes
            .iter()
            .enumerate()
            .map(|(i, w)| {
                !matches!(w.target, WriteTarget::Detached)
                    && (w.conditional || last_whole.is_none_or(|last| i >= last))
            })
            .collect();

        let mut sites: FxHashMap<&str, Vec<Site<'_>>> = FxHashMap::default();
        for (write, _) in writes.iter().zip(&live).filter(|(_, live)| **live) {
            for site in sites_of(write) {
                sites.entry(site.prop.name.as_str()).or_default().push(site);
            }
        }

        if let Some(last) = last_whole {
            self.bind_default(&writes[last]);
        }
        self.bind_locals(&sites);

        for (write, live) in writes.iter().zip(&live) {
            if !live {
                self.keep_value(write);
                continue;
            }
            match &write.target {
                WriteTarget::Whole(value) => self.whole_write(write, value),
                WriteTarget::Property(prop) => self.property_write(write, prop),
                WriteTarget::Members { properties, target, .. } => self.members_write(write, properties, *target),
                WriteTarget::Detached => self.keep_value(write),
            }
        }
        for marker in &collected.markers {
            self.remove_expression(*marker);
        }
        for read in &collected.reads {
            let local = self.locals.get(&read.name).map(|(local, _)| local.clone());
            let text = match local {
                Some(local) => local,
                None => match self.whole_local() {
                    Some(whole) => member_access(&whole, &read.name),
                    None => match self.directive_for(&read.name) {
                        Some((source, imported)) => self.import_local(source, imported),
                        None => "undefined".into(),
                    },
                },
            };
            self.replace_text(read.span, text);
        }
    }

    /// Binds the local holding a non-object default value.
    fn bind_default(&mut self, write: &ExportWrite) {
        let WriteTarget::Whole(WholeValue::Value { provenance, declares }) = &write.target else {
            return;
        };
        let statement = self.statement_of(write.span).is_some();
        let binding = match (provenance, declares) {
            (ValueProvenance::Local { name }, Some(declared))
                if statement && name == declared && !self.taken.contains(declared) && self.visible(declared) =>
            {
                self.taken.insert(declared.clone());
                self.names.reserve(declared.clone());
                (declared.clone(), Binding::Declare)
            }
            (ValueProvenance::Local { name }, None)
                if statement && self.immutable.contains(name) && self.visible(name) =>
            {
                (name.clone(), Binding::Alias)
            }
            _ if statement => (self.helper_name("_default"), Binding::Const),
            _ => {
                let local = self.helper_name("_default");
                self.lets.push(local.clone());
                (local, Binding::Let)
            }
        };
        self.whole = Some(binding);
    }

    fn bind_locals(&mut self, sites: &FxHashMap<&str, Vec<Site<'_>>>) {
        if self.plan.tag == ShapeTag::NonObjectDefault {
            return;
        }
        let mut names = self.shape.all_names();
        for name in &self.shape.initializers {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        for name in names {
            if self.plan.export(&name).is_none() && self.directive_for(&name).is_some() {
                continue;
            }
            let pre_declared = self.plan.export(&name).is_some_and(|e| e.pre_declared);
            let binding = match sites.get(name.as_str()).map(Vec::as_slice) {
                None | Some([]) if self.declared.contains(&name) => (name.clone(), Binding::Alias),
                None | Some([]) => (self.local_name(&name), Binding::Let),
                Some([site]) if !pre_declared && self.const_eligible(site) => match &site.prop.provenance {
                    ValueProvenance::Local { name: local } if self.immutable.contains(local) && self.visible(local) => {
                        (local.clone(), Binding::Alias)
                    }
                    _ => (self.local_name(&name), Binding::Const),
                },
                Some(_) => (self.local_name(&name), Binding::Let),
            };
            if binding.1 == Binding::Let {
                self.lets.push(binding.0.clone());
            }
            self.locals.insert(name, binding);
        }
    }

    fn const_eligible(&self, site: &Site<'_>) -> bool {
        matches!(site.kind, SiteKind::Assign | SiteKind::Object)
            && !site.write.conditional
            && !site.write.compound
            && self.statement_of(site.write.span).is_some()
    }

    fn value_pieces(&self, prop: &PropertyWrite) -> Vec<Piece> {
        match prop.form {
            ValueForm::Plain | ValueForm::Shorthand => vec![Piece::Source(prop.value_span)],
            ValueForm::Method { is_async, is_generator } => {
                let mut head = String::new();
                if is_async {
                    head.push_str("async ");
                }
                head.push_str("function");
                if is_generator {
                    head.push('*');
                }
                head.push(' ');
                vec![Piece::Text(head), Piece::Source(prop.value_span)]
            }
        }
    }

    /// `local = value` pieces for each property that has a local.
    fn assignments(&self, properties: &[PropertyWrite], declare: bool) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for prop in properties {
            let Some((local, binding)) = self.locals.get(&prop.name) else {
                continue;
            };
            let head = match binding {
                Binding::Alias | Binding::Declare => continue,
                Binding::Const if declare => format!("const {} = ", local),
                _ => format!("{} = ", local),
            };
            if !pieces.is_empty() {
                pieces.push(Piece::Text(if declare { " " } else { ", " }.into()));
            }
            pieces.push(Piece::Text(head));
            pieces.extend(self.value_pieces(prop));
            if declare {
                pieces.push(Piece::Text(";".into()));
            }
        }
        pieces
    }

    fn whole_write(&mut self, write: &ExportWrite, value: &WholeValue) {
        match value {
            WholeValue::Object { properties, .. } => match self.statement_of(write.span) {
                Some(stmt) => {
                    let pieces = self.assignments(properties, true);
                    if pieces.is_empty() {
                        self.remove_statement(stmt);
                    } else {
                        self.replace(stmt, pieces);
                    }
                }
                None => {
                    let mut pieces = self.assignments(properties, false);
                    if pieces.is_empty() {
                        pieces.push(Piece::Text("void 0".into()));
                    }
                    pieces.insert(0, Piece::Text("(".into()));
                    pieces.push(Piece::Text(")".into()));
                    self.replace(write.span, pieces);
                }
            },
            WholeValue::Require { .. } => match self.statement_of(write.span) {
                Some(stmt) => self.remove_statement(stmt),
                None => self.keep_value(write),
            },
            WholeValue::Value { .. } => {
                let Some((local, binding)) = self.whole.clone() else {
                    return;
                };
                let prefix = Span::new(write.span.start, write.value_span.start);
                match binding {
                    Binding::Alias => self.remove_expression(write.span),
                    Binding::Declare => self.replace_text(prefix, ""),
                    Binding::Const => self.replace_text(prefix, format!("const {} = ", local)),
                    Binding::Let => self.replace_text(prefix, format!("{} = ", local)),
                }
            }
        }
    }

    fn property_write(&mut self, write: &ExportWrite, prop: &PropertyWrite) {
        let assign = prop.span != write.span;
        if let Some((local, binding)) = self.locals.get(&prop.name).cloned() {
            match binding {
                Binding::Alias => self.remove_expression(write.span),
                Binding::Const | Binding::Declare => {
                    let prefix = Span::new(write.span.start, write.value_span.start);
                    self.replace_text(prefix, format!("const {} = ", local));
                }
                Binding::Let if assign => self.replace_text(prop.span, local),
                Binding::Let => {
                    let mut pieces = vec![Piece::Text(format!("{} = ", local))];
                    pieces.extend(self.value_pieces(prop));
                    if self.statement_of(write.span).is_none() {
                        pieces.insert(0, Piece::Text("(".into()));
                        pieces.push(Piece::Text(")".into()));
                    }
                    self.replace(write.span, pieces);
                }
            }
            return;
        }
        if self.directive_for(&prop.name).is_some() {
            match self.statement_of(write.span) {
                Some(stmt) => self.remove_statement(stmt),
                None => self.keep_value(write),
            }
            return;
        }
        match (self.whole_local(), prop.target) {
            (Some(whole), Some(target)) => self.replace_text(target, whole),
            _ => self.keep_value(write),
        }
    }

    fn members_write(&mut self, write: &ExportWrite, properties: &[PropertyWrite], target: Span) {
        if let Some(whole) = self.whole_local() {
            self.replace_text(target, whole);
            return;
        }
        let mut pieces = self.assignments(properties, false);
        match (pieces.is_empty(), self.statement_of(write.span)) {
            (true, Some(stmt)) => self.remove_statement(stmt),
            (true, None) => self.keep_value(write),
            (false, Some(_)) => self.replace(write.span, pieces),
            (false, None) => {
                pieces.insert(0, Piece::Text("(".into()));
                pieces.push(Piece::Text(")".into()));
                self.replace(write.span, pieces);
            }
        }
    }

    fn requires(&mut self, rewrites: &ImportRewrites, rewrite: bool) {
        let mut handled = FxHashSet::default();
        let program = self.program;
        if rewrite {
            for stmt in &program.body {
                match stmt {
                    Statement::VariableDeclaration(decl) if decl.declarations.len() == 1 => {
                        let declarator = &decl.declarations[0];
                        let Some(init) = &declarator.init else {
                            continue;
                        };
                        let Some(specifier) = require_source(init) else {
                            continue;
                        };
                        handled.insert(init.span());
                        let constant = decl.kind == VariableKind::Const;
                        let named = match &declarator.id {
                            Pattern::Object(object) if constant && import_attributes(specifier).is_empty() => {
                                named_imports(object, specifier, rewrites)
                            }
                            _ => None,
                        };
                        match (&declarator.id, named) {
                            (_, Some(specs)) => {
                                self.imports
                                    .push(format!("import {{ {} }} from {};", specs.join(", "), quote(specifier)));
                                self.remove_statement(decl.span);
                            }
                            (Pattern::Identifier(id), None) if constant => {
                                self.imports.push(format!(
                                    "import {} from {}{};",
                                    id.name,
                                    quote(specifier),
                                    import_attributes(specifier)
                                ));
                                self.remove_statement(decl.span);
                            }
                            _ => {
                                let local = self.import_local(specifier, "default");
                                self.replace_text(init.span(), local);
                            }
                        }
                    }
                    Statement::Expression(s) => {
                        if let Some(specifier) = require_source(&s.expression) {
                            handled.insert(s.expression.span());
                            self.imports.push(format!("import {};", quote(specifier)));
                            self.remove_statement(s.span);
                        }
                    }
                    _ => {}
                }
            }
        }

        let scan = scan_consumers(program);
        let remaining: Vec<_> = scan
            .requires
            .iter()
            .filter(|call| !handled.contains(&call.span) && self.survives(call.span))
            .collect();
        if remaining.is_empty() || self.declared.contains("require") {
            return;
        }
        tracing::trace!(
            calls = remaining.len(),
            nested = remaining.iter().filter(|call| call.nested).count(),
            "Keeping require() through createRequire"
        );
        let create = self.helper_name("createRequire");
        self.imports.push(format!(
            "import {{ {} }} from 'node:module';",
            import_spec("createRequire", &create)
        ));
        self.prelude.push(format!("const require = {}(import.meta.url);", create));
    }

    fn context_shims(&mut self) {
        let filename = self.names.contains("__filename") && !self.declared.contains("__filename");
        let dirname = self.names.contains("__dirname") && !self.declared.contains("__dirname");
        if !filename && !dirname {
            return;
        }
        let to_path = self.helper_name("fileURLToPath");
        self.imports.push(format!(
            "import {{ {} }} from 'node:url';",
            import_spec("fileURLToPath", &to_path)
        ));
        if filename {
            self.prelude
                .push(format!("const __filename = {}(import.meta.url);", to_path));
        }
        if dirname {
            let dir = self.helper_name("dirname");
            self.imports
                .push(format!("import {{ {} }} from 'node:path';", import_spec("dirname", &dir)));
            self.prelude
                .push(format!("const __dirname = {}({}(import.meta.url));", dir, to_path));
        }
    }

    fn epilogue(&mut self) -> Vec<String> {
        let plan = self.plan;
        let mut lines = Vec::new();

        let specs: Vec<String> = plan
            .exports
            .iter()
            .filter_map(|export| {
                self.locals
                    .get(&export.name)
                    .map(|(local, _)| export_spec(local, &export.name))
            })
            .collect();
        if !specs.is_empty() {
            lines.push(format!("export {{ {} }};", specs.join(", ")));
        }

        for directive in &plan.reexports {
            lines.push(match directive {
                ReExportDirective::All { source } => format!("export * from {};", quote(source)),
                ReExportDirective::Named {
                    source,
                    imported,
                    exported,
                } => format!("export {{ {} }} from {};", reexport_spec(imported, exported), quote(source)),
            });
        }

        match &plan.default {
            None => {}
            Some(ValueProvenance::Aggregate { names }) => {
                let members: Vec<String> = names
                    .iter()
                    .map(|name| {
                        let value = self.value_of(name);
                        let key = property_key(name);
                        if key == value { key } else { format!("{}: {}", key, value) }
                    })
                    .collect();
                if members.is_empty() {
                    lines.push("export default {};".into());
                } else {
                    lines.push(format!("export default {{ {} }};", members.join(", ")));
                }
            }
            Some(ValueProvenance::LiveAggregate { names }) => {
                let mut text = String::from("export default {\n");
                for name in names {
                    let value = self.value_of(name);
                    text.push_str(&format!("  get {}() {{ return {}; }},\n", property_key(name), value));
                }
                text.push_str("};");
                lines.push(text);
            }
            Some(ValueProvenance::ReExportMany { sources }) => {
                let mut members: Vec<String> = sources
                    .iter()
                    .map(|source| format!("...{}", self.import_local(source, "default")))
                    .collect();
                for name in self.shape.named_names() {
                    let value = self.value_of(&name);
                    let key = property_key(&name);
                    members.push(if key == value { key } else { format!("{}: {}", key, value) });
                }
                lines.push(format!("export default {{ {} }};", members.join(", ")));
            }
            Some(_) => {
                let forwarded = plan.reexports.iter().any(|d| d.exported() == Some("default"));
                if let (false, Some((local, _))) = (forwarded, &self.whole) {
                    lines.push(format!("export default {};", local));
                }
            }
        }

        if plan.module_exports_override.is_some() {
            if let Some((local, _)) = &self.whole {
                lines.push(format!("export {{ {} as 'module.exports' }};", local));
            }
        }
        lines
    }

    fn finish(mut self) -> String {
        let epilogue = self.epilogue();
        self.edits
            .sort_by(|a, b| a.span.start.cmp(&b.span.start).then(b.span.end.cmp(&a.span.end)));

        let mut body = String::new();
        self.render(Span::new(0, self.source.len()), None, &mut body);

        let mut out = String::new();
        for line in self.imports.iter().chain(&self.prelude) {
            out.push_str(line);
            out.push('\n');
        }
        if !self.lets.is_empty() {
            out.push_str(&format!("let {};\n", self.lets.join(", ")));
        }
        out.push_str(body.trim_start_matches(['\r', '\n']));
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for line in epilogue {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn sites_of(write: &ExportWrite) -> Vec<Site<'_>> {
    let (properties, kind): (&[PropertyWrite], SiteKind) = match &write.target {
        WriteTarget::Property(prop) => {
            let kind = if prop.span == write.span { SiteKind::Define } else { SiteKind::Assign };
            (std::slice::from_ref(prop), kind)
        }
        WriteTarget::Members { properties, .. } => (properties, SiteKind::Member),
        WriteTarget::Whole(WholeValue::Object { properties, .. }) => (properties, SiteKind::Object),
        _ => (&[], SiteKind::Object),
    };
    properties.iter().map(|prop| Site { write, prop, kind }).collect()
}

fn named_imports(object: &ObjectPattern, specifier: &str, rewrites: &ImportRewrites) -> Option<Vec<String>> {
    if object.rest.is_some() {
        return None;
    }
    object
        .properties
        .iter()
        .map(|prop| {
            let key = prop.key.static_name()?;
            let local = prop.value.as_identifier()?;
            rewrites
                .links(specifier, &key)
                .then(|| import_spec(&key, &local.name))
        })
        .collect()
}

fn contains(outer: Span, inner: Span) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// A JavaScript string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Reserved words are fine as export names and property keys.
fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn export_name(name: &str) -> String {
    if is_identifier_name(name) { name.to_string() } else { quote(name) }
}

fn property_key(name: &str) -> String {
    export_name(name)
}

fn member_access(object: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, quote(name))
    }
}

/// `local` or `local as name` in an `export { ... }` list.
fn export_spec(local: &str, name: &str) -> String {
    if local == name {
        local.to_string()
    } else {
        format!("{} as {}", local, export_name(name))
    }
}

/// `name` or `name as local` in an `import { ... }` list.
fn import_spec(name: &str, local: &str) -> String {
    if name == local {
        local.to_string()
    } else {
        format!("{} as {}", export_name(name), local)
    }
}

fn reexport_spec(imported: &str, exported: &str) -> String {
    if imported == exported {
        export_name(imported)
    } else {
        format!("{} as {}", export_name(imported), export_name(exported))
    }
}

fn import_attributes(specifier: &str) -> &'static str {
    if specifier.ends_with(".json") { " with { type: 'json' }" } else { "" }
}

/// A binding name derived from a specifier: `./lib/parse-args.js` gives
/// `parse_args`.
fn specifier_stem(specifier: &str) -> String {
    let file = specifier.rsplit('/').next().unwrap_or(specifier);
    let stem = file.split('.').next().unwrap_or(file);
    if stem.is_empty() { "dep".into() } else { sanitize(stem) }
}

fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if !is_binding_identifier(&out) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ModuleId, ModuleKind};
    use crate::imports::{BindingKind, ConsumerSyntax};
    use crate::infer::infer_commonjs;
    use crate::resolver::ConsumerBindingRecord;
    use crate::synth::synthesize;
    use modshim_syntax::parse_script;

    fn whole_require() -> ConsumerBindingRecord {
        ConsumerBindingRecord {
            consumer: ModuleId::new("./main"),
            producer: ModuleId::new("./m"),
            specifier: "./m".into(),
            kind: BindingKind::DynamicRequireWhole,
            syntax: ConsumerSyntax::Require,
            probes: Vec::new(),
            span: Span::default(),
        }
    }

    fn emit_with(source: &str, records: &[ConsumerBindingRecord], rewrites: &ImportRewrites) -> String {
        let options = AnalyzerOptions::default();
        let module = Module::new("./m", source, ModuleKind::CommonJs);
        let program = parse_script(source).expect("parses");
        let shape = infer_commonjs(&program, source).expect("analyzable");
        let plan = synthesize(module.id(), &shape, records, &options);
        emit(&module, &program, &shape, &plan, rewrites, &options).expect("emits")
    }

    fn emit_source(source: &str) -> String {
        emit_with(source, &[], &ImportRewrites::new())
    }

    #[test]
    fn test_named_exports() {
        let out = emit_source("exports.Foo = class {}; exports.bar = 'bar';");
        assert_eq!(
            out,
            "const Foo = class {}; const bar = 'bar';\nexport { Foo, bar };\nexport default { Foo, bar };\n"
        );
    }

    #[test]
    fn test_function_default_with_override() {
        let out = emit_with("module.exports = function qux() {};", &[whole_require()], &ImportRewrites::new());
        assert_eq!(out, "function qux() {};\nexport default qux;\nexport { qux as 'module.exports' };\n");
    }

    #[test]
    fn test_object_literal() {
        let out = emit_source("function a() {}\nmodule.exports = { a, b: 2, c() { return 1; } };\n");
        assert!(out.contains("const b = 2; const c = function () { return 1; };"), "{}", out);
        assert!(out.contains("export { a, b, c };"), "{}", out);
        assert!(out.contains("export default { a, b, c };"), "{}", out);
        assert!(!out.contains("module.exports"), "{}", out);
    }

    #[test]
    fn test_reads_use_locals() {
        let out = emit_source("exports.a = 1;\nexports.b = exports.a + 1;\n");
        assert!(out.contains("const b = a + 1;"), "{}", out);
    }

    #[test]
    fn test_repeated_writes_use_let() {
        let out = emit_source("exports.count = 0;\nexports.count += 1;\n");
        assert!(out.starts_with("let count;\n"), "{}", out);
        assert!(out.contains("count = 0;\ncount += 1;"), "{}", out);
    }

    #[test]
    fn test_dynamic_exports_are_live() {
        let source = "function initialize(which) {\n  if (which === 'foo') exports.foo = 1;\n  else exports.bar = 2;\n}\n";
        let out = emit_source(source);
        assert!(out.starts_with("let foo, bar;\n"), "{}", out);
        assert!(out.contains("if (which === 'foo') foo = 1;"), "{}", out);
        assert!(out.contains("export { foo, bar, initialize };"), "{}", out);
        assert!(out.contains("  get foo() { return foo; },\n"), "{}", out);
    }

    #[test]
    fn test_discarded_writes_keep_side_effects() {
        let out = emit_source("exports.old = compute();\nmodule.exports = { fresh: 2 };\n");
        assert!(out.contains("(compute());"), "{}", out);
        assert!(out.contains("const fresh = 2;"), "{}", out);
        assert!(!out.contains("old"), "{}", out);
    }

    #[test]
    fn test_properties_on_primitive_default() {
        let out = emit_source("module.exports = 42;\nmodule.exports.extra = 1;\n");
        assert!(out.contains("const _default = 42;"), "{}", out);
        assert!(out.contains("_default.extra = 1;"), "{}", out);
        assert!(out.contains("export default _default;"), "{}", out);
        assert!(!out.contains("'module.exports'"), "{}", out);
    }

    #[test]
    fn test_single_reexport() {
        let out = emit_source("module.exports = require('./impl');\n");
        assert_eq!(out, "export * from './impl';\nexport { default } from './impl';\n");
    }

    #[test]
    fn test_requires_become_imports() {
        let source = "const fs = require('fs');\nconst { join } = require('path');\nconst data = require('./data.json');\nrequire('./side');\nfunction lazy() { return require('./lazy'); }\nexports.x = 1;\n";
        let out = emit_source(source);
        assert!(out.contains("import fs from 'fs';\n"), "{}", out);
        assert!(out.contains("import { join } from 'path';\n"), "{}", out);
        assert!(out.contains("import data from './data.json' with { type: 'json' };\n"), "{}", out);
        assert!(out.contains("import './side';\n"), "{}", out);
        assert!(out.contains("import { createRequire } from 'node:module';\n"), "{}", out);
        assert!(out.contains("const require = createRequire(import.meta.url);\n"), "{}", out);
    }

    #[test]
    fn test_destructured_require_of_opaque_module() {
        let mut rewrites = ImportRewrites::new();
        rewrites.insert("./util", ImportTarget::Names(vec!["parse".into()]));
        let out = emit_with("const { parse, format } = require('./util');\nexports.x = parse;\n", &[], &rewrites);
        assert!(out.contains("import util from './util';"), "{}", out);
        assert!(out.contains("const { parse, format } = util;"), "{}", out);
    }

    #[test]
    fn test_context_shims_and_use_strict() {
        let out = emit_source("'use strict';\nconst p = __dirname + '/x';\nexports.p = p;\n");
        assert!(!out.contains("use strict"), "{}", out);
        assert!(out.contains("import { fileURLToPath } from 'node:url';"), "{}", out);
        assert!(out.contains("const __dirname = dirname(fileURLToPath(import.meta.url));"), "{}", out);
        assert!(out.contains("export { p };"), "{}", out);
        assert!(!out.contains("exports.p"), "{}", out);
    }

    #[test]
    fn test_interop_marker_removed() {
        let out = emit_source("Object.defineProperty(exports, '__esModule', { value: true });\nexports.a = 1;\n");
        assert_eq!(out, "const a = 1;\nexport { a };\nexport default { a };\n");
    }

    #[test]
    fn test_parameter_named_like_export() {
        let out = emit_source("exports.bar = 1;\nfunction f(bar) { return exports.bar + bar; }\n");
        assert!(out.contains("const bar_1 = 1;"), "{}", out);
        assert!(out.contains("function f(bar) { return bar_1 + bar; }"), "{}", out);
        assert!(out.contains("export { bar_1 as bar };"), "{}", out);

        let out = emit_source("exports.x = 1;\nexports.get = function (x) { return exports.x; };\n");
        assert!(out.contains("const get = function (x) { return x_1; };"), "{}", out);
        assert!(out.contains("export { x_1 as x, get };"), "{}", out);
    }

    #[test]
    fn test_shadowed_alias_gets_own_local() {
        let out = emit_source("const x = 1;\nexports.x = x;\nfunction g() { let x = 2; return exports.x + x; }\n");
        assert!(out.contains("const x_1 = x;"), "{}", out);
        assert!(out.contains("return x_1 + x;"), "{}", out);
        assert!(out.contains("export { x_1 as x };"), "{}", out);
    }

    #[test]
    fn test_interop_marker_on_shared_line() {
        let out = emit_source("Object.defineProperty(exports, '__esModule', { value: true }); module.exports = 5;\n");
        assert!(out.starts_with("const _default = 5;"), "{:?}", out);
    }

    #[test]
    fn test_single_spread_merges_default() {
        let out = emit_source("module.exports = { ...require('./a'), c: 1 };\n");
        assert_eq!(
            out,
            "import a from './a';\nconst c = 1;\nexport { c };\nexport * from './a';\nexport default { ...a, c };\n"
        );
    }

    #[test]
    fn test_non_identifier_names() {
        let out = emit_source("exports['my-key'] = 1;\n");
        assert!(out.contains("const my_key = 1;"), "{}", out);
        assert!(out.contains("export { my_key as 'my-key' };"), "{}", out);
        assert!(out.contains("export default { 'my-key': my_key };"), "{}", out);
    }
}
