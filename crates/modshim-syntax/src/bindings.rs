//! Name bookkeeping for code generation.
//!
//! Rewrites introduce new bindings (`__filename`, hoisted export locals,
//! `require` shims). [`NameSet`] hands out names that cannot collide with
//! anything already spelled in the source.

use rustc_hash::FxHashSet;

use crate::ast::{Class, Nesting, Pattern, Program, Statement, Visitor, walk_class, walk_pattern, walk_statement};
use crate::lexer::{Scanner, TokenKind};

/// Every identifier spelled in a source text, plus names reserved since.
#[derive(Debug, Clone, Default)]
pub struct NameSet {
    names: FxHashSet<String>,
}

impl NameSet {
    /// Collects every identifier token of `source`. This over-approximates
    /// the bindings in scope anywhere in the file.
    pub fn from_source(source: &str) -> Self {
        let mut names = FxHashSet::default();
        for token in Scanner::new(source) {
            if let TokenKind::Identifier(name) = token.kind {
                names.insert(name);
            }
        }
        Self { names }
    }

    /// Returns true if `name` is spelled in the source or was reserved.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Reserves and returns `base` if free, else the first free `base_N`.
    pub fn fresh(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.names.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    /// Marks `name` as taken.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

/// Words that cannot name a binding in module code even though the lexer
/// scans them as plain identifiers.
const STRICT_RESERVED: &[&str] = &[
    "arguments", "eval", "implements", "interface", "package", "private", "protected", "public",
];

/// Returns true if `name` can be declared as a binding in an ECMAScript
/// module (`const name = ...`).
pub fn is_binding_identifier(name: &str) -> bool {
    let mut scanner = Scanner::new(name);
    let token = scanner.next_token();
    let TokenKind::Identifier(scanned) = token.kind else {
        return false;
    };
    scanned == name && token.span.len() == name.len() && !STRICT_RESERVED.contains(&name)
}

/// Returns the names declared by the program's top-level statements
/// (`var`/`let`/`const`, functions, classes, imports).
pub fn top_level_declarations(program: &Program) -> FxHashSet<String> {
    let mut declared = FxHashSet::default();
    for stmt in &program.body {
        declare_statement(stmt, &mut declared);
    }
    declared
}

fn declare_statement(stmt: &Statement, declared: &mut FxHashSet<String>) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            let mut names = Vec::new();
            for declarator in &decl.declarations {
                declarator.id.bound_names(&mut names);
            }
            declared.extend(names.into_iter().map(str::to_string));
        }
        Statement::FunctionDeclaration(function) => {
            if let Some(id) = &function.id {
                declared.insert(id.name.clone());
            }
        }
        Statement::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                declared.insert(id.name.clone());
            }
        }
        Statement::Import(import) => {
            use crate::ast::ImportSpecifier;
            for specifier in &import.specifiers {
                let local = match specifier {
                    ImportSpecifier::Default(id) | ImportSpecifier::Namespace(id) => id,
                    ImportSpecifier::Named { local, .. } => local,
                };
                declared.insert(local.name.clone());
            }
        }
        Statement::Export(crate::ast::ExportDeclaration::Declaration(decl)) => {
            declare_statement(&decl.declaration, declared);
        }
        _ => {}
    }
}

/// Returns the names bound below the top level: parameters, catch
/// parameters, and declarations inside functions, blocks and loop heads.
///
/// A top-level binding spelled like one of these may be shadowed somewhere
/// in the file. Function and class expression names are not included; they
/// are only visible inside their own body.
pub fn nested_bindings(program: &Program) -> FxHashSet<String> {
    let mut collector = NestedBindings::default();
    for stmt in &program.body {
        collector.top_level = true;
        collector.visit_statement(stmt);
    }
    collector.names
}

#[derive(Default)]
struct NestedBindings {
    depth: usize,
    /// Walking the declaration of a top-level statement
    top_level: bool,
    names: FxHashSet<String>,
}

impl NestedBindings {
    fn bind(&mut self, name: &str) {
        if self.depth > 0 || !self.top_level {
            self.names.insert(name.to_string());
        }
    }
}

impl Visitor for NestedBindings {
    fn enter(&mut self, _nesting: Nesting) {
        self.depth += 1;
    }

    fn leave(&mut self, _nesting: Nesting) {
        self.depth -= 1;
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        let id = match stmt {
            Statement::FunctionDeclaration(function) => function.id.as_ref(),
            Statement::ClassDeclaration(class) => class.id.as_ref(),
            _ => None,
        };
        if let Some(id) = id {
            self.bind(&id.name);
        }
        let declares = matches!(
            stmt,
            Statement::VariableDeclaration(_)
                | Statement::FunctionDeclaration(_)
                | Statement::ClassDeclaration(_)
                | Statement::Export(_)
        );
        let saved = self.top_level;
        self.top_level &= declares;
        walk_statement(self, stmt);
        self.top_level = saved;
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        if let Pattern::Identifier(id) = pattern {
            self.bind(&id.name);
        }
        walk_pattern(self, pattern);
    }

    fn visit_class(&mut self, class: &Class) {
        // Static blocks run at depth zero but have their own scope.
        let saved = std::mem::replace(&mut self.top_level, false);
        walk_class(self, class);
        self.top_level = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_script;

    #[test]
    fn test_fresh_avoids_source_names() {
        let mut names = NameSet::from_source("const __dirname_1 = 1; let __dirname = 2;");
        assert_eq!(names.fresh("__dirname"), "__dirname_2");
        assert_eq!(names.fresh("unused"), "unused");
        assert_eq!(names.fresh("unused"), "unused_1");
    }

    #[test]
    fn test_strings_are_not_names() {
        let names = NameSet::from_source("require('path');");
        assert!(names.contains("require"));
        assert!(!names.contains("path"));
    }

    #[test]
    fn test_is_binding_identifier() {
        assert!(is_binding_identifier("foo"));
        assert!(is_binding_identifier("$_x1"));
        assert!(!is_binding_identifier("delete"));
        assert!(!is_binding_identifier("await"));
        assert!(!is_binding_identifier("foo-bar"));
        assert!(!is_binding_identifier("module.exports"));
        assert!(!is_binding_identifier("eval"));
        assert!(!is_binding_identifier(""));
    }

    #[test]
    fn test_top_level_declarations() {
        let program = parse_script(
            "var a = 1; const { b, c: [d] } = x; function f() { var inner; } class K {} if (y) { var hidden; }",
        )
        .expect("parses");
        let declared = top_level_declarations(&program);
        for name in ["a", "b", "d", "f", "K"] {
            assert!(declared.contains(name), "missing {}", name);
        }
        assert!(!declared.contains("inner"));
        assert!(!declared.contains("c"));
    }

    #[test]
    fn test_nested_bindings() {
        let program = parse_script(
            "const { top, alias: [deep] } = x;\nfunction f(param, { field }) { let local; function inner() {} }\n\
             try {} catch (err) {}\nfor (let i = 0; i < 1; i++) {}\n{ let blocked; }\n\
             const g = (arrow = (nested) => nested) => arrow;\nclass K { static { let stat; } }\n",
        )
        .expect("parses");
        let nested = nested_bindings(&program);
        for name in ["param", "field", "local", "inner", "err", "i", "blocked", "arrow", "nested", "stat"] {
            assert!(nested.contains(name), "missing {}", name);
        }
        for name in ["top", "deep", "f", "g", "K", "x"] {
            assert!(!nested.contains(name), "unexpected {}", name);
        }
    }
}
