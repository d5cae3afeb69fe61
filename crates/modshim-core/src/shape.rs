// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Export shape descriptors.
//!
//! A descriptor is the static summary of what a module exposes: which
//! names, where each value comes from, and what its default (its whole
//! `module.exports` value, for CommonJS) is. Consumers are checked against
//! descriptors before and after migration, so values are tracked by
//! [`ValueProvenance`] rather than by value.

use std::fmt;

use modshim_syntax::Span;
use serde::Serialize;

use crate::diagnostic::Diagnostic;

/// Classification of a module's export pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShapeTag {
    /// Only `exports.x = ...` / `module.exports.x = ...` writes
    NamedOnly,
    /// `module.exports = { ... }` with static keys
    ObjectLiteralNamed,
    /// `module.exports = <function | class | primitive | expression>`
    NonObjectDefault,
    /// Export writes inside branches, loops or functions
    DynamicConditional,
    /// `module.exports = require('x')`
    ReExportAll,
    /// `module.exports = { a: require('x').a, ... }`
    ReExportNamed,
    /// Exports merged from several `require()`d modules
    ReExportDefaultAggregate,
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where an exported value originates.
///
/// Two bindings observe the same value exactly when their provenances are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueProvenance {
    /// A module-level binding of this name
    Local {
        /// Binding name
        name: String,
    },
    /// A value created in place by this expression text
    Expression {
        /// Source text of the expression
        text: String,
    },
    /// A plain object holding the values of these exports when built
    Aggregate {
        /// Export names, in order
        names: Vec<String>,
    },
    /// An object whose members always reflect the current values of these
    /// exports
    LiveAggregate {
        /// Export names, in order
        names: Vec<String>,
    },
    /// A value taken from another module. `name` is `*` for the source's
    /// whole `module.exports` value.
    ReExport {
        /// Module specifier
        source: String,
        /// Imported name
        name: String,
    },
    /// The namespace object of another module (`export * as ns`)
    Namespace {
        /// Module specifier
        source: String,
    },
    /// Exports merged from several modules
    ReExportMany {
        /// Module specifiers, in order
        sources: Vec<String>,
    },
    /// A property read off another value
    Property {
        /// The object read from
        of: Box<ValueProvenance>,
        /// Property name
        name: String,
    },
    /// A binding assigned only on some execution paths
    Conditional {
        /// Export name
        name: String,
    },
}

impl ValueProvenance {
    /// A module-level binding.
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local { name: name.into() }
    }

    /// An in-place expression.
    pub fn expression(text: impl Into<String>) -> Self {
        Self::Expression { text: text.into() }
    }

    /// A value from another module.
    pub fn reexport(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ReExport {
            source: source.into(),
            name: name.into(),
        }
    }

    /// The whole `module.exports` value of another module.
    pub fn whole(source: impl Into<String>) -> Self {
        Self::reexport(source, "*")
    }

    /// A property of this value.
    pub fn property(&self, name: impl Into<String>) -> Self {
        Self::Property {
            of: Box::new(self.clone()),
            name: name.into(),
        }
    }
}

/// One statically known export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedBinding {
    /// Export name
    pub name: String,
    /// Where its value comes from
    pub provenance: ValueProvenance,
    /// Location of the (last) write
    pub span: Span,
}

/// What a module's default export is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultProvenance {
    /// No default export
    Absent,
    /// An object aggregating the named exports
    SynthesizedFromNamed,
    /// A specific value
    Explicit(ValueProvenance),
}

/// Static summary of a module's exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportShapeDescriptor {
    /// Export pattern
    pub tag: ShapeTag,
    /// Statically guaranteed named exports, in first-write order
    pub named: Vec<NamedBinding>,
    /// Default export
    pub default: DefaultProvenance,
    /// Specifiers re-exported wholesale
    pub reexport_sources: Vec<String>,
    /// Names assigned only on some execution paths
    pub conditional_names: Vec<String>,
    /// Top-level functions whose bodies populate exports
    pub initializers: Vec<String>,
    /// Properties attached to a non-object default
    pub default_properties: Vec<String>,
    /// Whether the module is already an ECMAScript module
    pub native_esm: bool,
    /// Warnings found while inferring the shape
    pub diagnostics: Vec<Diagnostic>,
}

impl ExportShapeDescriptor {
    /// Creates an empty descriptor.
    pub fn new(tag: ShapeTag) -> Self {
        Self {
            tag,
            named: Vec::new(),
            default: DefaultProvenance::Absent,
            reexport_sources: Vec::new(),
            conditional_names: Vec::new(),
            initializers: Vec::new(),
            default_properties: Vec::new(),
            native_esm: false,
            diagnostics: Vec::new(),
        }
    }

    /// Names of the statically guaranteed exports.
    pub fn named_names(&self) -> Vec<String> {
        self.named.iter().map(|b| b.name.clone()).collect()
    }

    /// Looks up a guaranteed export.
    pub fn binding(&self, name: &str) -> Option<&NamedBinding> {
        self.named.iter().find(|b| b.name == name)
    }

    /// Returns true if `name` is assigned only on some paths.
    pub fn is_conditional(&self, name: &str) -> bool {
        self.conditional_names.iter().any(|n| n == name)
    }

    /// Every name the module may export: guaranteed names, then
    /// conditionally assigned ones.
    pub fn all_names(&self) -> Vec<String> {
        let mut names = self.named_names();
        for name in &self.conditional_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// The value a whole-module consumer observes: the ESM default for
    /// native modules, the final `module.exports` value otherwise. `None`
    /// when there is no such value.
    pub fn whole_value(&self) -> Option<ValueProvenance> {
        if self.native_esm {
            if let Some(binding) = self.binding("module.exports") {
                return Some(binding.provenance.clone());
            }
        }
        match &self.default {
            DefaultProvenance::Explicit(provenance) => Some(provenance.clone()),
            DefaultProvenance::SynthesizedFromNamed => Some(ValueProvenance::Aggregate {
                names: self.named_names(),
            }),
            DefaultProvenance::Absent => None,
        }
    }

    /// What a property read `<whole value>.name` observes, or `None` when
    /// the property is known to be missing.
    pub fn member(&self, name: &str) -> Option<ValueProvenance> {
        if let Some(binding) = self.binding(name) {
            return Some(binding.provenance.clone());
        }
        if self.is_conditional(name) {
            return Some(ValueProvenance::Conditional { name: name.to_string() });
        }
        match self.tag {
            ShapeTag::NonObjectDefault | ShapeTag::ReExportAll | ShapeTag::ReExportDefaultAggregate => {
                self.whole_value().map(|whole| whole.property(name))
            }
            _ => None,
        }
    }

    /// Returns true for the re-export tags.
    pub fn is_reexport(&self) -> bool {
        matches!(
            self.tag,
            ShapeTag::ReExportAll | ShapeTag::ReExportNamed | ShapeTag::ReExportDefaultAggregate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str) -> NamedBinding {
        NamedBinding {
            name: name.into(),
            provenance: ValueProvenance::local(name),
            span: Span::default(),
        }
    }

    #[test]
    fn test_whole_value_of_named_module() {
        let mut shape = ExportShapeDescriptor::new(ShapeTag::NamedOnly);
        shape.named = vec![binding("Foo"), binding("bar")];
        shape.default = DefaultProvenance::SynthesizedFromNamed;
        assert_eq!(
            shape.whole_value(),
            Some(ValueProvenance::Aggregate {
                names: vec!["Foo".into(), "bar".into()]
            })
        );
        assert_eq!(shape.member("bar"), Some(ValueProvenance::local("bar")));
        assert_eq!(shape.member("baz"), None);
    }

    #[test]
    fn test_member_of_function_default() {
        let mut shape = ExportShapeDescriptor::new(ShapeTag::NonObjectDefault);
        shape.default = DefaultProvenance::Explicit(ValueProvenance::local("qux"));
        assert_eq!(shape.member("helper"), Some(ValueProvenance::local("qux").property("helper")));
    }

    #[test]
    fn test_all_names_dedupes() {
        let mut shape = ExportShapeDescriptor::new(ShapeTag::DynamicConditional);
        shape.named = vec![binding("init")];
        shape.conditional_names = vec!["foo".into(), "init".into()];
        assert_eq!(shape.all_names(), vec!["init".to_string(), "foo".to_string()]);
        assert_eq!(shape.member("foo"), Some(ValueProvenance::Conditional { name: "foo".into() }));
    }

    #[test]
    fn test_serialize_provenance() {
        let json = serde_json::to_value(ValueProvenance::whole("./a")).unwrap();
        assert_eq!(json["kind"], "re_export");
        assert_eq!(json["name"], "*");
    }
}
