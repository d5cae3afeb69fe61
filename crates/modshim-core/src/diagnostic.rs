// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Diagnostics reported by every analysis stage.

use std::fmt;

use modshim_syntax::{LineIndex, Span};
use serde::{Serialize, Serializer};

use crate::graph::ModuleId;

/// How serious a diagnostic is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A binding was checked and found preserved
    Info,
    /// Behavior is preserved only partially or needs attention
    Warning,
    /// A consumer would observe different behavior, or analysis failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable identifier of a diagnostic kind.
///
/// Codes are grouped by stage: `MS1xxx` export-shape inference, `MS2xxx`
/// binding resolution, `MS3xxx` shim synthesis, `MS4xxx` equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// The module source does not parse
    SyntaxError,
    /// The export object escapes static analysis
    UnanalyzableExports,
    /// The host did not classify the module as CommonJS or ESM
    UnknownModuleKind,
    /// A property is attached to a default export that is not a plain object
    PropertyOnNonObjectDefault,
    /// `exports` is reassigned, detaching it from `module.exports`
    DetachedExports,
    /// A `require()` call whose specifier is not a string literal
    DynamicSpecifier,
    /// A specifier that maps to no module in the graph
    UnresolvedSpecifier,
    /// An ESM named import that cannot be linked statically
    UnresolvableNamedImport,
    /// A re-export cycle blocks shape resolution
    ReExportCycle,
    /// An edge names a module the graph does not contain
    UnknownModule,
    /// Default re-export is ambiguous across several sources
    AmbiguousDefaultReExport,
    /// Conditionally assigned bindings become always-present exports
    ConditionalMembership,
    /// The synthesized default is a snapshot rather than a live view
    FrozenDefault,
    /// A consumer binding observes the same value before and after
    BindingPreserved,
    /// A default import observes a different value
    DefaultMismatch,
    /// A named import observes a different value
    NamedMismatch,
    /// A namespace import observes different members
    NamespaceMismatch,
    /// A whole-value `require()` observes a different value
    WholeValueMismatch,
    /// A membership probe (`'x' in ns`) changes its answer
    MembershipChanged,
}

impl DiagnosticCode {
    /// The rendered code, e.g. `MS2002`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "MS1001",
            DiagnosticCode::UnanalyzableExports => "MS1002",
            DiagnosticCode::UnknownModuleKind => "MS1003",
            DiagnosticCode::PropertyOnNonObjectDefault => "MS1101",
            DiagnosticCode::DetachedExports => "MS1102",
            DiagnosticCode::DynamicSpecifier => "MS1103",
            DiagnosticCode::UnresolvedSpecifier => "MS2001",
            DiagnosticCode::UnresolvableNamedImport => "MS2002",
            DiagnosticCode::ReExportCycle => "MS2003",
            DiagnosticCode::UnknownModule => "MS2004",
            DiagnosticCode::AmbiguousDefaultReExport => "MS3001",
            DiagnosticCode::ConditionalMembership => "MS3002",
            DiagnosticCode::FrozenDefault => "MS3003",
            DiagnosticCode::BindingPreserved => "MS4001",
            DiagnosticCode::DefaultMismatch => "MS4002",
            DiagnosticCode::NamedMismatch => "MS4003",
            DiagnosticCode::NamespaceMismatch => "MS4004",
            DiagnosticCode::WholeValueMismatch => "MS4005",
            DiagnosticCode::MembershipChanged => "MS4006",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single finding with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Stable code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Module the finding is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleId>,
    /// Source range inside `module`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// 1-based line of `span.start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column of `span.start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    /// Creates an unlocated diagnostic.
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            module: None,
            span: None,
            line: None,
            column: None,
        }
    }

    /// Creates an error.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Creates a warning.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Creates an informational note.
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Attaches the module the finding belongs to.
    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    /// Attaches a source range.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Fills in line and column from the span.
    pub fn locate(&mut self, index: &LineIndex, source: &str) {
        if let Some(span) = self.span {
            let (line, column) = index.line_col(source, span.start);
            self.line = Some(line);
            self.column = Some(column);
        }
    }

    /// Returns true for [`Severity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(module) = &self.module {
            write!(f, " ({}", module)?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{}:{}", line, column)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Returns true if any diagnostic is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_display_with_location() {
        let source = "const a = 1;\nexports.b = a;";
        let mut diag = Diagnostic::warning(DiagnosticCode::DetachedExports, "exports reassigned")
            .with_module(ModuleId::new("./m.js"))
            .with_span(Span::new(13, 20));
        diag.locate(&LineIndex::new(source), source);
        assert_eq!(diag.line, Some(2));
        assert_eq!(diag.column, Some(1));
        assert_eq!(diag.to_string(), "warning[MS1102]: exports reassigned (./m.js:2:1)");
    }

    #[test]
    fn test_serialize_code_as_string() {
        let diag = Diagnostic::error(DiagnosticCode::UnresolvableNamedImport, "nope");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "MS2002");
        assert_eq!(json["severity"], "error");
        assert!(json.get("span").is_none());
    }
}
