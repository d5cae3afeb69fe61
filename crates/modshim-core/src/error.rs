// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the interop analyzer

use modshim_syntax::{Span, SyntaxError};
use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::graph::ModuleId;

/// Result type for analyzer operations
pub type Result<T> = std::result::Result<T, InteropError>;

/// Errors that stop analysis of a module or binding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteropError {
    /// The module source does not parse
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),

    /// The export object escapes static analysis
    #[error("AnalysisError: {reason}")]
    Analysis {
        /// What made the exports unanalyzable
        reason: String,
        /// Where it happened
        span: Option<Span>,
    },

    /// The host left the module kind unknown
    #[error("AnalysisError: module kind of '{0}' is unknown")]
    UnknownKind(ModuleId),

    /// A re-export cycle prevents determining a shape
    #[error("CycleError: re-export cycle {}", join_cycle(.modules))]
    Cycle {
        /// Modules on the cycle, in traversal order
        modules: Vec<ModuleId>,
    },

    /// An ESM named import cannot be linked statically
    #[error("LinkError: '{specifier}' does not provide a statically linkable export named '{name}'")]
    Link {
        /// The import specifier
        specifier: String,
        /// The imported name
        name: String,
        /// Location of the import
        span: Span,
    },

    /// A default re-export must pick one of several sources
    #[error("AmbiguityError: default export is ambiguous between {}", .sources.join(", "))]
    Ambiguity {
        /// The competing re-export sources
        sources: Vec<String>,
    },

    /// An edge points at a module the graph does not contain
    #[error("Cannot find module '{0}'")]
    UnknownModule(String),
}

fn join_cycle(modules: &[ModuleId]) -> String {
    modules.iter().map(ModuleId::as_str).collect::<Vec<_>>().join(" -> ")
}

impl InteropError {
    /// Creates an analysis error at a location.
    pub fn analysis(reason: impl Into<String>, span: Span) -> Self {
        Self::Analysis {
            reason: reason.into(),
            span: Some(span),
        }
    }

    /// Creates a link error.
    pub fn link(specifier: impl Into<String>, name: impl Into<String>, span: Span) -> Self {
        Self::Link {
            specifier: specifier.into(),
            name: name.into(),
            span,
        }
    }

    /// Diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            InteropError::Syntax(_) => DiagnosticCode::SyntaxError,
            InteropError::Analysis { .. } => DiagnosticCode::UnanalyzableExports,
            InteropError::UnknownKind(_) => DiagnosticCode::UnknownModuleKind,
            InteropError::Cycle { .. } => DiagnosticCode::ReExportCycle,
            InteropError::Link { .. } => DiagnosticCode::UnresolvableNamedImport,
            InteropError::Ambiguity { .. } => DiagnosticCode::AmbiguousDefaultReExport,
            InteropError::UnknownModule(_) => DiagnosticCode::UnknownModule,
        }
    }

    /// Source location, if the error has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            InteropError::Syntax(err) => Some(err.span),
            InteropError::Analysis { span, .. } => *span,
            InteropError::Link { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Converts this error into a diagnostic of the given severity,
    /// attributed to `module`.
    pub fn to_diagnostic(&self, severity: Severity, module: &ModuleId) -> Diagnostic {
        let mut diag = Diagnostic::new(severity, self.code(), self.to_string()).with_module(module.clone());
        diag.span = self.span();
        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = InteropError::Cycle {
            modules: vec![ModuleId::new("./a"), ModuleId::new("./b"), ModuleId::new("./a")],
        };
        assert_eq!(err.to_string(), "CycleError: re-export cycle ./a -> ./b -> ./a");

        let err = InteropError::Ambiguity {
            sources: vec!["./a".into(), "./b".into()],
        };
        assert_eq!(err.to_string(), "AmbiguityError: default export is ambiguous between ./a, ./b");
    }

    #[test]
    fn test_syntax_error_converts() {
        let syntax = SyntaxError::new("unexpected token", Span::new(3, 4));
        let err: InteropError = syntax.into();
        assert_eq!(err.code(), DiagnosticCode::SyntaxError);
        assert_eq!(err.span(), Some(Span::new(3, 4)));
    }

    #[test]
    fn test_to_diagnostic() {
        let err = InteropError::link("./foo", "bar", Span::new(0, 10));
        let diag = err.to_diagnostic(Severity::Error, &ModuleId::new("./main.mjs"));
        assert_eq!(diag.code, DiagnosticCode::UnresolvableNamedImport);
        assert_eq!(diag.span, Some(Span::new(0, 10)));
        assert!(diag.message.starts_with("LinkError"));
    }
}
