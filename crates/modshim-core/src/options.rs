// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Analyzer settings.

use serde::{Deserialize, Serialize};

use crate::graph::ModuleKind;

/// Settings shared by every analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Synthesize the default export of dynamically populated modules as a
    /// live view over their bindings instead of a snapshot taken at module
    /// evaluation.
    pub live_default_bindings: bool,
    /// Kind to assume for modules the host left unclassified. `None` makes
    /// unclassified modules an analysis error.
    pub assume_unknown_as: Option<ModuleKind>,
    /// Infer shapes and scan consumers on the rayon pool.
    pub parallel: bool,
    /// Keep informational diagnostics (preserved bindings) in reports.
    pub emit_info: bool,
    /// Turn top-level `require()` calls into `import` declarations.
    pub rewrite_requires: bool,
    /// Provide `__filename`, `__dirname` and a `createRequire`-backed
    /// `require` when the module still refers to them.
    pub context_shims: bool,
    /// Remove a leading `'use strict'` directive.
    pub strip_use_strict: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            live_default_bindings: true,
            assume_unknown_as: None,
            parallel: true,
            emit_info: false,
            rewrite_requires: true,
            context_shims: true,
            strip_use_strict: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalyzerOptions::default();
        assert!(options.live_default_bindings);
        assert!(options.assume_unknown_as.is_none());
        assert!(options.rewrite_requires);
        assert!(!options.emit_info);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: AnalyzerOptions =
            serde_json::from_str(r#"{"live_default_bindings": false, "assume_unknown_as": "commonjs"}"#).unwrap();
        assert!(!options.live_default_bindings);
        assert_eq!(options.assume_unknown_as, Some(ModuleKind::CommonJs));
        assert!(options.parallel);
    }
}
