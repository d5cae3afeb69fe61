// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # modshim
//!
//! Migrates CommonJS module graphs to ECMAScript modules while keeping
//! every recorded consumer working.
//!
//! The host supplies a [`ModuleGraph`] (sources, kinds and resolved
//! edges); [`Migrator::run`] returns a [`MigrationReport`] with a plan,
//! rewritten source and diagnostics per module, plus an overall
//! [`Verdict`].
//!
//! ## Quick Start
//!
//! ```rust
//! use modshim::{AnalyzerOptions, Migrator, ModuleGraph, ModuleKind, Verdict};
//!
//! let graph = ModuleGraph::builder()
//!     .module("./lib.js", "exports.add = (a, b) => a + b;", ModuleKind::CommonJs)
//!     .module("./main.js", "const { add } = require('./lib.js');\nadd(1, 2);\n", ModuleKind::CommonJs)
//!     .build();
//! let report = Migrator::new(AnalyzerOptions::default()).run(&graph);
//! assert_eq!(report.verdict, Verdict::Safe);
//! let lib = report.module("./lib.js").unwrap();
//! assert!(lib.output.as_deref().unwrap().contains("export { add };"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod logging;
mod migrator;

pub use config::{Config, ConfigError, LogConfig, LogFormat};
pub use migrator::{MigrationReport, Migrator, ModuleReport};

pub use modshim_core::{
    AnalyzerOptions, CompatibilityPlan, Diagnostic, DiagnosticCode, ModuleGraph, ModuleGraphBuilder, ModuleId,
    ModuleKind, PlanStatus, Severity, ShapeTag, Verdict,
};

/// Lower-level analysis API.
pub use modshim_core as core;
