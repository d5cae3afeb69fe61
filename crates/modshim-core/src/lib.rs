// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # modshim-core
//!
//! Static analysis for migrating CommonJS modules to ECMAScript modules
//! without breaking their consumers.
//!
//! ## Overview
//!
//! The pipeline has five stages:
//! - [`infer`]: classify what a module exports ([`ExportShapeDescriptor`])
//! - [`imports`]: find how each module uses its dependencies
//! - [`resolver`]: link those uses across a [`ModuleGraph`] into
//!   [`ConsumerBindingRecord`]s
//! - [`synth`]: plan the ESM surface of each module ([`CompatibilityPlan`])
//! - [`checker`]: prove every consumer binding resolves to the same value
//!   before and after migration
//!
//! [`emit`] then rewrites the CommonJS source according to the plan.
//!
//! ## Quick Start
//!
//! ```rust
//! use modshim_core::{AnalyzerOptions, ModuleGraph, ModuleKind, resolve};
//!
//! let graph = ModuleGraph::builder()
//!     .module("./m.js", "exports.answer = 42;", ModuleKind::CommonJs)
//!     .build();
//! let resolution = resolve(&graph, &AnalyzerOptions::default());
//! let shape = resolution.shape("./m.js").expect("inferred");
//! assert_eq!(shape.named_names(), vec!["answer".to_string()]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod diagnostic;
pub mod emit;
pub mod error;
pub mod graph;
pub mod imports;
pub mod infer;
pub mod options;
pub mod resolver;
pub mod shape;
pub mod synth;

// Re-exports for convenience
pub use checker::{Verdict, check, verdict};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, has_errors};
pub use emit::{ImportRewrites, ImportTarget, emit};
pub use error::{InteropError, Result};
pub use graph::{Module, ModuleGraph, ModuleGraphBuilder, ModuleId, ModuleKind, Resolved, ShapeOutcome, is_builtin};
pub use imports::{BindingKind, ConsumerScan, ConsumerSyntax, ConsumerUse, scan_consumers};
pub use infer::{infer, infer_commonjs, infer_esm};
pub use options::AnalyzerOptions;
pub use resolver::{AnalyzedModule, ConsumerBindingRecord, Resolution, resolve};
pub use shape::{DefaultProvenance, ExportShapeDescriptor, NamedBinding, ShapeTag, ValueProvenance};
pub use synth::{CompatibilityPlan, PlanStatus, PlannedExport, ReExportDirective, Shim, synthesize};
