// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Cross-module binding resolution.
//!
//! Resolution runs in two phases. Every module is parsed, its export shape
//! inferred and cached, and its dependency uses scanned; modules are
//! independent here, so this runs on the rayon pool. Then each use is
//! matched against the shape of the module it resolves to, producing one
//! [`ConsumerBindingRecord`] per use. ESM named imports are linked at this
//! point, following re-exports through the graph.

use std::sync::Arc;

use modshim_syntax::ast::Program;
use modshim_syntax::{Span, parse_module, parse_script};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::error::InteropError;
use crate::graph::{Module, ModuleGraph, ModuleId, ModuleKind, Resolved, ShapeOutcome};
use crate::imports::{BindingKind, ConsumerScan, ConsumerSyntax, scan_consumers};
use crate::infer::infer;
use crate::options::AnalyzerOptions;
use crate::shape::{DefaultProvenance, ExportShapeDescriptor, ShapeTag};

/// One binding a consumer takes from a producer in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerBindingRecord {
    /// The importing module
    pub consumer: ModuleId,
    /// The module imported from
    pub producer: ModuleId,
    /// Specifier as written in the consumer
    pub specifier: String,
    /// Binding taken
    pub kind: BindingKind,
    /// Syntax used
    pub syntax: ConsumerSyntax,
    /// Names probed for membership on the binding
    pub probes: Vec<String>,
    /// Location in the consumer
    pub span: Span,
}

/// Per-module result of the first phase.
#[derive(Debug)]
pub struct AnalyzedModule {
    /// The module
    pub module: Arc<Module>,
    /// The kind it was analyzed as
    pub kind: ModuleKind,
    /// Parsed program, if parsing succeeded
    pub program: Option<Program>,
    /// Inferred shape or the error that prevented inference
    pub shape: Arc<ShapeOutcome>,
    /// Dependency uses
    pub scan: ConsumerScan,
}

impl AnalyzedModule {
    /// The shape, if inference succeeded.
    pub fn descriptor(&self) -> Option<&ExportShapeDescriptor> {
        self.shape.as_ref().as_ref().ok()
    }
}

/// Everything known about the graph after resolution.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Analyzed modules in graph order
    pub modules: Vec<AnalyzedModule>,
    /// Binding records in consumer order
    pub records: Vec<ConsumerBindingRecord>,
    /// Re-export cycles, each in graph order
    pub cycles: Vec<Vec<ModuleId>>,
    /// Diagnostics from inference, scanning and linking
    pub diagnostics: Vec<Diagnostic>,
    index: FxHashMap<ModuleId, usize>,
}

impl Resolution {
    /// Looks up an analyzed module.
    pub fn module(&self, id: &str) -> Option<&AnalyzedModule> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    /// The inferred shape of a module.
    pub fn shape(&self, id: &str) -> Option<&ExportShapeDescriptor> {
        self.module(id).and_then(AnalyzedModule::descriptor)
    }

    /// Records of bindings taken from `producer`.
    pub fn records_for(&self, producer: &ModuleId) -> Vec<ConsumerBindingRecord> {
        self.records.iter().filter(|r| &r.producer == producer).cloned().collect()
    }

    /// Returns true if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        crate::diagnostic::has_errors(&self.diagnostics)
    }
}

/// Resolves every consumer binding in the graph.
pub fn resolve(graph: &ModuleGraph, options: &AnalyzerOptions) -> Resolution {
    let modules = map_modules(graph.modules(), options.parallel, |module| analyze(module, options));

    let mut resolution = Resolution {
        index: modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.module.id().clone(), i))
            .collect(),
        modules,
        ..Default::default()
    };

    for analyzed in &resolution.modules {
        let module = &analyzed.module;
        match &*analyzed.shape {
            Ok(shape) => {
                tracing::debug!(module = %module.id(), tag = %shape.tag, named = shape.named.len(), "Inferred export shape");
                for diag in &shape.diagnostics {
                    resolution.diagnostics.push(locate(diag.clone(), module));
                }
            }
            Err(err) => {
                tracing::warn!(module = %module.id(), error = %err, "Export shape inference failed");
                resolution.diagnostics.push(locate(err.to_diagnostic(Severity::Error, module.id()), module));
            }
        }
        for diag in &analyzed.scan.diagnostics {
            resolution.diagnostics.push(locate(diag.clone(), module));
        }
    }

    resolution.cycles = reexport_cycles(graph, &resolution);
    for cycle in &resolution.cycles {
        tracing::debug!(cycle = ?cycle, "Found re-export cycle");
    }

    let linker = Linker {
        graph,
        resolution: &resolution,
    };
    let linked = map_modules(&resolution.modules, options.parallel, |analyzed| {
        let mut records = Vec::new();
        let mut diagnostics = Vec::new();
        linker.link_module(analyzed, &mut records, &mut diagnostics);
        (records, diagnostics)
    });
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();
    for (module_records, module_diagnostics) in linked {
        records.extend(module_records);
        diagnostics.extend(module_diagnostics);
    }
    resolution.records = records;
    resolution.diagnostics.extend(diagnostics);
    resolution
}

/// Maps `f` over `items`, on the rayon pool when `parallel` is set. Results
/// keep the order of `items`.
#[cfg(feature = "parallel")]
fn map_modules<I, T, F>(items: &[I], parallel: bool, f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    if parallel {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_modules<I, T, F>(items: &[I], _parallel: bool, f: F) -> Vec<T>
where
    F: Fn(&I) -> T,
{
    items.iter().map(f).collect()
}

fn analyze(module: &Arc<Module>, options: &AnalyzerOptions) -> AnalyzedModule {
    let kind = match module.kind() {
        ModuleKind::Unknown => options.assume_unknown_as.unwrap_or(ModuleKind::Unknown),
        kind => kind,
    };
    let parsed = match kind {
        ModuleKind::CommonJs => parse_script(module.source()).map_err(InteropError::from),
        ModuleKind::Esm => parse_module(module.source()).map_err(InteropError::from),
        ModuleKind::Unknown => Err(InteropError::UnknownKind(module.id().clone())),
    };
    match parsed {
        Ok(program) => {
            let shape = match module.shape() {
                Some(cached) => cached,
                None => module.cache_shape(infer(&program, module.source())),
            };
            let scan = scan_consumers(&program);
            AnalyzedModule {
                module: module.clone(),
                kind,
                program: Some(program),
                shape,
                scan,
            }
        }
        Err(err) => AnalyzedModule {
            module: module.clone(),
            kind,
            program: None,
            shape: module.cache_shape(Err(err)),
            scan: ConsumerScan::default(),
        },
    }
}

fn locate(mut diag: Diagnostic, module: &Module) -> Diagnostic {
    if diag.module.is_none() {
        diag.module = Some(module.id().clone());
    }
    diag.locate(module.line_index(), module.source());
    diag
}

/// Modules whose shape depends on a module whose shape depends on them.
fn reexport_cycles(graph: &ModuleGraph, resolution: &Resolution) -> Vec<Vec<ModuleId>> {
    let mut deps: DiGraph<ModuleId, ()> = DiGraph::new();
    let mut nodes: FxHashMap<ModuleId, NodeIndex> = FxHashMap::default();
    for analyzed in &resolution.modules {
        let id = analyzed.module.id().clone();
        nodes.insert(id.clone(), deps.add_node(id));
    }

    let mut self_cycles = Vec::new();
    for analyzed in &resolution.modules {
        let Some(shape) = analyzed.descriptor() else {
            continue;
        };
        let from = analyzed.module.id();
        for source in &shape.reexport_sources {
            if let Resolved::Module(target) = graph.resolve(from, source) {
                if target.id() == from {
                    self_cycles.push(vec![from.clone()]);
                    continue;
                }
                deps.add_edge(nodes[from], nodes[target.id()], ());
            }
        }
    }

    let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&deps)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut members: Vec<usize> = scc
                .iter()
                .filter_map(|&node| resolution.index.get(&deps[node]).copied())
                .collect();
            members.sort_unstable();
            members
                .into_iter()
                .map(|i| resolution.modules[i].module.id().clone())
                .collect()
        })
        .collect();
    cycles.extend(self_cycles);
    cycles.sort();
    cycles
}

/// Outcome of looking an export name up through re-exports.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookup {
    Found,
    Missing,
    /// The name exists only dynamically
    Unresolvable,
    Cycle(Vec<ModuleId>),
    /// The shape is unknown or leaves the graph
    Unknown,
}

struct Linker<'a> {
    graph: &'a ModuleGraph,
    resolution: &'a Resolution,
}

impl Linker<'_> {
    fn link_module(
        &self,
        analyzed: &AnalyzedModule,
        records: &mut Vec<ConsumerBindingRecord>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let consumer = &analyzed.module;
        for consumer_use in &analyzed.scan.uses {
            let producer = match self.graph.resolve(consumer.id(), &consumer_use.specifier) {
                Resolved::Module(producer) => producer,
                Resolved::External => {
                    tracing::trace!(module = %consumer.id(), specifier = %consumer_use.specifier, "Skipping external module");
                    continue;
                }
                Resolved::Missing => {
                    let err = InteropError::UnknownModule(consumer_use.specifier.clone());
                    let diag = err.to_diagnostic(Severity::Error, consumer.id()).with_span(consumer_use.span);
                    diagnostics.push(locate(diag, consumer));
                    continue;
                }
                Resolved::Unresolved => {
                    let diag = Diagnostic::warning(
                        DiagnosticCode::UnresolvedSpecifier,
                        format!("'{}' does not resolve to a module in the graph", consumer_use.specifier),
                    )
                    .with_span(consumer_use.span);
                    diagnostics.push(locate(diag, consumer));
                    continue;
                }
            };

            if consumer_use.syntax.is_static_esm() {
                let name = match &consumer_use.kind {
                    BindingKind::Named(name) => Some(name.as_str()),
                    BindingKind::Default => Some("default"),
                    _ => None,
                };
                if let Some(name) = name {
                    let err = match self.lookup(producer.id(), name, &mut Vec::new()) {
                        Lookup::Found | Lookup::Unknown => None,
                        Lookup::Missing | Lookup::Unresolvable => {
                            Some(InteropError::link(&consumer_use.specifier, name, consumer_use.span))
                        }
                        Lookup::Cycle(modules) => Some(InteropError::Cycle { modules }),
                    };
                    if let Some(err) = err {
                        let diag = err.to_diagnostic(Severity::Error, consumer.id()).with_span(consumer_use.span);
                        diagnostics.push(locate(diag, consumer));
                    }
                }
            }

            records.push(ConsumerBindingRecord {
                consumer: consumer.id().clone(),
                producer: producer.id().clone(),
                specifier: consumer_use.specifier.clone(),
                kind: consumer_use.kind.clone(),
                syntax: consumer_use.syntax,
                probes: consumer_use.probes.clone(),
                span: consumer_use.span,
            });
        }
    }

    fn lookup(&self, producer: &ModuleId, name: &str, trail: &mut Vec<ModuleId>) -> Lookup {
        if let Some(pos) = trail.iter().position(|m| m == producer) {
            let mut cycle = trail[pos..].to_vec();
            cycle.push(producer.clone());
            return Lookup::Cycle(cycle);
        }
        let Some(shape) = self.resolution.shape(producer.as_str()) else {
            return Lookup::Unknown;
        };

        if name == "default" {
            // star re-exports never carry a default
            return match (shape.native_esm, &shape.default) {
                (true, DefaultProvenance::Absent) => Lookup::Missing,
                _ => Lookup::Found,
            };
        }
        if shape.binding(name).is_some() {
            return Lookup::Found;
        }
        if matches!(shape.tag, ShapeTag::DynamicConditional | ShapeTag::NonObjectDefault) {
            return Lookup::Unresolvable;
        }
        let follows = shape.native_esm || matches!(shape.tag, ShapeTag::ReExportAll | ShapeTag::ReExportDefaultAggregate);
        if !follows {
            return Lookup::Missing;
        }

        trail.push(producer.clone());
        let mut result = Lookup::Missing;
        for source in &shape.reexport_sources {
            let outcome = match self.graph.resolve(producer, source) {
                Resolved::Module(target) => self.lookup(target.id(), name, trail),
                _ => Lookup::Unknown,
            };
            match outcome {
                Lookup::Found | Lookup::Cycle(_) => {
                    result = outcome;
                    break;
                }
                Lookup::Unknown => result = Lookup::Unknown,
                Lookup::Unresolvable if result == Lookup::Missing => result = Lookup::Unresolvable,
                _ => {}
            }
        }
        trail.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ModuleGraph;

    fn options() -> AnalyzerOptions {
        AnalyzerOptions {
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_records_and_builtins() {
        let graph = ModuleGraph::builder()
            .module("./lib", "exports.a = 1;", ModuleKind::CommonJs)
            .module(
                "./main",
                "const fs = require('fs'); const { a } = require('./lib'); const x = require('./missing');",
                ModuleKind::CommonJs,
            )
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.records.len(), 1);
        assert_eq!(resolution.records[0].kind, BindingKind::Named("a".into()));
        assert_eq!(resolution.records[0].producer.as_str(), "./lib");
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::UnresolvedSpecifier);
        assert_eq!(resolution.diagnostics[0].line, Some(1));
    }

    #[test]
    fn test_named_import_of_dynamic_export_is_link_error() {
        let graph = ModuleGraph::builder()
            .module("./dyn", "if (flag) exports.foo = 1;", ModuleKind::CommonJs)
            .module("./main.mjs", "import { foo } from './dyn';", ModuleKind::Esm)
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::UnresolvableNamedImport);
        assert!(resolution.has_errors());
    }

    #[test]
    fn test_named_import_through_reexport() {
        let graph = ModuleGraph::builder()
            .module("./impl", "exports.deep = 1;", ModuleKind::CommonJs)
            .module("./index", "module.exports = require('./impl');", ModuleKind::CommonJs)
            .module("./main.mjs", "import { deep } from './index';", ModuleKind::Esm)
            .build();
        let resolution = resolve(&graph, &options());
        assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn test_reexport_cycle() {
        let graph = ModuleGraph::builder()
            .module("./a", "module.exports = require('./b');", ModuleKind::CommonJs)
            .module("./b", "module.exports = require('./a');", ModuleKind::CommonJs)
            .module("./main.mjs", "import { x } from './a';", ModuleKind::Esm)
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.cycles, vec![vec![ModuleId::new("./a"), ModuleId::new("./b")]]);
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::ReExportCycle);
    }

    #[test]
    fn test_unknown_kind() {
        let graph = ModuleGraph::builder()
            .module("./u", "exports.a = 1;", ModuleKind::Unknown)
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::UnknownModuleKind);

        if let Some(module) = graph.get("./u") {
            module.clear_shape();
        }
        let assumed = AnalyzerOptions {
            assume_unknown_as: Some(ModuleKind::CommonJs),
            ..options()
        };
        let resolution = resolve(&graph, &assumed);
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.shape("./u").map(|s| s.tag), Some(ShapeTag::NamedOnly));
    }

    #[test]
    fn test_missing_edge_target() {
        let graph = ModuleGraph::builder()
            .module("./main", "require('./x').y;", ModuleKind::CommonJs)
            .edge("./main", "./x", Some("./x.js"))
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::UnknownModule);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let graph = ModuleGraph::builder()
            .module("./bad", "exports.a = ;", ModuleKind::CommonJs)
            .build();
        let resolution = resolve(&graph, &options());
        assert_eq!(resolution.diagnostics[0].code, DiagnosticCode::SyntaxError);
        assert_eq!(resolution.diagnostics[0].line, Some(1));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut builder = ModuleGraph::builder();
        for i in 0..16 {
            let source = format!("exports.v{i} = {i}; const next = require('./m{}');", i + 1);
            builder = builder.module(format!("./m{i}"), source, ModuleKind::CommonJs);
        }
        for i in 0..8 {
            let source = format!("import {{ v{i}, missing{i} }} from './m{i}';\nimport * as ns from './m{}';\n", i + 1);
            builder = builder.module(format!("./c{i}.mjs"), source, ModuleKind::Esm);
        }
        let graph = builder.build();
        let sequential = resolve(&graph, &options());
        let parallel = resolve(
            &graph,
            &AnalyzerOptions {
                parallel: true,
                ..options()
            },
        );
        assert!(sequential.records.iter().any(|r| r.consumer.as_str() == "./c7.mjs"));
        assert!(sequential.has_errors());
        assert_eq!(sequential.records, parallel.records);
        assert_eq!(sequential.diagnostics, parallel.diagnostics);
    }
}
