// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Whole-graph migration.
//!
//! Runs the analysis phases of `modshim-core` over a [`ModuleGraph`] and
//! collects per-module plans, rewritten sources and diagnostics into a
//! [`MigrationReport`].

use dashmap::DashMap;
use modshim_core::{
    AnalyzedModule, AnalyzerOptions, CompatibilityPlan, ConsumerBindingRecord, Diagnostic, ImportRewrites,
    ImportTarget, ModuleGraph, ModuleId, ModuleKind, PlanStatus, Resolution, Resolved, Severity, ShapeTag, Verdict,
    check, emit, resolve, synthesize, verdict,
};
use serde::Serialize;
use tracing::instrument;

/// Outcome for one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    /// The module
    pub id: ModuleId,
    /// Kind the module was analyzed as
    pub kind: ModuleKind,
    /// Inferred shape, if inference succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<ShapeTag>,
    /// Migration plan, if inference succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<CompatibilityPlan>,
    /// Rewritten source, if the module could be emitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Findings about this module: its own inference and plan, and checks of
    /// the bindings its consumers take from it
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleReport {
    /// Returns true if the module needs a human to finish its migration.
    pub fn needs_manual_migration(&self) -> bool {
        self.plan
            .as_ref()
            .is_none_or(|plan| plan.status == PlanStatus::ManualMigrationRequired)
    }
}

/// Outcome for a whole graph.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Per-module reports in graph order
    pub modules: Vec<ModuleReport>,
    /// Findings not tied to one producer: resolution and link diagnostics
    pub diagnostics: Vec<Diagnostic>,
    /// Safe iff no Error-severity diagnostic was raised anywhere
    pub verdict: Verdict,
}

impl MigrationReport {
    /// Looks up the report of one module.
    pub fn module(&self, id: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.id.as_str() == id)
    }

    /// Every diagnostic in the report.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.modules.iter().flat_map(|m| m.diagnostics.iter()))
    }
}

/// Runs migrations with fixed options.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    options: AnalyzerOptions,
}

impl Migrator {
    /// Creates a migrator.
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyzes, plans, checks and rewrites every module of `graph`.
    #[instrument(skip_all, fields(modules = graph.len()))]
    pub fn run(&self, graph: &ModuleGraph) -> MigrationReport {
        let resolution = resolve(graph, &self.options);

        let plans: DashMap<ModuleId, Planned> = DashMap::new();
        self.each(&resolution.modules, |analyzed| {
            if let Some(planned) = self.plan(graph, &resolution, analyzed) {
                plans.insert(analyzed.module.id().clone(), planned);
            }
        });

        let reports: DashMap<ModuleId, ModuleReport> = DashMap::new();
        self.each(&resolution.modules, |analyzed| {
            let report = self.report(graph, &plans, analyzed);
            reports.insert(report.id.clone(), report);
        });

        let modules: Vec<ModuleReport> = resolution
            .modules
            .iter()
            .filter_map(|analyzed| reports.remove(analyzed.module.id()).map(|(_, report)| report))
            .collect();
        let diagnostics = self.visible(resolution.diagnostics.clone());

        let mut all: Vec<Diagnostic> = diagnostics.clone();
        all.extend(modules.iter().flat_map(|m| m.diagnostics.iter().cloned()));
        let verdict = verdict(&all);
        tracing::info!(
            modules = modules.len(),
            errors = all.iter().filter(|d| d.is_error()).count(),
            %verdict,
            "Migration finished"
        );

        MigrationReport {
            modules,
            diagnostics,
            verdict,
        }
    }

    #[cfg(feature = "parallel")]
    fn each<F>(&self, modules: &[AnalyzedModule], f: F)
    where
        F: Fn(&AnalyzedModule) + Sync + Send,
    {
        use rayon::prelude::*;

        if self.options.parallel {
            modules.par_iter().for_each(f);
        } else {
            modules.iter().for_each(f);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn each<F>(&self, modules: &[AnalyzedModule], f: F)
    where
        F: Fn(&AnalyzedModule) + Sync + Send,
    {
        modules.iter().for_each(f);
    }

    /// Synthesizes and checks one producer.
    fn plan(&self, graph: &ModuleGraph, resolution: &Resolution, analyzed: &AnalyzedModule) -> Option<Planned> {
        let shape = analyzed.descriptor()?;
        let id = analyzed.module.id();
        let records = resolution.records_for(id);
        let plan = synthesize(id, shape, &records, &self.options);

        let mut diagnostics: Vec<Diagnostic> = plan
            .diagnostics
            .iter()
            .cloned()
            .map(|d| d.with_module(id.clone()))
            .collect();
        for mut diagnostic in check(shape, &plan, &records) {
            locate(graph, &mut diagnostic);
            diagnostics.push(diagnostic);
        }
        tracing::debug!(module = %id, records = records.len(), status = ?plan.status, "Planned module");
        Some(Planned {
            plan,
            records,
            diagnostics,
        })
    }

    fn report(&self, graph: &ModuleGraph, plans: &DashMap<ModuleId, Planned>, analyzed: &AnalyzedModule) -> ModuleReport {
        let id = analyzed.module.id().clone();
        let planned = plans.get(&id);
        let mut diagnostics = planned.as_ref().map(|p| p.diagnostics.clone()).unwrap_or_default();

        let output = match (&analyzed.program, analyzed.descriptor(), planned.as_ref()) {
            (Some(program), Some(shape), Some(planned)) => {
                let rewrites = import_rewrites(graph, plans, analyzed);
                match emit(&analyzed.module, program, shape, &planned.plan, &rewrites, &self.options) {
                    Ok(output) => Some(output),
                    Err(err) => {
                        let mut diagnostic = err.to_diagnostic(Severity::Error, &id);
                        diagnostic.locate(analyzed.module.line_index(), analyzed.module.source());
                        diagnostics.push(diagnostic);
                        None
                    }
                }
            }
            _ => None,
        };
        tracing::trace!(
            module = %id,
            consumers = planned.as_ref().map_or(0, |p| p.records.len()),
            emitted = output.is_some(),
            "Reported module"
        );

        ModuleReport {
            id,
            kind: analyzed.kind,
            tag: analyzed.descriptor().map(|shape| shape.tag),
            plan: planned.as_ref().map(|p| p.plan.clone()),
            output,
            diagnostics: self.visible(diagnostics),
        }
    }

    fn visible(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        if self.options.emit_info {
            return diagnostics;
        }
        diagnostics
            .into_iter()
            .filter(|d| d.severity != Severity::Info)
            .collect()
    }
}

/// A producer's plan with the records it was checked against.
#[derive(Debug)]
struct Planned {
    plan: CompatibilityPlan,
    records: Vec<ConsumerBindingRecord>,
    diagnostics: Vec<Diagnostic>,
}

/// Fills in line and column from the module the diagnostic points into.
fn locate(graph: &ModuleGraph, diagnostic: &mut Diagnostic) {
    let Some(module) = diagnostic.module.as_ref().and_then(|id| graph.get(id.as_str())) else {
        return;
    };
    diagnostic.locate(module.line_index(), module.source());
}

/// What each dependency of `analyzed` exports once the graph is migrated.
fn import_rewrites(graph: &ModuleGraph, plans: &DashMap<ModuleId, Planned>, analyzed: &AnalyzedModule) -> ImportRewrites {
    let mut rewrites = ImportRewrites::new();
    let id = analyzed.module.id();
    for consumer_use in &analyzed.scan.uses {
        let target = match graph.resolve(id, &consumer_use.specifier) {
            Resolved::External => ImportTarget::Builtin,
            Resolved::Module(producer) => match plans.get(producer.id()) {
                Some(planned) if planned.plan.status != PlanStatus::ManualMigrationRequired => {
                    ImportTarget::Names(planned.plan.export_names())
                }
                _ => ImportTarget::Opaque,
            },
            Resolved::Missing | Resolved::Unresolved => ImportTarget::Opaque,
        };
        rewrites.insert(consumer_use.specifier.clone(), target);
    }
    rewrites
}
