// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compatibility synthesis.
//!
//! Turns an inferred export shape into the ESM export set that replaces it,
//! plus the shims existing consumers need to keep observing the same
//! values. Synthesis is a pure function of the shape and the consumer
//! bindings recorded against the module.

use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::error::InteropError;
use crate::graph::ModuleId;
use crate::imports::{BindingKind, ConsumerSyntax};
use crate::options::AnalyzerOptions;
use crate::resolver::ConsumerBindingRecord;
use crate::shape::{DefaultProvenance, ExportShapeDescriptor, ShapeTag, ValueProvenance};

/// Whether a plan can be applied as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// The rewrite preserves the module's exports
    Ready,
    /// The module is already ESM
    NoOp,
    /// The rewrite needs a decision only a person can make
    ManualMigrationRequired,
}

/// One `export` binding of the rewritten module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedExport {
    /// Exported name
    pub name: String,
    /// Value it carries
    pub provenance: ValueProvenance,
    /// Declared with `let` before any assignment, so it starts out
    /// `undefined`
    pub pre_declared: bool,
}

/// An `export ... from` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReExportDirective {
    /// `export * from 'source'`
    All {
        /// Module specifier
        source: String,
    },
    /// `export { imported as exported } from 'source'`
    Named {
        /// Module specifier
        source: String,
        /// Name in the source module
        imported: String,
        /// Name in this module
        exported: String,
    },
}

impl ReExportDirective {
    /// The exported name, for named directives.
    pub fn exported(&self) -> Option<&str> {
        match self {
            ReExportDirective::Named { exported, .. } => Some(exported),
            ReExportDirective::All { .. } => None,
        }
    }
}

/// An export added only to keep pre-migration consumers working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shim {
    /// A default export aggregating the named exports
    SynthesizedDefault {
        /// Members re-read the current binding values
        live: bool,
    },
    /// `export { value as 'module.exports' }`
    ModuleExportsOverride,
    /// Bindings declared before their conditional assignment
    PreDeclaredBindings {
        /// Binding names
        names: Vec<String>,
    },
    /// Functions that populate exports, exported by name
    ExportedInitializers {
        /// Function names
        names: Vec<String>,
    },
    /// `export { default } from 'source'`
    DefaultReExport {
        /// Module specifier
        source: String,
    },
}

/// The ESM rewrite of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityPlan {
    /// The module rewritten
    pub module: ModuleId,
    /// Shape the plan was derived from
    pub tag: ShapeTag,
    /// Whether the plan can be applied
    pub status: PlanStatus,
    /// Local exports, in order
    pub exports: Vec<PlannedExport>,
    /// The default export, if any
    pub default: Option<ValueProvenance>,
    /// The `'module.exports'` export, if any
    pub module_exports_override: Option<ValueProvenance>,
    /// `export ... from` directives
    pub reexports: Vec<ReExportDirective>,
    /// Compatibility shims included
    pub shims: Vec<Shim>,
    /// Findings made while synthesizing
    pub diagnostics: Vec<Diagnostic>,
}

impl CompatibilityPlan {
    fn new(module: ModuleId, tag: ShapeTag) -> Self {
        Self {
            module,
            tag,
            status: PlanStatus::Ready,
            exports: Vec::new(),
            default: None,
            module_exports_override: None,
            reexports: Vec::new(),
            shims: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Looks up a local export.
    pub fn export(&self, name: &str) -> Option<&PlannedExport> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Every name the rewritten module exports statically, excluding
    /// `default` and anything only reachable through `export *`.
    pub fn export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.iter().map(|e| e.name.clone()).collect();
        for directive in &self.reexports {
            if let Some(exported) = directive.exported() {
                if !names.iter().any(|n| n == exported) {
                    names.push(exported.to_string());
                }
            }
        }
        names
    }

    /// Keys of the synthesized default object, when the default is one.
    pub fn default_keys(&self) -> Option<&[String]> {
        match &self.default {
            Some(ValueProvenance::Aggregate { names } | ValueProvenance::LiveAggregate { names }) => Some(names.as_slice()),
            _ => None,
        }
    }

    /// The value `import { name }` observes after migration, or `None`
    /// if the name is not exported.
    pub fn named_value(&self, name: &str) -> Option<ValueProvenance> {
        if name == "default" {
            return self.default.clone();
        }
        if let Some(export) = self.export(name) {
            return Some(export.provenance.clone());
        }
        let mut star = None;
        for directive in &self.reexports {
            match directive {
                ReExportDirective::Named {
                    source,
                    imported,
                    exported,
                } if exported == name => {
                    return Some(ValueProvenance::reexport(source, imported));
                }
                ReExportDirective::All { source } if star.is_none() => {
                    star = Some(ValueProvenance::reexport(source, name));
                }
                _ => {}
            }
        }
        star
    }

    /// Returns true if the plan changes nothing.
    pub fn is_noop(&self) -> bool {
        self.status == PlanStatus::NoOp
    }
}

/// Synthesizes the ESM rewrite of `module` from its shape and the bindings
/// its consumers take.
pub fn synthesize(
    module: &ModuleId,
    shape: &ExportShapeDescriptor,
    records: &[ConsumerBindingRecord],
    options: &AnalyzerOptions,
) -> CompatibilityPlan {
    let mut plan = CompatibilityPlan::new(module.clone(), shape.tag);

    if shape.native_esm {
        mirror_esm(&mut plan, shape);
        return plan;
    }

    match shape.tag {
        ShapeTag::NamedOnly | ShapeTag::ObjectLiteralNamed => {
            plan.exports = local_exports(shape);
            plan.default = Some(ValueProvenance::Aggregate {
                names: shape.named_names(),
            });
            plan.shims.push(Shim::SynthesizedDefault { live: false });
        }
        ShapeTag::NonObjectDefault => {
            let DefaultProvenance::Explicit(value) = &shape.default else {
                plan.status = PlanStatus::ManualMigrationRequired;
                return plan;
            };
            plan.default = Some(value.clone());
            let whole_value_consumer = records
                .iter()
                .any(|r| r.kind == BindingKind::DynamicRequireWhole || r.syntax == ConsumerSyntax::Require);
            if whole_value_consumer {
                plan.module_exports_override = Some(value.clone());
                plan.shims.push(Shim::ModuleExportsOverride);
            }
        }
        ShapeTag::DynamicConditional => dynamic(&mut plan, shape, options),
        ShapeTag::ReExportAll => {
            plan.exports = local_exports(shape);
            for source in &shape.reexport_sources {
                plan.reexports.push(ReExportDirective::All { source: source.clone() });
            }
            if let [source] = shape.reexport_sources.as_slice() {
                plan.reexports.push(ReExportDirective::Named {
                    source: source.clone(),
                    imported: "default".into(),
                    exported: "default".into(),
                });
                plan.default = Some(ValueProvenance::whole(source));
                plan.shims.push(Shim::DefaultReExport { source: source.clone() });
            }
        }
        ShapeTag::ReExportNamed => {
            for binding in &shape.named {
                match &binding.provenance {
                    ValueProvenance::ReExport { source, name } if name != "*" => {
                        plan.reexports.push(ReExportDirective::Named {
                            source: source.clone(),
                            imported: name.clone(),
                            exported: binding.name.clone(),
                        });
                    }
                    provenance => plan.exports.push(PlannedExport {
                        name: binding.name.clone(),
                        provenance: provenance.clone(),
                        pre_declared: false,
                    }),
                }
            }
            plan.default = Some(ValueProvenance::Aggregate {
                names: shape.named_names(),
            });
            plan.shims.push(Shim::SynthesizedDefault { live: false });
        }
        ShapeTag::ReExportDefaultAggregate => aggregate(&mut plan, shape),
    }

    if plan.status == PlanStatus::Ready {
        tracing::debug!(module = %module, tag = %shape.tag, exports = plan.exports.len(), "Synthesized plan");
    } else {
        tracing::warn!(module = %module, tag = %shape.tag, "Module needs manual migration");
    }
    plan
}

fn local_exports(shape: &ExportShapeDescriptor) -> Vec<PlannedExport> {
    shape
        .named
        .iter()
        .filter(|b| b.name != "default")
        .map(|b| PlannedExport {
            name: b.name.clone(),
            provenance: b.provenance.clone(),
            pre_declared: false,
        })
        .collect()
}

fn mirror_esm(plan: &mut CompatibilityPlan, shape: &ExportShapeDescriptor) {
    plan.status = PlanStatus::NoOp;
    for binding in &shape.named {
        if binding.name == "module.exports" {
            plan.module_exports_override = Some(binding.provenance.clone());
            continue;
        }
        match &binding.provenance {
            ValueProvenance::ReExport { source, name } => plan.reexports.push(ReExportDirective::Named {
                source: source.clone(),
                imported: name.clone(),
                exported: binding.name.clone(),
            }),
            provenance => plan.exports.push(PlannedExport {
                name: binding.name.clone(),
                provenance: provenance.clone(),
                pre_declared: false,
            }),
        }
    }
    for source in &shape.reexport_sources {
        plan.reexports.push(ReExportDirective::All { source: source.clone() });
    }
    if let DefaultProvenance::Explicit(value) = &shape.default {
        plan.default = Some(value.clone());
    }
}

fn dynamic(plan: &mut CompatibilityPlan, shape: &ExportShapeDescriptor, options: &AnalyzerOptions) {
    plan.exports = local_exports(shape);
    let conditional: Vec<String> = shape
        .conditional_names
        .iter()
        .filter(|name| name.as_str() != "default")
        .cloned()
        .collect();
    for name in &conditional {
        plan.exports.push(PlannedExport {
            name: name.clone(),
            provenance: ValueProvenance::Conditional { name: name.clone() },
            pre_declared: true,
        });
    }
    plan.shims.push(Shim::PreDeclaredBindings {
        names: conditional.clone(),
    });

    let initializers: Vec<String> = shape
        .initializers
        .iter()
        .filter(|name| plan.export(name).is_none())
        .cloned()
        .collect();
    for name in &initializers {
        plan.exports.push(PlannedExport {
            name: name.clone(),
            provenance: ValueProvenance::local(name),
            pre_declared: false,
        });
    }
    if !initializers.is_empty() {
        plan.shims.push(Shim::ExportedInitializers { names: initializers });
    }

    let names = shape.all_names();
    if options.live_default_bindings {
        plan.default = Some(ValueProvenance::LiveAggregate { names });
        plan.shims.push(Shim::SynthesizedDefault { live: true });
    } else {
        plan.default = Some(ValueProvenance::Aggregate { names });
        plan.shims.push(Shim::SynthesizedDefault { live: false });
        plan.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::FrozenDefault,
            "the default export is a snapshot taken at module evaluation; \
             bindings assigned later are not reflected in it",
        ));
    }

    let mut message = String::from(
        "presence/absence membership checks on this module's properties are not preserved; \
         all declared names are now always present",
    );
    if !conditional.is_empty() {
        message.push_str(&format!(" ({})", conditional.join(", ")));
    }
    plan.diagnostics
        .push(Diagnostic::warning(DiagnosticCode::ConditionalMembership, message));
}

fn aggregate(plan: &mut CompatibilityPlan, shape: &ExportShapeDescriptor) {
    for source in &shape.reexport_sources {
        plan.reexports.push(ReExportDirective::All { source: source.clone() });
    }
    for binding in &shape.named {
        match &binding.provenance {
            ValueProvenance::ReExport { source, name } => {
                let imported = if name == "*" { "default" } else { name.as_str() };
                plan.reexports.push(ReExportDirective::Named {
                    source: source.clone(),
                    imported: imported.to_string(),
                    exported: binding.name.clone(),
                });
            }
            provenance => plan.exports.push(PlannedExport {
                name: binding.name.clone(),
                provenance: provenance.clone(),
                pre_declared: false,
            }),
        }
    }

    if let [source] = shape.reexport_sources.as_slice() {
        plan.default = shape.whole_value();
        plan.shims.push(Shim::SynthesizedDefault { live: false });
        plan.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::FrozenDefault,
            format!(
                "default export is rebuilt as a copy of '{}' merged with this module's exports",
                source
            ),
        ));
        return;
    }

    let err = InteropError::Ambiguity {
        sources: shape.reexport_sources.clone(),
    };
    plan.diagnostics.push(Diagnostic::new(
        Severity::Warning,
        err.code(),
        format!("{}; choose the default export by hand", err),
    ));
    plan.status = PlanStatus::ManualMigrationRequired;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_commonjs;
    use modshim_syntax::{Span, parse_module, parse_script};

    fn plan_for(source: &str, records: &[ConsumerBindingRecord]) -> CompatibilityPlan {
        let program = parse_script(source).expect("parses");
        let shape = infer_commonjs(&program, source).expect("analyzable");
        synthesize(&ModuleId::new("./m"), &shape, records, &AnalyzerOptions::default())
    }

    fn record(kind: BindingKind, syntax: ConsumerSyntax) -> ConsumerBindingRecord {
        ConsumerBindingRecord {
            consumer: ModuleId::new("./main"),
            producer: ModuleId::new("./m"),
            specifier: "./m".into(),
            kind,
            syntax,
            probes: Vec::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_named_only_default_aggregates_names() {
        let plan = plan_for("exports.Foo = class {}; exports.bar = 'bar';", &[]);
        assert_eq!(plan.export_names(), vec!["Foo", "bar"]);
        assert_eq!(plan.default_keys(), Some(&["Foo".to_string(), "bar".to_string()][..]));
        assert_eq!(plan.status, PlanStatus::Ready);
        assert!(plan.module_exports_override.is_none());
    }

    #[test]
    fn test_function_default_override_only_with_whole_require() {
        let source = "module.exports = function qux() {};";
        let plan = plan_for(source, &[record(BindingKind::Default, ConsumerSyntax::EsmImport)]);
        assert_eq!(plan.default, Some(ValueProvenance::local("qux")));
        assert!(plan.module_exports_override.is_none());

        let plan = plan_for(source, &[record(BindingKind::DynamicRequireWhole, ConsumerSyntax::Require)]);
        assert_eq!(plan.module_exports_override, plan.default);
        assert!(plan.shims.contains(&Shim::ModuleExportsOverride));
    }

    #[test]
    fn test_dynamic_predeclares_every_name() {
        let source = "function initialize(which) { if (which === 'foo') exports.foo = 1; else exports.bar = 2; }";
        let plan = plan_for(source, &[]);
        assert_eq!(plan.export_names(), vec!["foo", "bar", "initialize"]);
        assert!(plan.export("foo").map(|e| e.pre_declared).unwrap_or(false));
        assert_eq!(
            plan.default,
            Some(ValueProvenance::LiveAggregate {
                names: vec!["foo".into(), "bar".into()]
            })
        );
        assert!(plan.diagnostics.iter().any(|d| d.code == DiagnosticCode::ConditionalMembership));
    }

    #[test]
    fn test_dynamic_frozen_default_warns() {
        let program = parse_script("if (x) exports.a = 1;").expect("parses");
        let shape = infer_commonjs(&program, "if (x) exports.a = 1;").expect("analyzable");
        let options = AnalyzerOptions {
            live_default_bindings: false,
            ..Default::default()
        };
        let plan = synthesize(&ModuleId::new("./m"), &shape, &[], &options);
        assert!(matches!(plan.default, Some(ValueProvenance::Aggregate { .. })));
        assert!(plan.diagnostics.iter().any(|d| d.code == DiagnosticCode::FrozenDefault));
    }

    #[test]
    fn test_single_reexport_forwards_default() {
        let plan = plan_for("module.exports = require('./impl');", &[]);
        assert_eq!(
            plan.reexports,
            vec![
                ReExportDirective::All { source: "./impl".into() },
                ReExportDirective::Named {
                    source: "./impl".into(),
                    imported: "default".into(),
                    exported: "default".into(),
                },
            ]
        );
        assert_eq!(plan.default, Some(ValueProvenance::whole("./impl")));
    }

    #[test]
    fn test_aggregate_is_ambiguous() {
        let plan = plan_for("module.exports = require('./a'); module.exports.b = require('./b');", &[]);
        assert_eq!(plan.status, PlanStatus::ManualMigrationRequired);
        assert!(plan.default.is_none());
        assert!(plan.reexports.contains(&ReExportDirective::All { source: "./a".into() }));
        assert!(plan.reexports.contains(&ReExportDirective::All { source: "./b".into() }));
        assert!(plan.diagnostics.iter().any(|d| d.code == DiagnosticCode::AmbiguousDefaultReExport));
    }

    #[test]
    fn test_single_source_aggregate_is_ready() {
        let plan = plan_for("module.exports = { ...require('./a'), c: 1 };", &[]);
        assert_eq!(plan.status, PlanStatus::Ready);
        assert_eq!(
            plan.default,
            Some(ValueProvenance::ReExportMany {
                sources: vec!["./a".into()]
            })
        );
        assert!(plan.reexports.contains(&ReExportDirective::All { source: "./a".into() }));
        assert_eq!(plan.export_names(), vec!["c"]);
        assert!(plan.diagnostics.iter().any(|d| d.code == DiagnosticCode::FrozenDefault));
        assert!(!plan.diagnostics.iter().any(|d| d.code == DiagnosticCode::AmbiguousDefaultReExport));
    }

    #[test]
    fn test_reexport_named() {
        let plan = plan_for("module.exports = { a: require('./x').a, b: require('./y').c };", &[]);
        assert_eq!(plan.named_value("b"), Some(ValueProvenance::reexport("./y", "c")));
        assert_eq!(plan.export_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_native_esm_is_noop() {
        let source = "export const a = 1; export default function main() {}";
        let program = parse_module(source).expect("parses");
        let shape = crate::infer::infer_esm(&program, source);
        let plan = synthesize(&ModuleId::new("./m.mjs"), &shape, &[], &AnalyzerOptions::default());
        assert!(plan.is_noop());
        assert!(plan.shims.is_empty());
        assert_eq!(plan.default, Some(ValueProvenance::local("main")));
    }
}
