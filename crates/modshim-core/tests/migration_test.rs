//! End-to-end tests over small module graphs: inference, resolution,
//! synthesis, checking and emission together.

use modshim_core::{
    AnalyzerOptions, CompatibilityPlan, Diagnostic, DiagnosticCode, ImportRewrites, ModuleGraph, ModuleId,
    ModuleKind, PlanStatus, ReExportDirective, Severity, ShapeTag, ValueProvenance, Verdict, check, emit, infer,
    resolve, synthesize, verdict,
};
use modshim_macros::{assert_diagnostic, assert_no_diagnostic, assert_no_errors, assert_ok, names};
use modshim_syntax::parse_module;

struct Migrated {
    plan: CompatibilityPlan,
    output: String,
    diagnostics: Vec<Diagnostic>,
}

fn options() -> AnalyzerOptions {
    AnalyzerOptions {
        parallel: false,
        ..Default::default()
    }
}

fn migrate(graph: &ModuleGraph, id: &str) -> Migrated {
    let options = options();
    let resolution = resolve(graph, &options);
    let analyzed = resolution.module(id).expect("module in graph");
    let shape = analyzed.descriptor().expect("shape inferred");
    let records = resolution.records_for(analyzed.module.id());
    let plan = synthesize(analyzed.module.id(), shape, &records, &options);

    let mut diagnostics = resolution.diagnostics.clone();
    diagnostics.extend(plan.diagnostics.iter().cloned());
    diagnostics.extend(check(shape, &plan, &records));

    let program = analyzed.program.as_ref().expect("parsed");
    let output = assert_ok!(emit(&analyzed.module, program, shape, &plan, &ImportRewrites::new(), &options));
    Migrated {
        plan,
        output,
        diagnostics,
    }
}

fn single(source: &str) -> Migrated {
    let graph = ModuleGraph::builder().module("./m", source, ModuleKind::CommonJs).build();
    migrate(&graph, "./m")
}

/// Runs the emitted text back through inference and synthesis.
fn remigrate(output: &str) -> CompatibilityPlan {
    let program = parse_module(output).expect("emitted text parses as a module");
    let shape = assert_ok!(infer(&program, output));
    synthesize(&ModuleId::new("./m"), &shape, &[], &options())
}

#[test]
fn test_named_exports_scenario() {
    let migrated = single("exports.Foo = class {}; exports.bar = 'bar';");
    assert_eq!(migrated.plan.tag, ShapeTag::NamedOnly);
    assert_eq!(migrated.plan.export_names(), names!["Foo", "bar"]);
    assert_eq!(
        migrated.plan.default,
        Some(ValueProvenance::Aggregate {
            names: names!["Foo", "bar"]
        })
    );
    assert_eq!(
        migrated.output,
        "const Foo = class {}; const bar = 'bar';\nexport { Foo, bar };\nexport default { Foo, bar };\n"
    );
}

#[test]
fn test_default_keys_equal_named_exports() {
    for source in [
        "exports.a = 1; exports.b = 2;",
        "module.exports = { a: 1, b() {}, c };",
        "module.exports.x = 1; exports.y = module.exports.x;",
    ] {
        let migrated = single(source);
        let mut keys = migrated.plan.default_keys().expect("aggregate default").to_vec();
        let mut named = migrated.plan.export_names();
        keys.sort();
        named.sort();
        assert_eq!(keys, named, "{}", source);
    }
}

#[test]
fn test_function_default_scenario() {
    let graph = ModuleGraph::builder()
        .module("./qux", "module.exports = function qux() {};", ModuleKind::CommonJs)
        .module("./main", "const qux = require('./qux');\nqux();\n", ModuleKind::CommonJs)
        .build();
    let migrated = migrate(&graph, "./qux");
    assert_eq!(migrated.plan.tag, ShapeTag::NonObjectDefault);
    assert_eq!(migrated.plan.module_exports_override, migrated.plan.default);
    assert_eq!(
        migrated.output,
        "function qux() {};\nexport default qux;\nexport { qux as 'module.exports' };\n"
    );
    assert_no_errors!(migrated.diagnostics, Severity::Error);
}

#[test]
fn test_function_default_without_whole_consumers_has_no_override() {
    let graph = ModuleGraph::builder()
        .module("./qux", "module.exports = function qux() {};", ModuleKind::CommonJs)
        .module("./main.mjs", "import qux from './qux';\nqux();\n", ModuleKind::Esm)
        .build();
    let migrated = migrate(&graph, "./qux");
    assert!(migrated.plan.module_exports_override.is_none());
    assert!(!migrated.output.contains("'module.exports'"));
}

#[test]
fn test_ambiguous_aggregation_scenario() {
    let migrated = single("module.exports = require('./a'); module.exports.b = require('./b');");
    assert_eq!(migrated.plan.tag, ShapeTag::ReExportDefaultAggregate);
    assert_eq!(migrated.plan.status, PlanStatus::ManualMigrationRequired);
    assert_diagnostic!(migrated.diagnostics, DiagnosticCode::AmbiguousDefaultReExport);
    assert!(migrated.plan.reexports.contains(&ReExportDirective::All { source: "./a".into() }));
    assert!(migrated.plan.reexports.contains(&ReExportDirective::All { source: "./b".into() }));
    assert!(migrated.output.contains("export * from './a';\n"), "{}", migrated.output);
    assert!(migrated.output.contains("export * from './b';\n"), "{}", migrated.output);
    assert!(!migrated.output.contains("export default"), "{}", migrated.output);
}

#[test]
fn test_membership_probe_scenario() {
    let graph = ModuleGraph::builder()
        .module(
            "./dyn",
            "function initialize(which) {\n  if (which === 'foo') exports.foo = 1;\n}\n",
            ModuleKind::CommonJs,
        )
        .module(
            "./main.mjs",
            "import * as ns from './dyn';\nif ('foo' in ns) {}\nns.initialize('foo');\n",
            ModuleKind::Esm,
        )
        .build();
    let migrated = migrate(&graph, "./dyn");
    assert_eq!(migrated.plan.tag, ShapeTag::DynamicConditional);
    assert_diagnostic!(migrated.diagnostics, DiagnosticCode::ConditionalMembership);
    assert_diagnostic!(migrated.diagnostics, DiagnosticCode::MembershipChanged);
    assert_eq!(verdict(&migrated.diagnostics), Verdict::Unsafe);
    let probe = migrated
        .diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::MembershipChanged)
        .expect("probe diagnostic");
    assert_eq!(probe.module.as_ref().map(ModuleId::as_str), Some("./main.mjs"));
}

#[test]
fn test_dynamic_default_lists_every_branch_name() {
    let source = "function init(mode) {\n  if (mode) exports.fast = 1;\n  else exports.slow = 2;\n  try { exports.extra = load(); } catch (e) {}\n}\n";
    let migrated = single(source);
    let Some(ValueProvenance::LiveAggregate { names }) = &migrated.plan.default else {
        panic!("expected a live default, got {:?}", migrated.plan.default);
    };
    for name in ["fast", "slow", "extra"] {
        assert!(names.iter().any(|n| n == name), "{} missing from {:?}", name, names);
    }
}

#[test]
fn test_emitted_module_is_a_fixed_point() {
    for source in [
        "exports.Foo = class {}; exports.bar = 'bar';",
        "module.exports = { a: 1, b: 2 };",
        "module.exports = function qux() {};",
        "function initialize(which) { if (which) exports.foo = 1; }",
    ] {
        let migrated = single(source);
        let plan = remigrate(&migrated.output);
        assert!(plan.is_noop(), "{} -> {}", source, migrated.output);
        assert!(plan.shims.is_empty());
    }
}

#[test]
fn test_named_imports_check_clean() {
    let graph = ModuleGraph::builder()
        .module("./lib", "exports.parse = function () {};\nexports.VERSION = '1';\n", ModuleKind::CommonJs)
        .module(
            "./main.mjs",
            "import lib, { parse } from './lib';\nimport * as ns from './lib';\nparse(lib.VERSION, ns);\n",
            ModuleKind::Esm,
        )
        .build();
    let migrated = migrate(&graph, "./lib");
    assert_no_errors!(migrated.diagnostics, Severity::Error);
    assert_no_diagnostic!(migrated.diagnostics, DiagnosticCode::NamedMismatch);
    assert_eq!(verdict(&migrated.diagnostics), Verdict::Safe);
}
