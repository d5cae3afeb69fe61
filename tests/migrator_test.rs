//! Whole-graph migration through the public `modshim` API.

use std::fs;

use modshim::{
    AnalyzerOptions, Config, DiagnosticCode, Migrator, ModuleGraph, ModuleKind, PlanStatus, Severity, ShapeTag,
    Verdict,
};
use modshim_macros::{assert_contains, assert_diagnostic, assert_no_diagnostic};
use tempfile::TempDir;

fn sequential() -> AnalyzerOptions {
    AnalyzerOptions {
        parallel: false,
        ..Default::default()
    }
}

const APP: &str = "import { run } from './src/index.js';\nimport util from './src/util.js';\nrun(util.VERSION);\n";

fn project() -> ModuleGraph {
    ModuleGraph::builder()
        .module(
            "./src/util.js",
            "'use strict';\nexports.slug = (s) => s.toLowerCase();\nexports.VERSION = '2.1.0';\n",
            ModuleKind::CommonJs,
        )
        .module(
            "./src/logger.js",
            "module.exports = function logger(msg) { console.log(msg); };\n",
            ModuleKind::CommonJs,
        )
        .module(
            "./src/index.js",
            "const path = require('path');\nconst { slug } = require('./util.js');\nconst logger = require('./logger.js');\nexports.run = (name) => logger(path.join(__dirname, slug(name)));\n",
            ModuleKind::CommonJs,
        )
        .module("./app.mjs", APP, ModuleKind::Esm)
        .edge("./src/index.js", "./util.js", Some("./src/util.js"))
        .edge("./src/index.js", "./logger.js", Some("./src/logger.js"))
        .build()
}

#[test]
fn test_project_migrates_safely() {
    let report = Migrator::new(sequential()).run(&project());
    assert_eq!(report.verdict, Verdict::Safe, "{:#?}", report.all_diagnostics().collect::<Vec<_>>());
    assert_eq!(report.modules.len(), 4);

    let util = report.module("./src/util.js").expect("util report");
    assert_eq!(util.tag, Some(ShapeTag::NamedOnly));
    let output = util.output.as_deref().expect("util emitted");
    assert!(!output.contains("use strict"), "{}", output);
    assert_contains!(output, "export { slug, VERSION };");

    let logger = report.module("./src/logger.js").expect("logger report");
    assert_eq!(logger.tag, Some(ShapeTag::NonObjectDefault));
    let output = logger.output.as_deref().expect("logger emitted");
    assert_contains!(output, "export { logger as 'module.exports' };");

    let index = report.module("./src/index.js").expect("index report");
    let output = index.output.as_deref().expect("index emitted");
    assert_contains!(output, "import path from 'path';");
    assert_contains!(output, "import { slug } from './util.js';");
    assert_contains!(output, "import logger from './logger.js';");
    assert_contains!(output, "const __dirname = dirname(fileURLToPath(import.meta.url));");

    let app = report.module("./app.mjs").expect("app report");
    assert_eq!(app.output.as_deref(), Some(APP));
    assert!(!app.needs_manual_migration());
}

#[test]
fn test_info_diagnostics_are_opt_in() {
    let quiet = Migrator::new(sequential()).run(&project());
    assert!(quiet.all_diagnostics().all(|d| d.severity != Severity::Info));

    let options = AnalyzerOptions {
        emit_info: true,
        ..sequential()
    };
    let verbose = Migrator::new(options).run(&project());
    let util = verbose.module("./src/util.js").unwrap();
    assert_diagnostic!(util.diagnostics, DiagnosticCode::BindingPreserved);
}

#[test]
fn test_breaking_consumer_fails_the_verdict() {
    let graph = ModuleGraph::builder()
        .module("./dyn.js", "function setup(mode) { if (mode) exports.fast = true; }", ModuleKind::CommonJs)
        .module("./main.mjs", "import { fast } from './dyn.js';\nconsole.log(fast);\n", ModuleKind::Esm)
        .build();
    let report = Migrator::new(sequential()).run(&graph);
    assert_eq!(report.verdict, Verdict::Unsafe);
    assert_diagnostic!(report.diagnostics, DiagnosticCode::UnresolvableNamedImport);
    let link = report
        .diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::UnresolvableNamedImport)
        .unwrap();
    assert_eq!(link.line, Some(1));
}

#[test]
fn test_ambiguous_module_needs_manual_migration() {
    let graph = ModuleGraph::builder()
        .module(
            "./index.js",
            "module.exports = require('./a.js');\nmodule.exports.b = require('./b.js');\n",
            ModuleKind::CommonJs,
        )
        .module("./a.js", "exports.x = 1;", ModuleKind::CommonJs)
        .module("./b.js", "exports.y = 2;", ModuleKind::CommonJs)
        .build();
    let report = Migrator::new(sequential()).run(&graph);
    let index = report.module("./index.js").unwrap();
    assert!(index.needs_manual_migration());
    assert_eq!(index.plan.as_ref().map(|p| p.status), Some(PlanStatus::ManualMigrationRequired));
    assert_diagnostic!(index.diagnostics, DiagnosticCode::AmbiguousDefaultReExport);
}

#[test]
fn test_unknown_kind_follows_configuration() {
    let graph = || {
        ModuleGraph::builder()
            .module("./legacy.js", "exports.a = 1;", ModuleKind::Unknown)
            .build()
    };

    let report = Migrator::new(sequential()).run(&graph());
    assert_diagnostic!(report.diagnostics, DiagnosticCode::UnknownModuleKind);
    assert!(report.module("./legacy.js").unwrap().output.is_none());

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("modshim.toml"),
        "[analyzer]\nparallel = false\nassume_unknown_as = \"commonjs\"\n",
    )
    .unwrap();
    let config = Config::load_from(None, dir.path(), Vec::new()).unwrap();
    let report = Migrator::new(config.analyzer).run(&graph());
    assert_no_diagnostic!(report.diagnostics, DiagnosticCode::UnknownModuleKind);
    let legacy = report.module("./legacy.js").unwrap();
    assert_contains!(legacy.output.as_deref().unwrap(), "export { a };");
}

#[test]
fn test_parallel_run_matches_sequential() {
    let sequential_report = Migrator::new(sequential()).run(&project());
    let parallel_report = Migrator::new(AnalyzerOptions::default()).run(&project());
    let outputs = |report: &modshim::MigrationReport| {
        report
            .modules
            .iter()
            .map(|m| (m.id.to_string(), m.output.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(outputs(&sequential_report), outputs(&parallel_report));
    assert_eq!(sequential_report.verdict, parallel_report.verdict);
}

#[test]
fn test_report_serializes() {
    let report = Migrator::new(sequential()).run(&project());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["verdict"], "safe");
    assert_eq!(json["modules"][0]["id"], "./src/util.js");
    assert_eq!(json["modules"][0]["kind"], "commonjs");
}
