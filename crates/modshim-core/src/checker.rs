// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Equivalence checking.
//!
//! Every recorded consumer binding is resolved twice: against the shape of
//! the module before migration and against the synthesized plan. The two
//! resolutions are compared by provenance. Any difference is an error, and
//! a migration is safe exactly when no errors are reported.

use std::fmt;

use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticCode, has_errors};
use crate::imports::{BindingKind, ConsumerSyntax};
use crate::resolver::ConsumerBindingRecord;
use crate::shape::{ExportShapeDescriptor, ShapeTag, ValueProvenance};
use crate::synth::CompatibilityPlan;

/// Overall outcome of a migration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Every recorded binding is preserved
    Safe,
    /// At least one binding changes or could not be checked
    Unsafe,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe => write!(f, "safe"),
            Verdict::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// Safe iff no diagnostic is an error.
pub fn verdict(diagnostics: &[Diagnostic]) -> Verdict {
    if has_errors(diagnostics) {
        Verdict::Unsafe
    } else {
        Verdict::Safe
    }
}

/// Checks every binding in `records` against the plan.
pub fn check(
    before: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    records: &[ConsumerBindingRecord],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for record in records {
        check_record(before, plan, record, &mut diagnostics);
        check_probes(before, plan, record, &mut diagnostics);
    }
    tracing::debug!(
        module = %plan.module,
        records = records.len(),
        errors = diagnostics.iter().filter(|d| d.is_error()).count(),
        "Checked consumer bindings"
    );
    diagnostics
}

fn check_record(
    before: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    record: &ConsumerBindingRecord,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (code, what) = match &record.kind {
        BindingKind::Default => (DiagnosticCode::DefaultMismatch, "default import".to_string()),
        BindingKind::Named(name) => (DiagnosticCode::NamedMismatch, format!("binding '{}'", name)),
        BindingKind::DynamicRequireWhole => (DiagnosticCode::WholeValueMismatch, "require() value".to_string()),
        BindingKind::Namespace => {
            check_namespace(before, plan, record, diagnostics);
            return;
        }
    };
    let expected = canonical(before_value(before, &record.kind));
    let actual = canonical(after_value(plan, record));
    let diag = if expected == actual {
        Diagnostic::info(
            DiagnosticCode::BindingPreserved,
            format!("{} of '{}' is preserved", what, record.specifier),
        )
    } else {
        Diagnostic::error(
            code,
            format!(
                "{} of '{}' changes: {} before migration, {} after",
                what,
                record.specifier,
                describe(expected.as_ref()),
                describe(actual.as_ref())
            ),
        )
    };
    diagnostics.push(located(diag, record));
}

fn check_namespace(
    before: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    record: &ConsumerBindingRecord,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut changed = Vec::new();
    if canonical(before.whole_value()) != canonical(plan.default.clone()) {
        changed.push("default".to_string());
    }
    for name in before.named_names() {
        if name == "default" {
            continue;
        }
        let expected = canonical(before_named(before, &name));
        let actual = canonical(plan.named_value(&name));
        if expected != actual {
            changed.push(name);
        }
    }
    let diag = if changed.is_empty() {
        Diagnostic::info(
            DiagnosticCode::BindingPreserved,
            format!("namespace of '{}' is preserved", record.specifier),
        )
    } else {
        Diagnostic::error(
            DiagnosticCode::NamespaceMismatch,
            format!(
                "namespace of '{}' changes in: {}",
                record.specifier,
                changed.join(", ")
            ),
        )
    };
    diagnostics.push(located(diag, record));
}

fn check_probes(
    before: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    record: &ConsumerBindingRecord,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if matches!(record.kind, BindingKind::Named(_)) {
        return;
    }
    for probe in &record.probes {
        let was = presence_before(before, probe);
        let now = presence_after(before, plan, record, probe);
        let change = match (was, now) {
            (Presence::Sometimes, Presence::Always) => "absent on some paths, now always present (possibly undefined)",
            (Presence::Never, Presence::Always) => "never present, now always present",
            (Presence::Always, Presence::Never) => "always present, now missing",
            _ => continue,
        };
        let diag = Diagnostic::error(
            DiagnosticCode::MembershipChanged,
            format!(
                "membership check for '{}' on '{}' changes: {}",
                probe, record.specifier, change
            ),
        );
        diagnostics.push(located(diag, record));
    }
}

fn located(diag: Diagnostic, record: &ConsumerBindingRecord) -> Diagnostic {
    diag.with_module(record.consumer.clone()).with_span(record.span)
}

/// What a binding observes before migration.
fn before_value(before: &ExportShapeDescriptor, kind: &BindingKind) -> Option<ValueProvenance> {
    match kind {
        BindingKind::Default | BindingKind::DynamicRequireWhole | BindingKind::Namespace => before.whole_value(),
        BindingKind::Named(name) => before_named(before, name),
    }
}

fn before_named(before: &ExportShapeDescriptor, name: &str) -> Option<ValueProvenance> {
    if before.native_esm && before.binding(name).is_none() {
        if name == "default" {
            return before.whole_value();
        }
        return before
            .reexport_sources
            .first()
            .map(|source| ValueProvenance::reexport(source, name));
    }
    before.member(name)
}

/// What a binding observes after migration.
fn after_value(plan: &CompatibilityPlan, record: &ConsumerBindingRecord) -> Option<ValueProvenance> {
    match &record.kind {
        BindingKind::Default => plan.default.clone(),
        BindingKind::Named(name) => match (&plan.module_exports_override, record.syntax) {
            (Some(value), ConsumerSyntax::Require) => Some(value.property(name)),
            _ => plan.named_value(name),
        },
        BindingKind::DynamicRequireWhole | BindingKind::Namespace => {
            plan.module_exports_override.clone().or_else(|| plan.default.clone())
        }
    }
}

/// Normalizes equivalent spellings: a property read off a module's whole
/// value is that module's named export.
fn canonical(value: Option<ValueProvenance>) -> Option<ValueProvenance> {
    value.map(|value| match value {
        ValueProvenance::Property { of, name } => match *of {
            ValueProvenance::ReExport { source, name: whole } if whole == "*" => {
                ValueProvenance::ReExport { source, name }
            }
            of => ValueProvenance::Property { of: Box::new(of), name },
        },
        value => value,
    })
}

fn describe(value: Option<&ValueProvenance>) -> String {
    match value {
        None => "missing".into(),
        Some(ValueProvenance::Local { name }) => format!("binding `{}`", name),
        Some(ValueProvenance::Expression { text }) => format!("`{}`", text),
        Some(ValueProvenance::Aggregate { names }) => format!("snapshot object {{ {} }}", names.join(", ")),
        Some(ValueProvenance::LiveAggregate { names }) => format!("live object {{ {} }}", names.join(", ")),
        Some(ValueProvenance::ReExport { source, name }) if name == "*" => format!("module '{}'", source),
        Some(ValueProvenance::ReExport { source, name }) => format!("'{}' from '{}'", name, source),
        Some(ValueProvenance::Namespace { source }) => format!("namespace of '{}'", source),
        Some(ValueProvenance::ReExportMany { sources }) => format!("merged exports of {}", sources.join(", ")),
        Some(ValueProvenance::Property { of, name }) => format!("property '{}' of {}", name, describe(Some(of))),
        Some(ValueProvenance::Conditional { name }) => format!("conditionally assigned '{}'", name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Always,
    Sometimes,
    Never,
    Unknown,
}

fn presence_before(before: &ExportShapeDescriptor, name: &str) -> Presence {
    if before.binding(name).is_some() {
        Presence::Always
    } else if before.is_conditional(name) {
        Presence::Sometimes
    } else if before.native_esm && before.reexport_sources.is_empty() {
        Presence::Never
    } else {
        match before.tag {
            ShapeTag::NamedOnly
            | ShapeTag::ObjectLiteralNamed
            | ShapeTag::DynamicConditional
            | ShapeTag::ReExportNamed => Presence::Never,
            _ => Presence::Unknown,
        }
    }
}

fn presence_after(
    before: &ExportShapeDescriptor,
    plan: &CompatibilityPlan,
    record: &ConsumerBindingRecord,
    name: &str,
) -> Presence {
    let probed = match record.kind {
        BindingKind::Namespace if record.syntax != ConsumerSyntax::Require => {
            return if plan.export(name).is_some() || plan.export_names().iter().any(|n| n == name) {
                Presence::Always
            } else if plan.reexports.iter().any(|d| d.exported().is_none()) {
                Presence::Unknown
            } else {
                Presence::Never
            };
        }
        _ => after_value(plan, record),
    };
    let aggregate = matches!(
        probed,
        Some(ValueProvenance::Aggregate { .. } | ValueProvenance::LiveAggregate { .. })
    );
    if !aggregate && canonical(probed.clone()) == canonical(before.whole_value()) {
        return presence_before(before, name);
    }
    match probed {
        Some(ValueProvenance::Aggregate { names } | ValueProvenance::LiveAggregate { names }) => {
            if names.iter().any(|n| n == name) {
                Presence::Always
            } else {
                Presence::Never
            }
        }
        _ => Presence::Unknown,
    }
}
