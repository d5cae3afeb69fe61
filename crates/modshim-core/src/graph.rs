// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module graph handed to the analyzer by its host.
//!
//! The host does resolution: it names every module, supplies its source
//! text and kind, and records which module each specifier refers to. The
//! analyzer never touches the filesystem.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use modshim_syntax::LineIndex;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::InteropError;
use crate::shape::ExportShapeDescriptor;

/// Node.js built-in modules. Specifiers naming these are never part of
/// the graph.
pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Check if a specifier names a built-in module (`fs`, `node:fs`).
pub fn is_builtin(specifier: &str) -> bool {
    let name = specifier.strip_prefix("node:").unwrap_or(specifier);
    BUILTIN_MODULES.contains(&name)
}

/// Identity of a module in the graph. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    /// Creates an id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Serialize for ModuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Module system a module is written for, as classified by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// CommonJS (`require` / `module.exports`)
    CommonJs,
    /// ECMAScript module (`import` / `export`)
    Esm,
    /// Not classified
    Unknown,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::CommonJs => write!(f, "commonjs"),
            ModuleKind::Esm => write!(f, "esm"),
            ModuleKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of export-shape inference, cached per module.
pub type ShapeOutcome = Result<ExportShapeDescriptor, InteropError>;

/// One module of the graph.
pub struct Module {
    id: ModuleId,
    source: Arc<str>,
    kind: ModuleKind,
    line_index: LineIndex,
    shape: RwLock<Option<Arc<ShapeOutcome>>>,
}

impl Module {
    /// Creates a module.
    pub fn new(id: impl Into<ModuleId>, source: impl Into<Arc<str>>, kind: ModuleKind) -> Self {
        let source = source.into();
        Self {
            id: id.into(),
            line_index: LineIndex::new(&source),
            source,
            kind,
            shape: RwLock::new(None),
        }
    }

    /// The module's id.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// The module's source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The kind the host classified this module as.
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Line index over the source text.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// The cached shape, if inference already ran.
    pub fn shape(&self) -> Option<Arc<ShapeOutcome>> {
        self.shape.read().clone()
    }

    /// Caches an inference outcome. The first outcome stored wins, so a
    /// module's shape never changes once observed.
    pub fn cache_shape(&self, outcome: ShapeOutcome) -> Arc<ShapeOutcome> {
        let mut slot = self.shape.write();
        match &*slot {
            Some(existing) => existing.clone(),
            None => {
                let outcome = Arc::new(outcome);
                *slot = Some(outcome.clone());
                outcome
            }
        }
    }

    /// Drops the cached shape.
    pub fn clear_shape(&self) {
        *self.shape.write() = None;
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("len", &self.source.len())
            .finish()
    }
}

/// Where a specifier leads.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'g> {
    /// A module in the graph
    Module(&'g Arc<Module>),
    /// A built-in or a module the host marked as outside the graph
    External,
    /// The host recorded an edge to an id the graph does not contain
    Missing,
    /// Nothing is known about this specifier
    Unresolved,
}

/// Immutable set of modules and their resolved edges.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Arc<Module>>,
    index: FxHashMap<ModuleId, usize>,
    edges: FxHashMap<(ModuleId, String), Option<ModuleId>>,
}

impl ModuleGraph {
    /// Starts building a graph.
    pub fn builder() -> ModuleGraphBuilder {
        ModuleGraphBuilder::default()
    }

    /// Looks a module up by id.
    pub fn get(&self, id: &str) -> Option<&Arc<Module>> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    /// Modules in insertion order.
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if the graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolves `specifier` as written in module `from`.
    ///
    /// A recorded edge wins. Otherwise built-ins are external, and a
    /// specifier equal to a module id refers to that module.
    pub fn resolve(&self, from: &ModuleId, specifier: &str) -> Resolved<'_> {
        if let Some(target) = self.edges.get(&(from.clone(), specifier.to_string())) {
            return match target {
                Some(id) => self.get(id.as_str()).map_or(Resolved::Missing, Resolved::Module),
                None => Resolved::External,
            };
        }
        if is_builtin(specifier) {
            return Resolved::External;
        }
        self.get(specifier).map_or(Resolved::Unresolved, Resolved::Module)
    }
}

/// Builder for [`ModuleGraph`].
#[derive(Debug, Default)]
pub struct ModuleGraphBuilder {
    graph: ModuleGraph,
}

impl ModuleGraphBuilder {
    /// Adds a module. A later module with the same id replaces the earlier
    /// one in place.
    pub fn module(mut self, id: impl Into<ModuleId>, source: impl Into<Arc<str>>, kind: ModuleKind) -> Self {
        let module = Arc::new(Module::new(id, source, kind));
        let id = module.id().clone();
        match self.graph.index.get(&id) {
            Some(&i) => {
                tracing::warn!(module = %id, "Module added twice, replacing");
                self.graph.modules[i] = module;
            }
            None => {
                self.graph.index.insert(id, self.graph.modules.len());
                self.graph.modules.push(module);
            }
        }
        self
    }

    /// Records that `specifier` in module `from` resolves to `to`. `None`
    /// marks the target as outside the graph.
    pub fn edge(mut self, from: impl Into<ModuleId>, specifier: impl Into<String>, to: Option<&str>) -> Self {
        self.graph
            .edges
            .insert((from.into(), specifier.into()), to.map(ModuleId::new));
        self
    }

    /// Finishes the graph.
    pub fn build(self) -> ModuleGraph {
        tracing::debug!(
            modules = self.graph.modules.len(),
            edges = self.graph.edges.len(),
            "Built module graph"
        );
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> ModuleGraph {
        ModuleGraph::builder()
            .module("./a.js", "exports.a = 1;", ModuleKind::CommonJs)
            .module("./b.mjs", "export const b = 1;", ModuleKind::Esm)
            .edge("./b.mjs", "./a", Some("./a.js"))
            .edge("./b.mjs", "left-pad", None)
            .edge("./b.mjs", "./gone", Some("./gone.js"))
            .build()
    }

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("fs"));
        assert!(is_builtin("node:path"));
        assert!(is_builtin("fs/promises"));
        assert!(!is_builtin("lodash"));
        assert!(!is_builtin("./fs"));
    }

    #[test]
    fn test_resolve() {
        let graph = graph();
        let from = ModuleId::new("./b.mjs");
        assert!(matches!(graph.resolve(&from, "./a"), Resolved::Module(m) if m.id().as_str() == "./a.js"));
        assert!(matches!(graph.resolve(&from, "./a.js"), Resolved::Module(_)));
        assert!(matches!(graph.resolve(&from, "left-pad"), Resolved::External));
        assert!(matches!(graph.resolve(&from, "node:fs"), Resolved::External));
        assert!(matches!(graph.resolve(&from, "./gone"), Resolved::Missing));
        assert!(matches!(graph.resolve(&from, "./nowhere"), Resolved::Unresolved));
    }

    #[test]
    fn test_duplicate_module_replaces() {
        let graph = ModuleGraph::builder()
            .module("./a.js", "exports.a = 1;", ModuleKind::CommonJs)
            .module("./a.js", "export const a = 1;", ModuleKind::Esm)
            .build();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("./a.js").map(|m| m.kind()), Some(ModuleKind::Esm));
    }

    #[test]
    fn test_shape_cache_first_wins() {
        let module = Module::new("./a.js", "", ModuleKind::CommonJs);
        assert!(module.shape().is_none());
        let first = module.cache_shape(Err(InteropError::UnknownModule("x".into())));
        let second = module.cache_shape(Err(InteropError::UnknownModule("y".into())));
        assert!(Arc::ptr_eq(&first, &second));
        module.clear_shape();
        assert!(module.shape().is_none());
    }
}
