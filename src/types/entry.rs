//! Mapping entries: the unit of work of a pack build.
//!
//! An entry names a source artifact (a path or glob relative to its module
//! root), where it should land in the pack, how it is templated and what
//! happens when another entry already wrote the same output path.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::template::ScopeMap;

/// Where an entry's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Mirror the source path under the destination root.
    Auto,
    /// Basename only, directories discarded.
    AutoFlat,
    /// Immediate parent directory name plus basename.
    AutoFlatSubfolder,
    /// An explicit pack-relative path (may contain placeholders).
    Explicit(String),
}

impl TargetSpec {
    /// Parse a declared target string.
    ///
    /// Uppercase tokens are reserved for conventions; an unknown one is an
    /// error rather than a literal file called `AUTO_FLATT`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AUTO" => Ok(TargetSpec::Auto),
            "AUTO_FLAT" => Ok(TargetSpec::AutoFlat),
            "AUTO_FLAT_SUBFOLDER" => Ok(TargetSpec::AutoFlatSubfolder),
            _ if is_convention_token(s) => Err(PackError::PathResolution {
                source_path: s.to_string(),
                message: format!("unknown target convention '{}'", s),
                help: Some("Use AUTO, AUTO_FLAT, AUTO_FLAT_SUBFOLDER or an explicit path".to_string()),
            }),
            _ if s.trim().is_empty() => Err(PackError::PathResolution {
                source_path: s.to_string(),
                message: "target is empty".to_string(),
                help: None,
            }),
            _ => Ok(TargetSpec::Explicit(s.to_string())),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, TargetSpec::Explicit(_))
    }
}

fn is_convention_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_uppercase())
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Auto => write!(f, "AUTO"),
            TargetSpec::AutoFlat => write!(f, "AUTO_FLAT"),
            TargetSpec::AutoFlatSubfolder => write!(f, "AUTO_FLAT_SUBFOLDER"),
            TargetSpec::Explicit(path) => write!(f, "{}", path),
        }
    }
}

/// What to do when an entry writes a path that is already in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// No policy declared: a second write is a configuration error.
    #[default]
    Strict,
    /// Keep the existing content.
    Skip,
    /// Append the new text after the existing text.
    AppendEnd,
    /// Structurally merge JSON documents.
    Merge,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictPolicy::Strict => "strict",
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::AppendEnd => "append_end",
            ConflictPolicy::Merge => "merge",
        };
        write!(f, "{}", name)
    }
}

/// A part of a discovered file path that can be bound into a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathPart {
    /// Module-relative path with `/` separators.
    Path,
    /// File name with extensions.
    Name,
    /// File name up to the first dot (`a.block.png` -> `a`).
    Stem,
    /// Name of the containing directory.
    Parent,
    /// Name of the directory containing the parent.
    Grandparent,
}

/// Multiplies one declared entry into one entry per matching file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEach {
    /// Glob relative to the module root.
    pub glob: String,
    /// Scope variable name -> path part of the matched file.
    #[serde(default)]
    pub bind: BTreeMap<String, PathPart>,
}

/// The module an entry was declared in.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleContext {
    /// Display name (the module directory as written in the manifest).
    pub name: String,
    /// Directory all sources of the module are relative to.
    pub root: PathBuf,
    /// Variables shared by every entry of the module.
    pub scope: ScopeMap,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            scope: ScopeMap::new(),
        }
    }

    pub fn with_scope(mut self, scope: ScopeMap) -> Self {
        self.scope = scope;
        self
    }
}

/// Identifies a declared entry in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub module: String,
    pub index: usize,
    pub source: String,
    pub target: String,
    pub policy: ConflictPolicy,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} (source: {}, target: {}, on_conflict: {})",
            self.module, self.index, self.source, self.target, self.policy
        )
    }
}

/// A declared mapping entry, possibly with a glob source.
#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub module: Arc<ModuleContext>,
    /// Position in the module's entry list.
    pub index: usize,
    pub source: String,
    pub target: TargetSpec,
    pub on_conflict: ConflictPolicy,
    pub scope: ScopeMap,
    /// Run the content through the template engine.
    pub template: bool,
    /// Re-render until no directives remain.
    pub subfunctions: bool,
    pub for_each: Option<ForEach>,
}

impl MappingEntry {
    pub fn new(module: Arc<ModuleContext>, source: impl Into<String>, target: TargetSpec) -> Self {
        Self {
            module,
            index: 0,
            source: source.into(),
            target,
            on_conflict: ConflictPolicy::Strict,
            scope: ScopeMap::new(),
            template: false,
            subfunctions: false,
            for_each: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    pub fn with_scope(mut self, scope: ScopeMap) -> Self {
        self.scope = scope;
        self
    }

    pub fn templated(mut self) -> Self {
        self.template = true;
        self
    }

    pub fn with_subfunctions(mut self) -> Self {
        self.subfunctions = true;
        self
    }

    pub fn for_each(mut self, for_each: ForEach) -> Self {
        self.for_each = Some(for_each);
        self
    }

    /// Whether text or JSON content of this entry passes through the template engine.
    pub fn is_templated(&self) -> bool {
        self.template || self.subfunctions || !self.scope.is_empty()
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            module: self.module.name.clone(),
            index: self.index,
            source: self.source.clone(),
            target: self.target.to_string(),
            policy: self.on_conflict,
        }
    }
}

/// A single-file entry produced by expansion, ready to commit.
#[derive(Debug, Clone)]
pub struct ConcreteEntry {
    pub module: Arc<ModuleContext>,
    /// Module-relative source path.
    pub source: PathBuf,
    pub target: TargetSpec,
    pub on_conflict: ConflictPolicy,
    /// Entry scope with discovery values evaluated and bindings applied.
    pub scope: ScopeMap,
    pub templated: bool,
    pub subfunctions: bool,
    pub provenance: Provenance,
}

impl ConcreteEntry {
    /// Absolute location of the source file.
    pub fn source_path(&self) -> PathBuf {
        self.module.root.join(&self.source)
    }
}
