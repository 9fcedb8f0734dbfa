//! The mapping resolver: expands entries and commits them in order.

use log::{debug, info};

use crate::discovery::{expand_entry, Scanner};
use crate::error::Result;
use crate::report::Report;
use crate::template::{render_content, render_text, RenderOptions, Scope, ScopeMap};
use crate::types::{ConcreteEntry, Content, MappingEntry, TargetSpec};

use super::path::{resolve_path, DestinationRules};
use super::tree::{CommitOutcome, OutputTree};

/// Resolves an ordered entry list into an [`OutputTree`].
#[derive(Debug, Clone, Default)]
pub struct MappingResolver {
    /// Global scope layers, outermost first.
    layers: Vec<ScopeMap>,
    rules: DestinationRules,
    scanner: Scanner,
    report: Report,
}

impl MappingResolver {
    pub fn new(rules: DestinationRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Add a global scope layer inside the existing ones.
    pub fn with_scope(mut self, scope: ScopeMap) -> Self {
        self.layers.push(scope);
        self
    }

    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Non-fatal findings so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    /// Expand every declared entry, in declared order.
    ///
    /// All discovery happens here; the commit pass never globs.
    pub fn expand(&mut self, entries: &[MappingEntry]) -> Result<Vec<ConcreteEntry>> {
        let mut concrete = Vec::new();
        for entry in entries {
            let outer = Scope::from_layers(self.layers.iter().chain([&entry.module.scope]));
            let expanded = expand_entry(entry, &outer, &self.scanner, &mut self.report)
                .map_err(|e| e.in_entry(entry.provenance()))?;
            concrete.extend(expanded);
        }
        Ok(concrete)
    }

    /// Resolve all entries into a tree, aborting on the first error.
    pub fn resolve_all(&mut self, entries: &[MappingEntry]) -> Result<OutputTree> {
        let concrete = self.expand(entries)?;
        info!("Resolving {} entries from {} declarations", concrete.len(), entries.len());

        let mut tree = OutputTree::new();
        for entry in &concrete {
            let outcome = self
                .commit(&mut tree, entry)
                .map_err(|e| e.in_entry(&entry.provenance))?;
            debug!("{} {} ({})", outcome, entry.source.display(), entry.provenance);
        }
        Ok(tree)
    }

    fn commit(&self, tree: &mut OutputTree, entry: &ConcreteEntry) -> Result<CommitOutcome> {
        let scope = Scope::from_layers(
            self.layers
                .iter()
                .chain([&entry.module.scope, &entry.scope]),
        );
        let options = RenderOptions {
            subfunctions: entry.subfunctions,
        };

        let target = match &entry.target {
            TargetSpec::Explicit(raw) if entry.templated => {
                TargetSpec::Explicit(render_text(raw, &scope, RenderOptions::default())?)
            }
            other => other.clone(),
        };
        let path = resolve_path(&entry.source, &target, &self.rules)?;

        let content = Content::load(&entry.source_path())?;
        let content = if entry.templated {
            render_content(content, &scope, options)?
        } else {
            content
        };

        tree.commit(path, content, entry.on_conflict, entry.provenance.clone())
    }
}
