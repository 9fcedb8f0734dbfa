//! File system scanner for glob sources.
//!
//! Walks a module directory and returns the module-relative paths of every
//! file matching a glob, in lexicographic order so that expansion is
//! reproducible across runs and platforms.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::{PackError, Result};
use crate::types::PathPart;

use super::MAP_FILENAME;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Finds files under module roots, honouring manifest excludes.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    excludes: Vec<Pattern>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanner that skips paths matching any of `patterns`.
    pub fn with_excludes(patterns: &[String]) -> Result<Self> {
        let excludes = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { excludes })
    }

    /// Check a module-relative path (with `/` separators) against the excludes.
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.excludes
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }

    /// All files under `root` matching `pattern`, relative to `root`, sorted.
    ///
    /// Map files are never matched. A missing root yields no matches.
    pub fn find(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let compiled = compile(pattern)?;
        let mut matches = Vec::new();

        if !root.exists() {
            return Ok(matches);
        }

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || entry.file_name() == MAP_FILENAME {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let key = slash_path(relative);
            if compiled.matches_with(&key, MATCH_OPTIONS) && !self.is_excluded(&key) {
                matches.push(relative.to_path_buf());
            }
        }

        matches.sort_by_key(|p| slash_path(p));
        Ok(matches)
    }
}

/// Whether a source string is a glob rather than a literal path.
pub fn is_glob(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

/// Extract a path part from a module-relative path.
pub fn path_part(relative: &Path, part: PathPart) -> Option<String> {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
    match part {
        PathPart::Path => Some(slash_path(relative)),
        PathPart::Name => name(relative),
        PathPart::Stem => name(relative).map(|n| match n.split_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => n,
        }),
        PathPart::Parent => relative.parent().and_then(name),
        PathPart::Grandparent => relative.parent().and_then(Path::parent).and_then(name),
    }
}

/// Render a relative path with `/` separators on every platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| PackError::Parse {
        message: format!("Invalid glob '{}': {}", pattern, e),
        help: None,
    })
}
