//! Project loading and source discovery.
//!
//! This module finds the modules of a pack project, loads their map files
//! and expands declared entries into concrete single-file entries.
//!
//! # Example
//!
//! ```ignore
//! use packmap::discovery::load_project;
//!
//! let project = load_project("./my-pack")?;
//! println!("Found {} modules", project.modules.len());
//! ```

mod expand;
mod manifest;
mod map_file;
mod scanner;

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{PackError, Result};

pub use expand::expand_entry;
pub use manifest::Manifest;
pub use map_file::{DeclaredItem, MapFile};
pub use scanner::{is_glob, path_part, slash_path, Scanner};

/// The name of the manifest file.
pub const MANIFEST_FILENAME: &str = "pack.yaml";

/// The name of the per-module map file.
pub const MAP_FILENAME: &str = "_map.json";

/// A loaded project.
#[derive(Debug)]
pub struct Project {
    /// The project root directory.
    pub root: PathBuf,

    /// The loaded manifest (may be default if no pack.yaml found).
    pub manifest: Manifest,

    /// Whether a pack.yaml manifest was found.
    pub has_manifest: bool,

    /// Map files in build order.
    pub modules: Vec<MapFile>,
}

impl Project {
    /// Number of declared items across all modules.
    pub fn item_count(&self) -> usize {
        self.modules.iter().map(|m| m.items.len()).sum()
    }
}

/// Load a project directory.
///
/// Reads `pack.yaml` when present, then the map file of every module the
/// manifest names (or every subdirectory with a map file).
pub fn load_project(root: impl AsRef<Path>) -> Result<Project> {
    let root = root.as_ref().to_path_buf();

    let manifest_path = root.join(MANIFEST_FILENAME);
    let (manifest, has_manifest) = if manifest_path.exists() {
        (Manifest::load(&manifest_path)?, true)
    } else {
        (Manifest::default(), false)
    };

    let mut modules = Vec::new();
    for name in manifest.effective_modules(&root)? {
        let module_root = root.join(&name);
        let map_path = module_root.join(MAP_FILENAME);
        if !map_path.is_file() {
            return Err(PackError::Io {
                path: map_path,
                message: format!("Module '{}' has no {}", name, MAP_FILENAME),
            });
        }
        let map = MapFile::load(&map_path, &name, &module_root)?;
        debug!("Loaded module '{}' with {} items", name, map.items.len());
        modules.push(map);
    }

    Ok(Project {
        root,
        manifest,
        has_manifest,
        modules,
    })
}
