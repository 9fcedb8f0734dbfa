//! Project manifest (pack.yaml) parsing.
//!
//! The manifest lists the modules of a pack, where the output goes, the
//! global scope and the destination rules for `AUTO` targets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PackError, Result};
use crate::glyph::default_candidates;
use crate::resolve::DestinationRules;
use crate::template::ScopeMap;

use super::MAP_FILENAME;

/// Project manifest loaded from pack.yaml.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Module directories, relative to the project root, in build order.
    /// Defaults to every subdirectory holding a map file, sorted by name.
    pub modules: Vec<String>,

    /// Output directory for the staged pack.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Variables visible to every entry.
    pub scope: ScopeMap,

    /// Destination roots for `AUTO` targets.
    pub destinations: DestinationRules,

    /// Font candidates for glyph sets, tried in order.
    pub fonts: Vec<PathBuf>,

    /// Patterns to exclude from discovery.
    pub excludes: Vec<String>,
}

fn default_output() -> PathBuf {
    PathBuf::from("build")
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            modules: vec![],
            output: default_output(),
            scope: ScopeMap::new(),
            destinations: DestinationRules::default(),
            fonts: vec![],
            excludes: vec![],
        }
    }
}

impl Manifest {
    /// Load manifest from a pack.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PackError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read manifest: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse manifest from YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| PackError::Parse {
            message: format!("Invalid manifest: {}", e),
            help: Some("Check pack.yaml syntax".to_string()),
        })
    }

    /// Module directories to build, relative to `root`.
    pub fn effective_modules(&self, root: &Path) -> Result<Vec<String>> {
        if !self.modules.is_empty() {
            return Ok(self.modules.clone());
        }

        let mut modules = Vec::new();
        if root.join(MAP_FILENAME).is_file() {
            modules.push(".".to_string());
        }

        let entries = fs::read_dir(root).map_err(|e| PackError::Io {
            path: root.to_path_buf(),
            message: format!("Failed to list modules: {}", e),
        })?;
        let mut found: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join(MAP_FILENAME).is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        found.sort();
        modules.extend(found);

        Ok(modules)
    }

    /// Font candidates, defaulting to the common system font locations.
    pub fn effective_fonts(&self, root: &Path) -> Vec<PathBuf> {
        if self.fonts.is_empty() {
            default_candidates()
        } else {
            self.fonts.iter().map(|f| root.join(f)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal_manifest() {
        let yaml = "output: dist";
        let manifest = Manifest::parse(yaml).unwrap();

        assert_eq!(manifest.output, PathBuf::from("dist"));
        assert!(manifest.modules.is_empty());
        assert!(manifest.scope.is_empty());
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
modules:
  - setup
  - letters
output: out/pack
scope:
  namespace: edu_tools
  version: [1, 2, 0]
destinations:
  default: RP
  rules:
    ".png": RP/textures/blocks
    ".behavior.json": BP/blocks
fonts:
  - fonts/Roboto.ttf
excludes:
  - "**/*.psd"
"#;
        let manifest = Manifest::parse(yaml).unwrap();

        assert_eq!(manifest.modules, vec!["setup", "letters"]);
        assert_eq!(manifest.output, PathBuf::from("out/pack"));
        assert_eq!(manifest.scope["version"], json!([1, 2, 0]));
        assert_eq!(manifest.destinations.default, "RP");
        assert_eq!(manifest.destinations.root_for(Path::new("a.behavior.json")), "BP/blocks");
        assert_eq!(manifest.effective_fonts(Path::new("/p")), vec![PathBuf::from("/p/fonts/Roboto.ttf")]);
        assert_eq!(manifest.excludes, vec!["**/*.psd"]);
    }

    #[test]
    fn test_parse_empty_manifest() {
        let manifest = Manifest::parse("").unwrap();
        assert_eq!(manifest.output, PathBuf::from("build"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Manifest::parse("sources: [a]").is_err());
    }

    #[test]
    fn test_modules_default_to_map_directories() {
        let dir = tempdir().unwrap();
        for name in ["ui", "blocks", "notes"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("ui").join(MAP_FILENAME), "[]").unwrap();
        fs::write(dir.path().join("blocks").join(MAP_FILENAME), "[]").unwrap();

        let modules = Manifest::default().effective_modules(dir.path()).unwrap();
        assert_eq!(modules, vec!["blocks", "ui"]);
    }
}
