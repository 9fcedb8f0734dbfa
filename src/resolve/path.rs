//! Target path resolution.
//!
//! Turns an entry's target convention plus its module-relative source path
//! into a pack-relative output path. Resolution is purely lexical: nothing
//! here touches the filesystem.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{PackError, Result};
use crate::types::TargetSpec;

/// Where `AUTO*` conventions place files, keyed by filename suffix.
///
/// ```yaml
/// destinations:
///   default: ""
///   rules:
///     ".png": RP/textures/blocks
///     ".lang": RP/texts
///     ".behavior.json": BP/blocks
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DestinationRules {
    /// Root for sources no rule matches; empty means the pack root.
    pub default: String,
    /// Filename suffix -> destination root. The longest matching suffix wins.
    pub rules: BTreeMap<String, String>,
}

impl DestinationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, suffix: impl Into<String>, root: impl Into<String>) -> Self {
        self.rules.insert(suffix.into(), root.into());
        self
    }

    /// Destination root for a source path.
    pub fn root_for(&self, source: &Path) -> &str {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.rules
            .iter()
            .filter(|(suffix, _)| name.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, root)| root.as_str())
            .unwrap_or(self.default.as_str())
    }
}

/// Resolve the output path of a concrete source.
///
/// `source` is relative to the module root. Explicit targets must already
/// have had their placeholders rendered.
pub fn resolve_path(source: &Path, target: &TargetSpec, rules: &DestinationRules) -> Result<PathBuf> {
    let display = source.display().to_string();
    let source = normalize(source, &display, "source")?;
    let basename = source.file_name().ok_or_else(|| PackError::PathResolution {
        source_path: display.clone(),
        message: "source has no file name".to_string(),
        help: None,
    })?;

    let resolved = match target {
        TargetSpec::Explicit(path) => normalize(Path::new(path), &display, "target")?,
        convention => {
            let root = normalize(Path::new(rules.root_for(&source)), &display, "destination root")?;
            match convention {
                TargetSpec::Auto => root.join(&source),
                TargetSpec::AutoFlat => root.join(basename),
                _ => match source.parent().and_then(Path::file_name) {
                    Some(parent) => root.join(parent).join(basename),
                    None => root.join(basename),
                },
            }
        }
    };

    if resolved.as_os_str().is_empty() {
        return Err(PackError::PathResolution {
            source_path: display,
            message: format!("target '{}' resolves to the pack root", target),
            help: None,
        });
    }

    Ok(resolved)
}

/// Lexically normalize a relative path, rejecting anything that is absolute
/// or climbs above its root.
fn normalize(path: &Path, source: &str, what: &str) -> Result<PathBuf> {
    let fail = |message: String| PackError::PathResolution {
        source_path: source.to_string(),
        message,
        help: Some("Paths must be relative and stay inside their root".to_string()),
    };

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(fail(format!("{} '{}' escapes its root", what, path.display())));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(fail(format!("{} '{}' is absolute", what, path.display())));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> DestinationRules {
        DestinationRules::new()
            .with_rule(".png", "RP/textures")
            .with_rule(".block.png", "RP/textures/blocks")
            .with_rule(".lang", "RP/texts")
    }

    fn resolve(source: &str, target: TargetSpec) -> Result<PathBuf> {
        resolve_path(Path::new(source), &target, &rules())
    }

    #[test]
    fn test_auto_mirrors_source() {
        assert_eq!(
            resolve("ui/hud/screen.json", TargetSpec::Auto).unwrap(),
            PathBuf::from("ui/hud/screen.json")
        );
        assert_eq!(
            resolve("icons/star.png", TargetSpec::Auto).unwrap(),
            PathBuf::from("RP/textures/icons/star.png")
        );
    }

    #[test]
    fn test_auto_flat_keeps_basename() {
        assert_eq!(
            resolve("letter_blocks/latin/u0041.block.png", TargetSpec::AutoFlat).unwrap(),
            PathBuf::from("RP/textures/blocks/u0041.block.png")
        );
    }

    #[test]
    fn test_auto_flat_subfolder_keeps_one_level() {
        assert_eq!(
            resolve("letter_blocks/latin/u0041.block.png", TargetSpec::AutoFlatSubfolder).unwrap(),
            PathBuf::from("RP/textures/blocks/latin/u0041.block.png")
        );
        assert_eq!(
            resolve("u0041.block.png", TargetSpec::AutoFlatSubfolder).unwrap(),
            PathBuf::from("RP/textures/blocks/u0041.block.png")
        );
    }

    #[test]
    fn test_longest_suffix_wins() {
        let rules = rules();
        assert_eq!(rules.root_for(Path::new("a.block.png")), "RP/textures/blocks");
        assert_eq!(rules.root_for(Path::new("a.png")), "RP/textures");
        assert_eq!(rules.root_for(Path::new("en_US.lang")), "RP/texts");
        assert_eq!(rules.root_for(Path::new("manifest.json")), "");
    }

    #[test]
    fn test_explicit_passes_through() {
        assert_eq!(
            resolve("src/languages.json", TargetSpec::Explicit("RP/texts/languages.json".into())).unwrap(),
            PathBuf::from("RP/texts/languages.json")
        );
        assert_eq!(
            resolve("a.json", TargetSpec::Explicit("./RP/x/../a.json".into())).unwrap(),
            PathBuf::from("RP/a.json")
        );
    }

    #[test]
    fn test_auto_flat_depends_only_on_basename() {
        let a = resolve("one/deep/tree/x.png", TargetSpec::AutoFlat).unwrap();
        let b = resolve("other/x.png", TargetSpec::AutoFlat).unwrap();
        let c = resolve("x.png", TargetSpec::AutoFlat).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, resolve("one/deep/tree/x.png", TargetSpec::AutoFlat).unwrap());
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        assert!(matches!(
            resolve("../secret.json", TargetSpec::Auto),
            Err(PackError::PathResolution { .. })
        ));
        assert!(matches!(
            resolve("/etc/passwd", TargetSpec::AutoFlat),
            Err(PackError::PathResolution { .. })
        ));
        assert!(matches!(
            resolve("a.json", TargetSpec::Explicit("../../out.json".into())),
            Err(PackError::PathResolution { .. })
        ));
        assert!(matches!(
            resolve("a.json", TargetSpec::Explicit("/abs/out.json".into())),
            Err(PackError::PathResolution { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_results() {
        assert!(resolve(".", TargetSpec::AutoFlat).is_err());
        assert!(resolve("a.json", TargetSpec::Explicit("RP/..".into())).is_err());
    }
}
