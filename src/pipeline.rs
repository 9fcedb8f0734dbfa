//! The end-to-end pack build.
//!
//! 1. run glyph producers in declared order, splicing in their entries
//! 2. expand and commit every entry into an [`OutputTree`]
//! 3. stage the tree and promote it over the previous output
//!
//! [`plan`] stops after step 2, so `check` never touches the output.

use std::path::{Path, PathBuf};

use log::info;
use serde_json::Value;

use crate::discovery::{DeclaredItem, Project, Scanner};
use crate::error::{PackError, Result};
use crate::glyph::GlyphReport;
use crate::report::Report;
use crate::resolve::{stage, MappingResolver, OutputTree};
use crate::template::ScopeMap;
use crate::types::{Content, MappingEntry};

/// A resolved, not yet written, pack.
#[derive(Debug)]
pub struct Plan {
    pub tree: OutputTree,
    /// Entries after producers ran, before expansion.
    pub entries: usize,
    /// One report per glyph set, in declared order.
    pub glyphs: Vec<GlyphReport>,
    /// Non-fatal findings.
    pub report: Report,
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildSummary {
    pub output: PathBuf,
    pub files: usize,
    pub plan: Plan,
}

/// Load extra global scope values from a JSON file.
pub fn load_scope_file(path: &Path) -> Result<ScopeMap> {
    match Content::load(path)? {
        Content::Json(Value::Object(map)) => Ok(map),
        _ => Err(PackError::Parse {
            message: format!("Scope file {} must hold a JSON object", path.display()),
            help: None,
        }),
    }
}

/// Run producers and replace them by the entries they yield.
pub fn run_producers(project: &Project, report: &mut Report) -> Result<(Vec<MappingEntry>, Vec<GlyphReport>)> {
    let fonts = project.manifest.effective_fonts(&project.root);
    let mut entries = Vec::new();
    let mut glyphs = Vec::new();

    for map in &project.modules {
        for item in &map.items {
            match item {
                DeclaredItem::Entry(entry) => entries.push(entry.clone()),
                DeclaredItem::Glyphs { index, config } => {
                    let (yielded, glyph_report) = config
                        .run(&map.module, *index, &fonts)
                        .map_err(|e| e.in_entry(format!("{}#{} (generate_glyphs)", map.module.name, index)))?;
                    info!(
                        "Glyph set {}#{} yielded {} entries using {}",
                        map.module.name,
                        index,
                        yielded.len(),
                        glyph_report.font
                    );
                    report.merge(glyph_report.to_report());
                    entries.extend(yielded);
                    glyphs.push(glyph_report);
                }
            }
        }
    }

    Ok((entries, glyphs))
}

/// Resolve the whole project in memory.
///
/// `extra_scope` is the outermost scope layer, below the manifest scope.
pub fn plan(project: &Project, extra_scope: Option<ScopeMap>) -> Result<Plan> {
    let mut report = Report::new();
    let (entries, glyphs) = run_producers(project, &mut report)?;

    let scanner = Scanner::with_excludes(&project.manifest.excludes)?;
    let mut resolver = MappingResolver::new(project.manifest.destinations.clone()).with_scanner(scanner);
    if let Some(scope) = extra_scope {
        resolver = resolver.with_scope(scope);
    }
    resolver = resolver.with_scope(project.manifest.scope.clone());

    let tree = resolver.resolve_all(&entries)?;
    report.merge(resolver.into_report());

    Ok(Plan {
        tree,
        entries: entries.len(),
        glyphs,
        report,
    })
}

/// Resolve the project and write it to `output`.
///
/// Nothing is written to `output` unless every entry resolved.
pub fn build(project: &Project, output: &Path, extra_scope: Option<ScopeMap>) -> Result<BuildSummary> {
    let plan = plan(project, extra_scope)?;
    let files = stage(&plan.tree, output)?;

    Ok(BuildSummary {
        output: output.to_path_buf(),
        files,
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::discovery::{load_project, MANIFEST_FILENAME, MAP_FILENAME};
    use crate::types::Content;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_conflict_discards_staging() {
        let dir = tempdir().unwrap();
        write(dir.path(), MANIFEST_FILENAME, "modules: [setup]\n");
        write(dir.path(), "setup/rp/languages.json", r#"["en_US"]"#);
        write(dir.path(), "setup/bp/languages.json", r#"["en_US"]"#);
        write(
            dir.path(),
            &format!("setup/{}", MAP_FILENAME),
            r#"[
                {"source": "rp/languages.json", "target": "RP/texts/languages.json"},
                {"source": "bp/languages.json", "target": "RP/texts/languages.json"}
            ]"#,
        );
        let output = dir.path().join("build");
        write(dir.path(), "build/old.txt", "previous build");

        let project = load_project(dir.path()).unwrap();
        let err = build(&project, &output, None).unwrap_err();

        assert!(matches!(err.root(), PackError::Conflict { .. }));
        assert_eq!(fs::read_to_string(output.join("old.txt")).unwrap(), "previous build");
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(entries.iter().all(|name| !name.starts_with(".packmap")));
    }

    #[test]
    fn test_scope_layering_across_sources() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            MANIFEST_FILENAME,
            "scope:\n  pack_name: Educator Tools\n  author: manifest\n",
        );
        write(dir.path(), "bp/manifest.json", r#"{"name": "{{pack_name}}", "author": "{{author}}", "build": "{{build}}"}"#);
        write(
            dir.path(),
            &format!("bp/{}", MAP_FILENAME),
            r#"[{"source": "manifest.json", "target": "BP/manifest.json", "json_template": true}]"#,
        );
        let scope_file = dir.path().join("scope.json");
        fs::write(&scope_file, r#"{"author": "cli", "build": "42"}"#).unwrap();

        let project = load_project(dir.path()).unwrap();
        let plan = plan(&project, Some(load_scope_file(&scope_file).unwrap())).unwrap();

        assert_eq!(
            plan.tree.get("BP/manifest.json").unwrap().content,
            Content::Json(serde_json::json!({"name": "Educator Tools", "author": "manifest", "build": "42"}))
        );
    }

    #[test]
    fn test_glyph_producer_feeds_later_entries() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            MANIFEST_FILENAME,
            "destinations:\n  rules:\n    \".png\": RP/textures/blocks\n",
        );
        write(dir.path(), "letters/block.json", r#"{"identifier": "edu:{{letter}}"}"#);
        write(
            dir.path(),
            &format!("letters/{}", MAP_FILENAME),
            r#"[
                {"generate_glyphs": {"letters": "AB", "image_size": [16, 16], "font_size": 8,
                                     "map_item": {"target": "AUTO_FLAT"}}},
                {"source": "block.json", "target": "BP/blocks/{{letter}}.json",
                 "for_each": {"glob": "letter_blocks/*.block.png", "bind": {"letter": "stem"}}}
            ]"#,
        );
        let output = dir.path().join("build");

        let project = load_project(dir.path()).unwrap();
        let summary = build(&project, &output, None).unwrap();

        assert_eq!(summary.plan.glyphs.len(), 1);
        assert!(summary.plan.report.is_empty());
        assert!(output.join("RP/textures/blocks/u0041.block.png").is_file());
        assert!(output.join("RP/textures/blocks/u0042.block.png").is_file());
        assert_eq!(
            fs::read_to_string(output.join("BP/blocks/u0042.json")).unwrap(),
            "{\n    \"identifier\": \"edu:u0042\"\n}"
        );
        assert_eq!(summary.files, 4);
    }

    #[test]
    fn test_scope_file_must_be_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scope.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(load_scope_file(&path), Err(PackError::Parse { .. })));
    }
}
