//! Module map files (`_map.json`).
//!
//! A map file is either a bare array of items or an object with a module
//! scope:
//!
//! ```json
//! {
//!     "scope": { "namespace": "edu_tools" },
//!     "entries": [
//!         { "source": "texts/*.lang", "target": "AUTO_FLAT", "on_conflict": "append_end" },
//!         { "generate_glyphs": { "letters": "ABC" } }
//!     ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PackError, Result};
use crate::glyph::producer::GlyphSetConfig;
use crate::template::ScopeMap;
use crate::types::{ConflictPolicy, Content, ForEach, MappingEntry, ModuleContext, TargetSpec};

const GLYPHS_KEY: &str = "generate_glyphs";

/// One item of a map file, in declared order.
#[derive(Debug, Clone)]
pub enum DeclaredItem {
    Entry(MappingEntry),
    /// A glyph set; replaced by its yielded entries before resolution.
    Glyphs { index: usize, config: GlyphSetConfig },
}

/// A parsed map file.
#[derive(Debug, Clone)]
pub struct MapFile {
    pub module: Arc<ModuleContext>,
    pub items: Vec<DeclaredItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMapFile {
    Items(Vec<Value>),
    Document(RawDocument),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    scope: ScopeMap,
    #[serde(default)]
    entries: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    source: String,
    target: String,
    #[serde(default)]
    on_conflict: Option<ConflictPolicy>,
    #[serde(default)]
    scope: ScopeMap,
    #[serde(default, alias = "is_template")]
    json_template: bool,
    #[serde(default)]
    subfunctions: bool,
    #[serde(default)]
    for_each: Option<ForEach>,
}

impl MapFile {
    /// Load the map file of a module.
    pub fn load(path: &Path, name: &str, root: &Path) -> Result<Self> {
        let value = match Content::load(path)? {
            Content::Json(value) => value,
            _ => {
                return Err(PackError::Parse {
                    message: format!("{} is not a JSON document", path.display()),
                    help: None,
                })
            }
        };
        Self::from_value(value, name, root)
    }

    /// Build a map file from an already parsed document.
    pub fn from_value(value: Value, name: &str, root: &Path) -> Result<Self> {
        let raw: RawMapFile = serde_json::from_value(value).map_err(|e| PackError::Parse {
            message: format!("Invalid map file for module '{}': {}", name, e),
            help: Some("Expected an array of entries or {\"scope\": {...}, \"entries\": [...]}".to_string()),
        })?;
        let (scope, items) = match raw {
            RawMapFile::Items(items) => (ScopeMap::new(), items),
            RawMapFile::Document(doc) => (doc.scope, doc.entries),
        };

        let module = Arc::new(ModuleContext::new(name, root).with_scope(scope));
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_item(&module, index, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { module, items })
    }

    pub fn entry_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, DeclaredItem::Entry(_)))
            .count()
    }
}

fn parse_item(module: &Arc<ModuleContext>, index: usize, item: Value) -> Result<DeclaredItem> {
    let fail = |message: String| PackError::Parse {
        message: format!("{}#{}: {}", module.name, index, message),
        help: None,
    };

    if let Some(config) = item.get(GLYPHS_KEY) {
        if item.as_object().map_or(0, |o| o.len()) != 1 {
            return Err(fail(format!("'{}' items take no other fields", GLYPHS_KEY)));
        }
        let config: GlyphSetConfig =
            serde_json::from_value(config.clone()).map_err(|e| fail(format!("invalid glyph set: {}", e)))?;
        return Ok(DeclaredItem::Glyphs { index, config });
    }

    let raw: RawEntry = serde_json::from_value(item).map_err(|e| fail(format!("invalid entry: {}", e)))?;
    let target = TargetSpec::parse(&raw.target).map_err(|e| e.in_entry(format!("{}#{}", module.name, index)))?;

    let mut entry = MappingEntry::new(module.clone(), raw.source, target)
        .at(index)
        .on_conflict(raw.on_conflict.unwrap_or_default())
        .with_scope(raw.scope);
    entry.template = raw.json_template;
    entry.subfunctions = raw.subfunctions;
    entry.for_each = raw.for_each;
    Ok(DeclaredItem::Entry(entry))
}
