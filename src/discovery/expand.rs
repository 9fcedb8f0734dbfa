//! Entry expansion: turns declared entries into concrete single-file entries.
//!
//! Runs once, before the commit pass. Glob sources become one entry per
//! match, `for_each` multiplies an entry per discovered file and `$discover`
//! scope values are replaced by the list they describe.

use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::error::{PackError, Result};
use crate::report::Report;
use crate::template::{render_text, RenderOptions, Scope, ScopeMap};
use crate::types::{ConcreteEntry, MappingEntry, PathPart};

use super::scanner::{is_glob, path_part, slash_path, Scanner};

const DISCOVER_KEY: &str = "$discover";
const DISCOVER_KEYS: [&str; 4] = [DISCOVER_KEY, "part", "group_by", "unique"];

/// Expand one declared entry.
///
/// `outer` holds every scope layer outside the entry's own (global and
/// module). The result is sorted by source path.
pub fn expand_entry(
    entry: &MappingEntry,
    outer: &Scope,
    scanner: &Scanner,
    report: &mut Report,
) -> Result<Vec<ConcreteEntry>> {
    let root = &entry.module.root;
    let scope = evaluate_discovery(&entry.scope, root, scanner)?;
    let templated = entry.is_templated() || entry.for_each.is_some();

    // (source template, scope) pairs before glob expansion
    let mut declared = Vec::new();
    match &entry.for_each {
        None => declared.push((entry.source.clone(), scope)),
        Some(for_each) => {
            let matches = scanner.find(root, &for_each.glob)?;
            if matches.is_empty() {
                report.warning(
                    "packmap::glob::empty",
                    format!("for_each glob '{}' matches nothing in {}", for_each.glob, root.display()),
                );
            }
            for matched in matches {
                let mut bound = scope.clone();
                for (name, part) in &for_each.bind {
                    bound.insert(name.clone(), Value::String(bind_part(&matched, *part)?));
                }
                let source = render_text(&entry.source, &outer.child(&bound), RenderOptions::default())?;
                declared.push((source, bound));
            }
        }
    }

    let mut concrete = Vec::new();
    for (source, scope) in declared {
        let sources = if is_glob(&source) {
            let matches = scanner.find(root, &source)?;
            if matches.is_empty() {
                report.warning(
                    "packmap::glob::empty",
                    format!("source glob '{}' matches nothing in {}", source, root.display()),
                );
            }
            matches
        } else {
            vec![PathBuf::from(&source)]
        };

        for source in sources {
            concrete.push(ConcreteEntry {
                module: entry.module.clone(),
                source,
                target: entry.target.clone(),
                on_conflict: entry.on_conflict,
                scope: scope.clone(),
                templated,
                subfunctions: entry.subfunctions,
                provenance: entry.provenance(),
            });
        }
    }

    concrete.sort_by_cached_key(|c| slash_path(&c.source));
    debug!("{} expanded to {} entries", entry.provenance(), concrete.len());
    Ok(concrete)
}

fn bind_part(matched: &Path, part: PathPart) -> Result<String> {
    path_part(matched, part).ok_or_else(|| PackError::PathResolution {
        source_path: matched.display().to_string(),
        message: format!("path has no {:?} component to bind", part).to_lowercase(),
        help: None,
    })
}

/// Replace `{"$discover": "<glob>", "part": "stem"}` values with the sorted
/// list of that part of every matching file.
///
/// `"group_by": <part>` turns the result into a list of lists, one per
/// distinct group value in discovery order. `"unique": true` drops repeated
/// values, keeping the first.
fn evaluate_discovery(scope: &ScopeMap, root: &Path, scanner: &Scanner) -> Result<ScopeMap> {
    let mut out = ScopeMap::with_capacity(scope.len());
    for (name, value) in scope {
        let evaluated = match DiscoverRequest::parse(value)? {
            Some(request) => request.evaluate(root, scanner)?,
            None => value.clone(),
        };
        out.insert(name.clone(), evaluated);
    }
    Ok(out)
}

struct DiscoverRequest<'a> {
    pattern: &'a str,
    part: PathPart,
    group_by: Option<PathPart>,
    unique: bool,
}

impl<'a> DiscoverRequest<'a> {
    fn parse(value: &'a Value) -> Result<Option<Self>> {
        let Some(map) = value.as_object().filter(|m| m.contains_key(DISCOVER_KEY)) else {
            return Ok(None);
        };

        let invalid = |message: String| PackError::Parse {
            message,
            help: Some(
                r#"Expected {"$discover": "<glob>", "part": "stem", "group_by": "parent", "unique": false}"#
                    .to_string(),
            ),
        };

        if let Some(unknown) = map.keys().find(|k| !DISCOVER_KEYS.contains(&k.as_str())) {
            return Err(invalid(format!("unknown key '{}' in $discover", unknown)));
        }
        let pattern = map[DISCOVER_KEY]
            .as_str()
            .ok_or_else(|| invalid("$discover must be a glob string".to_string()))?;
        let part_of = |key: &str| -> Result<Option<PathPart>> {
            map.get(key)
                .map(|part| {
                    serde_json::from_value::<PathPart>(part.clone())
                        .map_err(|e| invalid(format!("invalid $discover {}: {}", key, e)))
                })
                .transpose()
        };
        let unique = match map.get("unique") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(invalid("$discover unique must be true or false".to_string())),
        };

        Ok(Some(DiscoverRequest {
            pattern,
            part: part_of("part")?.unwrap_or(PathPart::Stem),
            group_by: part_of("group_by")?,
            unique,
        }))
    }

    fn evaluate(&self, root: &Path, scanner: &Scanner) -> Result<Value> {
        let matches = scanner.find(root, self.pattern)?;

        let Some(group_by) = self.group_by else {
            let mut values = Vec::with_capacity(matches.len());
            for matched in &matches {
                self.push(&mut values, bind_part(matched, self.part)?);
            }
            return Ok(Value::Array(values));
        };

        let mut groups: Vec<(String, Vec<Value>)> = Vec::new();
        for matched in &matches {
            let key = bind_part(matched, group_by)?;
            let value = bind_part(matched, self.part)?;
            let index = match groups.iter().position(|(k, _)| *k == key) {
                Some(index) => index,
                None => {
                    groups.push((key, Vec::new()));
                    groups.len() - 1
                }
            };
            self.push(&mut groups[index].1, value);
        }
        Ok(Value::Array(
            groups.into_iter().map(|(_, values)| Value::Array(values)).collect(),
        ))
    }

    fn push(&self, values: &mut Vec<Value>, value: String) {
        let value = Value::String(value);
        if !self.unique || !values.contains(&value) {
            values.push(value);
        }
    }
}
