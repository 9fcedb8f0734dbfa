//! The accumulating output tree and its conflict policies.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};
use crate::types::{ConflictPolicy, Content, Provenance};

use super::merge_json;

/// One resolved output file.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub content: Content,
    /// The entry that first wrote this path.
    pub provenance: Provenance,
    /// Policy of the most recent entry that changed the content.
    pub policy: ConflictPolicy,
    /// Later entries whose content was appended or merged in.
    pub contributors: Vec<Provenance>,
}

/// What a commit did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Written,
    Skipped,
    Appended,
    Merged,
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOutcome::Written => write!(f, "write"),
            CommitOutcome::Skipped => write!(f, "skip"),
            CommitOutcome::Appended => write!(f, "append"),
            CommitOutcome::Merged => write!(f, "merge"),
        }
    }
}

/// Resolved target path -> file, committed in entry order.
#[derive(Debug, Clone, Default)]
pub struct OutputTree {
    files: BTreeMap<PathBuf, OutputFile>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit content to a path, applying `policy` if the path is taken.
    ///
    /// On error the tree is left exactly as it was.
    pub fn commit(
        &mut self,
        path: PathBuf,
        content: Content,
        policy: ConflictPolicy,
        provenance: Provenance,
    ) -> Result<CommitOutcome> {
        let Some(existing) = self.files.get_mut(&path) else {
            self.files.insert(
                path,
                OutputFile {
                    content,
                    provenance,
                    policy,
                    contributors: Vec::new(),
                },
            );
            return Ok(CommitOutcome::Written);
        };

        let outcome = match policy {
            ConflictPolicy::Strict => {
                return Err(PackError::Conflict {
                    path,
                    first: existing.provenance.to_string(),
                    second: provenance.to_string(),
                })
            }
            ConflictPolicy::Skip => return Ok(CommitOutcome::Skipped),
            ConflictPolicy::AppendEnd => match (&mut existing.content, content) {
                (Content::Text(text), Content::Text(more)) => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(&more);
                    CommitOutcome::Appended
                }
                (current, incoming) => return Err(unsupported(path, policy, current, &incoming)),
            },
            ConflictPolicy::Merge => match (&mut existing.content, content) {
                (Content::Json(value), Content::Json(incoming)) => {
                    merge_json(value, incoming);
                    CommitOutcome::Merged
                }
                (current, incoming) => return Err(unsupported(path, policy, current, &incoming)),
            },
        };

        existing.policy = policy;
        existing.contributors.push(provenance);
        Ok(outcome)
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&OutputFile> {
        self.files.get(path.as_ref())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &OutputFile)> {
        self.files.iter()
    }
}

fn unsupported(path: PathBuf, policy: ConflictPolicy, existing: &Content, incoming: &Content) -> PackError {
    PackError::UnsupportedMergePolicy {
        path,
        policy: policy.to_string(),
        existing: existing.kind().to_string(),
        incoming: incoming.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn prov(module: &str, index: usize, policy: ConflictPolicy) -> Provenance {
        Provenance {
            module: module.to_string(),
            index,
            source: "languages.json".to_string(),
            target: "RP/texts/languages.json".to_string(),
            policy,
        }
    }

    fn commit(tree: &mut OutputTree, path: &str, content: Content, policy: ConflictPolicy) -> Result<CommitOutcome> {
        let index = tree.len();
        tree.commit(PathBuf::from(path), content, policy, prov("m", index, policy))
    }

    #[test]
    fn test_first_writer_always_commits() {
        let mut tree = OutputTree::new();
        for policy in [ConflictPolicy::Strict, ConflictPolicy::Skip, ConflictPolicy::AppendEnd, ConflictPolicy::Merge] {
            let path = format!("{}.txt", policy);
            assert_eq!(
                commit(&mut tree, &path, Content::Text("x".into()), policy).unwrap(),
                CommitOutcome::Written
            );
        }
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_strict_conflict_leaves_first_content() {
        let mut tree = OutputTree::new();
        let path = PathBuf::from("RP/texts/languages.json");
        tree.commit(path.clone(), Content::Json(json!(["en_US"])), ConflictPolicy::Strict, prov("a", 0, ConflictPolicy::Strict))
            .unwrap();

        let err = tree
            .commit(path.clone(), Content::Json(json!(["de_DE"])), ConflictPolicy::Strict, prov("b", 1, ConflictPolicy::Strict))
            .unwrap_err();

        match err {
            PackError::Conflict { path: p, first, second } => {
                assert_eq!(p, path);
                assert!(first.starts_with("a#0"));
                assert!(second.starts_with("b#1"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(tree.get(&path).unwrap().content, Content::Json(json!(["en_US"])));
        assert!(tree.get(&path).unwrap().contributors.is_empty());
    }

    #[test]
    fn test_skip_keeps_existing() {
        let mut tree = OutputTree::new();
        commit(&mut tree, "a.txt", Content::Text("first".into()), ConflictPolicy::Strict).unwrap();
        let outcome = commit(&mut tree, "a.txt", Content::Text("second".into()), ConflictPolicy::Skip).unwrap();

        assert_eq!(outcome, CommitOutcome::Skipped);
        assert_eq!(tree.get("a.txt").unwrap().content, Content::Text("first".into()));
    }

    #[test]
    fn test_append_end_is_line_oriented() {
        let mut tree = OutputTree::new();
        commit(&mut tree, "en_US.lang", Content::Text("line1\n".into()), ConflictPolicy::AppendEnd).unwrap();
        commit(&mut tree, "en_US.lang", Content::Text("line2\n".into()), ConflictPolicy::AppendEnd).unwrap();
        assert_eq!(tree.get("en_US.lang").unwrap().content, Content::Text("line1\nline2\n".into()));

        let mut tree = OutputTree::new();
        commit(&mut tree, "en_US.lang", Content::Text("a=1".into()), ConflictPolicy::Strict).unwrap();
        commit(&mut tree, "en_US.lang", Content::Text("b=2".into()), ConflictPolicy::AppendEnd).unwrap();
        let file = tree.get("en_US.lang").unwrap();
        assert_eq!(file.content, Content::Text("a=1\nb=2".into()));
        assert_eq!(file.policy, ConflictPolicy::AppendEnd);
        assert_eq!(file.contributors.len(), 1);
    }

    #[test]
    fn test_append_end_rejects_json() {
        let mut tree = OutputTree::new();
        commit(&mut tree, "a.json", Content::Json(json!({"a": 1})), ConflictPolicy::Strict).unwrap();
        let err = commit(&mut tree, "a.json", Content::Json(json!({"b": 1})), ConflictPolicy::AppendEnd).unwrap_err();

        assert!(matches!(
            err,
            PackError::UnsupportedMergePolicy { ref existing, ref incoming, .. } if existing == "JSON" && incoming == "JSON"
        ));
        assert_eq!(tree.get("a.json").unwrap().content, Content::Json(json!({"a": 1})));
    }

    #[test]
    fn test_merge_json_documents() {
        let mut tree = OutputTree::new();
        commit(&mut tree, "t.json", Content::Json(json!({"a": 1})), ConflictPolicy::Merge).unwrap();
        commit(&mut tree, "t.json", Content::Json(json!({"b": 2})), ConflictPolicy::Merge).unwrap();
        assert_eq!(tree.get("t.json").unwrap().content, Content::Json(json!({"a": 1, "b": 2})));

        commit(&mut tree, "t.json", Content::Json(json!({"a": 2})), ConflictPolicy::Merge).unwrap();
        assert_eq!(tree.get("t.json").unwrap().content, Content::Json(json!({"a": 2, "b": 2})));
    }

    #[test]
    fn test_merge_rejects_non_json() {
        let mut tree = OutputTree::new();
        commit(&mut tree, "a.png", Content::Binary(vec![1, 2]), ConflictPolicy::Strict).unwrap();
        let err = commit(&mut tree, "a.png", Content::Binary(vec![3]), ConflictPolicy::Merge).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedMergePolicy { .. }));
    }
}
