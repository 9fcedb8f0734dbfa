use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for packmap operations
#[derive(Error, Diagnostic, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    #[diagnostic(code(packmap::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(packmap::io))]
    Io { path: PathBuf, message: String },

    #[error("Parse error: {message}")]
    #[diagnostic(code(packmap::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cannot resolve path for '{source_path}': {message}")]
    #[diagnostic(code(packmap::path))]
    PathResolution {
        source_path: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Undefined scope variable '{name}'")]
    #[diagnostic(
        code(packmap::template::undefined),
        help("Add '{name}' to the entry, module or manifest scope")
    )]
    UndefinedScopeVariable { name: String },

    #[error("Template error: {message}")]
    #[diagnostic(code(packmap::template))]
    Template { message: String },

    #[error("Conflicting writes to {path}: {first} and {second}")]
    #[diagnostic(
        code(packmap::conflict),
        help("Set \"on_conflict\" to skip, append_end or merge on the later entry")
    )]
    Conflict {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Policy '{policy}' cannot combine {existing} content with {incoming} content at {path}")]
    #[diagnostic(code(packmap::policy))]
    UnsupportedMergePolicy {
        path: PathBuf,
        policy: String,
        existing: String,
        incoming: String,
    },

    #[error("Failed to load font {path}: {message}")]
    #[diagnostic(code(packmap::font))]
    FontLoad { path: PathBuf, message: String },

    #[error("Failed to render glyph {glyph}: {message}")]
    #[diagnostic(code(packmap::glyph))]
    GlyphRender { glyph: String, message: String },

    #[error("Entry {entry} failed")]
    #[diagnostic(code(packmap::entry))]
    InEntry {
        entry: String,
        #[source]
        inner: Box<PackError>,
    },

    #[error("Build error: {message}")]
    #[diagnostic(code(packmap::build))]
    Build {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl PackError {
    /// Wrap this error with the entry that produced it.
    pub fn in_entry(self, entry: impl ToString) -> Self {
        PackError::InEntry {
            entry: entry.to_string(),
            inner: Box::new(self),
        }
    }

    /// The innermost error, skipping entry context wrappers.
    pub fn root(&self) -> &PackError {
        match self {
            PackError::InEntry { inner, .. } => inner.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_entry_context() {
        let err = PackError::UndefinedScopeVariable {
            name: "letter".to_string(),
        }
        .in_entry("ui#0")
        .in_entry("outer");

        assert!(matches!(
            err.root(),
            PackError::UndefinedScopeVariable { name } if name == "letter"
        ));
    }

    #[test]
    fn test_conflict_message_names_both_entries() {
        let err = PackError::Conflict {
            path: PathBuf::from("RP/texts/languages.json"),
            first: "a#0".to_string(),
            second: "b#1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a#0"));
        assert!(msg.contains("b#1"));
        assert!(msg.contains("languages.json"));
    }
}
