//! Staged writing of the output tree.
//!
//! The tree is written into a temporary directory next to the final output
//! and renamed into place only after every file was written, so a failed run
//! never leaves a half-built pack behind.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::{PackError, Result};

use super::tree::OutputTree;

const STAGING_PREFIX: &str = ".packmap-staging-";

/// Write every file of the tree under `dir`. Returns the number of files.
pub fn write_tree(tree: &OutputTree, dir: &Path) -> Result<usize> {
    for (relative, file) in tree.iter() {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, "create directory", e))?;
        }
        fs::write(&path, file.content.to_bytes()?).map_err(|e| io_error(&path, "write", e))?;
    }
    Ok(tree.len())
}

/// Write the tree to a staging directory and atomically replace `output`.
pub fn stage(tree: &OutputTree, output: &Path) -> Result<usize> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&parent).map_err(|e| io_error(&parent, "create directory", e))?;

    if output.exists() && !output.is_dir() {
        return Err(PackError::Build {
            message: format!("Output {} exists and is not a directory", output.display()),
            help: None,
        });
    }

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)
        .map_err(|e| io_error(&parent, "create staging directory", e))?;
    debug!("Staging into {}", staging.path().display());

    let count = write_tree(tree, staging.path())?;

    // The previous output is parked in a second temp dir and removed with it.
    let trash = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)
        .map_err(|e| io_error(&parent, "create staging directory", e))?;
    let previous = trash.path().join("previous");
    let had_previous = output.exists();
    if had_previous {
        fs::rename(output, &previous).map_err(|e| io_error(output, "move aside", e))?;
    }

    if let Err(e) = fs::rename(staging.path(), output) {
        if had_previous {
            let _ = fs::rename(&previous, output);
        }
        return Err(io_error(output, "promote staged output to", e));
    }

    info!("Promoted {} files to {}", count, output.display());
    Ok(count)
}

fn io_error(path: &Path, action: &str, e: std::io::Error) -> PackError {
    PackError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to {}: {}", action, e),
    }
}
