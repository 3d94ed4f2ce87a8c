//! Collecting a local source tree for deployment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::{ChangeSet, ClientError};

/// Files found under a directory, split into text and binary content.
///
/// Any entry whose name starts with `.` is skipped, along with everything
/// beneath it. Symbolic links are skipped too, so a walk never leaves the
/// root or loops. Paths are relative to the root and use `/` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    text: BTreeMap<String, String>,
    binary: BTreeMap<String, Vec<u8>>,
}

impl SourceTree {
    /// Walk `root` recursively.
    ///
    /// Files that decode as UTF-8 are text, the rest are binary.
    pub fn collect(root: impl AsRef<Path>) -> Result<Self, ClientError> {
        let root = root.as_ref();
        let mut tree = Self::default();
        let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| ClientError::io(&dir, e))?;

            for entry in entries {
                let entry = entry.map_err(|e| ClientError::io(&dir, e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    trace!(name = %name, "skipping hidden entry");
                    continue;
                }

                let path = entry.path();
                let relative = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };

                let file_type = entry.file_type().map_err(|e| ClientError::io(&path, e))?;
                if file_type.is_symlink() {
                    debug!(path = %relative, "skipping symbolic link");
                } else if file_type.is_dir() {
                    pending.push((path, relative));
                } else if file_type.is_file() {
                    let bytes = fs::read(&path).map_err(|e| ClientError::io(&path, e))?;
                    match String::from_utf8(bytes) {
                        Ok(text) => {
                            tree.text.insert(relative, text);
                        }
                        Err(error) => {
                            tree.binary.insert(relative, error.into_bytes());
                        }
                    }
                }
            }
        }

        debug!(
            root = %root.display(),
            text = tree.text.len(),
            binary = tree.binary.len(),
            "collected source tree"
        );

        Ok(tree)
    }

    /// Relative paths of text files, sorted.
    pub fn text_files(&self) -> impl Iterator<Item = &str> {
        self.text.keys().map(String::as_str)
    }

    /// Relative paths of binary files, sorted.
    pub fn binary_files(&self) -> impl Iterator<Item = &str> {
        self.binary.keys().map(String::as_str)
    }

    /// Number of collected files.
    pub fn len(&self) -> usize {
        self.text.len() + self.binary.len()
    }

    /// Whether no files were collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn the tree into a change set that uploads every file.
    pub fn into_change_set(self) -> ChangeSet {
        let change_set = self
            .text
            .into_iter()
            .fold(ChangeSet::new(), |set, (path, text)| set.text(path, text));

        self.binary
            .into_iter()
            .fold(change_set, |set, (path, bytes)| set.binary(path, bytes))
    }
}
