//! Deployment change sets.
//!
//! A [`ChangeSet`] collects everything a single deploy ships to a program:
//! changed text files, changed binary files and deleted paths. It becomes one
//! [`PatchBody`] posted to `/patcher/` in a single request, so there is no
//! partial application to track locally.
//!
//! Text and binary content live in separate maps because the server decodes
//! them differently: text is taken as is, binary content arrives base64
//! encoded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Files added, modified or removed by one deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeMap<String, String>,
    binary: BTreeMap<String, Vec<u8>>,
    deleted: BTreeSet<String>,
}

impl ChangeSet {
    /// An empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed text file.
    pub fn text(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.changed.insert(path.into(), content.into());
        self
    }

    /// Record a changed binary file.
    pub fn binary(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.binary.insert(path.into(), content.into());
        self
    }

    /// Record a deleted file.
    pub fn delete(mut self, path: impl Into<String>) -> Self {
        self.deleted.insert(path.into());
        self
    }

    /// Read a text file from disk, keyed by its path as given.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_text_file(self, path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let key = path_key(path);
        self.read_text_file_as(key, path)
    }

    /// Read a text file from disk under an explicit key.
    pub fn read_text_file_as(
        self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ClientError::io(path, e))?;
        Ok(self.text(key, String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Read a binary file from disk, keyed by its path as given.
    pub fn read_binary_file(self, path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let key = path_key(path);
        self.read_binary_file_as(key, path)
    }

    /// Read a binary file from disk under an explicit key.
    pub fn read_binary_file_as(
        self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ClientError::io(path, e))?;
        Ok(self.binary(key, bytes))
    }

    /// Changed text files.
    pub fn changed(&self) -> &BTreeMap<String, String> {
        &self.changed
    }

    /// Changed binary files.
    pub fn binaries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.binary
    }

    /// Deleted paths.
    pub fn deleted(&self) -> &BTreeSet<String> {
        &self.deleted
    }

    /// Whether nothing would change.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.binary.is_empty() && self.deleted.is_empty()
    }

    /// Produce the patch body for `program_id`.
    pub fn into_body(self, program_id: impl Into<String>) -> PatchBody {
        PatchBody {
            pid: program_id.into(),
            change: self.changed,
            binary: self
                .binary
                .into_iter()
                .map(|(path, bytes)| (path, STANDARD.encode(bytes)))
                .collect(),
            delete: self.deleted.into_iter().collect(),
        }
    }
}

/// Body of `POST /patcher/`.
///
/// `binary` and `delete` are left out entirely when empty, so a patch never
/// carries an empty container the server could read as "delete everything".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBody {
    /// Target program id
    pub pid: String,
    /// Text files by path
    pub change: BTreeMap<String, String>,
    /// Base64 encoded binary files by path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, String>,
    /// Deleted paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

/// Build a patch body from files on disk.
///
/// Text files are read as lossy UTF-8, binary files are base64 encoded, and
/// each file is keyed by its path as given.
pub fn build<T, B, D>(
    program_id: &str,
    text_files: T,
    binary_files: B,
    deleted_files: D,
) -> Result<PatchBody, ClientError>
where
    T: IntoIterator,
    T::Item: AsRef<Path>,
    B: IntoIterator,
    B::Item: AsRef<Path>,
    D: IntoIterator,
    D::Item: Into<String>,
{
    let mut change_set = ChangeSet::new();

    for path in text_files {
        change_set = change_set.read_text_file(path)?;
    }
    for path in binary_files {
        change_set = change_set.read_binary_file(path)?;
    }
    for path in deleted_files {
        change_set = change_set.delete(path);
    }

    Ok(change_set.into_body(program_id))
}

/// Key a file by its path, using `/` separators on every platform.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
}
