//! `.env` files for program environment updates.

use std::collections::BTreeMap;
use std::path::Path;

use crate::ClientError;

/// Parse `KEY=VALUE` lines.
///
/// Each line is split on its first `=`, so values may contain `=`. Blank
/// lines and `#` comments are skipped; any other line without `=` is an
/// error. Later keys override earlier ones.
pub fn parse_env(contents: &str) -> Result<BTreeMap<String, String>, ClientError> {
    let mut envs = BTreeMap::new();

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            ClientError::InvalidRequest(format!(
                "line {} of env file is not KEY=VALUE",
                index + 1
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "line {} of env file has an empty key",
                index + 1
            )));
        }

        envs.insert(key.to_string(), value.to_string());
    }

    Ok(envs)
}

/// Read and parse a `.env` file.
pub fn read_env_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, ClientError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| ClientError::io(path, e))?;
    parse_env(&contents)
}
