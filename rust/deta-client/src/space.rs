//! Spaces and the caller's identity within them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a space.
///
/// The API has returned both numbers and strings here; the original JSON
/// value is kept so it can be echoed back in request bodies unchanged, while
/// [`Display`](fmt::Display) renders it for use in paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(Value);

impl SpaceId {
    /// The raw JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(id) => f.write_str(id),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for SpaceId {
    fn from(id: &str) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl From<u64> for SpaceId {
    fn from(id: u64) -> Self {
        Self(Value::from(id))
    }
}

/// A space the access token belongs to, as listed by `GET /spaces/`.
///
/// The first entry of that listing is the identity a client operates as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "spaceID")]
    space_id: SpaceId,
    #[serde(rename = "name")]
    username: String,
    #[serde(default)]
    role: Option<String>,
}

impl Identity {
    /// Get the space id.
    pub fn space_id(&self) -> &SpaceId {
        &self.space_id
    }

    /// Get the user name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the role within the space.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}
