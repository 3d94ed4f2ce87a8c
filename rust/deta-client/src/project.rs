//! Projects.

use serde::{Deserialize, Serialize};

use crate::SpaceId;

/// A project within a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: String,
    name: String,
    #[serde(default)]
    space: Option<SpaceId>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

impl Project {
    /// Get the project id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the owning space.
    pub fn space(&self) -> Option<&SpaceId> {
        self.space.as_ref()
    }

    /// Get the creation timestamp as reported by the server.
    pub fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    /// Get the region.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Envelope of `GET /spaces/{space}/projects`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}
