//! Programs ("micros").

use deta_credentials::ResourceAddress;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ClientError, SpaceId};

/// A deployed program, as described by the server.
///
/// Values are built once from server JSON and never changed in place; an
/// update such as a rename yields a new value (see [`Program::renamed`]).
/// Everything but the id is optional because the server omits fields freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    id: String,
    #[serde(default)]
    space: Option<SpaceId>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    runtime: Option<String>,
    #[serde(default)]
    lib: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    memory: Option<u64>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    http_auth: bool,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    api_key: Option<bool>,
    #[serde(default)]
    forked_from: Option<String>,
    #[serde(default)]
    path_alias: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    custom_domains: Option<Value>,
}

impl Program {
    /// Build from a server JSON document.
    pub fn from_json(value: Value) -> Result<Self, ClientError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Address of the shard hosting this program.
    ///
    /// Derived on every call from the program's own account and region.
    pub fn resource_address(&self) -> Result<ResourceAddress, ClientError> {
        let account = self.account.as_deref().ok_or_else(|| self.missing("account"))?;
        let region = self.region.as_deref().ok_or_else(|| self.missing("region"))?;
        Ok(ResourceAddress::new(account, region))
    }

    /// A copy of this program carrying a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self.clone()
        }
    }

    fn missing(&self, field: &'static str) -> ClientError {
        ClientError::MissingPlacement {
            program: self.id.clone(),
            field,
        }
    }

    /// Get the program id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the owning space.
    pub fn space(&self) -> Option<&SpaceId> {
        self.space.as_ref()
    }

    /// Get the group.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Get the name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the role.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Get the code identifier.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Get the public path (endpoint).
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the runtime, e.g. `python3.9`.
    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    /// Get the library layer.
    pub fn lib(&self) -> Option<&str> {
        self.lib.as_deref()
    }

    /// Get the hosting account.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Get the hosting region.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Get the memory limit in MB.
    pub fn memory(&self) -> Option<u64> {
        self.memory
    }

    /// Get the timeout in seconds.
    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    /// Get the creation timestamp as reported by the server.
    pub fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    /// Whether HTTP auth is enabled.
    pub fn http_auth(&self) -> bool {
        self.http_auth
    }

    /// Get the log level.
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    /// Whether API keys are enabled.
    pub fn api_key(&self) -> Option<bool> {
        self.api_key
    }

    /// Get the program this one was forked from.
    pub fn forked_from(&self) -> Option<&str> {
        self.forked_from.as_deref()
    }

    /// Get the path alias.
    pub fn path_alias(&self) -> Option<&str> {
        self.path_alias.as_deref()
    }

    /// Get the project.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Get the custom domains, in whatever shape the server sent them.
    pub fn custom_domains(&self) -> Option<&Value> {
        self.custom_domains.as_ref()
    }
}
