//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::ClientError;

/// Default API host.
pub const DEFAULT_HOST: &str = "https://v1.deta.sh";

/// Default drive host.
pub const DEFAULT_DRIVE_HOST: &str = "https://drive.deta.sh";

/// Runtime used when creating programs unless configured otherwise.
pub const DEFAULT_RUNTIME: &str = "python3.9";

/// Environment variable overriding [`ClientConfig::host`].
pub const HOST_ENV_VAR: &str = "DETA_API_HOST";

/// Environment variable overriding [`ClientConfig::drive_host`].
pub const DRIVE_HOST_ENV_VAR: &str = "DETA_DRIVE_HOST";

/// Environment variable overriding [`ClientConfig::default_runtime`].
pub const RUNTIME_ENV_VAR: &str = "DETA_DEFAULT_RUNTIME";

/// Configuration for a [`Client`](crate::Client).
///
/// Hosts are kept as strings and validated when the client is built, so a
/// config can be assembled from any source and pointed at a local test
/// server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the signed API (e.g. "https://v1.deta.sh")
    pub host: String,

    /// Base URL of the drive API (e.g. "https://drive.deta.sh")
    pub drive_host: String,

    /// Runtime for newly created programs
    pub default_runtime: String,

    /// Optional timeout for requests in seconds (default: 30)
    pub timeout_seconds: Option<u64>,

    /// Extra headers sent with every signed request
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            drive_host: DEFAULT_DRIVE_HOST.to_string(),
            default_runtime: DEFAULT_RUNTIME.to_string(),
            timeout_seconds: Some(30),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given API host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Defaults, overridden by `DETA_API_HOST`, `DETA_DRIVE_HOST` and
    /// `DETA_DEFAULT_RUNTIME` where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var(HOST_ENV_VAR) {
            config.host = host;
        }
        if let Ok(drive_host) = std::env::var(DRIVE_HOST_ENV_VAR) {
            config.drive_host = drive_host;
        }
        if let Ok(runtime) = std::env::var(RUNTIME_ENV_VAR) {
            config.default_runtime = runtime;
        }
        config
    }

    /// Set the drive host
    pub fn with_drive_host(mut self, drive_host: impl Into<String>) -> Self {
        self.drive_host = drive_host.into();
        self
    }

    /// Set the runtime used for new programs
    pub fn with_default_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.default_runtime = runtime.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Disable the request timeout
    pub fn without_timeout(mut self) -> Self {
        self.timeout_seconds = None;
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub(crate) fn host_url(&self) -> Result<Url, ClientError> {
        parse_host("host", &self.host)
    }

    pub(crate) fn drive_host_url(&self) -> Result<Url, ClientError> {
        parse_host("drive host", &self.drive_host)
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("cannot build HTTP client: {e}")))
    }
}

fn parse_host(label: &str, host: &str) -> Result<Url, ClientError> {
    let url = Url::parse(host)
        .map_err(|e| ClientError::Configuration(format!("invalid {label} {host:?}: {e}")))?;

    if url.host_str().is_none() {
        return Err(ClientError::Configuration(format!(
            "invalid {label} {host:?}: missing host"
        )));
    }

    Ok(url)
}
