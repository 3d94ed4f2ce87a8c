//! The high level client.

use std::collections::BTreeMap;
use std::path::Path;

use deta_credentials::Credential;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::dispatcher::endpoint;
use crate::project::ProjectList;
use crate::{
    ChangeSet, ClientConfig, ClientError, Dispatcher, Identity, Program, Project, Request,
    Response, read_env_file,
};

/// Header carrying a project key on drive requests.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// A connected client, bound to the space its access token belongs to.
///
/// Every call goes through one [`Dispatcher`], so each request is signed
/// when it is sent. Programs are plain values: operations take them by
/// reference and return new values rather than changing them.
///
/// # Examples
///
/// ```no_run
/// use deta_client::{ChangeSet, Client, ClientConfig};
/// use deta_credentials::Credential;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::connect(ClientConfig::from_env(), Credential::from_env()?).await?;
///
/// let program = client.program("hello", "default").await?;
/// let change_set = ChangeSet::new().text("main.py", "print('hello')\n");
/// client.deploy(&program, change_set).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    dispatcher: Dispatcher,
    drive_host: Url,
    default_runtime: String,
    identity: Identity,
}

impl Client {
    /// Connect with `credential` and look up the caller's identity.
    pub async fn connect(config: ClientConfig, credential: Credential) -> Result<Self, ClientError> {
        let dispatcher = Dispatcher::new(&config, credential)?;
        Self::from_dispatcher(&config, dispatcher).await
    }

    /// Connect through an existing dispatcher, e.g. one with a custom clock.
    pub async fn from_dispatcher(
        config: &ClientConfig,
        dispatcher: Dispatcher,
    ) -> Result<Self, ClientError> {
        let drive_host = config.drive_host_url()?;
        let identity = first_space(&dispatcher).await?;

        info!(
            space = %identity.space_id(),
            username = identity.username(),
            "connected"
        );

        Ok(Self {
            dispatcher,
            drive_host,
            default_runtime: config.default_runtime.clone(),
            identity,
        })
    }

    /// The identity the client operates as.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The underlying dispatcher, for requests this client has no method for.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runtime given to newly created programs.
    pub fn default_runtime(&self) -> &str {
        &self.default_runtime
    }

    /// All spaces the access token can see.
    pub async fn spaces(&self) -> Result<Vec<Identity>, ClientError> {
        self.dispatcher.send(&Request::get("/spaces/")).await?.json()
    }

    /// Projects in the caller's space.
    pub async fn projects(&self) -> Result<Vec<Project>, ClientError> {
        let path = format!("/spaces/{}/projects", self.identity.space_id());
        let list: ProjectList = self.dispatcher.send(&Request::get(path)).await?.json()?;
        Ok(list.projects)
    }

    /// The first project called `name`, if any.
    pub async fn project(&self, name: &str) -> Result<Option<Project>, ClientError> {
        Ok(self
            .projects()
            .await?
            .into_iter()
            .find(|project| project.name() == name))
    }

    /// Bases of a project.
    pub async fn project_bases(&self, project: &Project) -> Result<Value, ClientError> {
        let space = project
            .space()
            .unwrap_or_else(|| self.identity.space_id())
            .to_string();
        let path = format!(
            "/spaces/{}/projects/{}/bases",
            segment("space", &space)?,
            segment("project id", project.id())?
        );
        document(self.dispatcher.send(&Request::get(path)).await?)
    }

    /// Keys of a project.
    pub async fn project_keys(&self, project: &Project) -> Result<Value, ClientError> {
        let path = format!("/projects/{}/keys", segment("project id", project.id())?);
        document(self.dispatcher.send(&Request::get(path)).await?)
    }

    /// Delete a base from a project.
    pub async fn delete_base(&self, base: &str, project: &str) -> Result<Value, ClientError> {
        let path = format!(
            "/spaces/{}/projects/{}/bases/{}",
            self.identity.space_id(),
            segment("project", project)?,
            segment("base", base)?
        );
        info!(base, project, "deleting base");
        document(self.dispatcher.send(&Request::delete(path)).await?)
    }

    /// Project deletion is not offered by the API this client targets.
    pub async fn delete_project(&self, _project: &str) -> Result<Value, ClientError> {
        Err(ClientError::Unsupported("project deletion"))
    }

    /// Drive deletion is not offered by the API this client targets.
    pub async fn delete_drive(&self, _drive: &str, _project: &str) -> Result<Value, ClientError> {
        Err(ClientError::Unsupported("drive deletion"))
    }

    /// Look up a program by name within a project.
    pub async fn program(&self, name: &str, project: &str) -> Result<Program, ClientError> {
        let path = format!(
            "/spaces/{}/projects/{}/programs/{}",
            self.identity.space_id(),
            segment("project", project)?,
            segment("program name", name)?
        );
        Program::from_json(document(self.dispatcher.send(&Request::get(path)).await?)?)
    }

    /// Create a program using the configured default runtime.
    ///
    /// The server reports a duplicate name as a successful response with an
    /// `errors` member; that is returned as [`ClientError::Conflict`].
    pub async fn create_program(&self, name: &str, project: &str) -> Result<Program, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidRequest("program name is empty".into()));
        }

        let request = Request::post("/programs/").with_json(json!({
            "spaceID": self.identity.space_id(),
            "project": project,
            "name": name,
            "runtime": self.default_runtime,
        }));

        let response = self.dispatcher.send(&request).await?;
        let created = document(response)?;

        if created.get("errors").is_some_and(|errors| !is_empty(errors)) {
            return Err(ClientError::Conflict {
                body: created.to_string(),
            });
        }

        let program = Program::from_json(created)?;
        info!(id = program.id(), name, project, "created program");
        Ok(program)
    }

    /// Rename a program, returning the renamed value.
    pub async fn rename_program(&self, program: &Program, name: &str) -> Result<Program, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidRequest("new program name is empty".into()));
        }

        let path = format!("/programs/{}", segment("program id", program.id())?);
        let request = Request::patch(path).with_json(json!({ "name": name }));
        self.dispatcher.send(&request).await?;

        Ok(program.renamed(name))
    }

    /// Replace a program's environment variables.
    pub async fn update_envs(
        &self,
        program: &Program,
        envs: &BTreeMap<String, String>,
    ) -> Result<Value, ClientError> {
        let address = program.resource_address()?;
        let path = format!("/programs/{}/envs", segment("program id", program.id())?);
        let request = Request::patch(path)
            .with_body(envs)?
            .with_resource_address(&address);

        debug!(id = program.id(), count = envs.len(), "updating environment");
        document(self.dispatcher.send(&request).await?)
    }

    /// Replace a program's environment variables from a `.env` file.
    pub async fn update_envs_from_file(
        &self,
        program: &Program,
        path: impl AsRef<Path>,
    ) -> Result<Value, ClientError> {
        let envs = read_env_file(path)?;
        self.update_envs(program, &envs).await
    }

    /// Download a program's source archive.
    pub async fn download_source(&self, program: &Program) -> Result<Vec<u8>, ClientError> {
        let address = program.resource_address()?;
        let path = format!("/viewer/archives/{}", segment("program id", program.id())?);
        let request = Request::get(path).with_resource_address(&address);

        let archive = self.dispatcher.send(&request).await?.into_bytes();
        debug!(id = program.id(), bytes = archive.len(), "downloaded source");
        Ok(archive)
    }

    /// Apply a change set to a program in one request.
    pub async fn deploy(&self, program: &Program, change_set: ChangeSet) -> Result<Value, ClientError> {
        let address = program.resource_address()?;
        let body = change_set.into_body(program.id());

        info!(
            id = program.id(),
            changed = body.change.len(),
            binary = body.binary.len(),
            deleted = body.delete.len(),
            "deploying"
        );

        let request = Request::post("/patcher/")
            .with_body(&body)?
            .with_resource_address(&address);
        document(self.dispatcher.send(&request).await?)
    }

    /// Install Python packages into a program.
    pub async fn install_dependencies<S: AsRef<str>>(
        &self,
        program: &Program,
        dependencies: &[S],
    ) -> Result<Value, ClientError> {
        self.pip(program, "install", dependencies).await
    }

    /// Remove Python packages from a program.
    pub async fn uninstall_dependencies<S: AsRef<str>>(
        &self,
        program: &Program,
        dependencies: &[S],
    ) -> Result<Value, ClientError> {
        self.pip(program, "uninstall", dependencies).await
    }

    async fn pip<S: AsRef<str>>(
        &self,
        program: &Program,
        action: &str,
        dependencies: &[S],
    ) -> Result<Value, ClientError> {
        if dependencies.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "nothing to {action}"
            )));
        }

        let packages = dependencies
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        let command = format!("pip {action} {packages}");

        info!(id = program.id(), command = %command, "running command");
        let request = Request::post("/pigeon/commands").with_json(json!({
            "program_id": program.id(),
            "command": command,
        }));
        document(self.dispatcher.send(&request).await?)
    }

    /// Set the path alias of a program.
    pub async fn set_alias(&self, program: &Program, alias: &str) -> Result<Value, ClientError> {
        let path = format!("/programs/{}/alias", segment("program id", program.id())?);
        let request = Request::patch(path).with_json(json!({ "alias": alias }));
        document(self.dispatcher.send(&request).await?)
    }

    /// Delete a program.
    pub async fn delete_program(&self, id: &str) -> Result<Value, ClientError> {
        let path = format!("/programs/{}", segment("program id", id)?);
        info!(id, "deleting program");
        document(self.dispatcher.send(&Request::delete(path)).await?)
    }

    /// List the objects of a project's drive.
    ///
    /// Drive requests are authorized by the project key alone and are not
    /// signed. The project id is the part of the key before its first `_`.
    pub async fn list_drive(&self, project_key: &str) -> Result<Value, ClientError> {
        let project_id = match project_key.split_once('_') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => id,
            _ => {
                return Err(ClientError::InvalidRequest(
                    "project key is not of the form id_secret".into(),
                ));
            }
        };

        let path = format!("/v1/{}/", segment("project id", project_id)?);
        let mut url = endpoint(&self.drive_host, &path)?;
        url.query_pairs_mut().append_pair("last", "");

        debug!(project = project_id, "listing drive");
        let response = self
            .dispatcher
            .http()
            .get(url)
            .header(API_KEY_HEADER, project_key)
            .send()
            .await?;

        document(Response::read(response).await?.error_for_status()?)
    }
}

async fn first_space(dispatcher: &Dispatcher) -> Result<Identity, ClientError> {
    let spaces: Vec<Identity> = dispatcher.send(&Request::get("/spaces/")).await?.json()?;
    spaces.into_iter().next().ok_or_else(|| {
        ClientError::Serialization("the spaces listing for this token is empty".into())
    })
}

/// Decode a JSON response, treating an empty body as `null`.
fn document(response: Response) -> Result<Value, ClientError> {
    if response.bytes().is_empty() {
        return Ok(Value::Null);
    }
    response.json()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(members) => members.is_empty(),
        _ => false,
    }
}

/// Check that `value` can stand as a single path segment.
///
/// Only unreserved ASCII (letters, digits, `-`, `.`, `_`, `~`) is allowed,
/// and `.` and `..` are refused, so the URL parser never rewrites the path
/// the signature covers.
fn segment<'a>(label: &str, value: &'a str) -> Result<&'a str, ClientError> {
    let invalid = matches!(value, "" | "." | "..")
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'));

    if invalid {
        return Err(ClientError::InvalidRequest(format!(
            "{label} {value:?} is not a valid path segment"
        )));
    }
    Ok(value)
}
