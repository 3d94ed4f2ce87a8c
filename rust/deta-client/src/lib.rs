//! A client for the Deta API.
//!
//! Requests to the API host are signed with the caller's access token by a
//! [`Dispatcher`]; the signature covers the exact bytes sent and the time
//! they were sent, so every call (including a repeated one) is signed anew.
//! Calls that must reach the shard hosting a particular program also carry
//! that program's resource address.
//!
//! [`Client`] wraps the dispatcher with the operations of the platform:
//! projects, programs ("micros"), environment variables, source archives and
//! deployments. A deployment ships a [`ChangeSet`] (changed text files,
//! changed binary files and deletions) as one patch request.
//!
//! ```no_run
//! use deta_client::{Client, ClientConfig, SourceTree};
//! use deta_credentials::Credential;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(ClientConfig::default(), "abc123_s3cr3t".parse::<Credential>()?).await?;
//!
//! let program = client.create_program("hello", "default").await?;
//! let change_set = SourceTree::collect("./hello")?.into_change_set();
//! client.deploy(&program, change_set).await?;
//! client.update_envs_from_file(&program, "./hello/.env").await?;
//! # Ok(())
//! # }
//! ```

mod changeset;
mod client;
mod clock;
mod config;
mod dispatcher;
mod env;
mod error;
mod program;
mod project;
mod request;
mod space;
mod tree;

pub use changeset::{ChangeSet, PatchBody, build};
pub use client::{API_KEY_HEADER, Client};
pub use clock::{Clock, SystemClock};
pub use config::{
    ClientConfig, DEFAULT_DRIVE_HOST, DEFAULT_HOST, DEFAULT_RUNTIME, DRIVE_HOST_ENV_VAR,
    HOST_ENV_VAR, RUNTIME_ENV_VAR,
};
pub use dispatcher::Dispatcher;
pub use env::{parse_env, read_env_file};
pub use error::ClientError;
pub use program::Program;
pub use project::Project;
pub use request::{Body, DEFAULT_CONTENT_TYPE, Request, Response};
pub use space::{Identity, SpaceId};
pub use tree::SourceTree;

pub use deta_credentials::{Credential, ResourceAddress};
