//! Access token parsing.
//!
//! An access token has the form `{token_id}_{token_secret}`. The id travels in
//! every signature; the secret is only ever used as the HMAC key.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable the access token is read from by [`Credential::from_env`].
pub const ACCESS_TOKEN_ENV_VAR: &str = "DETA_ACCESS_TOKEN";

/// Errors that can occur while obtaining a [`Credential`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The token does not split into a non-empty id and a non-empty secret.
    #[error("invalid access token: expected `<token id>_<token secret>`")]
    InvalidCredential,

    /// No token was found in the environment.
    #[error("access token not set: provide one or export {0}")]
    Missing(&'static str),
}

/// Parsed access token.
///
/// The token is split on its first underscore, so a secret may itself contain
/// underscores while the id may not.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token_id: String,
    token_secret: String,
}

impl Credential {
    /// Build a credential from an already separated id and secret.
    pub fn new(
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let token_id = token_id.into();
        let token_secret = token_secret.into();

        if token_id.is_empty() || token_secret.is_empty() || token_id.contains('_') {
            return Err(CredentialError::InvalidCredential);
        }

        Ok(Self {
            token_id,
            token_secret,
        })
    }

    /// Read the access token from [`ACCESS_TOKEN_ENV_VAR`].
    pub fn from_env() -> Result<Self, CredentialError> {
        let token = std::env::var(ACCESS_TOKEN_ENV_VAR)
            .map_err(|_| CredentialError::Missing(ACCESS_TOKEN_ENV_VAR))?;
        token.parse()
    }

    /// Public token identifier, sent inside every signature.
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    pub(crate) fn secret(&self) -> &[u8] {
        self.token_secret.as_bytes()
    }
}

impl FromStr for Credential {
    type Err = CredentialError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (token_id, token_secret) = token
            .split_once('_')
            .ok_or(CredentialError::InvalidCredential)?;
        Self::new(token_id, token_secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}
