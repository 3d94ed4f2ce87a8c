//! Canonical request signing.
//!
//! The string to sign is five newline-terminated fields in fixed order:
//!
//! ```text
//! {METHOD}\n{uri}\n{timestamp}\n{content type}\n{raw body}\n
//! ```
//!
//! It is signed with HMAC-SHA256 keyed by the token secret and rendered as
//! `v0={token_id}:{lowercase hex digest}`. The verifier recomputes the same
//! string from the received request, so every byte matters: no trimming, no
//! normalisation, and the body must be exactly what is transmitted.

use std::fmt::Write;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Credential, CredentialError};

/// Version prefix identifying the signing scheme to the verifier.
pub const SIGNATURE_VERSION: &str = "v0";

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Deta-Timestamp";

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "X-Deta-Signature";

/// Header carrying the content type that was signed.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// The request fields covered by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    method: &'a str,
    uri: &'a str,
    timestamp: u64,
    content_type: &'a str,
    body: &'a [u8],
}

impl<'a> CanonicalRequest<'a> {
    /// Describe a request.
    ///
    /// `uri` is the path only (leading slash, no host, no query) and `body`
    /// the exact bytes placed on the wire, empty when there is no body.
    pub fn new(
        method: &'a str,
        uri: &'a str,
        timestamp: u64,
        content_type: &'a str,
        body: &'a [u8],
    ) -> Self {
        Self {
            method,
            uri,
            timestamp,
            content_type,
            body,
        }
    }

    /// Seconds since the epoch this request is bound to.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Content type that will be signed and sent.
    pub fn content_type(&self) -> &str {
        self.content_type
    }

    /// Assemble the string to sign.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(
            self.method.len() + self.uri.len() + self.content_type.len() + self.body.len() + 32,
        );
        payload.extend_from_slice(self.method.to_ascii_uppercase().as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(self.uri.as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(self.timestamp.to_string().as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(self.content_type.as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(self.body);
        payload.push(b'\n');
        payload
    }
}

/// Headers attached to every signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Signing timestamp, seconds since the epoch.
    pub timestamp: u64,
    /// `v0={token_id}:{hex}`
    pub signature: String,
    /// Content type covered by the signature.
    pub content_type: String,
}

impl SignedHeaders {
    /// Header name/value pairs in the order they are attached.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (TIMESTAMP_HEADER, self.timestamp.to_string()),
            (SIGNATURE_HEADER, self.signature.clone()),
            (CONTENT_TYPE_HEADER, self.content_type.clone()),
        ]
    }
}

impl Credential {
    /// Sign a canonical request, returning the `X-Deta-Signature` value.
    pub fn sign(&self, request: &CanonicalRequest<'_>) -> String {
        let digest = hmac_sha256(self.secret(), &request.to_bytes());
        format!(
            "{}={}:{}",
            SIGNATURE_VERSION,
            self.token_id(),
            hex_encode(&digest)
        )
    }

    /// Sign a canonical request and package the result as headers.
    pub fn sign_headers(&self, request: &CanonicalRequest<'_>) -> SignedHeaders {
        SignedHeaders {
            timestamp: request.timestamp(),
            signature: self.sign(request),
            content_type: request.content_type().to_string(),
        }
    }
}

/// Sign a request with a raw access token.
///
/// Fails with [`CredentialError::InvalidCredential`] before any hashing when
/// the token is malformed.
pub fn sign(
    access_token: &str,
    method: &str,
    uri: &str,
    timestamp: u64,
    content_type: &str,
    raw_body: &[u8],
) -> Result<String, CredentialError> {
    let credential: Credential = access_token.parse()?;
    let request = CanonicalRequest::new(method, uri, timestamp, content_type, raw_body);
    Ok(credential.sign(&request))
}

/// Compute HMAC-SHA256.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Encode bytes as lowercase hexadecimal string.
fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}
