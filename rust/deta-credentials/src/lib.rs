//! Access tokens, request signatures and shard addresses for the Deta API.
//!
//! This crate is pure computation: it never performs I/O, which keeps it
//! usable from the request dispatcher as well as from test servers that need
//! to verify what a client sent.
//!
//! # Signing
//!
//! Every call to the API host carries three headers derived from the access
//! token and the exact bytes that go on the wire:
//!
//! - `X-Deta-Timestamp` - seconds since the epoch at send time
//! - `X-Deta-Signature` - `v0={token_id}:{hex(HMAC-SHA256(secret, canonical))}`
//! - `Content-Type`
//!
//! # Example
//!
//! ```
//! use deta_credentials::{CanonicalRequest, Credential, ResourceAddress};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credential: Credential = "abc123_s3cr3t".parse()?;
//!
//! let request = CanonicalRequest::new("POST", "/programs/", 1700000000, "application/json", b"{}");
//! let headers = credential.sign_headers(&request);
//! assert!(headers.signature.starts_with("v0=abc123:"));
//!
//! // Shard-routed calls additionally carry the program's resource address.
//! let address = ResourceAddress::new("123456789012", "us-east-1");
//! assert_eq!(address.encode(), "YXdzOjEyMzQ1Njc4OTAxMjp1cy1lYXN0LTE=");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod credential;
pub mod signature;

pub use address::{RESOURCE_ADDRESS_HEADER, ResourceAddress};
pub use credential::{ACCESS_TOKEN_ENV_VAR, Credential, CredentialError};
pub use signature::{
    CONTENT_TYPE_HEADER, CanonicalRequest, SIGNATURE_HEADER, SIGNATURE_VERSION, SignedHeaders,
    TIMESTAMP_HEADER, sign,
};
