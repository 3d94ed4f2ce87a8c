//! Shard routing addresses.
//!
//! This module provides the [`ResourceAddress`] type identifying the physical
//! backend (account and region) that hosts a program.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Header carrying the encoded resource address on shard-routed requests.
pub const RESOURCE_ADDRESS_HEADER: &str = "X-Resource-Addr";

/// Account and region of the shard hosting a program.
///
/// The encoded form is `base64("aws:{account}:{region}")` using the standard
/// alphabet with padding. It is opaque to callers and only meaningful to the
/// backend router, so no decoding is offered.
///
/// # Examples
///
/// ```
/// use deta_credentials::ResourceAddress;
///
/// let address = ResourceAddress::new("123456789012", "us-east-1");
/// assert_eq!(address.encode(), "YXdzOjEyMzQ1Njc4OTAxMjp1cy1lYXN0LTE=");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    account: String,
    region: String,
}

impl ResourceAddress {
    /// Create an address for the given account and region.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Get the account.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Encode into the routing token.
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("aws:{}:{}", self.account, self.region))
    }

    /// The `X-Resource-Addr` header for this address.
    pub fn header(&self) -> (&'static str, String) {
        (RESOURCE_ADDRESS_HEADER, self.encode())
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
