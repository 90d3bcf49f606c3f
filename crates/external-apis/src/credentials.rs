// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider credentials
//!
//! [`ApiKey`] guarantees a non-blank secret at construction and never leaks it:
//! `Debug` and `Display` are redacted and the type does not implement
//! `Serialize`, so a key cannot end up in a [`api_client::FetchResult`] or a
//! log line by accident.
//!
//! ```rust
//! use external_apis::ApiKey;
//!
//! let key = ApiKey::new("sk-1234567890").expect("valid key");
//! assert_eq!(key.expose(), "sk-1234567890");
//! assert_eq!(format!("{key:?}"), "ApiKey(***)");
//!
//! assert!(ApiKey::new("   ").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

/// A non-blank API secret
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Box<str>);

impl ApiKey {
    /// Creates a key, rejecting empty or whitespace-only input
    ///
    /// Surrounding whitespace is stripped, since it is never part of a key and
    /// usually comes from environment files.
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            Err("API key cannot be empty or whitespace-only".to_string())
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    /// Returns the secret for placing it on an outbound request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl FromStr for ApiKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let key = String::deserialize(deserializer)?;
        Self::new(key).map_err(de::Error::custom)
    }
}

/// Where a provider expects its API key
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum KeyPlacement {
    /// Sent as a request header
    Header {
        /// Header name, e.g. `X-API-Key`
        name: String,
    },
    /// Sent as a query parameter
    Query {
        /// Parameter name, e.g. `apikey`
        name: String,
    },
}

/// An API key bound to its placement
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Where the key goes
    pub placement: KeyPlacement,
    /// The key
    pub key: ApiKey,
}
