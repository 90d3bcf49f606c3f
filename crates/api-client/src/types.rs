// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Data exchanged between the fetch and parse phases of a provider

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::Entity;

/// Canonical operations a provider may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Fungible balances of an address
    Balance,
    /// Transfer history of an address
    Transactions,
    /// NFTs held by an address
    Nfts,
    /// Open bids and listings made by or for an address
    NftOffers,
    /// Market statistics of a collection contract
    CollectionStats,
}

impl Operation {
    /// Returns every operation
    pub const fn all() -> &'static [Self] {
        &[
            Self::Balance,
            Self::Transactions,
            Self::Nfts,
            Self::NftOffers,
            Self::CollectionStats,
        ]
    }

    /// Stable name used in logs, templates and configuration keys
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Transactions => "transactions",
            Self::Nfts => "nfts",
            Self::NftOffers => "nft_offers",
            Self::CollectionStats => "collection_stats",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Continuation token for paginated fetches
///
/// Cursors are plain data handed from one fetch to the next; providers never
/// remember "the next page" themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cursor {
    /// Offset/limit pagination
    Offset {
        /// Records to skip
        offset: u64,
        /// Page size
        limit: u64,
    },
    /// Page number/page size pagination
    Page {
        /// Page number
        page: u64,
        /// Page size
        size: u64,
    },
    /// Opaque provider token
    Token {
        /// Token value as returned by the provider
        value: String,
    },
}

impl Cursor {
    /// Computes the cursor following a page that returned `returned` records
    ///
    /// A short page ends offset and page pagination. Token cursors cannot be
    /// derived locally and always yield `None`.
    pub fn advance(&self, returned: usize) -> Option<Self> {
        let returned = u64::try_from(returned).unwrap_or(u64::MAX);
        match self {
            Self::Offset { offset, limit } if returned >= *limit && *limit > 0 => {
                Some(Self::Offset {
                    offset: offset.saturating_add(returned),
                    limit: *limit,
                })
            }
            Self::Page { page, size } if returned >= *size && *size > 0 => Some(Self::Page {
                page: page.saturating_add(1),
                size: *size,
            }),
            _ => None,
        }
    }

    /// Template parameters this cursor fills in
    pub fn template_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match self {
            Self::Offset { offset, limit } => {
                params.insert("offset".to_string(), offset.to_string());
                params.insert("limit".to_string(), limit.to_string());
            }
            Self::Page { page, size } => {
                params.insert("page".to_string(), page.to_string());
                params.insert("size".to_string(), size.to_string());
            }
            Self::Token { value } => {
                params.insert("cursor".to_string(), value.clone());
            }
        }
        params
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset { offset, limit } => write!(f, "offset={offset},limit={limit}"),
            Self::Page { page, size } => write!(f, "page={page},size={size}"),
            Self::Token { value } => write!(f, "token={value}"),
        }
    }
}

/// One fetch invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Requested operation
    pub operation: Operation,
    /// Queried address; the collection contract for collection statistics
    pub address: String,
    /// Where to resume; `None` for the first page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// Additional named template parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl FetchRequest {
    /// Creates a first-page request
    pub fn new(operation: Operation, address: impl Into<String>) -> Self {
        Self {
            operation,
            address: address.into(),
            cursor: None,
            params: BTreeMap::new(),
        }
    }

    /// Sets the cursor to resume from
    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Adds a named template parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Raw, replayable snapshot of one fetch
///
/// Serializes to a self-contained JSON document: parsing a deserialized
/// snapshot yields exactly what parsing the original did. Credentials never
/// appear in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Operation the snapshot answers
    pub operation: Operation,
    /// HTTP status of the primary response
    pub status: u16,
    /// Provider-shaped payload
    pub data: Value,
    /// Non-fatal errors collected while fetching auxiliary data
    #[serde(default)]
    pub errors: Vec<String>,
    /// Auxiliary data parse needs, such as the queried address or directory entries
    #[serde(default)]
    pub extra: Map<String, Value>,
    /// Continuation cursor found in or derived from the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

impl FetchResult {
    /// Creates a snapshot with no errors, extras or cursor
    pub fn new(operation: Operation, status: u16, data: Value) -> Self {
        Self {
            operation,
            status,
            data,
            errors: Vec::new(),
            extra: Map::new(),
            cursor: None,
        }
    }

    /// Records an auxiliary value
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Sets the continuation cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Serializes the snapshot for storage
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Restores a stored snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Canonical entities parsed from one or more snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Parsed entities
    pub data: Vec<Entity>,
    /// Degraded or dropped records
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Errors carried over from fetching or later pages
    #[serde(default)]
    pub errors: Vec<String>,
    /// Where to resume; `None` when exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

impl ParseResult {
    /// Appends the entities and diagnostics of a later page, adopting its cursor
    pub fn absorb(&mut self, page: ParseResult) {
        self.data.extend(page.data);
        self.warnings.extend(page.warnings);
        self.errors.extend(page.errors);
        self.cursor = page.cursor;
    }

    /// Records a dropped or degraded record
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
