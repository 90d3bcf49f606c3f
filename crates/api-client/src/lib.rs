// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fetch/parse provider contract
//!
//! Every blockchain data source is adapted through the same two-phase
//! interface:
//!
//! - **Fetch** performs network I/O and returns a raw, replayable
//!   [`FetchResult`] snapshot.
//! - **Parse** turns a snapshot into canonical entities. It never touches the
//!   network, and parsing the same snapshot twice yields the same
//!   [`ParseResult`].
//!
//! # Core Abstractions
//!
//! - **`Provider` Trait**: object-safe interface registered per chain
//! - **Endpoint Templates**: [`EndpointTemplate`] with required and optional placeholders
//! - **Cursors**: explicit [`Cursor`] data passed between pages
//! - **Error Taxonomy**: [`classify`] and the typed [`ProviderError`]

use async_trait::async_trait;
use shared_types::Blockchain;

pub mod endpoint;
pub mod error;
pub mod types;

pub use endpoint::{EndpointTemplate, PaginationStyle, RenderedEndpoint};
pub use error::{
    ErrorClass, ErrorPatterns, ProviderError, StatusEnvelope, classify, failure_message,
};
pub use types::{Cursor, FetchRequest, FetchResult, Operation, ParseResult};

/// A blockchain data source adapted to the canonical model
///
/// Implementations hold their own rate-limit clock and metadata cache and
/// must tolerate concurrent lookups for different addresses.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Unique provider name, used in logs and configuration
    fn name(&self) -> &str;

    /// Chain this instance serves
    fn blockchain(&self) -> Blockchain;

    /// Whether the provider implements `operation`
    fn supports(&self, operation: Operation) -> bool;

    /// Rejects malformed addresses before any network call
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidAddress` when the address cannot be valid
    /// on this provider's chain.
    fn validate_address(&self, address: &str) -> Result<(), ProviderError> {
        if address.trim().is_empty() {
            return Err(ProviderError::InvalidAddress {
                address: address.to_string(),
                reason: "address is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Performs the network round trips for one page
    ///
    /// # Errors
    ///
    /// Returns caller errors before any network call, `AddressNotExist` as a
    /// typed condition, and transient errors once the single retry is spent.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ProviderError>;

    /// Converts a snapshot into canonical entities without I/O
    ///
    /// Malformed records are dropped with a warning instead of failing the
    /// batch.
    fn parse(&self, fetched: &FetchResult) -> ParseResult;
}
