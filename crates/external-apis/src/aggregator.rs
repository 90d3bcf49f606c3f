// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical query surface
//!
//! The [`Aggregator`] answers "what does address X hold on chain Y" by trying
//! the providers registered for the chain in order. Errors that another
//! provider cannot fix stop the failover at once; every other failure is
//! collected and reported if no provider succeeds.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use api_client::{Cursor, FetchRequest, Operation, ParseResult, Provider, ProviderError};
use serde::{Deserialize, Serialize};
use shared_types::{
    BalanceItem, Blockchain, Entity, NftCollectionStats, NftOffer, NftToken, TransactionItem,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    merge::merge_balances,
    pagination::{fetch_page, paginate},
};

/// Where a paged lookup resumes: the provider that served the page and its cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Provider that issued the cursor
    pub provider: String,
    /// Provider-specific cursor
    pub cursor: Cursor,
}

/// Canonical entities returned by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup<T> {
    /// Provider that answered
    pub provider: String,
    /// Parsed entities
    pub items: Vec<T>,
    /// Dropped records and other degradations
    pub warnings: Vec<String>,
    /// Partial failures, e.g. a later page that could not be fetched
    pub errors: Vec<String>,
    /// Continuation for the next page, when more data is available
    pub next: Option<Continuation>,
}

impl<T> Lookup<T> {
    fn from_parse(provider: &str, result: ParseResult, extract: fn(Entity) -> Option<T>) -> Self {
        Self {
            provider: provider.to_string(),
            items: result.data.into_iter().filter_map(extract).collect(),
            warnings: result.warnings,
            errors: result.errors,
            next: result.cursor.map(|cursor| Continuation {
                provider: provider.to_string(),
                cursor,
            }),
        }
    }
}

/// One provider's failure during failover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider name
    pub provider: String,
    /// What went wrong
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Errors of a canonical lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum AggregateError {
    /// No registered provider serves the operation on the chain
    #[error("no provider supports {operation} on {blockchain}")]
    NoProviders {
        blockchain: Blockchain,
        operation: Operation,
    },

    /// A continuation named a provider that is not registered for the chain
    #[error("provider `{provider}` does not serve {operation} on {blockchain}")]
    UnknownProvider {
        provider: String,
        blockchain: Blockchain,
        operation: Operation,
    },

    /// A provider failed in a way no other provider can fix
    #[error("{provider}: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Every provider failed
    #[error("all providers failed: {}", join(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    /// The lookup, failover included, took too long
    #[error("lookup timed out after {seconds} seconds")]
    LookupTimeout { seconds: u64 },
}

fn join(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Whether a lookup drains every page or returns one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paging {
    All,
    One,
}

/// Providers built for each chain, in failover order
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: HashMap<Blockchain, Vec<Arc<dyn Provider>>>,
    lookup_timeout: Duration,
    max_pages: usize,
}

impl Aggregator {
    /// Creates an aggregator over already built providers
    pub fn new(
        providers: HashMap<Blockchain, Vec<Arc<dyn Provider>>>,
        lookup_timeout: Duration,
        max_pages: usize,
    ) -> Self {
        Self {
            providers,
            lookup_timeout,
            max_pages,
        }
    }

    /// Chains with at least one provider, sorted by identifier
    pub fn chains(&self) -> Vec<Blockchain> {
        let mut chains: Vec<_> = self
            .providers
            .iter()
            .filter(|(_, providers)| !providers.is_empty())
            .map(|(chain, _)| *chain)
            .collect();
        chains.sort_by_key(|chain| chain.as_str());
        chains
    }

    /// Providers serving `blockchain`, in failover order
    pub fn providers(&self, blockchain: Blockchain) -> &[Arc<dyn Provider>] {
        self.providers
            .get(&blockchain)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of provider instances
    pub fn provider_count(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    /// Every fungible balance of `address`, merged by coin
    ///
    /// # Errors
    ///
    /// See [`AggregateError`].
    pub async fn get_balance(
        &self,
        blockchain: Blockchain,
        address: &str,
    ) -> Result<Lookup<BalanceItem>, AggregateError> {
        let mut lookup = self
            .lookup(
                blockchain,
                Operation::Balance,
                address,
                None,
                Paging::All,
                Entity::into_balance,
            )
            .await?;
        lookup.items = merge_balances(lookup.items);
        Ok(lookup)
    }

    /// One page of transfer history
    ///
    /// # Errors
    ///
    /// See [`AggregateError`].
    pub async fn get_transactions(
        &self,
        blockchain: Blockchain,
        address: &str,
        page: Option<Continuation>,
    ) -> Result<Lookup<TransactionItem>, AggregateError> {
        self.lookup(
            blockchain,
            Operation::Transactions,
            address,
            page,
            Paging::One,
            Entity::into_transaction,
        )
        .await
    }

    /// One page of held NFTs
    ///
    /// # Errors
    ///
    /// See [`AggregateError`].
    pub async fn get_nfts(
        &self,
        blockchain: Blockchain,
        address: &str,
        page: Option<Continuation>,
    ) -> Result<Lookup<NftToken>, AggregateError> {
        self.lookup(
            blockchain,
            Operation::Nfts,
            address,
            page,
            Paging::One,
            Entity::into_nft,
        )
        .await
    }

    /// Every open bid and listing involving `address`
    ///
    /// # Errors
    ///
    /// See [`AggregateError`].
    pub async fn get_nft_offers(
        &self,
        blockchain: Blockchain,
        address: &str,
    ) -> Result<Lookup<NftOffer>, AggregateError> {
        self.lookup(
            blockchain,
            Operation::NftOffers,
            address,
            None,
            Paging::All,
            Entity::into_nft_offer,
        )
        .await
    }

    /// Market statistics of a collection contract
    ///
    /// # Errors
    ///
    /// See [`AggregateError`].
    pub async fn get_collection_stats(
        &self,
        blockchain: Blockchain,
        contract: &str,
    ) -> Result<Lookup<NftCollectionStats>, AggregateError> {
        self.lookup(
            blockchain,
            Operation::CollectionStats,
            contract,
            None,
            Paging::One,
            Entity::into_collection_stats,
        )
        .await
    }

    async fn lookup<T>(
        &self,
        blockchain: Blockchain,
        operation: Operation,
        address: &str,
        page: Option<Continuation>,
        paging: Paging,
        extract: fn(Entity) -> Option<T>,
    ) -> Result<Lookup<T>, AggregateError> {
        let failover = self.failover(blockchain, operation, address, page, paging, extract);
        tokio::time::timeout(self.lookup_timeout, failover)
            .await
            .map_err(|_| {
                warn!(
                    blockchain = %blockchain,
                    operation = %operation,
                    timeout_seconds = self.lookup_timeout.as_secs(),
                    "lookup timed out"
                );
                AggregateError::LookupTimeout {
                    seconds: self.lookup_timeout.as_secs(),
                }
            })?
    }

    fn candidates(
        &self,
        blockchain: Blockchain,
        operation: Operation,
        pinned: Option<&str>,
    ) -> Result<Vec<Arc<dyn Provider>>, AggregateError> {
        let candidates: Vec<_> = self
            .providers(blockchain)
            .iter()
            .filter(|provider| provider.supports(operation))
            .filter(|provider| pinned.is_none_or(|name| provider.name() == name))
            .cloned()
            .collect();

        match (candidates.is_empty(), pinned) {
            (false, _) => Ok(candidates),
            (true, Some(name)) => Err(AggregateError::UnknownProvider {
                provider: name.to_string(),
                blockchain,
                operation,
            }),
            (true, None) => Err(AggregateError::NoProviders {
                blockchain,
                operation,
            }),
        }
    }

    async fn failover<T>(
        &self,
        blockchain: Blockchain,
        operation: Operation,
        address: &str,
        page: Option<Continuation>,
        paging: Paging,
        extract: fn(Entity) -> Option<T>,
    ) -> Result<Lookup<T>, AggregateError> {
        let (pinned, cursor) = match page {
            Some(Continuation { provider, cursor }) => (Some(provider), Some(cursor)),
            None => (None, None),
        };
        let candidates = self.candidates(blockchain, operation, pinned.as_deref())?;

        let mut failures = Vec::new();
        for provider in candidates {
            let request = FetchRequest::new(operation, address).with_cursor(cursor.clone());
            debug!(
                provider = provider.name(),
                blockchain = %blockchain,
                operation = %operation,
                "trying provider"
            );

            let outcome = match paging {
                Paging::All => paginate(provider.as_ref(), request, self.max_pages).await,
                Paging::One => fetch_page(provider.as_ref(), &request).await,
            };

            match outcome {
                Ok(result) => {
                    info!(
                        provider = provider.name(),
                        blockchain = %blockchain,
                        operation = %operation,
                        records = result.data.len(),
                        warnings = result.warnings.len(),
                        "lookup served"
                    );
                    return Ok(Lookup::from_parse(provider.name(), result, extract));
                }
                Err(error) if error.is_terminal() => {
                    debug!(provider = provider.name(), error = %error, "stopping failover");
                    return Err(AggregateError::Provider {
                        provider: provider.name().to_string(),
                        source: error,
                    });
                }
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        operation = %operation,
                        error = %error,
                        "provider failed, trying next"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        error!(
            blockchain = %blockchain,
            operation = %operation,
            attempts = failures.len(),
            "all providers failed"
        );
        Err(AggregateError::AllProvidersFailed { failures })
    }
}
