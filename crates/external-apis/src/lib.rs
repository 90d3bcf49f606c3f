// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider machinery and reference providers
//!
//! This crate turns heterogeneous blockchain data sources into canonical
//! entities and answers lookups across them with failover.
//!
//! # Architecture
//!
//! - **Shared Fetching**: [`http::HttpFetcher`] renders endpoint templates,
//!   waits on the per-provider [`rate_limit::RateLimiter`], classifies
//!   failures and retries transient ones exactly once
//! - **Pagination**: [`pagination::paginate`] drives offset, page and token
//!   cursors with a loop guard
//! - **Normalization Helpers**: [`resolver::ChainResolver`],
//!   [`cache::MetadataCache`] and [`merge::merge_balances`]
//! - **Providers**: the configuration-driven [`explorer::ExplorerProvider`] and
//!   the [`portfolio::PortfolioProvider`] indexer
//! - **Registry Pattern**: [`registry::ProviderRegistry`] builds the
//!   [`aggregator::Aggregator`], the canonical query surface
//!
//! # Features
//!
//! - **Automatic Failover**: providers are tried in registration order; errors
//!   no other provider can fix stop the lookup at once
//! - **Replayable Snapshots**: fetch output serializes to JSON and parses the
//!   same way offline
//! - **Static Definitions**: explorers can be declared in YAML

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod definitions;
pub mod explorer;
pub mod fields;
pub mod http;
pub mod merge;
pub mod pagination;
pub mod portfolio;
pub mod rate_limit;
pub mod registry;
pub mod resolver;

pub use aggregator::{AggregateError, Aggregator, Continuation, Lookup, ProviderFailure};
pub use cache::{MetadataCache, MetadataCacheStats};
pub use config::{ProviderSettings, ProvidersConfig};
pub use credentials::{ApiKey, Credentials, KeyPlacement};
pub use definitions::{DefinitionError, ExplorerDefinitions};
pub use explorer::{ExplorerConfig, ExplorerProvider, NativeCoin, OperationMapping};
pub use http::{FetcherConfig, HttpFetcher, HttpResponse};
pub use merge::merge_balances;
pub use pagination::{DEFAULT_MAX_PAGES, fetch_page, paginate};
pub use portfolio::{PortfolioConfig, PortfolioProvider};
pub use rate_limit::RateLimiter;
pub use registry::{ProviderContext, ProviderFactory, ProviderRegistry};
pub use resolver::ChainResolver;
