// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Blockchain Data API Server Implementation
//!
//! This crate provides the HTTP server in front of the provider aggregator,
//! built with Axum and designed for production use with layered configuration,
//! request tracing and graceful shutdown.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and their HTTP status mapping
//! - [`state`]: Shared application state with cancellation token support
//! - [`server`]: Provider wiring, server lifecycle and coordinated shutdown
//! - [`routes`]: Route configuration and the canonical lookup handlers
//!
//! # Key Features
//!
//! - **Canonical Lookups**: balances, transactions, NFTs, offers and collection
//!   statistics for every chain with a registered provider
//! - **Failover**: providers are tried in registration order per chain
//! - **Opaque Cursors**: paged lookups resume at the provider that issued the page
//! - **Graceful Shutdown**: coordinated termination using `CancellationToken`

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use state::{HealthCheck, HealthStatus, ServerState};
