// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! Shared application state: configuration, the provider aggregator and the
//! cancellation token for coordinated shutdown.

use std::{collections::BTreeMap, sync::Arc};

use external_apis::Aggregator;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{Environment, ServerConfig};

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// Providers per chain, the canonical query surface
    aggregator: Arc<Aggregator>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    pub fn new(
        config: ServerConfig,
        aggregator: Arc<Aggregator>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            aggregator,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Provider aggregator
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Service status with the provider names per chain
    pub fn health_check(&self) -> HealthCheck {
        let providers: BTreeMap<String, Vec<String>> = self
            .aggregator
            .chains()
            .into_iter()
            .map(|chain| {
                let names = self
                    .aggregator
                    .providers(chain)
                    .iter()
                    .map(|provider| provider.name().to_string())
                    .collect();
                (chain.as_str().to_string(), names)
            })
            .collect();

        let status = if providers.is_empty() {
            HealthStatus::Degraded {
                reason: Box::from("no providers are configured"),
            }
        } else {
            HealthStatus::Up
        };

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            providers,
        }
    }
}

/// Health status of the service
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    /// Service is fully operational
    Up,

    /// Service answers but cannot serve lookups
    Degraded {
        /// Human-readable explanation of the degradation condition
        reason: Box<str>,
    },
}

/// Health check status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Service status
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Provider names per canonical chain identifier, in failover order
    pub providers: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::*;

    fn empty_aggregator() -> Arc<Aggregator> {
        Arc::new(Aggregator::new(HashMap::new(), Duration::from_secs(1), 1))
    }

    #[test]
    fn server_state_with_cancellation_token() {
        let token = CancellationToken::new();
        let state = ServerState::new(ServerConfig::default(), empty_aggregator(), token.clone());

        assert!(!state.cancellation_token.is_cancelled());

        token.cancel();
        assert!(state.cancellation_token.is_cancelled());
    }

    #[test]
    fn health_is_degraded_without_providers() {
        let state = ServerState::new(
            ServerConfig::for_testing(),
            empty_aggregator(),
            CancellationToken::new(),
        );
        let health = state.health_check();
        assert!(matches!(health.status, HealthStatus::Degraded { .. }));
        assert_eq!(health.environment, Environment::Testing);
        assert!(health.providers.is_empty());
    }
}
