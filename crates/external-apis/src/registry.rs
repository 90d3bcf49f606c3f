// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider registry
//!
//! Registration is explicit: each chain maps to an ordered list of named
//! factories, and the order is the failover order. Factories run once, when
//! [`ProviderRegistry::build`] applies the [`ProvidersConfig`], so settings and
//! credentials are fixed for the lifetime of the resulting [`Aggregator`].

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use api_client::{Provider, ProviderError};
use shared_types::Blockchain;
use tracing::{debug, info, warn};

use crate::{
    aggregator::Aggregator,
    config::{ProviderSettings, ProvidersConfig},
    definitions::{DefinitionError, ExplorerDefinitions},
    explorer::{ExplorerConfig, ExplorerProvider},
    portfolio::{PortfolioConfig, PortfolioProvider},
    resolver::ChainResolver,
};

/// Everything a factory may use to build its provider
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Settings configured for the provider's name
    pub settings: ProviderSettings,
    /// Delay before the single transient retry
    pub retry_delay: Duration,
    /// Shared chain identifier resolver
    pub resolver: Arc<ChainResolver>,
}

/// Builds one provider instance
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderContext) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    name: String,
    factory: ProviderFactory,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Chain to ordered provider factories
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    chains: HashMap<Blockchain, Vec<Registration>>,
    resolver: Arc<ChainResolver>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry with the built-in resolver sources
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
            resolver: Arc::new(ChainResolver::new()),
        }
    }

    /// Bundled explorers followed by the DeBank portfolio indexer
    ///
    /// # Errors
    ///
    /// Fails only if the bundled definitions are broken.
    pub fn standard() -> Result<Self, DefinitionError> {
        let mut registry = Self::new();
        registry.register_definitions(ExplorerDefinitions::bundled()?);
        registry.register_portfolio(&PortfolioConfig::debank("https://pro-openapi.debank.com"));
        Ok(registry)
    }

    /// The standard registry plus the definitions file named in `config`
    ///
    /// # Errors
    ///
    /// Returns a `DefinitionError` when the definitions file cannot be used.
    pub async fn configured(config: &ProvidersConfig) -> Result<Self, DefinitionError> {
        let mut registry = Self::standard()?;
        if let Some(path) = &config.definitions_file {
            registry.register_definitions(ExplorerDefinitions::from_file(path).await?);
        }
        Ok(registry)
    }

    /// Shared resolver handed to every factory
    pub fn resolver(&self) -> &Arc<ChainResolver> {
        &self.resolver
    }

    /// Appends a factory to the chain's failover order
    ///
    /// A factory registered again under the same name replaces the earlier
    /// one in place.
    pub fn register<F>(&mut self, blockchain: Blockchain, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderContext) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync + 'static,
    {
        let registration = Registration {
            name: name.into(),
            factory: Arc::new(factory),
        };
        let providers = self.chains.entry(blockchain).or_default();
        match providers
            .iter_mut()
            .find(|existing| existing.name == registration.name)
        {
            Some(existing) => {
                debug!(provider = %registration.name, blockchain = %blockchain, "replacing registration");
                *existing = registration;
            }
            None => providers.push(registration),
        }
    }

    /// Registers an already built provider under its own name and chain
    pub fn register_provider(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        self.register(provider.blockchain(), name, move |_| Ok(Arc::clone(&provider)));
    }

    /// Registers a configuration-driven explorer
    pub fn register_explorer(&mut self, config: ExplorerConfig) {
        let blockchain = config.blockchain;
        let name = config.name.clone();
        self.register(blockchain, name, move |context| {
            let mut config = config.clone();
            let settings = &context.settings;
            if let Some(base_url) = &settings.base_url {
                config.base_url.clone_from(base_url);
            }
            if let Some(rate_limit) = settings.rate_limit_seconds {
                config.rate_limit_seconds = rate_limit;
            }
            if let Some(timeout) = settings.timeout_seconds {
                config.timeout_seconds = timeout;
            }
            let provider =
                ExplorerProvider::new(config, settings.api_key.clone(), context.retry_delay)?;
            Ok(Arc::new(provider) as Arc<dyn Provider>)
        });
    }

    /// Registers every explorer of `definitions`, in order
    pub fn register_definitions(&mut self, definitions: ExplorerDefinitions) {
        for explorer in definitions.explorers {
            self.register_explorer(explorer);
        }
    }

    /// Registers a portfolio indexer on every chain its slug table names
    ///
    /// Indexers require an API key; without one the provider is skipped at
    /// build time.
    pub fn register_portfolio(&mut self, config: &PortfolioConfig) {
        for blockchain in self.resolver.chains(&config.chain_source) {
            let config = config.clone();
            let name = config.name.clone();
            self.register(blockchain, name, move |context| {
                let mut config = config.clone();
                let settings = &context.settings;
                let api_key = settings.api_key.clone().ok_or_else(|| {
                    ProviderError::config(format!("{} requires an API key", config.name))
                })?;
                if let Some(base_url) = &settings.base_url {
                    config.base_url.clone_from(base_url);
                }
                if let Some(rate_limit) = settings.rate_limit_seconds {
                    config.rate_limit_seconds = rate_limit;
                }
                if let Some(timeout) = settings.timeout_seconds {
                    config.timeout_seconds = timeout;
                }
                let provider = PortfolioProvider::new(
                    config,
                    blockchain,
                    Some(api_key),
                    context.retry_delay,
                    Arc::clone(&context.resolver),
                )?;
                Ok(Arc::new(provider) as Arc<dyn Provider>)
            });
        }
    }

    /// Provider names registered for `blockchain`, in failover order
    pub fn names(&self, blockchain: Blockchain) -> Vec<&str> {
        self.chains
            .get(&blockchain)
            .into_iter()
            .flatten()
            .map(|registration| registration.name.as_str())
            .collect()
    }

    /// Runs every enabled factory
    ///
    /// Disabled providers are left out; a factory that fails is logged and
    /// left out so one misconfigured provider cannot take the service down.
    pub fn build(&self, config: &ProvidersConfig) -> Aggregator {
        let mut providers: HashMap<Blockchain, Vec<Arc<dyn Provider>>> = HashMap::new();

        for (blockchain, registrations) in &self.chains {
            for registration in registrations {
                if !config.is_enabled(&registration.name) {
                    debug!(provider = %registration.name, blockchain = %blockchain, "provider disabled");
                    continue;
                }
                let context = ProviderContext {
                    settings: config.settings(&registration.name),
                    retry_delay: config.retry_delay(),
                    resolver: Arc::clone(&self.resolver),
                };
                match (registration.factory)(&context) {
                    Ok(provider) => providers.entry(*blockchain).or_default().push(provider),
                    Err(error) => warn!(
                        provider = %registration.name,
                        blockchain = %blockchain,
                        error = %error,
                        "provider not available"
                    ),
                }
            }
        }

        let aggregator = Aggregator::new(providers, config.lookup_timeout(), config.max_pages);
        info!(
            chains = aggregator.chains().len(),
            providers = aggregator.provider_count(),
            "providers ready"
        );
        aggregator
    }
}
