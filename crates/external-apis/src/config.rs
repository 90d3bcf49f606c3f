// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider configuration
//!
//! Settings are read once when the registry builds its providers; credentials
//! never change afterwards.

use std::{collections::HashMap, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{credentials::ApiKey, pagination::DEFAULT_MAX_PAGES};

/// Overrides for one provider, keyed by provider name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderSettings {
    /// Whether the provider is registered at all
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Credential supplied at construction time
    #[serde(default)]
    pub api_key: Option<ApiKey>,
    /// Replaces the provider's base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Replaces the provider's minimum interval between calls
    #[serde(default)]
    pub rate_limit_seconds: Option<f64>,
    /// Replaces the provider's per-request timeout
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            rate_limit_seconds: None,
            timeout_seconds: None,
        }
    }
}

/// Settings shared by every provider and lookup
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProvidersConfig {
    /// Upper bound on one canonical lookup, failover included
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_seconds: u64,
    /// Safety cap on pages fetched for one lookup
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Delay before the single transient retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Extra explorer definitions, merged over the bundled ones
    #[serde(default)]
    pub definitions_file: Option<PathBuf>,
    /// Per-provider overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

fn default_lookup_timeout() -> u64 {
    30
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_seconds: default_lookup_timeout(),
            max_pages: default_max_pages(),
            retry_delay_ms: default_retry_delay_ms(),
            definitions_file: None,
            providers: HashMap::new(),
        }
    }
}

impl ProvidersConfig {
    /// Settings for `name`, defaults when none are configured
    pub fn settings(&self, name: &str) -> ProviderSettings {
        self.providers.get(name).cloned().unwrap_or_default()
    }

    /// Whether `name` should be registered
    pub fn is_enabled(&self, name: &str) -> bool {
        self.providers.get(name).is_none_or(|settings| settings.enabled)
    }

    /// Lookup timeout as a duration
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }

    /// Retry delay as a duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Sets the settings of one provider
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(name.into(), settings);
        self
    }
}
