// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Static explorer definitions
//!
//! Explorers that need nothing beyond templated requests and field mapping are
//! declared in YAML instead of code. A set of definitions ships with the crate
//! and deployments may add their own file.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use shared_types::Blockchain;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

use crate::explorer::ExplorerConfig;

const BUNDLED: &str = include_str!("../definitions/explorers.yaml");

/// Errors raised while loading explorer definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for [`ExplorerDefinitions`]
    #[error("failed to parse explorer definitions: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed but describes an unusable explorer
    #[error("invalid explorer `{name}`: {reason}")]
    Invalid {
        /// Explorer name
        name: String,
        /// What is wrong
        reason: String,
    },
}

/// A list of explorer configurations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorerDefinitions {
    /// Explorers in registration order
    #[serde(default)]
    pub explorers: Vec<ExplorerConfig>,
}

impl ExplorerDefinitions {
    /// Definitions shipped with the crate
    ///
    /// # Errors
    ///
    /// Fails only if the bundled document is broken.
    pub fn bundled() -> Result<Self, DefinitionError> {
        Self::from_yaml(BUNDLED)
    }

    /// Parses and validates a YAML document
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::Yaml` for malformed documents and
    /// `DefinitionError::Invalid` for unusable explorers.
    pub fn from_yaml(yaml: &str) -> Result<Self, DefinitionError> {
        let definitions: Self = serde_yaml::from_str(yaml)?;
        definitions.validate()?;
        Ok(definitions)
    }

    /// Loads definitions from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::Io` when the file cannot be read, otherwise
    /// as [`ExplorerDefinitions::from_yaml`].
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading explorer definitions");

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| DefinitionError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let definitions = Self::from_yaml(&content)?;

        info!(
            path = %path.display(),
            explorers = definitions.explorers.len(),
            "loaded explorer definitions"
        );
        Ok(definitions)
    }

    /// Checks names, chains, URLs and operations
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::Invalid` for the first unusable explorer.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut names = HashSet::new();
        for explorer in &self.explorers {
            let invalid = |reason: &str| DefinitionError::Invalid {
                name: explorer.name.clone(),
                reason: reason.to_string(),
            };

            if explorer.name.trim().is_empty() {
                return Err(invalid("name is empty"));
            }
            if !names.insert(explorer.name.as_str()) {
                return Err(invalid("name is defined twice"));
            }
            if explorer.blockchain == Blockchain::Unknown {
                return Err(invalid("blockchain is unknown"));
            }
            if let Err(e) = Url::parse(&explorer.base_url) {
                return Err(invalid(&format!("invalid base URL: {e}")));
            }
            if explorer.operations.is_empty() {
                return Err(invalid("no operations"));
            }
            if !explorer.rate_limit_seconds.is_finite() || explorer.rate_limit_seconds < 0.0 {
                return Err(invalid("rate limit must be a non-negative number of seconds"));
            }
        }
        Ok(())
    }

    /// Appends `other`, replacing explorers that share a name
    #[must_use]
    pub fn merged_with(mut self, other: Self) -> Self {
        for explorer in other.explorers {
            match self
                .explorers
                .iter_mut()
                .find(|existing| existing.name == explorer.name)
            {
                Some(existing) => *existing = explorer,
                None => self.explorers.push(explorer),
            }
        }
        self
    }
}
