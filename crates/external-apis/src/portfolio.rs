// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Portfolio indexer provider
//!
//! Portfolio indexers report wallet tokens and DeFi positions for every chain
//! at once. Positions reference protocols by id only, so the provider keeps
//! the indexer's protocol directory in a [`MetadataCache`] and copies the
//! entries a response refers to into the [`FetchResult`]. Parsing then needs
//! nothing but the snapshot.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use alloy_primitives::Address;
use api_client::{
    EndpointTemplate, ErrorPatterns, FetchRequest, FetchResult, Operation, ParseResult, Provider,
    ProviderError,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use shared_types::{
    AssetType, BalanceItem, Blockchain, Coin, CoinInfo, Entity, PoolInfo, Protocol,
    TokenStandard,
};
use tracing::{debug, warn};

use crate::{
    cache::MetadataCache,
    credentials::{ApiKey, Credentials, KeyPlacement},
    fields,
    http::{FetcherConfig, HttpFetcher},
    resolver::{ChainResolver, DEBANK_SOURCE},
};

/// Connection settings of a portfolio indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Provider name
    pub name: String,
    /// API base URL
    pub base_url: String,
    /// Resolver source naming the indexer's chain slugs
    #[serde(default = "default_chain_source")]
    pub chain_source: String,
    /// Minimum seconds between two calls
    #[serde(default)]
    pub rate_limit_seconds: f64,
    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Where the API key goes
    pub api_key: KeyPlacement,
    /// Indexer-specific error vocabulary, added to the standard one
    #[serde(default)]
    pub errors: ErrorPatterns,
}

fn default_chain_source() -> String {
    DEBANK_SOURCE.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl PortfolioConfig {
    /// Settings for a DeBank-compatible indexer
    pub fn debank(base_url: impl Into<String>) -> Self {
        Self {
            name: "debank".to_string(),
            base_url: base_url.into(),
            chain_source: default_chain_source(),
            rate_limit_seconds: 0.0,
            timeout_seconds: default_timeout_seconds(),
            api_key: KeyPlacement::Header {
                name: "AccessKey".to_string(),
            },
            errors: ErrorPatterns {
                address_not_exist: vec!["invalid user address".to_string()],
                retry: Vec::new(),
                error_fields: vec!["/error_code".to_string(), "/errors".to_string()],
                status_fields: Vec::new(),
            },
        }
    }
}

/// Portfolio indexer scoped to one chain
#[derive(Debug)]
pub struct PortfolioProvider {
    name: String,
    blockchain: Blockchain,
    chain_source: String,
    fetcher: HttpFetcher,
    resolver: Arc<ChainResolver>,
    directory: MetadataCache<Protocol>,
    tokens: EndpointTemplate,
    positions: EndpointTemplate,
    protocols: EndpointTemplate,
}

impl PortfolioProvider {
    /// Create a provider serving `blockchain`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` for an invalid base URL.
    pub fn new(
        config: PortfolioConfig,
        blockchain: Blockchain,
        api_key: Option<ApiKey>,
        retry_delay: Duration,
        resolver: Arc<ChainResolver>,
    ) -> Result<Self, ProviderError> {
        let credentials = api_key.map(|key| Credentials {
            placement: config.api_key.clone(),
            key,
        });
        let fetcher = HttpFetcher::new(
            config.name.clone(),
            FetcherConfig {
                base_url: config.base_url.clone(),
                timeout: Duration::from_secs(config.timeout_seconds),
                rate_limit: Duration::try_from_secs_f64(config.rate_limit_seconds)
                    .unwrap_or(Duration::ZERO),
                retry_delay,
                credentials,
                patterns: ErrorPatterns::standard().extended_with(&config.errors),
            },
        )?;

        Ok(Self {
            name: config.name,
            blockchain,
            chain_source: config.chain_source,
            fetcher,
            resolver,
            directory: MetadataCache::new(),
            tokens: EndpointTemplate::new("/v1/user/all_token_list")
                .with_query("id", "{address}")
                .with_query("is_all", "false"),
            positions: EndpointTemplate::new("/v1/user/all_complex_protocol_list")
                .with_query("id", "{address}"),
            protocols: EndpointTemplate::new("/v1/protocol/all_list"),
        })
    }

    /// Protocol directory cache
    pub fn directory(&self) -> &MetadataCache<Protocol> {
        &self.directory
    }

    async fn load_directory(&self) -> Result<HashMap<String, Protocol>, ProviderError> {
        let response = self
            .fetcher
            .get("protocol_directory", &self.protocols, &BTreeMap::new())
            .await?;
        let entries = fields::records(&response.body, None).map_err(ProviderError::invalid_response)?;

        let mut directory = HashMap::with_capacity(entries.len());
        for entry in entries {
            match self.protocol_entry(entry) {
                Ok(protocol) => {
                    directory.insert(protocol.id.clone(), protocol);
                }
                Err(reason) => debug!(provider = %self.name, %reason, "skipping directory entry"),
            }
        }
        Ok(directory)
    }

    fn protocol_entry(&self, entry: &Value) -> Result<Protocol, String> {
        let id = fields::text(entry, "/id").ok_or("missing protocol id")?;
        let chain = fields::text(entry, "/chain").ok_or("missing protocol chain")?;
        let blockchain = self
            .resolver
            .resolve(&self.chain_source, &chain)
            .ok_or_else(|| format!("unknown chain `{chain}`"))?;

        Ok(Protocol {
            name: fields::text(entry, "/name").unwrap_or_else(|| id.clone()),
            id,
            blockchain,
            total_deposits: fields::lookup(entry, "/tvl")
                .and_then(Value::as_f64)
                .and_then(|tvl| Decimal::try_from(tvl).ok()),
            site_url: fields::text(entry, "/site_url"),
            logo_url: fields::text(entry, "/logo_url"),
            has_portfolio_detail: fields::lookup(entry, "/has_supported_portfolio")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// Resolves a record's chain; `Ok(None)` means another chain
    fn record_chain(&self, record: &Value) -> Result<Option<Blockchain>, String> {
        let slug = fields::text(record, "/chain").ok_or("missing chain")?;
        match self.resolver.resolve(&self.chain_source, &slug) {
            None | Some(Blockchain::Unknown) => Err(format!("unknown chain `{slug}`")),
            Some(chain) if chain == self.blockchain => Ok(Some(chain)),
            Some(_) => Ok(None),
        }
    }

    /// Parses one token record; `Ok(None)` for tokens on other chains
    ///
    /// `scope` is the protocol holding the token for position legs. Wallet
    /// tokens are scoped only when the record names a protocol itself.
    fn token(
        &self,
        record: &Value,
        asset_type: AssetType,
        scope: Option<&str>,
    ) -> Result<Option<BalanceItem>, String> {
        let Some(blockchain) = self.record_chain(record)? else {
            return Ok(None);
        };

        let id = fields::text(record, "/id").ok_or("missing token id")?;
        let symbol = fields::text(record, "/symbol").ok_or_else(|| format!("token {id} has no symbol"))?;
        let decimals = fields::unsigned(record, "/decimals")
            .and_then(|decimals| u32::try_from(decimals).ok())
            .ok_or_else(|| format!("token {id} has no decimals"))?;
        let name = fields::text(record, "/name").unwrap_or_else(|| symbol.clone());

        let balance_raw = match fields::lookup(record, "/raw_amount_hex_str") {
            Some(hex) => fields::amount_value(hex)?,
            None => fields::raw_amount(record, "/raw_amount")?,
        };

        let mut coin = if id.parse::<Address>().is_ok() {
            Coin::new(symbol, name, decimals, blockchain)
                .with_address(id)
                .with_standards(vec![TokenStandard::Erc20])
        } else {
            Coin::native(symbol, name, decimals, blockchain)
        };
        if let Some(protocol_id) = scope
            .map(str::to_string)
            .or_else(|| fields::text(record, "/protocol_id"))
        {
            coin = coin.with_protocol_id(protocol_id);
        }
        if let Some(logo) = fields::text(record, "/logo_url") {
            coin = coin.with_info(CoinInfo {
                logo: Some(logo),
                ..CoinInfo::default()
            });
        }

        BalanceItem::new(coin, balance_raw, asset_type, record.clone())
            .map(Some)
            .map_err(|e| e.to_string())
    }

    fn parse_positions(
        &self,
        entry: &Value,
        protocols: &HashMap<String, Protocol>,
        result: &mut ParseResult,
    ) -> Result<(), String> {
        if self.record_chain(entry)?.is_none() {
            return Ok(());
        }
        let protocol_id = fields::text(entry, "/id").ok_or("missing protocol id")?;
        let protocol = protocols.get(&protocol_id).cloned();
        if protocol.is_none() {
            result.warn(format!(
                "{}: protocol {protocol_id} missing from directory, positions unattributed",
                self.name
            ));
        }

        let items = fields::records(entry, Some("/portfolio_item_list"))?;
        for (index, item) in items.into_iter().enumerate() {
            let label = fields::text(item, "/name").unwrap_or_default();
            let pool = pool_info(item, &protocol_id, &label);
            let updated = fields::timestamp(item, "/update_at");

            for (list, asset_type) in [
                ("supply_token_list", AssetType::from_label(&label)),
                ("token_list", AssetType::from_label(&label)),
                ("borrow_token_list", AssetType::Borrowed),
                ("reward_token_list", AssetType::Rewards),
            ] {
                let legs = fields::records(item, Some(format!("/detail/{list}").as_str()))?;
                for leg in legs {
                    match self.token(leg, asset_type, Some(&protocol_id)) {
                        Ok(Some(balance)) => result.data.push(Entity::Balance(
                            balance
                                .with_protocol(protocol.clone())
                                .with_pool(Some(pool.clone()))
                                .with_last_updated(updated),
                        )),
                        Ok(None) => {}
                        Err(reason) => {
                            warn!(provider = %self.name, %protocol_id, index, %reason, "dropping position leg");
                            result.warn(format!(
                                "{}: dropped {protocol_id} position {index} leg: {reason}",
                                self.name
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn pool_info(item: &Value, protocol_id: &str, label: &str) -> PoolInfo {
    let id = fields::text(item, "/pool/id")
        .or_else(|| fields::text(item, "/pool/controller"))
        .unwrap_or_else(|| format!("{protocol_id}:{label}"));
    let mut pool = PoolInfo::new(id, protocol_id);
    pool.name = Some(label.to_string()).filter(|name| !name.is_empty());
    pool.adapter_id = fields::text(item, "/pool/adapter_id");
    pool.controller = fields::text(item, "/pool/controller");
    pool.position_index = fields::text(item, "/pool/index");

    let tokens: Vec<String> = ["supply_token_list", "token_list", "borrow_token_list", "reward_token_list"]
        .iter()
        .filter_map(|list| item.pointer(&format!("/detail/{list}")).and_then(Value::as_array))
        .flatten()
        .filter_map(|leg| fields::text(leg, "/id"))
        .collect();
    pool.tokens = Some(tokens).filter(|tokens| !tokens.is_empty());
    pool
}

#[async_trait]
impl Provider for PortfolioProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn blockchain(&self) -> Blockchain {
        self.blockchain
    }

    fn supports(&self, operation: Operation) -> bool {
        operation == Operation::Balance
    }

    fn validate_address(&self, address: &str) -> Result<(), ProviderError> {
        address
            .parse::<Address>()
            .map(|_| ())
            .map_err(|e| ProviderError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ProviderError> {
        if request.operation != Operation::Balance {
            return Err(ProviderError::Unsupported {
                provider: self.name.clone(),
                operation: request.operation,
            });
        }
        self.validate_address(&request.address)?;

        let mut errors = Vec::new();
        if let Err(error) = self.directory.ensure_fresh(|| self.load_directory()).await {
            errors.push(format!("protocol directory: {error}"));
        }

        let mut params = request.params.clone();
        params.insert("address".to_string(), request.address.clone());

        let tokens = self.fetcher.get("tokens", &self.tokens, &params).await?;
        let positions = match self.fetcher.get("positions", &self.positions, &params).await {
            Ok(response) => response.body,
            Err(error) if error.is_terminal() => return Err(error),
            Err(error) => {
                warn!(provider = %self.name, error = %error, "protocol positions unavailable");
                errors.push(format!("protocol positions: {error}"));
                Value::Array(Vec::new())
            }
        };

        let mut referenced = Map::new();
        for id in positions
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|entry| fields::text(entry, "/id"))
        {
            if let Some(protocol) = self.directory.get(&id) {
                let snapshot =
                    serde_json::to_value(protocol).map_err(ProviderError::invalid_response)?;
                referenced.insert(id, snapshot);
            }
        }

        let mut fetched = FetchResult::new(
            Operation::Balance,
            tokens.status,
            json!({"tokens": tokens.body, "positions": positions}),
        )
        .with_extra("address", json!(request.address))
        .with_extra("protocols", Value::Object(referenced));
        fetched.errors = errors;
        Ok(fetched)
    }

    fn parse(&self, fetched: &FetchResult) -> ParseResult {
        let mut result = ParseResult {
            errors: fetched.errors.clone(),
            ..ParseResult::default()
        };
        if fetched.operation != Operation::Balance {
            result
                .errors
                .push(format!("{} does not support {}", self.name, fetched.operation));
            return result;
        }

        let protocols: HashMap<String, Protocol> = fetched
            .extra
            .get("protocols")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(id, snapshot)| {
                serde_json::from_value(snapshot.clone())
                    .ok()
                    .map(|protocol| (id.clone(), protocol))
            })
            .collect();

        match fields::records(&fetched.data, Some("/tokens")) {
            Ok(tokens) => {
                for (index, token) in tokens.into_iter().enumerate() {
                    match self.token(token, AssetType::Available, None) {
                        Ok(Some(item)) => result.data.push(Entity::Balance(item)),
                        Ok(None) => {}
                        Err(reason) => {
                            warn!(provider = %self.name, index, %reason, "dropping wallet token");
                            result.warn(format!(
                                "{}: dropped token record {index}: {reason}",
                                self.name
                            ));
                        }
                    }
                }
            }
            Err(reason) => result.errors.push(format!("{}: {reason}", self.name)),
        }

        match fields::records(&fetched.data, Some("/positions")) {
            Ok(entries) => {
                for (index, entry) in entries.into_iter().enumerate() {
                    if let Err(reason) = self.parse_positions(entry, &protocols, &mut result) {
                        warn!(provider = %self.name, index, %reason, "dropping protocol entry");
                        result.warn(format!(
                            "{}: dropped protocol record {index}: {reason}",
                            self.name
                        ));
                    }
                }
            }
            Err(reason) => result.errors.push(format!("{}: {reason}", self.name)),
        }

        result
    }
}
