// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Generic explorer provider
//!
//! Most explorer REST APIs differ only in their URLs, their response field
//! names and their error vocabulary. [`ExplorerProvider`] is one provider type
//! driven entirely by an [`ExplorerConfig`]: endpoint templates say where to
//! fetch, and per-operation JSON pointer maps say where each canonical field
//! lives in the response.
//!
//! Field names understood by each operation:
//!
//! | operation          | required                                   | optional |
//! |--------------------|--------------------------------------------|----------|
//! | `balance`          | `amount`                                   | `contract`, `symbol`, `name`, `decimals`, `standard`, `asset_type`, `updated_at` |
//! | `transactions`     | `hash`, `from`, `amount`                   | `to`, `fee`, `block_height`, `timestamp`, `status`, coin fields |
//! | `nfts`             | `contract`, `token_id`                     | `amount`, `standard`, `name`, `collection_name`, `image_url`, `animation_url`, `metadata_url` |
//! | `nft_offers`       | `offer_id`, `direction`, `maker`, `contract`, `price` | `taker`, `token_id`, `expires_at`, `price_contract`, `price_symbol`, `price_decimals` |
//! | `collection_stats` |                                            | `contract`, `name`, `floor_price`, `volume`, `owners`, `items`, `sales_24h`, price coin fields |
//!
//! Records without a `contract` are priced in the chain's native coin.

use std::{collections::BTreeMap, time::Duration};

use alloy_primitives::Address;
use api_client::{
    Cursor, EndpointTemplate, ErrorPatterns, FetchRequest, FetchResult, Operation,
    PaginationStyle, ParseResult, Provider, ProviderError,
};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared_types::{
    AssetType, BalanceItem, Blockchain, Coin, Entity, NftCollectionStats, NftOffer,
    NftReference, NftToken, OfferDirection, PricedLeg, TokenStandard, TransactionItem,
    TransactionStatus, TransferDirection, amount,
};
use tracing::{debug, warn};

use crate::{
    credentials::{ApiKey, Credentials, KeyPlacement},
    fields,
    http::{FetcherConfig, HttpFetcher},
};

/// Native currency of an explorer's chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCoin {
    /// Ticker, e.g. `BTC`
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Decimal places of the smallest unit
    pub decimals: u32,
}

/// Where one operation fetches from and how its records map onto canonical fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMapping {
    /// Request template
    pub endpoint: EndpointTemplate,
    /// JSON pointer to the record list; the whole body when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    /// Canonical field name to JSON pointer within a record
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Values used when a field is unmapped or absent
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Provider status labels, lowercased, to transaction status
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statuses: BTreeMap<String, TransactionStatus>,
}

impl OperationMapping {
    /// Creates a mapping for `endpoint` with no fields
    pub fn new(endpoint: EndpointTemplate) -> Self {
        Self {
            endpoint,
            items: None,
            fields: BTreeMap::new(),
            defaults: BTreeMap::new(),
            statuses: BTreeMap::new(),
        }
    }

    /// Sets the record list pointer
    #[must_use]
    pub fn with_items(mut self, pointer: impl Into<String>) -> Self {
        self.items = Some(pointer.into());
        self
    }

    /// Maps a canonical field onto a JSON pointer
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, pointer: impl Into<String>) -> Self {
        self.fields.insert(name.into(), pointer.into());
        self
    }

    /// Sets a fallback value
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    fn text(&self, record: &Value, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .and_then(|pointer| fields::text(record, pointer))
            .or_else(|| self.defaults.get(field).cloned())
    }

    fn amount(&self, record: &Value, field: &str) -> Result<u128, String> {
        self.optional_amount(record, field)?
            .ok_or_else(|| format!("missing {field}"))
    }

    fn optional_amount(&self, record: &Value, field: &str) -> Result<Option<u128>, String> {
        if let Some(found) = self
            .fields
            .get(field)
            .and_then(|pointer| fields::lookup(record, pointer))
        {
            return fields::amount_value(found).map(Some);
        }
        self.defaults
            .get(field)
            .map(|value| amount::parse_raw(value).map_err(|e| e.to_string()))
            .transpose()
    }

    fn unsigned(&self, record: &Value, field: &str) -> Option<u64> {
        self.fields
            .get(field)
            .and_then(|pointer| fields::unsigned(record, pointer))
            .or_else(|| self.defaults.get(field).and_then(|v| v.parse().ok()))
    }

    fn timestamp(&self, record: &Value, field: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.fields
            .get(field)
            .and_then(|pointer| fields::timestamp(record, pointer))
    }

    fn status(&self, record: &Value) -> TransactionStatus {
        let Some(label) = self.text(record, "status") else {
            return TransactionStatus::Success;
        };
        let label = label.trim().to_lowercase();
        if let Some(status) = self.statuses.get(&label) {
            return *status;
        }
        match label.as_str() {
            "failed" | "fail" | "failure" | "error" | "reverted" | "0" => TransactionStatus::Failed,
            "pending" | "unconfirmed" | "queued" | "mempool" => TransactionStatus::Pending,
            _ => TransactionStatus::Success,
        }
    }
}

/// Static description of one explorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Unique provider name
    pub name: String,
    /// Chain served
    pub blockchain: Blockchain,
    /// API base URL
    pub base_url: String,
    /// Minimum seconds between two calls
    #[serde(default)]
    pub rate_limit_seconds: f64,
    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Regular expression a valid address must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_pattern: Option<String>,
    /// Native currency
    pub native_coin: NativeCoin,
    /// Standard assumed for tokens that do not report one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_standard: Option<TokenStandard>,
    /// Where the API key goes, if the explorer takes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<KeyPlacement>,
    /// Explorer-specific error vocabulary, added to the standard one
    #[serde(default)]
    pub errors: ErrorPatterns,
    /// Supported operations
    #[serde(default)]
    pub operations: BTreeMap<Operation, OperationMapping>,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl ExplorerConfig {
    /// Creates a configuration without operations
    pub fn new(
        name: impl Into<String>,
        blockchain: Blockchain,
        base_url: impl Into<String>,
        native_coin: NativeCoin,
    ) -> Self {
        Self {
            name: name.into(),
            blockchain,
            base_url: base_url.into(),
            rate_limit_seconds: 0.0,
            timeout_seconds: default_timeout_seconds(),
            address_pattern: None,
            native_coin,
            token_standard: None,
            api_key: None,
            errors: ErrorPatterns::default(),
            operations: BTreeMap::new(),
        }
    }

    /// Adds an operation
    #[must_use]
    pub fn with_operation(mut self, operation: Operation, mapping: OperationMapping) -> Self {
        self.operations.insert(operation, mapping);
        self
    }
}

/// Explorer REST API adapted through an [`ExplorerConfig`]
#[derive(Debug)]
pub struct ExplorerProvider {
    config: ExplorerConfig,
    fetcher: HttpFetcher,
    address_pattern: Option<Regex>,
}

impl ExplorerProvider {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` for an invalid base URL or
    /// address pattern.
    pub fn new(
        config: ExplorerConfig,
        api_key: Option<ApiKey>,
        retry_delay: Duration,
    ) -> Result<Self, ProviderError> {
        let address_pattern = config
            .address_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| {
                ProviderError::config(format!("invalid address pattern for {}: {e}", config.name))
            })?;

        let credentials = api_key.map(|key| Credentials {
            placement: config.api_key.clone().unwrap_or(KeyPlacement::Header {
                name: "X-API-Key".to_string(),
            }),
            key,
        });
        if credentials.is_none() && config.api_key.is_some() {
            debug!(provider = %config.name, "no API key configured, using anonymous access");
        }

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
            config,
            fetcher,
            address_pattern,
        })
    }

    /// Static configuration
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    fn mapping(&self, operation: Operation) -> Result<&OperationMapping, ProviderError> {
        self.config
            .operations
            .get(&operation)
            .ok_or_else(|| ProviderError::Unsupported {
                provider: self.config.name.clone(),
                operation,
            })
    }

    /// Coin described by the `{prefix}contract`, `{prefix}symbol`, ... fields
    fn coin(&self, mapping: &OperationMapping, record: &Value, prefix: &str) -> Result<Coin, String> {
        let field = |name: &str| format!("{prefix}{name}");
        let native = &self.config.native_coin;

        let Some(contract) = mapping.text(record, &field("contract")) else {
            return Ok(Coin::native(
                &native.symbol,
                &native.name,
                native.decimals,
                self.config.blockchain,
            ));
        };

        let symbol = mapping
            .text(record, &field("symbol"))
            .ok_or_else(|| format!("token {contract} has no symbol"))?;
        let decimals = mapping
            .unsigned(record, &field("decimals"))
            .ok_or_else(|| format!("token {contract} has no decimals"))?;
        let decimals = u32::try_from(decimals)
            .map_err(|_| format!("token {contract} has invalid decimals {decimals}"))?;
        let name = mapping
            .text(record, &field("name"))
            .unwrap_or_else(|| symbol.clone());

        let mut coin =
            Coin::new(symbol, name, decimals, self.config.blockchain).with_address(contract);
        let standard = mapping
            .text(record, &field("standard"))
            .map(|label| TokenStandard::parse(&label))
            .or_else(|| self.config.token_standard.clone());
        if let Some(standard) = standard {
            coin = coin.with_standards(vec![standard]);
        }
        Ok(coin)
    }

    fn parse_balance(&self, mapping: &OperationMapping, record: &Value) -> Result<Entity, String> {
        let balance_raw = mapping.amount(record, "amount")?;
        let coin = self.coin(mapping, record, "")?;
        let asset_type = mapping
            .text(record, "asset_type")
            .map_or(AssetType::Available, |label| AssetType::from_label(&label));

        let item = BalanceItem::new(coin, balance_raw, asset_type, record.clone())
            .map_err(|e| e.to_string())?
            .with_last_updated(mapping.timestamp(record, "updated_at"));
        Ok(item.into())
    }

    fn parse_transaction(
        &self,
        mapping: &OperationMapping,
        record: &Value,
        address: &str,
    ) -> Result<Entity, String> {
        let hash = mapping.text(record, "hash").ok_or("missing hash")?;
        let from = mapping.text(record, "from").ok_or("missing sender")?;
        let to = mapping.text(record, "to");
        let amount_raw = mapping.amount(record, "amount")?;
        let coin = self.coin(mapping, record, "")?;
        let amount = amount::scale(amount_raw, coin.decimals).map_err(|e| e.to_string())?;
        let fee_raw = mapping.optional_amount(record, "fee")?;

        let direction = TransferDirection::relative_to(
            address,
            &from,
            to.as_deref(),
            self.config.blockchain.is_evm(),
        );

        Ok(TransactionItem {
            hash,
            blockchain: self.config.blockchain,
            from,
            to,
            coin,
            amount_raw,
            amount,
            fee_raw,
            block_height: mapping.unsigned(record, "block_height"),
            timestamp: mapping.timestamp(record, "timestamp"),
            status: mapping.status(record),
            direction,
            raw: record.clone(),
        }
        .into())
    }

    fn parse_nft(&self, mapping: &OperationMapping, record: &Value) -> Result<Entity, String> {
        let contract = mapping.text(record, "contract").ok_or("missing contract")?;
        let token_id = mapping.text(record, "token_id").ok_or("missing token id")?;
        let amount = mapping.optional_amount(record, "amount")?.unwrap_or(1);
        let standard = mapping.text(record, "standard").map_or_else(
            || {
                if self.config.blockchain.is_evm() {
                    TokenStandard::Erc721
                } else {
                    TokenStandard::Other("nft".to_string())
                }
            },
            |label| TokenStandard::parse(&label),
        );

        Ok(NftToken {
            blockchain: self.config.blockchain,
            contract,
            token_id,
            standard,
            amount,
            name: mapping.text(record, "name"),
            collection_name: mapping.text(record, "collection_name"),
            image_url: mapping.text(record, "image_url"),
            animation_url: mapping.text(record, "animation_url"),
            metadata_url: mapping.text(record, "metadata_url"),
            raw: record.clone(),
        }
        .into())
    }

    fn parse_offer(&self, mapping: &OperationMapping, record: &Value) -> Result<Entity, String> {
        let offer_id = mapping.text(record, "offer_id").ok_or("missing offer id")?;
        let label = mapping.text(record, "direction").ok_or("missing direction")?;
        let direction = OfferDirection::from_label(&label)
            .ok_or_else(|| format!("unknown offer direction `{label}`"))?;
        let maker = mapping.text(record, "maker").ok_or("missing maker")?;
        let contract = mapping.text(record, "contract").ok_or("missing contract")?;

        let price_raw = mapping.amount(record, "price")?;
        let price_coin = self.coin(mapping, record, "price_")?;
        let price = PricedLeg::new(price_coin, price_raw).map_err(|e| e.to_string())?;

        Ok(NftOffer {
            blockchain: self.config.blockchain,
            offer_id,
            direction,
            maker,
            taker: mapping.text(record, "taker"),
            token: NftReference {
                contract,
                token_id: mapping.text(record, "token_id"),
            },
            price: vec![price],
            expires_at: mapping.timestamp(record, "expires_at"),
            raw: record.clone(),
        }
        .into())
    }

    fn parse_collection_stats(
        &self,
        mapping: &OperationMapping,
        record: &Value,
        queried: &str,
    ) -> Result<Entity, String> {
        let contract = mapping
            .text(record, "contract")
            .unwrap_or_else(|| queried.to_string());
        if contract.is_empty() {
            return Err("missing contract".to_string());
        }

        let leg = |field: &str| -> Result<Option<PricedLeg>, String> {
            mapping
                .optional_amount(record, field)?
                .map(|raw| {
                    let coin = self.coin(mapping, record, "price_")?;
                    PricedLeg::new(coin, raw).map_err(|e| e.to_string())
                })
                .transpose()
        };

        Ok(NftCollectionStats {
            blockchain: self.config.blockchain,
            contract,
            name: mapping.text(record, "name"),
            floor_price: leg("floor_price")?,
            total_volume: leg("volume")?,
            owners: mapping.unsigned(record, "owners"),
            items: mapping.unsigned(record, "items"),
            sales_24h: mapping.unsigned(record, "sales_24h"),
            raw: record.clone(),
        }
        .into())
    }
}

#[async_trait]
impl Provider for ExplorerProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn blockchain(&self) -> Blockchain {
        self.config.blockchain
    }

    fn supports(&self, operation: Operation) -> bool {
        self.config.operations.contains_key(&operation)
    }

    fn validate_address(&self, address: &str) -> Result<(), ProviderError> {
        let invalid = |reason: String| ProviderError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        if address.trim().is_empty() {
            return Err(invalid("address is empty".to_string()));
        }
        if let Some(pattern) = &self.address_pattern {
            if !pattern.is_match(address) {
                return Err(invalid(format!(
                    "not a valid {} address",
                    self.config.blockchain.name()
                )));
            }
        } else if self.config.blockchain.is_evm() {
            address
                .parse::<Address>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ProviderError> {
        let mapping = self.mapping(request.operation)?;
        self.validate_address(&request.address)?;

        let mut params = request.params.clone();
        params.insert("address".to_string(), request.address.clone());
        if request.operation == Operation::CollectionStats {
            params
                .entry("contract".to_string())
                .or_insert_with(|| request.address.clone());
        }

        let cursor = mapping.endpoint.pagination.as_ref().and_then(|style| {
            request
                .cursor
                .clone()
                .or_else(|| style.first_cursor())
        });
        if let Some(cursor) = &cursor {
            params.extend(cursor.template_params());
        }

        let response = self
            .fetcher
            .get(request.operation.as_str(), &mapping.endpoint, &params)
            .await?;

        let next = match &mapping.endpoint.pagination {
            None => None,
            Some(PaginationStyle::Cursor { next }) => {
                fields::text(&response.body, next).map(|value| Cursor::Token { value })
            }
            Some(PaginationStyle::Offset { .. } | PaginationStyle::Page { .. }) => {
                let returned = fields::records(&response.body, mapping.items.as_deref())
                    .map_or(0, |records| records.len());
                cursor.as_ref().and_then(|cursor| cursor.advance(returned))
            }
        };

        debug!(
            provider = %self.config.name,
            operation = %request.operation,
            status = response.status,
            has_next = next.is_some(),
            "explorer fetch complete"
        );

        let mut fetched = FetchResult::new(request.operation, response.status, response.body)
            .with_extra("address", json!(request.address))
            .with_cursor(next);
        if let Some(cursor) = &cursor {
            let requested = serde_json::to_value(cursor).map_err(ProviderError::invalid_response)?;
            fetched = fetched.with_extra("request_cursor", requested);
        }
        Ok(fetched)
    }

    fn parse(&self, fetched: &FetchResult) -> ParseResult {
        let mut result = ParseResult {
            errors: fetched.errors.clone(),
            cursor: fetched.cursor.clone(),
            ..ParseResult::default()
        };

        let Some(mapping) = self.config.operations.get(&fetched.operation) else {
            result.errors.push(format!(
                "{} does not support {}",
                self.config.name, fetched.operation
            ));
            return result;
        };

        let records = match fields::records(&fetched.data, mapping.items.as_deref()) {
            Ok(records) => records,
            Err(reason) => {
                result
                    .errors
                    .push(format!("{}: {reason}", self.config.name));
                return result;
            }
        };

        let address = fetched
            .extra
            .get("address")
            .and_then(Value::as_str)
            .unwrap_or_default();

        for (index, record) in records.into_iter().enumerate() {
            let parsed = match fetched.operation {
                Operation::Balance => self.parse_balance(mapping, record),
                Operation::Transactions => self.parse_transaction(mapping, record, address),
                Operation::Nfts => self.parse_nft(mapping, record),
                Operation::NftOffers => self.parse_offer(mapping, record),
                Operation::CollectionStats => {
                    self.parse_collection_stats(mapping, record, address)
                }
            };
            match parsed {
                Ok(entity) => result.data.push(entity),
                Err(reason) => {
                    warn!(
                        provider = %self.config.name,
                        operation = %fetched.operation,
                        index,
                        reason,
                        "dropping malformed record"
                    );
                    result.warn(format!(
                        "{}: dropped {} record {index}: {reason}",
                        self.config.name, fetched.operation
                    ));
                }
            }
        }

        result
    }
}
