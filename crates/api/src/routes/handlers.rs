// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Every lookup handler parses the canonical chain identifier from the path,
//! calls the matching [`Aggregator`](external_apis::Aggregator) operation and
//! wraps the result in a [`LookupResponse`]. Paged lookups hand their
//! continuation to the client as an opaque `cursor` string (base64url of the
//! continuation's JSON), which the client sends back unchanged to get the
//! next page.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use external_apis::{Continuation, Lookup};
use serde::{Deserialize, Serialize};
use shared_types::{BalanceItem, Blockchain, NftCollectionStats, NftOffer, NftToken, TransactionItem};
use tracing::{debug, warn};

use crate::{
    error::ServerError,
    state::{HealthCheck, ServerState},
};

/// Health check endpoint handler
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthCheck> {
    Json(state.health_check())
}

/// A chain with at least one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSummary {
    /// Canonical identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// EVM chain id, for EVM chains
    pub evm_chain_id: Option<u64>,
    /// Provider names in failover order
    pub providers: Vec<String>,
}

/// Lists the chains that can be queried
pub async fn chains_handler(State(state): State<ServerState>) -> Json<Vec<ChainSummary>> {
    let aggregator = state.aggregator();
    let chains = aggregator
        .chains()
        .into_iter()
        .map(|chain| ChainSummary {
            id: chain.as_str().to_string(),
            name: chain.name().to_string(),
            evm_chain_id: chain.evm_chain_id(),
            providers: aggregator
                .providers(chain)
                .iter()
                .map(|provider| provider.name().to_string())
                .collect(),
        })
        .collect();
    Json(chains)
}

/// Query string of paged lookups
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Cursor returned by the previous page
    pub cursor: Option<String>,
}

impl PageQuery {
    fn continuation(&self) -> Result<Option<Continuation>, ServerError> {
        self.cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
            .map(decode_cursor)
            .transpose()
    }
}

/// Canonical lookup result as served over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupResponse<T> {
    /// Canonical chain identifier
    pub blockchain: Blockchain,
    /// Provider that answered
    pub provider: String,
    /// Canonical entities
    pub items: Vec<T>,
    /// Records that were dropped or degraded
    pub warnings: Vec<String>,
    /// Partial failures
    pub errors: Vec<String>,
    /// Opaque cursor of the next page
    pub cursor: Option<String>,
}

impl<T> LookupResponse<T> {
    fn new(blockchain: Blockchain, lookup: Lookup<T>) -> Result<Self, ServerError> {
        Ok(Self {
            blockchain,
            cursor: lookup.next.as_ref().map(encode_cursor).transpose()?,
            provider: lookup.provider,
            items: lookup.items,
            warnings: lookup.warnings,
            errors: lookup.errors,
        })
    }
}

fn encode_cursor(continuation: &Continuation) -> Result<String, ServerError> {
    let json = serde_json::to_vec(continuation)
        .map_err(|e| ServerError::ValidationError(format!("cursor cannot be encoded: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_cursor(cursor: &str) -> Result<Continuation, ServerError> {
    let malformed = |reason: String| {
        debug!(cursor, %reason, "rejecting cursor");
        ServerError::ValidationError(format!("malformed cursor: {reason}"))
    };
    let json = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| malformed(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| malformed(e.to_string()))
}

/// Parses a canonical chain identifier from the path
fn parse_chain(chain: &str) -> Result<Blockchain, ServerError> {
    match chain.parse::<Blockchain>() {
        Ok(Blockchain::Unknown) | Err(_) => {
            warn!(chain, "request for unknown chain");
            Err(ServerError::ValidationError(format!(
                "unknown chain `{chain}`"
            )))
        }
        Ok(blockchain) => Ok(blockchain),
    }
}

/// Every fungible balance of an address, merged by coin
///
/// # Errors
///
/// Returns `ServerError` for an unknown chain or a failed lookup.
pub async fn balance_handler(
    State(state): State<ServerState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<Json<LookupResponse<BalanceItem>>, ServerError> {
    let blockchain = parse_chain(&chain)?;
    let lookup = state.aggregator().get_balance(blockchain, &address).await?;
    Ok(Json(LookupResponse::new(blockchain, lookup)?))
}

/// One page of an address's transfer history
///
/// # Errors
///
/// Returns `ServerError` for an unknown chain, a malformed cursor or a failed lookup.
pub async fn transactions_handler(
    State(state): State<ServerState>,
    Path((chain, address)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<LookupResponse<TransactionItem>>, ServerError> {
    let blockchain = parse_chain(&chain)?;
    let lookup = state
        .aggregator()
        .get_transactions(blockchain, &address, page.continuation()?)
        .await?;
    Ok(Json(LookupResponse::new(blockchain, lookup)?))
}

/// One page of the NFTs an address holds
///
/// # Errors
///
/// Returns `ServerError` for an unknown chain, a malformed cursor or a failed lookup.
pub async fn nfts_handler(
    State(state): State<ServerState>,
    Path((chain, address)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<LookupResponse<NftToken>>, ServerError> {
    let blockchain = parse_chain(&chain)?;
    let lookup = state
        .aggregator()
        .get_nfts(blockchain, &address, page.continuation()?)
        .await?;
    Ok(Json(LookupResponse::new(blockchain, lookup)?))
}

/// Open bids and listings involving an address
///
/// # Errors
///
/// Returns `ServerError` for an unknown chain or a failed lookup.
pub async fn nft_offers_handler(
    State(state): State<ServerState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<Json<LookupResponse<NftOffer>>, ServerError> {
    let blockchain = parse_chain(&chain)?;
    let lookup = state.aggregator().get_nft_offers(blockchain, &address).await?;
    Ok(Json(LookupResponse::new(blockchain, lookup)?))
}

/// Market statistics of a collection
///
/// # Errors
///
/// Returns `ServerError` for an unknown chain or a failed lookup.
pub async fn collection_stats_handler(
    State(state): State<ServerState>,
    Path((chain, contract)): Path<(String, String)>,
) -> Result<Json<LookupResponse<NftCollectionStats>>, ServerError> {
    let blockchain = parse_chain(&chain)?;
    let lookup = state
        .aggregator()
        .get_collection_stats(blockchain, &contract)
        .await?;
    Ok(Json(LookupResponse::new(blockchain, lookup)?))
}

#[cfg(test)]
mod tests {
    use api_client::Cursor;

    use super::*;

    #[test]
    fn cursor_survives_the_round_trip() {
        let continuation = Continuation {
            provider: "etherscan".to_string(),
            cursor: Cursor::Page { page: 3, size: 100 },
        };
        let encoded = encode_cursor(&continuation).unwrap();
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(decode_cursor(&encoded).unwrap(), continuation);

        let raw_json = serde_json::to_string(&continuation).unwrap();
        assert!(decode_cursor(&raw_json).is_err());
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        let page = PageQuery {
            cursor: Some("page-2".to_string()),
        };
        assert!(matches!(
            page.continuation(),
            Err(ServerError::ValidationError(_))
        ));
        assert_eq!(PageQuery { cursor: Some(String::new()) }.continuation().unwrap(), None);
    }

    #[test]
    fn chains_are_canonical_identifiers() {
        assert_eq!(parse_chain("Ethereum").unwrap(), Blockchain::Ethereum);
        assert_eq!(parse_chain("bitcoin").unwrap(), Blockchain::Bitcoin);
        assert!(parse_chain("eth").is_err());
        assert!(parse_chain("unknown").is_err());
    }
}
