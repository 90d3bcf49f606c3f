// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(missing_docs, dead_code)]

//! Test fixtures for the HTTP surface
//!
//! A scripted provider keyed on the requested address, and a helper that
//! starts a server around it.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use api::{Server, ServerConfig, ShutdownConfig};
use api_client::{Cursor, FetchRequest, FetchResult, Operation, ParseResult, Provider, ProviderError};
use async_trait::async_trait;
use external_apis::Aggregator;
use serde_json::json;
use shared_types::{AssetType, BalanceItem, Blockchain, Coin};
use tokio_util::sync::CancellationToken;

pub const HOLDER: &str = "holder";
pub const MISSING: &str = "missing";
pub const UNAVAILABLE: &str = "unavailable";
pub const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Answers by address: [`HOLDER`] has data, [`MISSING`] does not exist and
/// [`UNAVAILABLE`] fails at the gateway
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    pub cursors: Mutex<Vec<Option<Cursor>>>,
}

impl ScriptedProvider {
    pub fn requested_cursors(&self) -> Vec<Option<Cursor>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn blockchain(&self) -> Blockchain {
        Blockchain::Solana
    }

    fn supports(&self, operation: Operation) -> bool {
        matches!(operation, Operation::Balance | Operation::Transactions)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ProviderError> {
        self.cursors.lock().unwrap().push(request.cursor.clone());
        match request.address.as_str() {
            MISSING => Err(ProviderError::AddressNotExist {
                message: "account not found".to_string(),
            }),
            UNAVAILABLE => Err(ProviderError::Gateway {
                status: Some(503),
                message: "Service Unavailable".to_string(),
            }),
            _ if request.operation == Operation::Balance => Ok(FetchResult::new(
                Operation::Balance,
                200,
                json!([{"mint": MINT, "amount": 1}, {"mint": MINT, "amount": 2}]),
            )),
            _ => {
                let next = match request.cursor {
                    None => Some(Cursor::Page { page: 2, size: 25 }),
                    Some(_) => None,
                };
                Ok(FetchResult::new(Operation::Transactions, 200, json!([])).with_cursor(next))
            }
        }
    }

    fn parse(&self, fetched: &FetchResult) -> ParseResult {
        let mut result = ParseResult {
            cursor: fetched.cursor.clone(),
            ..ParseResult::default()
        };
        for record in fetched.data.as_array().into_iter().flatten() {
            let mint = record["mint"].as_str().unwrap_or_default();
            let amount = record["amount"].as_u64().unwrap_or_default();
            let coin = Coin::new("USDC", "USD Coin", 6, Blockchain::Solana).with_address(mint);
            let item =
                BalanceItem::new(coin, u128::from(amount), AssetType::Available, record.clone())
                    .unwrap();
            result.data.push(item.into());
        }
        result
    }
}

/// Starts a server whose only provider is `provider`
pub async fn start_server(provider: Arc<ScriptedProvider>) -> (SocketAddr, CancellationToken) {
    let aggregator = Aggregator::new(
        HashMap::from([(Blockchain::Solana, vec![provider as Arc<dyn Provider>])]),
        Duration::from_secs(2),
        5,
    );
    Server::with_aggregator(
        ServerConfig::for_testing(),
        ShutdownConfig::default(),
        Arc::new(aggregator),
    )
    .run_for_testing()
    .await
    .expect("Failed to start test server")
}
