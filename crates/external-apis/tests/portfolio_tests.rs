// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `PortfolioProvider`
//!
//! The protocol directory is shared by every lookup, so these tests focus on
//! how it is populated and how its absence degrades results.

use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

use api_client::{FetchRequest, Operation, Provider, ProviderError};
use external_apis::{AggregateError, Aggregator};
use rust_decimal::Decimal;
use shared_types::{AssetType, BalanceItem, Blockchain, Entity};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use fixtures::*;

fn balances(provider: &dyn Provider, fetched: &api_client::FetchResult) -> Vec<BalanceItem> {
    provider
        .parse(fetched)
        .data
        .into_iter()
        .filter_map(Entity::into_balance)
        .collect()
}

/// Test that concurrent lookups populate the directory exactly once
#[tokio::test]
async fn directory_is_populated_once_for_concurrent_lookups() {
    let server = MockServer::start().await;
    mount_portfolio(&server, 1).await;
    let provider = portfolio_provider(&server);

    let request = FetchRequest::new(Operation::Balance, EVM_ADDRESS);
    let (a, b, c) = tokio::join!(
        provider.fetch(&request),
        provider.fetch(&request),
        provider.fetch(&request)
    );
    for fetched in [a, b, c] {
        let fetched = fetched.unwrap();
        assert!(fetched.errors.is_empty());
        assert!(fetched.extra["protocols"]["aave3"].is_object());
    }

    // Later lookups hit the cache.
    provider.fetch(&request).await.unwrap();
    let stats = provider.directory().get_stats();
    assert_eq!(stats.refreshes, 1);
    assert_eq!(stats.entry_count, 2);
}

/// Test wallet tokens and protocol positions end to end
#[tokio::test]
async fn wallet_and_positions_are_normalized() {
    let server = MockServer::start().await;
    mount_portfolio(&server, 1).await;
    let provider = portfolio_provider(&server);

    let fetched = provider
        .fetch(&FetchRequest::new(Operation::Balance, EVM_ADDRESS))
        .await
        .unwrap();
    let items = balances(provider.as_ref(), &fetched);

    let wallet: Vec<_> = items.iter().filter(|item| item.is_wallet()).collect();
    assert_eq!(wallet.len(), 2);
    assert_eq!(wallet[0].balance(), Decimal::from(2));
    assert_eq!(
        wallet[1].coin().info.as_ref().and_then(|info| info.logo.as_deref()),
        Some("https://static.example.com/usdc.png")
    );

    let positions: Vec<_> = items.iter().filter(|item| !item.is_wallet()).collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].asset_type(), AssetType::Lending);
    assert_eq!(positions[1].asset_type(), AssetType::Borrowed);
    assert_eq!(positions[1].balance(), Decimal::from_str("0.1").unwrap());

    let protocol = positions[0].protocol().unwrap();
    assert_eq!(protocol.name, "Aave V3");
    assert_eq!(protocol.blockchain, Blockchain::Ethereum);
    assert_eq!(positions[0].pool(), positions[1].pool());
    assert_eq!(
        positions[0].pool().unwrap().adapter_id.as_deref(),
        Some("aave3_proxy_lending")
    );
}

/// Test that wallet holdings and protocol positions of one coin stay separate
#[tokio::test]
async fn aggregated_positions_stay_apart_from_wallet() {
    let server = MockServer::start().await;
    mount_portfolio(&server, 1).await;
    let provider = portfolio_provider(&server);
    let aggregator = Aggregator::new(
        HashMap::from([(Blockchain::Ethereum, vec![provider as Arc<dyn Provider>])]),
        Duration::from_secs(10),
        5,
    );

    let lookup = aggregator
        .get_balance(Blockchain::Ethereum, EVM_ADDRESS)
        .await
        .unwrap();
    assert_eq!(lookup.provider, "debank");

    let by_symbol = |symbol: &str| -> Vec<&BalanceItem> {
        lookup
            .items
            .iter()
            .filter(|item| item.coin().symbol == symbol)
            .collect()
    };

    let usdc = by_symbol("USDC");
    assert_eq!(usdc.len(), 2);
    assert!(usdc[0].is_wallet());
    assert_eq!(usdc[0].balance(), Decimal::from(1));
    assert_eq!(usdc[0].coin().protocol_id, None);
    assert!(!usdc[1].is_wallet());
    assert_eq!(usdc[1].balance(), Decimal::from(4));
    assert_eq!(usdc[1].coin().protocol_id.as_deref(), Some("aave3"));
    assert_ne!(usdc[0].coin().identity(), usdc[1].coin().identity());

    let eth = by_symbol("ETH");
    assert_eq!(eth.len(), 2);
    assert_eq!(eth[0].balance(), Decimal::from(2));
    assert_eq!(eth[0].asset_type(), AssetType::Available);
    assert_eq!(eth[1].balance(), Decimal::from_str("0.1").unwrap());
    assert_eq!(eth[1].asset_type(), AssetType::Borrowed);
    assert!(lookup.items.iter().all(|item| item.raw().get("merged").is_none()));
}

/// Test that a failing directory degrades attribution and is retried later
#[tokio::test]
async fn directory_failure_is_reported_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protocol/all_list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/all_token_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_list()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/all_complex_protocol_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protocol_positions()))
        .mount(&server)
        .await;

    let provider = portfolio_provider(&server);
    let request = FetchRequest::new(Operation::Balance, EVM_ADDRESS);
    for _ in 0..2 {
        let fetched = provider.fetch(&request).await.unwrap();
        assert_eq!(fetched.errors.len(), 1);
        assert!(fetched.errors[0].starts_with("protocol directory: "));

        let result = provider.parse(&fetched);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("aave3 missing from directory"))
        );
        assert_eq!(result.errors, fetched.errors);
    }
    assert_eq!(provider.directory().get_stats().refresh_failures, 2);
}

/// Test that positions failing does not lose wallet tokens
#[tokio::test]
async fn position_failure_keeps_wallet_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protocol/all_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protocol_directory()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/all_token_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_list()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/all_complex_protocol_list"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let provider = portfolio_provider(&server);
    let fetched = provider
        .fetch(&FetchRequest::new(Operation::Balance, EVM_ADDRESS))
        .await
        .unwrap();
    assert!(fetched.errors[0].starts_with("protocol positions: "));
    assert_eq!(balances(provider.as_ref(), &fetched).len(), 2);
}

/// Test that an unknown address stops the lookup
#[tokio::test]
async fn unknown_address_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/protocol/all_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protocol_directory()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/all_token_list"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error_code": 1, "message": "invalid user address"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = portfolio_provider(&server);
    let aggregator = Aggregator::new(
        HashMap::from([(Blockchain::Ethereum, vec![provider as Arc<dyn Provider>])]),
        Duration::from_secs(10),
        5,
    );
    let error = aggregator
        .get_balance(Blockchain::Ethereum, EVM_ADDRESS)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AggregateError::Provider {
            source: ProviderError::AddressNotExist { .. },
            ..
        }
    ));
}
