// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `ExplorerProvider`
//!
//! These tests use wiremock to mock explorer responses and exercise the shared
//! fetch machinery end to end: templating, credentials, the single retry,
//! error classification and pagination.

use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

use api_client::{Cursor, FetchRequest, FetchResult, Operation, Provider, ProviderError};
use external_apis::{
    AggregateError, Aggregator, ApiKey, ExplorerDefinitions, ExplorerProvider, fetch_page, paginate,
};
use rust_decimal::Decimal;
use serde_json::json;
use shared_types::{Blockchain, OfferDirection};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param, query_param_is_missing},
};

use fixtures::*;

fn aggregator(provider: impl Provider + 'static) -> Aggregator {
    Aggregator::new(
        HashMap::from([(
            provider.blockchain(),
            vec![Arc::new(provider) as Arc<dyn Provider>],
        )]),
        Duration::from_secs(10),
        10,
    )
}

/// Test the canonical balance example end to end
#[tokio::test]
async fn bitcoin_balance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .and(query_param("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": "64363"})))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = aggregator(explorer_provider(&server))
        .get_balance(Blockchain::Bitcoin, BTC_ADDRESS)
        .await
        .unwrap();

    assert_eq!(lookup.provider, "test-explorer");
    assert_eq!(lookup.items.len(), 1);
    let item = &lookup.items[0];
    assert_eq!(item.balance_raw(), 64363);
    assert_eq!(item.balance(), Decimal::from_str("0.00064363").unwrap());
    assert_eq!(item.coin().symbol, "BTC");
    assert_eq!(item.raw(), &json!({"balance": "64363"}));
}

/// Test that a gateway failure is retried exactly once and then surfaced
#[tokio::test]
async fn gateway_failure_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let provider = explorer_provider(&server);
    let error = provider
        .fetch(&FetchRequest::new(Operation::Balance, BTC_ADDRESS))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ProviderError::Gateway {
            status: Some(503),
            message: "Service Unavailable".to_string(),
        }
    );
    assert!(error.to_string().contains("Service Unavailable"));
}

/// Test that the retry recovers from a single transient failure
#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = explorer_provider(&server);
    let fetched = provider
        .fetch(&FetchRequest::new(Operation::Balance, BTC_ADDRESS))
        .await
        .unwrap();
    assert_eq!(fetched.status, 200);
}

/// Test that an unknown address is a typed condition and is not retried
#[tokio::test]
async fn address_not_exist_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid address"})))
        .expect(1)
        .mount(&server)
        .await;

    let error = aggregator(explorer_provider(&server))
        .get_balance(Blockchain::Bitcoin, BTC_ADDRESS)
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

/// Test that an error envelope in a 200 response is classified
#[tokio::test]
async fn error_envelope_in_success_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "rate limit exceeded, try again"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let error = explorer_provider(&server)
        .fetch(&FetchRequest::new(Operation::Balance, BTC_ADDRESS))
        .await
        .unwrap_err();
    assert!(error.is_retryable());
    assert!(error.to_string().contains("rate limit exceeded"));
}

fn bundled_etherscan(server: &MockServer, name: &str) -> ExplorerProvider {
    let mut config = ExplorerDefinitions::bundled()
        .unwrap()
        .explorers
        .into_iter()
        .find(|explorer| explorer.name == "etherscan")
        .unwrap();
    config.name = name.to_string();
    config.base_url = server.uri();
    ExplorerProvider::new(config, Some(ApiKey::new(API_KEY).unwrap()), RETRY_DELAY).unwrap()
}

/// Test that a status-flagged rate limit in a 200 response is retried and fails over
#[tokio::test]
async fn status_flagged_rate_limit_fails_over() {
    let limited = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .and(query_param("action", "balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        })))
        // One retried fetch on its own, one more behind the aggregator
        .expect(4)
        .mount(&limited)
        .await;
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .and(query_param("address", EVM_ADDRESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": "1500000000000000000"
        })))
        .expect(1)
        .mount(&healthy)
        .await;

    let error = bundled_etherscan(&limited, "etherscan")
        .fetch(&FetchRequest::new(Operation::Balance, EVM_ADDRESS))
        .await
        .unwrap_err();
    assert!(matches!(error, ProviderError::Gateway { .. }));
    assert!(error.to_string().contains("Max rate limit reached"));

    let aggregator = Aggregator::new(
        HashMap::from([(
            Blockchain::Ethereum,
            vec![
                Arc::new(bundled_etherscan(&limited, "etherscan")) as Arc<dyn Provider>,
                Arc::new(bundled_etherscan(&healthy, "etherscan-backup")),
            ],
        )]),
        Duration::from_secs(10),
        10,
    );
    let lookup = aggregator
        .get_balance(Blockchain::Ethereum, EVM_ADDRESS)
        .await
        .unwrap();
    assert_eq!(lookup.provider, "etherscan-backup");
    assert_eq!(lookup.items.len(), 1);
    assert_eq!(lookup.items[0].balance(), Decimal::from_str("1.5").unwrap());
}

/// Test that caller errors are raised before any network call
#[tokio::test]
async fn caller_errors_skip_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let provider = explorer_provider(&server);

    let error = provider
        .fetch(&FetchRequest::new(Operation::Transactions, BTC_ADDRESS))
        .await
        .unwrap_err();
    assert_eq!(
        error,
        ProviderError::MissingParameter {
            endpoint: "transactions".to_string(),
            name: "network".to_string(),
        }
    );

    let error = provider
        .fetch(&FetchRequest::new(Operation::Balance, "not-an-address"))
        .await
        .unwrap_err();
    assert!(matches!(error, ProviderError::InvalidAddress { .. }));

    let error = provider
        .fetch(&FetchRequest::new(Operation::Nfts, BTC_ADDRESS))
        .await
        .unwrap_err();
    assert!(matches!(error, ProviderError::Unsupported { .. }));
}

/// Test offset pagination derived from page size
#[tokio::test]
async fn offset_pagination_stops_on_short_page() {
    let server = MockServer::start().await;
    let txs = |ids: &[&str]| {
        json!(ids.iter().map(|id| json!({"txid": id})).collect::<Vec<_>>())
    };
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/txs/mainnet")))
        .respond_with(ResponseTemplate::new(200).set_body_json(txs(&["a", "b"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/txs/mainnet")))
        .respond_with(ResponseTemplate::new(200).set_body_json(txs(&["c"])))
        .mount(&server)
        .await;

    let provider = explorer_provider(&server);
    let request =
        FetchRequest::new(Operation::Transactions, BTC_ADDRESS).with_param("network", "mainnet");

    let first = fetch_page(&provider, &request).await.unwrap();
    // Records without sender and amount are dropped, but still count towards the page.
    assert_eq!(first.warnings.len(), 2);
    assert_eq!(first.cursor, Some(Cursor::Offset { offset: 2, limit: 2 }));

    let second = fetch_page(&provider, &request.clone().with_cursor(first.cursor))
        .await
        .unwrap();
    assert_eq!(second.cursor, None);
}

/// Test token pagination across pages through the shared driver
#[tokio::test]
async fn cursor_pagination_collects_every_page() {
    let server = MockServer::start().await;
    let offer = |id: &str, side: &str| {
        json!({"id": id, "side": side, "maker": "bc1qmaker", "collection": "runestone",
               "inscription": format!("{id}i0"), "price_sats": 150_000})
    };
    Mock::given(method("GET"))
        .and(path(format!("/offers/{BTC_ADDRESS}")))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [offer("o1", "bid")], "next": "page-2"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/offers/{BTC_ADDRESS}")))
        .and(query_param("cursor", "page-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [offer("o2", "listing")], "next": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let lookup = aggregator(explorer_provider(&server))
        .get_nft_offers(Blockchain::Bitcoin, BTC_ADDRESS)
        .await
        .unwrap();

    assert_eq!(lookup.items.len(), 2);
    assert_eq!(lookup.items[0].direction, OfferDirection::Bid);
    assert_eq!(lookup.items[1].direction, OfferDirection::Listing);
    assert_eq!(lookup.items[1].token.token_id.as_deref(), Some("o2i0"));
    assert_eq!(lookup.items[0].price[0].amount, Decimal::from_str("0.0015").unwrap());
    assert!(lookup.warnings.is_empty());
    assert_eq!(lookup.next, None);
}

/// Test that an explorer echoing the same cursor cannot loop forever
#[tokio::test]
async fn repeated_cursor_stops_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/offers/{BTC_ADDRESS}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"items": [], "next": "stuck"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let provider = explorer_provider(&server);
    let result = paginate(&provider, FetchRequest::new(Operation::NftOffers, BTC_ADDRESS), 50)
        .await
        .unwrap();
    assert!(result.warnings[0].contains("`token=stuck` repeated"));
}

/// Test that a stored snapshot parses identically without the network
#[tokio::test]
async fn snapshots_replay_deterministically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/address/{BTC_ADDRESS}/balance")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": "64363"})))
        .mount(&server)
        .await;

    let provider = explorer_provider(&server);
    let fetched = provider
        .fetch(&FetchRequest::new(Operation::Balance, BTC_ADDRESS))
        .await
        .unwrap();
    let stored = fetched.to_json().unwrap();
    assert!(!stored.contains(API_KEY));
    drop(server);

    let replayed = FetchResult::from_json(&stored).unwrap();
    assert_eq!(provider.parse(&replayed), provider.parse(&fetched));
    assert_eq!(provider.parse(&replayed), provider.parse(&replayed));
}
