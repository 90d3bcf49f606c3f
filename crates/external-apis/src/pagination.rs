// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared pagination driver
//!
//! Offset/limit, page/size and opaque token pagination all reduce to the same
//! loop because each provider reports its continuation as an explicit
//! [`Cursor`] on the parsed page. The driver stops when no cursor comes back,
//! when a cursor it already requested comes back again, or when the page cap
//! is reached.

use std::collections::HashSet;

use api_client::{Cursor, FetchRequest, ParseResult, Provider, ProviderError};
use tracing::{debug, warn};

/// Default safety cap on pages fetched for one lookup
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Fetches and parses pages until the provider is exhausted
///
/// A failure on the first page is returned as is. A failure on a later page
/// keeps what was collected, records the error in `errors` and leaves the
/// failed cursor in `cursor` so the caller can resume.
///
/// # Errors
///
/// Returns the provider error of the first page.
pub async fn paginate(
    provider: &dyn Provider,
    request: FetchRequest,
    max_pages: usize,
) -> Result<ParseResult, ProviderError> {
    let max_pages = max_pages.max(1);
    let mut request = request;
    let mut requested: HashSet<Cursor> = request.cursor.iter().cloned().collect();
    let mut combined = ParseResult::default();
    let mut pages = 0_usize;

    loop {
        let fetched = match provider.fetch(&request).await {
            Ok(fetched) => fetched,
            Err(error) if pages == 0 => return Err(error),
            Err(error) => {
                warn!(
                    provider = provider.name(),
                    operation = %request.operation,
                    pages,
                    error = %error,
                    "page fetch failed, keeping collected data"
                );
                combined.errors.push(format!("page {}: {error}", pages + 1));
                combined.cursor = request.cursor;
                break;
            }
        };
        pages += 1;

        let mut page = provider.parse(&fetched);
        let next = page.cursor.take();
        combined.absorb(page);

        let Some(cursor) = next else {
            break;
        };
        if !requested.insert(cursor.clone()) {
            warn!(
                provider = provider.name(),
                operation = %request.operation,
                cursor = %cursor,
                pages,
                "cursor repeated, stopping pagination"
            );
            combined.warn(format!(
                "{}: cursor `{cursor}` repeated, stopped after {pages} pages",
                provider.name()
            ));
            break;
        }
        if pages >= max_pages {
            warn!(
                provider = provider.name(),
                operation = %request.operation,
                max_pages,
                "page cap reached"
            );
            combined.warn(format!(
                "{}: stopped after {max_pages} pages, more data available",
                provider.name()
            ));
            combined.cursor = Some(cursor);
            break;
        }

        debug!(provider = provider.name(), cursor = %cursor, "fetching next page");
        request.cursor = Some(cursor);
    }

    Ok(combined)
}

/// Fetches and parses exactly one page
///
/// A continuation equal to the requested cursor would make the caller loop,
/// so it is dropped with a warning.
///
/// # Errors
///
/// Returns the provider error of the page.
pub async fn fetch_page(
    provider: &dyn Provider,
    request: &FetchRequest,
) -> Result<ParseResult, ProviderError> {
    let fetched = provider.fetch(request).await?;
    let mut page = provider.parse(&fetched);

    if let Some(cursor) = page
        .cursor
        .take_if(|cursor| request.cursor.as_ref() == Some(&*cursor))
    {
        warn!(provider = provider.name(), cursor = %cursor, "provider returned the requested cursor");
        page.warn(format!(
            "{}: cursor `{cursor}` repeated, no further pages",
            provider.name()
        ));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use api_client::{FetchResult, Operation};
    use async_trait::async_trait;
    use serde_json::json;
    use shared_types::{AssetType, BalanceItem, Blockchain, Coin, Entity};

    use super::*;

    /// Serves pages `c1..=cN` and then points back at `c1`
    #[derive(Debug)]
    struct CyclingProvider {
        period: usize,
        pages_before_cycle: Option<usize>,
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
    }

    impl CyclingProvider {
        fn new(period: usize) -> Self {
            Self {
                period,
                pages_before_cycle: None,
                fail_on_call: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn token(n: usize) -> Cursor {
        Cursor::Token {
            value: format!("c{n}"),
        }
    }

    #[async_trait]
    impl Provider for CyclingProvider {
        fn name(&self) -> &str {
            "cycling"
        }

        fn blockchain(&self) -> Blockchain {
            Blockchain::Bitcoin
        }

        fn supports(&self, _operation: Operation) -> bool {
            true
        }

        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(ProviderError::Gateway {
                    status: Some(503),
                    message: "Service Unavailable".to_string(),
                });
            }

            let current = match &request.cursor {
                None => 0,
                Some(Cursor::Token { value }) => value[1..].parse().unwrap(),
                Some(_) => 0,
            };
            let next = match self.pages_before_cycle {
                Some(last) if current >= last => None,
                _ => Some(token(current % self.period + 1)),
            };
            Ok(FetchResult::new(request.operation, 200, json!({"page": current}))
                .with_cursor(next))
        }

        fn parse(&self, fetched: &FetchResult) -> ParseResult {
            let coin = Coin::native("BTC", "Bitcoin", 8, Blockchain::Bitcoin);
            let item = BalanceItem::new(coin, 1, AssetType::Available, fetched.data.clone())
                .unwrap();
            ParseResult {
                data: vec![Entity::Balance(item)],
                cursor: fetched.cursor.clone(),
                ..ParseResult::default()
            }
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::new(Operation::Balance, "bc1qaddress")
    }

    #[tokio::test]
    async fn cycling_cursors_stop_within_period_plus_one_calls() {
        for period in 1..=5 {
            let provider = CyclingProvider::new(period);
            let result = paginate(&provider, request(), 100).await.unwrap();

            assert_eq!(provider.calls(), period + 1, "period {period}");
            assert_eq!(result.data.len(), period + 1);
            assert_eq!(result.warnings.len(), 1);
            assert!(result.warnings[0].contains("`token=c1` repeated"));
            assert_eq!(result.cursor, None);
        }
    }

    #[tokio::test]
    async fn collects_every_available_page() {
        let provider = CyclingProvider {
            pages_before_cycle: Some(4),
            ..CyclingProvider::new(10)
        };
        let result = paginate(&provider, request(), 100).await.unwrap();
        assert_eq!(provider.calls(), 5);
        assert_eq!(result.data.len(), 5);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn page_cap_keeps_the_continuation() {
        let provider = CyclingProvider::new(50);
        let result = paginate(&provider, request(), 3).await.unwrap();
        assert_eq!(provider.calls(), 3);
        assert_eq!(result.cursor, Some(token(3)));
        assert!(result.warnings[0].contains("stopped after 3 pages"));
    }

    #[tokio::test]
    async fn first_page_failure_is_an_error() {
        let provider = CyclingProvider {
            fail_on_call: Some(1),
            ..CyclingProvider::new(3)
        };
        let error = paginate(&provider, request(), 10).await.unwrap_err();
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn later_page_failure_keeps_collected_data() {
        let provider = CyclingProvider {
            fail_on_call: Some(3),
            ..CyclingProvider::new(10)
        };
        let result = paginate(&provider, request(), 10).await.unwrap();
        assert_eq!(result.data.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("page 3: "));
        assert_eq!(result.cursor, Some(token(2)));
    }

    #[tokio::test]
    async fn single_page_drops_a_self_referencing_cursor() {
        let provider = CyclingProvider::new(1);
        let page = fetch_page(&provider, &request().with_cursor(Some(token(1))))
            .await
            .unwrap();
        assert_eq!(page.cursor, None);
        assert_eq!(page.warnings.len(), 1);

        let page = fetch_page(&provider, &request()).await.unwrap();
        assert_eq!(page.cursor, Some(token(1)));
    }
}
