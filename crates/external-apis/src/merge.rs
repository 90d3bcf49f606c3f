// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Balance merging
//!
//! Providers often report one coin several times, e.g. a token held both
//! directly and through a wrapped listing. [`merge_balances`] collapses
//! entries with the same coin identity into one summed item and keeps every
//! constituent's provenance under `{"merged": [...]}`.
//!
//! Only entries of the same holding are summed: a wallet balance never absorbs
//! a protocol position, and debt never offsets collateral of the same coin.

use std::collections::HashMap;

use serde_json::{Value, json};
use shared_types::{AssetType, BalanceItem, CoinKey};

const MERGED_KEY: &str = "merged";

/// Coin identity plus the holding it is reported under
#[derive(Debug, PartialEq, Eq, Hash)]
struct HoldingKey {
    coin: CoinKey,
    asset_type: AssetType,
    is_wallet: bool,
    pool: Option<String>,
}

impl HoldingKey {
    fn of(item: &BalanceItem) -> Self {
        Self {
            coin: item.coin().identity(),
            asset_type: item.asset_type(),
            is_wallet: item.is_wallet(),
            pool: item.pool().map(|pool| pool.id.clone()),
        }
    }
}

/// Groups `items` by coin identity within one holding and sums each group
///
/// Output order is the first occurrence of each group. A group of one is
/// returned unchanged, so merging is idempotent.
pub fn merge_balances(items: Vec<BalanceItem>) -> Vec<BalanceItem> {
    let mut groups: Vec<Vec<BalanceItem>> = Vec::new();
    let mut positions: HashMap<HoldingKey, usize> = HashMap::new();

    for item in items {
        let key = HoldingKey::of(&item);
        if let Some(&index) = positions.get(&key) {
            groups[index].push(item);
        } else {
            positions.insert(key, groups.len());
            groups.push(vec![item]);
        }
    }

    groups.into_iter().filter_map(merge_group).collect()
}

fn merge_group(group: Vec<BalanceItem>) -> Option<BalanceItem> {
    let mut items = group.into_iter();
    let first = items.next()?;
    let Some(second) = items.next() else {
        return Some(first);
    };

    let mut balance_raw = first.balance_raw();
    let mut balance = first.balance();
    let mut last_updated = first.last_updated();
    let mut provenance = Vec::new();
    extend_provenance(&mut provenance, first.raw());

    for item in std::iter::once(second).chain(items) {
        balance_raw = balance_raw.saturating_add(item.balance_raw());
        balance = balance.saturating_add(item.balance());
        last_updated = last_updated.max(item.last_updated());
        extend_provenance(&mut provenance, item.raw());
    }

    let merged = BalanceItem::from_parts(
        first.coin().clone(),
        balance_raw,
        balance,
        first.asset_type(),
        json!({ MERGED_KEY: provenance }),
    )
    .with_pool(first.pool().cloned())
    .with_last_updated(last_updated);

    let merged = if first.protocol().is_some() {
        merged.with_protocol(first.protocol().cloned())
    } else {
        merged
    };
    Some(merged.with_wallet(first.is_wallet()))
}

/// Appends `raw`, flattening an earlier merge result instead of nesting it
fn extend_provenance(provenance: &mut Vec<Value>, raw: &Value) {
    if let Value::Object(fields) = raw
        && fields.len() == 1
        && let Some(Value::Array(constituents)) = fields.get(MERGED_KEY)
    {
        provenance.extend(constituents.iter().cloned());
        return;
    }
    provenance.push(raw.clone());
}
