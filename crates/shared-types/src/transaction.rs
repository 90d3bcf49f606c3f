// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical transfer history entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};

use crate::{Blockchain, Coin};

/// Execution outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Included and succeeded
    Success,
    /// Included and reverted
    Failed,
    /// Not yet included
    Pending,
}

/// Direction of a transfer relative to the queried address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Value received
    Incoming,
    /// Value sent
    Outgoing,
    /// Sender and recipient are the queried address
    #[serde(rename = "self")]
    SelfTransfer,
    /// The queried address is neither sender nor recipient
    Unrelated,
}

impl TransferDirection {
    /// Derives the direction of `from -> to` as seen by `address`
    pub fn relative_to(
        address: &str,
        from: &str,
        to: Option<&str>,
        case_insensitive: bool,
    ) -> Self {
        let same = |a: &str, b: &str| {
            if case_insensitive {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        };
        let sent = same(address, from);
        let received = to.is_some_and(|to| same(address, to));
        match (sent, received) {
            (true, true) => Self::SelfTransfer,
            (true, false) => Self::Outgoing,
            (false, true) => Self::Incoming,
            (false, false) => Self::Unrelated,
        }
    }
}

/// One value transfer touching the queried address
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    /// Transaction hash
    pub hash: String,
    /// Chain
    pub blockchain: Blockchain,
    /// Sender
    pub from: String,
    /// Recipient; `None` for contract creations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Transferred coin
    pub coin: Coin,
    /// Raw transferred amount
    #[serde_as(as = "DisplayFromStr")]
    pub amount_raw: u128,
    /// Decimal transferred amount
    pub amount: Decimal,
    /// Raw fee paid in the native coin
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_raw: Option<u128>,
    /// Block height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// Block time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Execution outcome
    pub status: TransactionStatus,
    /// Direction relative to the queried address
    pub direction: TransferDirection,
    /// Provider response fragment
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_relative_to_address() {
        let me = "0xAbC";
        assert_eq!(
            TransferDirection::relative_to(me, "0xabc", Some("0xdef"), true),
            TransferDirection::Outgoing
        );
        assert_eq!(
            TransferDirection::relative_to(me, "0xdef", Some("0xABC"), true),
            TransferDirection::Incoming
        );
        assert_eq!(
            TransferDirection::relative_to(me, "0xabc", Some("0xabc"), true),
            TransferDirection::SelfTransfer
        );
        assert_eq!(
            TransferDirection::relative_to(me, "0xabc", None, false),
            TransferDirection::Unrelated
        );
    }

    #[test]
    fn self_transfer_serializes_as_self() {
        let json = serde_json::to_string(&TransferDirection::SelfTransfer).unwrap();
        assert_eq!(json, "\"self\"");
    }
}
