// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical non-fungible asset shapes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};

use crate::{AmountError, Blockchain, Coin, TokenStandard, amount};

/// One NFT held by an address
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftToken {
    /// Chain
    pub blockchain: Blockchain,
    /// Collection contract or mint authority
    pub contract: String,
    /// Token identifier within the contract
    pub token_id: String,
    /// Token standard
    pub standard: TokenStandard,
    /// Units held; always 1 for ERC-721 style tokens
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
    /// Token name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Collection name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Animation or video URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    /// Metadata document URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    /// Provider response fragment
    pub raw: Value,
}

/// Side of an NFT offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferDirection {
    /// Someone offers to buy
    Bid,
    /// The owner offers to sell
    Listing,
}

impl OfferDirection {
    /// Parses a provider label such as `"offer"`, `"bid"`, `"ask"` or `"listing"`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bid" | "offer" | "buy" | "collection_offer" => Some(Self::Bid),
            "listing" | "ask" | "sell" | "sale" => Some(Self::Listing),
            _ => None,
        }
    }
}

/// An amount of one coin used as a price
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLeg {
    /// Priced coin
    pub coin: Coin,
    /// Raw amount in the coin's smallest unit
    #[serde_as(as = "DisplayFromStr")]
    pub amount_raw: u128,
    /// Decimal amount
    pub amount: Decimal,
}

impl PricedLeg {
    /// Creates a leg, scaling the raw amount by the coin's decimals
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Unrepresentable` when the integer part does not fit.
    pub fn new(coin: Coin, amount_raw: u128) -> Result<Self, AmountError> {
        let amount = amount::scale(amount_raw, coin.decimals)?;
        Ok(Self {
            coin,
            amount_raw,
            amount,
        })
    }
}

/// Token an offer refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftReference {
    /// Collection contract
    pub contract: String,
    /// Token identifier; `None` for collection-wide offers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

/// An open bid or listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftOffer {
    /// Chain
    pub blockchain: Blockchain,
    /// Marketplace order identifier
    pub offer_id: String,
    /// Bid or listing
    pub direction: OfferDirection,
    /// Address that created the offer
    pub maker: String,
    /// Counterparty, when the offer is private
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker: Option<String>,
    /// Token the offer is for
    pub token: NftReference,
    /// Price legs; usually one, several for bundled currency payments
    pub price: Vec<PricedLeg>,
    /// Expiry time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Provider response fragment
    pub raw: Value,
}

/// Market statistics for a collection
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftCollectionStats {
    /// Chain
    pub blockchain: Blockchain,
    /// Collection contract
    pub contract: String,
    /// Collection name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lowest listing price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_price: Option<PricedLeg>,
    /// All-time traded volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<PricedLeg>,
    /// Distinct holders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<u64>,
    /// Tokens in the collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<u64>,
    /// Sales over the last 24 hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_24h: Option<u64>,
    /// Provider response fragment
    pub raw: Value,
}
