// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Tagged union over every canonical entity a provider can produce

use serde::{Deserialize, Serialize};

use crate::{BalanceItem, NftCollectionStats, NftOffer, NftToken, TransactionItem};

/// Any canonical entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Entity {
    /// Fungible balance
    Balance(BalanceItem),
    /// Transfer
    Transaction(TransactionItem),
    /// Held NFT
    Nft(NftToken),
    /// NFT bid or listing
    NftOffer(NftOffer),
    /// Collection statistics
    CollectionStats(NftCollectionStats),
}

impl Entity {
    /// Returns the balance if this entity is one
    pub fn into_balance(self) -> Option<BalanceItem> {
        match self {
            Self::Balance(item) => Some(item),
            _ => None,
        }
    }

    /// Returns the transaction if this entity is one
    pub fn into_transaction(self) -> Option<TransactionItem> {
        match self {
            Self::Transaction(item) => Some(item),
            _ => None,
        }
    }

    /// Returns the NFT if this entity is one
    pub fn into_nft(self) -> Option<NftToken> {
        match self {
            Self::Nft(item) => Some(item),
            _ => None,
        }
    }

    /// Returns the offer if this entity is one
    pub fn into_nft_offer(self) -> Option<NftOffer> {
        match self {
            Self::NftOffer(item) => Some(item),
            _ => None,
        }
    }

    /// Returns the collection statistics if this entity is one
    pub fn into_collection_stats(self) -> Option<NftCollectionStats> {
        match self {
            Self::CollectionStats(item) => Some(item),
            _ => None,
        }
    }
}

impl From<BalanceItem> for Entity {
    fn from(item: BalanceItem) -> Self {
        Self::Balance(item)
    }
}

impl From<TransactionItem> for Entity {
    fn from(item: TransactionItem) -> Self {
        Self::Transaction(item)
    }
}

impl From<NftToken> for Entity {
    fn from(item: NftToken) -> Self {
        Self::Nft(item)
    }
}

impl From<NftOffer> for Entity {
    fn from(item: NftOffer) -> Self {
        Self::NftOffer(item)
    }
}

impl From<NftCollectionStats> for Entity {
    fn from(item: NftCollectionStats) -> Self {
        Self::CollectionStats(item)
    }
}
