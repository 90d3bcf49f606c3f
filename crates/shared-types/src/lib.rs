// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical data model
//!
//! Every provider, whatever its native response shape, is translated into the
//! types in this crate. They carry no behaviour beyond construction, identity
//! and amount scaling, so every other crate in the workspace can depend on them.

pub mod amount;
pub mod balance;
pub mod chains;
pub mod coin;
pub mod entity;
pub mod nft;
pub mod protocol;
pub mod transaction;

pub use amount::AmountError;
pub use balance::{AssetType, BalanceItem};
pub use chains::{Blockchain, BlockchainParseError};
pub use coin::{Coin, CoinInfo, CoinKey, TokenStandard};
pub use entity::Entity;
pub use nft::{NftCollectionStats, NftOffer, NftReference, NftToken, OfferDirection, PricedLeg};
pub use protocol::{PoolInfo, Protocol};
pub use transaction::{TransactionItem, TransactionStatus, TransferDirection};
