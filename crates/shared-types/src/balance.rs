// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical balance entries

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};

use crate::{AmountError, Coin, PoolInfo, Protocol, amount};

/// Economic role of a balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// Freely transferable wallet balance
    Available,
    /// Delegated or staked
    Staked,
    /// Locked by a contract or timelock
    Locked,
    /// Subject to a vesting schedule
    Vesting,
    /// Claimable rewards
    Rewards,
    /// Waiting out an unbonding period
    Unbonding,
    /// Supplied to a lending market
    Lending,
    /// Borrowed from a lending market
    Borrowed,
    /// Liquidity pool share
    LiquidityPool,
    /// Yield farming deposit
    Farming,
    /// Generic protocol deposit
    Deposit,
    /// Anything else
    Other,
}

impl AssetType {
    /// Maps a provider's position label onto an asset type
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "available" | "wallet" | "spot" => Self::Available,
            "staked" | "staking" | "delegated" => Self::Staked,
            "locked" => Self::Locked,
            "vesting" => Self::Vesting,
            "rewards" | "reward" | "claimable" => Self::Rewards,
            "unbonding" => Self::Unbonding,
            "lending" | "supplied" | "supply" => Self::Lending,
            "borrowed" | "borrow" | "debt" => Self::Borrowed,
            "liquidity pool" | "lp" => Self::LiquidityPool,
            "farming" | "yield" => Self::Farming,
            "deposit" | "deposited" => Self::Deposit,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::Staked => "staked",
            Self::Locked => "locked",
            Self::Vesting => "vesting",
            Self::Rewards => "rewards",
            Self::Unbonding => "unbonding",
            Self::Lending => "lending",
            Self::Borrowed => "borrowed",
            Self::LiquidityPool => "liquidity_pool",
            Self::Farming => "farming",
            Self::Deposit => "deposit",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A holding of one coin, as reported by one provider record
///
/// Built once and never mutated; the `with_*` methods consume the item and
/// are only meant for construction. Merging produces a new item.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceItem {
    #[serde_as(as = "DisplayFromStr")]
    balance_raw: u128,
    balance: Decimal,
    coin: Coin,
    asset_type: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pool: Option<PoolInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
    raw: Value,
    is_wallet: bool,
}

impl BalanceItem {
    /// Creates a wallet balance, deriving the decimal amount from `coin.decimals`
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Unrepresentable` when the integer part does not fit.
    pub fn new(
        coin: Coin,
        balance_raw: u128,
        asset_type: AssetType,
        raw: Value,
    ) -> Result<Self, AmountError> {
        let balance = amount::scale(balance_raw, coin.decimals)?;
        Ok(Self::from_parts(coin, balance_raw, balance, asset_type, raw))
    }

    /// Assembles an item from already computed amounts
    pub fn from_parts(
        coin: Coin,
        balance_raw: u128,
        balance: Decimal,
        asset_type: AssetType,
        raw: Value,
    ) -> Self {
        Self {
            balance_raw,
            balance,
            coin,
            asset_type,
            protocol: None,
            pool: None,
            last_updated: None,
            raw,
            is_wallet: true,
        }
    }

    /// Marks the item as a protocol position, attributed when the protocol is known
    #[must_use]
    pub fn with_protocol(mut self, protocol: Option<Protocol>) -> Self {
        self.protocol = protocol;
        self.is_wallet = false;
        self
    }

    /// Attaches the position the item belongs to
    #[must_use]
    pub fn with_pool(mut self, pool: Option<PoolInfo>) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the provider-reported update time
    #[must_use]
    pub fn with_last_updated(mut self, last_updated: Option<DateTime<Utc>>) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// Overrides the wallet flag
    #[must_use]
    pub fn with_wallet(mut self, is_wallet: bool) -> Self {
        self.is_wallet = is_wallet;
        self
    }

    /// Raw balance in the smallest unit
    pub fn balance_raw(&self) -> u128 {
        self.balance_raw
    }

    /// Decimal balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Held coin
    pub fn coin(&self) -> &Coin {
        &self.coin
    }

    /// Economic role
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Protocol the balance is deposited in
    pub fn protocol(&self) -> Option<&Protocol> {
        self.protocol.as_ref()
    }

    /// Position the balance belongs to
    pub fn pool(&self) -> Option<&PoolInfo> {
        self.pool.as_ref()
    }

    /// Provider-reported update time
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Provider response fragment the item was parsed from
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Whether the balance sits directly in the wallet
    pub fn is_wallet(&self) -> bool {
        self.is_wallet
    }
}
