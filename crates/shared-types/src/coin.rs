// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical coin description and identity

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::Blockchain;

/// Token standard a coin implements on its chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStandard {
    /// Native chain currency
    Native,
    /// ERC-20 fungible token
    Erc20,
    /// ERC-721 non-fungible token
    Erc721,
    /// ERC-1155 multi token
    Erc1155,
    /// BEP-20 fungible token
    Bep20,
    /// TRC-20 fungible token
    Trc20,
    /// Solana SPL token
    Spl,
    /// Any other provider-reported standard
    #[serde(untagged)]
    Other(String),
}

impl TokenStandard {
    /// Parses a provider-reported standard name, keeping unknown names verbatim
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "native" => Self::Native,
            "erc20" => Self::Erc20,
            "erc721" => Self::Erc721,
            "erc1155" => Self::Erc1155,
            "bep20" => Self::Bep20,
            "trc20" => Self::Trc20,
            "spl" => Self::Spl,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Erc20 => f.write_str("erc20"),
            Self::Erc721 => f.write_str("erc721"),
            Self::Erc1155 => f.write_str("erc1155"),
            Self::Bep20 => f.write_str("bep20"),
            Self::Trc20 => f.write_str("trc20"),
            Self::Spl => f.write_str("spl"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Descriptive data attached to a coin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    /// Logo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Free-form tags such as `"stablecoin"` or `"verified"`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Identifier in an external price catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
}

/// A fungible asset on one chain
///
/// Two coins describe the same asset when their [`CoinKey`]s are equal, which
/// ignores display fields such as `name` or `info`. Equality and hashing follow
/// that identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    /// Ticker symbol
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Number of decimal places between the raw and the display amount
    pub decimals: u32,
    /// Chain the coin lives on
    pub blockchain: Blockchain,
    /// Contract, mint or denom address; `None` for the native currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Token standards the coin implements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standards: Option<Vec<TokenStandard>>,
    /// Protocol scope for protocol-issued receipts sharing one address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    /// Descriptive data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<CoinInfo>,
}

impl Coin {
    /// Creates a coin with no address, standards, protocol scope or info
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u32,
        blockchain: Blockchain,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            decimals,
            blockchain,
            address: None,
            standards: None,
            protocol_id: None,
            info: None,
        }
    }

    /// Creates the native currency of a chain
    pub fn native(
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u32,
        blockchain: Blockchain,
    ) -> Self {
        Self::new(symbol, name, decimals, blockchain).with_standards(vec![TokenStandard::Native])
    }

    /// Sets the on-chain address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the token standards
    #[must_use]
    pub fn with_standards(mut self, standards: Vec<TokenStandard>) -> Self {
        self.standards = Some(standards);
        self
    }

    /// Sets the protocol scope
    #[must_use]
    pub fn with_protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = Some(protocol_id.into());
        self
    }

    /// Sets descriptive info
    #[must_use]
    pub fn with_info(mut self, info: CoinInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Identity used for equality and merging
    ///
    /// `(blockchain, address, protocol_id)` when an address is present,
    /// `(blockchain, symbol)` otherwise. EVM addresses are compared
    /// case-insensitively since checksum casing carries no identity.
    pub fn identity(&self) -> CoinKey {
        match &self.address {
            Some(address) => {
                let address = if self.blockchain.is_evm() {
                    address.to_lowercase()
                } else {
                    address.clone()
                };
                CoinKey::Address {
                    blockchain: self.blockchain,
                    address,
                    protocol_id: self.protocol_id.clone(),
                }
            }
            None => CoinKey::Symbol {
                blockchain: self.blockchain,
                symbol: self.symbol.clone(),
            },
        }
    }
}

impl PartialEq for Coin {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Coin {}

impl Hash for Coin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Identity of a [`Coin`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoinKey {
    /// Coin identified by its on-chain address
    Address {
        /// Chain
        blockchain: Blockchain,
        /// Normalized address
        address: String,
        /// Protocol scope
        protocol_id: Option<String>,
    },
    /// Address-less coin identified by its symbol
    Symbol {
        /// Chain
        blockchain: Blockchain,
        /// Ticker symbol
        symbol: String,
    },
}

impl fmt::Display for CoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address {
                blockchain,
                address,
                protocol_id: Some(protocol_id),
            } => write!(f, "{blockchain}:{address}@{protocol_id}"),
            Self::Address {
                blockchain,
                address,
                protocol_id: None,
            } => write!(f, "{blockchain}:{address}"),
            Self::Symbol { blockchain, symbol } => write!(f, "{blockchain}:{symbol}"),
        }
    }
}
