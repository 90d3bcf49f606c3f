// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical blockchain identifiers
//!
//! Every provider speaks its own chain vocabulary (`"eth"`, `"matic"`, `137`,
//! `"polygon-pos"`, ...). [`Blockchain`] is the single canonical identifier the
//! rest of the workspace uses; translating a provider's vocabulary into it is
//! the job of the chain resolver in `external-apis`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical blockchain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Blockchain {
    /// Ethereum Mainnet
    Ethereum,
    /// BNB Smart Chain
    BinanceSmartChain,
    /// Polygon PoS
    Polygon,
    /// Arbitrum One
    Arbitrum,
    /// OP Mainnet
    Optimism,
    /// Base
    Base,
    /// Avalanche C-Chain
    Avalanche,
    /// Fantom Opera
    Fantom,
    /// Gnosis Chain
    Gnosis,
    /// Cronos
    Cronos,
    /// Celo
    Celo,
    /// Moonbeam
    Moonbeam,
    /// Linea
    Linea,
    /// Scroll
    Scroll,
    /// zkSync Era
    ZkSync,
    /// Bitcoin
    Bitcoin,
    /// Litecoin
    Litecoin,
    /// Dogecoin
    Dogecoin,
    /// Bitcoin Cash
    BitcoinCash,
    /// Solana
    Solana,
    /// Tron
    Tron,
    /// Cosmos Hub
    Cosmos,
    /// Osmosis
    Osmosis,
    /// Polkadot
    Polkadot,
    /// Cardano
    Cardano,
    /// XRP Ledger
    Ripple,
    /// Stellar
    Stellar,
    /// NEAR Protocol
    Near,
    /// Aptos
    Aptos,
    /// Sui
    Sui,
    /// TON
    Ton,
    /// Tezos
    Tezos,
    /// Algorand
    Algorand,
    /// Chain that is known to exist but has no canonical mapping
    Unknown,
}

impl Blockchain {
    /// Canonical lowercase identifier, also used as the serialized form
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::BinanceSmartChain => "binance-smart-chain",
            Self::Polygon => "polygon",
            Self::Arbitrum => "arbitrum",
            Self::Optimism => "optimism",
            Self::Base => "base",
            Self::Avalanche => "avalanche",
            Self::Fantom => "fantom",
            Self::Gnosis => "gnosis",
            Self::Cronos => "cronos",
            Self::Celo => "celo",
            Self::Moonbeam => "moonbeam",
            Self::Linea => "linea",
            Self::Scroll => "scroll",
            Self::ZkSync => "zksync",
            Self::Bitcoin => "bitcoin",
            Self::Litecoin => "litecoin",
            Self::Dogecoin => "dogecoin",
            Self::BitcoinCash => "bitcoin-cash",
            Self::Solana => "solana",
            Self::Tron => "tron",
            Self::Cosmos => "cosmos",
            Self::Osmosis => "osmosis",
            Self::Polkadot => "polkadot",
            Self::Cardano => "cardano",
            Self::Ripple => "ripple",
            Self::Stellar => "stellar",
            Self::Near => "near",
            Self::Aptos => "aptos",
            Self::Sui => "sui",
            Self::Ton => "ton",
            Self::Tezos => "tezos",
            Self::Algorand => "algorand",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable name of the chain
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::BinanceSmartChain => "BNB Smart Chain",
            Self::Polygon => "Polygon",
            Self::Arbitrum => "Arbitrum",
            Self::Optimism => "Optimism",
            Self::Base => "Base",
            Self::Avalanche => "Avalanche",
            Self::Fantom => "Fantom",
            Self::Gnosis => "Gnosis",
            Self::Cronos => "Cronos",
            Self::Celo => "Celo",
            Self::Moonbeam => "Moonbeam",
            Self::Linea => "Linea",
            Self::Scroll => "Scroll",
            Self::ZkSync => "zkSync Era",
            Self::Bitcoin => "Bitcoin",
            Self::Litecoin => "Litecoin",
            Self::Dogecoin => "Dogecoin",
            Self::BitcoinCash => "Bitcoin Cash",
            Self::Solana => "Solana",
            Self::Tron => "Tron",
            Self::Cosmos => "Cosmos Hub",
            Self::Osmosis => "Osmosis",
            Self::Polkadot => "Polkadot",
            Self::Cardano => "Cardano",
            Self::Ripple => "XRP Ledger",
            Self::Stellar => "Stellar",
            Self::Near => "NEAR",
            Self::Aptos => "Aptos",
            Self::Sui => "Sui",
            Self::Ton => "TON",
            Self::Tezos => "Tezos",
            Self::Algorand => "Algorand",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns the EIP-155 chain ID for EVM chains
    pub const fn evm_chain_id(self) -> Option<u64> {
        match self {
            Self::Ethereum => Some(1),
            Self::BinanceSmartChain => Some(56),
            Self::Polygon => Some(137),
            Self::Arbitrum => Some(42161),
            Self::Optimism => Some(10),
            Self::Base => Some(8453),
            Self::Avalanche => Some(43114),
            Self::Fantom => Some(250),
            Self::Gnosis => Some(100),
            Self::Cronos => Some(25),
            Self::Celo => Some(42220),
            Self::Moonbeam => Some(1284),
            Self::Linea => Some(59144),
            Self::Scroll => Some(534_352),
            Self::ZkSync => Some(324),
            _ => None,
        }
    }

    /// Whether addresses on this chain are 20-byte hex EVM addresses
    pub const fn is_evm(self) -> bool {
        self.evm_chain_id().is_some()
    }

    /// Returns every canonical chain, `Unknown` excluded
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ethereum,
            Self::BinanceSmartChain,
            Self::Polygon,
            Self::Arbitrum,
            Self::Optimism,
            Self::Base,
            Self::Avalanche,
            Self::Fantom,
            Self::Gnosis,
            Self::Cronos,
            Self::Celo,
            Self::Moonbeam,
            Self::Linea,
            Self::Scroll,
            Self::ZkSync,
            Self::Bitcoin,
            Self::Litecoin,
            Self::Dogecoin,
            Self::BitcoinCash,
            Self::Solana,
            Self::Tron,
            Self::Cosmos,
            Self::Osmosis,
            Self::Polkadot,
            Self::Cardano,
            Self::Ripple,
            Self::Stellar,
            Self::Near,
            Self::Aptos,
            Self::Sui,
            Self::Ton,
            Self::Tezos,
            Self::Algorand,
        ]
    }

    /// Looks up a chain by its canonical identifier without allocating
    pub fn from_canonical(identifier: &str) -> Option<Self> {
        if identifier == Self::Unknown.as_str() {
            return Some(Self::Unknown);
        }
        Self::all()
            .iter()
            .copied()
            .find(|chain| chain.as_str() == identifier)
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Blockchain {
    type Err = BlockchainParseError;

    /// Parses a canonical identifier, ignoring case and surrounding whitespace.
    ///
    /// Provider-specific spellings are not accepted here; those go through the
    /// chain resolver.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::from_canonical(&normalized)
            .ok_or_else(|| BlockchainParseError::InvalidName(s.to_string()))
    }
}

impl TryFrom<u64> for Blockchain {
    type Error = BlockchainParseError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::all()
            .iter()
            .copied()
            .find(|chain| chain.evm_chain_id() == Some(id))
            .ok_or(BlockchainParseError::InvalidId(id))
    }
}

impl Serialize for Blockchain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Blockchain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlockchainVisitor;

        impl serde::de::Visitor<'_> for BlockchainVisitor {
            type Value = Blockchain;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "a canonical chain identifier such as \"ethereum\" or an EVM chain ID"
                )
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Blockchain::try_from(value).map_err(|_| {
                    E::invalid_value(
                        serde::de::Unexpected::Unsigned(value),
                        &"a known EVM chain ID",
                    )
                })
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Blockchain::from_str(value).map_err(|_| {
                    E::invalid_value(
                        serde::de::Unexpected::Str(value),
                        &"a canonical chain identifier",
                    )
                })
            }
        }

        deserializer.deserialize_any(BlockchainVisitor)
    }
}

/// Error type for canonical chain parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockchainParseError {
    /// Numeric chain ID with no canonical EVM chain
    #[error("unknown EVM chain ID: {0}")]
    InvalidId(u64),
    /// String that is not a canonical chain identifier
    #[error("unknown chain identifier: {0}")]
    InvalidName(String),
}
