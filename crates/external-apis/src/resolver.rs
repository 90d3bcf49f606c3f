// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Chain identifier resolution
//!
//! Every upstream source names chains in its own vocabulary: numeric EVM chain
//! ids, short slugs such as `"matic"`, or catalog ids such as
//! `"polygon-pos"`. [`ChainResolver`] keeps one private table per source and
//! translates into the canonical [`Blockchain`].
//!
//! Resolution order:
//!
//! 1. exact match in the source's table
//! 2. the lowercased identifier already is a canonical slug
//! 3. unresolved, with one warning per distinct `(source, identifier)` pair
//!
//! ```
//! use external_apis::ChainResolver;
//! use shared_types::Blockchain;
//!
//! let resolver = ChainResolver::new();
//! assert_eq!(resolver.resolve("debank", "matic"), Some(Blockchain::Polygon));
//! assert_eq!(resolver.resolve("debank", "Ethereum"), Some(Blockchain::Ethereum));
//! assert_eq!(resolver.resolve("debank", "does-not-exist"), None);
//! ```

use std::collections::HashMap;

use dashmap::{DashMap, DashSet};
use shared_types::Blockchain;
use tracing::warn;

/// Source name for numeric EVM chain ids
pub const CHAIN_ID_SOURCE: &str = "chain_id";
/// Source name for DeBank-style portfolio indexers
pub const DEBANK_SOURCE: &str = "debank";
/// Source name for CoinGecko asset platforms
pub const COINGECKO_SOURCE: &str = "coingecko";
/// Source name for Zerion chain ids
pub const ZERION_SOURCE: &str = "zerion";

const DEBANK_CHAINS: &[(&str, Blockchain)] = &[
    ("eth", Blockchain::Ethereum),
    ("bsc", Blockchain::BinanceSmartChain),
    ("matic", Blockchain::Polygon),
    ("arb", Blockchain::Arbitrum),
    ("op", Blockchain::Optimism),
    ("base", Blockchain::Base),
    ("avax", Blockchain::Avalanche),
    ("ftm", Blockchain::Fantom),
    ("xdai", Blockchain::Gnosis),
    ("cro", Blockchain::Cronos),
    ("celo", Blockchain::Celo),
    ("mobm", Blockchain::Moonbeam),
    ("linea", Blockchain::Linea),
    ("scrl", Blockchain::Scroll),
    ("era", Blockchain::ZkSync),
];

const COINGECKO_CHAINS: &[(&str, Blockchain)] = &[
    ("ethereum", Blockchain::Ethereum),
    ("binance-smart-chain", Blockchain::BinanceSmartChain),
    ("polygon-pos", Blockchain::Polygon),
    ("arbitrum-one", Blockchain::Arbitrum),
    ("optimistic-ethereum", Blockchain::Optimism),
    ("base", Blockchain::Base),
    ("avalanche", Blockchain::Avalanche),
    ("fantom", Blockchain::Fantom),
    ("xdai", Blockchain::Gnosis),
    ("cronos", Blockchain::Cronos),
    ("celo", Blockchain::Celo),
    ("moonbeam", Blockchain::Moonbeam),
    ("linea", Blockchain::Linea),
    ("scroll", Blockchain::Scroll),
    ("zksync", Blockchain::ZkSync),
    ("solana", Blockchain::Solana),
    ("tron", Blockchain::Tron),
    ("cosmos", Blockchain::Cosmos),
    ("osmosis", Blockchain::Osmosis),
    ("polkadot", Blockchain::Polkadot),
    ("cardano", Blockchain::Cardano),
    ("xrp", Blockchain::Ripple),
    ("stellar", Blockchain::Stellar),
    ("near-protocol", Blockchain::Near),
    ("aptos", Blockchain::Aptos),
    ("sui", Blockchain::Sui),
    ("the-open-network", Blockchain::Ton),
    ("tezos", Blockchain::Tezos),
    ("algorand", Blockchain::Algorand),
];

const ZERION_CHAINS: &[(&str, Blockchain)] = &[
    ("ethereum", Blockchain::Ethereum),
    ("binance-smart-chain", Blockchain::BinanceSmartChain),
    ("polygon", Blockchain::Polygon),
    ("arbitrum", Blockchain::Arbitrum),
    ("optimism", Blockchain::Optimism),
    ("base", Blockchain::Base),
    ("avalanche", Blockchain::Avalanche),
    ("fantom", Blockchain::Fantom),
    ("xdai", Blockchain::Gnosis),
    ("celo", Blockchain::Celo),
    ("linea", Blockchain::Linea),
    ("scroll", Blockchain::Scroll),
    ("zksync-era", Blockchain::ZkSync),
    ("solana", Blockchain::Solana),
];

/// Translates source-specific chain identifiers into canonical chains
#[derive(Debug)]
pub struct ChainResolver {
    /// Per-source lookup tables keyed by the source's native identifier
    sources: DashMap<String, HashMap<String, Blockchain>>,
    /// `(source, identifier)` pairs already reported as unresolved
    unresolved: DashSet<(String, String)>,
}

impl Default for ChainResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainResolver {
    /// Create a resolver with the built-in sources
    pub fn new() -> Self {
        let resolver = Self::empty();

        let chain_ids = Blockchain::all()
            .iter()
            .filter_map(|chain| chain.evm_chain_id().map(|id| (id.to_string(), *chain)));
        resolver.register_source(CHAIN_ID_SOURCE, chain_ids);

        for (source, table) in [
            (DEBANK_SOURCE, DEBANK_CHAINS),
            (COINGECKO_SOURCE, COINGECKO_CHAINS),
            (ZERION_SOURCE, ZERION_CHAINS),
        ] {
            resolver.register_source(
                source,
                table.iter().map(|(id, chain)| ((*id).to_string(), *chain)),
            );
        }

        resolver
    }

    /// Create a resolver without any source tables
    pub fn empty() -> Self {
        Self {
            sources: DashMap::new(),
            unresolved: DashSet::new(),
        }
    }

    /// Adds or extends the table of `source`
    pub fn register_source<I>(&self, source: &str, mapping: I)
    where
        I: IntoIterator<Item = (String, Blockchain)>,
    {
        self.sources
            .entry(source.to_string())
            .or_default()
            .extend(mapping);
    }

    /// Resolves `identifier` as named by `source`
    ///
    /// Never fails; unknown identifiers yield `None`.
    pub fn resolve(&self, source: &str, identifier: &str) -> Option<Blockchain> {
        let identifier = identifier.trim();

        if let Some(chain) = self
            .sources
            .get(source)
            .and_then(|table| table.get(identifier).copied())
        {
            return Some(chain);
        }

        if let Some(chain) = Blockchain::from_canonical(&identifier.to_lowercase()) {
            return Some(chain);
        }

        if self
            .unresolved
            .insert((source.to_string(), identifier.to_string()))
        {
            warn!(source, identifier, "unresolved chain identifier");
        }
        None
    }

    /// Resolves a numeric chain id as named by `source`
    pub fn resolve_id(&self, source: &str, chain_id: u64) -> Option<Blockchain> {
        self.resolve(source, &chain_id.to_string())
    }

    /// Canonical chains named by `source`, sorted and without duplicates
    pub fn chains(&self, source: &str) -> Vec<Blockchain> {
        let mut chains: Vec<_> = self
            .sources
            .get(source)
            .map(|table| table.values().copied().collect())
            .unwrap_or_default();
        chains.sort();
        chains.dedup();
        chains
    }

    /// Number of distinct identifiers that failed to resolve so far
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_source_match_wins() {
        let resolver = ChainResolver::new();
        assert_eq!(resolver.resolve(DEBANK_SOURCE, "bsc"), Some(Blockchain::BinanceSmartChain));
        assert_eq!(resolver.resolve(COINGECKO_SOURCE, "polygon-pos"), Some(Blockchain::Polygon));
        assert_eq!(resolver.resolve(ZERION_SOURCE, "zksync-era"), Some(Blockchain::ZkSync));
        // "xdai" is a source slug, not a canonical one
        assert_eq!(resolver.resolve(DEBANK_SOURCE, "xdai"), Some(Blockchain::Gnosis));
        assert_eq!(resolver.resolve("other", "xdai"), None);
    }

    #[test]
    fn canonical_fallback_is_case_insensitive() {
        let resolver = ChainResolver::new();
        assert_eq!(resolver.resolve("unregistered", "Bitcoin"), Some(Blockchain::Bitcoin));
        assert_eq!(
            resolver.resolve(DEBANK_SOURCE, " binance-smart-chain "),
            Some(Blockchain::BinanceSmartChain)
        );
        assert_eq!(resolver.unresolved_count(), 0);
    }

    #[test]
    fn numeric_chain_ids() {
        let resolver = ChainResolver::new();
        assert_eq!(resolver.resolve_id(CHAIN_ID_SOURCE, 1), Some(Blockchain::Ethereum));
        assert_eq!(resolver.resolve_id(CHAIN_ID_SOURCE, 137), Some(Blockchain::Polygon));
        assert_eq!(resolver.resolve_id(CHAIN_ID_SOURCE, 999_999), None);
    }

    #[test]
    fn unknown_identifiers_are_reported_once() {
        let resolver = ChainResolver::new();
        for _ in 0..3 {
            assert_eq!(resolver.resolve(DEBANK_SOURCE, "does-not-exist"), None);
        }
        assert_eq!(resolver.unresolved_count(), 1);

        assert_eq!(resolver.resolve(ZERION_SOURCE, "does-not-exist"), None);
        assert_eq!(resolver.resolve(DEBANK_SOURCE, ""), None);
        assert_eq!(resolver.unresolved_count(), 3);
    }

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn one_warning_per_unknown_identifier() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let resolver = ChainResolver::new();
            resolver.resolve(DEBANK_SOURCE, "does-not-exist");
            resolver.resolve(DEBANK_SOURCE, "does-not-exist");
            resolver.resolve(DEBANK_SOURCE, "also-unknown");
            resolver.resolve(DEBANK_SOURCE, "eth");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<_> = output
            .lines()
            .filter(|line| line.contains("WARN") && line.contains("unresolved chain identifier"))
            .collect();
        assert_eq!(warnings.len(), 2, "{output}");
        assert_eq!(
            warnings
                .iter()
                .filter(|line| line.contains("does-not-exist"))
                .count(),
            1
        );
    }

    #[test]
    fn registered_sources_extend_tables() {
        let resolver = ChainResolver::empty();
        assert_eq!(resolver.resolve("explorer", "btc"), None);

        resolver.register_source("explorer", [("btc".to_string(), Blockchain::Bitcoin)]);
        resolver.register_source("explorer", [("ltc".to_string(), Blockchain::Litecoin)]);
        assert_eq!(resolver.resolve("explorer", "btc"), Some(Blockchain::Bitcoin));
        assert_eq!(resolver.resolve("explorer", "ltc"), Some(Blockchain::Litecoin));
        assert_eq!(
            resolver.chains("explorer"),
            vec![Blockchain::Bitcoin, Blockchain::Litecoin]
        );
        assert!(resolver.chains("absent").is_empty());
    }
}
