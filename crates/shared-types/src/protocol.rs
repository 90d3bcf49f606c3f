// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! DeFi protocol and position metadata

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Blockchain;

/// A DeFi application as described by a protocol directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Directory identifier, also the protocol's identity
    pub id: String,
    /// Chain the protocol is deployed on
    pub blockchain: Blockchain,
    /// Display name
    pub name: String,
    /// Total value deposited by users, in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_deposits: Option<Decimal>,
    /// Project website
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    /// Logo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Whether the directory can report per-user positions for it
    #[serde(default)]
    pub has_portfolio_detail: bool,
}

/// One on-chain position grouping several balance legs
///
/// A lending position, for example, carries collateral, debt and reward legs
/// that all point at the same `PoolInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool identifier
    pub id: String,
    /// Owning protocol identifier
    pub project_id: String,
    /// Position type as shown by the provider, e.g. `"Lending"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider adapter that decoded the position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    /// Controlling contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Position index within the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_index: Option<String>,
    /// Constituent token identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

impl PoolInfo {
    /// Creates a pool with only its identity set
    pub fn new(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: None,
            adapter_id: None,
            controller: None,
            position_index: None,
            tokens: None,
        }
    }
}
