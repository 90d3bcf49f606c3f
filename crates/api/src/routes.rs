// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration and handlers for the server.

pub mod handlers;

use axum::{Router, routing::get};
use handlers::{
    balance_handler, chains_handler, collection_stats_handler, health_handler,
    nft_offers_handler, nfts_handler, transactions_handler,
};

use crate::state::ServerState;

/// Create application routes
pub fn create_routes() -> Router<ServerState> {
    let health_routes = Router::new().route("/health", get(health_handler));

    let api_routes = Router::new()
        .route("/chains", get(chains_handler))
        .route("/{chain}/balance/{address}", get(balance_handler))
        .route("/{chain}/transactions/{address}", get(transactions_handler))
        .route("/{chain}/nfts/{address}", get(nfts_handler))
        .route("/{chain}/nft-offers/{address}", get(nft_offers_handler))
        .route(
            "/{chain}/collections/{contract}/stats",
            get(collection_stats_handler),
        );

    Router::new()
        .merge(health_routes)
        .nest("/v1", api_routes)
}
