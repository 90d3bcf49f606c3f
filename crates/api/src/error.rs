// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Server lifecycle errors and the HTTP mapping of lookup failures.

use std::net::SocketAddr;

use api_client::ProviderError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use external_apis::{AggregateError, DefinitionError};
use serde_json::json;
use thiserror::Error;

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Provider definitions could not be loaded
    #[error("Provider definitions error: {0}")]
    Definitions(#[from] DefinitionError),

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// Malformed path or query input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A canonical lookup failed
    #[error(transparent)]
    Lookup(#[from] AggregateError),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Config { .. }
            | ServerError::Definitions(..)
            | ServerError::Bind { .. }
            | ServerError::Startup { .. }
            | ServerError::Shutdown { .. }
            | ServerError::TaskJoin { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::ValidationError(..) => StatusCode::BAD_REQUEST,
            ServerError::Lookup(error) => lookup_status(error),
        }
    }

    /// Machine-readable error kind
    fn kind(&self) -> &'static str {
        match self {
            ServerError::ValidationError(..) => "invalid_request",
            ServerError::Lookup(error) => match error {
                AggregateError::NoProviders { .. } => "unsupported",
                AggregateError::UnknownProvider { .. } => "invalid_cursor",
                AggregateError::Provider { source, .. } => provider_kind(source),
                AggregateError::AllProvidersFailed { .. } => "providers_failed",
                AggregateError::LookupTimeout { .. } => "timeout",
            },
            _ => "internal",
        }
    }
}

fn lookup_status(error: &AggregateError) -> StatusCode {
    match error {
        AggregateError::NoProviders { .. } => StatusCode::NOT_FOUND,
        AggregateError::UnknownProvider { .. } => StatusCode::BAD_REQUEST,
        AggregateError::Provider { source, .. } => provider_status(source),
        AggregateError::AllProvidersFailed { failures } => {
            let statuses: Vec<_> = failures.iter().map(|f| provider_status(&f.error)).collect();
            match statuses.first() {
                Some(first) if statuses.iter().all(|status| status == first) => *first,
                _ => StatusCode::BAD_GATEWAY,
            }
        }
        AggregateError::LookupTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn provider_status(error: &ProviderError) -> StatusCode {
    match error {
        _ if error.is_caller_error() => StatusCode::BAD_REQUEST,
        ProviderError::AddressNotExist { .. } | ProviderError::Unsupported { .. } => {
            StatusCode::NOT_FOUND
        }
        ProviderError::Gateway { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn provider_kind(error: &ProviderError) -> &'static str {
    match error {
        ProviderError::InvalidAddress { .. } => "invalid_address",
        ProviderError::MissingParameter { .. } => "missing_parameter",
        ProviderError::Unsupported { .. } => "unsupported",
        ProviderError::AddressNotExist { .. } => "address_not_exist",
        ProviderError::Gateway { .. } => "gateway",
        ProviderError::Timeout { .. } => "timeout",
        _ => "provider_error",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}
