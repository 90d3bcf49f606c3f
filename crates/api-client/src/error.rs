// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider error taxonomy
//!
//! Every provider response is classified once into a small set of conditions
//! callers can branch on. Classification is pure: it looks at the HTTP status
//! first, then at provider-specific substrings and envelope fields in the
//! body, and falls back to [`ErrorClass::GenericApiError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::Operation;

/// Longest body excerpt kept in an error message
const MAX_MESSAGE_CHARS: usize = 512;

/// Classification of a failed provider response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The address is malformed or unknown to the provider's index
    AddressNotExist,
    /// Rate limited, gateway failure or a "try again" body; retried once
    Gateway,
    /// Any other server-side failure
    InternalProviderError,
    /// Any other non-success status or error envelope
    GenericApiError,
}

/// Provider-specific body vocabulary used during classification
///
/// Substrings are matched case-insensitively. `error_fields` are JSON pointers
/// whose presence with a non-empty, non-false value marks a 2xx response as
/// an error envelope. `status_fields` cover APIs that always send every field
/// and flag failures through a status value instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPatterns {
    /// Substrings meaning the address is invalid or unknown
    #[serde(default)]
    pub address_not_exist: Vec<String>,
    /// Substrings meaning the request should be retried
    #[serde(default)]
    pub retry: Vec<String>,
    /// JSON pointers to error envelope fields
    #[serde(default)]
    pub error_fields: Vec<String>,
    /// Status flags marking a 2xx response as an error envelope
    #[serde(default)]
    pub status_fields: Vec<StatusEnvelope>,
}

/// A status flag that marks a 2xx body as an error envelope
///
/// Etherscan-style APIs answer `{"status":"0","message":"NOTOK","result":"..."}`
/// with HTTP 200. The envelope text joins the `message` pointers, so the usual
/// vocabulary applies to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    /// JSON pointer to the status flag
    pub field: String,
    /// Flag value meaning failure, compared as text
    pub equals: String,
    /// JSON pointers whose text makes up the envelope message
    #[serde(default)]
    pub message: Vec<String>,
    /// Substrings of the message that still mean success, e.g. an empty result
    #[serde(default)]
    pub except: Vec<String>,
}

impl StatusEnvelope {
    fn envelope_text(&self, json: &Value) -> Option<String> {
        let flag = match json.pointer(&self.field)? {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            _ => return None,
        };
        if flag != self.equals {
            return None;
        }

        let parts: Vec<&str> = self
            .message
            .iter()
            .filter_map(|pointer| json.pointer(pointer)?.as_str())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect();
        let message = if parts.is_empty() {
            format!("{} is {}", self.field, self.equals)
        } else {
            parts.join(": ")
        };

        let lowered = message.to_lowercase();
        if ErrorPatterns::matches_any(&self.except, &lowered) {
            return None;
        }
        Some(message)
    }
}

impl ErrorPatterns {
    /// Vocabulary shared by most explorer APIs
    pub fn standard() -> Self {
        Self {
            address_not_exist: vec![
                "invalid address".to_string(),
                "address not found".to_string(),
                "unknown address".to_string(),
                "address is not valid".to_string(),
            ],
            retry: vec![
                "try again".to_string(),
                "too many requests".to_string(),
                "rate limit".to_string(),
                "temporarily unavailable".to_string(),
            ],
            error_fields: vec!["/error".to_string()],
            status_fields: Vec::new(),
        }
    }

    /// Adds the patterns of `other` that are not already present
    #[must_use]
    pub fn extended_with(mut self, other: &ErrorPatterns) -> Self {
        let extend = |target: &mut Vec<String>, source: &[String]| {
            for pattern in source {
                if !target.contains(pattern) {
                    target.push(pattern.clone());
                }
            }
        };
        extend(&mut self.address_not_exist, &other.address_not_exist);
        extend(&mut self.retry, &other.retry);
        extend(&mut self.error_fields, &other.error_fields);
        for rule in &other.status_fields {
            if !self.status_fields.contains(rule) {
                self.status_fields.push(rule.clone());
            }
        }
        self
    }

    fn matches_any(patterns: &[String], haystack: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| haystack.contains(&pattern.to_lowercase()))
    }

    /// Returns the envelope text when a JSON body carries an error field
    fn envelope(&self, body: &str) -> Option<String> {
        let json: Value = serde_json::from_str(body).ok()?;
        self.error_fields
            .iter()
            .find_map(|pointer| {
                let value = json.pointer(pointer)?;
                match value {
                    Value::Null | Value::Bool(false) => None,
                    Value::String(text) if text.trim().is_empty() => None,
                    Value::Array(items) if items.is_empty() => None,
                    Value::Object(fields) if fields.is_empty() => None,
                    Value::String(text) => Some(text.clone()),
                    other => Some(other.to_string()),
                }
            })
            .or_else(|| {
                self.status_fields
                    .iter()
                    .find_map(|rule| rule.envelope_text(&json))
            })
    }
}

/// Classifies a response; `None` means success
///
/// Order of inspection: gateway status codes (429, 502, 503, 504) and request
/// timeouts (408), then body vocabulary for any non-success status or error
/// envelope, then the remaining 5xx range, then the generic fallback.
pub fn classify(status: u16, body: &str, patterns: &ErrorPatterns) -> Option<ErrorClass> {
    if matches!(status, 408 | 429 | 502 | 503 | 504) {
        return Some(ErrorClass::Gateway);
    }

    let success = (200..300).contains(&status);
    let envelope = patterns.envelope(body);
    if success && envelope.is_none() {
        return None;
    }

    // A 2xx envelope is judged by its message only, so token names or
    // metadata in the payload cannot trigger a false match.
    let haystack = match (&envelope, success) {
        (Some(message), true) => message.to_lowercase(),
        _ => body.to_lowercase(),
    };

    if ErrorPatterns::matches_any(&patterns.address_not_exist, &haystack) {
        Some(ErrorClass::AddressNotExist)
    } else if ErrorPatterns::matches_any(&patterns.retry, &haystack) {
        Some(ErrorClass::Gateway)
    } else if (500..600).contains(&status) {
        Some(ErrorClass::InternalProviderError)
    } else {
        Some(ErrorClass::GenericApiError)
    }
}

/// Builds the message attached to a classified failure
///
/// Prefers an error envelope's text, then the body, then the status reason.
pub fn failure_message(status: u16, body: &str, patterns: &ErrorPatterns, reason: &str) -> String {
    let message = patterns
        .envelope(body)
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return reason.to_string();
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        return format!("{truncated}... ({status})");
    }
    message
}

/// Errors surfaced by providers and the shared fetch machinery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ProviderError {
    /// Malformed address, detected before any network call
    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Endpoint template parameter missing, detected before any network call
    #[error("missing required parameter `{name}` for endpoint `{endpoint}`")]
    MissingParameter { endpoint: String, name: String },

    /// The provider has no endpoint for the operation
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: Operation,
    },

    /// The provider reports the address as invalid or unknown
    #[error("address does not exist: {message}")]
    AddressNotExist { message: String },

    /// Rate limited, gateway failure or transient body
    #[error("provider temporarily unavailable ({}): {message}", status_label(.status))]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    /// Server-side failure not covered by `Gateway`
    #[error("internal provider error ({status}): {message}")]
    Internal { status: u16, message: String },

    /// Any other provider error
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request did not complete in time
    #[error("request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Transport failure other than timeouts and connection errors
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// The response body could not be understood
    #[error("invalid response format: {message}")]
    InvalidResponse { message: String },

    /// The provider is misconfigured
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

#[allow(clippy::ref_option)]
fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "transport".to_string(), |status| status.to_string())
}

impl ProviderError {
    /// Builds the error for a classified response
    pub fn from_class(class: ErrorClass, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match class {
            ErrorClass::AddressNotExist => Self::AddressNotExist { message },
            ErrorClass::Gateway => Self::Gateway {
                status: Some(status),
                message,
            },
            ErrorClass::InternalProviderError => Self::Internal { status, message },
            ErrorClass::GenericApiError => Self::Api { status, message },
        }
    }

    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<T: ToString>(message: T) -> Self {
        Self::InvalidResponse {
            message: message.to_string(),
        }
    }

    /// Taxonomy class of the error, if it came from a provider response
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::AddressNotExist { .. } => Some(ErrorClass::AddressNotExist),
            Self::Gateway { .. } | Self::Timeout { .. } => Some(ErrorClass::Gateway),
            Self::Internal { .. } => Some(ErrorClass::InternalProviderError),
            Self::Api { .. } | Self::InvalidResponse { .. } => Some(ErrorClass::GenericApiError),
            Self::InvalidAddress { .. }
            | Self::MissingParameter { .. }
            | Self::Unsupported { .. }
            | Self::Http { .. }
            | Self::Configuration { .. } => None,
        }
    }

    /// Whether the error is eligible for the single transient retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway { .. } | Self::Timeout { .. })
    }

    /// Whether the caller supplied bad input
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. } | Self::MissingParameter { .. }
        )
    }

    /// Whether trying another provider cannot help
    pub fn is_terminal(&self) -> bool {
        self.is_caller_error() || matches!(self, Self::AddressNotExist { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses_win_over_body() {
        let patterns = ErrorPatterns::standard();
        for status in [429, 502, 503, 504] {
            assert_eq!(
                classify(status, "invalid address", &patterns),
                Some(ErrorClass::Gateway)
            );
        }
        assert_eq!(
            classify(503, "Service Unavailable", &patterns),
            Some(ErrorClass::Gateway)
        );
    }

    #[test]
    fn body_vocabulary_refines_other_failures() {
        let patterns = ErrorPatterns::standard();
        assert_eq!(
            classify(400, r#"{"error":"Invalid address format"}"#, &patterns),
            Some(ErrorClass::AddressNotExist)
        );
        assert_eq!(
            classify(500, "please try again later", &patterns),
            Some(ErrorClass::Gateway)
        );
        assert_eq!(
            classify(500, "database exploded", &patterns),
            Some(ErrorClass::InternalProviderError)
        );
        assert_eq!(
            classify(404, "not here", &patterns),
            Some(ErrorClass::GenericApiError)
        );
    }

    #[test]
    fn success_without_envelope_is_not_an_error() {
        let patterns = ErrorPatterns::standard();
        assert_eq!(classify(200, r#"{"balance":"1"}"#, &patterns), None);
        assert_eq!(classify(200, r#"{"error":null}"#, &patterns), None);
        assert_eq!(classify(200, r#"{"error":false}"#, &patterns), None);
        assert_eq!(classify(204, "", &patterns), None);
    }

    #[test]
    fn success_with_envelope_is_classified_by_its_message() {
        let patterns = ErrorPatterns {
            error_fields: vec!["/message".to_string()],
            ..ErrorPatterns::standard()
        };
        assert_eq!(
            classify(200, r#"{"message":"Rate limit reached"}"#, &patterns),
            Some(ErrorClass::Gateway)
        );
        assert_eq!(
            classify(200, r#"{"message":"Address not found"}"#, &patterns),
            Some(ErrorClass::AddressNotExist)
        );
        assert_eq!(
            classify(200, r#"{"message":"NOTOK"}"#, &patterns),
            Some(ErrorClass::GenericApiError)
        );
    }

    fn status_flagged() -> ErrorPatterns {
        ErrorPatterns {
            retry: vec!["max rate limit reached".to_string()],
            address_not_exist: vec!["invalid address format".to_string()],
            status_fields: vec![StatusEnvelope {
                field: "/status".to_string(),
                equals: "0".to_string(),
                message: vec!["/message".to_string(), "/result".to_string()],
                except: vec!["no transactions found".to_string()],
            }],
            ..ErrorPatterns::default()
        }
    }

    #[test]
    fn status_flag_marks_success_as_envelope() {
        let patterns = ErrorPatterns::standard().extended_with(&status_flagged());
        let limited = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        assert_eq!(classify(200, limited, &patterns), Some(ErrorClass::Gateway));
        assert_eq!(
            failure_message(200, limited, &patterns, "OK"),
            "NOTOK: Max rate limit reached"
        );

        let bad_address = r#"{"status":"0","message":"NOTOK","result":"Error! Invalid address format"}"#;
        assert_eq!(
            classify(200, bad_address, &patterns),
            Some(ErrorClass::AddressNotExist)
        );
        let bad_key = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        assert_eq!(
            classify(200, bad_key, &patterns),
            Some(ErrorClass::GenericApiError)
        );
    }

    #[test]
    fn status_flag_success_and_exceptions() {
        let patterns = status_flagged();
        let ok = r#"{"status":"1","message":"OK","result":"40891631566070000000000"}"#;
        assert_eq!(classify(200, ok, &patterns), None);
        let empty = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert_eq!(classify(200, empty, &patterns), None);
    }

    #[test]
    fn success_payload_text_is_not_matched_without_envelope() {
        let patterns = ErrorPatterns::standard();
        let body = r#"{"tokens":[{"name":"try again token"}]}"#;
        assert_eq!(classify(200, body, &patterns), None);
    }

    #[test]
    fn failure_message_prefers_envelope() {
        let patterns = ErrorPatterns::standard();
        assert_eq!(
            failure_message(400, r#"{"error":"bad things"}"#, &patterns, "Bad Request"),
            "bad things"
        );
        assert_eq!(
            failure_message(503, "Service Unavailable", &patterns, "Service Unavailable"),
            "Service Unavailable"
        );
        assert_eq!(failure_message(502, "", &patterns, "Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn error_predicates() {
        let gateway = ProviderError::from_class(ErrorClass::Gateway, 503, "down");
        assert!(gateway.is_retryable());
        assert!(!gateway.is_terminal());

        let missing = ProviderError::AddressNotExist {
            message: "nope".to_string(),
        };
        assert!(!missing.is_retryable());
        assert!(missing.is_terminal());
        assert!(!missing.is_caller_error());

        let invalid = ProviderError::InvalidAddress {
            address: "x".to_string(),
            reason: "too short".to_string(),
        };
        assert!(invalid.is_caller_error());
        assert_eq!(invalid.class(), None);

        assert_eq!(
            ProviderError::Timeout { timeout_seconds: 5 }.class(),
            Some(ErrorClass::Gateway)
        );
    }

    #[test]
    fn error_display() {
        let error = ProviderError::Gateway {
            status: Some(503),
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "provider temporarily unavailable (503): Service Unavailable"
        );
        let error = ProviderError::Gateway {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "provider temporarily unavailable (transport): connection refused"
        );
    }
}
