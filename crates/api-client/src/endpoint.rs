// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Endpoint templates
//!
//! Paths and query values use `{name}` for required and `{name?}` for optional
//! placeholders. Rendering happens before any network call, so a missing
//! required parameter surfaces as a caller error rather than a provider one.
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use api_client::EndpointTemplate;
//!
//! let template = EndpointTemplate::new("/address/{address}/txs");
//! let params = BTreeMap::from([("address".to_string(), "bc1q".to_string())]);
//! let rendered = template.render("transactions", &params).unwrap();
//! assert_eq!(rendered.path, "/address/bc1q/txs");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Cursor, ProviderError};

/// How an endpoint paginates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `{offset}`/`{limit}` parameters
    Offset {
        /// Page size
        limit: u64,
    },
    /// `{page}`/`{size}` parameters
    Page {
        /// Page size
        size: u64,
        /// Number of the first page
        #[serde(default = "default_first_page")]
        first_page: u64,
    },
    /// `{cursor?}` parameter filled from a response field
    Cursor {
        /// JSON pointer to the next-page token in the response
        next: String,
    },
}

fn default_first_page() -> u64 {
    1
}

impl PaginationStyle {
    /// Cursor for the first page; token pagination starts without one
    pub fn first_cursor(&self) -> Option<Cursor> {
        match self {
            Self::Offset { limit } => Some(Cursor::Offset {
                offset: 0,
                limit: *limit,
            }),
            Self::Page { size, first_page } => Some(Cursor::Page {
                page: *first_page,
                size: *size,
            }),
            Self::Cursor { .. } => None,
        }
    }
}

/// A named request shape relative to a provider's base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTemplate {
    /// Path template, e.g. `/address/{address}`
    pub path: String,
    /// Query parameter templates
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Pagination shape, if the endpoint pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationStyle>,
}

/// A template with every placeholder filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEndpoint {
    /// Percent-encoded path
    pub path: String,
    /// Query pairs; pairs whose optional placeholders were absent are omitted
    pub query: Vec<(String, String)>,
}

impl EndpointTemplate {
    /// Creates a non-paginated template with no query parameters
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
            pagination: None,
        }
    }

    /// Adds a query parameter template
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Sets the pagination shape
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationStyle) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Fills every placeholder from `params`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MissingParameter` when a required placeholder
    /// has no value, or `ProviderError::Configuration` for an unterminated
    /// placeholder.
    pub fn render(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<RenderedEndpoint, ProviderError> {
        let (path, _) = fill(endpoint, &self.path, params, true)?;

        let mut query = Vec::with_capacity(self.query.len());
        for (name, template) in &self.query {
            let (value, omitted) = fill(endpoint, template, params, false)?;
            if !omitted {
                query.push((name.clone(), value));
            }
        }

        Ok(RenderedEndpoint { path, query })
    }

    /// Names of the required placeholders, in order of appearance
    pub fn required_params(&self) -> Vec<String> {
        let mut names = Vec::new();
        for template in std::iter::once(&self.path).chain(self.query.values()) {
            let mut rest = template.as_str();
            while let Some(start) = rest.find('{') {
                let Some(len) = rest[start..].find('}') else {
                    break;
                };
                let name = &rest[start + 1..start + len];
                if !name.ends_with('?') && !names.iter().any(|known| known == name) {
                    names.push(name.to_string());
                }
                rest = &rest[start + len + 1..];
            }
        }
        names
    }
}

/// Substitutes placeholders in `template`
///
/// Returns the rendered text and whether an optional placeholder was absent,
/// which drops the whole query pair.
fn fill(
    endpoint: &str,
    template: &str,
    params: &BTreeMap<String, String>,
    encode_path: bool,
) -> Result<(String, bool), ProviderError> {
    let mut rendered = String::with_capacity(template.len());
    let mut omitted = false;
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            return Err(ProviderError::config(format!(
                "unterminated placeholder in endpoint `{endpoint}` template `{template}`"
            )));
        };
        let placeholder = &rest[start + 1..start + len];
        let (name, optional) = match placeholder.strip_suffix('?') {
            Some(name) => (name, true),
            None => (placeholder, false),
        };

        match params.get(name).filter(|value| !value.is_empty()) {
            Some(value) if encode_path => rendered.push_str(&encode_segment(endpoint, value)?),
            Some(value) => rendered.push_str(value),
            None if optional => omitted = true,
            None => {
                return Err(ProviderError::MissingParameter {
                    endpoint: endpoint.to_string(),
                    name: name.to_string(),
                });
            }
        }
        rest = &rest[start + len + 1..];
    }
    rendered.push_str(rest);

    Ok((rendered, omitted))
}

/// Percent-encodes `value` as a single path segment
fn encode_segment(endpoint: &str, value: &str) -> Result<String, ProviderError> {
    let unusable = || ProviderError::config(format!("cannot encode path of endpoint `{endpoint}`"));
    let mut url = Url::parse("http://localhost/").map_err(|_| unusable())?;
    url.path_segments_mut()
        .map_err(|()| unusable())?
        .pop_if_empty()
        .push(value);
    Ok(url.path().trim_start_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn renders_path_and_query() {
        let template = EndpointTemplate::new("/api/{address}/tokens")
            .with_query("page", "{page}")
            .with_query("chain", "eth");
        let rendered = template
            .render(
                "balance",
                &params(&[("address", "0xabc"), ("page", "2")]),
            )
            .unwrap();
        assert_eq!(rendered.path, "/api/0xabc/tokens");
        assert_eq!(
            rendered.query,
            vec![
                ("chain".to_string(), "eth".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn missing_required_parameter_is_a_caller_error() {
        let template = EndpointTemplate::new("/collections/{contract}/stats");
        let error = template.render("collection_stats", &params(&[])).unwrap_err();
        assert_eq!(
            error,
            ProviderError::MissingParameter {
                endpoint: "collection_stats".to_string(),
                name: "contract".to_string()
            }
        );
        assert!(error.is_caller_error());
    }

    #[test]
    fn optional_query_parameter_is_omitted() {
        let template = EndpointTemplate::new("/txs/{address}").with_query("cursor", "{cursor?}");
        let rendered = template
            .render("transactions", &params(&[("address", "abc")]))
            .unwrap();
        assert!(rendered.query.is_empty());

        let rendered = template
            .render(
                "transactions",
                &params(&[("address", "abc"), ("cursor", "xyz")]),
            )
            .unwrap();
        assert_eq!(
            rendered.query,
            vec![("cursor".to_string(), "xyz".to_string())]
        );
    }

    #[test]
    fn path_values_are_encoded() {
        let template = EndpointTemplate::new("/account/{address}");
        let rendered = template
            .render("balance", &params(&[("address", "a/b c")]))
            .unwrap();
        assert_eq!(rendered.path, "/account/a%2Fb%20c");

        let rendered = template
            .render("balance", &params(&[("address", "x+y?z#1")]))
            .unwrap();
        assert_eq!(rendered.path, "/account/x+y%3Fz%231");
    }

    #[test]
    fn unterminated_placeholder_is_a_configuration_error() {
        let template = EndpointTemplate::new("/account/{address");
        assert!(matches!(
            template.render("balance", &params(&[("address", "a")])),
            Err(ProviderError::Configuration { .. })
        ));
    }

    #[test]
    fn lists_required_parameters() {
        let template = EndpointTemplate::new("/{address}/nfts/{contract}")
            .with_query("cursor", "{cursor?}")
            .with_query("limit", "{limit}");
        assert_eq!(
            template.required_params(),
            vec!["address".to_string(), "contract".to_string(), "limit".to_string()]
        );
    }

    #[test]
    fn first_cursor_per_style() {
        assert_eq!(
            PaginationStyle::Offset { limit: 25 }.first_cursor(),
            Some(Cursor::Offset {
                offset: 0,
                limit: 25
            })
        );
        assert_eq!(
            PaginationStyle::Page {
                size: 10,
                first_page: 0
            }
            .first_cursor(),
            Some(Cursor::Page { page: 0, size: 10 })
        );
        assert_eq!(
            PaginationStyle::Cursor {
                next: "/next".to_string()
            }
            .first_cursor(),
            None
        );
    }

    #[test]
    fn pagination_deserializes_with_default_first_page() {
        let style: PaginationStyle =
            serde_json::from_str(r#"{"style":"page","size":100}"#).unwrap();
        assert_eq!(
            style,
            PaginationStyle::Page {
                size: 100,
                first_page: 1
            }
        );
    }
}
