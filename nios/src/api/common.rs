//! Common types and utilities for the WAPI

use serde::Deserialize;
use serde_json::{Map, Value};

/// A WAPI object as returned by the appliance
pub type WapiObject = Map<String, Value>;

/// Envelope used when `_return_as_object=1` is requested
#[derive(Debug, Deserialize)]
pub struct WapiResult<T> {
    pub result: T,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct WapiErrorResponse {
    #[serde(rename = "Error")]
    pub error: Option<String>,
    pub code: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("WAPI error details: code={code:?}, text={text:?}")]
pub struct WapiErrorDetails {
    pub code: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Ask for these fields on top of the object's defaults
    pub fn return_fields_plus(self, fields: &[&str]) -> Self {
        if fields.is_empty() {
            return self;
        }
        self.add("_return_fields+", fields.join(","))
    }

    /// Wrap responses in `{"result": ...}`
    pub fn return_as_object(self) -> Self {
        self.add("_return_as_object", 1)
    }

    /// Filter on an extensible attribute value
    pub fn ext_attr_filter(self, name: &str, value: &str) -> Self {
        self.add(format!("*{}", name), value)
    }

    /// Have the grid master answer the search
    pub fn proxy_search_gm(self) -> Self {
        self.add("_proxy_search", "GM")
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}
