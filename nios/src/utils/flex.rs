//! Conversions between WAPI JSON values and Terraform values
//!
//! Terraform numbers are `f64`; WAPI integers are sent as JSON integers, so
//! every integer crossing the boundary must be whole.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use tfplug::types::Dynamic;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FlexError {
    #[error("{field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: String,
    },

    #[error("{field}: {value} is not a whole number")]
    NotWhole { field: String, value: f64 },

    #[error("{field}: {value:?} is not a valid IP address")]
    InvalidIp { field: String, value: String },

    #[error("{field}: value is not known yet")]
    Unknown { field: String },
}

fn mismatch(field: &str, expected: &'static str, actual: &Dynamic) -> FlexError {
    FlexError::TypeMismatch {
        field: field.to_string(),
        expected,
        actual: actual.type_name().to_string(),
    }
}

pub fn string_to_dynamic(value: Option<&str>) -> Dynamic {
    value.map(Dynamic::string).unwrap_or(Dynamic::Null)
}

/// WAPI returns "" for cleared optional strings; treat that as null
pub fn optional_string_to_dynamic(value: Option<&str>) -> Dynamic {
    match value {
        Some(s) if !s.is_empty() => Dynamic::string(s),
        _ => Dynamic::Null,
    }
}

pub fn dynamic_to_string(field: &str, value: &Dynamic) -> Result<Option<String>, FlexError> {
    match value {
        Dynamic::Null | Dynamic::Unknown => Ok(None),
        Dynamic::String(s) => Ok(Some(s.clone())),
        other => Err(mismatch(field, "string", other)),
    }
}

pub fn bool_to_dynamic(value: Option<bool>) -> Dynamic {
    value.map(Dynamic::Bool).unwrap_or(Dynamic::Null)
}

pub fn dynamic_to_bool(field: &str, value: &Dynamic) -> Result<Option<bool>, FlexError> {
    match value {
        Dynamic::Null | Dynamic::Unknown => Ok(None),
        Dynamic::Bool(b) => Ok(Some(*b)),
        other => Err(mismatch(field, "bool", other)),
    }
}

pub fn int64_to_dynamic(value: Option<i64>) -> Dynamic {
    value
        .map(|v| Dynamic::Number(v as f64))
        .unwrap_or(Dynamic::Null)
}

pub fn dynamic_to_int64(field: &str, value: &Dynamic) -> Result<Option<i64>, FlexError> {
    match value {
        Dynamic::Null | Dynamic::Unknown => Ok(None),
        Dynamic::Number(n) => {
            if n.fract() != 0.0 || !n.is_finite() || n.abs() >= i64::MAX as f64 {
                return Err(FlexError::NotWhole {
                    field: field.to_string(),
                    value: *n,
                });
            }
            Ok(Some(*n as i64))
        }
        other => Err(mismatch(field, "number", other)),
    }
}

/// Canonical text form of an address, `None` when it does not parse
pub fn normalize_ip(text: &str) -> Option<String> {
    text.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Two spellings of the same address, e.g. `2001:db8::1` and `2001:0db8:0:0::1`
pub fn ip_equivalent(a: &str, b: &str) -> bool {
    match (a.trim().parse::<IpAddr>(), b.trim().parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn dynamic_to_ip(field: &str, value: &Dynamic) -> Result<Option<String>, FlexError> {
    let Some(text) = dynamic_to_string(field, value)? else {
        return Ok(None);
    };
    normalize_ip(&text)
        .map(Some)
        .ok_or_else(|| FlexError::InvalidIp {
            field: field.to_string(),
            value: text,
        })
}

/// Keep the configured spelling when the appliance returns an equivalent address
pub fn flatten_ip(api: Option<&str>, prior: &Dynamic) -> Dynamic {
    match (api, prior.as_str()) {
        (Some(api), Some(prior)) if ip_equivalent(api, prior) => Dynamic::string(prior),
        (Some(api), _) => Dynamic::string(api),
        (None, _) => Dynamic::Null,
    }
}

pub fn dynamic_to_string_list(
    field: &str,
    value: &Dynamic,
) -> Result<Option<Vec<String>>, FlexError> {
    match value {
        Dynamic::Null | Dynamic::Unknown => Ok(None),
        Dynamic::List(items) => items
            .iter()
            .map(|item| match item {
                Dynamic::String(s) => Ok(s.clone()),
                Dynamic::Unknown => Err(FlexError::Unknown {
                    field: field.to_string(),
                }),
                other => Err(mismatch(field, "string", other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(mismatch(field, "list", other)),
    }
}

pub fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::Null,
        Value::Bool(b) => Dynamic::Bool(*b),
        Value::Number(n) => n.as_f64().map(Dynamic::Number).unwrap_or(Dynamic::Null),
        Value::String(s) => Dynamic::String(s.clone()),
        Value::Array(items) => Dynamic::List(items.iter().map(json_to_dynamic).collect()),
        Value::Object(map) => Dynamic::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_dynamic(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

/// Whole numbers become JSON integers; unknown values cannot be sent
pub fn dynamic_to_json(field: &str, value: &Dynamic) -> Result<Value, FlexError> {
    match value {
        Dynamic::Null => Ok(Value::Null),
        Dynamic::Unknown => Err(FlexError::Unknown {
            field: field.to_string(),
        }),
        Dynamic::Bool(b) => Ok(Value::Bool(*b)),
        Dynamic::Number(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Ok(Value::from(*n as i64))
            } else {
                Number::from_f64(*n)
                    .map(Value::Number)
                    .ok_or_else(|| FlexError::NotWhole {
                        field: field.to_string(),
                        value: *n,
                    })
            }
        }
        Dynamic::String(s) => Ok(Value::String(s.clone())),
        Dynamic::List(items) => items
            .iter()
            .map(|item| dynamic_to_json(field, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Dynamic::Map(map) => {
            let mut object = Map::new();
            for (k, v) in map {
                object.insert(k.clone(), dynamic_to_json(&format!("{}.{}", field, k), v)?);
            }
            Ok(Value::Object(object))
        }
    }
}
