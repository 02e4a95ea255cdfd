//! Extensible attribute reconciliation
//!
//! WAPI objects carry extensible attributes (EAs). Some are set by the user,
//! some are inherited from a parent object (a network, a zone) and one,
//! [`INTERNAL_ID_KEY`], is written by the provider to find objects again
//! after their reference changes. Terraform state keeps two maps:
//!
//! * `extattrs`: the EAs the user owns. Inherited entries never show up here
//!   unless the user configured the same key, in which case the planned
//!   value is kept.
//! * `extattrs_all`: everything the appliance returned, tracking key included.
//!
//! In configuration every EA value is text. Integers are written as digits
//! and list values as JSON arrays, either `["a","b"]` or `['a','b']`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tfplug::types::Dynamic;

/// EA holding the provider's tracking UUID
pub const INTERNAL_ID_KEY: &str = "Terraform Internal ID";

/// A single EA value as WAPI types it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtAttrValue {
    Int(i64),
    String(String),
    List(Vec<ExtAttrValue>),
}

impl ExtAttrValue {
    pub fn to_json(&self) -> Value {
        match self {
            ExtAttrValue::Int(i) => Value::from(*i),
            ExtAttrValue::String(s) => Value::String(s.clone()),
            ExtAttrValue::List(items) => Value::Array(items.iter().map(|i| i.to_json()).collect()),
        }
    }

    /// Text form used in Terraform state
    fn render(&self, single_quotes: bool) -> String {
        match self {
            ExtAttrValue::Int(i) => i.to_string(),
            ExtAttrValue::String(s) => s.clone(),
            ExtAttrValue::List(_) => {
                let text = self.to_json().to_string();
                if single_quotes {
                    text.replace('"', "'")
                } else {
                    text
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtAttr {
    pub value: ExtAttrValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance_source: Option<Value>,
}

impl ExtAttr {
    pub fn new(value: ExtAttrValue) -> Self {
        Self {
            value,
            inheritance_source: None,
        }
    }

    pub fn is_inherited(&self) -> bool {
        self.inheritance_source.is_some()
    }
}

pub type ExtAttrs = BTreeMap<String, ExtAttr>;

#[derive(Debug, thiserror::Error)]
pub enum ExtAttrError {
    #[error("extensible attribute {key:?}: {value:?} is not a valid list: {source}")]
    MalformedList {
        key: String,
        value: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("extensible attribute {key:?}: expected a string value, got {actual}")]
    NotAString { key: String, actual: String },

    #[error("extensible attribute {key:?}: value is not known yet")]
    Unknown { key: String },

    #[error("extensible attributes must be a map, got {0}")]
    NotAMap(String),

    #[error("invalid extensible attributes in response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Owned and complete EA maps computed from an API response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciled {
    pub owned: Option<ExtAttrs>,
    pub all: ExtAttrs,
}

/// Parse configured EA text: bracketed text is a list, digits are an
/// integer, anything else a string
pub fn parse_ext_attr_value(key: &str, text: &str) -> Result<ExtAttrValue, ExtAttrError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return match serde_json::from_str::<Vec<ExtAttrValue>>(trimmed) {
            Ok(items) => Ok(ExtAttrValue::List(items)),
            Err(_) => serde_json::from_str::<Vec<ExtAttrValue>>(&trimmed.replace('\'', "\""))
                .map(ExtAttrValue::List)
                .map_err(|source| ExtAttrError::MalformedList {
                    key: key.to_string(),
                    value: text.to_string(),
                    source,
                }),
        };
    }

    // "007" and "+5" stay strings so the state text matches the config
    match text.parse::<i64>() {
        Ok(i) if i.to_string() == text => Ok(ExtAttrValue::Int(i)),
        _ => Ok(ExtAttrValue::String(text.to_string())),
    }
}

/// Terraform map of EA text to typed EAs; `None` for a null or unknown map
pub fn expand_ext_attrs(plan: &Dynamic) -> Result<Option<ExtAttrs>, ExtAttrError> {
    let map = match plan {
        Dynamic::Null | Dynamic::Unknown => return Ok(None),
        Dynamic::Map(map) => map,
        other => return Err(ExtAttrError::NotAMap(other.type_name().to_string())),
    };

    let mut out = ExtAttrs::new();
    for (key, value) in map {
        let text = match value {
            Dynamic::String(s) => s,
            Dynamic::Unknown => return Err(ExtAttrError::Unknown { key: key.clone() }),
            other => {
                return Err(ExtAttrError::NotAString {
                    key: key.clone(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        out.insert(key.clone(), ExtAttr::new(parse_ext_attr_value(key, text)?));
    }
    Ok(Some(out))
}

fn uses_single_quotes(prior: &Dynamic, key: &str) -> bool {
    prior
        .as_map()
        .and_then(|m| m.get(key))
        .and_then(Dynamic::as_str)
        .map(str::trim)
        .is_some_and(|s| s.starts_with('[') && s.ends_with(']') && s.contains('\''))
}

fn render_map(prior: &Dynamic, eas: &ExtAttrs) -> HashMap<String, Dynamic> {
    eas.iter()
        .map(|(key, ea)| {
            let text = ea.value.render(uses_single_quotes(prior, key));
            (key.clone(), Dynamic::String(text))
        })
        .collect()
}

/// Typed EAs back to Terraform text, keeping the quote style `prior` used
/// for list values. Absent or empty maps flatten to null.
pub fn flatten_ext_attrs(prior: &Dynamic, api: Option<&ExtAttrs>) -> Dynamic {
    match api {
        Some(eas) if !eas.is_empty() => Dynamic::Map(render_map(prior, eas)),
        _ => Dynamic::Null,
    }
}

/// Split an API EA map into what the plan owns and what the object carries
pub fn remove_inherited_ext_attrs(
    plan: &Dynamic,
    api: &ExtAttrs,
) -> Result<Reconciled, ExtAttrError> {
    Ok(split_ext_attrs(expand_ext_attrs(plan)?.as_ref(), api))
}

fn split_ext_attrs(planned: Option<&ExtAttrs>, api: &ExtAttrs) -> Reconciled {
    let Some(planned) = planned else {
        let all = api
            .get(INTERNAL_ID_KEY)
            .map(|id| ExtAttrs::from([(INTERNAL_ID_KEY.to_string(), ExtAttr::new(id.value.clone()))]))
            .unwrap_or_default();
        return Reconciled { owned: None, all };
    };

    let mut owned = ExtAttrs::new();
    let mut all = ExtAttrs::new();

    for (key, ea) in api {
        all.insert(key.clone(), ExtAttr::new(ea.value.clone()));
        if key == INTERNAL_ID_KEY {
            continue;
        }
        if ea.is_inherited() {
            if let Some(plan_value) = planned.get(key) {
                owned.insert(key.clone(), ExtAttr::new(plan_value.value.clone()));
            }
        } else {
            owned.insert(key.clone(), ExtAttr::new(ea.value.clone()));
        }
    }

    Reconciled {
        owned: Some(owned),
        all,
    }
}

fn render_reconciled(plan: &Dynamic, reconciled: &Reconciled) -> (Dynamic, Dynamic) {
    let owned = match &reconciled.owned {
        Some(owned) => Dynamic::Map(render_map(plan, owned)),
        None => Dynamic::Null,
    };
    (owned, flatten_ext_attrs(plan, Some(&reconciled.all)))
}

/// Reconcile an API response into the `extattrs` and `extattrs_all` state values
pub fn reconcile_state(plan: &Dynamic, api: &ExtAttrs) -> Result<(Dynamic, Dynamic), ExtAttrError> {
    let reconciled = remove_inherited_ext_attrs(plan, api)?;
    Ok(render_reconciled(plan, &reconciled))
}

/// [`reconcile_state`] against an `extattrs` map read back from state
pub fn reconcile_stored_state(prior: &Dynamic, api: &ExtAttrs) -> (Dynamic, Dynamic) {
    let reconciled = split_ext_attrs(expand_stored_ext_attrs(prior).as_ref(), api);
    render_reconciled(prior, &reconciled)
}

/// Parse EA text the provider wrote to state. Appliance strings such as
/// `[tbd]` look like lists; a bracketed value that is not a list stays a
/// string. `None` for a null or unknown map.
pub fn expand_stored_ext_attrs(stored: &Dynamic) -> Option<ExtAttrs> {
    let map = stored.as_map()?;
    Some(
        map.iter()
            .filter_map(|(key, value)| {
                let text = value.as_str()?;
                let parsed = parse_ext_attr_value(key, text)
                    .unwrap_or_else(|_| ExtAttrValue::String(text.to_string()));
                Some((key.clone(), ExtAttr::new(parsed)))
            })
            .collect(),
    )
}

/// Tracking id recorded in a stored `extattrs_all` map
pub fn stored_internal_id(all: &Dynamic) -> Option<&str> {
    all.as_map()?.get(INTERNAL_ID_KEY)?.as_str()
}

/// Add the entries of `prior_all` the plan does not name so an update does
/// not strip inherited or tracking EAs. Keys in `previously_owned` that the
/// plan dropped stay dropped.
pub fn add_inherited_ext_attrs(
    plan: &ExtAttrs,
    prior_all: &ExtAttrs,
    previously_owned: &ExtAttrs,
) -> ExtAttrs {
    let mut merged = plan.clone();
    for (key, ea) in prior_all {
        if merged.contains_key(key) {
            continue;
        }
        if key != INTERNAL_ID_KEY && previously_owned.contains_key(key) {
            continue;
        }
        merged.insert(key.clone(), ExtAttr::new(ea.value.clone()));
    }
    merged
}

/// Make sure `eas` carries a tracking id and return it
pub fn add_internal_id_to_ext_attrs(eas: &mut ExtAttrs) -> String {
    if let Some(ExtAttr {
        value: ExtAttrValue::String(id),
        ..
    }) = eas.get(INTERNAL_ID_KEY)
    {
        return id.clone();
    }
    let id = uuid::Uuid::new_v4().to_string();
    eas.insert(
        INTERNAL_ID_KEY.to_string(),
        ExtAttr::new(ExtAttrValue::String(id.clone())),
    );
    id
}

pub fn internal_id(eas: &ExtAttrs) -> Option<&str> {
    match eas.get(INTERNAL_ID_KEY).map(|ea| &ea.value) {
        Some(ExtAttrValue::String(id)) => Some(id),
        _ => None,
    }
}

/// Request body form: `{"Site": {"value": "NY"}}`
pub fn ext_attrs_to_json(eas: &ExtAttrs) -> Value {
    let mut out = Map::new();
    for (key, ea) in eas {
        let mut entry = Map::new();
        entry.insert("value".to_string(), ea.value.to_json());
        out.insert(key.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

/// Parse the `extattrs` field of a response; absent or null means empty
pub fn ext_attrs_from_json(value: Option<&Value>) -> Result<ExtAttrs, ExtAttrError> {
    match value {
        None | Some(Value::Null) => Ok(ExtAttrs::new()),
        Some(v) => Ok(serde_json::from_value(v.clone())?),
    }
}
