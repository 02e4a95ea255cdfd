//! Descriptor driven conversion between Terraform state and WAPI objects
//!
//! `expand` builds a request body from a planned state; `flatten` turns a
//! WAPI object back into state. Extensible attributes are handled by the
//! engine because they need the prior state as well.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::descriptor::{FieldKind, FieldSpec, ObjectDescriptor, EXTATTRS, FUNC_CALL, FUNC_CALL_FIELDS, REF};
use crate::api::WapiObject;
use crate::utils::extattrs::ExtAttrError;
use crate::utils::flex::{self, FlexError};
use crate::utils::reorder;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Flex(#[from] FlexError),

    #[error(transparent)]
    ExtAttr(#[from] ExtAttrError),

    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

fn known(value: Option<&Dynamic>) -> Option<&Dynamic> {
    value.filter(|v| !v.is_null_or_unknown())
}

/// Build a WAPI request body from a planned state
pub fn expand(
    desc: &ObjectDescriptor,
    plan: &DynamicValue,
    mode: WriteMode,
) -> Result<WapiObject, CodecError> {
    let mut body = Map::new();

    for field in desc.fields {
        if mode == WriteMode::Update && field.create_only {
            continue;
        }
        let value = plan.get(&AttributePath::new(field.name));
        expand_field(field, value, desc.fields, &mut body, |flag| {
            plan.get(&AttributePath::new(flag))
        })?;
    }

    if mode == WriteMode::Create {
        if let Some((target, call)) = expand_function_call(desc, plan)? {
            body.insert(target, call);
        }
    }

    Ok(body)
}

fn expand_field<'a>(
    field: &FieldSpec,
    value: Option<&'a Dynamic>,
    siblings: &[FieldSpec],
    body: &mut WapiObject,
    lookup: impl Fn(&str) -> Option<&'a Dynamic>,
) -> Result<(), CodecError> {
    if field.presence == super::descriptor::Presence::Computed {
        return Ok(());
    }
    let Some(value) = known(value) else {
        return Ok(());
    };

    body.insert(field.api_name.to_string(), expand_value(field, value)?);

    if let Some(flag) = field.use_flag {
        // An explicit use_* setting wins over the implied one
        if known(lookup(flag)).is_none() {
            let api_flag = siblings
                .iter()
                .find(|f| f.name == flag)
                .map_or(flag, |f| f.api_name);
            body.insert(api_flag.to_string(), Value::Bool(true));
        }
    }
    Ok(())
}

fn expand_value(field: &FieldSpec, value: &Dynamic) -> Result<Value, CodecError> {
    let name = field.name;
    let json = match field.kind {
        FieldKind::String => flex::dynamic_to_string(name, value)?.map(Value::String),
        FieldKind::Bool => flex::dynamic_to_bool(name, value)?.map(Value::Bool),
        FieldKind::Int => flex::dynamic_to_int64(name, value)?.map(Value::from),
        FieldKind::Ipv4 | FieldKind::Ipv6 => flex::dynamic_to_ip(name, value)?.map(Value::String),
        FieldKind::StringList { .. } => flex::dynamic_to_string_list(name, value)?
            .map(|items| Value::Array(items.into_iter().map(Value::String).collect())),
        FieldKind::Object(fields) => Some(expand_object(name, fields, value)?),
        FieldKind::ObjectList { fields, .. } => {
            let items = value.as_list().ok_or_else(|| CodecError::Invalid {
                field: name.to_string(),
                message: format!("expected a list, got {}", value.type_name()),
            })?;
            Some(Value::Array(
                items
                    .iter()
                    .map(|item| expand_object(name, fields, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ))
        }
    };
    Ok(json.unwrap_or(Value::Null))
}

fn expand_object(name: &str, fields: &[FieldSpec], value: &Dynamic) -> Result<Value, CodecError> {
    let map = value.as_map().ok_or_else(|| CodecError::Invalid {
        field: name.to_string(),
        message: format!("expected an object, got {}", value.type_name()),
    })?;
    let mut object = Map::new();
    for field in fields {
        expand_field(field, map.get(field.name), fields, &mut object, |flag| map.get(flag))?;
    }
    Ok(Value::Object(object))
}

fn parse_json_object(field: &str, value: Option<&Dynamic>) -> Result<Value, CodecError> {
    match known(value).and_then(Dynamic::as_str) {
        None => Ok(Value::Object(Map::new())),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(v @ Value::Object(_)) => Ok(v),
            Ok(_) | Err(_) => Err(CodecError::Invalid {
                field: field.to_string(),
                message: format!("{:?} is not a JSON object", text),
            }),
        },
    }
}

/// `func_call` becomes `{"_object_function": ..}` on the target field
fn expand_function_call(
    desc: &ObjectDescriptor,
    plan: &DynamicValue,
) -> Result<Option<(String, Value)>, CodecError> {
    if desc.function_call_fields.is_empty() {
        return Ok(None);
    }
    let Some(call) = known(plan.get(&AttributePath::new(FUNC_CALL))).and_then(Dynamic::as_map)
    else {
        return Ok(None);
    };

    let text = |name: &str| -> Option<String> {
        known(call.get(name))
            .and_then(Dynamic::as_str)
            .map(str::to_string)
            .or_else(|| {
                FUNC_CALL_FIELDS
                    .iter()
                    .find(|f| f.name == name)
                    .and_then(|f| f.default)
                    .and_then(|d| d.to_dynamic().as_str().map(str::to_string))
            })
    };

    let target = text("attribute_name").ok_or_else(|| CodecError::Invalid {
        field: FUNC_CALL.to_string(),
        message: "attribute_name is required".to_string(),
    })?;
    if !desc.function_call_fields.contains(&target.as_str()) {
        return Err(CodecError::Invalid {
            field: FUNC_CALL.to_string(),
            message: format!("{} cannot be allocated with a function call", target),
        });
    }
    let api_target = desc.field(&target).map_or(target.as_str(), |f| f.api_name);

    let mut object = Map::new();
    if let Some(function) = text("object_function") {
        object.insert("_object_function".to_string(), Value::String(function));
    }
    if let Some(obj) = text("object") {
        object.insert("_object".to_string(), Value::String(obj));
    }
    object.insert(
        "_object_parameters".to_string(),
        parse_json_object("func_call.object_parameters", call.get("object_parameters"))?,
    );
    if let Some(result_field) = text("result_field") {
        object.insert("_result_field".to_string(), Value::String(result_field));
    }
    object.insert(
        "_parameters".to_string(),
        parse_json_object("func_call.parameters", call.get("parameters"))?,
    );

    Ok(Some((api_target.to_string(), Value::Object(object))))
}

/// Unknown has no place in stored state
fn settle(value: Dynamic) -> Dynamic {
    if value.is_unknown() {
        Dynamic::Null
    } else {
        value
    }
}

/// Turn a WAPI object into state. `prior` supplies write-only values and the
/// spelling and ordering the user chose for equivalent API values.
pub fn flatten(
    desc: &ObjectDescriptor,
    api: &WapiObject,
    prior: &DynamicValue,
) -> Result<DynamicValue, CodecError> {
    let mut state = DynamicValue::object();
    let set = |state: &mut DynamicValue, name: &str, value: Dynamic| {
        state
            .set(&AttributePath::new(name), value)
            .map_err(|e| CodecError::Invalid {
                field: name.to_string(),
                message: e.to_string(),
            })
    };

    let reference = api.get("_ref").and_then(Value::as_str);
    set(&mut state, REF, flex::string_to_dynamic(reference))?;

    let prior_map = prior.value.as_map();
    let empty = HashMap::new();
    let fields = flatten_object(desc.fields, api, prior_map.unwrap_or(&empty));
    for (name, value) in fields {
        set(&mut state, &name, value)?;
    }

    if !desc.function_call_fields.is_empty() {
        let call = prior.get(&AttributePath::new(FUNC_CALL)).cloned().unwrap_or_default();
        set(&mut state, FUNC_CALL, settle(call))?;
    }

    Ok(state)
}

fn flatten_object(
    fields: &[FieldSpec],
    api: &Map<String, Value>,
    prior: &HashMap<String, Dynamic>,
) -> HashMap<String, Dynamic> {
    fields
        .iter()
        .map(|field| {
            let prior_value = prior.get(field.name).cloned().unwrap_or_default();
            let value = match api.get(field.api_name) {
                _ if field.write_only => settle(prior_value),
                None => settle(prior_value),
                Some(v) => flatten_value(field, v, &prior_value),
            };
            (field.name.to_string(), value)
        })
        .collect()
}

fn flatten_value(field: &FieldSpec, api: &Value, prior: &Dynamic) -> Dynamic {
    if api.is_null() {
        return Dynamic::Null;
    }
    let value = match field.kind {
        FieldKind::String => api.as_str().map(|s| {
            if s.is_empty() && prior.is_null_or_unknown() {
                Dynamic::Null
            } else {
                Dynamic::string(s)
            }
        }),
        FieldKind::Bool => api.as_bool().map(Dynamic::Bool),
        FieldKind::Int => api.as_i64().map(|i| flex::int64_to_dynamic(Some(i))),
        FieldKind::Ipv4 | FieldKind::Ipv6 => api.as_str().map(|s| flex::flatten_ip(Some(s), prior)),
        FieldKind::StringList { ordered } => api.as_array().map(|items| {
            let list: Vec<Dynamic> = items.iter().map(flex::json_to_dynamic).collect();
            let prior_list = prior.as_list().unwrap_or_default();
            if list.is_empty() && prior.is_null_or_unknown() {
                Dynamic::Null
            } else if ordered {
                Dynamic::List(list)
            } else {
                Dynamic::List(reorder::align_strings(prior_list, list))
            }
        }),
        FieldKind::Object(fields) => api.as_object().map(|obj| {
            let empty = HashMap::new();
            Dynamic::Map(flatten_object(fields, obj, prior.as_map().unwrap_or(&empty)))
        }),
        FieldKind::ObjectList { fields, key } => api
            .as_array()
            .map(|items| flatten_object_list(fields, key, items, prior)),
    };

    value.unwrap_or_else(|| {
        tracing::warn!(
            "Unexpected value for {} in WAPI response: {}",
            field.api_name,
            api
        );
        Dynamic::Null
    })
}

fn flatten_object_list(
    fields: &[FieldSpec],
    key: Option<&str>,
    items: &[Value],
    prior: &Dynamic,
) -> Dynamic {
    let prior_list = prior.as_list().unwrap_or_default();
    if items.is_empty() && prior.is_null_or_unknown() {
        return Dynamic::Null;
    }
    let empty = HashMap::new();

    let flattened: Vec<Dynamic> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let obj = item.as_object()?;
            let prior_item = match key {
                Some(key) => {
                    let wanted = obj.get(key_api_name(fields, key));
                    prior_list.iter().find(|p| {
                        p.as_map()
                            .and_then(|m| m.get(key))
                            .and_then(Dynamic::as_str)
                            .is_some_and(|k| wanted.and_then(Value::as_str) == Some(k))
                    })
                }
                None => prior_list.get(idx),
            };
            let prior_map = prior_item.and_then(Dynamic::as_map).unwrap_or(&empty);
            Some(Dynamic::Map(flatten_object(fields, obj, prior_map)))
        })
        .collect();

    match key {
        Some(key) => Dynamic::List(reorder::align_by_key(prior_list, flattened, key)),
        None => Dynamic::List(flattened),
    }
}

fn key_api_name<'a>(fields: &'a [FieldSpec], key: &'a str) -> &'a str {
    fields
        .iter()
        .find(|f| f.name == key)
        .map_or(key, |f| f.api_name)
}

/// Fields to request with `_return_fields+`
pub fn return_fields(desc: &ObjectDescriptor) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = desc
        .fields
        .iter()
        .filter(|f| !f.write_only)
        .map(|f| f.api_name)
        .collect();
    if desc.supports_extattrs {
        fields.push(EXTATTRS);
    }
    fields
}
