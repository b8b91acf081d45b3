use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{LoadError, LoaderOptions, TypedRequestInfo, UnknownFieldPolicy};
use crate::models::OperationKey;

pub const CONTAINER_ID_FIELD: &str = "ContainerId";
pub const REQUEST_FIELD: &str = "Request";

/// Decode a recorded batch into typed requests, preserving record order
///
/// Request fields absent from a record, or recorded as `null`, keep the
/// value they have in `R::default()`.
pub fn load_requests<R>(
    bytes: &[u8],
    key: &OperationKey,
    options: &LoaderOptions,
) -> Result<Vec<TypedRequestInfo<R>>, LoadError>
where
    R: DeserializeOwned + Serialize + Default,
{
    let records = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(records)) => records,
        Ok(other) => {
            return Err(LoadError::Malformed(format!(
                "expected an array, found {}",
                json_type(&other)
            )))
        }
        Err(err) => return Err(LoadError::Malformed(err.to_string())),
    };

    let defaults = default_fields::<R>();
    let mut unknown = UnknownFields::new(key, options.unknown_fields);
    let requests = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| load_record(index, record, &defaults, &mut unknown))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(operation = %key, count = requests.len(), "Loaded recorded requests");
    Ok(requests)
}

fn load_record<R>(
    index: usize,
    record: Value,
    defaults: &Map<String, Value>,
    unknown: &mut UnknownFields<'_>,
) -> Result<TypedRequestInfo<R>, LoadError>
where
    R: DeserializeOwned + Serialize,
{
    let Value::Object(mut fields) = record else {
        return Err(LoadError::NotAnObject { index });
    };

    let container_id = match fields.remove(CONTAINER_ID_FIELD) {
        None | Some(Value::Null) => return Err(missing(index, CONTAINER_ID_FIELD)),
        Some(Value::String(id)) => id,
        Some(other) => return Err(wrong_type(index, CONTAINER_ID_FIELD, "a string", &other)),
    };

    let request_fields = match fields.remove(REQUEST_FIELD) {
        None | Some(Value::Null) => return Err(missing(index, REQUEST_FIELD)),
        Some(Value::Object(map)) => map,
        Some(other) => return Err(wrong_type(index, REQUEST_FIELD, "an object", &other)),
    };

    for name in fields.keys() {
        unknown.observe(index, name)?;
    }

    let request = project(index, &request_fields, defaults, unknown)?;
    Ok(TypedRequestInfo {
        container_id,
        request,
        extra: fields,
    })
}

/// Overlay the recorded fields on the zero value and convert
fn project<R>(
    index: usize,
    fields: &Map<String, Value>,
    defaults: &Map<String, Value>,
    unknown: &mut UnknownFields<'_>,
) -> Result<R, LoadError>
where
    R: DeserializeOwned + Serialize,
{
    let merged = overlay(defaults, fields.iter());
    let request: R = serde_json::from_value(Value::Object(merged))
        .map_err(|err| shape_error::<R>(index, fields, defaults, err))?;

    let known = match serde_json::to_value(&request) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (name, _) in fields.iter().filter(|(_, value)| !value.is_null()) {
        if !defaults.contains_key(name) && !known.contains_key(name) {
            unknown.observe(index, &format!("{REQUEST_FIELD}.{name}"))?;
        }
    }
    Ok(request)
}

fn overlay<'a>(
    defaults: &Map<String, Value>,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (name, value) in fields.filter(|(_, value)| !value.is_null()) {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Pin a conversion failure on the first field that fails on its own
fn shape_error<R: DeserializeOwned>(
    index: usize,
    fields: &Map<String, Value>,
    defaults: &Map<String, Value>,
    err: serde_json::Error,
) -> LoadError {
    let culprit = if defaults.is_empty() {
        None
    } else {
        fields.iter().filter(|(_, v)| !v.is_null()).find(|field| {
            let candidate = overlay(defaults, std::iter::once(*field));
            serde_json::from_value::<R>(Value::Object(candidate)).is_err()
        })
    };

    LoadError::WrongShape {
        index,
        field: match culprit {
            Some((name, _)) => format!("{REQUEST_FIELD}.{name}"),
            None => REQUEST_FIELD.to_string(),
        },
        reason: err.to_string(),
    }
}

fn default_fields<R: Serialize + Default>() -> Map<String, Value> {
    match serde_json::to_value(R::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn missing(index: usize, field: &str) -> LoadError {
    LoadError::MissingField {
        index,
        field: field.to_string(),
    }
}

fn wrong_type(index: usize, field: &str, expected: &str, found: &Value) -> LoadError {
    LoadError::WrongShape {
        index,
        field: field.to_string(),
        reason: format!("expected {expected}, found {}", json_type(found)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct UnknownFields<'a> {
    key: &'a OperationKey,
    policy: UnknownFieldPolicy,
    warned: BTreeSet<String>,
}

impl<'a> UnknownFields<'a> {
    fn new(key: &'a OperationKey, policy: UnknownFieldPolicy) -> Self {
        Self {
            key,
            policy,
            warned: BTreeSet::new(),
        }
    }

    fn observe(&mut self, index: usize, field: &str) -> Result<(), LoadError> {
        match self.policy {
            UnknownFieldPolicy::Silent => Ok(()),
            UnknownFieldPolicy::Deny => Err(LoadError::UnknownField {
                index,
                field: field.to_string(),
            }),
            UnknownFieldPolicy::Warn => {
                if self.warned.insert(field.to_string()) {
                    warn!(
                        operation = %self.key,
                        record = index,
                        field,
                        "Ignoring unknown field in recorded request"
                    );
                }
                Ok(())
            }
        }
    }
}
