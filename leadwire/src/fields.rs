use serde_json::{Map, Value};
use thiserror::Error;

/// The format-independent representation of a lead's data: an ordered map
/// from field names to scalars, lists, or nested maps.
pub type FieldMap = Map<String, Value>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FieldError {
    #[error("cannot nest \"{path}\" under \"{parent}\", which already holds a value")]
    ScalarCollision { path: String, parent: String },
}

/// Joins nested object keys with `.` into a single-level map.
///
/// Lists and scalars stay as leaf values; an empty nested object is dropped,
/// matching what serializing-then-reparsing it would produce anyway.
pub fn flatten(value: &Value) -> FieldMap {
    let mut flat = FieldMap::new();
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(&mut flat, key, value);
            }
        }
        Value::Null => {}
        other => {
            flat.insert(String::new(), other.clone());
        }
    }
    flat
}

fn flatten_into(flat: &mut FieldMap, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(flat, &format!("{prefix}.{key}"), value);
            }
        }
        other => {
            flat.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Rebuilds a nested map from dotted keys.
///
/// Path segments are always literal object keys; a purely numeric segment
/// like the `42` in `a.42.b` nests as the key `"42"` and never becomes a
/// list index. Nesting under a key that already holds a scalar is an error;
/// a later scalar simply replaces whatever tree was there before.
pub fn unflatten(flat: FieldMap) -> Result<FieldMap, FieldError> {
    let mut nested = FieldMap::new();
    for (path, value) in flat {
        let mut segments = path.split('.').peekable();
        let mut current = &mut nested;
        let mut walked = Vec::new();
        while let Some(segment) = segments.next() {
            walked.push(segment);
            if segments.peek().is_none() {
                current.insert(segment.to_string(), value);
                break;
            }
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(FieldMap::new()));
            current = match slot {
                Value::Object(map) => map,
                _ => {
                    return Err(FieldError::ScalarCollision {
                        path: path.clone(),
                        parent: walked.join("."),
                    })
                }
            };
        }
    }
    Ok(nested)
}

/// Resolves a dotted path against a nested map.
pub fn get_path<'a>(map: &'a FieldMap, path: &str) -> Option<&'a Value> {
    let mut current: Option<&Value> = None;
    for segment in path.split('.') {
        current = match current {
            None => map.get(segment),
            Some(Value::Object(inner)) => inner.get(segment),
            Some(_) => return None,
        };
        current?;
    }
    current
}

/// Merges `overlay` into `base`; on collision the overlay wins, except that
/// two maps merge recursively.
pub fn deep_merge(base: &mut FieldMap, overlay: FieldMap) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// The custom-field override rule: a configured value only displaces a
/// standard field when it would carry information on the wire.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Renders a leaf value the way it appears in query strings and form
/// bodies. Lists join with commas, `null` is empty.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => String::new(),
    }
}
