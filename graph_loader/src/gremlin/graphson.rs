//! Flattening of GraphSON 2/3 typed values into plain JSON.

use serde_json::{Map, Value};

/// Strip `{"@type", "@value"}` wrappers recursively.
///
/// `g:Map` (a flat key/value array) becomes an object and `g:Path` becomes
/// its `objects` list. Every other typed value collapses to its payload.
pub fn simplify(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("@type") && map.contains_key("@value") => {
            let kind = map
                .get("@type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let inner = map.remove("@value").unwrap_or(Value::Null);

            match kind.as_str() {
                "g:Map" => typed_map(inner),
                "g:Path" => match inner {
                    Value::Object(mut path) => simplify(path.remove("objects").unwrap_or(Value::Null)),
                    other => simplify(other),
                },
                _ => simplify(inner),
            }
        }
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, simplify(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(simplify).collect()),
        other => other,
    }
}

fn typed_map(inner: Value) -> Value {
    let mut out = Map::new();
    if let Value::Array(items) = inner {
        let mut it = items.into_iter();
        while let (Some(key), Some(value)) = (it.next(), it.next()) {
            let key = match simplify(key) {
                Value::String(s) => s,
                other => other.to_string(),
            };
            out.insert(key, simplify(value));
        }
    }
    Value::Object(out)
}
