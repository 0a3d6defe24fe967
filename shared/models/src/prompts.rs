use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single prompt variable value: either a template string or an ordered list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PromptValue {
    Text(String),
    List(Vec<String>),
}

impl PromptValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PromptValue::Text(_) => "string",
            PromptValue::List(_) => "array",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptValue::Text(s) => Some(s),
            PromptValue::List(_) => None,
        }
    }

    /// Coerce an update payload into a prompt value.
    ///
    /// With `kind == "array"` a non-sequence value is wrapped in a one-element
    /// list. Any other kind keeps the value as sent: strings stay text,
    /// sequences stay lists and other JSON scalars become their JSON text.
    /// The conversion is lossy: `3` is stored as `"3"` and reads back as a
    /// string, and the same applies to numbers or booleans inside arrays.
    pub fn from_update(kind: &str, value: Value) -> Self {
        match (kind, value) {
            (_, Value::Array(items)) => PromptValue::List(items.into_iter().map(value_text).collect()),
            ("array", other) => PromptValue::List(vec![value_text(other)]),
            (_, other) => PromptValue::Text(value_text(other)),
        }
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Ordered prompt-variable name → value mapping, one per context
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PromptSet(pub IndexMap<String, PromptValue>);

impl PromptSet {
    pub fn get(&self, name: &str) -> Option<&PromptValue> {
        self.0.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PromptValue::as_text)
    }

    pub fn set(&mut self, name: impl Into<String>, value: PromptValue) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys of `template` absent from this set
    pub fn missing_keys<'a>(&self, template: &'a PromptSet) -> Vec<&'a str> {
        template
            .0
            .keys()
            .filter(|k| !self.0.contains_key(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn variables(&self) -> Vec<PromptVariable> {
        self.0
            .iter()
            .map(|(name, value)| PromptVariable {
                name: name.clone(),
                kind: value.kind().to_string(),
                current_value: value.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "currentValue")]
    pub current_value: PromptValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVariables {
    pub variables: Vec<PromptVariable>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdatePromptRequest {
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_update_wraps_scalar() {
        let value = PromptValue::from_update("array", json!("person"));
        assert_eq!(value, PromptValue::List(vec!["person".to_string()]));
    }

    #[test]
    fn test_array_update_keeps_sequence() {
        let value = PromptValue::from_update("array", json!(["a", "b"]));
        assert_eq!(value, PromptValue::List(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_scalar_update_is_verbatim() {
        assert_eq!(
            PromptValue::from_update("string", json!("hello {x}")),
            PromptValue::Text("hello {x}".to_string())
        );
        assert_eq!(
            PromptValue::from_update("string", json!(["x"])),
            PromptValue::List(vec!["x".to_string()])
        );
        assert_eq!(PromptValue::from_update("string", json!(3)), PromptValue::Text("3".to_string()));
    }

    #[test]
    fn test_non_string_scalars_are_stored_as_text() {
        let stored = PromptValue::from_update("array", json!([1, true, null]));
        assert_eq!(
            stored,
            PromptValue::List(vec!["1".to_string(), "true".to_string(), "null".to_string()])
        );

        let persisted = serde_json::to_value(PromptValue::from_update("string", json!(3))).unwrap();
        assert_eq!(persisted, json!("3"));
    }

    #[test]
    fn test_prompt_set_round_trips_mixed_values() {
        let raw = r#"{"DEFAULT_LANGUAGE":"English","DEFAULT_ENTITY_TYPES":["person","event"]}"#;
        let set: PromptSet = serde_json::from_str(raw).unwrap();
        let vars = set.variables();
        assert_eq!(vars[0].name, "DEFAULT_LANGUAGE");
        assert_eq!(vars[0].kind, "string");
        assert_eq!(vars[1].kind, "array");
        assert_eq!(serde_json::to_string(&set).unwrap(), raw);
    }

    #[test]
    fn test_missing_keys() {
        let template: PromptSet =
            serde_json::from_value(json!({"a": "1", "b": ["2"]})).unwrap();
        let mut set = template.clone();
        assert!(set.missing_keys(&template).is_empty());
        set.0.shift_remove("b");
        assert_eq!(set.missing_keys(&template), vec!["b"]);
    }
}
