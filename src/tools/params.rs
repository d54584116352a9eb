use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ToolError;

/// String-keyed argument map handed to [`Tool::execute`](super::Tool::execute).
///
/// Values parsed from tag-form calls are always JSON strings; [`get_as`](Self::get_as)
/// coerces them to the requested type so `limit="5"` reads as a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolParams {
    values: BTreeMap<String, Value>,
}

impl ToolParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read `key` as `T`. Missing keys read as `null`, so `Option<T>` targets
    /// come back `None`. String values that fail direct conversion are parsed
    /// as JSON text before giving up.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ToolError> {
        let value = self.values.get(key).cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => Ok(parsed),
            Err(err) => {
                match &value {
                    Value::String(raw) => {
                        if let Ok(parsed) = serde_json::from_str::<T>(raw.trim()) {
                            return Ok(parsed);
                        }
                    }
                    Value::Number(_) | Value::Bool(_) => {
                        if let Ok(parsed) = serde_json::from_value::<T>(Value::String(value.to_string())) {
                            return Ok(parsed);
                        }
                    }
                    _ => {}
                }
                Err(ToolError::ParamsNotMatched(format!("'{}': {}", key, err)))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for ToolParams {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ToolParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_string_values() {
        let params = ToolParams::new()
            .with("limit", "5")
            .with("hostile", "true")
            .with("target", "Ava");

        assert_eq!(params.get_as::<u32>("limit").unwrap(), 5);
        assert!(params.get_as::<bool>("hostile").unwrap());
        assert_eq!(params.get_as::<String>("target").unwrap(), "Ava");
        assert_eq!(params.get_as::<Option<u32>>("radius").unwrap(), None);

        let from_json = ToolParams::new().with("limit", 5);
        assert_eq!(from_json.get_as::<String>("limit").unwrap(), "5");
    }

    #[test]
    fn missing_required_value_is_reported() {
        let params = ToolParams::new();
        let err = params.get_as::<String>("city").unwrap_err();
        assert!(matches!(err, ToolError::ParamsNotMatched(msg) if msg.contains("city")));
    }
}
