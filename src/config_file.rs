//! Context file handling for loading raw deployment configuration.
//!
//! A context file is a JSON object of option name to value. It may also hold
//! several named context blocks (`{"dev": {...}, "prod": {...}}`), in which
//! case one block is selected by id.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ComposerError, Result};

/// Untyped option map exactly as supplied by the user.
///
/// Keys are kept sorted so validation visits options in a stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    values: BTreeMap<String, Value>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(ComposerError::config(format!(
                "context must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_map(map: Map<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }

    /// Load a context file, optionally selecting a named context block
    pub fn load_from_file<P: AsRef<Path>>(path: P, context_id: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ComposerError::config(format!("failed to read context file {}: {e}", path.display()))
        })?;
        let document: Value = serde_json::from_str(&content)?;

        match context_id {
            None => Self::from_value(document),
            Some(id) => {
                let block = document.get(id).cloned().ok_or_else(|| {
                    ComposerError::config(format!(
                        "context block '{id}' not found in {}",
                        path.display()
                    ))
                })?;
                Self::from_value(block)
            }
        }
    }

    /// Builder-style insert, mostly for tests and embedding callers
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_flat_context() {
        let file = write_temp(r#"{"stage": "test", "vpcEnabled": true}"#);
        let raw = RawConfig::load_from_file(file.path(), None).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get("stage"), Some(&json!("test")));
    }

    #[test]
    fn test_load_named_context_block() {
        let file = write_temp(r#"{"dev": {"stage": "dev"}, "prod": {"stage": "prod", "dataNodeCount": 3}}"#);
        let raw = RawConfig::load_from_file(file.path(), Some("prod")).unwrap();
        assert_eq!(raw.get("stage"), Some(&json!("prod")));
        assert_eq!(raw.get("dataNodeCount"), Some(&json!(3)));
    }

    #[test]
    fn test_missing_context_block() {
        let file = write_temp(r#"{"dev": {}}"#);
        let err = RawConfig::load_from_file(file.path(), Some("prod")).unwrap_err();
        assert!(err.to_string().contains("'prod'"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = RawConfig::load_from_file("/nonexistent/context.json", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let file = write_temp("{ invalid json }");
        let result = RawConfig::load_from_file(file.path(), None);
        assert!(matches!(result, Err(ComposerError::Json(_))));
    }

    #[test]
    fn test_non_object_context_rejected() {
        let err = RawConfig::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let raw = RawConfig::new()
            .with("vpcEnabled", true)
            .with("domainName", "d")
            .with("stage", "s");
        let names: Vec<&str> = raw.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["domainName", "stage", "vpcEnabled"]);
    }
}
