use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One semantically named change extracted from a raw edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    /// Which semantic operation produced this diff, e.g. `setRecord`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub path: Vec<String>,
    pub old_value: Value,
    pub new_value: Value,
}

impl OperationContext {
    pub fn new(name: impl Into<String>, key: Option<String>, path: Vec<String>, old_value: Value, new_value: Value) -> Self {
        Self { name: name.into(), key, path, old_value, new_value }
    }
}
