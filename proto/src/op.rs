use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::CollectionId;

/// The structural kind of a raw operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    Create,
    Edit,
    Delete,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Create => write!(f, "create"),
            OpKind::Edit => write!(f, "edit"),
            OpKind::Delete => write!(f, "delete"),
        }
    }
}

/// The creation marker of a raw operation: an OT type name plus the initial document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePayload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ot_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single JSON-patch-like edit.
///
/// `path` has one key for a direct property change, or two for a keyed member of a
/// map-valued property (`["fields", "fldA"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDiff {
    #[serde(rename = "p")]
    pub path: Vec<String>,
    #[serde(rename = "od", default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(rename = "oi", default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl OpDiff {
    pub fn new(path: impl IntoIterator<Item = impl Into<String>>, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self { path: path.into_iter().map(Into::into).collect(), old_value, new_value }
    }
}

/// A raw operation exactly as the OT store emits it. At most one marker is expected to be set;
/// an operation with none of them is malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<CreatePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<Vec<OpDiff>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub del: Option<bool>,
}

impl RawOp {
    pub fn create(data: Option<Value>) -> Self { Self { create: Some(CreatePayload { ot_type: None, data }), ..Default::default() } }

    pub fn edit(ops: Vec<OpDiff>) -> Self { Self { op: Some(ops), ..Default::default() } }

    pub fn delete() -> Self { Self { del: Some(true), ..Default::default() } }

    /// Structural kind, with `create` taking precedence over `op`, and `op` over `del`.
    pub fn kind(&self) -> Option<OpKind> {
        if self.create.is_some() {
            Some(OpKind::Create)
        } else if self.op.is_some() {
            Some(OpKind::Edit)
        } else if self.del == Some(true) {
            Some(OpKind::Delete)
        } else {
            None
        }
    }
}

/// One operation of a committed transaction, keyed by collection and node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOpEntry {
    pub collection: CollectionId,
    pub node_id: String,
    pub op: RawOp,
}

impl RawOpEntry {
    pub fn new(collection: impl Into<CollectionId>, node_id: impl Into<String>, op: RawOp) -> Self {
        Self { collection: collection.into(), node_id: node_id.into(), op }
    }
}

impl std::fmt::Display for RawOpEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = self.op.kind().map(|k| k.to_string()).unwrap_or_else(|| "malformed".to_string());
        write!(f, "RawOp({} {}/{})", kind, self.collection, self.node_id)
    }
}
