use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// The four schema/data object types the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Table,
    Field,
    View,
    Record,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [EntityKind::Table, EntityKind::Field, EntityKind::View, EntityKind::Record];

    /// Prefix used in collection ids, e.g. `rec` in `rec_tblXYZ`.
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Table => "tbl",
            EntityKind::Field => "fld",
            EntityKind::View => "viw",
            EntityKind::Record => "rec",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "tbl" => Some(EntityKind::Table),
            "fld" => Some(EntityKind::Field),
            "viw" => Some(EntityKind::View),
            "rec" => Some(EntityKind::Record),
            _ => None,
        }
    }

    /// Name of the payload property carrying a snapshot or delta of this kind.
    pub fn property(&self) -> &'static str {
        match self {
            EntityKind::Table => "table",
            EntityKind::Field => "field",
            EntityKind::View => "view",
            EntityKind::Record => "record",
        }
    }

    /// Name of the payload property carrying the id of a deleted entity.
    pub fn id_property(&self) -> &'static str {
        match self {
            EntityKind::Table => "tableId",
            EntityKind::Field => "fieldId",
            EntityKind::View => "viewId",
            EntityKind::Record => "recordId",
        }
    }

    /// Whether a create with no payload still yields an `{id}` snapshot.
    pub fn defaults_to_id_only(&self) -> bool { matches!(self, EntityKind::Record) }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.property()) }
}

/// An OT collection identifier of the form `{prefix}_{containerId}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(kind: EntityKind, container_id: &str) -> Self { CollectionId(format!("{}_{}", kind.prefix(), container_id)) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Split into the entity kind and the id of the containing base or table.
    pub fn parse(&self) -> Result<(EntityKind, &str), DecodeError> {
        let (prefix, container) = self.0.split_once('_').ok_or_else(|| DecodeError::MissingPrefix(self.0.clone()))?;
        let kind = EntityKind::from_prefix(prefix).ok_or_else(|| DecodeError::UnknownPrefix(prefix.to_string()))?;
        if container.is_empty() {
            return Err(DecodeError::EmptyContainer(self.0.clone()));
        }
        Ok((kind, container))
    }
}

impl From<&str> for CollectionId {
    fn from(val: &str) -> Self { CollectionId(val.to_string()) }
}

impl From<String> for CollectionId {
    fn from(val: String) -> Self { CollectionId(val) }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}
