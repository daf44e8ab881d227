use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    collection::EntityKind,
    error::DecodeError,
    op::OpKind,
    request::{FieldSnapshot, RequestContext},
};

/// The fixed set of domain event kinds, one per (EntityKind × OpKind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "TABLE_CREATE")]
    TableCreate,
    #[serde(rename = "TABLE_UPDATE")]
    TableUpdate,
    #[serde(rename = "TABLE_DELETE")]
    TableDelete,
    #[serde(rename = "TABLE_FIELD_CREATE")]
    FieldCreate,
    #[serde(rename = "TABLE_FIELD_UPDATE")]
    FieldUpdate,
    #[serde(rename = "TABLE_FIELD_DELETE")]
    FieldDelete,
    #[serde(rename = "TABLE_VIEW_CREATE")]
    ViewCreate,
    #[serde(rename = "TABLE_VIEW_UPDATE")]
    ViewUpdate,
    #[serde(rename = "TABLE_VIEW_DELETE")]
    ViewDelete,
    #[serde(rename = "TABLE_RECORD_CREATE")]
    RecordCreate,
    #[serde(rename = "TABLE_RECORD_UPDATE")]
    RecordUpdate,
    #[serde(rename = "TABLE_RECORD_DELETE")]
    RecordDelete,
}

const EVENT_TABLE: [(OpKind, EntityKind, EventKind); 12] = [
    (OpKind::Create, EntityKind::Table, EventKind::TableCreate),
    (OpKind::Edit, EntityKind::Table, EventKind::TableUpdate),
    (OpKind::Delete, EntityKind::Table, EventKind::TableDelete),
    (OpKind::Create, EntityKind::Field, EventKind::FieldCreate),
    (OpKind::Edit, EntityKind::Field, EventKind::FieldUpdate),
    (OpKind::Delete, EntityKind::Field, EventKind::FieldDelete),
    (OpKind::Create, EntityKind::View, EventKind::ViewCreate),
    (OpKind::Edit, EntityKind::View, EventKind::ViewUpdate),
    (OpKind::Delete, EntityKind::View, EventKind::ViewDelete),
    (OpKind::Create, EntityKind::Record, EventKind::RecordCreate),
    (OpKind::Edit, EntityKind::Record, EventKind::RecordUpdate),
    (OpKind::Delete, EntityKind::Record, EventKind::RecordDelete),
];

impl EventKind {
    /// Static lookup of the event kind for a classified operation.
    pub fn of(op_kind: OpKind, entity_kind: EntityKind) -> Option<Self> {
        EVENT_TABLE.iter().find(|(op, entity, _)| *op == op_kind && *entity == entity_kind).map(|(_, _, kind)| *kind)
    }

    pub fn op_kind(&self) -> OpKind {
        use EventKind::*;
        match self {
            TableCreate | FieldCreate | ViewCreate | RecordCreate => OpKind::Create,
            TableUpdate | FieldUpdate | ViewUpdate | RecordUpdate => OpKind::Edit,
            TableDelete | FieldDelete | ViewDelete | RecordDelete => OpKind::Delete,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        use EventKind::*;
        match self {
            TableCreate | TableUpdate | TableDelete => EntityKind::Table,
            FieldCreate | FieldUpdate | FieldDelete => EntityKind::Field,
            ViewCreate | ViewUpdate | ViewDelete => EntityKind::View,
            RecordCreate | RecordUpdate | RecordDelete => EntityKind::Record,
        }
    }

    /// Payload property that collects members when events of this kind are merged into a bulk event.
    /// Kinds without one are never wrapped.
    ///
    /// Bulk groups are keyed on the kind alone, so one bulk event may span several containers; it
    /// carries the first member's `container_id` and context.
    pub fn bulk_property(&self) -> Option<&'static str> {
        match self {
            EventKind::ViewCreate => Some("view"),
            EventKind::FieldCreate | EventKind::FieldUpdate => Some("field"),
            EventKind::FieldDelete => Some("fieldId"),
            EventKind::RecordCreate | EventKind::RecordUpdate => Some("record"),
            EventKind::RecordDelete => Some("recordId"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TableCreate => "TABLE_CREATE",
            EventKind::TableUpdate => "TABLE_UPDATE",
            EventKind::TableDelete => "TABLE_DELETE",
            EventKind::FieldCreate => "TABLE_FIELD_CREATE",
            EventKind::FieldUpdate => "TABLE_FIELD_UPDATE",
            EventKind::FieldDelete => "TABLE_FIELD_DELETE",
            EventKind::ViewCreate => "TABLE_VIEW_CREATE",
            EventKind::ViewUpdate => "TABLE_VIEW_UPDATE",
            EventKind::ViewDelete => "TABLE_VIEW_DELETE",
            EventKind::RecordCreate => "TABLE_RECORD_CREATE",
            EventKind::RecordUpdate => "TABLE_RECORD_UPDATE",
            EventKind::RecordDelete => "TABLE_RECORD_DELETE",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for EventKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EVENT_TABLE.iter().map(|(_, _, kind)| *kind).find(|kind| kind.as_str() == s).ok_or_else(|| DecodeError::UnknownEventKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    pub old_value: Value,
    pub new_value: Value,
}

impl ValueChange {
    pub fn new(old_value: Value, new_value: Value) -> Self { Self { old_value, new_value } }
}

/// Initial state of a created entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: String,
    pub props: Map<String, Value>,
}

impl EntitySnapshot {
    pub fn id_only(id: impl Into<String>) -> Self { Self { id: id.into(), props: Map::new() } }

    pub fn to_value(&self) -> Value {
        let mut obj = self.props.clone();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(obj)
    }
}

/// The changed properties of an updated entity.
///
/// `props` holds direct property changes; `members` holds keyed changes inside a
/// map-valued property, e.g. `members["fields"]["fldA"]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDelta {
    pub id: String,
    pub props: BTreeMap<String, ValueChange>,
    pub members: BTreeMap<String, BTreeMap<String, ValueChange>>,
}

impl EntityDelta {
    pub fn new(id: impl Into<String>) -> Self { Self { id: id.into(), ..Default::default() } }

    pub fn is_empty(&self) -> bool { self.props.is_empty() && self.members.is_empty() }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        for (name, change) in &self.props {
            obj.insert(name.clone(), change_value(change));
        }
        for (name, members) in &self.members {
            let nested = members.iter().map(|(key, change)| (key.clone(), change_value(change))).collect();
            obj.insert(name.clone(), Value::Object(nested));
        }
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(obj)
    }
}

fn change_value(change: &ValueChange) -> Value { serde_json::to_value(change).unwrap_or(Value::Null) }

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Created(EntitySnapshot),
    Updated(EntityDelta),
    Deleted(String),
    /// Ordered member payloads of a bulk event.
    Bulk(Vec<EventPayload>),
}

impl EventPayload {
    pub fn id(&self) -> Option<&str> {
        match self {
            EventPayload::Created(snapshot) => Some(&snapshot.id),
            EventPayload::Updated(delta) => Some(&delta.id),
            EventPayload::Deleted(id) => Some(id),
            EventPayload::Bulk(_) => None,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        match self {
            EventPayload::Bulk(members) => members.iter().flat_map(|m| m.ids()).collect(),
            other => other.id().into_iter().collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EventPayload::Created(snapshot) => snapshot.to_value(),
            EventPayload::Updated(delta) => delta.to_value(),
            EventPayload::Deleted(id) => Value::String(id.clone()),
            EventPayload::Bulk(members) => Value::Array(members.iter().map(|m| m.to_value()).collect()),
        }
    }
}

/// Provenance of the last operation context applied to an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_key: Option<String>,
}

/// A typed, human-meaningful event produced from one or more raw operations.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub kind: EventKind,
    /// Id of the affected entity; for bulk events, the id of the first member.
    pub entity_id: String,
    /// For bulk events, the container of the first member even when members come from different containers.
    pub container_id: String,
    pub payload: EventPayload,
    pub context: RequestContext,
    pub raw_op_kind: OpKind,
    pub is_bulk: bool,
    pub op_meta: Option<OpMeta>,
    pub old_field: Option<FieldSnapshot>,
}

impl DomainEvent {
    /// Name under which the payload is published.
    pub fn payload_property(&self) -> &'static str {
        if self.is_bulk {
            if let Some(property) = self.kind.bulk_property() {
                return property;
            }
        }
        match (&self.payload, self.kind.entity_kind()) {
            (EventPayload::Deleted(_), entity) => entity.id_property(),
            (_, entity) => entity.property(),
        }
    }

    pub fn entity_ids(&self) -> Vec<&str> { self.payload.ids() }

    pub fn to_message(&self) -> EventMessage {
        let mut payload = Map::new();
        payload.insert(self.payload_property().to_string(), self.payload.to_value());
        EventMessage {
            event_kind: self.kind,
            container_id: self.container_id.clone(),
            payload: Value::Object(payload),
            is_bulk: self.is_bulk,
            context: self.context.clone(),
            op_meta: self.op_meta.clone(),
            old_field: self.old_field.clone(),
        }
    }
}

impl std::fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_bulk {
            write!(f, "{}[bulk x{}] in {}", self.kind, self.entity_ids().len(), self.container_id)
        } else {
            write!(f, "{}({}) in {}", self.kind, self.entity_id, self.container_id)
        }
    }
}

/// What downstream consumers receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub event_kind: EventKind,
    pub container_id: String,
    pub payload: Value,
    #[serde(default)]
    pub is_bulk: bool,
    pub context: RequestContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_meta: Option<OpMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_field: Option<FieldSnapshot>,
}
