use std::collections::{hash_map::Entry, HashMap};

use opscribe_proto::{DomainEvent, EntityKind, EventPayload, OpKind};
use serde_json::{Map, Value};
use tracing::debug;

use crate::interpreter::record::FIELDS;

/// What happened to the map when an event was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// A record create absorbed a later update of the same record.
    Combined,
    /// The previous event for the node id was discarded.
    Replaced,
}

/// Holds at most one event per node id for the duration of one batch.
///
/// Events come back out in the order their node id was first seen.
#[derive(Debug)]
pub struct EntityMergeMap {
    order: Vec<String>,
    events: HashMap<String, DomainEvent>,
    combine_create_update: bool,
}

impl Default for EntityMergeMap {
    fn default() -> Self { Self::new(true) }
}

impl EntityMergeMap {
    pub fn new(combine_create_update: bool) -> Self { Self { order: Vec::new(), events: HashMap::new(), combine_create_update } }

    pub fn merge(&mut self, node_id: &str, event: DomainEvent) -> MergeOutcome {
        match self.events.entry(node_id.to_string()) {
            Entry::Vacant(entry) => {
                self.order.push(node_id.to_string());
                entry.insert(event);
                MergeOutcome::Inserted
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if self.combine_create_update && is_record_create_then_update(existing, &event) {
                    apply_final_values(existing, &event);
                    return MergeOutcome::Combined;
                }
                debug!(node_id, "EntityMergeMap - {} replaces buffered {}", event.kind, existing.kind);
                entry.insert(event);
                MergeOutcome::Replaced
            }
        }
    }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn get(&self, node_id: &str) -> Option<&DomainEvent> { self.events.get(node_id) }

    pub fn into_events(mut self) -> Vec<DomainEvent> { self.order.iter().filter_map(|id| self.events.remove(id)).collect() }
}

fn is_record_create_then_update(existing: &DomainEvent, next: &DomainEvent) -> bool {
    existing.kind.entity_kind() == EntityKind::Record
        && existing.kind.op_kind() == OpKind::Create
        && next.kind.entity_kind() == EntityKind::Record
        && next.kind.op_kind() == OpKind::Edit
}

/// Overlay the update's new values onto the create's field map. Fields the update did not touch keep their created value.
fn apply_final_values(create: &mut DomainEvent, update: &DomainEvent) {
    let (EventPayload::Created(snapshot), EventPayload::Updated(delta)) = (&mut create.payload, &update.payload) else {
        return;
    };
    let Some(changes) = delta.members.get(FIELDS) else {
        return;
    };
    let fields = snapshot.props.entry(FIELDS.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !fields.is_object() {
        *fields = Value::Object(Map::new());
    }
    if let Value::Object(fields) = fields {
        for (field_id, change) in changes {
            fields.insert(field_id.clone(), change.new_value.clone());
        }
    }
}
