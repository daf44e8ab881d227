use opscribe_proto::{EntityKind, EntitySnapshot, OpDiff, OperationContext};
use serde_json::{Map, Value};

use super::{diff_values, usable_contexts, OpInterpreter};
use crate::error::InterpretError;

/// Property of a record document holding the field-value map.
pub const FIELDS: &str = "fields";

/// Interpreter for record documents: `{ fields: { <fieldId>: value } }` plus top-level metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordInterpreter;

impl OpInterpreter for RecordInterpreter {
    fn entity_kind(&self) -> EntityKind { EntityKind::Record }

    fn create_snapshot(&self, node_id: &str, data: Option<&Value>) -> Result<Option<EntitySnapshot>, InterpretError> {
        let obj = match data {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(obj)) => obj,
            Some(_) => return Err(InterpretError::InvalidPayload { kind: EntityKind::Record, expected: "an object" }),
        };
        let fields = match obj.get(FIELDS) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(fields)) => fields.clone(),
            Some(_) => return Err(InterpretError::InvalidPayload { kind: EntityKind::Record, expected: "a fields object" }),
        };
        let mut props = Map::new();
        props.insert(FIELDS.to_string(), Value::Object(fields));
        Ok(Some(EntitySnapshot { id: node_id.to_string(), props }))
    }

    fn edit_contexts(&self, ops: &[OpDiff]) -> Result<Vec<OperationContext>, InterpretError> {
        usable_contexts(EntityKind::Record, ops, |diff| {
            let (old_value, new_value) = diff_values(diff);
            match diff.path.as_slice() {
                [property, field_id] if property == FIELDS => {
                    Ok(OperationContext::new("setRecord", Some(field_id.clone()), diff.path.clone(), old_value, new_value))
                }
                [property] => Ok(OperationContext::new("setRecordProperty", Some(property.clone()), diff.path.clone(), old_value, new_value)),
                _ => Err(InterpretError::UnsupportedPath { kind: EntityKind::Record, path: diff.path.clone() }),
            }
        })
    }
}
