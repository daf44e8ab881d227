use opscribe_proto::{EntityKind, EntitySnapshot, OpDiff, OperationContext};
use serde_json::Value;

use super::{diff_values, usable_contexts, OpInterpreter};
use crate::error::InterpretError;

/// Interpreter for schema documents (tables, fields, views): flat objects whose
/// properties are edited one at a time.
#[derive(Debug, Clone, Copy)]
pub struct SchemaInterpreter {
    kind: EntityKind,
    op_name: &'static str,
}

impl SchemaInterpreter {
    pub fn new(kind: EntityKind) -> Self {
        let op_name = match kind {
            EntityKind::Table => "setTableProperty",
            EntityKind::Field => "setFieldProperty",
            EntityKind::View => "setViewProperty",
            EntityKind::Record => "setRecordProperty",
        };
        Self { kind, op_name }
    }
}

impl OpInterpreter for SchemaInterpreter {
    fn entity_kind(&self) -> EntityKind { self.kind }

    fn create_snapshot(&self, node_id: &str, data: Option<&Value>) -> Result<Option<EntitySnapshot>, InterpretError> {
        match data {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(obj)) => {
                let mut props = obj.clone();
                props.remove("id");
                Ok(Some(EntitySnapshot { id: node_id.to_string(), props }))
            }
            Some(_) => Err(InterpretError::InvalidPayload { kind: self.kind, expected: "an object" }),
        }
    }

    fn edit_contexts(&self, ops: &[OpDiff]) -> Result<Vec<OperationContext>, InterpretError> {
        usable_contexts(self.kind, ops, |diff| match diff.path.as_slice() {
            [property] => {
                let (old_value, new_value) = diff_values(diff);
                Ok(OperationContext::new(self.op_name, Some(property.clone()), diff.path.clone(), old_value, new_value))
            }
            [property, member] => {
                // e.g. a view's columnMeta entry
                let (old_value, new_value) = diff_values(diff);
                Ok(OperationContext::new(self.op_name, Some(format!("{property}.{member}")), diff.path.clone(), old_value, new_value))
            }
            _ => Err(InterpretError::UnsupportedPath { kind: self.kind, path: diff.path.clone() }),
        })
    }
}
