//! Per-entity-kind interpreters that turn raw create payloads and edit diffs into
//! snapshots and ordered operation contexts.

use std::{collections::HashMap, sync::Arc};

use opscribe_proto::{EntityKind, EntitySnapshot, OpDiff, OperationContext};
use serde_json::Value;
use tracing::warn;

use crate::error::InterpretError;

pub mod record;
pub mod schema;

pub use record::RecordInterpreter;
pub use schema::SchemaInterpreter;

/// Knows the shape of one entity kind's OT documents.
pub trait OpInterpreter: Send + Sync {
    fn entity_kind(&self) -> EntityKind;

    /// Initial snapshot from a creation payload. `None` means the payload carries nothing usable.
    fn create_snapshot(&self, node_id: &str, data: Option<&Value>) -> Result<Option<EntitySnapshot>, InterpretError>;

    /// One context per usable diff, in diff order. Unusable diffs are dropped; an error means
    /// nothing in the edit could be read.
    fn edit_contexts(&self, ops: &[OpDiff]) -> Result<Vec<OperationContext>, InterpretError>;
}

/// Interpreters keyed by entity kind.
#[derive(Clone, Default)]
pub struct InterpreterRegistry {
    interpreters: HashMap<EntityKind, Arc<dyn OpInterpreter>>,
}

impl InterpreterRegistry {
    pub fn new() -> Self { Self::default() }

    /// A registry with the built-in interpreter for every entity kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SchemaInterpreter::new(EntityKind::Table));
        registry.register(SchemaInterpreter::new(EntityKind::Field));
        registry.register(SchemaInterpreter::new(EntityKind::View));
        registry.register(RecordInterpreter);
        registry
    }

    /// Register an interpreter, replacing any existing one for the same kind.
    pub fn register<I: OpInterpreter + 'static>(&mut self, interpreter: I) -> &mut Self {
        self.interpreters.insert(interpreter.entity_kind(), Arc::new(interpreter));
        self
    }

    pub fn get(&self, kind: EntityKind) -> Option<&Arc<dyn OpInterpreter>> { self.interpreters.get(&kind) }
}

impl std::fmt::Debug for InterpreterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.interpreters.keys().collect();
        kinds.sort();
        f.debug_struct("InterpreterRegistry").field("kinds", &kinds).finish()
    }
}

/// Read every diff of one edit, dropping (and logging) the ones `read` rejects. Fails only when
/// no diff at all is usable, with the first rejection.
pub(crate) fn usable_contexts<F>(kind: EntityKind, ops: &[OpDiff], read: F) -> Result<Vec<OperationContext>, InterpretError>
where F: Fn(&OpDiff) -> Result<OperationContext, InterpretError> {
    let mut contexts = Vec::with_capacity(ops.len());
    let mut rejected = None;
    for diff in ops {
        match read(diff) {
            Ok(context) => contexts.push(context),
            Err(err) => {
                warn!(entity_kind = %kind, "OpInterpreter - dropping diff: {}", err);
                rejected.get_or_insert(err);
            }
        }
    }
    match rejected {
        Some(err) if contexts.is_empty() => Err(err),
        _ => Ok(contexts),
    }
}

pub(crate) fn diff_values(diff: &OpDiff) -> (Value, Value) {
    (diff.old_value.clone().unwrap_or(Value::Null), diff.new_value.clone().unwrap_or(Value::Null))
}
