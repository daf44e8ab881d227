use opscribe_proto::{DomainEvent, EntityDelta, EntityKind, EntitySnapshot, EventKind, EventPayload, OpMeta, OperationContext, ValueChange};
use tracing::{debug, warn};

use crate::{
    classifier::{ClassifiedOp, OpBody},
    context::ContextProvider,
    error::{InterpretError, SkipReason},
    interpreter::{InterpreterRegistry, OpInterpreter},
};

/// Turns one classified operation into the domain event for its node id.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    registry: InterpreterRegistry,
}

impl Default for EventBuilder {
    fn default() -> Self { Self::new(InterpreterRegistry::with_defaults()) }
}

impl EventBuilder {
    pub fn new(registry: InterpreterRegistry) -> Self { Self { registry } }

    pub fn registry(&self) -> &InterpreterRegistry { &self.registry }

    pub fn build(&self, op: &ClassifiedOp<'_>, ctx: &dyn ContextProvider) -> Result<DomainEvent, SkipReason> {
        let op_kind = op.op_kind();
        let kind = EventKind::of(op_kind, op.entity_kind).ok_or(SkipReason::Unsupported { op_kind, entity_kind: op.entity_kind })?;

        let mut op_meta = None;
        let payload = match &op.body {
            OpBody::Create(create) => {
                let interpreter = self.interpreter(op.entity_kind)?;
                let snapshot = match interpreter.create_snapshot(op.node_id, create.data.as_ref()) {
                    Ok(Some(snapshot)) => snapshot,
                    Ok(None) => fallback_snapshot(op)
                        .ok_or(SkipReason::Interpret(InterpretError::InvalidPayload { kind: op.entity_kind, expected: "a creation payload" }))?,
                    Err(err) => {
                        warn!(node_id = op.node_id, "EventBuilder - create payload for {} not understood: {}", op.entity_kind, err);
                        fallback_snapshot(op).ok_or(SkipReason::Interpret(err))?
                    }
                };
                EventPayload::Created(snapshot)
            }
            OpBody::Edit(ops) => {
                let interpreter = self.interpreter(op.entity_kind)?;
                let contexts = match interpreter.edit_contexts(ops) {
                    Ok(contexts) => contexts,
                    Err(err) => {
                        warn!(node_id = op.node_id, "EventBuilder - edit of {} not understood: {}", op.entity_kind, err);
                        Vec::new()
                    }
                };
                let (delta, last) = apply_contexts(op.node_id, &contexts);
                op_meta = last.map(|context| OpMeta { name: context.name.clone(), property_key: context.key.clone() });
                if delta.is_empty() {
                    // nothing usable: an id-only payload where the kind has one, otherwise no event
                    if !op.entity_kind.defaults_to_id_only() {
                        return Err(SkipReason::Interpret(InterpretError::Other(format!("no usable change in edit of {}", op.node_id))));
                    }
                    debug!(node_id = op.node_id, "EventBuilder - empty edit of {}, using id-only payload", op.entity_kind);
                }
                EventPayload::Updated(delta)
            }
            OpBody::Delete => EventPayload::Deleted(op.node_id.to_string()),
        };

        let old_field = if kind == EventKind::RecordUpdate { ctx.previous_field() } else { None };

        Ok(DomainEvent {
            kind,
            entity_id: op.node_id.to_string(),
            container_id: op.container_id.to_string(),
            payload,
            context: ctx.request_context(),
            raw_op_kind: op_kind,
            is_bulk: false,
            op_meta,
            old_field,
        })
    }

    fn interpreter(&self, kind: EntityKind) -> Result<&dyn OpInterpreter, SkipReason> {
        self.registry.get(kind).map(|i| i.as_ref()).ok_or(SkipReason::NoInterpreter(kind))
    }
}

fn fallback_snapshot(op: &ClassifiedOp<'_>) -> Option<EntitySnapshot> {
    op.entity_kind.defaults_to_id_only().then(|| EntitySnapshot::id_only(op.node_id))
}

/// Fold ordered contexts into one delta. Returns the last context that was applied.
fn apply_contexts<'a>(node_id: &str, contexts: &'a [OperationContext]) -> (EntityDelta, Option<&'a OperationContext>) {
    let mut delta = EntityDelta::new(node_id);
    let mut last = None;
    for context in contexts {
        let change = ValueChange::new(context.old_value.clone(), context.new_value.clone());
        match context.path.as_slice() {
            [property] => {
                delta.props.insert(property.clone(), change);
            }
            [property, member] => {
                delta.members.entry(property.clone()).or_default().insert(member.clone(), change);
            }
            path => {
                debug!(node_id, "EventBuilder - ignoring context {} with path {:?}", context.name, path);
                continue;
            }
        }
        last = Some(context);
    }
    (delta, last)
}
