use opscribe_proto::{CreatePayload, EntityKind, OpDiff, OpKind, RawOpEntry};

use crate::error::SkipReason;

/// A raw operation resolved to its entity kind and structural kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedOp<'a> {
    pub entity_kind: EntityKind,
    pub container_id: &'a str,
    pub node_id: &'a str,
    pub body: OpBody<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpBody<'a> {
    Create(&'a CreatePayload),
    Edit(&'a [OpDiff]),
    Delete,
}

impl ClassifiedOp<'_> {
    pub fn op_kind(&self) -> OpKind {
        match self.body {
            OpBody::Create(_) => OpKind::Create,
            OpBody::Edit(_) => OpKind::Edit,
            OpBody::Delete => OpKind::Delete,
        }
    }
}

/// Resolve `(EntityKind, containerId, nodeId, OpKind)` for one raw operation. Pure; the caller logs skips.
pub fn classify(entry: &RawOpEntry) -> Result<ClassifiedOp<'_>, SkipReason> {
    let (entity_kind, container_id) = entry.collection.parse()?;
    let body = match (&entry.op.create, &entry.op.op, entry.op.kind()) {
        (Some(create), _, _) => OpBody::Create(create),
        (None, Some(ops), _) => OpBody::Edit(ops),
        (None, None, Some(OpKind::Delete)) => OpBody::Delete,
        _ => return Err(SkipReason::Malformed),
    };
    Ok(ClassifiedOp { entity_kind, container_id, node_id: &entry.node_id, body })
}
