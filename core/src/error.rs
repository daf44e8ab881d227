//! Error types for the translation pipeline.
//!
//! None of these escape `Translator::translate`; they are logged at the boundary where
//! they are caught and counted in the batch's report.

use opscribe_proto::{DecodeError, EntityKind, EventKind, OpKind};
use thiserror::Error;

/// Failure of an interpreter while reading a create payload or an edit diff list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpretError {
    #[error("unsupported path {path:?} for {kind}")]
    UnsupportedPath { kind: EntityKind, path: Vec<String> },

    #[error("invalid {kind} payload: expected {expected}")]
    InvalidPayload { kind: EntityKind, expected: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Why a raw operation produced no event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SkipReason {
    #[error("malformed operation: no create, op or del marker")]
    Malformed,

    #[error("unrecognized collection: {0}")]
    Collection(DecodeError),

    #[error("no interpreter registered for {0}")]
    NoInterpreter(EntityKind),

    #[error("unsupported combination {op_kind} on {entity_kind}")]
    Unsupported { op_kind: OpKind, entity_kind: EntityKind },

    #[error("interpreter failed: {0}")]
    Interpret(InterpretError),
}

impl From<DecodeError> for SkipReason {
    fn from(err: DecodeError) -> Self { SkipReason::Collection(err) }
}

impl From<InterpretError> for SkipReason {
    fn from(err: InterpretError) -> Self { SkipReason::Interpret(err) }
}

/// Failure to merge one event-kind group into a bulk event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregateError {
    #[error("empty group for {0}")]
    EmptyGroup(EventKind),

    #[error("group for {expected} contains a {found} event")]
    MixedKinds { expected: EventKind, found: EventKind },

    #[error("aggregation task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
