use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("collection id has no entity prefix: {0}")]
    MissingPrefix(String),
    #[error("unknown entity prefix: {0}")]
    UnknownPrefix(String),
    #[error("collection id has an empty container id: {0}")]
    EmptyContainer(String),
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),
}
