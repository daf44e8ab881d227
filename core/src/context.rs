use opscribe_proto::{FieldSnapshot, RequestContext};

/// Supplies request-scoped metadata for one batch. Read-only.
pub trait ContextProvider: Send + Sync {
    fn request_context(&self) -> RequestContext;

    /// Field definition before the transaction; only consulted for record updates.
    fn previous_field(&self) -> Option<FieldSnapshot> { None }
}

/// The explicit context of one translation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchContext {
    pub request: RequestContext,
    pub previous_field: Option<FieldSnapshot>,
}

impl BatchContext {
    pub fn new(request: RequestContext) -> Self { Self { request, previous_field: None } }

    pub fn with_previous_field(mut self, field: FieldSnapshot) -> Self {
        self.previous_field = Some(field);
        self
    }
}

impl ContextProvider for BatchContext {
    fn request_context(&self) -> RequestContext { self.request.clone() }

    fn previous_field(&self) -> Option<FieldSnapshot> { self.previous_field.clone() }
}

impl ContextProvider for RequestContext {
    fn request_context(&self) -> RequestContext { self.clone() }
}
