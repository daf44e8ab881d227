use std::sync::Arc;

use opscribe_proto::DomainEvent;

use crate::bus::EventBus;

/// Where finalized events go. Implementations must return without waiting on subscribers.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

impl Publisher for EventBus {
    fn publish(&self, event: DomainEvent) { self.send(Arc::new(event)) }
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, event: DomainEvent) { (**self).publish(event) }
}
