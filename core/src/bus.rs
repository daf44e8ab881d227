use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Weak,
    },
};

use dashmap::DashMap;
use opscribe_proto::{DomainEvent, EventKind};
use tracing::warn;

use crate::task;

pub type Listener = Arc<dyn Fn(Arc<DomainEvent>) + Send + Sync + 'static>;

/// The process-wide event bus. Cloning yields another handle to the same bus.
///
/// Publishing never waits for listeners: inside a tokio runtime every listener call runs in its
/// own task, outside one listeners are called inline. A panicking listener is logged and ignored.
#[derive(Clone, Default)]
pub struct EventBus(Arc<Inner>);

#[derive(Default)]
struct Inner {
    listeners: DashMap<usize, Registration>,
    next_id: AtomicUsize,
}

#[derive(Clone)]
struct Registration {
    kind: Option<EventKind>,
    listener: Listener,
}

/// Unsubscribes its listener when dropped.
#[must_use = "the listener is removed when the guard is dropped"]
pub struct ListenerGuard {
    inner: Weak<Inner>,
    id: usize,
}

impl EventBus {
    pub fn new() -> Self { Self::default() }

    /// Receive every published event.
    pub fn listen<F>(&self, listener: F) -> ListenerGuard
    where F: Fn(Arc<DomainEvent>) + Send + Sync + 'static {
        self.register(None, Arc::new(listener))
    }

    /// Receive only events of one kind.
    pub fn listen_kind<F>(&self, kind: EventKind, listener: F) -> ListenerGuard
    where F: Fn(Arc<DomainEvent>) + Send + Sync + 'static {
        self.register(Some(kind), Arc::new(listener))
    }

    /// Forward every published event into a channel. Send errors are ignored.
    pub fn listen_channel(&self, tx: tokio::sync::mpsc::UnboundedSender<Arc<DomainEvent>>) -> ListenerGuard {
        self.listen(move |event| {
            let _ = tx.send(event);
        })
    }

    pub fn listener_count(&self) -> usize { self.0.listeners.len() }

    pub fn send(&self, event: Arc<DomainEvent>) {
        // snapshot the matching listeners so no map shard is locked while they run
        let listeners: Vec<Listener> = self
            .0
            .listeners
            .iter()
            .filter(|entry| entry.kind.map_or(true, |kind| kind == event.kind))
            .map(|entry| entry.listener.clone())
            .collect();

        for listener in listeners {
            let event = event.clone();
            task::spawn_or_run(move || invoke(&listener, event));
        }
    }

    fn register(&self, kind: Option<EventKind>, listener: Listener) -> ListenerGuard {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.insert(id, Registration { kind, listener });
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }
}

fn invoke(listener: &Listener, event: Arc<DomainEvent>) {
    let kind = event.kind;
    if std::panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
        warn!(event_kind = %kind, "EventBus - listener panicked");
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("EventBus").field("listeners", &self.listener_count()).finish() }
}
