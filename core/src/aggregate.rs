//! Groups a batch's per-entity events by kind and merges same-kind groups into bulk events.
//!
//! Each group is aggregated in its own task so that a failing or panicking group only
//! loses its own events.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::stream::{self, StreamExt};
use opscribe_proto::{DomainEvent, EventKind, EventPayload};
use tracing::{error, warn};

use crate::error::AggregateError;

/// Merges one group of same-kind events into a single bulk event.
pub trait GroupAggregator: Send + Sync {
    fn aggregate(&self, kind: EventKind, events: Vec<DomainEvent>) -> Result<DomainEvent, AggregateError>;
}

/// The standard bulk merge: metadata from the first member, payloads collected in order
/// under the kind's bulk property.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkMerge;

impl GroupAggregator for BulkMerge {
    fn aggregate(&self, kind: EventKind, events: Vec<DomainEvent>) -> Result<DomainEvent, AggregateError> {
        if let Some(other) = events.iter().find(|e| e.kind != kind) {
            return Err(AggregateError::MixedKinds { expected: kind, found: other.kind });
        }
        let members = events.len();
        let mut events = events.into_iter();
        let mut combined = events.next().ok_or(AggregateError::EmptyGroup(kind))?;

        if kind.bulk_property().is_none() {
            warn!(event_kind = %kind, members, dropped = members - 1, "BulkAggregator - no bulk property, passing the first event through and dropping {} others", members - 1);
            return Ok(combined);
        }

        let first = std::mem::replace(&mut combined.payload, EventPayload::Bulk(Vec::with_capacity(members)));
        let payloads = std::iter::once(first).chain(events.map(|e| e.payload)).collect();
        combined.payload = EventPayload::Bulk(payloads);
        combined.is_bulk = true;
        Ok(combined)
    }
}

/// A group that produced no event.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedGroup {
    pub kind: EventKind,
    pub members: usize,
    pub error: AggregateError,
}

#[derive(Debug, Default)]
pub struct AggregateOutcome {
    pub events: Vec<DomainEvent>,
    pub failed: Vec<FailedGroup>,
}

pub struct BulkAggregator {
    aggregator: Arc<dyn GroupAggregator>,
    threshold: usize,
    concurrency: Option<usize>,
}

impl Default for BulkAggregator {
    fn default() -> Self { Self::new(Arc::new(BulkMerge), 2, None) }
}

impl BulkAggregator {
    pub fn new(aggregator: Arc<dyn GroupAggregator>, threshold: usize, concurrency: Option<usize>) -> Self {
        Self { aggregator, threshold: threshold.max(2), concurrency }
    }

    /// Split events into groups by kind, keeping groups in first-arrival order and members in input order.
    pub fn group(events: Vec<DomainEvent>) -> Vec<(EventKind, Vec<DomainEvent>)> {
        let mut groups: Vec<(EventKind, Vec<DomainEvent>)> = Vec::new();
        for event in events {
            match groups.iter_mut().find(|(kind, _)| *kind == event.kind) {
                Some((_, members)) => members.push(event),
                None => groups.push((event.kind, vec![event])),
            }
        }
        groups
    }

    pub async fn run(&self, events: Vec<DomainEvent>) -> AggregateOutcome {
        let groups = Self::group(events);
        let limit = self.concurrency.unwrap_or(groups.len()).max(1);

        let mut results: Vec<(usize, EventKind, usize, Result<Vec<DomainEvent>, AggregateError>)> = stream::iter(groups.into_iter().enumerate())
            .map(|(index, (kind, members))| {
                let aggregator = self.aggregator.clone();
                let threshold = self.threshold;
                async move {
                    let count = members.len();
                    let result = if count < threshold { Ok(members) } else { run_isolated(aggregator, kind, members).await.map(|event| vec![event]) };
                    (index, kind, count, result)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        results.sort_by_key(|(index, ..)| *index);

        let mut outcome = AggregateOutcome::default();
        for (_, kind, members, result) in results {
            match result {
                Ok(events) => outcome.events.extend(events),
                Err(error) => {
                    error!(event_kind = %kind, members, "BulkAggregator - group failed, dropping its events: {}", error);
                    outcome.failed.push(FailedGroup { kind, members, error });
                }
            }
        }
        outcome
    }
}

async fn run_isolated(aggregator: Arc<dyn GroupAggregator>, kind: EventKind, events: Vec<DomainEvent>) -> Result<DomainEvent, AggregateError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => match handle.spawn(async move { aggregator.aggregate(kind, events) }).await {
            Ok(result) => result,
            Err(err) => Err(AggregateError::Panicked(err.to_string())),
        },
        Err(_) => std::panic::catch_unwind(AssertUnwindSafe(|| aggregator.aggregate(kind, events)))
            .unwrap_or_else(|_| Err(AggregateError::Panicked(format!("aggregator for {kind} panicked")))),
    }
}
