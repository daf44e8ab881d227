use std::sync::Arc;

use opscribe_proto::{DomainEvent, RawOpEntry};
use tracing::{debug, info, warn};

use crate::{
    aggregate::{BulkAggregator, BulkMerge, FailedGroup, GroupAggregator},
    builder::EventBuilder,
    classifier::classify,
    config::TranslatorConfig,
    context::ContextProvider,
    error::SkipReason,
    interpreter::InterpreterRegistry,
    merge::{EntityMergeMap, MergeOutcome},
    publisher::Publisher,
};

/// Summary of one translated batch.
#[derive(Debug, Default)]
pub struct TranslateReport {
    /// Raw operations in the batch.
    pub operations: usize,
    /// Operations that produced no event, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
    /// Distinct node ids with at least one event, before bulk aggregation.
    pub entities: usize,
    /// Buffered events discarded by a later event for the same node id.
    pub replaced: usize,
    pub failed_groups: Vec<FailedGroup>,
    /// Final events, in publish order.
    pub events: Vec<DomainEvent>,
    pub published: usize,
}

/// Translates batches of raw OT operations into domain events and publishes them.
///
/// A translator holds no per-batch state; concurrent calls are independent.
pub struct Translator {
    builder: EventBuilder,
    aggregator: Arc<dyn GroupAggregator>,
    publisher: Arc<dyn Publisher>,
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { builder: EventBuilder::default(), aggregator: Arc::new(BulkMerge), publisher, config: TranslatorConfig::default() }
    }

    pub fn with_config(mut self, config: TranslatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: InterpreterRegistry) -> Self {
        self.builder = EventBuilder::new(registry);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn GroupAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &TranslatorConfig { &self.config }

    /// Classify, build and merge every operation in arrival order. Returns one event per node id.
    pub fn collect(&self, batch: &[RawOpEntry], ctx: &dyn ContextProvider) -> (Vec<DomainEvent>, TranslateReport) {
        let mut report = TranslateReport { operations: batch.len(), ..Default::default() };
        let mut merged = EntityMergeMap::new(self.config.merge_create_update);

        for entry in batch {
            let built = classify(entry).and_then(|op| self.builder.build(&op, ctx));
            match built {
                Ok(event) => {
                    if merged.merge(&entry.node_id, event) == MergeOutcome::Replaced {
                        report.replaced += 1;
                    }
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::Malformed | SkipReason::Collection(_) | SkipReason::Interpret(_) => {
                            warn!(collection = %entry.collection, node_id = %entry.node_id, "Translator - skipped {}: {}", entry, reason)
                        }
                        SkipReason::NoInterpreter(_) | SkipReason::Unsupported { .. } => {
                            debug!(collection = %entry.collection, node_id = %entry.node_id, "Translator - skipped {}: {}", entry, reason)
                        }
                    }
                    report.skipped.push((entry.node_id.clone(), reason));
                }
            }
        }

        report.entities = merged.len();
        (merged.into_events(), report)
    }

    /// Translate one committed batch. Never fails: skipped operations and failed groups are
    /// logged and reported, everything else is published.
    pub async fn translate(&self, batch: &[RawOpEntry], ctx: &dyn ContextProvider) -> TranslateReport {
        let (events, mut report) = self.collect(batch, ctx);

        let aggregator = BulkAggregator::new(self.aggregator.clone(), self.config.bulk_threshold, self.config.group_concurrency);
        let outcome = aggregator.run(events).await;
        report.failed_groups = outcome.failed;

        if self.config.publish {
            for event in &outcome.events {
                self.publisher.publish(event.clone());
            }
            report.published = outcome.events.len();
        }
        report.events = outcome.events;

        info!(
            operations = report.operations,
            entities = report.entities,
            skipped = report.skipped.len(),
            failed_groups = report.failed_groups.len(),
            published = report.published,
            "Translator - batch translated"
        );
        report
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator").field("registry", self.builder.registry()).field("config", &self.config).finish()
    }
}
