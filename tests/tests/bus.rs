use anyhow::Result;
use common::*;
use opscribe_core::{error::AggregateError, proto::*, EventBus, GroupAggregator, Translator};
use serde_json::json;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::mpsc;

async fn recv(rx: &mut mpsc::UnboundedReceiver<Arc<DomainEvent>>) -> Result<Arc<DomainEvent>> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv()).await?.ok_or_else(|| anyhow::anyhow!("bus closed"))
}

#[tokio::test]
async fn test_translated_events_reach_bus_listeners() -> Result<()> {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _guard = bus.listen_channel(tx);
    let translator = Translator::new(Arc::new(bus.clone()));

    let batch = vec![
        set_cells("rec1", &[("fldA", json!(1), json!(2))]),
        set_cells("rec2", &[("fldA", json!(3), json!(4))]),
        delete(EntityKind::Field, "fldOld"),
    ];
    let report = translator.translate(&batch, &ctx()).await;
    assert_eq!(report.published, 2);

    let mut kinds = vec![recv(&mut rx).await?.kind, recv(&mut rx).await?.kind];
    kinds.sort();
    assert_eq!(kinds, vec![EventKind::FieldDelete, EventKind::RecordUpdate]);
    Ok(())
}

#[tokio::test]
async fn test_kind_listener_sees_only_its_kind() -> Result<()> {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _guard = bus.listen_kind(EventKind::RecordDelete, move |event| {
        let _ = tx.send(event);
    });
    let translator = Translator::new(Arc::new(bus.clone()));

    translator.translate(&[create_field("fldA", "Artist"), delete(EntityKind::Record, "rec1"), delete(EntityKind::Record, "rec2")], &ctx()).await;

    let event = recv(&mut rx).await?;
    assert_eq!(event.kind, EventKind::RecordDelete);
    assert!(event.is_bulk);
    assert_eq!(event.entity_ids(), vec!["rec1", "rec2"]);
    assert!(tokio::time::timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_listener_is_isolated() -> Result<()> {
    let bus = EventBus::new();
    let _bad = bus.listen(|_| panic!("subscriber failure"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _good = bus.listen_channel(tx);
    let translator = Translator::new(Arc::new(bus.clone()));

    translator.translate(&[delete(EntityKind::View, "viwKanban")], &ctx()).await;

    assert_eq!(recv(&mut rx).await?.entity_id, "viwKanban");
    assert_eq!(bus.listener_count(), 2);
    Ok(())
}

/// Fails every group of one kind and counts the groups it was asked to merge.
struct Flaky {
    kind: EventKind,
    calls: Mutex<Vec<EventKind>>,
}

impl GroupAggregator for Flaky {
    fn aggregate(&self, kind: EventKind, events: Vec<DomainEvent>) -> Result<DomainEvent, AggregateError> {
        self.calls.lock().unwrap().push(kind);
        if kind == self.kind {
            return Err(AggregateError::Other(format!("refusing {kind}")));
        }
        opscribe_core::BulkMerge.aggregate(kind, events)
    }
}

#[tokio::test]
async fn test_failing_group_does_not_block_other_kinds() -> Result<()> {
    let recorder = Recorder::new();
    let flaky = Arc::new(Flaky { kind: EventKind::RecordUpdate, calls: Mutex::new(Vec::new()) });
    let translator = Translator::new(recorder.clone()).with_aggregator(flaky.clone());

    let batch = vec![
        set_cells("rec1", &[("fldA", json!(1), json!(2))]),
        create_field("fldA", "Artist"),
        set_cells("rec2", &[("fldA", json!(3), json!(4))]),
        create_field("fldB", "Year"),
        delete(EntityKind::Record, "rec9"),
    ];
    let report = translator.translate(&batch, &ctx()).await;

    assert_eq!(report.failed_groups.len(), 1);
    assert_eq!(report.failed_groups[0].kind, EventKind::RecordUpdate);
    assert_eq!(report.failed_groups[0].members, 2);

    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["eventKind"], json!("TABLE_FIELD_CREATE"));
    assert_eq!(messages[0]["payload"]["field"][1]["name"], json!("Year"));
    assert_eq!(messages[1]["payload"], json!({"recordId": "rec9"}));

    let mut calls = flaky.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec![EventKind::FieldCreate, EventKind::RecordUpdate]);
    Ok(())
}
