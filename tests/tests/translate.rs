use anyhow::Result;
use common::*;
use opscribe_core::{proto::*, Translator, TranslatorConfig};
use serde_json::json;
use std::collections::HashSet;

/// Pre-bulk event count equals the number of distinct node ids with a classifiable operation
#[tokio::test]
async fn test_one_event_per_distinct_node() -> Result<()> {
    let translator = Translator::new(Recorder::new());
    let batch = vec![
        create_record("rec1", json!({"fldName": "Walking on a Dream"})),
        set_cells("rec2", &[("fldYear", json!("2008"), json!("2009"))]),
        set_cells("rec2", &[("fldName", json!("Ice on the Dune"), json!("Ice On The Dune"))]),
        delete(EntityKind::Record, "rec3"),
        create_field("fldGenre", "Genre"),
        RawOpEntry::new("rec_tblAlbums", "rec4", RawOp::default()),
    ];

    let (events, report) = translator.collect(&batch, &ctx());
    let distinct: HashSet<_> = batch.iter().filter(|e| e.op.kind().is_some()).map(|e| e.node_id.as_str()).collect();

    assert_eq!(events.len(), distinct.len());
    assert_eq!(report.entities, 4);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.replaced, 1);
    Ok(())
}

/// Create then update of the same record in one batch publishes a single create with the final values
#[tokio::test]
async fn test_create_then_update_collapses() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let batch = vec![create_record("rec1", json!({"fldA": 1})), set_cells("rec1", &[("fldA", json!(1), json!(2))])];

    translator.translate(&batch, &ctx()).await;

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["eventKind"], json!("TABLE_RECORD_CREATE"));
    assert_eq!(messages[0]["payload"], json!({"record": {"id": "rec1", "fields": {"fldA": 2}}}));
    assert_eq!(messages[0]["isBulk"], json!(false));
    Ok(())
}

/// Two record updates in one batch become one bulk update, each keeping its own old/new pairs
#[tokio::test]
async fn test_two_updates_become_one_bulk_event() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let batch = vec![set_cells("recX", &[("fldA", json!(1), json!(2))]), set_cells("recY", &[("fldA", json!("a"), json!("b"))])];

    translator.translate(&batch, &ctx()).await;

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["eventKind"], json!("TABLE_RECORD_UPDATE"));
    assert_eq!(messages[0]["isBulk"], json!(true));
    assert_eq!(
        messages[0]["payload"]["record"],
        json!([
            {"id": "recX", "fields": {"fldA": {"oldValue": 1, "newValue": 2}}},
            {"id": "recY", "fields": {"fldA": {"oldValue": "a", "newValue": "b"}}}
        ])
    );
    assert_eq!(messages[0]["context"]["user"]["id"], json!("usrAlice"));
    Ok(())
}

/// A lone update is never wrapped
#[tokio::test]
async fn test_single_update_is_not_bulk() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());

    translator.translate(&[set_cells("rec1", &[("fldA", json!(1), json!(2))])], &ctx()).await;

    let events = recorder.take();
    assert_eq!(events.len(), 1);
    assert!(!events[0].is_bulk);
    assert_eq!(events[0].entity_id, "rec1");
    Ok(())
}

/// Two diffs on different fields of one record land in one update
#[tokio::test]
async fn test_nested_paths_merge_into_one_update() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let batch = vec![set_cells("rec1", &[("fieldA", json!(1), json!(2)), ("fieldB", json!(null), json!("x"))])];

    translator.translate(&batch, &ctx()).await;

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    let fields = &messages[0]["payload"]["record"]["fields"];
    assert_eq!(fields["fieldA"], json!({"oldValue": 1, "newValue": 2}));
    assert_eq!(fields["fieldB"], json!({"oldValue": null, "newValue": "x"}));
    assert_eq!(messages[0]["opMeta"], json!({"name": "setRecord", "propertyKey": "fieldB"}));
    Ok(())
}

/// Malformed operations are skipped without affecting their neighbours
#[tokio::test]
async fn test_malformed_operation_among_valid_ones() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let batch = vec![
        create_field("fldA", "Name"),
        RawOpEntry::new("rec_tblAlbums", "recBroken", RawOp::default()),
        RawOpEntry::new("xyz_tblAlbums", "recUnknown", RawOp::delete()),
        delete(EntityKind::View, "viwGrid"),
    ];

    let report = translator.translate(&batch, &ctx()).await;

    let kinds: Vec<_> = recorder.take().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::FieldCreate, EventKind::ViewDelete]);
    let skipped: Vec<_> = report.skipped.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(skipped, vec!["recBroken", "recUnknown"]);
    Ok(())
}

/// Translating the same batch twice yields identical events
#[tokio::test]
async fn test_translation_is_idempotent() -> Result<()> {
    let translator = Translator::new(Recorder::new()).with_config(TranslatorConfig::default().dry_run());
    let batch = vec![
        create_record("rec1", json!({"fldA": 1})),
        set_cells("rec2", &[("fldA", json!(1), json!(2))]),
        set_cells("rec3", &[("fldB", json!(3), json!(4))]),
        create_field("fld9", "Notes"),
        delete(EntityKind::Record, "rec4"),
        delete(EntityKind::Record, "rec5"),
    ];

    let first = translator.translate(&batch, &ctx()).await;
    let second = translator.translate(&batch, &ctx()).await;

    assert_eq!(first.events, second.events);
    assert_eq!(first.events.len(), 4);
    Ok(())
}

/// Record updates carry the previous field definition from the batch context
#[tokio::test]
async fn test_record_update_carries_previous_field() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let ctx = ctx().with_previous_field(FieldSnapshot {
        id: "fldTotal".into(),
        name: "Total".into(),
        field_type: "formula".into(),
        is_lookup: Some(false),
        options: json!({"expression": "{fldA} * 2"}),
    });

    translator.translate(&[set_cells("rec1", &[("fldTotal", json!(2), json!(4))]), create_field("fldB", "B")], &ctx).await;

    let events = recorder.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].old_field.as_ref().map(|f| f.id.as_str()), Some("fldTotal"));
    assert!(events[1].old_field.is_none());
    Ok(())
}

/// Concurrent batches translated by the same translator do not interfere
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_are_independent() -> Result<()> {
    let translator = std::sync::Arc::new(Translator::new(Recorder::new()).with_config(TranslatorConfig::default().dry_run()));

    let mut handles = Vec::new();
    for n in 0..8 {
        let translator = translator.clone();
        handles.push(tokio::spawn(async move {
            let batch = vec![create_record(&format!("rec{n}"), json!({})), set_cells(&format!("rec{n}"), &[("fldA", json!(null), json!(n))])];
            let report = translator.translate(&batch, &ctx()).await;
            report
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let report = handle.await?;
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].payload.to_value(), json!({"id": format!("rec{n}"), "fields": {"fldA": n}}));
    }
    Ok(())
}

/// An unsupported diff in an edit only drops itself
#[tokio::test]
async fn test_unsupported_diff_keeps_the_rest_of_the_edit() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let mut cells = set_cells("rec1", &[("fldA", json!(1), json!(2))]);
    if let Some(ops) = cells.op.op.as_mut() {
        ops.push(OpDiff::new(["fields", "fldTags", "0"], None, Some(json!("rock"))));
    }
    let rename = RawOpEntry::new(
        CollectionId::new(EntityKind::Field, TABLE),
        "fldA",
        RawOp::edit(vec![
            OpDiff::new(["name"], Some(json!("A")), Some(json!("B"))),
            OpDiff::new(["options", "choices", "0"], None, Some(json!({"name": "red"}))),
        ]),
    );

    let report = translator.translate(&[cells, rename], &ctx()).await;

    assert!(report.skipped.is_empty());
    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["payload"]["record"]["fields"], json!({"fldA": {"oldValue": 1, "newValue": 2}}));
    assert_eq!(messages[1]["eventKind"], json!("TABLE_FIELD_UPDATE"));
    assert_eq!(messages[1]["payload"]["field"]["name"], json!({"oldValue": "A", "newValue": "B"}));
    Ok(())
}

/// Collapsing a create with a later update keeps the created values the update did not touch
#[tokio::test]
async fn test_create_then_partial_update_keeps_created_values() -> Result<()> {
    let recorder = Recorder::new();
    let translator = Translator::new(recorder.clone());
    let batch = vec![
        create_record("rec1", json!({"fldName": "Dream", "fldYear": 2008})),
        set_cells("rec1", &[("fldFormula", json!(null), json!(4016))]),
    ];

    translator.translate(&batch, &ctx()).await;

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["eventKind"], json!("TABLE_RECORD_CREATE"));
    assert_eq!(messages[0]["payload"]["record"]["fields"], json!({"fldName": "Dream", "fldYear": 2008, "fldFormula": 4016}));
    Ok(())
}
