use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type, SchemaRef};
use datafusion::prelude::{DataFrame, SessionContext};
use pretty_assertions::assert_eq;
use upsert_error::{ErrorCode, UpsertResult, err};
use upsert_merge::{
    ACTION_COLUMN, MemorySink, NullEquality, ReconcileStats, TableSink, UpsertOptions, Upserter,
};

type Row = (i64, Option<String>);

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    RecordBatch::try_from_iter(columns).unwrap()
}

fn people(ids: &[i64], names: &[Option<&str>]) -> RecordBatch {
    batch(vec![
        ("id", Arc::new(Int64Array::from(ids.to_vec())) as ArrayRef),
        ("name", Arc::new(StringArray::from(names.to_vec())) as ArrayRef),
    ])
}

fn frame(ctx: &SessionContext, batch: RecordBatch) -> DataFrame {
    ctx.read_batch(batch).unwrap()
}

fn strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array = batch.column_by_name(column).unwrap();
    let array = cast(array, &DataType::Utf8).unwrap();
    array
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn ids(batch: &RecordBatch) -> Vec<i64> {
    let array = cast(batch.column_by_name("id").unwrap(), &DataType::Int64).unwrap();
    array.as_primitive::<Int64Type>().values().to_vec()
}

/// `(id, column)` pairs sorted by id.
fn rows(batches: &[RecordBatch], column: &str) -> Vec<Row> {
    let mut rows = batches
        .iter()
        .flat_map(|b| ids(b).into_iter().zip(strings(b, column)))
        .collect::<Vec<_>>();
    rows.sort();
    rows
}

fn row(id: i64, value: Option<&str>) -> Row {
    (id, value.map(str::to_string))
}

#[tokio::test]
async fn reconciles_the_worked_example() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1, 2], &[Some("a"), Some("b")]));
    let new = frame(&ctx, people(&[2, 3], &[Some("B"), Some("c")]));

    let result = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["id"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(
        rows(&result.batches, "name"),
        vec![row(2, Some("B")), row(3, Some("c"))]
    );
    assert_eq!(
        result.stats,
        ReconcileStats {
            inserted: 1,
            updated: 1,
            unchanged: 0,
            dropped: 1,
        }
    );
    let names = result
        .schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["id", "name"]);
}

#[tokio::test]
async fn unchanged_rows_keep_current_values() {
    let ctx = SessionContext::new();
    let current = frame(
        &ctx,
        batch(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
            ("note", Arc::new(StringArray::from(vec!["old-1", "old-2"])) as ArrayRef),
        ]),
    );
    let new = frame(
        &ctx,
        batch(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec!["a", "B"])) as ArrayRef),
            ("note", Arc::new(StringArray::from(vec!["new-1", "new-2"])) as ArrayRef),
        ]),
    );
    let options = UpsertOptions::new(["id"]).with_compare_columns(["name"]);

    let result = Upserter::new(ctx)
        .reconcile(current, new, &options)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    // id 1: name unchanged, so the whole row (note included) comes from Current.
    // id 2: name changed, so the whole row comes from New.
    assert_eq!(
        rows(&result.batches, "note"),
        vec![row(1, Some("old-1")), row(2, Some("new-2"))]
    );
    assert_eq!(result.stats.unchanged, 1);
    assert_eq!(result.stats.updated, 1);
}

#[tokio::test]
async fn null_safe_equality_treats_null_pairs_as_equal() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1, 2, 3], &[None, Some("x"), None]));
    let new = frame(&ctx, people(&[1, 2, 3], &[None, None, Some("y")]));

    let result = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["id"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(
        result.stats,
        ReconcileStats {
            inserted: 0,
            updated: 2,
            unchanged: 1,
            dropped: 0,
        }
    );
    assert_eq!(
        rows(&result.batches, "name"),
        vec![row(1, None), row(2, None), row(3, Some("y"))]
    );
}

#[tokio::test]
async fn never_equal_treats_any_null_as_a_change() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1, 2, 3], &[None, Some("x"), Some("z")]));
    let new = frame(&ctx, people(&[1, 2, 3], &[None, None, Some("z")]));
    let options = UpsertOptions::new(["id"]).with_null_equality(NullEquality::NeverEqual);

    let result = Upserter::new(ctx)
        .reconcile(current, new, &options)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(result.stats.updated, 2);
    assert_eq!(result.stats.unchanged, 1);
}

#[tokio::test]
async fn composite_keys_and_row_count_law() {
    let ctx = SessionContext::new();
    let make = |regions: Vec<&str>, ids: Vec<i64>, names: Vec<&str>| {
        batch(vec![
            ("region", Arc::new(StringArray::from(regions)) as ArrayRef),
            ("id", Arc::new(Int64Array::from(ids)) as ArrayRef),
            ("name", Arc::new(StringArray::from(names)) as ArrayRef),
        ])
    };
    let current = frame(&ctx, make(vec!["eu", "us", "eu"], vec![1, 1, 2], vec!["a", "b", "c"]));
    let new = frame(
        &ctx,
        make(vec!["eu", "us", "us"], vec![1, 1, 2], vec!["a", "B", "d"]),
    );

    let result = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["region", "id"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(result.num_rows(), 3);
    assert_eq!(result.stats.total(), 3);
    assert_eq!(
        result.stats,
        ReconcileStats {
            inserted: 1,
            updated: 1,
            unchanged: 1,
            dropped: 1,
        }
    );
}

#[tokio::test]
async fn unchanged_rows_are_cast_to_new_types() {
    let ctx = SessionContext::new();
    let current = frame(
        &ctx,
        batch(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("score", Arc::new(Int32Array::from(vec![10, 20])) as ArrayRef),
        ]),
    );
    let new = frame(
        &ctx,
        batch(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("score", Arc::new(Int64Array::from(vec![10, 21])) as ArrayRef),
        ]),
    );

    let result = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["id"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(
        result.schema.field_with_name("score").unwrap().data_type(),
        &DataType::Int64
    );
    assert_eq!(
        rows(&result.batches, "score"),
        vec![row(1, Some("10")), row(2, Some("21"))]
    );
    assert_eq!(result.stats.unchanged, 1);
}

#[tokio::test]
async fn tagged_frame_labels_each_row() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1, 2], &[Some("a"), Some("b")]));
    let new = frame(&ctx, people(&[1, 2, 3], &[Some("a"), Some("B"), Some("c")]));

    let reconciled = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["id"]))
        .await
        .unwrap();
    let tagged = reconciled.tagged().clone().collect().await.unwrap();

    assert_eq!(
        rows(&tagged, ACTION_COLUMN),
        vec![
            row(1, Some("unchanged")),
            row(2, Some("updated")),
            row(3, Some("inserted"))
        ]
    );
    let plain = reconciled.dataframe().unwrap();
    assert_eq!(plain.schema().fields().len(), 2);
    assert_eq!(reconciled.dropped().clone().count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_compared_column_is_a_schema_mismatch() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1], &[Some("a")]));
    let new = frame(&ctx, people(&[1], &[Some("a")]));
    let options = UpsertOptions::new(["id"]).with_compare_columns(["email"]);

    let err = Upserter::new(ctx)
        .reconcile(current, new, &options)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code, ErrorCode::SchemaMismatch);
}

#[tokio::test]
async fn duplicate_keys_are_ambiguous() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1], &[Some("a")]));
    let new = frame(&ctx, people(&[1, 1], &[Some("a"), Some("b")]));
    let upserter = Upserter::new(ctx);

    let err = upserter
        .reconcile(current.clone(), new.clone(), &UpsertOptions::new(["id"]))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code, ErrorCode::AmbiguousPrimaryKey);
    assert!(err.to_string().contains("new dataset"), "{err}");

    // Without the check the duplicates flow through as-is.
    let unchecked = UpsertOptions::new(["id"]).with_check_unique_keys(false);
    let result = upserter
        .reconcile(current, new, &unchecked)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(result.num_rows(), 2);
}

#[tokio::test]
async fn empty_key_is_ambiguous() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[1], &[Some("a")]));
    let new = frame(&ctx, people(&[1], &[Some("a")]));
    let err = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(Vec::<String>::new()))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code, ErrorCode::AmbiguousPrimaryKey);
}

#[tokio::test]
async fn persisting_twice_is_idempotent() {
    let ctx = SessionContext::new();
    let upserter = Upserter::new(ctx.clone());
    let sink = MemorySink::new("public.people");
    let options = UpsertOptions::new(["id"]);
    let new = people(&[2, 3], &[Some("B"), None]);

    let first = upserter
        .reconcile_and_persist(
            frame(&ctx, people(&[1, 2], &[Some("a"), Some("b")])),
            frame(&ctx, new.clone()),
            &options,
            Arc::new(sink.clone()),
        )
        .await
        .unwrap();
    assert_eq!(first.table, "public.people");
    assert_eq!(first.rows_written, Some(2));
    assert_eq!(first.stats.dropped, 1);

    let written = sink.read(&ctx).unwrap();
    let second = upserter
        .reconcile_and_persist(written, frame(&ctx, new), &options, Arc::new(sink.clone()))
        .await
        .unwrap();
    assert_eq!(
        second.stats,
        ReconcileStats {
            inserted: 0,
            updated: 0,
            unchanged: 2,
            dropped: 0,
        }
    );
    let (_, batches) = sink.contents().unwrap();
    assert_eq!(
        rows(&batches, "name"),
        vec![row(2, Some("B")), row(3, None)]
    );
}

#[tokio::test]
async fn null_keys_never_match() {
    let ctx = SessionContext::new();
    let upserter = Upserter::new(ctx.clone());
    let sink = MemorySink::new("public.people");
    let options = UpsertOptions::new(["id"]);
    let with_null_key = || {
        batch(vec![
            ("id", Arc::new(Int64Array::from(vec![None, Some(1)])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
        ])
    };

    let first = upserter
        .reconcile_and_persist(
            frame(&ctx, with_null_key()),
            frame(&ctx, with_null_key()),
            &options,
            Arc::new(sink.clone()),
        )
        .await
        .unwrap();
    let expected = ReconcileStats {
        inserted: 1,
        updated: 0,
        unchanged: 1,
        dropped: 1,
    };
    assert_eq!(first.stats, expected);
    assert_eq!(first.rows_written, Some(2));

    // The NULL-keyed row written by the first run still does not match.
    let second = upserter
        .reconcile_and_persist(
            sink.read(&ctx).unwrap(),
            frame(&ctx, with_null_key()),
            &options,
            Arc::new(sink.clone()),
        )
        .await
        .unwrap();
    assert_eq!(second.stats, expected);

    let (_, batches) = sink.contents().unwrap();
    let null_keys = batches
        .iter()
        .map(|b| b.column_by_name("id").unwrap().null_count())
        .sum::<usize>();
    assert_eq!(null_keys, 1);
}

#[tokio::test]
async fn empty_current_inserts_everything() {
    let ctx = SessionContext::new();
    let current = frame(&ctx, people(&[], &[]));
    let new = frame(&ctx, people(&[1, 2], &[Some("a"), Some("b")]));

    let result = Upserter::new(ctx)
        .reconcile(current, new, &UpsertOptions::new(["id"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(result.stats.inserted, 2);
    assert_eq!(result.num_rows(), 2);
}

struct RejectingSink;

impl TableSink for RejectingSink {
    fn table(&self) -> String {
        "public.locked".to_string()
    }

    fn overwrite(&self, _: SchemaRef, _: Vec<RecordBatch>) -> UpsertResult<Option<i64>> {
        err!(ErrorCode::ConnectionError, "permission denied for table locked")
    }
}

#[tokio::test]
async fn sink_failures_propagate() {
    let ctx = SessionContext::new();
    let err = Upserter::new(ctx.clone())
        .reconcile_and_persist(
            frame(&ctx, people(&[1], &[Some("a")])),
            frame(&ctx, people(&[1], &[Some("b")])),
            &UpsertOptions::new(["id"]),
            Arc::new(RejectingSink),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConnectionError);
    assert_eq!(err.to_string(), "permission denied for table locked");
}
