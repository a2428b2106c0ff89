//! Reconciliation of Current and New by primary key.
//!
//! Both inputs are renamed with a side prefix, tagged with a presence marker
//! and full-outer joined on the primary key. Each joined row then falls in
//! exactly one bucket:
//!
//! | in New | in Current | compared columns | bucket    | values from |
//! |--------|------------|------------------|-----------|-------------|
//! | yes    | no         |                  | inserted  | New         |
//! | yes    | yes        | some differ      | updated   | New         |
//! | yes    | yes        | all equal        | unchanged | Current     |
//! | no     | yes        |                  | dropped   |             |
//!
//! Keys found only in Current are dropped: the destination is overwritten
//! with the result, so those records disappear from it.
//!
//! Key columns are joined with `=`, so a key containing NULL never matches
//! and the row is classified as inserted.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::common::JoinType;
use datafusion::logical_expr::{Expr, Operator, binary_expr, cast, ident, lit};
use datafusion::prelude::{DataFrame, SessionContext};
use upsert_error::{ErrorCode, UpsertResult, err};

use crate::options::{NullEquality, UpsertOptions};
use crate::schema::{self, ResolvedColumns};
use crate::stats::{Action, ReconcileStats};

/// Name of the column carrying the [Action] label in [Reconciled::tagged].
pub const ACTION_COLUMN: &str = "__upsert_action";

const NEW_PREFIX: &str = "__new__";
const CURRENT_PREFIX: &str = "__cur__";
const IN_NEW: &str = "__upsert_in_new";
const IN_CURRENT: &str = "__upsert_in_current";

fn side_column(prefix: &str, name: &str) -> String {
    format!("{prefix}{name}")
}

/// Reconciles datasets within one DataFusion session.
///
/// Input frames are rebound to the session given here, so its configuration
/// (batch size, target partitions, memory limits) governs execution.
#[derive(Clone)]
pub struct Upserter {
    ctx: SessionContext,
}

impl Upserter {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    fn adopt(&self, df: DataFrame) -> DataFrame {
        DataFrame::new(self.ctx.state(), df.into_unoptimized_plan())
    }

    /// Builds the reconciled dataset of `current` and `new`.
    ///
    /// Fails with [ErrorCode::SchemaMismatch] when a key, compared or output
    /// column is missing from either side, and with
    /// [ErrorCode::AmbiguousPrimaryKey] when the key is empty or (if
    /// [UpsertOptions::check_unique_keys] is set) not unique. Nothing is
    /// executed except the uniqueness check; the returned frames are lazy.
    pub async fn reconcile(
        &self,
        current: DataFrame,
        new: DataFrame,
        options: &UpsertOptions,
    ) -> UpsertResult<Reconciled> {
        let _span = tracy_client::span!("reconcile");
        let current = self.adopt(current);
        let new = self.adopt(new);
        let columns = schema::resolve(current.schema().as_arrow(), new.schema().as_arrow(), options)?;
        tracing::debug!(
            keys = ?columns.keys,
            compare = ?columns.compare,
            null_equality = ?options.null_equality,
            "resolved reconciliation columns"
        );

        if options.check_unique_keys {
            ensure_unique_keys(&current, &columns.keys, "current").await?;
            ensure_unique_keys(&new, &columns.keys, "new").await?;
        }

        let new_side = with_side_names(new, NEW_PREFIX, IN_NEW)?;
        let current_side = with_side_names(current, CURRENT_PREFIX, IN_CURRENT)?;
        let on = columns
            .keys
            .iter()
            .map(|k| ident(side_column(NEW_PREFIX, k)).eq(ident(side_column(CURRENT_PREFIX, k))))
            .collect::<Vec<_>>();
        let joined = new_side.join_on(current_side, JoinType::Full, on)?;

        let in_new = ident(IN_NEW).is_not_null();
        let in_current = ident(IN_CURRENT).is_not_null();
        let in_both = in_new.clone().and(in_current.clone());
        let changed = change_predicate(&columns.compare, options.null_equality);

        let inserted = joined
            .clone()
            .filter(in_new.and(ident(IN_CURRENT).is_null()))?;
        let updated = joined.clone().filter(in_both.clone().and(changed.clone()))?;
        let unchanged = joined.clone().filter(in_both.and(!changed))?;
        let dropped = joined.filter(ident(IN_NEW).is_null().and(in_current))?;

        let tagged = project(inserted, &columns, Action::Inserted)?
            .union(project(updated, &columns, Action::Updated)?)?
            .union(project(unchanged, &columns, Action::Unchanged)?)?;

        Ok(Reconciled {
            tagged,
            dropped,
            columns: columns.output.into_iter().map(|c| c.name).collect(),
        })
    }
}

/// Fails unless every row of `df` has a distinct primary key.
async fn ensure_unique_keys(df: &DataFrame, keys: &[String], side: &str) -> UpsertResult<()> {
    let rows = df.clone().count().await?;
    let distinct = df
        .clone()
        .select(keys.iter().map(ident).collect::<Vec<_>>())?
        .distinct()?
        .count()
        .await?;
    if distinct != rows {
        return err!(
            ErrorCode::AmbiguousPrimaryKey,
            "The {side} dataset has {} rows sharing a primary key ({}) with another row",
            rows - distinct,
            keys.join(", ")
        );
    }
    Ok(())
}

/// Renames every column to `prefix + name` and adds a non-null marker column.
fn with_side_names(df: DataFrame, prefix: &str, marker: &str) -> UpsertResult<DataFrame> {
    let mut exprs = df
        .schema()
        .fields()
        .iter()
        .map(|f| ident(f.name()).alias(side_column(prefix, f.name())))
        .collect::<Vec<_>>();
    exprs.push(lit(true).alias(marker));
    Ok(df.select(exprs)?)
}

/// True when at least one compared column differs between the sides.
///
/// Never NULL, so its negation selects exactly the unchanged rows.
fn change_predicate(compare: &[String], null_equality: NullEquality) -> Expr {
    compare
        .iter()
        .map(|c| {
            let new = ident(side_column(NEW_PREFIX, c));
            let current = ident(side_column(CURRENT_PREFIX, c));
            match null_equality {
                NullEquality::NullSafe => binary_expr(new, Operator::IsDistinctFrom, current),
                NullEquality::NeverEqual => new
                    .clone()
                    .not_eq(current.clone())
                    .or(new.is_null())
                    .or(current.is_null()),
            }
        })
        .reduce(Expr::or)
        .unwrap_or_else(|| lit(false))
}

/// Projects one bucket onto New's columns and labels it.
///
/// Unchanged rows take Current's values, cast to New's types where they
/// differ; the other buckets take New's values.
fn project(df: DataFrame, columns: &ResolvedColumns, action: Action) -> UpsertResult<DataFrame> {
    let mut exprs = columns
        .output
        .iter()
        .map(|c| match action {
            Action::Unchanged => {
                let value = ident(side_column(CURRENT_PREFIX, &c.name));
                let value = if c.current_type == c.new_type {
                    value
                } else {
                    cast(value, c.new_type.clone())
                };
                value.alias(&c.name)
            }
            Action::Inserted | Action::Updated => {
                ident(side_column(NEW_PREFIX, &c.name)).alias(&c.name)
            }
        })
        .collect::<Vec<_>>();
    exprs.push(lit(action.as_ref()).alias(ACTION_COLUMN));
    Ok(df.select(exprs)?)
}

/// The lazily evaluated result of [Upserter::reconcile].
#[derive(Clone)]
pub struct Reconciled {
    tagged: DataFrame,
    dropped: DataFrame,
    columns: Vec<String>,
}

/// Materialized reconciliation.
#[derive(Clone, Debug)]
pub struct ReconciledBatches {
    /// New's column names and types, in New's order.
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    pub stats: ReconcileStats,
}

impl ReconciledBatches {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

impl Reconciled {
    /// The reconciled rows plus [ACTION_COLUMN] as the last column.
    pub fn tagged(&self) -> &DataFrame {
        &self.tagged
    }

    /// The reconciled rows with New's columns only.
    pub fn dataframe(&self) -> UpsertResult<DataFrame> {
        Ok(self
            .tagged
            .clone()
            .select(self.columns.iter().map(ident).collect::<Vec<_>>())?)
    }

    /// Keys present only in Current, as they appear after the join.
    pub fn dropped(&self) -> &DataFrame {
        &self.dropped
    }

    /// Executes the reconciliation.
    ///
    /// The action column is tallied into [ReconcileStats] and stripped from
    /// the returned batches.
    pub async fn collect(self) -> UpsertResult<ReconciledBatches> {
        let _span = tracy_client::span!("collect reconciled");
        let action_index = self.columns.len();
        let keep = (0..action_index).collect::<Vec<_>>();
        let schema = Arc::new(self.tagged.schema().as_arrow().project(&keep)?);

        let mut stats = ReconcileStats {
            dropped: self.dropped.count().await?,
            ..Default::default()
        };
        let tagged = self.tagged.collect().await?;
        let mut batches = Vec::with_capacity(tagged.len());
        for batch in tagged {
            stats.record_batch(&batch, action_index)?;
            batches.push(batch.project(&keep)?);
        }
        Ok(ReconciledBatches {
            schema,
            batches,
            stats,
        })
    }
}
