//! Column resolution and validation of the two inputs.

use std::collections::HashSet;

use arrow::datatypes::{DataType, Schema};
use upsert_error::{ErrorCode, UpsertResult, err};

use crate::options::{CompareColumns, UpsertOptions};
use crate::reconcile::ACTION_COLUMN;

/// One column of the reconciled output.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct OutputColumn {
    pub name: String,
    /// Type in New, which is the type written to the destination.
    pub new_type: DataType,
    /// Type in Current, cast to `new_type` for unchanged rows.
    pub current_type: DataType,
}

/// Columns of a reconciliation, resolved against both input schemas.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResolvedColumns {
    pub keys: Vec<String>,
    pub compare: Vec<String>,
    /// New's columns in New's order.
    pub output: Vec<OutputColumn>,
}

fn missing(column: &str, side: &str, role: &str) -> UpsertResult<ResolvedColumns> {
    err!(
        ErrorCode::SchemaMismatch,
        "{role} column '{column}' is missing from the {side} dataset"
    )
}

/// Checks that every referenced column exists on both sides.
///
/// Keys and compared columns must exist in both datasets. Every column of New
/// must also exist in Current, since unchanged rows are projected from
/// Current onto New's shape.
pub(crate) fn resolve(
    current: &Schema,
    new: &Schema,
    options: &UpsertOptions,
) -> UpsertResult<ResolvedColumns> {
    if options.primary_keys.is_empty() {
        return err!(
            ErrorCode::AmbiguousPrimaryKey,
            "Primary key must name at least one column"
        );
    }
    let mut seen = HashSet::new();
    for key in &options.primary_keys {
        if !seen.insert(key.as_str()) {
            return err!(
                ErrorCode::AmbiguousPrimaryKey,
                "Primary key lists column '{key}' more than once"
            );
        }
    }
    for key in &options.primary_keys {
        if new.field_with_name(key).is_err() {
            return missing(key, "new", "Primary key");
        }
        if current.field_with_name(key).is_err() {
            return missing(key, "current", "Primary key");
        }
    }
    if new.field_with_name(ACTION_COLUMN).is_ok() {
        return err!(
            ErrorCode::SchemaMismatch,
            "Column name '{ACTION_COLUMN}' is reserved"
        );
    }

    let is_key = |name: &str| options.primary_keys.iter().any(|k| k == name);
    let compare = match &options.compare {
        CompareColumns::AllShared => new
            .fields()
            .iter()
            .map(|f| f.name())
            .filter(|name| !is_key(name.as_str()) && current.field_with_name(name).is_ok())
            .cloned()
            .collect(),
        CompareColumns::Explicit(columns) => {
            for column in columns {
                if new.field_with_name(column).is_err() {
                    return missing(column, "new", "Compared");
                }
                if current.field_with_name(column).is_err() {
                    return missing(column, "current", "Compared");
                }
            }
            columns.iter().filter(|c| !is_key(c.as_str())).cloned().collect()
        }
    };

    let mut output = Vec::with_capacity(new.fields().len());
    for field in new.fields() {
        let Ok(current_field) = current.field_with_name(field.name()) else {
            return missing(field.name(), "current", "Output");
        };
        output.push(OutputColumn {
            name: field.name().clone(),
            new_type: field.data_type().clone(),
            current_type: current_field.data_type().clone(),
        });
    }

    Ok(ResolvedColumns {
        keys: options.primary_keys.clone(),
        compare,
        output,
    })
}
