use serde::{Deserialize, Serialize};

/// Which non-key columns decide whether a shared key was updated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CompareColumns {
    /// Every non-key column present in both datasets.
    #[default]
    AllShared,
    /// Exactly these columns. Each must exist in both datasets.
    Explicit(Vec<String>),
}

/// How NULLs compare when detecting changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullEquality {
    /// NULL equals NULL and differs from every value (`IS DISTINCT FROM`).
    #[default]
    NullSafe,
    /// A NULL on either side of a compared pair always counts as a change.
    NeverEqual,
}

/// Parameters of a reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Columns that jointly identify a record. Must not be empty.
    pub primary_keys: Vec<String>,
    pub compare: CompareColumns,
    pub null_equality: NullEquality,
    /// Reject inputs whose primary key is not unique. Costs one aggregation
    /// per input.
    pub check_unique_keys: bool,
}

impl UpsertOptions {
    pub fn new<I, S>(primary_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary_keys: primary_keys.into_iter().map(Into::into).collect(),
            compare: CompareColumns::default(),
            null_equality: NullEquality::default(),
            check_unique_keys: true,
        }
    }

    pub fn with_compare_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compare = CompareColumns::Explicit(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_null_equality(mut self, null_equality: NullEquality) -> Self {
        self.null_equality = null_equality;
        self
    }

    pub fn with_check_unique_keys(mut self, check: bool) -> Self {
        self.check_unique_keys = check;
        self
    }
}
