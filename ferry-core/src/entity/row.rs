use serde::{Deserialize, Serialize};

use crate::{data::DataValue, filter::FilterExpr};

/// A row returned by a data source, in column order
pub type Row = Vec<(String, DataValue)>;

/// A single row to be written to a table
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RowChangeRequest {
    /// The target table
    pub entity: String,
    /// Column values in the order they are written, nulls are explicit
    pub values: Vec<(String, DataValue)>,
    /// Selects the rows targeted by updates, deletes and upserts
    pub lookup: Option<FilterExpr>,
}

impl RowChangeRequest {
    pub fn new(entity: impl Into<String>, values: Vec<(&str, DataValue)>) -> Self {
        Self {
            entity: entity.into(),
            values: values
                .into_iter()
                .map(|(c, v)| (c.to_string(), v))
                .collect(),
            lookup: None,
        }
    }

    pub fn with_lookup(mut self, lookup: FilterExpr) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Gets the value supplied for the column, if any
    pub fn value(&self, column: &str) -> Option<&DataValue> {
        self.values
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }
}
