use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::err::{ConnectorError, Result};

/// Metadata of a table column as reported by the data source
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// The backend's own type name eg `nvarchar`
    pub native_type: String,
    pub max_length: Option<u32>,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnMetadata {
    pub fn new(
        name: impl Into<String>,
        native_type: impl Into<String>,
        max_length: Option<u32>,
        nullable: bool,
        is_primary_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            max_length,
            nullable,
            is_primary_key,
        }
    }

    /// A nullable, non-key column
    pub fn minimal(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self::new(name, native_type, None, true, false)
    }

    pub fn primary_key(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self::new(name, native_type, None, false, true)
    }
}

/// Known columns of the tables touched by a request
///
/// Table and column names are matched case-insensitively.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ColumnCatalog {
    tables: HashMap<String, Vec<ColumnMetadata>>,
}

impl ColumnCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: impl Into<String>, columns: Vec<ColumnMetadata>) {
        self.tables.insert(table.into().to_lowercase(), columns);
    }

    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<ColumnMetadata>) -> Self {
        self.add(table, columns);
        self
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_lowercase())
    }

    /// Gets the columns of the table, if known
    pub fn columns(&self, table: &str) -> Option<&Vec<ColumnMetadata>> {
        self.tables.get(&table.to_lowercase())
    }

    /// Looks up a column.
    ///
    /// Returns `None` if the table is unknown and fails if the table
    /// is known but does not have the column.
    pub fn find(&self, table: &str, column: &str) -> Result<Option<&ColumnMetadata>> {
        let cols = match self.columns(table) {
            Some(cols) => cols,
            None => return Ok(None),
        };

        match cols.iter().find(|c| c.name.eq_ignore_ascii_case(column)) {
            Some(col) => Ok(Some(col)),
            None => Err(ConnectorError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            }
            .into()),
        }
    }

    /// Gets the primary key columns of the table in declaration order
    pub fn primary_keys(&self, table: &str) -> Vec<&ColumnMetadata> {
        self.columns(table)
            .map(|cols| cols.iter().filter(|c| c.is_primary_key).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mock_catalog() -> ColumnCatalog {
        ColumnCatalog::new().with_table(
            "Contacts",
            vec![
                ColumnMetadata::primary_key("Id", "int"),
                ColumnMetadata::minimal("Name", "nvarchar"),
            ],
        )
    }

    #[test]
    fn test_column_catalog_find() {
        let catalog = mock_catalog();

        assert_eq!(
            catalog.find("contacts", "NAME").unwrap(),
            Some(&ColumnMetadata::minimal("Name", "nvarchar"))
        );
        assert_eq!(catalog.find("Unknown", "Name").unwrap(), None);
    }

    #[test]
    fn test_column_catalog_find_missing_column() {
        let err = mock_catalog().find("Contacts", "Phone").unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConnectorError>(),
            Some(&ConnectorError::ColumnNotFound {
                table: "Contacts".into(),
                column: "Phone".into()
            })
        );
    }

    #[test]
    fn test_column_catalog_primary_keys() {
        let catalog = mock_catalog();

        assert_eq!(
            catalog.primary_keys("Contacts"),
            vec![&ColumnMetadata::primary_key("Id", "int")]
        );
        assert!(catalog.primary_keys("Other").is_empty());
    }
}
