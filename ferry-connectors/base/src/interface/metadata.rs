use ferry_core::{
    entity::{ColumnCatalog, ColumnMetadata},
    err::{Context, Result},
};
use ferry_logging::debug;

/// Looks up the columns of tables in the data source
pub trait ColumnMetadataProvider {
    /// Gets the columns of the table in ordinal order
    fn get_columns(&mut self, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Adds the columns of the supplied tables to the catalog.
    /// Tables already in the catalog are not fetched again.
    fn load_tables<'a>(
        &mut self,
        catalog: &mut ColumnCatalog,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Result<()>
    where
        Self: Sized,
    {
        for table in tables {
            if catalog.contains_table(table) {
                continue;
            }

            debug!("Retrieving columns of table \"{}\"", table);
            let cols = self
                .get_columns(table)
                .with_context(|| format!("Failed to retrieve columns of table \"{table}\""))?;
            catalog.add(table, cols);
        }

        Ok(())
    }
}
