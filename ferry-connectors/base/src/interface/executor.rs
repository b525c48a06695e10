use ferry_core::{entity::Row, err::Result};

/// Executes statement text against the data source
///
/// Backend failures are reported as a [`ferry_core::err::BackendError`]
/// wrapped in the returned error.
pub trait StatementExecutor {
    /// Forward-only cursor over the rows of a query
    type TRows: Iterator<Item = Result<Row>>;

    /// Executes a query, returning a cursor over the result rows
    fn execute_query(&mut self, query: &str) -> Result<Self::TRows>;

    /// Executes a statement, returning the number of affected rows
    fn execute_modify(&mut self, query: &str) -> Result<u64>;
}
