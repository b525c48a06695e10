use ferry_connectors_base::{
    common::{
        bulk::{read_count, BulkExecutor, BulkOperation, BulkResult},
        context::{CompileContext, Qualification},
        hierarchy::{reassemble, HierarchyRows, RelationshipSchema},
    },
    interface::{ColumnMetadataProvider, QueryCompiler, Statement, StatementExecutor},
};
use ferry_core::{
    entity::{ColumnCatalog, EntityDescriptor, RowChangeRequest},
    err::Result,
    filter::FilterExpr,
};
use ferry_logging::{info, warn};
use itertools::Itertools;

mod conf;
pub use conf::*;
mod query_compiler;
pub use query_compiler::*;

/// The connector for SQL Server
///
/// Statements are executed through the supplied executor, column metadata
/// is fetched once per table and cached for the life of the connector.
pub struct MssqlConnector<TExecutor, TMetadata> {
    executor: TExecutor,
    metadata: TMetadata,
    options: MssqlConnectorOptions,
    catalog: ColumnCatalog,
}

impl<TExecutor, TMetadata> MssqlConnector<TExecutor, TMetadata>
where
    TExecutor: StatementExecutor,
    TMetadata: ColumnMetadataProvider,
{
    pub const TYPE: &'static str = "mssql";

    pub fn new(executor: TExecutor, metadata: TMetadata, options: MssqlConnectorOptions) -> Self {
        Self {
            executor,
            metadata,
            options,
            catalog: ColumnCatalog::new(),
        }
    }

    pub fn options(&self) -> &MssqlConnectorOptions {
        &self.options
    }

    pub fn executor(&self) -> &TExecutor {
        &self.executor
    }

    pub fn metadata(&self) -> &TMetadata {
        &self.metadata
    }

    /// Compiles a filter over the table into a T-SQL condition
    pub fn compile_filter(&mut self, table: &str, filter: Option<&FilterExpr>) -> Result<String> {
        self.metadata.load_tables(&mut self.catalog, [table])?;
        let ctx = CompileContext::new(&self.catalog, table)
            .with_options(self.options.compile_options())
            .with_qualification(Qualification::AsWritten);

        MssqlQueryCompiler::compile_filter(filter, &ctx)
    }

    /// Reads the entity and its relationships.
    ///
    /// Rows are reassembled into hierarchical entities as they are read.
    pub fn query(
        &mut self,
        entity: &EntityDescriptor,
        filter: Option<&FilterExpr>,
    ) -> Result<HierarchyRows<TExecutor::TRows>> {
        self.metadata.load_tables(
            &mut self.catalog,
            std::iter::once(entity.table.as_str())
                .chain(entity.relationships.iter().map(|r| r.child.table.as_str())),
        )?;

        let ctx = CompileContext::for_select(&self.catalog, entity)?
            .with_options(self.options.compile_options());
        let sql = MssqlQueryCompiler::compile_statement(&Statement::Select { entity, filter }, &ctx)?;

        let rows = self.executor.execute_query(&sql)?;

        Ok(reassemble(rows, &RelationshipSchema::from_entity(entity)))
    }

    /// Counts the rows of the table matching the filter
    pub fn count(&mut self, table: &str, filter: Option<&FilterExpr>) -> Result<u64> {
        self.metadata.load_tables(&mut self.catalog, [table])?;
        let ctx = CompileContext::new(&self.catalog, table)
            .with_options(self.options.compile_options());
        let sql = MssqlQueryCompiler::compile_statement(&Statement::Count { table, filter }, &ctx)?;

        read_count(self.executor.execute_query(&sql)?)
    }

    pub fn insert(&mut self, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        self.execute_bulk(BulkOperation::Insert, rows)
    }

    pub fn update(&mut self, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        self.execute_bulk(BulkOperation::Update, rows)
    }

    pub fn delete(&mut self, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        self.execute_bulk(BulkOperation::Delete, rows)
    }

    /// Inserts rows which do not exist and updates those which do, matched on the primary key
    pub fn upsert(&mut self, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        self.execute_bulk(BulkOperation::Upsert, rows)
    }

    /// Executes the operation for each row, reporting the outcome per row
    pub fn execute_bulk(&mut self, op: BulkOperation, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        // Rows of tables without metadata are compiled untyped and fail individually
        for table in rows.iter().map(|r| r.entity.as_str()).unique() {
            if let Err(err) = self.metadata.load_tables(&mut self.catalog, [table]) {
                warn!("{:?}", err);
            }
        }

        let result = BulkExecutor::<MssqlQueryCompiler, _>::new(
            &mut self.executor,
            &self.catalog,
            self.options.compile_options(),
            self.options.allow_multiple_rows,
        )
        .execute(op, rows)?;

        info!(
            "Bulk {:?} of {} rows completed, {} succeeded",
            op,
            rows.len(),
            result.success.iter().filter(|s| **s).count()
        );

        Ok(result)
    }
}
