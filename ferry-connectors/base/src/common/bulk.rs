use std::marker::PhantomData;

use ferry_core::{
    data::{DataType, DataValue},
    entity::{ColumnCatalog, Row, RowChangeRequest},
    err::{bail, BackendError, ConnectorError, Context, Error, ErrorInfo, Result},
};
use ferry_logging::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::interface::{QueryCompiler, Statement, StatementExecutor};

use super::context::{CompileContext, CompileOptions};

/// The kinds of bulk mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkOperation {
    Insert,
    Update,
    Delete,
    Upsert,
}

/// Per-row outcomes of a bulk operation, index-aligned with the input rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkResult {
    pub success: Vec<bool>,
    pub affected: Vec<u64>,
    /// A row can succeed and still carry an informational error
    pub errors: Vec<Option<ErrorInfo>>,
}

impl BulkResult {
    pub fn with_capacity(len: usize) -> Self {
        Self {
            success: Vec::with_capacity(len),
            affected: Vec::with_capacity(len),
            errors: Vec::with_capacity(len),
        }
    }

    fn push(&mut self, success: bool, affected: u64, error: Option<ErrorInfo>) {
        self.success.push(success);
        self.affected.push(affected);
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.success.len()
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty()
    }
}

/// Reads the result of a `SELECT COUNT(*)` query
pub fn read_count(mut rows: impl Iterator<Item = Result<Row>>) -> Result<u64> {
    let first = rows.next().context("Count query returned no rows")??;
    let (_, count) = first
        .into_iter()
        .next()
        .context("Count query returned no columns")?;

    match count
        .try_coerce_into(&DataType::UInt64)
        .context("Count query returned an invalid count")?
    {
        DataValue::UInt64(count) => Ok(count),
        other => bail!("Count query returned an unexpected value: {:?}", other),
    }
}

/// Progress of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Pending,
    RowCountChecked(u64),
    Executed(u64),
    Succeeded,
    Failed,
}

/// Executes a statement per row, isolating the failures of each row
pub struct BulkExecutor<'a, TCompiler, TExecutor> {
    executor: &'a mut TExecutor,
    catalog: &'a ColumnCatalog,
    options: CompileOptions,
    allow_multiple: bool,
    _compiler: PhantomData<TCompiler>,
}

impl<'a, TCompiler, TExecutor> BulkExecutor<'a, TCompiler, TExecutor>
where
    TCompiler: QueryCompiler,
    TExecutor: StatementExecutor,
{
    pub fn new(
        executor: &'a mut TExecutor,
        catalog: &'a ColumnCatalog,
        options: CompileOptions,
        allow_multiple: bool,
    ) -> Self {
        Self {
            executor,
            catalog,
            options,
            allow_multiple,
            _compiler: PhantomData,
        }
    }

    /// Executes the operation for each row in order.
    ///
    /// Row failures are reported in the result, only a failure which leaves
    /// the connection unusable aborts the batch.
    pub fn execute(&mut self, op: BulkOperation, rows: &[RowChangeRequest]) -> Result<BulkResult> {
        let mut result = BulkResult::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            trace!("Row {}: {:?}", idx, RowState::Pending);

            match self.execute_row(op, idx, row) {
                Ok(affected) => {
                    let (success, error) = self.evaluate(affected);
                    let state = if success {
                        RowState::Succeeded
                    } else {
                        RowState::Failed
                    };
                    trace!("Row {}: {:?}", idx, state);
                    result.push(success, affected, error);
                }
                Err(err) => {
                    if Self::is_fatal(&err) {
                        return Err(err.context(format!(
                            "Bulk {:?} aborted at row {} of {}",
                            op,
                            idx,
                            rows.len()
                        )));
                    }

                    let info = Self::classify(&err);
                    warn!("{:?} of row {} failed: {}", op, idx, info.message);
                    trace!("Row {}: {:?}", idx, RowState::Failed);
                    result.push(false, 0, Some(info));
                }
            }
        }

        Ok(result)
    }

    fn execute_row(&mut self, op: BulkOperation, idx: usize, row: &RowChangeRequest) -> Result<u64> {
        let ctx = CompileContext::new(self.catalog, &row.entity).with_options(self.options.clone());

        if matches!(op, BulkOperation::Update | BulkOperation::Delete) {
            let count = self.count_rows(row, &ctx)?;
            trace!("Row {}: {:?}", idx, RowState::RowCountChecked(count));

            if count > 1 && !self.allow_multiple {
                return Err(ConnectorError::TooManyRows(count).into());
            }
        }

        let sql = match op {
            BulkOperation::Insert => TCompiler::compile_statement(&Statement::Insert(row), &ctx)?,
            BulkOperation::Update => Self::with_lookup(
                TCompiler::compile_statement(&Statement::Update(row), &ctx)?,
                row,
                &ctx,
            )?,
            BulkOperation::Delete => Self::with_lookup(
                TCompiler::compile_statement(&Statement::Delete(row), &ctx)?,
                row,
                &ctx,
            )?,
            BulkOperation::Upsert => {
                let keys = self
                    .catalog
                    .primary_keys(&row.entity)
                    .into_iter()
                    .map(|c| c.name.clone())
                    .collect::<Vec<_>>();

                if keys.is_empty() {
                    return Err(ConnectorError::ColumnNotFound {
                        table: row.entity.clone(),
                        column: "<primary key>".into(),
                    }
                    .into());
                }

                TCompiler::compile_statement(&Statement::Upsert { row, keys: &keys }, &ctx)?
            }
        };

        let affected = self
            .executor
            .execute_modify(&sql)
            .with_context(|| format!("Failed to execute {:?} of row {}", op, idx))?;
        trace!("Row {}: {:?}", idx, RowState::Executed(affected));

        Ok(affected)
    }

    fn with_lookup(sql: String, row: &RowChangeRequest, ctx: &CompileContext) -> Result<String> {
        let r#where = TCompiler::compile_where(row.lookup.as_ref(), ctx)?;

        Ok(if r#where.is_empty() {
            sql
        } else {
            format!("{} {}", sql, r#where)
        })
    }

    /// Counts the rows matched by the row's lookup condition
    fn count_rows(&mut self, row: &RowChangeRequest, ctx: &CompileContext) -> Result<u64> {
        let sql = TCompiler::compile_statement(
            &Statement::Count {
                table: &row.entity,
                filter: row.lookup.as_ref(),
            },
            ctx,
        )?;

        read_count(self.executor.execute_query(&sql)?)
    }

    /// Determines the outcome of a row from the number of rows it affected
    fn evaluate(&self, affected: u64) -> (bool, Option<ErrorInfo>) {
        if !self.allow_multiple {
            if affected > 1 {
                return (
                    false,
                    Some((&ConnectorError::TooManyRows(affected)).into()),
                );
            }

            return (true, None);
        }

        if affected == 0 {
            return (true, Some((&ConnectorError::NoRowsFound).into()));
        }

        (true, None)
    }

    fn is_fatal(err: &Error) -> bool {
        err.downcast_ref::<BackendError>().map_or(false, |e| e.fatal)
    }

    fn classify(err: &Error) -> ErrorInfo {
        match err.downcast_ref::<BackendError>() {
            Some(backend) if TCompiler::is_duplicate_key(backend) => {
                (&ConnectorError::DuplicateKey(backend.clone())).into()
            }
            _ => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ferry_core::{
        entity::ColumnMetadata,
        err::{anyhow, ErrorKind},
        filter::FilterExpr,
    };
    use pretty_assertions::assert_eq;

    use crate::test::{MockCompiler, MockExecutor};

    use super::*;

    fn count_row(count: i32) -> Vec<(String, DataValue)> {
        vec![("".to_string(), DataValue::Int32(count))]
    }

    fn execute(
        executor: &mut MockExecutor,
        op: BulkOperation,
        rows: &[RowChangeRequest],
        allow_multiple: bool,
    ) -> Result<BulkResult> {
        let catalog = ColumnCatalog::new().with_table(
            "people",
            vec![
                ColumnMetadata::primary_key("id", "int"),
                ColumnMetadata::minimal("name", "text"),
            ],
        );

        BulkExecutor::<MockCompiler, _>::new(
            executor,
            &catalog,
            CompileOptions::default(),
            allow_multiple,
        )
        .execute(op, rows)
    }

    fn person(id: i32) -> RowChangeRequest {
        RowChangeRequest::new(
            "people",
            vec![("id", DataValue::Int32(id)), ("name", DataValue::from("Mary"))],
        )
        .with_lookup(FilterExpr::equals("id", id))
    }

    #[test]
    fn test_read_count() {
        assert_eq!(read_count(vec![Ok(count_row(3))].into_iter()).unwrap(), 3);
        assert_eq!(
            read_count(vec![Ok(vec![("".into(), DataValue::Int64(7))])].into_iter()).unwrap(),
            7
        );
        read_count(Vec::<Result<Row>>::new().into_iter()).unwrap_err();
        read_count(vec![Ok(count_row(-1))].into_iter()).unwrap_err();
    }

    #[test]
    fn test_bulk_insert_success() {
        let mut executor = MockExecutor::new().on_modify(|_| Ok(1));

        let res = execute(&mut executor, BulkOperation::Insert, &[person(1), person(2)], false)
            .unwrap();

        assert_eq!(
            res,
            BulkResult {
                success: vec![true, true],
                affected: vec![1, 1],
                errors: vec![None, None]
            }
        );
        assert_eq!(
            executor.executed(),
            &vec![
                "INSERT INTO `people` (`id`, `name`) VALUES (1, 'Mary')".to_string(),
                "INSERT INTO `people` (`id`, `name`) VALUES (2, 'Mary')".to_string(),
            ]
        );
    }

    #[test]
    fn test_bulk_update_too_many_rows_skips_mutation() {
        let mut executor = MockExecutor::new()
            .on_query(|_| Ok(vec![count_row(2)]))
            .on_modify(|_| Ok(2));

        let res = execute(&mut executor, BulkOperation::Update, &[person(1)], false).unwrap();

        assert_eq!(res.success, vec![false]);
        assert_eq!(res.affected, vec![0]);
        let err = res.errors[0].clone().unwrap();
        assert_eq!(err.kind, ErrorKind::TooManyRows);
        assert!(err.message.contains("2 rows"));
        assert_eq!(
            executor.executed(),
            &vec!["SELECT COUNT(*) FROM `people` WHERE (`id` = 1)".to_string()]
        );
    }

    #[test]
    fn test_bulk_update_multiple_rows_allowed() {
        let mut executor = MockExecutor::new()
            .on_query(|_| Ok(vec![count_row(2)]))
            .on_modify(|_| Ok(2));

        let res = execute(&mut executor, BulkOperation::Update, &[person(1)], true).unwrap();

        assert_eq!(res.success, vec![true]);
        assert_eq!(res.affected, vec![2]);
        assert_eq!(res.errors, vec![None]);
        assert_eq!(
            executor.executed()[1],
            "UPDATE `people` SET `id` = 1, `name` = 'Mary' WHERE (`id` = 1)"
        );
    }

    #[test]
    fn test_bulk_delete_no_rows_found_is_success_with_annotation() {
        let mut executor = MockExecutor::new()
            .on_query(|_| Ok(vec![count_row(0)]))
            .on_modify(|_| Ok(0));

        let res = execute(&mut executor, BulkOperation::Delete, &[person(1)], true).unwrap();

        assert_eq!(res.success, vec![true]);
        assert_eq!(res.affected, vec![0]);
        assert_eq!(res.errors[0].as_ref().unwrap().kind, ErrorKind::NoRowsFound);
    }

    #[test]
    fn test_bulk_delete_no_rows_single_row_mode() {
        let mut executor = MockExecutor::new()
            .on_query(|_| Ok(vec![count_row(0)]))
            .on_modify(|_| Ok(0));

        let res = execute(&mut executor, BulkOperation::Delete, &[person(1)], false).unwrap();

        assert_eq!(res.success, vec![true]);
        assert_eq!(res.errors, vec![None]);
    }

    #[test]
    fn test_bulk_results_stay_aligned_when_rows_fail() {
        let mut executor = MockExecutor::new().on_modify(|sql| {
            if sql.contains("(2, ") {
                Err(BackendError::new(2627, "Violation of PRIMARY KEY constraint").into())
            } else if sql.contains("(3, ") {
                Err(anyhow!("Something unexpected"))
            } else if sql.contains("(6, ") {
                Err(BackendError::new(
                    547,
                    "The INSERT statement conflicted with the FOREIGN KEY constraint",
                )
                .into())
            } else {
                Ok(1)
            }
        });

        let mut bad_value = person(4);
        bad_value.values[0].1 = DataValue::from("not a number");

        let res = execute(
            &mut executor,
            BulkOperation::Insert,
            &[person(1), person(2), person(3), bad_value, person(5), person(6), person(7)],
            false,
        )
        .unwrap();

        assert_eq!(res.len(), 7);
        assert_eq!(res.affected.len(), 7);
        assert_eq!(res.errors.len(), 7);
        assert_eq!(res.success, vec![true, false, false, false, true, false, true]);

        let dup = res.errors[1].as_ref().unwrap();
        assert_eq!(dup.kind, ErrorKind::DuplicateKey);
        assert_eq!(dup.backend_code, Some(2627));

        let generic = res.errors[2].as_ref().unwrap();
        assert_eq!(generic.kind, ErrorKind::Generic);
        assert!(generic.message.contains("Something unexpected"));

        assert_eq!(res.errors[3].as_ref().unwrap().kind, ErrorKind::DataType);
        assert!(res.errors[3].as_ref().unwrap().message.contains("id"));

        let fk = res.errors[5].as_ref().unwrap();
        assert_eq!(fk.kind, ErrorKind::Backend);
        assert_eq!(fk.code, 1010);
        assert_eq!(fk.backend_code, Some(547));
        assert!(fk.message.contains("FOREIGN KEY"));
        assert_eq!(res.errors[6], None);
    }

    #[test]
    fn test_bulk_fatal_backend_error_aborts_batch() {
        let mut executor = MockExecutor::new()
            .on_modify(|_| Err(BackendError::new(-1, "Connection reset").fatal().into()));

        let err = execute(&mut executor, BulkOperation::Insert, &[person(1), person(2)], false)
            .unwrap_err();

        assert!(err.downcast_ref::<BackendError>().unwrap().fatal);
        assert_eq!(executor.executed().len(), 1);
    }

    #[test]
    fn test_bulk_upsert_requires_primary_key() {
        let mut executor = MockExecutor::new().on_modify(|_| Ok(1));
        let row = RowChangeRequest::new("unknown", vec![("a", DataValue::Int32(1))]);

        let res = execute(&mut executor, BulkOperation::Upsert, &[row], false).unwrap();

        assert_eq!(res.success, vec![false]);
        assert_eq!(res.errors[0].as_ref().unwrap().kind, ErrorKind::ColumnNotFound);
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn test_bulk_upsert_keys_from_catalog() {
        let mut executor = MockExecutor::new().on_modify(|_| Ok(1));

        let res = execute(&mut executor, BulkOperation::Upsert, &[person(7)], false).unwrap();

        assert_eq!(res.success, vec![true]);
        assert_eq!(executor.executed(), &vec!["UPSERT `people` ON (`id`)".to_string()]);
    }
}
