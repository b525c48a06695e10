use ferry_core::{
    data::{
        chrono::{NaiveDate, NaiveDateTime, NaiveTime},
        DataType, DataValue,
    },
    entity::{ColumnMetadata, EntityDescriptor, RelationshipDescriptor, RowChangeRequest, SortDirection},
    err::{bail, ensure, BackendError, ConnectorError, Context, Result},
    filter::{ComparisonExpr, ComparisonOperator, FilterExpr, LogicalExpr, LogicalOperator, Operand},
};
use ferry_logging::{debug, MaxLogLength};
use itertools::Itertools;

use crate::common::context::{CompileContext, Qualification, SourceRef};

use super::Statement;

/// The result of mapping a comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedOperator {
    /// The operator after rewriting null comparisons
    pub operator: ComparisonOperator,
    pub token: &'static str,
    pub has_right_operand: bool,
}

/// Compiles filters and statements into a backend's query language.
///
/// Dialects implement the literal and identifier hooks; the statement
/// structure is shared through the provided methods.
pub trait QueryCompiler {
    /// Quotes a single identifier
    fn compile_identifier(id: &str) -> Result<String>;

    fn compile_boolean(value: bool) -> String;

    fn compile_binary(value: &[u8]) -> Result<String>;

    fn compile_date(value: NaiveDate) -> Result<String>;

    fn compile_time(value: NaiveTime) -> Result<String>;

    /// Renders a date/time literal, the value is in UTC
    fn compile_date_time(value: NaiveDateTime, ctx: &CompileContext) -> Result<String>;

    /// Maps a column's native type to the type its values are coerced into.
    /// Returns `None` for types without a mapping, their values are left as supplied.
    fn parse_native_type(column: &ColumnMetadata) -> Option<DataType>;

    /// Compiles an insert-or-update keyed on the supplied columns
    fn compile_upsert(row: &RowChangeRequest, keys: &[String], ctx: &CompileContext)
        -> Result<String>;

    /// Whether the backend error reports a unique constraint violation
    fn is_duplicate_key(_err: &BackendError) -> bool {
        false
    }

    fn compile_string(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Gets the token for the operator
    fn compile_operator_token(op: ComparisonOperator) -> Result<&'static str> {
        Ok(match op {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::NotLike => "NOT LIKE",
            ComparisonOperator::IsNull => "IS NULL",
            ComparisonOperator::IsNotNull => "IS NOT NULL",
            op => return Err(ConnectorError::UnsupportedOperator(op.to_string()).into()),
        })
    }

    /// Maps the operator to its token, comparing to null with `=` or `<>`
    /// becomes `IS NULL` or `IS NOT NULL`.
    fn map_operator(op: ComparisonOperator, right: Option<&Operand>) -> Result<MappedOperator> {
        let right_is_null = right.map_or(true, |r| r.is_null());

        let operator = match op {
            ComparisonOperator::Equal if right_is_null => ComparisonOperator::IsNull,
            ComparisonOperator::NotEqual if right_is_null => ComparisonOperator::IsNotNull,
            op if right_is_null && !op.is_unary() => {
                return Err(ConnectorError::NullOperatorNotValid(op.to_string()).into())
            }
            op => op,
        };

        Ok(MappedOperator {
            operator,
            token: Self::compile_operator_token(operator)?,
            has_right_operand: !operator.is_unary(),
        })
    }

    /// Quotes each segment of a table name eg `dbo.Contacts`
    fn compile_table_identifier(table: &str) -> Result<String> {
        Ok(table
            .split('.')
            .map(Self::compile_identifier)
            .collect::<Result<Vec<_>>>()?
            .join("."))
    }

    fn compile_source_qualifier(source: &SourceRef) -> Result<String> {
        match &source.alias {
            Some(alias) => Self::compile_identifier(alias),
            None => Self::compile_table_identifier(&source.table),
        }
    }

    /// Compiles a table reference, with its alias if it has one
    fn compile_source(source: &SourceRef) -> Result<String> {
        let table = Self::compile_table_identifier(&source.table)?;

        Ok(match &source.alias {
            Some(alias) => format!("{} AS {}", table, Self::compile_identifier(alias)?),
            None => table,
        })
    }

    fn compile_property(reference: &str, ctx: &CompileContext) -> Result<String> {
        let property = ctx.resolve(reference);
        let column = Self::compile_identifier(property.column)?;

        Ok(match &property.qualifier {
            Some(source) => format!("{}.{}", Self::compile_source_qualifier(source)?, column),
            None => column,
        })
    }

    /// Formats a constant, coercing it into the type of the column if known
    fn compile_constant(
        value: &DataValue,
        column: Option<&ColumnMetadata>,
        ctx: &CompileContext,
    ) -> Result<String> {
        let r#type = column.and_then(|c| Self::parse_native_type(c).map(|t| (c, t)));

        match r#type {
            Some((column, r#type)) if !value.is_null() => {
                let coerced = value.clone().try_coerce_into(&r#type).map_err(|err| {
                    ConnectorError::DataType {
                        column: column.name.clone(),
                        message: err.to_string(),
                    }
                })?;

                Self::compile_value(&coerced, ctx)
            }
            _ => Self::compile_value(value, ctx),
        }
    }

    fn compile_value(value: &DataValue, ctx: &CompileContext) -> Result<String> {
        Ok(match value {
            DataValue::Null => "NULL".into(),
            DataValue::Utf8String(s) | DataValue::JSON(s) => Self::compile_string(s),
            DataValue::Binary(b) => Self::compile_binary(b)?,
            DataValue::Boolean(b) => Self::compile_boolean(*b),
            DataValue::Int8(_)
            | DataValue::UInt8(_)
            | DataValue::Int16(_)
            | DataValue::UInt16(_)
            | DataValue::Int32(_)
            | DataValue::UInt32(_)
            | DataValue::Int64(_)
            | DataValue::UInt64(_)
            | DataValue::Decimal(_) => value.to_string(),
            DataValue::Float32(f) if f.is_finite() => value.to_string(),
            DataValue::Float64(f) if f.is_finite() => value.to_string(),
            DataValue::Float32(_) | DataValue::Float64(_) => {
                return Err(ConnectorError::UnsupportedType(format!(
                    "non-finite float {}",
                    value
                ))
                .into())
            }
            DataValue::Date(d) => Self::compile_date(*d)?,
            DataValue::Time(t) => Self::compile_time(*t)?,
            DataValue::DateTime(dt) => Self::compile_date_time(*dt, ctx)?,
            DataValue::DateTimeWithTZ(dt) => Self::compile_date_time(dt.to_utc()?, ctx)?,
            DataValue::Uuid(u) => Self::compile_string(&u.to_string()),
        })
    }

    /// Compiles the filter, an absent filter compiles to an empty string
    fn compile_filter(filter: Option<&FilterExpr>, ctx: &CompileContext) -> Result<String> {
        match filter {
            Some(expr) => Self::compile_expr(expr, ctx),
            None => Ok("".into()),
        }
    }

    fn compile_expr(expr: &FilterExpr, ctx: &CompileContext) -> Result<String> {
        match expr {
            FilterExpr::Comparison(c) => Self::compile_comparison(c, ctx),
            FilterExpr::Logical(l) => Self::compile_logical(l, ctx),
        }
    }

    fn compile_comparison(cmp: &ComparisonExpr, ctx: &CompileContext) -> Result<String> {
        let op = Self::map_operator(cmp.operator, cmp.right.as_ref())?;
        let left = Self::compile_operand(&cmp.left, None, ctx)?;

        if !op.has_right_operand {
            return Ok(format!("({} {})", left, op.token));
        }

        let right = cmp
            .right
            .as_ref()
            .context("Comparison is missing its right operand")?;

        // Patterns are compared as text whatever the column type
        let pattern = matches!(
            op.operator,
            ComparisonOperator::Like | ComparisonOperator::NotLike
        );

        let hint = match (&cmp.left, right) {
            (Operand::Property(reference), Operand::Constant(_)) if !pattern => {
                ctx.column(&ctx.resolve(reference))?
            }
            _ => None,
        };

        Ok(format!(
            "({} {} {})",
            left,
            op.token,
            Self::compile_operand(right, hint, ctx)?
        ))
    }

    fn compile_logical(logical: &LogicalExpr, ctx: &CompileContext) -> Result<String> {
        let op = match logical.operator {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            op => return Err(ConnectorError::UnsupportedLogicalOperator(op.to_string()).into()),
        };

        let right = logical
            .right
            .as_ref()
            .with_context(|| format!("\"{}\" expression is missing its right operand", op))?;

        Ok(format!(
            "({} {} {})",
            Self::compile_expr(&logical.left, ctx)?,
            op,
            Self::compile_expr(right, ctx)?
        ))
    }

    fn compile_operand(
        operand: &Operand,
        column: Option<&ColumnMetadata>,
        ctx: &CompileContext,
    ) -> Result<String> {
        match operand {
            Operand::Property(reference) => Self::compile_property(reference, ctx),
            Operand::Constant(value) => Self::compile_constant(value, column, ctx),
        }
    }

    /// Compiles the `WHERE` clause, empty if there is no filter
    fn compile_where(filter: Option<&FilterExpr>, ctx: &CompileContext) -> Result<String> {
        let clause = Self::compile_filter(filter, ctx)?;

        Ok(if clause.is_empty() {
            clause
        } else {
            format!("WHERE {}", clause)
        })
    }

    /// Compiles any statement
    fn compile_statement(statement: &Statement, ctx: &CompileContext) -> Result<String> {
        let sql = match *statement {
            Statement::Select { entity, filter } => Self::compile_select(entity, filter, ctx),
            Statement::Insert(row) => Self::compile_insert(row, ctx),
            Statement::Update(row) => Self::compile_update(row, ctx),
            Statement::Delete(row) => Self::compile_delete(row, ctx),
            Statement::Count { table, filter } => Self::compile_count(table, filter, ctx),
            Statement::Upsert { row, keys } => Self::compile_upsert(row, keys, ctx),
        }?;

        debug!("Compiled statement: {:?}", MaxLogLength::new(Some(1000), &sql));

        Ok(sql)
    }

    /// Compiles a select of the entity and its relationships.
    ///
    /// Child columns are labelled `relationship.table.column` so rows can be
    /// reassembled into a hierarchy.
    fn compile_select(
        entity: &EntityDescriptor,
        filter: Option<&FilterExpr>,
        ctx: &CompileContext,
    ) -> Result<String> {
        let root = ctx.root();

        let query = [
            "SELECT".to_string(),
            Self::compile_select_cols(entity, ctx)?,
            format!("FROM {}", Self::compile_source(&root)?),
            Self::compile_select_joins(entity, ctx)?,
            Self::compile_where(filter, ctx)?,
            Self::compile_order_by(entity, ctx)?,
        ]
        .into_iter()
        .filter(|i| !i.is_empty())
        .join(" ");

        Ok(query)
    }

    fn compile_select_cols(entity: &EntityDescriptor, ctx: &CompileContext) -> Result<String> {
        let root = ctx.root();
        let qualified = ctx.qualification() == Qualification::Full;
        let mut cols = vec![];

        if entity.columns.is_empty() {
            cols.push(if qualified {
                format!("{}.*", Self::compile_source_qualifier(&root)?)
            } else {
                "*".to_string()
            });
        }

        for col in entity.columns.iter() {
            let col = Self::compile_identifier(col)?;
            cols.push(if qualified {
                format!("{}.{}", Self::compile_source_qualifier(&root)?, col)
            } else {
                col
            });
        }

        for rel in entity.relationships.iter() {
            let source = Self::relationship_source(rel, ctx)?;
            let qualifier = Self::compile_source_qualifier(&source)?;
            let table = rel
                .child
                .table
                .rsplit('.')
                .next()
                .unwrap_or(&rel.child.table);

            let mut child_cols: Vec<String> = if rel.child.columns.is_empty() {
                ctx.catalog()
                    .columns(&rel.child.table)
                    .with_context(|| {
                        format!(
                            "Columns of relationship \"{}\" must be listed when the columns of \"{}\" are unknown",
                            rel.name, rel.child.table
                        )
                    })?
                    .iter()
                    .map(|c| c.name.clone())
                    .collect()
            } else {
                rel.child.columns.clone()
            };

            // Child keys are always read, reassembly prunes unmatched joins on them
            for key in rel.child_keys.iter() {
                if !child_cols.iter().any(|c| c.eq_ignore_ascii_case(key)) {
                    child_cols.push(key.clone());
                }
            }

            for col in child_cols {
                cols.push(format!(
                    "{}.{} AS {}",
                    qualifier,
                    Self::compile_identifier(&col)?,
                    Self::compile_identifier(&format!("{}.{}.{}", rel.name, table, col))?
                ));
            }
        }

        Ok(cols.join(", "))
    }

    fn relationship_source(rel: &RelationshipDescriptor, ctx: &CompileContext) -> Result<SourceRef> {
        ctx.source(&rel.name)
            .cloned()
            .with_context(|| format!("Relationship \"{}\" is not part of the query", rel.name))
    }

    fn compile_select_joins(entity: &EntityDescriptor, ctx: &CompileContext) -> Result<String> {
        let parent = Self::compile_source_qualifier(&ctx.root())?;

        Ok(entity
            .relationships
            .iter()
            .map(|rel| {
                ensure!(
                    !rel.parent_keys.is_empty() && rel.parent_keys.len() == rel.child_keys.len(),
                    "Relationship \"{}\" must join on an equal number of parent and child keys",
                    rel.name
                );

                let source = Self::relationship_source(rel, ctx)?;
                let child = Self::compile_source_qualifier(&source)?;

                let cond = rel
                    .parent_keys
                    .iter()
                    .zip(rel.child_keys.iter())
                    .map(|(p, c)| {
                        Ok(format!(
                            "{}.{} = {}.{}",
                            parent,
                            Self::compile_identifier(p)?,
                            child,
                            Self::compile_identifier(c)?
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(" AND ");

                Ok(format!("LEFT JOIN {} ON {}", Self::compile_source(&source)?, cond))
            })
            .collect::<Result<Vec<_>>>()?
            .join(" "))
    }

    fn compile_order_by(entity: &EntityDescriptor, ctx: &CompileContext) -> Result<String> {
        if entity.order_by.is_empty() {
            return Ok("".into());
        }

        let clauses = entity
            .order_by
            .iter()
            .map(|key| {
                Ok(format!(
                    "{} {}",
                    Self::compile_property(&key.column, ctx)?,
                    match key.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    }
                ))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");

        Ok(format!("ORDER BY {}", clauses))
    }

    /// Compiles the values of the row, coerced into their column types
    fn compile_row_values(row: &RowChangeRequest, ctx: &CompileContext) -> Result<Vec<(String, String)>> {
        row.values
            .iter()
            .map(|(col, value)| {
                let column = ctx.catalog().find(&row.entity, col)?;

                Ok((
                    Self::compile_identifier(col)?,
                    Self::compile_constant(value, column, ctx)?,
                ))
            })
            .collect()
    }

    fn compile_insert(row: &RowChangeRequest, ctx: &CompileContext) -> Result<String> {
        let table = Self::compile_table_identifier(&row.entity)?;
        let values = Self::compile_row_values(row, ctx)?;

        if values.is_empty() {
            return Ok(format!("INSERT INTO {} DEFAULT VALUES", table));
        }

        let (cols, values): (Vec<_>, Vec<_>) = values.into_iter().unzip();

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            values.join(", ")
        ))
    }

    fn compile_update(row: &RowChangeRequest, ctx: &CompileContext) -> Result<String> {
        let values = Self::compile_row_values(row, ctx)?;

        if values.is_empty() {
            bail!("Cannot update \"{}\" without any values", row.entity);
        }

        Ok(format!(
            "UPDATE {} SET {}",
            Self::compile_table_identifier(&row.entity)?,
            values
                .into_iter()
                .map(|(col, val)| format!("{} = {}", col, val))
                .join(", ")
        ))
    }

    fn compile_delete(row: &RowChangeRequest, _ctx: &CompileContext) -> Result<String> {
        Ok(format!(
            "DELETE FROM {}",
            Self::compile_table_identifier(&row.entity)?
        ))
    }

    /// Compiles a count of the rows matching the filter
    fn compile_count(table: &str, filter: Option<&FilterExpr>, ctx: &CompileContext) -> Result<String> {
        Ok([
            format!("SELECT COUNT(*) FROM {}", Self::compile_table_identifier(table)?),
            Self::compile_where(filter, ctx)?,
        ]
        .into_iter()
        .filter(|i| !i.is_empty())
        .join(" "))
    }
}
