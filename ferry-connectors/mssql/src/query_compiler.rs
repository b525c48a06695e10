use ferry_connectors_base::{
    common::context::CompileContext,
    interface::QueryCompiler,
};
use ferry_core::{
    data::{
        chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike},
        DataType, DataValue, StringOptions,
    },
    entity::{ColumnMetadata, RowChangeRequest},
    err::{bail, ensure, BackendError, Context, Result},
    filter::FilterExpr,
};
use itertools::Itertools;

/// Unique constraint and unique index violations
const DUPLICATE_KEY_ERRORS: [i32; 2] = [2627, 2601];

/// Query compiler for SQL Server (T-SQL)
pub struct MssqlQueryCompiler;

impl QueryCompiler for MssqlQueryCompiler {
    fn compile_identifier(id: &str) -> Result<String> {
        if id.contains('[') || id.contains(']') {
            bail!("Invalid identifier: \"{id}\", cannot contain '[' or ']' chars");
        }

        Ok(format!("[{}]", id))
    }

    fn compile_boolean(value: bool) -> String {
        if value { "1" } else { "0" }.into()
    }

    fn compile_binary(value: &[u8]) -> Result<String> {
        Ok(format!(
            "0x{}",
            value.iter().map(|b| format!("{:02X}", b)).join("")
        ))
    }

    fn compile_date(value: NaiveDate) -> Result<String> {
        Ok(format!("CONVERT(DATE, '{}')", value.format("%Y-%m-%d")))
    }

    fn compile_time(value: NaiveTime) -> Result<String> {
        Ok(format!("CONVERT(TIME, '{}')", value.format("%H:%M:%S%.f")))
    }

    fn compile_date_time(value: NaiveDateTime, ctx: &CompileContext) -> Result<String> {
        let formatted = if ctx.options().round_fractional_seconds {
            Self::round_up_to_second(value)?
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        } else {
            value.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
        };

        Ok(format!("CONVERT(DATETIME, '{}')", formatted))
    }

    fn parse_native_type(column: &ColumnMetadata) -> Option<DataType> {
        let native = column.native_type.to_lowercase();
        // eg "nvarchar(50)" or "decimal(10, 2)"
        let name = native.split('(').next().unwrap_or_default().trim();

        Some(match name {
            "char" | "varchar" | "nchar" | "nvarchar" | "text" | "ntext" => {
                DataType::Utf8String(StringOptions::new(column.max_length.filter(|l| *l > 0)))
            }
            "bit" => DataType::Boolean,
            "tinyint" => DataType::UInt8,
            "smallint" => DataType::Int16,
            "int" => DataType::Int32,
            "bigint" => DataType::Int64,
            "decimal" | "numeric" | "money" | "smallmoney" => DataType::Decimal,
            "float" => DataType::Float64,
            "real" => DataType::Float32,
            "binary" | "varbinary" | "image" => DataType::Binary,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "datetime" | "datetime2" | "smalldatetime" => DataType::DateTime,
            "datetimeoffset" => DataType::DateTimeWithTZ,
            "uniqueidentifier" => DataType::Uuid,
            _ => return None,
        })
    }

    fn compile_upsert(row: &RowChangeRequest, keys: &[String], ctx: &CompileContext) -> Result<String> {
        ensure!(
            !keys.is_empty(),
            "Cannot upsert into \"{}\" without key columns",
            row.entity
        );

        // Keys missing from the row match null
        let lookup = FilterExpr::all(keys.iter().map(|key| {
            FilterExpr::equals(
                key.as_str(),
                row.value(key).cloned().unwrap_or(DataValue::Null),
            )
        }));
        let r#where = Self::compile_where(lookup.as_ref(), ctx)?;

        let mut update = RowChangeRequest {
            entity: row.entity.clone(),
            values: row
                .values
                .iter()
                .filter(|(col, _)| !keys.iter().any(|k| k.eq_ignore_ascii_case(col)))
                .cloned()
                .collect(),
            lookup: None,
        };

        // Nothing but keys to write, the update is a no-op which still reports the row
        if update.values.is_empty() {
            update.values = keys
                .iter()
                .map(|k| (k.clone(), row.value(k).cloned().unwrap_or(DataValue::Null)))
                .collect();
        }

        Ok(format!(
            "IF EXISTS (SELECT 1 FROM {} {}) BEGIN {} {} END ELSE BEGIN {} END",
            Self::compile_table_identifier(&row.entity)?,
            r#where,
            Self::compile_update(&update, ctx)?,
            r#where,
            Self::compile_insert(row, ctx)?
        ))
    }

    fn is_duplicate_key(err: &BackendError) -> bool {
        DUPLICATE_KEY_ERRORS.contains(&err.code)
    }
}

impl MssqlQueryCompiler {
    /// Rounds date/times carrying milliseconds up to the next whole second
    fn round_up_to_second(value: NaiveDateTime) -> Result<NaiveDateTime> {
        if value.nanosecond() / 1_000_000 == 0 {
            return Ok(value);
        }

        value
            .with_nanosecond(0)
            .and_then(|v| v.checked_add_signed(Duration::seconds(1)))
            .with_context(|| format!("Failed to round date/time {}", value))
    }
}
