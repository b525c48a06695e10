use std::fmt::{self, Display};

use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::err::{Context, Result};

/// Data container for respective types
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, EnumAsInner)]
pub enum DataValue {
    Null,
    Utf8String(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(rust_decimal::Decimal),
    JSON(String),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
    DateTimeWithTZ(DateTimeWithTZ),
    Uuid(uuid::Uuid),
}

/// A local date/time paired with the timezone it was recorded in
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DateTimeWithTZ {
    pub dt: NaiveDateTime,
    pub tz: Tz,
}

impl DateTimeWithTZ {
    pub fn new(dt: NaiveDateTime, tz: Tz) -> Self {
        Self { dt, tz }
    }

    /// Converts the local date/time into UTC
    pub fn to_utc(&self) -> Result<NaiveDateTime> {
        Ok(self
            .tz
            .from_local_datetime(&self.dt)
            .earliest()
            .with_context(|| format!("Invalid local date/time {} in {}", self.dt, self.tz))?
            .with_timezone(&Utc)
            .naive_utc())
    }
}

impl DataValue {
    // `is_null` is generated by the `EnumAsInner` derive

    /// Returns the value widened to an i128 if it is an integer
    pub(crate) fn as_integer(&self) -> Option<i128> {
        Some(match self {
            DataValue::Int8(v) => *v as i128,
            DataValue::UInt8(v) => *v as i128,
            DataValue::Int16(v) => *v as i128,
            DataValue::UInt16(v) => *v as i128,
            DataValue::Int32(v) => *v as i128,
            DataValue::UInt32(v) => *v as i128,
            DataValue::Int64(v) => *v as i128,
            DataValue::UInt64(v) => *v as i128,
            _ => return None,
        })
    }
}

impl Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Utf8String(v) => write!(f, "{v}"),
            DataValue::Binary(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            DataValue::Boolean(v) => write!(f, "{v}"),
            DataValue::Int8(v) => write!(f, "{v}"),
            DataValue::UInt8(v) => write!(f, "{v}"),
            DataValue::Int16(v) => write!(f, "{v}"),
            DataValue::UInt16(v) => write!(f, "{v}"),
            DataValue::Int32(v) => write!(f, "{v}"),
            DataValue::UInt32(v) => write!(f, "{v}"),
            DataValue::Int64(v) => write!(f, "{v}"),
            DataValue::UInt64(v) => write!(f, "{v}"),
            DataValue::Float32(v) => write!(f, "{v}"),
            DataValue::Float64(v) => write!(f, "{v}"),
            DataValue::Decimal(v) => write!(f, "{v}"),
            DataValue::JSON(v) => write!(f, "{v}"),
            DataValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            DataValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            DataValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            DataValue::DateTimeWithTZ(v) => {
                write!(f, "{} {}", v.dt.format("%Y-%m-%dT%H:%M:%S%.f"), v.tz)
            }
            DataValue::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for DataValue {
    fn from(str: &str) -> Self {
        DataValue::Utf8String(str.to_string())
    }
}

impl From<String> for DataValue {
    fn from(str: String) -> Self {
        DataValue::Utf8String(str)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Boolean(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int32(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int64(v)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DataValue::Null, Into::into)
    }
}
