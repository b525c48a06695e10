use serde::{Deserialize, Serialize};

/// Data type of a column, used to coerce values before formatting
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum DataType {
    Utf8String(StringOptions),
    Binary,
    Boolean,
    UInt8,
    Int16,
    Int32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Date,
    Time,
    DateTime,
    DateTimeWithTZ,
    Uuid,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::Int16 | DataType::Int32 | DataType::Int64 | DataType::UInt64
        )
    }
}

/// Options for the VARCHAR data type
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct StringOptions {
    /// Maximum length of the varchar data in characters
    pub length: Option<u32>,
}

impl StringOptions {
    pub fn new(length: Option<u32>) -> Self {
        Self { length }
    }
}
