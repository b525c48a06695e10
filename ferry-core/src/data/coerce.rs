use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::UTC;
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use uuid::Uuid;

use crate::err::{bail, Context, Result};

use super::{DataType, DataValue, DateTimeWithTZ};

impl DataValue {
    /// Tries to coerce the data value into the supplied type.
    ///
    /// Coercion must not lose data:
    ///     COERCE(COERCE(A, NEW_TYPE), ORIG_TYPE) == A
    ///
    /// Values which would be truncated or are out of range for the
    /// target type are rejected.
    pub fn try_coerce_into(self, r#type: &DataType) -> Result<Self> {
        // Nulls are type-independent
        if self.is_null() {
            return Ok(self);
        }

        if let Some(int) = self.as_integer() {
            return Self::try_coerce_integer(int, r#type);
        }

        Ok(match self {
            DataValue::Utf8String(data) => Self::try_coerce_utf8_string(data, r#type)?,
            DataValue::Boolean(data) => Self::try_coerce_boolean(data, r#type)?,
            DataValue::Float32(data) => Self::try_coerce_float(data as f64, r#type)?,
            DataValue::Float64(data) => Self::try_coerce_float(data, r#type)?,
            DataValue::Decimal(data) => Self::try_coerce_decimal(data, r#type)?,
            DataValue::Date(data) => Self::try_coerce_date(data, r#type)?,
            DataValue::DateTime(data) => Self::try_coerce_date_time(data, r#type)?,
            DataValue::DateTimeWithTZ(data) => Self::try_coerce_date_time_with_tz(data, r#type)?,
            data => Self::try_coerce_other(data, r#type)?,
        })
    }

    fn try_coerce_integer(data: i128, r#type: &DataType) -> Result<DataValue> {
        let coerced = match r#type {
            DataType::UInt8 => u8::try_from(data).ok().map(DataValue::UInt8),
            DataType::Int16 => i16::try_from(data).ok().map(DataValue::Int16),
            DataType::Int32 => i32::try_from(data).ok().map(DataValue::Int32),
            DataType::Int64 => i64::try_from(data).ok().map(DataValue::Int64),
            DataType::UInt64 => u64::try_from(data).ok().map(DataValue::UInt64),
            DataType::Float32 if data.unsigned_abs() < (1 << f32::MANTISSA_DIGITS) => {
                Some(DataValue::Float32(data as f32))
            }
            DataType::Float64 if data.unsigned_abs() < (1 << f64::MANTISSA_DIGITS) => {
                Some(DataValue::Float64(data as f64))
            }
            DataType::Decimal => Decimal::from_i128(data).map(DataValue::Decimal),
            DataType::Boolean if data == 0 || data == 1 => Some(DataValue::Boolean(data == 1)),
            DataType::Utf8String(_) => {
                return Self::try_coerce_utf8_string(data.to_string(), r#type)
            }
            _ => None,
        };

        match coerced {
            Some(val) => Ok(val),
            None => bail!("Value {} is out of range for type {:?}", data, r#type),
        }
    }

    fn try_coerce_utf8_string(data: String, r#type: &DataType) -> Result<DataValue> {
        let parsed = match r#type {
            DataType::Utf8String(opts) => {
                if let Some(length) = opts.length {
                    if data.chars().count() > length as usize {
                        bail!("String exceeds maximum length of {}", length);
                    }
                }

                return Ok(DataValue::Utf8String(data));
            }
            DataType::Binary => return Ok(DataValue::Binary(data.into_bytes())),
            DataType::Boolean => match data.to_lowercase().as_str() {
                "true" | "1" => Some(DataValue::Boolean(true)),
                "false" | "0" => Some(DataValue::Boolean(false)),
                _ => None,
            },
            DataType::Float32 => data.parse().ok().map(DataValue::Float32),
            DataType::Float64 => data.parse().ok().map(DataValue::Float64),
            DataType::Decimal => data.parse().ok().map(DataValue::Decimal),
            DataType::Date => NaiveDate::parse_from_str(&data, "%Y-%m-%d")
                .ok()
                .map(DataValue::Date),
            DataType::Time => NaiveTime::parse_from_str(&data, "%H:%M:%S%.f")
                .ok()
                .map(DataValue::Time),
            DataType::DateTime => Self::parse_date_time(&data).map(DataValue::DateTime),
            DataType::DateTimeWithTZ => Self::parse_date_time(&data)
                .map(|dt| DataValue::DateTimeWithTZ(DateTimeWithTZ::new(dt, UTC))),
            DataType::Uuid => Uuid::parse_str(&data).ok().map(DataValue::Uuid),
            r#type if r#type.is_integer() => match data.trim().parse::<i128>() {
                Ok(int) => return Self::try_coerce_integer(int, r#type),
                Err(_) => None,
            },
            _ => None,
        };

        match parsed {
            Some(val) => Ok(val),
            None => bail!("Failed to parse \"{}\" as {:?}", data, r#type),
        }
    }

    /// Parses a naive (UTC) date/time, accepting RFC 3339 strings with offsets
    fn parse_date_time(data: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(data, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(data, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(data)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc).naive_utc())
            })
    }

    fn try_coerce_boolean(data: bool, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Boolean => DataValue::Boolean(data),
            DataType::Utf8String(_) => DataValue::Utf8String(data.to_string()),
            r#type if r#type.is_integer() => Self::try_coerce_integer(data as i128, r#type)?,
            _ => bail!("Cannot coerce boolean into {:?}", r#type),
        })
    }

    fn try_coerce_float(data: f64, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Float64 => DataValue::Float64(data),
            DataType::Float32 if (data as f32) as f64 == data || data.is_nan() => {
                DataValue::Float32(data as f32)
            }
            DataType::Decimal => match Decimal::from_f64(data) {
                Some(dec) => DataValue::Decimal(dec),
                None => bail!("Value {} cannot be represented as a decimal", data),
            },
            DataType::Utf8String(_) => DataValue::Utf8String(data.to_string()),
            r#type if r#type.is_integer() && data.fract() == 0.0 && data.is_finite() => {
                Self::try_coerce_integer(data as i128, r#type)?
            }
            _ => bail!("Cannot coerce {} into {:?}", data, r#type),
        })
    }

    fn try_coerce_decimal(data: Decimal, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Decimal => DataValue::Decimal(data),
            DataType::Float64 => match data.to_f64() {
                Some(f) if Decimal::from_f64(f) == Some(data) => DataValue::Float64(f),
                _ => bail!("Decimal {} cannot be represented as a float", data),
            },
            DataType::Utf8String(_) => DataValue::Utf8String(data.to_string()),
            r#type if r#type.is_integer() && data.fract().is_zero() => match data.to_i128() {
                Some(int) => Self::try_coerce_integer(int, r#type)?,
                None => bail!("Decimal {} is out of range for {:?}", data, r#type),
            },
            _ => bail!("Cannot coerce decimal {} into {:?}", data, r#type),
        })
    }

    fn try_coerce_date(data: NaiveDate, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Date => DataValue::Date(data),
            DataType::DateTime => DataValue::DateTime(
                data.and_hms_opt(0, 0, 0)
                    .with_context(|| format!("Invalid date {}", data))?,
            ),
            DataType::Utf8String(_) => DataValue::Utf8String(data.format("%Y-%m-%d").to_string()),
            _ => bail!("Cannot coerce date into {:?}", r#type),
        })
    }

    fn try_coerce_date_time(data: NaiveDateTime, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::DateTime => DataValue::DateTime(data),
            DataType::DateTimeWithTZ => DataValue::DateTimeWithTZ(DateTimeWithTZ::new(data, UTC)),
            DataType::Date if data.num_seconds_from_midnight() == 0 && data.nanosecond() == 0 => {
                DataValue::Date(data.date())
            }
            DataType::Utf8String(_) => {
                DataValue::Utf8String(data.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            _ => bail!("Cannot coerce date/time {} into {:?}", data, r#type),
        })
    }

    fn try_coerce_date_time_with_tz(data: DateTimeWithTZ, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::DateTimeWithTZ => DataValue::DateTimeWithTZ(data),
            DataType::DateTime => DataValue::DateTime(data.to_utc()?),
            DataType::Utf8String(_) => DataValue::Utf8String(DataValue::DateTimeWithTZ(data).to_string()),
            _ => bail!("Cannot coerce zoned date/time into {:?}", r#type),
        })
    }

    fn try_coerce_other(data: DataValue, r#type: &DataType) -> Result<DataValue> {
        Ok(match (data, r#type) {
            (data @ DataValue::Uuid(_), DataType::Uuid)
            | (data @ DataValue::Binary(_), DataType::Binary)
            | (data @ DataValue::Time(_), DataType::Time) => data,
            (DataValue::Uuid(uuid), DataType::Utf8String(_)) => {
                DataValue::Utf8String(uuid.to_string())
            }
            (DataValue::JSON(json), DataType::Utf8String(_)) => DataValue::Utf8String(json),
            (DataValue::Time(time), DataType::Utf8String(_)) => {
                DataValue::Utf8String(time.format("%H:%M:%S%.f").to_string())
            }
            (DataValue::Binary(bytes), DataType::Utf8String(_)) => match String::from_utf8(bytes) {
                Ok(str) => DataValue::Utf8String(str),
                Err(_) => bail!("Binary data is not valid UTF-8"),
            },
            (data, r#type) => bail!("Cannot coerce {:?} into {:?}", data, r#type),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::data::StringOptions;

    use super::*;

    #[test]
    fn test_data_value_coerce_null() {
        assert_eq!(
            DataValue::Null.try_coerce_into(&DataType::Int32).unwrap(),
            DataValue::Null
        );
    }

    #[test]
    fn test_data_value_coerce_integers() {
        assert_eq!(
            DataValue::Int32(123).try_coerce_into(&DataType::UInt8).unwrap(),
            DataValue::UInt8(123)
        );
        assert_eq!(
            DataValue::Int64(-5).try_coerce_into(&DataType::Int16).unwrap(),
            DataValue::Int16(-5)
        );
        assert_eq!(
            DataValue::UInt8(9)
                .try_coerce_into(&DataType::Decimal)
                .unwrap(),
            DataValue::Decimal(Decimal::new(9, 0))
        );
        DataValue::Int32(256).try_coerce_into(&DataType::UInt8).unwrap_err();
        DataValue::Int32(-1).try_coerce_into(&DataType::UInt64).unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_utf8_string_to_boolean() {
        for (str, expected) in [("true", true), ("FALSE", false), ("1", true), ("0", false)] {
            assert_eq!(
                DataValue::from(str).try_coerce_into(&DataType::Boolean).unwrap(),
                DataValue::Boolean(expected)
            );
        }

        DataValue::from("yes")
            .try_coerce_into(&DataType::Boolean)
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_utf8_string_to_numbers() {
        assert_eq!(
            DataValue::from("42").try_coerce_into(&DataType::Int32).unwrap(),
            DataValue::Int32(42)
        );
        assert_eq!(
            DataValue::from("1.5").try_coerce_into(&DataType::Float64).unwrap(),
            DataValue::Float64(1.5)
        );
        DataValue::from("70000")
            .try_coerce_into(&DataType::Int16)
            .unwrap_err();
        DataValue::from("abc")
            .try_coerce_into(&DataType::Int32)
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_utf8_string_length() {
        assert_eq!(
            DataValue::from("abc")
                .try_coerce_into(&DataType::Utf8String(StringOptions::new(Some(3))))
                .unwrap(),
            DataValue::from("abc")
        );
        DataValue::from("abcd")
            .try_coerce_into(&DataType::Utf8String(StringOptions::new(Some(3))))
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_utf8_string_to_date_time() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();

        assert_eq!(
            DataValue::from("2020-01-02T03:04:05")
                .try_coerce_into(&DataType::DateTime)
                .unwrap(),
            DataValue::DateTime(expected)
        );
        assert_eq!(
            DataValue::from("2020-01-02T13:04:05+10:00")
                .try_coerce_into(&DataType::DateTime)
                .unwrap(),
            DataValue::DateTime(expected)
        );
    }

    #[test]
    fn test_data_value_coerce_boolean() {
        assert_eq!(
            DataValue::Boolean(true).try_coerce_into(&DataType::UInt8).unwrap(),
            DataValue::UInt8(1)
        );
        DataValue::Boolean(true)
            .try_coerce_into(&DataType::Date)
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_float() {
        assert_eq!(
            DataValue::Float64(3.0).try_coerce_into(&DataType::Int32).unwrap(),
            DataValue::Int32(3)
        );
        DataValue::Float64(3.5)
            .try_coerce_into(&DataType::Int32)
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_date_time() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();

        assert_eq!(
            DataValue::Date(date).try_coerce_into(&DataType::DateTime).unwrap(),
            DataValue::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
        );
        DataValue::DateTime(date.and_hms_opt(1, 0, 0).unwrap())
            .try_coerce_into(&DataType::Date)
            .unwrap_err();
    }

    #[test]
    fn test_data_value_coerce_same_type() {
        let uuid = Uuid::new_v4();

        assert_eq!(
            DataValue::Uuid(uuid).try_coerce_into(&DataType::Uuid).unwrap(),
            DataValue::Uuid(uuid)
        );
        assert_eq!(
            DataValue::Uuid(uuid)
                .try_coerce_into(&DataType::Utf8String(StringOptions::default()))
                .unwrap(),
            DataValue::Utf8String(uuid.to_string())
        );
    }
}
