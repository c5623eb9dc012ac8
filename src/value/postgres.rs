//! Parameter binding and row decoding for `may_postgres`.
//!
//! Every bound parameter is carried as a JSON value and converted into the
//! wire type PostgreSQL inferred for its placeholder, so an attribute holding
//! `42` binds equally well against `INT4`, `INT8`, `FLOAT8` or `TEXT` columns.
//! Decoded rows go the other way and come back as JSON maps. UUID, NUMERIC
//! and BYTEA values are carried as strings so no precision is lost.

use crate::executor::{LifeError, Row};
use crate::value::value_to_json;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres_types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::str::FromStr;
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A JSON value bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam(pub JsonValue);

impl SqlParam {
    fn as_i64(&self) -> Result<i64, BoxError> {
        match &self.0 {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| format!("{n} is not an integer").into()),
            JsonValue::String(s) => Ok(s.trim().parse::<i64>()?),
            JsonValue::Bool(b) => Ok(i64::from(*b)),
            other => Err(format!("cannot bind {other} as an integer").into()),
        }
    }

    fn as_f64(&self) -> Result<f64, BoxError> {
        match &self.0 {
            JsonValue::Number(n) => n
                .as_f64()
                .ok_or_else(|| format!("{n} is not a number").into()),
            JsonValue::String(s) => Ok(s.trim().parse::<f64>()?),
            other => Err(format!("cannot bind {other} as a number").into()),
        }
    }

    fn as_bool(&self) -> Result<bool, BoxError> {
        match &self.0 {
            JsonValue::Bool(b) => Ok(*b),
            JsonValue::Number(n) => Ok(n.as_i64().unwrap_or_default() != 0),
            JsonValue::String(s) => match s.as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(format!("cannot bind {s:?} as a boolean").into()),
            },
            other => Err(format!("cannot bind {other} as a boolean").into()),
        }
    }

    fn as_text(&self) -> String {
        match &self.0 {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn as_str(&self) -> Result<&str, BoxError> {
        match &self.0 {
            JsonValue::String(s) => Ok(s),
            other => Err(format!("expected a string, found {other}").into()),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }

        if *ty == Type::INT2 {
            i16::try_from(self.as_i64()?)?.to_sql(ty, out)
        } else if *ty == Type::INT4 {
            i32::try_from(self.as_i64()?)?.to_sql(ty, out)
        } else if *ty == Type::INT8 {
            self.as_i64()?.to_sql(ty, out)
        } else if *ty == Type::FLOAT4 {
            (self.as_f64()? as f32).to_sql(ty, out)
        } else if *ty == Type::FLOAT8 {
            self.as_f64()?.to_sql(ty, out)
        } else if *ty == Type::BOOL {
            self.as_bool()?.to_sql(ty, out)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            self.0.to_sql(ty, out)
        } else if *ty == Type::TIMESTAMPTZ {
            DateTime::parse_from_rfc3339(self.as_str()?)?
                .with_timezone(&Utc)
                .to_sql(ty, out)
        } else if *ty == Type::TIMESTAMP {
            let raw = self.as_str()?;
            let naive = match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => dt.naive_utc(),
                Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)?,
            };
            naive.to_sql(ty, out)
        } else if *ty == Type::DATE {
            NaiveDate::parse_from_str(self.as_str()?, "%Y-%m-%d")?.to_sql(ty, out)
        } else if *ty == Type::UUID {
            Uuid::parse_str(self.as_str()?)?.to_sql(ty, out)
        } else if *ty == Type::NUMERIC {
            let text = self.as_text();
            let text = text.trim();
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))?
                .to_sql(ty, out)
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
            || *ty == Type::UNKNOWN
        {
            self.as_text().to_sql(ty, out)
        } else {
            Err(format!("unsupported parameter type {ty}").into())
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Convert SeaQuery values into `ToSql` parameters and run `f` with them.
///
/// The converted parameters only live for the duration of the closure.
///
/// # Errors
///
/// Returns `LifeError::Other` if a value kind cannot be bound, or whatever
/// error `f` returns.
pub fn with_converted_params<F, R>(values: &sea_query::Values, f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    let params = values
        .iter()
        .map(|value| value_to_json(value).map(SqlParam))
        .collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
    f(&refs)
}

/// A column value read as JSON.
///
/// Nulls become `null`, arrays become JSON arrays of their decoded
/// elements and enum labels become strings.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlColumn(pub JsonValue);

impl<'a> FromSql<'a> for SqlColumn {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = if *ty == Type::BOOL {
            JsonValue::from(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            JsonValue::from(i16::from_sql(ty, raw)?)
        } else if *ty == Type::INT4 {
            JsonValue::from(i32::from_sql(ty, raw)?)
        } else if *ty == Type::INT8 {
            JsonValue::from(i64::from_sql(ty, raw)?)
        } else if *ty == Type::FLOAT4 {
            JsonValue::from(f32::from_sql(ty, raw)?)
        } else if *ty == Type::FLOAT8 {
            JsonValue::from(f64::from_sql(ty, raw)?)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            JsonValue::from_sql(ty, raw)?
        } else if *ty == Type::TIMESTAMPTZ {
            JsonValue::String(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339())
        } else if *ty == Type::TIMESTAMP {
            JsonValue::String(NaiveDateTime::from_sql(ty, raw)?.format(NAIVE_FORMAT).to_string())
        } else if *ty == Type::DATE {
            JsonValue::String(NaiveDate::from_sql(ty, raw)?.to_string())
        } else if *ty == Type::UUID {
            JsonValue::String(Uuid::from_sql(ty, raw)?.to_string())
        } else if *ty == Type::NUMERIC {
            JsonValue::String(Decimal::from_sql(ty, raw)?.to_string())
        } else if *ty == Type::BYTEA {
            let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
            JsonValue::String(format!("\\x{hex}"))
        } else if let Kind::Array(_) = ty.kind() {
            let items = Vec::<SqlColumn>::from_sql(ty, raw)?;
            JsonValue::Array(items.into_iter().map(|SqlColumn(v)| v).collect())
        } else if let Kind::Enum(_) = ty.kind() {
            JsonValue::String(std::str::from_utf8(raw)?.to_string())
        } else if <&str as FromSql>::accepts(ty) {
            JsonValue::String(<&str as FromSql>::from_sql(ty, raw)?.to_string())
        } else {
            return Err(format!("unsupported column type {ty}").into());
        };
        Ok(Self(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Self(JsonValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Decode a driver row into a column-label keyed JSON map.
///
/// # Errors
///
/// Returns `LifeError::ParseError` when a column cannot be read.
pub fn decode_row(row: &may_postgres::Row) -> Result<Row, LifeError> {
    let mut decoded = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let SqlColumn(value) = row.try_get::<_, SqlColumn>(idx).map_err(|e| {
            LifeError::ParseError(format!("column {:?}: {e}", column.name()))
        })?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Value, Values};
    use serde_json::json;

    fn encode(value: JsonValue, ty: &Type) -> Result<(IsNull, BytesMut), BoxError> {
        let mut out = BytesMut::new();
        let is_null = SqlParam(value).to_sql(ty, &mut out)?;
        Ok((is_null, out))
    }

    #[test]
    fn test_null_is_sql_null_for_any_type() {
        let (is_null, out) = encode(JsonValue::Null, &Type::INT4).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn test_integer_binds_at_column_width() {
        let (_, out) = encode(json!(7), &Type::INT4).unwrap();
        assert_eq!(&out[..], &7i32.to_be_bytes());

        let (_, out) = encode(json!(7), &Type::INT8).unwrap();
        assert_eq!(&out[..], &7i64.to_be_bytes());
    }

    #[test]
    fn test_numeric_string_binds_as_integer() {
        let (_, out) = encode(json!("12"), &Type::INT4).unwrap();
        assert_eq!(&out[..], &12i32.to_be_bytes());
    }

    #[test]
    fn test_out_of_range_integer_is_rejected() {
        assert!(encode(json!(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn test_number_binds_as_text() {
        let (_, out) = encode(json!(5), &Type::TEXT).unwrap();
        assert_eq!(&out[..], b"5");
    }

    #[test]
    fn test_timestamp_requires_rfc3339() {
        assert!(encode(json!("2024-01-02T03:04:05Z"), &Type::TIMESTAMPTZ).is_ok());
        assert!(encode(json!("yesterday"), &Type::TIMESTAMPTZ).is_err());
    }

    const ID: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    fn decode(ty: &Type, raw: &[u8]) -> Result<JsonValue, BoxError> {
        SqlColumn::from_sql(ty, raw).map(|SqlColumn(v)| v)
    }

    #[test]
    fn test_uuid_binds_from_string() {
        let (_, out) = encode(json!(ID), &Type::UUID).unwrap();
        assert_eq!(&out[..], Uuid::parse_str(ID).unwrap().as_bytes());
        assert!(encode(json!("not-a-uuid"), &Type::UUID).is_err());
    }

    #[test]
    fn test_uuid_column_decodes_to_string() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(decode(&Type::UUID, id.as_bytes()).unwrap(), json!(ID));
    }

    #[test]
    fn test_numeric_keeps_scale() {
        let (_, out) = encode(json!("12.50"), &Type::NUMERIC).unwrap();
        assert_eq!(decode(&Type::NUMERIC, &out).unwrap(), json!("12.50"));

        let (_, out) = encode(json!(3), &Type::NUMERIC).unwrap();
        assert_eq!(decode(&Type::NUMERIC, &out).unwrap(), json!("3"));

        assert!(encode(json!("lots"), &Type::NUMERIC).is_err());
    }

    #[test]
    fn test_bytea_decodes_to_hex() {
        assert_eq!(decode(&Type::BYTEA, &[0xde, 0xad]).unwrap(), json!("\\xdead"));
    }

    #[test]
    fn test_array_column_decodes_elements() {
        let mut out = BytesMut::new();
        vec![Some(1i32), None].to_sql(&Type::INT4_ARRAY, &mut out).unwrap();
        assert_eq!(decode(&Type::INT4_ARRAY, &out).unwrap(), json!([1, null]));
    }

    #[test]
    fn test_text_and_null_columns() {
        assert_eq!(decode(&Type::TEXT, b"hi").unwrap(), json!("hi"));
        assert_eq!(SqlColumn::from_sql_null(&Type::UUID).unwrap(), SqlColumn(JsonValue::Null));
    }

    #[test]
    fn test_unsupported_column_type_is_an_error() {
        let err = decode(&Type::POINT, &[0u8; 16]).unwrap_err();
        assert!(err.to_string().contains("unsupported column type"));
    }

    #[test]
    fn test_with_converted_params_passes_every_value() {
        let values = Values(vec![Value::from(1i64), Value::from("a"), Value::String(None)]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 3);
    }
}
