//! SQL Server type mapping to Rust types.

use mssql_client::Row;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// A SQL value read from a diagnostic query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Decimal(Decimal),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::I8(v) => v.to_string(),
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::String(v) => v.clone(),
            SqlValue::Decimal(v) => v.to_string(),
        }
    }

    /// Integer view of numeric values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I8(v) => Some(*v as i64),
            SqlValue::I16(v) => Some(*v as i64),
            SqlValue::I32(v) => Some(*v as i64),
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(v) => Some(*v as i64),
            SqlValue::Decimal(v) => v.trunc().to_i64(),
            SqlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point view of numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::F32(v) => Some(*v as f64),
            SqlValue::F64(v) => Some(*v),
            SqlValue::Decimal(v) => v.to_f64(),
            SqlValue::String(s) => s.trim().parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Boolean view; BIT columns and 0/1 integers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::String(s) => match s.trim().to_uppercase().as_str() {
                "Y" | "YES" | "TRUE" | "1" => Some(true),
                "N" | "NO" | "FALSE" | "0" => Some(false),
                _ => None,
            },
            other => other.as_i64().map(|v| v != 0),
        }
    }
}

/// Type mapper for converting SQL Server column values to Rust types.
pub struct TypeMapper;

impl TypeMapper {
    /// Extract a value from a driver row column.
    pub fn extract_column(row: &Row, idx: usize) -> SqlValue {
        // Strings (most common)
        if let Some(v) = row.try_get::<String>(idx) {
            return SqlValue::String(v);
        }

        // Integers
        if let Some(v) = row.try_get::<i32>(idx) {
            return SqlValue::I32(v);
        }
        if let Some(v) = row.try_get::<i64>(idx) {
            return SqlValue::I64(v);
        }
        if let Some(v) = row.try_get::<i16>(idx) {
            return SqlValue::I16(v);
        }
        // TINYINT is unsigned on the wire
        if let Some(v) = row.try_get::<u8>(idx) {
            return SqlValue::I16(v as i16);
        }

        // Floating point
        if let Some(v) = row.try_get::<f64>(idx) {
            return SqlValue::F64(v);
        }
        if let Some(v) = row.try_get::<f32>(idx) {
            return SqlValue::F32(v);
        }

        // Decimal
        if let Some(v) = row.try_get::<Decimal>(idx) {
            return SqlValue::Decimal(v);
        }

        // Boolean
        if let Some(v) = row.try_get::<bool>(idx) {
            return SqlValue::Bool(v);
        }

        // NULL and unsupported types
        SqlValue::Null
    }
}
