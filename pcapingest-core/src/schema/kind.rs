//! Column data types.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, TimeUnit};

use super::Value;

/// Data types a store column can hold.
///
/// Every table in [`super::tables`] is described with these, and
/// [`DataKind::arrow_type`] is the only place they meet Arrow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Boolean (true/false)
    Bool,

    /// Unsigned 8-bit integer
    UInt8,

    /// Unsigned 16-bit integer
    UInt16,

    /// Unsigned 32-bit integer
    UInt32,

    /// Unsigned 64-bit integer
    UInt64,

    /// Signed 64-bit integer
    Int64,

    /// 64-bit floating point
    Float64,

    /// UTF-8 string
    String,

    /// Timestamp with microsecond precision (UTC)
    TimestampMicros,

    /// Variable-length list of elements of the same type
    List(&'static DataKind),
}

impl DataKind {
    /// Human-readable type name, used in log-header diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataKind::Bool => "bool",
            DataKind::UInt8 => "u8",
            DataKind::UInt16 => "u16",
            DataKind::UInt32 => "u32",
            DataKind::UInt64 => "u64",
            DataKind::Int64 => "i64",
            DataKind::Float64 => "f64",
            DataKind::String => "string",
            DataKind::TimestampMicros => "timestamp",
            DataKind::List(_) => "list",
        }
    }

    /// Get the inner type for List, or None if not a List.
    pub fn list_inner(&self) -> Option<&DataKind> {
        match self {
            DataKind::List(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Value written when a row has nothing for this column.
    pub fn zero_value(&self) -> Value {
        match self {
            DataKind::Bool => Value::Bool(false),
            DataKind::UInt8 | DataKind::UInt16 | DataKind::UInt32 | DataKind::UInt64 => {
                Value::UInt(0)
            }
            DataKind::Int64 => Value::Int(0),
            DataKind::Float64 => Value::Float(0.0),
            DataKind::String => Value::Str(String::new()),
            DataKind::TimestampMicros => Value::Timestamp(0),
            DataKind::List(_) => Value::List(Vec::new()),
        }
    }

    /// Arrow type used for this column.
    pub fn arrow_type(&self) -> DataType {
        match self {
            DataKind::Bool => DataType::Boolean,
            DataKind::UInt8 => DataType::UInt8,
            DataKind::UInt16 => DataType::UInt16,
            DataKind::UInt32 => DataType::UInt32,
            DataKind::UInt64 => DataType::UInt64,
            DataKind::Int64 => DataType::Int64,
            DataKind::Float64 => DataType::Float64,
            DataKind::String => DataType::Utf8,
            DataKind::TimestampMicros => {
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
            }
            DataKind::List(inner) => {
                DataType::List(Arc::new(Field::new("item", inner.arrow_type(), true)))
            }
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}
