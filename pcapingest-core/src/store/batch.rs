//! Row buffers to Arrow record batches.

use std::sync::Arc;

use arrow::array::*;
use arrow::record_batch::RecordBatch;

use crate::error::StoreError;
use crate::schema::{DataKind, FieldDescriptor, TableSchema, Value};

/// Typed builder for one column.
enum ColumnBuilder {
    Bool(BooleanBuilder),
    UInt8(UInt8Builder),
    UInt16(UInt16Builder),
    UInt32(UInt32Builder),
    UInt64(UInt64Builder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Str(StringBuilder),
    Timestamp(TimestampMicrosecondBuilder),
    StrList(ListBuilder<StringBuilder>),
    FloatList(ListBuilder<Float64Builder>),
}

impl ColumnBuilder {
    fn new(kind: &DataKind, capacity: usize) -> Option<Self> {
        Some(match kind {
            DataKind::Bool => Self::Bool(BooleanBuilder::with_capacity(capacity)),
            DataKind::UInt8 => Self::UInt8(UInt8Builder::with_capacity(capacity)),
            DataKind::UInt16 => Self::UInt16(UInt16Builder::with_capacity(capacity)),
            DataKind::UInt32 => Self::UInt32(UInt32Builder::with_capacity(capacity)),
            DataKind::UInt64 => Self::UInt64(UInt64Builder::with_capacity(capacity)),
            DataKind::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
            DataKind::Float64 => Self::Float64(Float64Builder::with_capacity(capacity)),
            DataKind::String => Self::Str(StringBuilder::with_capacity(capacity, capacity * 16)),
            DataKind::TimestampMicros => Self::Timestamp(
                TimestampMicrosecondBuilder::with_capacity(capacity).with_timezone("UTC"),
            ),
            DataKind::List(DataKind::String) => Self::StrList(ListBuilder::new(StringBuilder::new())),
            DataKind::List(DataKind::Float64) => Self::FloatList(ListBuilder::new(Float64Builder::new())),
            DataKind::List(_) => return None,
        })
    }

    /// Append a value already checked by [`check_value`].
    fn append(&mut self, value: &Value) {
        match self {
            Self::Bool(b) => b.append_value(value.as_bool().unwrap_or_default()),
            Self::UInt8(b) => b.append_value(value.as_u64().unwrap_or_default() as u8),
            Self::UInt16(b) => b.append_value(value.as_u64().unwrap_or_default() as u16),
            Self::UInt32(b) => b.append_value(value.as_u64().unwrap_or_default() as u32),
            Self::UInt64(b) => b.append_value(value.as_u64().unwrap_or_default()),
            Self::Int64(b) => b.append_value(value.as_i64().unwrap_or_default()),
            Self::Float64(b) => b.append_value(value.as_f64().unwrap_or_default()),
            Self::Str(b) => b.append_value(value.as_str().unwrap_or_default()),
            Self::Timestamp(b) => b.append_value(value.as_i64().unwrap_or_default()),
            Self::StrList(b) => {
                for item in value.as_list().unwrap_or_default() {
                    b.values().append_value(item.as_str().unwrap_or_default());
                }
                b.append(true);
            }
            Self::FloatList(b) => {
                for item in value.as_list().unwrap_or_default() {
                    b.values().append_value(item.as_f64().unwrap_or_default());
                }
                b.append(true);
            }
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Bool(b) => Arc::new(b.finish()),
            Self::UInt8(b) => Arc::new(b.finish()),
            Self::UInt16(b) => Arc::new(b.finish()),
            Self::UInt32(b) => Arc::new(b.finish()),
            Self::UInt64(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Str(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
            Self::StrList(b) => Arc::new(b.finish()),
            Self::FloatList(b) => Arc::new(b.finish()),
        }
    }
}

/// Whether `value` can be stored in a column of `kind`. `Null` is accepted
/// and replaced by the column default before building.
pub fn check_value(value: &Value, kind: &DataKind) -> bool {
    match (kind, value) {
        (_, Value::Null) => true,
        (DataKind::Bool, Value::Bool(_)) => true,
        (DataKind::UInt8, v) => v.as_u64().is_some_and(|n| n <= u8::MAX as u64),
        (DataKind::UInt16, v) => v.as_u64().is_some_and(|n| n <= u16::MAX as u64),
        (DataKind::UInt32, v) => v.as_u64().is_some_and(|n| n <= u32::MAX as u64),
        (DataKind::UInt64, v) => v.as_u64().is_some(),
        (DataKind::Int64, v) => v.as_i64().is_some(),
        (DataKind::Float64, v) => v.as_f64().is_some(),
        (DataKind::String, Value::Str(_)) => true,
        (DataKind::TimestampMicros, Value::Timestamp(_) | Value::Int(_)) => true,
        (DataKind::List(inner), Value::List(items)) => {
            items.iter().all(|item| !item.is_null() && check_value(item, inner))
        }
        _ => false,
    }
}

/// Check a full row against `table`.
pub fn check_row(table: &TableSchema, row: &[Value]) -> Result<(), StoreError> {
    if row.len() != table.columns.len() {
        return Err(StoreError::Schema {
            table: table.name.to_string(),
            reason: format!("expected {} columns, got {}", table.columns.len(), row.len()),
        });
    }
    for (column, value) in table.columns.iter().zip(row) {
        if !check_value(value, &column.kind) {
            return Err(StoreError::Schema {
                table: table.name.to_string(),
                reason: format!("column {} ({}) cannot hold {value:?}", column.name, column.kind),
            });
        }
    }
    Ok(())
}

/// Build one record batch from checked rows, `capture_id` first.
pub fn build_batch(table: &TableSchema, capture_id: &str, rows: &[Vec<Value>]) -> Result<RecordBatch, StoreError> {
    let mut ids = StringBuilder::with_capacity(rows.len(), rows.len() * capture_id.len());
    let mut columns = table
        .columns
        .iter()
        .map(|c| {
            ColumnBuilder::new(&c.kind, rows.len()).ok_or_else(|| StoreError::Schema {
                table: table.name.to_string(),
                reason: format!("unsupported column type {} for {}", c.kind, c.name),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for row in rows {
        ids.append_value(capture_id);
        for ((builder, column), value) in columns.iter_mut().zip(table.columns).zip(row) {
            append_or_default(builder, column, value);
        }
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len() + 1);
    arrays.push(Arc::new(ids.finish()));
    arrays.extend(columns.iter_mut().map(ColumnBuilder::finish));

    RecordBatch::try_new(table.arrow_schema(), arrays).map_err(|e| StoreError::Schema {
        table: table.name.to_string(),
        reason: e.to_string(),
    })
}

fn append_or_default(builder: &mut ColumnBuilder, column: &FieldDescriptor, value: &Value) {
    if value.is_null() {
        builder.append(&column.default_value());
    } else {
        builder.append(value);
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::AsArray;
    use arrow::datatypes::UInt16Type;

    use super::*;
    use crate::schema::tables;

    #[test]
    fn test_build_dns_batch() {
        let mut row = tables::DNS_LOG.default_row();
        row[tables::DNS_LOG.index_of("query").unwrap()] = "example.com".into();
        row[tables::DNS_LOG.index_of("answers").unwrap()] = vec!["1.2.3.4", "5.6.7.8"].into();
        row[tables::DNS_LOG.index_of("TTLs").unwrap()] = Value::Null;
        check_row(&tables::DNS_LOG, &row).unwrap();

        let batch = build_batch(&tables::DNS_LOG, "cap-1", &[row.clone(), row]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), tables::DNS_LOG.columns.len() + 1);

        let ids = batch.column(0).as_string::<i32>();
        assert_eq!(ids.value(1), "cap-1");
        let queries = batch.column_by_name("query").unwrap().as_string::<i32>();
        assert_eq!(queries.value(0), "example.com");
        let answers = batch.column_by_name("answers").unwrap().as_list::<i32>();
        assert_eq!(answers.value(0).len(), 2);
        let ttls = batch.column_by_name("TTLs").unwrap().as_list::<i32>();
        assert_eq!(ttls.value(0).len(), 0);
    }

    #[test]
    fn test_check_row_rejects_mismatch() {
        let mut row = tables::PACKETS.default_row();
        assert!(check_row(&tables::PACKETS, &row[1..]).is_err());

        row[tables::PACKETS.index_of("src_port").unwrap()] = Value::UInt(70_000);
        assert!(matches!(
            check_row(&tables::PACKETS, &row),
            Err(StoreError::Schema { .. })
        ));
    }

    #[test]
    fn test_ports_are_uint16() {
        let mut row = tables::PACKETS.default_row();
        row[tables::PACKETS.index_of("dst_port").unwrap()] = Value::UInt(53);
        let batch = build_batch(&tables::PACKETS, "c", &[row]).unwrap();
        let ports = batch
            .column_by_name("dst_port")
            .unwrap()
            .as_primitive::<UInt16Type>();
        assert_eq!(ports.value(0), 53);
    }
}
