//! Store schema types.
//!
//! Tables are described once, as static [`TableSchema`] values, and shared by
//! the batch writer (Arrow schema) and the enrichment reconciler (coercion
//! table and column defaults).
//!
//! # Example
//!
//! ```rust
//! use pcapingest_core::schema::{tables, Value};
//!
//! let row = tables::PACKETS.default_row();
//! assert_eq!(row[tables::PACKETS.index_of("protocol").unwrap()], Value::Str("Other".into()));
//! ```

mod field;
mod kind;
pub mod tables;
mod value;

pub use field::{FieldDescriptor, Fill};
pub use kind::DataKind;
pub use tables::{TableSchema, CAPTURE_ID_COLUMN};
pub use value::Value;

/// A store row in table column order, without the `capture_id` key.
pub type Row = Vec<Value>;

/// Records that map onto one store table.
pub trait IntoRow {
    /// Target table.
    fn table(&self) -> TableSchema;

    /// Cells in column order.
    fn into_row(self) -> Row;
}
