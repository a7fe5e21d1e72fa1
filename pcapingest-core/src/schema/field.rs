//! Column descriptor for store tables.

use arrow::datatypes::Field;

use super::{DataKind, Value};

/// What a column holds when a row has no value for it.
///
/// The store requires every declared column on every row, so there is no
/// null fill: missing values become either the type's zero value or a fixed
/// sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Zero, `false`, empty string, empty list or the epoch, per the column type
    TypeDefault,
    /// A fixed string, e.g. `"-"` for unknown names
    Text(&'static str),
}

/// Column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Column name (snake_case, e.g. "src_port")
    pub name: &'static str,

    /// Data type
    pub kind: DataKind,

    /// Default applied when a row leaves the column unset
    pub fill: Fill,

    /// Optional description for documentation
    pub description: Option<&'static str>,
}

impl FieldDescriptor {
    /// Create a column that fills with its type default.
    pub const fn new(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            kind,
            fill: Fill::TypeDefault,
            description: None,
        }
    }

    /// Create a string column that fills with `text`.
    pub const fn text(name: &'static str, text: &'static str) -> Self {
        Self {
            name,
            kind: DataKind::String,
            fill: Fill::Text(text),
            description: None,
        }
    }

    /// Add a description to the field.
    pub const fn with_description(mut self, desc: &'static str) -> Self {
        self.description = Some(desc);
        self
    }

    /// The documented default for this column.
    pub fn default_value(&self) -> Value {
        match self.fill {
            Fill::TypeDefault => self.kind.zero_value(),
            Fill::Text(text) => Value::Str(text.to_string()),
        }
    }

    /// Arrow field for this column. Columns are never null.
    pub fn arrow_field(&self) -> Field {
        Field::new(self.name, self.kind.arrow_type(), false)
    }
}

/// Shared column shapes.
impl FieldDescriptor {
    /// Record timestamp.
    pub const fn ts() -> Self {
        Self::new("ts", DataKind::TimestampMicros).with_description("Capture time (UTC)")
    }

    /// Zeek-style connection id.
    pub const fn uid() -> Self {
        Self::text("uid", "")
    }

    /// Port column.
    pub const fn port(name: &'static str) -> Self {
        Self::new(name, DataKind::UInt16)
    }

    /// Address column, rendered as text.
    pub const fn addr(name: &'static str) -> Self {
        Self::text(name, "0.0.0.0")
    }
}
