//! Loose log values to typed store cells.
//!
//! Both log formats are first lifted into `serde_json::Value`s so one set of
//! rules applies to either source. A value that cannot be coerced to its
//! column's type is treated as missing and the column default is used.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value as JsonValue};

use crate::schema::{DataKind, FieldDescriptor, Row, TableSchema, Value};

/// Separator used when a list arrives as one joined string.
pub const LIST_SEPARATOR: char = ',';

/// Flatten nested objects and dotted keys into `_`-joined column names.
///
/// `{"id": {"orig_h": "10.0.0.1"}}` and `{"id.orig_h": "10.0.0.1"}` both
/// become `id_orig_h`.
pub fn flatten(object: Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut out = Map::new();
    flatten_into(&mut out, None, object);
    out
}

fn flatten_into(out: &mut Map<String, JsonValue>, prefix: Option<&str>, object: Map<String, JsonValue>) {
    for (key, value) in object {
        let key = key.replace('.', "_");
        let name = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key,
        };
        match value {
            JsonValue::Object(inner) => flatten_into(out, Some(&name), inner),
            other => {
                out.insert(name, other);
            }
        }
    }
}

/// Build a full row for `table` from flattened fields. Unknown fields are
/// ignored and missing or uncoercible ones take the column default.
pub fn reconcile_row(table: &TableSchema, fields: &Map<String, JsonValue>) -> Row {
    table
        .columns
        .iter()
        .map(|column| {
            fields
                .get(column.name)
                .and_then(|raw| coerce(raw, &column.kind))
                .unwrap_or_else(|| column.default_value())
        })
        .collect()
}

/// Coerce one raw value to `kind`. `None` means "use the default".
pub fn coerce(raw: &JsonValue, kind: &DataKind) -> Option<Value> {
    if raw.is_null() {
        return None;
    }
    match kind {
        DataKind::Bool => coerce_bool(raw).map(Value::Bool),
        DataKind::UInt8 | DataKind::UInt16 | DataKind::UInt32 | DataKind::UInt64 => {
            coerce_u64(raw).filter(|v| fits(*v, kind)).map(Value::UInt)
        }
        DataKind::Int64 => coerce_f64(raw).map(|v| Value::Int(v as i64)),
        DataKind::Float64 => coerce_f64(raw).map(Value::Float),
        DataKind::String => Some(Value::Str(coerce_text(raw))),
        DataKind::TimestampMicros => coerce_timestamp(raw).map(Value::Timestamp),
        DataKind::List(inner) => Some(Value::List(coerce_list(raw, inner))),
    }
}

fn fits(value: u64, kind: &DataKind) -> bool {
    match kind {
        DataKind::UInt8 => value <= u8::MAX as u64,
        DataKind::UInt16 => value <= u16::MAX as u64,
        DataKind::UInt32 => value <= u32::MAX as u64,
        _ => true,
    }
}

/// `T`/`F`, `true`/`false`, native booleans and 0/1.
pub fn coerce_bool(raw: &JsonValue) -> Option<bool> {
    match raw {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_f64().map(|v| v != 0.0),
        JsonValue::String(s) => match s.trim() {
            "T" | "t" | "true" | "True" | "TRUE" | "1" => Some(true),
            "F" | "f" | "false" | "False" | "FALSE" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_u64(raw: &JsonValue) -> Option<u64> {
    match raw {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
        }
        JsonValue::Bool(b) => Some(*b as u64),
        _ => None,
    }
}

fn coerce_f64(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(coerce_text)
            .collect::<Vec<_>>()
            .join(&LIST_SEPARATOR.to_string()),
        other => other.to_string(),
    }
}

/// Native lists, comma-joined strings and lone scalars. Elements that fail
/// to coerce are dropped.
fn coerce_list(raw: &JsonValue, inner: &DataKind) -> Vec<Value> {
    match raw {
        JsonValue::Array(items) => items.iter().filter_map(|v| coerce(v, inner)).collect(),
        JsonValue::String(s) if s.is_empty() => Vec::new(),
        JsonValue::String(s) => s
            .split(LIST_SEPARATOR)
            .filter_map(|part| coerce(&JsonValue::String(part.to_string()), inner))
            .collect(),
        scalar => coerce(scalar, inner).into_iter().collect(),
    }
}

/// Epoch seconds (number or decimal text) or an ISO 8601 string, to
/// microseconds.
pub fn coerce_timestamp(raw: &JsonValue) -> Option<i64> {
    match raw {
        // Work from the decimal text so a float never rounds the microseconds
        JsonValue::Number(n) => epoch_text_to_micros(&n.to_string()),
        JsonValue::String(s) => {
            let s = s.trim();
            epoch_text_to_micros(s).or_else(|| iso_to_micros(s))
        }
        _ => None,
    }
}

/// Parse `"1700000000.123456"` style text to microseconds, truncating past
/// the sixth decimal.
pub fn epoch_text_to_micros(text: &str) -> Option<i64> {
    if text.contains(['e', 'E']) {
        return text.parse::<f64>().ok().map(|v| (v * 1e6).round() as i64);
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let secs: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut micros_text: String = frac.chars().take(6).collect();
    while micros_text.len() < 6 {
        micros_text.push('0');
    }
    let micros: i64 = micros_text.parse().ok()?;

    let total = secs.checked_mul(1_000_000)?.checked_add(micros)?;
    Some(if negative { -total } else { total })
}

fn iso_to_micros(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_micros());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_micros())
}

/// Coercion entry for one column.
pub type ColumnSpec = FieldDescriptor;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::tables;

    #[test]
    fn test_flatten_nested_and_dotted() {
        let nested = json!({"id": {"orig_h": "10.0.0.1", "orig_p": 53}, "ts": 1});
        let dotted = json!({"id.orig_h": "10.0.0.1", "id.orig_p": 53, "ts": 1});
        let (JsonValue::Object(a), JsonValue::Object(b)) = (nested, dotted) else {
            unreachable!()
        };
        assert_eq!(flatten(a), flatten(b));
    }

    #[test]
    fn test_bool_tokens() {
        for (raw, expected) in [
            (json!("T"), true),
            (json!("F"), false),
            (json!("true"), true),
            (json!(false), false),
            (json!(1), true),
        ] {
            assert_eq!(coerce_bool(&raw), Some(expected), "{raw}");
        }
        assert_eq!(coerce_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(coerce_timestamp(&json!(1700000000.123456)), Some(1_700_000_000_123_456));
        assert_eq!(coerce_timestamp(&json!("1700000000.123456")), Some(1_700_000_000_123_456));
        assert_eq!(coerce_timestamp(&json!("1700000000.5")), Some(1_700_000_000_500_000));
        assert_eq!(
            coerce_timestamp(&json!("2023-11-14T22:13:20.000001Z")),
            Some(1_700_000_000_000_001)
        );
        assert_eq!(
            coerce_timestamp(&json!("2023-11-14T22:13:20")),
            Some(1_700_000_000_000_000)
        );
        assert_eq!(coerce_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn test_lists() {
        let strings = DataKind::List(&DataKind::String);
        assert_eq!(
            coerce(&json!("a,b"), &strings),
            Some(Value::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            coerce(&json!(["a", "b"]), &strings),
            coerce(&json!("a,b"), &strings)
        );
        assert_eq!(coerce(&json!(""), &strings), Some(Value::List(vec![])));

        let floats = DataKind::List(&DataKind::Float64);
        assert_eq!(
            coerce(&json!("300.000000,60"), &floats),
            Some(Value::List(vec![Value::Float(300.0), Value::Float(60.0)]))
        );
    }

    #[test]
    fn test_out_of_range_port_uses_default() {
        assert_eq!(coerce(&json!(70000), &DataKind::UInt16), None);
        assert_eq!(coerce(&json!("443"), &DataKind::UInt16), Some(Value::UInt(443)));
    }

    #[test]
    fn test_reconcile_row_fills_defaults_and_drops_unknown() {
        let JsonValue::Object(fields) = json!({
            "ts": 1.5,
            "uid": "Cabc",
            "proto": "tcp",
            "future_field": "ignored",
            "orig_bytes": null,
        }) else {
            unreachable!()
        };
        let row = reconcile_row(&tables::CONN_LOG, &flatten(fields));

        assert_eq!(row.len(), tables::CONN_LOG.columns.len());
        assert_eq!(row[0], Value::Timestamp(1_500_000));
        assert_eq!(row[tables::CONN_LOG.index_of("service").unwrap()], Value::from("-"));
        assert_eq!(row[tables::CONN_LOG.index_of("orig_bytes").unwrap()], Value::UInt(0));
        assert_eq!(row[tables::CONN_LOG.index_of("id_orig_h").unwrap()], Value::from("0.0.0.0"));
    }
}
