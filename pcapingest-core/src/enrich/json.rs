//! One JSON object per line.

use serde_json::{Map, Value as JsonValue};

use super::coerce::flatten;

/// Parse one log line into flattened fields.
///
/// Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Map<String, JsonValue>>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<JsonValue>(line) {
        Ok(JsonValue::Object(object)) => Ok(Some(flatten(object))),
        Ok(other) => Err(format!("expected object, found {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_dotted_keys_flatten() {
        let fields = parse_line(r#"{"ts":1.0,"id.orig_h":"10.0.0.1","id":{"resp_p":53}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(fields["id_orig_h"], json!("10.0.0.1"));
        assert_eq!(fields["id_resp_p"], json!(53));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(parse_line("[1,2]").is_err());
        assert!(parse_line("{not json").is_err());
        assert_eq!(parse_line("   "), Ok(None));
    }
}
