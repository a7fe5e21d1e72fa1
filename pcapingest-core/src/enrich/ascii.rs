//! Headered tab-separated logs.
//!
//! ```text
//! #separator \x09
//! #set_separator	,
//! #fields	ts	uid	id.orig_h	...
//! #types	time	string	addr	...
//! 1700000000.123456	CAbc12	10.0.0.1	...
//! ```

use serde_json::{Map, Value as JsonValue};

/// Null sentinel.
const UNSET: &str = "-";
/// Empty string/list sentinel.
const EMPTY: &str = "(empty)";

/// Streaming parser state for one ASCII log.
#[derive(Debug, Clone)]
pub struct AsciiLog {
    separator: String,
    set_separator: String,
    fields: Vec<String>,
    types: Vec<String>,
}

impl Default for AsciiLog {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            set_separator: ",".to_string(),
            fields: Vec::new(),
            types: Vec::new(),
        }
    }
}

/// What one input line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum AsciiLine {
    /// Header, comment or blank line
    Directive,
    Record(Map<String, JsonValue>),
    /// Data line that could not be read
    Invalid(String),
}

impl AsciiLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column names from the `#fields` header.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Feed one line.
    pub fn parse_line(&mut self, line: &str) -> AsciiLine {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return AsciiLine::Directive;
        }

        if let Some(directive) = line.strip_prefix('#') {
            self.apply_directive(directive);
            return AsciiLine::Directive;
        }

        if self.fields.is_empty() {
            return AsciiLine::Invalid("data line before #fields header".to_string());
        }

        let values: Vec<&str> = line.split(self.separator.as_str()).collect();
        if values.len() != self.fields.len() {
            return AsciiLine::Invalid(format!(
                "expected {} columns, found {}",
                self.fields.len(),
                values.len()
            ));
        }

        let record = self
            .fields
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (name, raw))| (name.clone(), self.lift(i, raw)))
            .collect();
        AsciiLine::Record(record)
    }

    fn apply_directive(&mut self, directive: &str) {
        if let Some(sep) = directive.strip_prefix("separator ") {
            self.separator = unescape(sep.trim());
            return;
        }

        let mut parts = directive.split(self.separator.as_str());
        let key = parts.next().unwrap_or_default();
        let rest: Vec<String> = parts.map(str::to_string).collect();
        match key {
            "set_separator" => {
                if let Some(sep) = rest.first() {
                    self.set_separator = unescape(sep);
                }
            }
            "fields" => self.fields = rest,
            "types" => self.types = rest,
            // #path, #open, #close, #empty_field, #unset_field
            _ => {}
        }
    }

    /// Lift one cell to a JSON value. Container-typed columns become arrays.
    fn lift(&self, index: usize, raw: &str) -> JsonValue {
        let is_container = self
            .types
            .get(index)
            .is_some_and(|t| t.starts_with("set[") || t.starts_with("vector["));

        match raw {
            UNSET => JsonValue::Null,
            EMPTY if is_container => JsonValue::Array(Vec::new()),
            EMPTY => JsonValue::String(String::new()),
            _ if is_container => JsonValue::Array(
                raw.split(self.set_separator.as_str())
                    .map(|item| JsonValue::String(item.to_string()))
                    .collect(),
            ),
            _ => JsonValue::String(raw.to_string()),
        }
    }
}

/// Decode `\xNN` escapes used in separator headers.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) => {
                out.push(byte as char);
                rest = &rest[pos + 4..];
            }
            None => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const HEADER: &str = "#separator \\x09\n#set_separator\t,\n#path\tdns\n#fields\tts\tuid\tanswers\tTTLs\trejected\n#types\ttime\tstring\tvector[string]\tvector[interval]\tbool\n";

    fn records(text: &str) -> Vec<AsciiLine> {
        let mut log = AsciiLog::new();
        text.lines()
            .map(|l| log.parse_line(l))
            .filter(|l| *l != AsciiLine::Directive)
            .collect()
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("\\x09"), "\t");
        assert_eq!(unescape("\\x2c"), ",");
        assert_eq!(unescape("a\\xZZ"), "a\\xZZ");
    }

    #[test]
    fn test_record_lifting() {
        let text = format!("{HEADER}1.5\tCx\t1.1.1.1,2.2.2.2\t60.000000,30.000000\tF\n");
        let parsed = records(&text);
        let AsciiLine::Record(record) = &parsed[0] else {
            panic!("expected record, got {parsed:?}");
        };

        assert_eq!(record["ts"], json!("1.5"));
        assert_eq!(record["answers"], json!(["1.1.1.1", "2.2.2.2"]));
        assert_eq!(record["TTLs"], json!(["60.000000", "30.000000"]));
        assert_eq!(record["rejected"], json!("F"));
    }

    #[test]
    fn test_sentinels() {
        let text = format!("{HEADER}1.5\t-\t(empty)\t-\tT\n");
        let AsciiLine::Record(record) = &records(&text)[0] else {
            panic!("expected record");
        };
        assert_eq!(record["uid"], JsonValue::Null);
        assert_eq!(record["answers"], json!([]));
        assert_eq!(record["TTLs"], JsonValue::Null);
    }

    #[test]
    fn test_column_mismatch_is_invalid() {
        let text = format!("{HEADER}1.5\tonly-two\n");
        assert!(matches!(records(&text)[0], AsciiLine::Invalid(_)));
    }

    #[test]
    fn test_data_before_header() {
        assert!(matches!(
            AsciiLog::new().parse_line("1.0\tx"),
            AsciiLine::Invalid(_)
        ));
    }
}
