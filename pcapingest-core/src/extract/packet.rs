//! `packets` rows and the per-layer detail document.

use chrono::{DateTime, SecondsFormat};
use serde_json::{json, Map, Value as JsonValue};

use crate::decode::DecodedFrame;
use crate::schema::{tables, IntoRow, Row, TableSchema, Value};

/// Address written when a frame has no IP layer.
pub const UNSPECIFIED_ADDR: &str = "0.0.0.0";

/// Normalized per-frame record.
///
/// Keyed by `(capture_id, sequence)`; the writer supplies `capture_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketDescriptor {
    /// 1-based, contiguous within a run
    pub sequence: u64,
    pub timestamp_us: i64,
    pub byte_length: u32,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: String,
    pub file_offset: u64,
    pub info: String,
    /// JSON array of `{"name", "fields"}` objects
    pub layers_json: String,
}

impl IntoRow for PacketDescriptor {
    fn table(&self) -> TableSchema {
        tables::PACKETS
    }

    fn into_row(self) -> Row {
        vec![
            Value::Timestamp(self.timestamp_us),
            self.sequence.into(),
            self.src_ip.into(),
            self.dst_ip.into(),
            self.src_port.into(),
            self.dst_port.into(),
            self.protocol.into(),
            self.byte_length.into(),
            self.file_offset.into(),
            self.info.into(),
            self.layers_json.into(),
        ]
    }
}

/// RFC 3339 rendering of a microsecond timestamp.
pub fn format_timestamp(ts_us: i64) -> String {
    DateTime::from_timestamp_micros(ts_us)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| ts_us.to_string())
}

/// The synthetic first layer describing the frame itself.
pub fn frame_layer(ts_us: i64, length: u32, sequence: u64, protocols: &str) -> JsonValue {
    json!({
        "name": "frame",
        "fields": {
            "frame.time": format_timestamp(ts_us),
            "frame.len": length,
            "frame.number": sequence,
            "frame.protocols": protocols,
        }
    })
}

/// Colon-joined layer chain, extended by the classification label when it
/// names something deeper than the last decoded layer.
pub fn protocol_chain(frame: &DecodedFrame, label: &str) -> String {
    let mut chain = frame.protocol_chain();
    let label = label.to_ascii_lowercase();
    let already_listed = frame.layers.iter().any(|l| l.name == label);
    if !already_listed && frame.transport.is_some() {
        chain.push(':');
        chain.push_str(&label);
    }
    chain
}

/// Layer detail document for a decoded frame.
pub fn layers_json(frame: &DecodedFrame, ts_us: i64, length: u32, sequence: u64, label: &str) -> String {
    let mut layers = Vec::with_capacity(frame.layers.len() + 1);
    layers.push(frame_layer(ts_us, length, sequence, &protocol_chain(frame, label)));

    for layer in &frame.layers {
        let fields: Map<String, JsonValue> = layer
            .fields
            .iter()
            .map(|(name, value)| (format!("{}.{name}", layer.name), value.to_json()))
            .collect();
        layers.push(json!({ "name": layer.name, "fields": fields }));
    }

    JsonValue::Array(layers).to_string()
}
