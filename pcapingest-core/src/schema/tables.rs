//! Store table definitions.
//!
//! Every table is keyed by `capture_id`, which the writer prepends as the first
//! column; the definitions below list the remaining columns in row order.
//! The enrichment reconciler uses the same definitions as its coercion table,
//! so a log line and a directly decoded packet land in identical shapes.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use super::{DataKind, FieldDescriptor};

/// Name of the key column prepended to every table.
pub const CAPTURE_ID_COLUMN: &str = "capture_id";

/// A named, fixed list of columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [FieldDescriptor],
}

impl TableSchema {
    /// Position of a column in row order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Arrow schema with the `capture_id` key first.
    pub fn arrow_schema(&self) -> SchemaRef {
        let mut fields = Vec::with_capacity(self.columns.len() + 1);
        fields.push(Field::new(CAPTURE_ID_COLUMN, DataType::Utf8, false));
        fields.extend(self.columns.iter().map(FieldDescriptor::arrow_field));
        Arc::new(Schema::new(fields))
    }

    /// A row holding every column default.
    pub fn default_row(&self) -> Vec<super::Value> {
        self.columns.iter().map(FieldDescriptor::default_value).collect()
    }
}

const STRING_LIST: DataKind = DataKind::List(&DataKind::String);
const FLOAT_LIST: DataKind = DataKind::List(&DataKind::Float64);

/// One row per decoded frame, ordered by `packet_number`.
pub const PACKETS: TableSchema = TableSchema {
    name: "packets",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::new("packet_number", DataKind::UInt64)
            .with_description("1-based sequence within the capture"),
        FieldDescriptor::addr("src_ip"),
        FieldDescriptor::addr("dst_ip"),
        FieldDescriptor::port("src_port"),
        FieldDescriptor::port("dst_port"),
        FieldDescriptor::text("protocol", "Other"),
        FieldDescriptor::new("length", DataKind::UInt32).with_description("Captured bytes"),
        FieldDescriptor::new("file_offset", DataKind::UInt64),
        FieldDescriptor::text("info", ""),
        FieldDescriptor::text("layers_json", "[]"),
    ],
};

/// DNS transactions, from direct decode and from enrichment logs.
pub const DNS_LOG: TableSchema = TableSchema {
    name: "dns_log",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::uid(),
        FieldDescriptor::addr("id_orig_h"),
        FieldDescriptor::port("id_orig_p"),
        FieldDescriptor::addr("id_resp_h"),
        FieldDescriptor::port("id_resp_p"),
        FieldDescriptor::text("proto", "udp"),
        FieldDescriptor::new("trans_id", DataKind::UInt16),
        FieldDescriptor::text("query", ""),
        FieldDescriptor::new("qclass", DataKind::UInt16),
        FieldDescriptor::text("qclass_name", "-"),
        FieldDescriptor::new("qtype", DataKind::UInt16),
        FieldDescriptor::text("qtype_name", "-"),
        FieldDescriptor::new("rcode", DataKind::UInt16),
        FieldDescriptor::text("rcode_name", "-"),
        FieldDescriptor::new("AA", DataKind::Bool),
        FieldDescriptor::new("TC", DataKind::Bool),
        FieldDescriptor::new("RD", DataKind::Bool),
        FieldDescriptor::new("RA", DataKind::Bool),
        FieldDescriptor::new("Z", DataKind::UInt16),
        FieldDescriptor::new("answers", STRING_LIST),
        FieldDescriptor::new("TTLs", FLOAT_LIST),
        FieldDescriptor::new("rejected", DataKind::Bool),
    ],
};

/// ARP operations seen in direct decode.
pub const ARP_LOG: TableSchema = TableSchema {
    name: "arp_log",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::new("packet_number", DataKind::UInt64),
        FieldDescriptor::text("operation", "-"),
        FieldDescriptor::text("sender_mac", "00:00:00:00:00:00"),
        FieldDescriptor::addr("sender_ip"),
        FieldDescriptor::text("target_mac", "00:00:00:00:00:00"),
        FieldDescriptor::addr("target_ip"),
    ],
};

/// Connection summaries from the enrichment tool.
pub const CONN_LOG: TableSchema = TableSchema {
    name: "conn_log",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::uid(),
        FieldDescriptor::addr("id_orig_h"),
        FieldDescriptor::port("id_orig_p"),
        FieldDescriptor::addr("id_resp_h"),
        FieldDescriptor::port("id_resp_p"),
        FieldDescriptor::text("proto", "-"),
        FieldDescriptor::text("service", "-"),
        FieldDescriptor::new("duration", DataKind::Float64),
        FieldDescriptor::new("orig_bytes", DataKind::UInt64),
        FieldDescriptor::new("resp_bytes", DataKind::UInt64),
        FieldDescriptor::text("conn_state", "-"),
        FieldDescriptor::new("local_orig", DataKind::Bool),
        FieldDescriptor::new("missed_bytes", DataKind::UInt64),
        FieldDescriptor::text("history", "-"),
        FieldDescriptor::new("orig_pkts", DataKind::UInt64),
        FieldDescriptor::new("resp_pkts", DataKind::UInt64),
    ],
};

/// HTTP transactions from the enrichment tool.
pub const HTTP_LOG: TableSchema = TableSchema {
    name: "http_log",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::uid(),
        FieldDescriptor::addr("id_orig_h"),
        FieldDescriptor::port("id_orig_p"),
        FieldDescriptor::addr("id_resp_h"),
        FieldDescriptor::port("id_resp_p"),
        FieldDescriptor::new("trans_depth", DataKind::UInt64),
        FieldDescriptor::text("method", "-"),
        FieldDescriptor::text("host", "-"),
        FieldDescriptor::text("uri", "-"),
        FieldDescriptor::text("referrer", "-"),
        FieldDescriptor::text("user_agent", "-"),
        FieldDescriptor::new("status_code", DataKind::UInt16),
        FieldDescriptor::text("status_msg", "-"),
        FieldDescriptor::new("request_body_len", DataKind::UInt64),
        FieldDescriptor::new("response_body_len", DataKind::UInt64),
        FieldDescriptor::new("tags", STRING_LIST),
    ],
};

/// TLS handshakes from the enrichment tool.
pub const SSL_LOG: TableSchema = TableSchema {
    name: "ssl_log",
    columns: &[
        FieldDescriptor::ts(),
        FieldDescriptor::uid(),
        FieldDescriptor::addr("id_orig_h"),
        FieldDescriptor::port("id_orig_p"),
        FieldDescriptor::addr("id_resp_h"),
        FieldDescriptor::port("id_resp_p"),
        FieldDescriptor::text("version", "-"),
        FieldDescriptor::text("cipher", "-"),
        FieldDescriptor::text("server_name", "-"),
        FieldDescriptor::new("resumed", DataKind::Bool),
        FieldDescriptor::new("established", DataKind::Bool),
        FieldDescriptor::text("subject", "-"),
        FieldDescriptor::text("issuer", "-"),
        FieldDescriptor::text("validation_status", "-"),
    ],
};

/// One row per completed job.
pub const CAPTURE_METADATA: TableSchema = TableSchema {
    name: "capture_metadata",
    columns: &[
        FieldDescriptor::text("file_name", ""),
        FieldDescriptor::new("file_size", DataKind::UInt64),
        FieldDescriptor::new("upload_time", DataKind::TimestampMicros),
        FieldDescriptor::new("total_packets", DataKind::UInt64),
        FieldDescriptor::new("capture_duration", DataKind::Float64)
            .with_description("Seconds between first and last frame"),
        FieldDescriptor::text("notes", ""),
    ],
};

/// Every table, in flush order.
pub const ALL_TABLES: [TableSchema; 7] = [
    PACKETS,
    DNS_LOG,
    ARP_LOG,
    CONN_LOG,
    HTTP_LOG,
    SSL_LOG,
    CAPTURE_METADATA,
];

/// Look up a table by name.
pub fn table_by_name(name: &str) -> Option<TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}
