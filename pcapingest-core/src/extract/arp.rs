//! `arp_log` records.

use crate::decode::ArpInfo;
use crate::protocol::{arp_operation, FieldValue};
use crate::schema::{tables, IntoRow, Row, TableSchema, Value};

/// One ARP operation seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpRecord {
    pub ts: i64,
    pub packet_number: u64,
    pub operation: String,
    pub sender_mac: String,
    pub sender_ip: String,
    pub target_mac: String,
    pub target_ip: String,
}

impl ArpRecord {
    pub fn new(arp: &ArpInfo, ts_us: i64, packet_number: u64) -> Self {
        Self {
            ts: ts_us,
            packet_number,
            operation: operation_name(arp.operation),
            sender_mac: FieldValue::format_mac(&arp.sender_mac),
            sender_ip: arp.sender_ip.to_string(),
            target_mac: FieldValue::format_mac(&arp.target_mac),
            target_ip: arp.target_ip.to_string(),
        }
    }
}

/// "request", "reply" or the opcode number.
pub fn operation_name(operation: u16) -> String {
    match operation {
        arp_operation::REQUEST => "request".to_string(),
        arp_operation::REPLY => "reply".to_string(),
        other => other.to_string(),
    }
}

/// Wireshark-style one-liner for an ARP operation.
pub fn summary(arp: &ArpInfo) -> String {
    match arp.operation {
        arp_operation::REQUEST => format!("Who has {}? Tell {}", arp.target_ip, arp.sender_ip),
        arp_operation::REPLY => format!(
            "{} is at {}",
            arp.sender_ip,
            FieldValue::format_mac(&arp.sender_mac)
        ),
        other => format!("ARP opcode {other}"),
    }
}

impl IntoRow for ArpRecord {
    fn table(&self) -> TableSchema {
        tables::ARP_LOG
    }

    fn into_row(self) -> Row {
        vec![
            Value::Timestamp(self.ts),
            self.packet_number.into(),
            self.operation.into(),
            self.sender_mac.into(),
            self.sender_ip.into(),
            self.target_mac.into(),
            self.target_ip.into(),
        ]
    }
}
