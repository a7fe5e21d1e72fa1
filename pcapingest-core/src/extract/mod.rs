//! Per-frame field extraction.
//!
//! [`FieldExtractor`] turns a decoded, classified frame into the rows it
//! contributes: always one [`PacketDescriptor`], plus a [`DnsRecord`] for
//! DNS-family frames over UDP/TCP and an [`ArpRecord`] for ARP frames.
//!
//! A DNS message that cannot be parsed only costs the structured record; the
//! packet row is still produced, with `" (Malformed DNS)"` on its summary.

pub mod arp;
pub mod dns;
mod packet;

pub use arp::ArpRecord;
pub use dns::{DnsEndpoints, DnsMessage, DnsRecord};
pub use packet::{format_timestamp, frame_layer, layers_json, PacketDescriptor, UNSPECIFIED_ADDR};

use tracing::debug;

use crate::classify::{dns_message, http_start_line, HttpStartLine, FALLBACK_LABEL};
use crate::decode::{DecodedFrame, Transport};
use crate::error::DecodeError;
use crate::io::RawFrame;
use crate::protocol::tcp_flag_names;

/// Labels whose payload is parsed as a DNS message.
const DNS_FAMILY: [&str; 4] = ["DNS", "mDNS", "LLMNR", "NBNS"];

/// Rows produced by one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub packet: PacketDescriptor,
    pub dns: Option<DnsRecord>,
    pub arp: Option<ArpRecord>,
}

/// Builds packet rows and protocol records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract rows from a decoded frame classified as `label`.
    pub fn extract(
        &self,
        sequence: u64,
        raw: &RawFrame,
        frame: &DecodedFrame,
        label: &'static str,
    ) -> Extraction {
        let length = raw.data.len() as u32;
        let mut dns = None;

        let info = if DNS_FAMILY.contains(&label) && (frame.is_udp() || frame.is_tcp()) {
            match DnsMessage::parse(dns_message(frame)) {
                Ok(message) => {
                    let summary = message.summary();
                    dns = Some(DnsRecord::from_message(
                        &message,
                        &endpoints(frame),
                        raw.timestamp_us,
                    ));
                    summary
                }
                Err(e) => {
                    debug!(sequence, error = %e, "DNS record skipped");
                    format!("{} (Malformed DNS)", transport_summary(frame))
                }
            }
        } else {
            application_summary(frame, label).unwrap_or_else(|| transport_summary(frame))
        };

        let arp = frame
            .arp
            .as_ref()
            .map(|a| ArpRecord::new(a, raw.timestamp_us, sequence));

        let packet = PacketDescriptor {
            sequence,
            timestamp_us: raw.timestamp_us,
            byte_length: length,
            src_ip: ip_text(frame.src_ip),
            dst_ip: ip_text(frame.dst_ip),
            src_port: frame.src_port.unwrap_or(0),
            dst_port: frame.dst_port.unwrap_or(0),
            protocol: label.to_string(),
            file_offset: raw.file_offset,
            info,
            layers_json: layers_json(frame, raw.timestamp_us, length, sequence, label),
        };

        Extraction { packet, dns, arp }
    }

    /// Packet row for a frame the decoder rejected.
    pub fn undecodable(&self, sequence: u64, raw: &RawFrame, error: &DecodeError) -> PacketDescriptor {
        let length = raw.data.len() as u32;
        let layers = serde_json::Value::Array(vec![frame_layer(
            raw.timestamp_us,
            length,
            sequence,
            "",
        )]);

        PacketDescriptor {
            sequence,
            timestamp_us: raw.timestamp_us,
            byte_length: length,
            src_ip: UNSPECIFIED_ADDR.to_string(),
            dst_ip: UNSPECIFIED_ADDR.to_string(),
            src_port: 0,
            dst_port: 0,
            protocol: FALLBACK_LABEL.to_string(),
            file_offset: raw.file_offset,
            info: error.to_string(),
            layers_json: layers.to_string(),
        }
    }
}

fn ip_text(ip: Option<std::net::IpAddr>) -> String {
    ip.map(|a| a.to_string())
        .unwrap_or_else(|| UNSPECIFIED_ADDR.to_string())
}

fn endpoints(frame: &DecodedFrame) -> DnsEndpoints {
    DnsEndpoints {
        orig_h: ip_text(frame.src_ip),
        orig_p: frame.src_port.unwrap_or(0),
        resp_h: ip_text(frame.dst_ip),
        resp_p: frame.dst_port.unwrap_or(0),
        proto: if frame.is_tcp() { "tcp" } else { "udp" },
    }
}

/// Summary for labels that read the application payload.
fn application_summary(frame: &DecodedFrame, label: &str) -> Option<String> {
    if frame.payload.is_empty() {
        return None;
    }
    match label {
        "HTTP" => http_start_line(&frame.payload).map(|line| match line {
            HttpStartLine::Request { method, uri } => format!("{method} {uri}"),
            HttpStartLine::Response { code, reason } => format!("HTTP {code} {reason}"),
        }),
        "TLS" => Some("Application Data".to_string()),
        "SSH" => Some("Encrypted Packet".to_string()),
        _ => None,
    }
}

/// Header-level one-liner.
pub fn transport_summary(frame: &DecodedFrame) -> String {
    let sp = frame.src_port.unwrap_or(0);
    let dp = frame.dst_port.unwrap_or(0);

    match frame.transport {
        Some(Transport::Tcp {
            seq,
            ack,
            flags,
            window,
        }) => format!(
            "{sp} -> {dp} [{}] Seq={seq} Ack={ack} Win={window}",
            tcp_flag_names(flags).join(", ")
        ),
        Some(Transport::Udp { length }) => format!("{sp} -> {dp} Len={length}"),
        Some(Transport::Icmp { icmp_type, code, .. }) => format!("Type={icmp_type} Code={code}"),
        None => match &frame.arp {
            Some(a) => arp::summary(a),
            None => frame
                .truncated
                .clone()
                .unwrap_or_else(|| frame.protocol_chain()),
        },
    }
}
