//! Frame decoding: raw container frames to header-level descriptors.
//!
//! [`FrameDecoder`] runs the layer parsers from [`crate::protocol`] over one
//! frame and folds their fields into a [`DecodedFrame`]. Only the first layer
//! is mandatory; a failure deeper in the chain keeps what was decoded so far
//! and records the reason in [`DecodedFrame::truncated`].

use std::net::IpAddr;

use bytes::Bytes;

use crate::error::DecodeError;
use crate::io::RawFrame;
use crate::protocol::{
    default_registry, parse_packet, FieldValue, OwnedFieldValue, ParseResult, ProtocolRegistry,
};

/// One decoded layer with owned field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: &'static str,
    pub fields: Vec<(&'static str, OwnedFieldValue)>,
}

impl Layer {
    pub fn get(&self, name: &str) -> Option<&OwnedFieldValue> {
        self.fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }
}

/// Transport header summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp {
        seq: u32,
        ack: u32,
        flags: u16,
        window: u16,
    },
    Udp {
        length: u16,
    },
    Icmp {
        icmp_type: u8,
        code: u8,
        v6: bool,
    },
}

impl Transport {
    /// Transport label used by the classifier.
    pub fn label(&self) -> &'static str {
        match self {
            Transport::Tcp { .. } => "TCP",
            Transport::Udp { .. } => "UDP",
            Transport::Icmp { v6: false, .. } => "ICMP",
            Transport::Icmp { v6: true, .. } => "ICMPv6",
        }
    }

    /// Whether this transport carries ports.
    pub fn has_ports(&self) -> bool {
        matches!(self, Transport::Tcp { .. } | Transport::Udp { .. })
    }
}

/// Ethernet/IPv4 ARP fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpInfo {
    pub operation: u16,
    pub sender_mac: [u8; 6],
    pub sender_ip: IpAddr,
    pub target_mac: [u8; 6],
    pub target_ip: IpAddr,
}

/// Header-level view of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub link_type: u16,
    pub layers: Vec<Layer>,
    /// Upper-layer protocol number from the innermost IP header
    pub ip_protocol: Option<u8>,
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub transport: Option<Transport>,
    pub arp: Option<ArpInfo>,
    /// Bytes after the last decoded header
    pub payload: Bytes,
    /// Error from a layer after the first, if the walk stopped early
    pub truncated: Option<String>,
}

impl DecodedFrame {
    /// Layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Colon-joined layer chain, e.g. `ethernet:ipv4:udp`.
    pub fn protocol_chain(&self) -> String {
        self.layers
            .iter()
            .map(|l| l.name)
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self.transport, Some(Transport::Tcp { .. }))
    }

    pub fn is_udp(&self) -> bool {
        matches!(self.transport, Some(Transport::Udp { .. }))
    }

    /// True when either port equals `port`.
    pub fn has_port(&self, port: u16) -> bool {
        self.src_port == Some(port) || self.dst_port == Some(port)
    }
}

/// Decodes link, network and transport headers.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    registry: ProtocolRegistry,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: ProtocolRegistry) -> Self {
        Self { registry }
    }

    /// Decode one container frame.
    pub fn decode(&self, frame: &RawFrame) -> Result<DecodedFrame, DecodeError> {
        self.decode_bytes(frame.link_type, &frame.data)
    }

    /// Decode raw link-layer bytes. The payload shares `data`'s buffer.
    pub fn decode_bytes(&self, link_type: u16, data: &Bytes) -> Result<DecodedFrame, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::EmptyFrame);
        }

        let results = parse_packet(&self.registry, link_type, data);

        let Some((first_name, first)) = results.first() else {
            return Err(DecodeError::UnsupportedLinkType { link_type });
        };
        if let Some(reason) = &first.error {
            return Err(DecodeError::Layer {
                layer: *first_name,
                reason: reason.clone(),
            });
        }

        let mut decoded = DecodedFrame {
            link_type,
            layers: Vec::with_capacity(results.len()),
            ip_protocol: None,
            src_ip: None,
            dst_ip: None,
            src_port: None,
            dst_port: None,
            transport: None,
            arp: None,
            payload: Bytes::new(),
            truncated: None,
        };

        for (name, result) in &results {
            apply_layer(&mut decoded, *name, result);
            if let Some(reason) = &result.error {
                decoded.truncated = Some(format!("{name}: {reason}"));
            }
        }

        if decoded.truncated.is_none() {
            if let Some((_, last)) = results.last() {
                decoded.payload = data.slice_ref(last.remaining);
            }
        }

        Ok(decoded)
    }
}

fn apply_layer(decoded: &mut DecodedFrame, name: &'static str, result: &ParseResult<'_>) {
    let u16_of = |field: &str| result.get(field).and_then(FieldValue::as_u16);
    let u32_of = |field: &str| {
        result
            .get(field)
            .and_then(FieldValue::as_u64)
            .map(|v| v as u32)
    };
    let u8_of = |field: &str| {
        result
            .get(field)
            .and_then(FieldValue::as_u64)
            .map(|v| v as u8)
    };

    match name {
        // Inner headers overwrite outer ones, so the innermost IP wins.
        "ipv4" | "ipv6" if result.is_ok() => {
            decoded.src_ip = result.get("src").and_then(FieldValue::as_ip);
            decoded.dst_ip = result.get("dst").and_then(FieldValue::as_ip);
            decoded.ip_protocol = result.hint("ip_protocol").map(|p| p as u8);
        }
        // A broken header only fills gaps.
        "ipv4" | "ipv6" => {
            let ip = |field: &str| result.get(field).and_then(FieldValue::as_ip);
            decoded.src_ip = decoded.src_ip.or_else(|| ip("src"));
            decoded.dst_ip = decoded.dst_ip.or_else(|| ip("dst"));
        }
        "tcp" if result.is_ok() => {
            decoded.src_port = u16_of("srcport");
            decoded.dst_port = u16_of("dstport");
            decoded.transport = Some(Transport::Tcp {
                seq: u32_of("seq").unwrap_or_default(),
                ack: u32_of("ack").unwrap_or_default(),
                flags: u16_of("flags").unwrap_or_default(),
                window: u16_of("window_size").unwrap_or_default(),
            });
        }
        "udp" if result.is_ok() => {
            decoded.src_port = u16_of("srcport");
            decoded.dst_port = u16_of("dstport");
            decoded.transport = Some(Transport::Udp {
                length: u16_of("length").unwrap_or_default(),
            });
        }
        "icmp" | "icmpv6" if result.is_ok() => {
            decoded.transport = Some(Transport::Icmp {
                icmp_type: u8_of("type").unwrap_or_default(),
                code: u8_of("code").unwrap_or_default(),
                v6: name == "icmpv6",
            });
        }
        "arp" if result.is_ok() => {
            let mac = |field: &str| result.get(field).and_then(FieldValue::as_mac);
            let ip = |field: &str| result.get(field).and_then(FieldValue::as_ip);
            if let (Some(sender_mac), Some(sender_ip), Some(target_mac), Some(target_ip)) = (
                mac("src_hw_mac"),
                ip("src_proto_ipv4"),
                mac("dst_hw_mac"),
                ip("dst_proto_ipv4"),
            ) {
                decoded.arp = Some(ArpInfo {
                    operation: u16_of("opcode").unwrap_or_default(),
                    sender_mac,
                    sender_ip,
                    target_mac,
                    target_ip,
                });
            }
        }
        _ => {}
    }

    decoded.layers.push(Layer {
        name,
        fields: result
            .fields
            .iter()
            .map(|(k, v)| (*k, v.to_owned()))
            .collect(),
    });
}
