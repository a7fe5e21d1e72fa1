//! Application protocol classification.
//!
//! A [`ProtocolClassifier`] is an ordered list of [`Rule`]s evaluated against
//! header fields and the first payload bytes of a single frame. The first
//! rule that yields a label wins:
//!
//! 1. payload signature (DNS header shape, HTTP start line, TLS record header)
//! 2. well-known port
//! 3. transport label (TCP/UDP/ICMP/ARP)
//! 4. IP protocol number
//! 5. `"Other"`
//!
//! [`OPAQUE_LABEL`] is never returned for a frame with a transport header.

use httparse::{Request, Response, Status, EMPTY_HEADER};

use crate::decode::DecodedFrame;

/// Label of an unclassified transport payload. Seeing it downstream means a
/// rule set is broken.
pub const OPAQUE_LABEL: &str = "DATA";

/// Label of last resort.
pub const FALLBACK_LABEL: &str = "Other";

/// Maximum headers httparse may fill while sniffing a start line.
const MAX_SNIFF_HEADERS: usize = 32;

/// One classification step.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub matcher: fn(&DecodedFrame) -> Option<&'static str>,
}

impl Rule {
    pub const fn new(name: &'static str, matcher: fn(&DecodedFrame) -> Option<&'static str>) -> Self {
        Self { name, matcher }
    }
}

/// Rule-driven protocol classifier.
#[derive(Debug, Clone)]
pub struct ProtocolClassifier {
    rules: Vec<Rule>,
}

impl Default for ProtocolClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolClassifier {
    /// Classifier with the built-in precedence.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Label for one decoded frame.
    pub fn classify(&self, frame: &DecodedFrame) -> &'static str {
        let label = self
            .rules
            .iter()
            .find_map(|rule| (rule.matcher)(frame))
            .unwrap_or(FALLBACK_LABEL);

        match frame.transport {
            Some(transport) if label == OPAQUE_LABEL => transport.label(),
            _ => label,
        }
    }
}

/// The built-in rule list, highest precedence first.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("signature", signature_rule),
        Rule::new("port", port_rule),
        Rule::new("transport", transport_rule),
        Rule::new("ip_protocol", ip_protocol_rule),
    ]
}

/// DNS-family label for the ports of `frame`, if any.
pub fn dns_family_label(frame: &DecodedFrame) -> Option<&'static str> {
    if frame.has_port(5353) {
        Some("mDNS")
    } else if frame.has_port(5355) {
        Some("LLMNR")
    } else if frame.has_port(137) {
        Some("NBNS")
    } else if frame.has_port(53) {
        Some("DNS")
    } else {
        None
    }
}

/// Application payload signatures.
pub fn signature_rule(frame: &DecodedFrame) -> Option<&'static str> {
    let payload = &frame.payload[..];
    if payload.is_empty() {
        return None;
    }

    if let Some(label) = dns_family_label(frame) {
        if looks_like_dns(dns_message(frame)) {
            return Some(label);
        }
    }

    if frame.is_tcp() {
        if http_start_line(payload).is_some() {
            return Some("HTTP");
        }
        if looks_like_tls(payload) {
            return Some("TLS");
        }
    }

    None
}

/// Well-known ports, scoped to the transport they run over.
pub fn port_rule(frame: &DecodedFrame) -> Option<&'static str> {
    if !frame.is_tcp() && !frame.is_udp() {
        return None;
    }

    if let Some(label) = dns_family_label(frame) {
        return Some(label);
    }

    let any = |ports: &[u16]| ports.iter().any(|p| frame.has_port(*p));
    if frame.is_tcp() {
        if any(&[80, 8080]) {
            return Some("HTTP");
        }
        if any(&[443]) {
            return Some("TLS");
        }
        if any(&[22]) {
            return Some("SSH");
        }
    } else {
        if any(&[67, 68]) {
            return Some("DHCP");
        }
        if any(&[123]) {
            return Some("NTP");
        }
        if any(&[1900]) {
            return Some("SSDP");
        }
    }
    None
}

/// Transport header present, or an ARP frame.
pub fn transport_rule(frame: &DecodedFrame) -> Option<&'static str> {
    match frame.transport {
        Some(transport) => Some(transport.label()),
        None if frame.layer("arp").is_some() => Some("ARP"),
        None => None,
    }
}

/// IP protocol number lookup.
pub fn ip_protocol_rule(frame: &DecodedFrame) -> Option<&'static str> {
    frame.ip_protocol.and_then(ip_protocol_name)
}

/// Name of an IP protocol number.
pub fn ip_protocol_name(number: u8) -> Option<&'static str> {
    Some(match number {
        1 => "ICMP",
        2 => "IGMP",
        4 => "IP-in-IP",
        6 => "TCP",
        17 => "UDP",
        27 => "RDP",
        41 => "IPv6",
        47 => "GRE",
        50 => "ESP",
        51 => "AH",
        58 => "ICMPv6",
        88 => "EIGRP",
        89 => "OSPF",
        103 => "PIM",
        112 => "VRRP",
        115 => "L2TP",
        132 => "SCTP",
        137 => "MPLS-in-IP",
        _ => return None,
    })
}

/// DNS message bytes of the payload; TCP carries a 2-byte length prefix.
pub fn dns_message(frame: &DecodedFrame) -> &[u8] {
    let payload = &frame.payload[..];
    if frame.is_tcp() && payload.len() > 2 {
        &payload[2..]
    } else {
        payload
    }
}

/// Cheap DNS header shape check: sane counts and opcode, and a well-formed
/// first question name.
fn looks_like_dns(msg: &[u8]) -> bool {
    if msg.len() < 12 {
        return false;
    }
    let opcode = (msg[2] >> 3) & 0x0F;
    let count = |i: usize| u16::from_be_bytes([msg[i], msg[i + 1]]);
    let (qd, an, ns, ar) = (count(4), count(6), count(8), count(10));

    if !matches!(opcode, 0 | 1 | 2 | 4 | 5) || qd > 16 || an > 256 || ns > 256 || ar > 256 {
        return false;
    }
    if qd == 0 {
        return an > 0;
    }

    let mut pos = 12;
    for _ in 0..128 {
        let Some(&len) = msg.get(pos) else {
            return false;
        };
        match len {
            0 => return msg.len() >= pos + 5,
            1..=63 => pos += 1 + len as usize,
            l if l & 0xC0 == 0xC0 => return msg.len() >= pos + 6,
            _ => return false,
        }
    }
    false
}

fn looks_like_tls(payload: &[u8]) -> bool {
    // content type: change_cipher_spec, alert, handshake, application_data
    payload.len() >= 5 && (20..=23).contains(&payload[0]) && payload[1] == 3 && payload[2] <= 4
}

/// First line of an HTTP/1.x message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpStartLine {
    Request { method: String, uri: String },
    Response { code: u16, reason: String },
}

/// Parse an HTTP/1.x request or status line from the start of `payload`.
pub fn http_start_line(payload: &[u8]) -> Option<HttpStartLine> {
    if payload.starts_with(b"HTTP/") {
        let mut headers = [EMPTY_HEADER; MAX_SNIFF_HEADERS];
        let mut response = Response::new(&mut headers);
        return match response.parse(payload) {
            Ok(Status::Complete(_)) | Ok(Status::Partial) => Some(HttpStartLine::Response {
                code: response.code?,
                reason: response.reason.unwrap_or_default().to_string(),
            }),
            Err(_) => None,
        };
    }

    let mut headers = [EMPTY_HEADER; MAX_SNIFF_HEADERS];
    let mut request = Request::new(&mut headers);
    match request.parse(payload) {
        Ok(Status::Complete(_)) | Ok(Status::Partial) => Some(HttpStartLine::Request {
            method: request.method?.to_string(),
            uri: request.path?.to_string(),
        }),
        Err(_) => None,
    }
}
