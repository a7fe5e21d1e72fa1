//! TCP header parser.

use smallvec::SmallVec;

use etherparse::{TcpHeaderSlice, TcpOptionElement};

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IP protocol number for TCP.
pub const IP_PROTO_TCP: u8 = 6;

/// TCP flag bits.
pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
}

const FLAG_NAMES: [(u16, &str); 8] = [
    (flags::SYN, "SYN"),
    (flags::FIN, "FIN"),
    (flags::RST, "RST"),
    (flags::PSH, "PSH"),
    (flags::ACK, "ACK"),
    (flags::URG, "URG"),
    (flags::ECE, "ECE"),
    (flags::CWR, "CWR"),
];

/// Names of the flags set in `bits`, in display order (`SYN, ACK`).
pub fn flag_names(bits: u16) -> SmallVec<[&'static str; 8]> {
    FLAG_NAMES
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

fn header_flags(tcp: &TcpHeaderSlice<'_>) -> u16 {
    [
        (tcp.fin(), flags::FIN),
        (tcp.syn(), flags::SYN),
        (tcp.rst(), flags::RST),
        (tcp.psh(), flags::PSH),
        (tcp.ack(), flags::ACK),
        (tcp.urg(), flags::URG),
        (tcp.ece(), flags::ECE),
        (tcp.cwr(), flags::CWR),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .fold(0, |acc, (_, bit)| acc | bit)
}

/// Option names in wire order, malformed options skipped.
fn option_names(tcp: &TcpHeaderSlice<'_>) -> Vec<FieldValue<'static>> {
    tcp.options_iterator()
        .filter_map(Result::ok)
        .filter_map(|opt| match opt {
            TcpOptionElement::Noop => None,
            TcpOptionElement::MaximumSegmentSize(_) => Some("MSS"),
            TcpOptionElement::WindowScale(_) => Some("WS"),
            TcpOptionElement::SelectiveAcknowledgementPermitted => Some("SACK_PERM"),
            TcpOptionElement::SelectiveAcknowledgement(_, _) => Some("SACK"),
            TcpOptionElement::Timestamp(_, _) => Some("TS"),
        })
        .map(FieldValue::Str)
        .collect()
}

/// TCP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_TCP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match TcpHeaderSlice::from_slice(data) {
            Ok(tcp) => {
                let tcp_flags = header_flags(&tcp);

                let mut fields = SmallVec::new();
                fields.push(("srcport", FieldValue::UInt16(tcp.source_port())));
                fields.push(("dstport", FieldValue::UInt16(tcp.destination_port())));
                fields.push(("seq", FieldValue::UInt32(tcp.sequence_number())));
                fields.push(("ack", FieldValue::UInt32(tcp.acknowledgment_number())));
                fields.push(("hdr_len", FieldValue::UInt8(tcp.data_offset() * 4)));
                fields.push(("flags", FieldValue::UInt16(tcp_flags)));
                fields.push(("window_size", FieldValue::UInt16(tcp.window_size())));
                fields.push(("checksum", FieldValue::UInt16(tcp.checksum())));
                fields.push(("urgent_pointer", FieldValue::UInt16(tcp.urgent_pointer())));

                let options = option_names(&tcp);
                if !options.is_empty() {
                    fields.push(("options", FieldValue::List(options)));
                }

                let mut child_hints = SmallVec::new();
                child_hints.push(("src_port", tcp.source_port() as u64));
                child_hints.push(("dst_port", tcp.destination_port() as u64));
                child_hints.push(("transport", IP_PROTO_TCP as u64));

                let header_len = tcp.slice().len();
                ParseResult::success(fields, &data[header_len..], child_hints)
            }
            Err(e) => ParseResult::error(format!("TCP parse error: {e}"), data),
        }
    }
}
