//! UDP header parser.

use smallvec::SmallVec;

use etherparse::UdpHeaderSlice;

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IP protocol number for UDP.
pub const IP_PROTO_UDP: u8 = 17;

/// UDP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_UDP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match UdpHeaderSlice::from_slice(data) {
            Ok(udp) => {
                let mut fields = SmallVec::new();

                fields.push(("srcport", FieldValue::UInt16(udp.source_port())));
                fields.push(("dstport", FieldValue::UInt16(udp.destination_port())));
                fields.push(("length", FieldValue::UInt16(udp.length())));
                fields.push(("checksum", FieldValue::UInt16(udp.checksum())));

                let mut child_hints = SmallVec::new();
                child_hints.push(("src_port", udp.source_port() as u64));
                child_hints.push(("dst_port", udp.destination_port() as u64));
                child_hints.push(("transport", IP_PROTO_UDP as u64));

                // The length field covers header + payload; trust the capture when it lies.
                let end = (udp.length() as usize).clamp(8, data.len());
                ParseResult::success(fields, &data[8..end], child_hints)
            }
            Err(e) => ParseResult::error(format!("UDP parse error: {e}"), data),
        }
    }
}
