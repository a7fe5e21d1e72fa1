//! ICMPv6 header parser.

use smallvec::SmallVec;

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IP next-header value for ICMPv6.
pub const IP_PROTO_ICMPV6: u8 = 58;

/// ICMPv6 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Icmpv6Protocol;

impl Protocol for Icmpv6Protocol {
    fn name(&self) -> &'static str {
        "icmpv6"
    }

    fn display_name(&self) -> &'static str {
        "ICMPv6"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_ICMPV6 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < 4 {
            return ParseResult::error(
                format!("ICMPv6 header too short: {} bytes", data.len()),
                data,
            );
        }

        let mut fields = SmallVec::new();
        fields.push(("type", FieldValue::UInt8(data[0])));
        fields.push(("code", FieldValue::UInt8(data[1])));
        fields.push(("checksum", FieldValue::UInt16(u16::from_be_bytes([data[2], data[3]]))));

        let mut child_hints = SmallVec::new();
        child_hints.push(("transport", IP_PROTO_ICMPV6 as u64));

        ParseResult::success(fields, &data[4..], child_hints)
    }
}
