//! ICMP (IPv4) header parser.

use smallvec::SmallVec;

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IP protocol number for ICMP.
pub const IP_PROTO_ICMP: u8 = 1;

/// ICMP type constants.
pub mod icmp_type {
    pub const ECHO_REPLY: u8 = 0;
    pub const DESTINATION_UNREACHABLE: u8 = 3;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
}

/// ICMP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct IcmpProtocol;

impl Protocol for IcmpProtocol {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn display_name(&self) -> &'static str {
        "ICMP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == IP_PROTO_ICMP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < 4 {
            return ParseResult::error(format!("ICMP header too short: {} bytes", data.len()), data);
        }

        let icmp_type = data[0];
        let mut fields = SmallVec::new();
        fields.push(("type", FieldValue::UInt8(icmp_type)));
        fields.push(("code", FieldValue::UInt8(data[1])));
        fields.push(("checksum", FieldValue::UInt16(u16::from_be_bytes([data[2], data[3]]))));

        if matches!(icmp_type, icmp_type::ECHO_REQUEST | icmp_type::ECHO_REPLY) && data.len() >= 8 {
            fields.push(("ident", FieldValue::UInt16(u16::from_be_bytes([data[4], data[5]]))));
            fields.push(("seq", FieldValue::UInt16(u16::from_be_bytes([data[6], data[7]]))));
        }

        let mut child_hints = SmallVec::new();
        child_hints.push(("transport", IP_PROTO_ICMP as u64));

        let header_len = data.len().min(8);
        ParseResult::success(fields, &data[header_len..], child_hints)
    }
}
