//! Raw IP link layer (no link header).

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// LINKTYPE_RAW.
pub const LINKTYPE_RAW: u16 = 101;
/// LINKTYPE_IPV4.
pub const LINKTYPE_IPV4: u16 = 228;
/// LINKTYPE_IPV6.
pub const LINKTYPE_IPV6: u16 = 229;

/// Zero-length link layer that reads the IP version nibble and hands the
/// frame to the matching IP parser.
#[derive(Debug, Clone, Copy)]
pub struct RawIpProtocol;

impl Protocol for RawIpProtocol {
    fn name(&self) -> &'static str {
        "raw_ip"
    }

    fn display_name(&self) -> &'static str {
        "Raw IP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.link_type {
            LINKTYPE_RAW | LINKTYPE_IPV4 | LINKTYPE_IPV6 if context.is_root() => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        let Some(first) = data.first() else {
            return ParseResult::error("Raw IP: empty frame".to_string(), data);
        };

        let version = first >> 4;
        let ethertype = match version {
            4 => ethertype::IPV4,
            6 => ethertype::IPV6,
            v => return ParseResult::error(format!("Raw IP: unknown IP version {v}"), data),
        };

        let mut fields = SmallVec::new();
        fields.push(("version", FieldValue::UInt8(version)));

        let mut child_hints = SmallVec::new();
        child_hints.push(("ethertype", ethertype as u64));

        ParseResult::success(fields, data, child_hints)
    }
}
