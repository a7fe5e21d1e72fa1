//! IPv6 protocol parser. Extension headers are walked and skipped.

use etherparse::Ipv6HeaderSlice;
use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IPv6 Next Header values for extension headers.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AH: u8 = 51;
    pub const DESTINATION: u8 = 60;
    pub const MOBILITY: u8 = 135;
}

/// IPv6 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Protocol;

impl Protocol for Ipv6Protocol {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV6 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match Ipv6HeaderSlice::from_slice(data) {
            Ok(ipv6) => {
                let mut fields = SmallVec::new();

                fields.push(("version", FieldValue::UInt8(6)));
                fields.push(("tclass", FieldValue::UInt8(ipv6.traffic_class())));
                fields.push(("flow", FieldValue::UInt32(ipv6.flow_label().value())));
                fields.push(("plen", FieldValue::UInt16(ipv6.payload_length())));
                fields.push(("nxt", FieldValue::UInt8(ipv6.next_header().0)));
                fields.push(("hlim", FieldValue::UInt8(ipv6.hop_limit())));
                fields.push(("src", FieldValue::ipv6(&ipv6.source())));
                fields.push(("dst", FieldValue::ipv6(&ipv6.destination())));

                let base_header_len = ipv6.slice().len();
                let end = (base_header_len + ipv6.payload_length() as usize).min(data.len());
                let payload = &data[base_header_len..end];

                let Some((final_next_header, ext_len)) =
                    skip_extension_headers(ipv6.next_header().0, payload)
                else {
                    return ParseResult::partial(
                        fields,
                        payload,
                        "IPv6: truncated extension header".to_string(),
                    );
                };

                let mut child_hints = SmallVec::new();
                child_hints.push(("ip_protocol", final_next_header as u64));
                child_hints.push(("ip_version", 6));

                ParseResult::success(fields, &payload[ext_len..], child_hints)
            }
            Err(e) => ParseResult::error(format!("IPv6 parse error: {e}"), data),
        }
    }
}

/// Walk extension headers, returning the upper-layer protocol and the number
/// of bytes they occupy.
fn skip_extension_headers(mut nh: u8, data: &[u8]) -> Option<(u8, usize)> {
    let mut offset = 0;
    loop {
        let header_len = match nh {
            next_header::HOP_BY_HOP
            | next_header::ROUTING
            | next_header::DESTINATION
            | next_header::MOBILITY => (*data.get(offset + 1)? as usize + 1) * 8,
            next_header::FRAGMENT => 8,
            next_header::AH => (*data.get(offset + 1)? as usize + 2) * 4,
            _ => return Some((nh, offset)),
        };
        if offset + header_len > data.len() {
            return None;
        }
        nh = data[offset];
        offset += header_len;
    }
}
