//! Linux cooked capture (SLL) header parser.
//!
//! Used when capturing on the "any" interface (LINKTYPE_LINUX_SLL = 113).

use smallvec::SmallVec;

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// PCAP link type for Linux SLL captures.
pub const LINKTYPE_LINUX_SLL: u16 = 113;

/// Linux SLL header length in bytes.
pub const LINUX_SLL_HEADER_LEN: usize = 16;

fn packet_type_name(pkt_type: u16) -> &'static str {
    match pkt_type {
        0 => "HOST",
        1 => "BROADCAST",
        2 => "MULTICAST",
        3 => "OTHERHOST",
        4 => "OUTGOING",
        _ => "UNKNOWN",
    }
}

/// Linux SLL parser. The protocol field is an EtherType for the link types
/// we follow.
#[derive(Debug, Clone, Copy)]
pub struct LinuxSllProtocol;

impl Protocol for LinuxSllProtocol {
    fn name(&self) -> &'static str {
        "linux_sll"
    }

    fn display_name(&self) -> &'static str {
        "Linux SLL"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.is_root() && context.link_type == LINKTYPE_LINUX_SLL {
            return Some(100);
        }
        None
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < LINUX_SLL_HEADER_LEN {
            return ParseResult::error(
                format!("Linux SLL header too short: {} bytes", data.len()),
                data,
            );
        }

        let pkt_type = u16::from_be_bytes([data[0], data[1]]);
        let arphrd_type = u16::from_be_bytes([data[2], data[3]]);
        let addr_len = u16::from_be_bytes([data[4], data[5]]);
        let protocol = u16::from_be_bytes([data[14], data[15]]);

        let mut fields = SmallVec::new();
        fields.push(("packet_type", FieldValue::Str(packet_type_name(pkt_type))));
        fields.push(("arphrd_type", FieldValue::UInt16(arphrd_type)));

        let valid_addr_len = (addr_len as usize).min(8);
        if valid_addr_len == 6 {
            fields.push(("src", FieldValue::mac(&data[6..12])));
        } else if valid_addr_len > 0 {
            fields.push(("src", FieldValue::Bytes(&data[6..6 + valid_addr_len])));
        }
        fields.push(("protocol", FieldValue::UInt16(protocol)));

        let mut child_hints = SmallVec::new();
        child_hints.push(("ethertype", protocol as u64));

        ParseResult::success(fields, &data[LINUX_SLL_HEADER_LEN..], child_hints)
    }
}
