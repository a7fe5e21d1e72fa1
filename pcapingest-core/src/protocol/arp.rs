//! ARP protocol parser.

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// ARP operation codes.
pub mod operation {
    pub const REQUEST: u16 = 1;
    pub const REPLY: u16 = 2;
}

/// ARP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct ArpProtocol;

impl Protocol for ArpProtocol {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn display_name(&self) -> &'static str {
        "ARP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::ARP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        // Ethernet/IPv4 ARP is 28 bytes
        if data.len() < 28 {
            return ParseResult::error(format!("ARP packet too short: {} bytes", data.len()), data);
        }

        let hardware_type = u16::from_be_bytes([data[0], data[1]]);
        let protocol_type = u16::from_be_bytes([data[2], data[3]]);
        let hardware_size = data[4];
        let protocol_size = data[5];
        let operation = u16::from_be_bytes([data[6], data[7]]);

        let mut fields = SmallVec::new();
        fields.push(("hardware_type", FieldValue::UInt16(hardware_type)));
        fields.push(("protocol_type", FieldValue::UInt16(protocol_type)));
        fields.push(("opcode", FieldValue::UInt16(operation)));

        if hardware_type != 1
            || protocol_type != ethertype::IPV4
            || hardware_size != 6
            || protocol_size != 4
        {
            return ParseResult::partial(
                fields,
                &data[8..],
                format!("ARP: unsupported hardware/protocol pair {hardware_type}/{protocol_type:#06x}"),
            );
        }

        fields.push(("src_hw_mac", FieldValue::mac(&data[8..14])));
        fields.push(("src_proto_ipv4", FieldValue::ipv4(&data[14..18])));
        fields.push(("dst_hw_mac", FieldValue::mac(&data[18..24])));
        fields.push(("dst_proto_ipv4", FieldValue::ipv4(&data[24..28])));

        ParseResult::success(fields, &data[28..], SmallVec::new())
    }
}
