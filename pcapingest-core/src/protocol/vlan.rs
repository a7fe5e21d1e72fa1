//! IEEE 802.1Q / 802.1ad VLAN tag parser.

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// VLAN tag parser. Handles stacked (QinQ) tags one layer at a time.
#[derive(Debug, Clone, Copy)]
pub struct VlanProtocol;

impl Protocol for VlanProtocol {
    fn name(&self) -> &'static str {
        "vlan"
    }

    fn display_name(&self) -> &'static str {
        "802.1Q VLAN"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et)
                if et == ethertype::VLAN as u64
                    || et == ethertype::QINQ as u64
                    || et == ethertype::QINQ_OLD as u64 =>
            {
                Some(100)
            }
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        // The TPID was consumed by the previous layer; TCI + inner EtherType remain.
        if data.len() < 4 {
            return ParseResult::error("VLAN tag too short".to_string(), data);
        }

        let tci = u16::from_be_bytes([data[0], data[1]]);
        let vlan_id = tci & 0x0FFF;
        let inner_ethertype = u16::from_be_bytes([data[2], data[3]]);

        let mut fields = SmallVec::new();
        fields.push(("priority", FieldValue::UInt8(((tci >> 13) & 0x07) as u8)));
        fields.push(("dei", FieldValue::Bool((tci >> 12) & 0x01 != 0)));
        fields.push(("id", FieldValue::UInt16(vlan_id)));
        fields.push(("etype", FieldValue::UInt16(inner_ethertype)));

        let mut child_hints = SmallVec::new();
        child_hints.push(("ethertype", inner_ethertype as u64));
        child_hints.push(("vlan_id", vlan_id as u64));

        ParseResult::success(fields, &data[4..], child_hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_vlan_tag(vlan_id: u16, priority: u8, dei: bool, inner_ethertype: u16) -> Vec<u8> {
        let tci = ((priority as u16 & 0x07) << 13) | ((dei as u16) << 12) | (vlan_id & 0x0FFF);
        let mut tag = tci.to_be_bytes().to_vec();
        tag.extend_from_slice(&inner_ethertype.to_be_bytes());
        tag
    }

    #[test]
    fn test_parse_vlan_with_priority() {
        let tag = create_vlan_tag(200, 5, true, ethertype::IPV6);
        let mut context = ParseContext::new(1);
        context.set_hint("ethertype", ethertype::VLAN as u64);
        context.parent_protocol = Some("ethernet");

        let result = VlanProtocol.parse(&tag, &context);

        assert!(result.is_ok());
        assert_eq!(result.get("id"), Some(&FieldValue::UInt16(200)));
        assert_eq!(result.get("priority"), Some(&FieldValue::UInt8(5)));
        assert_eq!(result.get("dei"), Some(&FieldValue::Bool(true)));
        assert_eq!(result.hint("ethertype"), Some(ethertype::IPV6 as u64));
    }

    #[test]
    fn test_qinq_outer_tag_accepted() {
        let mut context = ParseContext::new(1);
        context.set_hint("ethertype", ethertype::QINQ as u64);
        assert_eq!(VlanProtocol.can_parse(&context), Some(100));

        // Outer tag points at an inner 802.1Q tag
        let tag = create_vlan_tag(10, 0, false, ethertype::VLAN);
        let result = VlanProtocol.parse(&tag, &context);
        assert_eq!(result.hint("ethertype"), Some(ethertype::VLAN as u64));
    }

    #[test]
    fn test_vlan_too_short() {
        let result = VlanProtocol.parse(&[0x00, 0x64], &ParseContext::new(1));
        assert!(!result.is_ok());
    }
}
