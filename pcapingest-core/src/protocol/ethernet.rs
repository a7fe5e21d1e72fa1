//! Ethernet II parser.

use smallvec::SmallVec;

use etherparse::Ethernet2HeaderSlice;

use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// Link type constant for Ethernet.
pub const LINKTYPE_ETHERNET: u16 = 1;

/// EtherType values the decoder follows.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
    pub const QINQ_OLD: u16 = 0x9100;
    pub const MPLS: u16 = 0x8847;
    pub const MPLS_MULTICAST: u16 = 0x8848;
}

/// Ethernet II parser.
#[derive(Debug, Clone, Copy)]
pub struct EthernetProtocol;

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.is_root() && context.link_type == LINKTYPE_ETHERNET {
            return Some(100);
        }
        None
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match Ethernet2HeaderSlice::from_slice(data) {
            Ok(eth) => {
                let mut fields = SmallVec::new();

                fields.push(("src", FieldValue::mac(&eth.source())));
                fields.push(("dst", FieldValue::mac(&eth.destination())));
                fields.push(("type", FieldValue::UInt16(eth.ether_type().0)));

                let mut child_hints = SmallVec::new();
                child_hints.push(("ethertype", eth.ether_type().0 as u64));

                let header_len = eth.slice().len();
                ParseResult::success(fields, &data[header_len..], child_hints)
            }
            Err(e) => ParseResult::error(format!("Ethernet parse error: {e}"), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ethernet() {
        let frame = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // dst: broadcast
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x08, 0x00, // ethertype: IPv4
            0x45, 0x00, // IPv4 header start (payload)
        ];

        let result = EthernetProtocol.parse(&frame, &ParseContext::new(LINKTYPE_ETHERNET));

        assert!(result.is_ok());
        assert_eq!(result.get("type"), Some(&FieldValue::UInt16(ethertype::IPV4)));
        assert_eq!(
            result.get("src").and_then(FieldValue::as_mac),
            Some([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
        assert_eq!(result.remaining.len(), 2);
        assert_eq!(result.hint("ethertype"), Some(ethertype::IPV4 as u64));
    }

    #[test]
    fn test_can_parse_only_at_root() {
        let parser = EthernetProtocol;
        assert!(parser.can_parse(&ParseContext::new(LINKTYPE_ETHERNET)).is_some());
        assert!(parser.can_parse(&ParseContext::new(113)).is_none());

        let mut child_ctx = ParseContext::new(LINKTYPE_ETHERNET);
        child_ctx.parent_protocol = Some("vlan");
        assert!(parser.can_parse(&child_ctx).is_none());
    }

    #[test]
    fn test_parse_ethernet_too_short() {
        let result = EthernetProtocol.parse(&[0xff; 5], &ParseContext::new(LINKTYPE_ETHERNET));
        assert!(!result.is_ok());
    }
}
