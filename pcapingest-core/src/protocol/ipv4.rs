//! IPv4 protocol parser.

use smallvec::SmallVec;

use etherparse::Ipv4HeaderSlice;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// IPv4 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Protocol;

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV4 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        match Ipv4HeaderSlice::from_slice(data) {
            Ok(ipv4) => {
                let mut fields = SmallVec::new();

                fields.push(("version", FieldValue::UInt8(4)));
                fields.push(("hdr_len", FieldValue::UInt8(ipv4.ihl() * 4)));
                fields.push(("dsfield", FieldValue::UInt8(ipv4.dcp().value())));
                fields.push(("len", FieldValue::UInt16(ipv4.total_len())));
                fields.push(("id", FieldValue::UInt16(ipv4.identification())));
                fields.push(("flags_df", FieldValue::Bool(ipv4.dont_fragment())));
                fields.push(("flags_mf", FieldValue::Bool(ipv4.more_fragments())));
                fields.push(("frag_offset", FieldValue::UInt16(ipv4.fragments_offset().value())));
                fields.push(("ttl", FieldValue::UInt8(ipv4.ttl())));
                fields.push(("proto", FieldValue::UInt8(ipv4.protocol().0)));
                fields.push(("checksum", FieldValue::UInt16(ipv4.header_checksum())));
                fields.push(("src", FieldValue::ipv4(&ipv4.source())));
                fields.push(("dst", FieldValue::ipv4(&ipv4.destination())));

                let mut child_hints = SmallVec::new();
                child_hints.push(("ip_protocol", ipv4.protocol().0 as u64));
                child_hints.push(("ip_version", 4));

                // Drop link-layer padding past the datagram's total length.
                let header_len = ipv4.slice().len();
                let end = (ipv4.total_len() as usize).clamp(header_len, data.len());
                ParseResult::success(fields, &data[header_len..end], child_hints)
            }
            Err(e) => ParseResult::error(format!("IPv4 parse error: {e}"), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn ipv4_context() -> ParseContext {
        let mut context = ParseContext::new(1);
        context.set_hint("ethertype", ethertype::IPV4 as u64);
        context.parent_protocol = Some("ethernet");
        context
    }

    #[test]
    fn test_parse_ipv4() {
        let header = [
            0x45, // Version (4) + IHL (5)
            0x00, // DSCP + ECN
            0x00, 0x14, // Total length: 20
            0x00, 0x01, // Identification
            0x40, 0x00, // Flags (DF) + Fragment offset
            0x40, // TTL: 64
            0x06, // Protocol: TCP (6)
            0x00, 0x00, // Checksum (not validated)
            0xc0, 0xa8, 0x01, 0x01, // Src: 192.168.1.1
            0xc0, 0xa8, 0x01, 0x02, // Dst: 192.168.1.2
        ];

        let result = Ipv4Protocol.parse(&header, &ipv4_context());

        assert!(result.is_ok());
        assert_eq!(result.get("ttl"), Some(&FieldValue::UInt8(64)));
        assert_eq!(result.get("proto"), Some(&FieldValue::UInt8(6)));
        assert_eq!(result.get("flags_df"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            result.get("src").and_then(|v| v.as_ip()),
            Some("192.168.1.1".parse::<IpAddr>().unwrap())
        );
        assert_eq!(result.hint("ip_protocol"), Some(6u64));
        assert!(result.remaining.is_empty());
    }

    #[test]
    fn test_padding_trimmed() {
        let mut packet = vec![
            0x45, 0x00, 0x00, 0x18, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, 10, 0, 0, 1,
            10, 0, 0, 2,
        ];
        packet.extend_from_slice(&[1, 2, 3, 4]); // 4 payload bytes
        packet.extend_from_slice(&[0; 6]); // Ethernet padding

        let result = Ipv4Protocol.parse(&packet, &ipv4_context());
        assert_eq!(result.remaining, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_ipv4_too_short() {
        let result = Ipv4Protocol.parse(&[0x45, 0x00, 0x00], &ipv4_context());
        assert!(!result.is_ok());
    }
}
