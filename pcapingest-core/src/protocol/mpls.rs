//! MPLS label stack parser.
//!
//! RFC 3032: MPLS Label Stack Encoding. MPLS carries no payload type, so the
//! inner protocol is guessed from the first nibble after the bottom of stack.

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{FieldValue, ParseContext, ParseResult, Protocol};

/// Maximum label stack depth accepted before giving up.
const MAX_LABEL_STACK_DEPTH: u8 = 16;

/// MPLS label stack parser.
#[derive(Debug, Clone, Copy)]
pub struct MplsProtocol;

impl Protocol for MplsProtocol {
    fn name(&self) -> &'static str {
        "mpls"
    }

    fn display_name(&self) -> &'static str {
        "MPLS"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::MPLS as u64 => Some(100),
            Some(et) if et == ethertype::MPLS_MULTICAST as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if data.len() < 4 {
            return ParseResult::error("MPLS: label stack entry too short".to_string(), data);
        }

        let mut offset = 0;
        let mut stack_depth = 0u8;
        let mut labels = Vec::new();
        let mut bottom_of_stack = false;
        let mut top = (0u32, 0u8, 0u8);

        // label:20 | tc:3 | s:1 | ttl:8
        while !bottom_of_stack && offset + 4 <= data.len() {
            if stack_depth >= MAX_LABEL_STACK_DEPTH {
                return ParseResult::error(
                    format!("MPLS: label stack too deep (max {MAX_LABEL_STACK_DEPTH})"),
                    data,
                );
            }

            let entry = u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]);
            let label = (entry >> 12) & 0xFFFFF;
            bottom_of_stack = (entry >> 8) & 0x01 == 1;

            if stack_depth == 0 {
                top = (label, ((entry >> 9) & 0x07) as u8, (entry & 0xFF) as u8);
            }

            labels.push(FieldValue::UInt32(label));
            stack_depth += 1;
            offset += 4;
        }

        let mut fields = SmallVec::new();
        fields.push(("label", FieldValue::UInt32(top.0)));
        fields.push(("tc", FieldValue::UInt8(top.1)));
        fields.push(("ttl", FieldValue::UInt8(top.2)));
        fields.push(("bottom", FieldValue::Bool(bottom_of_stack)));
        fields.push(("stack_depth", FieldValue::UInt8(stack_depth)));
        fields.push(("labels", FieldValue::List(labels)));

        if !bottom_of_stack {
            return ParseResult::partial(
                fields,
                &data[offset..],
                "MPLS: bottom of stack not reached".to_string(),
            );
        }

        let mut child_hints = SmallVec::new();
        match data.get(offset).map(|b| b >> 4) {
            Some(4) => child_hints.push(("ethertype", ethertype::IPV4 as u64)),
            Some(6) => child_hints.push(("ethertype", ethertype::IPV6 as u64)),
            _ => {}
        }

        ParseResult::success(fields, &data[offset..], child_hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_mpls_label(label: u32, tc: u8, bottom: bool, ttl: u8) -> [u8; 4] {
        let entry = ((label & 0xFFFFF) << 12)
            | ((tc as u32 & 0x07) << 9)
            | ((bottom as u32) << 8)
            | (ttl as u32 & 0xFF);
        entry.to_be_bytes()
    }

    fn mpls_context() -> ParseContext {
        let mut ctx = ParseContext::new(1);
        ctx.set_hint("ethertype", ethertype::MPLS as u64);
        ctx.parent_protocol = Some("ethernet");
        ctx
    }

    #[test]
    fn test_can_parse_with_mpls_ethertype() {
        let parser = MplsProtocol;
        assert!(parser.can_parse(&ParseContext::new(1)).is_none());
        assert!(parser.can_parse(&mpls_context()).is_some());

        let mut ipv4 = ParseContext::new(1);
        ipv4.set_hint("ethertype", ethertype::IPV4 as u64);
        assert!(parser.can_parse(&ipv4).is_none());
    }

    #[test]
    fn test_two_label_stack_ipv4_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&create_mpls_label(1000, 3, false, 64));
        data.extend_from_slice(&create_mpls_label(2000, 0, true, 63));
        data.extend_from_slice(&[0x45, 0x00, 0x00, 0x28]);

        let result = MplsProtocol.parse(&data, &mpls_context());

        assert!(result.is_ok());
        assert_eq!(result.get("label"), Some(&FieldValue::UInt32(1000)));
        assert_eq!(result.get("tc"), Some(&FieldValue::UInt8(3)));
        assert_eq!(result.get("stack_depth"), Some(&FieldValue::UInt8(2)));
        assert_eq!(result.hint("ethertype"), Some(ethertype::IPV4 as u64));
        assert_eq!(result.remaining.len(), 4);
    }

    #[test]
    fn test_ipv6_payload_detected() {
        let mut data = create_mpls_label(16, 0, true, 255).to_vec();
        data.push(0x60);
        let result = MplsProtocol.parse(&data, &mpls_context());
        assert_eq!(result.hint("ethertype"), Some(ethertype::IPV6 as u64));
    }

    #[test]
    fn test_unterminated_stack_is_partial() {
        let data = create_mpls_label(1000, 0, false, 64);
        let result = MplsProtocol.parse(&data, &mpls_context());
        assert!(!result.is_ok());
        assert_eq!(result.get("label"), Some(&FieldValue::UInt32(1000)));
    }
}
