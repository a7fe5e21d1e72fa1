//! Layer parsing framework.
//!
//! This module provides:
//! - [`Protocol`] trait implemented by every layer parser
//! - [`ProtocolRegistry`] for hint-driven parser selection
//! - Built-in parsers from the link layer up to the transport layer
//!
//! ## Supported Layers
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet, Linux SLL, raw IP |
//! | Tags | VLAN (802.1Q / QinQ), MPLS |
//! | Network | IPv4, IPv6, ARP |
//! | Transport | TCP, UDP, ICMP, ICMPv6 |
//!
//! Application payloads are left in place for the classifier and the field
//! extractor; no parser here looks past the transport header.
//!
//! ## Example
//!
//! ```rust
//! use pcapingest_core::protocol::{default_registry, parse_packet};
//!
//! let registry = default_registry();
//! let frame: &[u8] = &[
//!     0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // dst mac
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // src mac
//!     0x08, 0x06,                         // ethertype (ARP)
//! ];
//!
//! let layers = parse_packet(&registry, 1, frame);
//! assert_eq!(layers[0].0, "ethernet");
//! ```

mod context;
mod field;
mod registry;

mod arp;
mod ethernet;
mod icmp;
mod icmpv6;
mod ipv4;
mod ipv6;
mod linux_sll;
mod mpls;
mod raw_ip;
mod tcp;
mod udp;
mod vlan;

#[cfg(test)]
pub mod test_utils;

pub use context::{FieldEntry, HintEntry, ParseContext, ParseResult};
pub use field::{FieldValue, OwnedFieldValue};
pub use registry::{BuiltinProtocol, Protocol, ProtocolRegistry};

pub use arp::ArpProtocol;
pub use ethernet::EthernetProtocol;
pub use icmp::IcmpProtocol;
pub use icmpv6::Icmpv6Protocol;
pub use ipv4::Ipv4Protocol;
pub use ipv6::Ipv6Protocol;
pub use linux_sll::LinuxSllProtocol;
pub use mpls::MplsProtocol;
pub use raw_ip::RawIpProtocol;
pub use tcp::TcpProtocol;
pub use udp::UdpProtocol;
pub use vlan::VlanProtocol;

pub use arp::operation as arp_operation;
pub use ethernet::{ethertype, LINKTYPE_ETHERNET};
pub use icmp::{icmp_type, IP_PROTO_ICMP};
pub use icmpv6::IP_PROTO_ICMPV6;
pub use linux_sll::LINKTYPE_LINUX_SLL;
pub use raw_ip::{LINKTYPE_IPV4, LINKTYPE_IPV6, LINKTYPE_RAW};
pub use tcp::{flag_names as tcp_flag_names, flags as tcp_flags, IP_PROTO_TCP};
pub use udp::IP_PROTO_UDP;

/// Maximum number of stacked VLAN/MPLS headers before the walk gives up.
pub const MAX_TAG_DEPTH: u8 = 8;

/// Create a registry with all built-in layer parsers.
pub fn default_registry() -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();

    // Link
    registry.register(EthernetProtocol);
    registry.register(LinuxSllProtocol);
    registry.register(RawIpProtocol);

    // Tags
    registry.register(VlanProtocol);
    registry.register(MplsProtocol);

    // Network
    registry.register(ArpProtocol);
    registry.register(Ipv4Protocol);
    registry.register(Ipv6Protocol);

    // Transport
    registry.register(TcpProtocol);
    registry.register(UdpProtocol);
    registry.register(IcmpProtocol);
    registry.register(Icmpv6Protocol);

    registry
}

/// Parse a frame through all layers up to and including the transport header.
///
/// The walk stops at the first layer that reports an error (its partial
/// fields are kept), when no parser accepts the current hints, once a
/// transport header has been parsed, or when tag nesting exceeds
/// [`MAX_TAG_DEPTH`]. The last result's `remaining` is the transport payload.
pub fn parse_packet<'a>(
    registry: &ProtocolRegistry,
    link_type: u16,
    data: &'a [u8],
) -> Vec<(&'static str, ParseResult<'a>)> {
    // Eth/VLAN/IP/TCP is the common worst case
    let mut results = Vec::with_capacity(4);
    let mut context = ParseContext::new(link_type);
    let mut remaining = data;

    while !remaining.is_empty() {
        let Some(parser) = registry.find_parser(&context) else {
            break;
        };

        let name = parser.name();
        let result = parser.parse(remaining, &context);

        if matches!(name, "vlan" | "mpls") {
            context.tag_depth += 1;
        }
        context.parent_protocol = Some(name);
        context.hints = result.child_hints.clone();

        let should_stop = result.error.is_some()
            || result.hint("transport").is_some()
            || context.tag_depth > MAX_TAG_DEPTH;
        remaining = result.remaining;

        results.push((name, result));

        if should_stop {
            break;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;

    #[test]
    fn test_parse_ethernet_ipv4_udp_chain() {
        let frame = udp_frame(40000, 53, b"payload");
        let registry = default_registry();

        let results = parse_packet(&registry, 1, &frame);
        let names: Vec<_> = results.iter().map(|(n, _)| *n).collect();

        assert_eq!(names, vec!["ethernet", "ipv4", "udp"]);
        assert_eq!(results[2].1.remaining, b"payload");
    }

    #[test]
    fn test_vlan_tag_stripped() {
        let ip = Ipv4Builder::new()
            .icmp()
            .payload(&IcmpBuilder::echo_request(1, 1).build())
            .build();
        let frame = EthernetBuilder::new().vlan(100).payload(&ip).build();

        let results = parse_packet(&default_registry(), 1, &frame);
        let names: Vec<_> = results.iter().map(|(n, _)| *n).collect();

        assert_eq!(names, vec!["ethernet", "vlan", "ipv4", "icmp"]);
    }

    #[test]
    fn test_stops_on_layer_error() {
        let frame = EthernetBuilder::new().payload(&[0x45, 0x00, 0x00]).build();
        let results = parse_packet(&default_registry(), 1, &frame);

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(!results[1].1.is_ok());
    }

    #[test]
    fn test_tag_loop_bounded() {
        // Ten nested VLAN tags, each pointing at another VLAN tag
        let mut tags = Vec::new();
        for _ in 0..10 {
            tags.extend_from_slice(&[0x00, 0x01, 0x81, 0x00]);
        }
        let frame = EthernetBuilder::new().ethertype(0x8100).payload(&tags).build();
        let results = parse_packet(&default_registry(), 1, &frame);

        assert_eq!(results.len(), 1 + MAX_TAG_DEPTH as usize + 1);
    }

    #[test]
    fn test_unknown_link_type_yields_nothing() {
        assert!(parse_packet(&default_registry(), 105, &[0u8; 40]).is_empty());
    }
}
