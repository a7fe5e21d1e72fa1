//! Layer parser lookup: the highest `can_parse` score wins.

use super::{
    ArpProtocol, EthernetProtocol, IcmpProtocol, Icmpv6Protocol, Ipv4Protocol, Ipv6Protocol,
    LinuxSllProtocol, MplsProtocol, ParseContext, ParseResult, RawIpProtocol, TcpProtocol,
    UdpProtocol, VlanProtocol,
};

/// One header parser in the link-to-transport walk.
pub trait Protocol: Send + Sync {
    /// Layer key used in `layers_json` and parser dispatch.
    fn name(&self) -> &'static str;

    /// Label shown for the layer; transports use it as their protocol label.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Score for taking the next bytes given the hints so far; `None` declines.
    fn can_parse(&self, context: &ParseContext) -> Option<u32>;

    /// Parse one header from the front of `data`.
    fn parse<'a>(&self, data: &'a [u8], context: &ParseContext) -> ParseResult<'a>;
}

/// Every parser the decoder knows, dispatched without boxing.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    LinuxSll(LinuxSllProtocol),
    RawIp(RawIpProtocol),
    Vlan(VlanProtocol),
    Mpls(MplsProtocol),
    Arp(ArpProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Icmp(IcmpProtocol),
    Icmpv6(Icmpv6Protocol),
}

// Forward a trait method to the wrapped parser.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::LinuxSll(p) => p.$method($($arg),*),
            BuiltinProtocol::RawIp(p) => p.$method($($arg),*),
            BuiltinProtocol::Vlan(p) => p.$method($($arg),*),
            BuiltinProtocol::Mpls(p) => p.$method($($arg),*),
            BuiltinProtocol::Arp(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv6(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmpv6(p) => p.$method($($arg),*),
        }
    };
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_protocol!(self, display_name)
    }

    #[inline]
    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        delegate_protocol!(self, can_parse, context)
    }

    #[inline]
    fn parse<'a>(&self, data: &'a [u8], context: &ParseContext) -> ParseResult<'a> {
        delegate_protocol!(self, parse, data, context)
    }
}

macro_rules! builtin_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BuiltinProtocol {
                fn from(p: $ty) -> Self {
                    BuiltinProtocol::$variant(p)
                }
            }
        )*
    };
}

builtin_from! {
    Ethernet => EthernetProtocol,
    LinuxSll => LinuxSllProtocol,
    RawIp => RawIpProtocol,
    Vlan => VlanProtocol,
    Mpls => MplsProtocol,
    Arp => ArpProtocol,
    Ipv4 => Ipv4Protocol,
    Ipv6 => Ipv6Protocol,
    Tcp => TcpProtocol,
    Udp => UdpProtocol,
    Icmp => IcmpProtocol,
    Icmpv6 => Icmpv6Protocol,
}

/// Parsers searched by `can_parse` score.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    parsers: Vec<BuiltinProtocol>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Into<BuiltinProtocol>>(&mut self, parser: P) {
        self.parsers.push(parser.into());
    }

    /// Highest-scoring parser for `context`.
    #[inline]
    pub fn find_parser(&self, context: &ParseContext) -> Option<&BuiltinProtocol> {
        self.parsers
            .iter()
            .filter_map(|p| p.can_parse(context).map(|priority| (p, priority)))
            .max_by_key(|(_, priority)| *priority)
            .map(|(parser, _)| parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_protocol_size() {
        // Unit-struct parsers: the enum is just a discriminant
        assert!(std::mem::size_of::<BuiltinProtocol>() <= 8);
    }

    #[test]
    fn test_find_parser_by_link_type() {
        let mut registry = ProtocolRegistry::new();
        registry.register(EthernetProtocol);
        registry.register(LinuxSllProtocol);
        registry.register(RawIpProtocol);

        assert_eq!(registry.find_parser(&ParseContext::new(1)).unwrap().name(), "ethernet");
        assert_eq!(registry.find_parser(&ParseContext::new(113)).unwrap().name(), "linux_sll");
        assert_eq!(registry.find_parser(&ParseContext::new(101)).unwrap().name(), "raw_ip");
        assert!(registry.find_parser(&ParseContext::new(105)).is_none());
    }

    #[test]
    fn test_transport_chosen_by_ip_protocol_hint() {
        let mut registry = ProtocolRegistry::new();
        registry.register(TcpProtocol);
        registry.register(UdpProtocol);

        let mut context = ParseContext::new(1);
        context.set_hint("ip_protocol", 17);
        assert_eq!(registry.find_parser(&context).unwrap().name(), "udp");
        context.set_hint("ip_protocol", 47);
        assert!(registry.find_parser(&context).is_none());
    }
}
