//! Test utilities for protocol parsing.
//!
//! Builders for synthetic frames and capture files. Checksums are left zero;
//! nothing in the decoder validates them.

use super::ParseContext;

/// Builder for constructing Ethernet frames.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ethertype: u16,
    vlan: Option<u16>,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ethertype: 0x0800,
            vlan: None,
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn ipv6(self) -> Self {
        self.ethertype(0x86DD)
    }

    pub fn arp(self) -> Self {
        self.ethertype(0x0806)
    }

    /// Insert one 802.1Q tag in front of the payload EtherType.
    pub fn vlan(mut self, vlan_id: u16) -> Self {
        self.vlan = Some(vlan_id);
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(18 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        if let Some(vlan_id) = self.vlan {
            frame.extend_from_slice(&0x8100u16.to_be_bytes());
            frame.extend_from_slice(&(vlan_id & 0x0FFF).to_be_bytes());
        }
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// Builder for constructing IPv4 packets.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    ttl: u8,
    protocol: u8,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            ttl: 64,
            protocol: 6,
            src_ip: [192, 168, 1, 1],
            dst_ip: [192, 168, 1, 2],
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    pub fn icmp(self) -> Self {
        self.protocol(1)
    }

    pub fn src_ip(mut self, ip: [u8; 4]) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 4]) -> Self {
        self.dst_ip = ip;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = 20 + self.payload.len() as u16;
        let mut packet = Vec::with_capacity(total_length as usize);

        packet.push(0x45);
        packet.push(0x00);
        packet.extend_from_slice(&total_length.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x01]); // Identification
        packet.extend_from_slice(&[0x40, 0x00]); // Don't fragment
        packet.push(self.ttl);
        packet.push(self.protocol);
        packet.extend_from_slice(&[0x00, 0x00]); // Checksum
        packet.extend_from_slice(&self.src_ip);
        packet.extend_from_slice(&self.dst_ip);
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for constructing TCP segments.
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: u16,
    window: u16,
    payload: Vec<u8>,
}

impl TcpBuilder {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            seq: 1,
            ack: 0,
            flags: 0x002,
            window: 65535,
            payload: Vec::new(),
        }
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Payload with PSH|ACK set.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self.flags = 0x018;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut segment = Vec::with_capacity(20 + self.payload.len());
        segment.extend_from_slice(&self.src_port.to_be_bytes());
        segment.extend_from_slice(&self.dst_port.to_be_bytes());
        segment.extend_from_slice(&self.seq.to_be_bytes());
        segment.extend_from_slice(&self.ack.to_be_bytes());
        segment.push(0x50 | ((self.flags >> 8) as u8 & 0x01)); // Data offset 5
        segment.push(self.flags as u8);
        segment.extend_from_slice(&self.window.to_be_bytes());
        segment.extend_from_slice(&[0x00, 0x00]); // Checksum
        segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        segment.extend_from_slice(&self.payload);
        segment
    }
}

/// Builder for constructing UDP datagrams.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            payload: Vec::new(),
        }
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = 8 + self.payload.len() as u16;
        let mut datagram = Vec::with_capacity(length as usize);
        datagram.extend_from_slice(&self.src_port.to_be_bytes());
        datagram.extend_from_slice(&self.dst_port.to_be_bytes());
        datagram.extend_from_slice(&length.to_be_bytes());
        datagram.extend_from_slice(&[0x00, 0x00]); // Checksum
        datagram.extend_from_slice(&self.payload);
        datagram
    }
}

/// Builder for ICMP messages.
#[derive(Debug, Clone)]
pub struct IcmpBuilder {
    icmp_type: u8,
    code: u8,
    rest: [u8; 4],
}

impl IcmpBuilder {
    pub fn new(icmp_type: u8, code: u8) -> Self {
        Self {
            icmp_type,
            code,
            rest: [0; 4],
        }
    }

    pub fn echo_request(ident: u16, seq: u16) -> Self {
        let mut builder = Self::new(8, 0);
        builder.rest[..2].copy_from_slice(&ident.to_be_bytes());
        builder.rest[2..].copy_from_slice(&seq.to_be_bytes());
        builder
    }

    pub fn build(self) -> Vec<u8> {
        let mut message = vec![self.icmp_type, self.code, 0x00, 0x00];
        message.extend_from_slice(&self.rest);
        message
    }
}

/// Builder for DNS messages (one question, optional answers).
#[derive(Debug, Clone)]
pub struct DnsMessageBuilder {
    id: u16,
    flags: u16,
    name: String,
    qtype: u16,
    answers: Vec<(u16, u32, Vec<u8>)>,
}

impl DnsMessageBuilder {
    /// Standard recursive query.
    pub fn query(id: u16, name: &str, qtype: u16) -> Self {
        Self {
            id,
            flags: 0x0100,
            name: name.to_string(),
            qtype,
            answers: Vec::new(),
        }
    }

    /// Response with RD|RA and the given rcode.
    pub fn response(id: u16, name: &str, qtype: u16, rcode: u8) -> Self {
        Self {
            flags: 0x8180 | (rcode as u16 & 0x0F),
            ..Self::query(id, name, qtype)
        }
    }

    /// Answer record owned by the question name (compression pointer to offset 12).
    pub fn answer(mut self, rtype: u16, ttl: u32, rdata: &[u8]) -> Self {
        self.answers.push((rtype, ttl, rdata.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut msg = Vec::new();
        msg.extend_from_slice(&self.id.to_be_bytes());
        msg.extend_from_slice(&self.flags.to_be_bytes());
        msg.extend_from_slice(&1u16.to_be_bytes());
        msg.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0]); // NSCOUNT, ARCOUNT
        msg.extend_from_slice(&encode_name(&self.name));
        msg.extend_from_slice(&self.qtype.to_be_bytes());
        msg.extend_from_slice(&1u16.to_be_bytes()); // IN

        for (rtype, ttl, rdata) in self.answers {
            msg.extend_from_slice(&[0xC0, 0x0C]);
            msg.extend_from_slice(&rtype.to_be_bytes());
            msg.extend_from_slice(&1u16.to_be_bytes());
            msg.extend_from_slice(&ttl.to_be_bytes());
            msg.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            msg.extend_from_slice(&rdata);
        }
        msg
    }
}

/// Encode a dotted name as DNS labels.
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Ethernet/IPv4/UDP frame between 10.0.0.1 and 10.0.0.2.
pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let udp = UdpBuilder::new(src_port, dst_port).payload(payload).build();
    let ip = Ipv4Builder::new()
        .udp()
        .src_ip([10, 0, 0, 1])
        .dst_ip([10, 0, 0, 2])
        .payload(&udp)
        .build();
    EthernetBuilder::new().payload(&ip).build()
}

/// Ethernet/IPv4/TCP frame between 10.0.0.1 and 10.0.0.2.
pub fn tcp_frame(segment: TcpBuilder) -> Vec<u8> {
    let ip = Ipv4Builder::new()
        .src_ip([10, 0, 0, 1])
        .dst_ip([10, 0, 0, 2])
        .payload(&segment.build())
        .build();
    EthernetBuilder::new().payload(&ip).build()
}

/// Ethernet ARP request: who has `target_ip`? tell `sender_ip`.
pub fn arp_request_frame(sender_ip: [u8; 4], target_ip: [u8; 4]) -> Vec<u8> {
    let mut arp = vec![0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01];
    arp.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    arp.extend_from_slice(&sender_ip);
    arp.extend_from_slice(&[0x00; 6]);
    arp.extend_from_slice(&target_ip);
    EthernetBuilder::new().arp().payload(&arp).build()
}

/// Builder for legacy little-endian microsecond pcap files.
#[derive(Debug, Clone)]
pub struct PcapFileBuilder {
    link_type: u32,
    records: Vec<(u32, u32, Vec<u8>)>,
}

impl Default for PcapFileBuilder {
    fn default() -> Self {
        Self {
            link_type: 1,
            records: Vec::new(),
        }
    }
}

impl PcapFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_type(mut self, link_type: u32) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn frame(mut self, ts_sec: u32, ts_usec: u32, data: &[u8]) -> Self {
        self.records.push((ts_sec, ts_usec, data.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes()); // thiszone
        out.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
        out.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
        out.extend_from_slice(&self.link_type.to_le_bytes());

        for (ts_sec, ts_usec, data) in self.records {
            out.extend_from_slice(&ts_sec.to_le_bytes());
            out.extend_from_slice(&ts_usec.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&data);
        }
        out
    }
}

/// Root context for an Ethernet capture.
pub fn ethernet_context() -> ParseContext {
    ParseContext::new(1)
}
