//! Shared helpers for the integration tests: synthetic frames, pcap files
//! and column readers.

#![allow(dead_code)]

use std::path::PathBuf;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{UInt16Type, UInt64Type};
use arrow::record_batch::RecordBatch;
use pcapingest_core::store::MemoryStore;

/// Ethernet + IPv4 around `payload`, 10.0.0.1 -> 10.0.0.2.
pub fn ipv4_frame(protocol: u8, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();

    // Ethernet header
    packet.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]); // dst MAC
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // src MAC
    packet.extend_from_slice(&[0x08, 0x00]); // ethertype: IPv4

    // IPv4 header
    let total = (20 + payload.len()) as u16;
    packet.push(0x45); // Version 4, IHL 5
    packet.push(0x00);
    packet.extend_from_slice(&total.to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x01]); // Identification
    packet.extend_from_slice(&[0x40, 0x00]); // Don't fragment
    packet.push(0x40); // TTL: 64
    packet.push(protocol);
    packet.extend_from_slice(&[0x00, 0x00]); // Checksum
    packet.extend_from_slice(&[10, 0, 0, 1]);
    packet.extend_from_slice(&[10, 0, 0, 2]);

    packet.extend_from_slice(payload);
    packet
}

pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut udp = Vec::new();
    udp.extend_from_slice(&src_port.to_be_bytes());
    udp.extend_from_slice(&dst_port.to_be_bytes());
    udp.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    udp.extend_from_slice(&[0x00, 0x00]); // Checksum
    udp.extend_from_slice(payload);
    ipv4_frame(17, &udp)
}

pub fn tcp_frame(src_port: u16, dst_port: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut tcp = Vec::new();
    tcp.extend_from_slice(&src_port.to_be_bytes());
    tcp.extend_from_slice(&dst_port.to_be_bytes());
    tcp.extend_from_slice(&1u32.to_be_bytes()); // Seq
    tcp.extend_from_slice(&0u32.to_be_bytes()); // Ack
    tcp.push(0x50); // Data offset: 5
    tcp.push(flags);
    tcp.extend_from_slice(&[0xff, 0xff]); // Window
    tcp.extend_from_slice(&[0x00, 0x00]); // Checksum
    tcp.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
    tcp.extend_from_slice(payload);
    ipv4_frame(6, &tcp)
}

/// Standard query for an A record.
pub fn dns_query(id: u16, name: &str) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&id.to_be_bytes());
    msg.extend_from_slice(&[0x01, 0x00]); // RD
    msg.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
    msg.extend_from_slice(&[0x00; 6]); // AN/NS/AR
    for label in name.split('.') {
        msg.push(label.len() as u8);
        msg.extend_from_slice(label.as_bytes());
    }
    msg.push(0);
    msg.extend_from_slice(&[0x00, 0x01]); // A
    msg.extend_from_slice(&[0x00, 0x01]); // IN
    msg
}

/// Answerless response to an A query for `name` with the given rcode.
pub fn dns_response(id: u16, name: &str, rcode: u8) -> Vec<u8> {
    let mut msg = dns_query(id, name);
    msg[2] = 0x81; // QR, RD
    msg[3] = 0x80 | (rcode & 0x0f); // RA
    msg
}

pub fn arp_request(sender_ip: [u8; 4], target_ip: [u8; 4]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&[0xff; 6]);
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    packet.extend_from_slice(&[0x08, 0x06]); // ethertype: ARP
    packet.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 0x06, 0x04]);
    packet.extend_from_slice(&[0x00, 0x01]); // request
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    packet.extend_from_slice(&sender_ip);
    packet.extend_from_slice(&[0x00; 6]);
    packet.extend_from_slice(&target_ip);
    packet
}

/// Legacy little-endian microsecond pcap holding `frames`, one second apart.
pub fn pcap_file(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // Ethernet

    for (i, data) in frames.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000 + i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

pub fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn strings(batches: &[RecordBatch], column: &str) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| {
            let array = b.column_by_name(column).unwrap().as_string::<i32>();
            (0..array.len()).map(|i| array.value(i).to_string()).collect::<Vec<_>>()
        })
        .collect()
}

pub fn u64s(batches: &[RecordBatch], column: &str) -> Vec<u64> {
    batches
        .iter()
        .flat_map(|b| {
            let array = b.column_by_name(column).unwrap().as_primitive::<UInt64Type>();
            array.values().to_vec()
        })
        .collect()
}

pub fn u16s(batches: &[RecordBatch], column: &str) -> Vec<u16> {
    batches
        .iter()
        .flat_map(|b| {
            let array = b.column_by_name(column).unwrap().as_primitive::<UInt16Type>();
            array.values().to_vec()
        })
        .collect()
}

pub fn bools(batches: &[RecordBatch], column: &str) -> Vec<bool> {
    batches
        .iter()
        .flat_map(|b| {
            let array = b.column_by_name(column).unwrap().as_boolean();
            (0..array.len()).map(|i| array.value(i)).collect::<Vec<_>>()
        })
        .collect()
}

pub fn packet_protocols(store: &MemoryStore, capture_id: &str) -> Vec<String> {
    strings(&store.batches("packets", capture_id), "protocol")
}
