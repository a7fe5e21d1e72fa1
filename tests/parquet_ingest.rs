//! Ingest into the Parquet store, then read the tables back.

use std::sync::Arc;

use arrow::array::AsArray;
use arrow::datatypes::UInt64Type;
use pcapingest::store::ParquetStore;
use pcapingest_core::job::{JobRegistry, JobStatus};
use pcapingest_core::store::ColumnStore;
use pcapingest_core::IngestConfig;

/// Ethernet/IPv4/UDP frame, 10.0.0.1 -> 10.0.0.2.
fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    packet.extend_from_slice(&[0x08, 0x00]);

    packet.push(0x45);
    packet.push(0x00);
    packet.extend_from_slice(&((28 + payload.len()) as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00]);
    packet.extend_from_slice(&[10, 0, 0, 1]);
    packet.extend_from_slice(&[10, 0, 0, 2]);

    packet.extend_from_slice(&src_port.to_be_bytes());
    packet.extend_from_slice(&dst_port.to_be_bytes());
    packet.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00]);
    packet.extend_from_slice(payload);
    packet
}

fn pcap_file(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (i, data) in frames.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000 + i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

#[tokio::test]
async fn test_ingest_to_parquet() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let capture = input.path().join("trace.pcap");
    let frames: Vec<_> = (0..7).map(|i| udp_frame(4000 + i, 9000, b"data")).collect();
    std::fs::write(&capture, pcap_file(&frames)).unwrap();

    let store = Arc::new(ParquetStore::new(output.path()).unwrap());
    let mut config = IngestConfig::default();
    config.batch.packets = 3;
    let jobs = JobRegistry::new(store.clone(), config);

    let job_id = jobs.start("cap-1", capture, "trace.pcap");
    let status = jobs.wait(&job_id).await.unwrap();
    assert_eq!(status.status, JobStatus::Completed);

    assert_eq!(store.files("packets", "cap-1").unwrap().len(), 3);
    let packets = store.read("packets", "cap-1").unwrap();
    let numbers: Vec<u64> = packets
        .iter()
        .flat_map(|b| {
            b.column_by_name("packet_number")
                .unwrap()
                .as_primitive::<UInt64Type>()
                .values()
                .to_vec()
        })
        .collect();
    assert_eq!(numbers, (1..=7).collect::<Vec<_>>());

    let meta = store.read("capture_metadata", "cap-1").unwrap();
    assert_eq!(meta.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    let names = meta[0].column_by_name("file_name").unwrap().as_string::<i32>();
    assert_eq!(names.value(0), "trace.pcap");

    store.delete_capture("cap-1").unwrap();
    assert!(store.read("packets", "cap-1").unwrap().is_empty());
}
