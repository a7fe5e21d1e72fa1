//! Capture I/O.
//!
//! ## Supported Containers
//!
//! - Legacy pcap, all four magic variants (µs/ns, little/big endian)
//! - pcapng, used when the legacy header is rejected
//! - Either of the above wrapped in gzip

mod capture;

pub use capture::{CaptureSource, Compression, ContainerFormat, FrameIter, RawFrame};
