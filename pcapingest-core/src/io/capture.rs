//! Capture container reading.
//!
//! [`CaptureSource::open`] validates a capture up front so a bad file fails the
//! job before any row is written. [`CaptureSource::frames`] then re-opens the
//! file for each pass, which makes the frame sequence restartable.
//!
//! Legacy pcap is tried first; when its header validation fails the pcapng
//! decoder gets a turn. Gzip-compressed captures are decompressed on the fly.
//!
//! ```ignore
//! let source = CaptureSource::open("capture.pcap.gz")?;
//! for frame in source.frames()? {
//!     let frame = frame?;
//!     println!("{} bytes at {}", frame.data.len(), frame.timestamp_us);
//! }
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use flate2::read::GzDecoder;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError as ParserError, PcapNGReader};
use tracing::debug;

use crate::error::{Error, FormatError, Result};

/// Buffer size for pcap_parser readers (256KB).
const BUFFER_SIZE: usize = 262144;

/// Legacy pcap magics as read in native byte order (µs/ns, both endiannesses).
const LEGACY_MAGICS: [u32; 4] = [0xa1b2c3d4, 0xd4c3b2a1, 0xa1b23c4d, 0x4d3cb2a1];

/// pcapng Section Header Block type.
const PCAPNG_MAGIC: u32 = 0x0a0d0d0a;

/// Compression wrapping the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Detect compression from the first bytes of a file.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x1f, 0x8b, ..] => Compression::Gzip,
            _ => Compression::None,
        }
    }
}

/// Container format that accepted the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Classic pcap
    Legacy,
    /// pcapng
    PcapNg,
}

/// One frame as stored in the container.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// 1-based position in the container
    pub index: u64,
    /// Capture time, microseconds since the Unix epoch
    pub timestamp_us: i64,
    /// Link type of the capturing interface (1 = Ethernet)
    pub link_type: u16,
    /// Bytes on the wire
    pub original_length: u32,
    /// Offset of the frame record in the (decompressed) container
    pub file_offset: u64,
    /// Container bytes consumed once this frame has been read
    pub bytes_consumed: u64,
    /// Captured bytes
    pub data: Bytes,
}

/// A validated capture file.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    path: PathBuf,
    compression: Compression,
    format: ContainerFormat,
    file_size: u64,
    estimated_total_bytes: u64,
}

impl CaptureSource {
    /// Open and validate a capture file.
    ///
    /// Fails with [`FormatError`] when the file is empty, truncated inside the
    /// header, or starts with no supported magic number.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::Format(FormatError::FileNotFound {
                path: path.display().to_string(),
            }),
            _ => Error::Io(e),
        })?;

        let file_size = file.metadata()?.len();
        if file_size == 0 {
            return Err(FormatError::Empty.into());
        }

        let mut head = [0u8; 6];
        let head_len = read_up_to(&mut file, &mut head)?;
        let compression = Compression::detect(&head[..head_len]);

        let estimated_total_bytes = match compression {
            Compression::None => file_size,
            Compression::Gzip => gzip_isize(&mut file)?
                .filter(|size| *size > 0)
                .unwrap_or(file_size),
        };

        let mut magic = [0u8; 4];
        let mut input = CaptureInput::open(&path, compression)?;
        match read_up_to(&mut input, &mut magic)? {
            0 => return Err(FormatError::Empty.into()),
            n if n < 4 => {
                return Err(FormatError::Truncated {
                    reason: format!("{n} bytes, too short for a magic number"),
                }
                .into())
            }
            _ => {}
        }

        let magic = u32::from_ne_bytes(magic);
        if !LEGACY_MAGICS.contains(&magic) && magic != PCAPNG_MAGIC {
            return Err(FormatError::UnknownMagic { magic }.into());
        }

        let mut source = Self {
            path,
            compression,
            format: ContainerFormat::Legacy,
            file_size,
            estimated_total_bytes,
        };

        // Validate by constructing the readers; legacy first, pcapng second.
        source.format = match source.open_reader(ContainerFormat::Legacy) {
            Ok(_) => ContainerFormat::Legacy,
            Err(legacy_err) => {
                debug!(error = %legacy_err, "legacy pcap header rejected, trying pcapng");
                match source.open_reader(ContainerFormat::PcapNg) {
                    Ok(_) => ContainerFormat::PcapNg,
                    Err(ng_err) => {
                        // Report the error from the decoder the magic pointed at.
                        return Err(if magic == PCAPNG_MAGIC { ng_err } else { legacy_err }.into());
                    }
                }
            }
        };

        debug!(
            path = %source.path.display(),
            format = ?source.format,
            compression = ?source.compression,
            file_size,
            "opened capture"
        );

        Ok(source)
    }

    /// Start a new forward pass over the frames.
    pub fn frames(&self) -> Result<FrameIter> {
        let inner = self.open_reader(self.format)?;
        Ok(FrameIter {
            inner,
            index: 0,
            link_type: 1,
            interfaces: Vec::new(),
            nanosecond: false,
            position: 0,
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Size of the file on disk.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Container bytes a full pass will consume, for progress reporting.
    ///
    /// Exact for uncompressed files. For gzip this is the size recorded in
    /// the trailer, which wraps above 4 GiB.
    pub fn estimated_total_bytes(&self) -> u64 {
        self.estimated_total_bytes
    }

    fn open_reader(&self, format: ContainerFormat) -> std::result::Result<ReaderInner, FormatError> {
        let input = CaptureInput::open(&self.path, self.compression).map_err(|e| {
            FormatError::InvalidHeader {
                reason: format!("reopen failed: {e}"),
            }
        })?;
        let buf_reader = BufReader::with_capacity(BUFFER_SIZE, input);

        match format {
            ContainerFormat::Legacy => LegacyPcapReader::new(BUFFER_SIZE, buf_reader)
                .map(|r| ReaderInner::Legacy(Box::new(r)))
                .map_err(|e| header_error("legacy pcap", &e)),
            ContainerFormat::PcapNg => PcapNGReader::new(BUFFER_SIZE, buf_reader)
                .map(|r| ReaderInner::Ng(Box::new(r)))
                .map_err(|e| header_error("pcapng", &e)),
        }
    }
}

fn header_error(decoder: &str, e: &ParserError<&[u8]>) -> FormatError {
    match e {
        ParserError::Incomplete(_) | ParserError::UnexpectedEof | ParserError::Eof => {
            FormatError::Truncated {
                reason: format!("{decoder} header incomplete"),
            }
        }
        other => FormatError::InvalidHeader {
            reason: format!("{decoder}: {other}"),
        },
    }
}

/// Read until `buf` is full or the source ends.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Uncompressed size from the gzip trailer (ISIZE, little-endian).
fn gzip_isize(file: &mut File) -> io::Result<Option<u64>> {
    if file.metadata()?.len() < 4 {
        return Ok(None);
    }
    file.seek(SeekFrom::End(-4))?;
    let mut trailer = [0u8; 4];
    file.read_exact(&mut trailer)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(Some(u32::from_le_bytes(trailer) as u64))
}

/// File bytes, decompressed if needed.
enum CaptureInput {
    Plain(File),
    Gzip(GzDecoder<File>),
}

impl CaptureInput {
    fn open(path: &Path, compression: Compression) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(match compression {
            Compression::None => CaptureInput::Plain(file),
            Compression::Gzip => CaptureInput::Gzip(GzDecoder::new(file)),
        })
    }
}

impl Read for CaptureInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CaptureInput::Plain(f) => f.read(buf),
            CaptureInput::Gzip(d) => d.read(buf),
        }
    }
}

enum ReaderInner {
    Legacy(Box<LegacyPcapReader<BufReader<CaptureInput>>>),
    Ng(Box<PcapNGReader<BufReader<CaptureInput>>>),
}

/// Forward-only iterator over the frames of one pass.
///
/// Yields `Err` once, then ends, if the container is cut short or corrupt
/// after the header. Frames before the damage have already been yielded.
pub struct FrameIter {
    inner: ReaderInner,
    index: u64,
    link_type: u16,
    /// pcapng link types, indexed by interface id
    interfaces: Vec<u16>,
    nanosecond: bool,
    position: u64,
    done: bool,
}

impl FrameIter {
    /// Container bytes consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.position
    }

    fn next_frame(&mut self) -> std::result::Result<Option<RawFrame>, FormatError> {
        match &mut self.inner {
            ReaderInner::Legacy(reader) => next_legacy(
                reader.as_mut(),
                &mut self.index,
                &mut self.link_type,
                &mut self.nanosecond,
                &mut self.position,
            ),
            ReaderInner::Ng(reader) => next_pcapng(
                reader.as_mut(),
                &mut self.index,
                &mut self.interfaces,
                &mut self.position,
            ),
        }
    }
}

impl Iterator for FrameIter {
    type Item = std::result::Result<RawFrame, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn record_error(container: &str, e: ParserError<&[u8]>) -> FormatError {
    match e {
        ParserError::UnexpectedEof | ParserError::Incomplete(_) => FormatError::Truncated {
            reason: format!("{container} record cut short"),
        },
        other => FormatError::InvalidHeader {
            reason: format!("{container} record: {other}"),
        },
    }
}

fn next_legacy<R: Read>(
    reader: &mut LegacyPcapReader<R>,
    index: &mut u64,
    link_type: &mut u16,
    nanosecond: &mut bool,
    position: &mut u64,
) -> std::result::Result<Option<RawFrame>, FormatError> {
    loop {
        match reader.next() {
            Ok((offset, block)) => match block {
                PcapBlockOwned::Legacy(packet) => {
                    *index += 1;

                    let frac = if *nanosecond {
                        packet.ts_usec as i64 / 1_000
                    } else {
                        packet.ts_usec as i64
                    };
                    let file_offset = *position;
                    *position += offset as u64;

                    let frame = RawFrame {
                        index: *index,
                        timestamp_us: (packet.ts_sec as i64) * 1_000_000 + frac,
                        link_type: *link_type,
                        original_length: packet.origlen,
                        file_offset,
                        bytes_consumed: *position,
                        data: Bytes::copy_from_slice(packet.data),
                    };

                    reader.consume(offset);
                    return Ok(Some(frame));
                }
                PcapBlockOwned::LegacyHeader(header) => {
                    *link_type = header.network.0 as u16;
                    *nanosecond = header.is_nanosecond_precision();
                    *position += offset as u64;
                    reader.consume(offset);
                }
                _ => {
                    *position += offset as u64;
                    reader.consume(offset);
                }
            },
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| record_error("legacy pcap", e))?;
            }
            Err(e) => return Err(record_error("legacy pcap", e)),
        }
    }
}

fn next_pcapng<R: Read>(
    reader: &mut PcapNGReader<R>,
    index: &mut u64,
    interfaces: &mut Vec<u16>,
    position: &mut u64,
) -> std::result::Result<Option<RawFrame>, FormatError> {
    use pcap_parser::pcapng::Block;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let file_offset = *position;
                *position += offset as u64;

                let frame = match block {
                    // Interface ids are scoped to their section
                    PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                        interfaces.clear();
                        None
                    }
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        interfaces.push(idb.linktype.0 as u16);
                        None
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                        *index += 1;
                        let caplen = (epb.caplen as usize).min(epb.data.len());
                        Some(RawFrame {
                            index: *index,
                            timestamp_us: ((epb.ts_high as i64) << 32) | (epb.ts_low as i64),
                            link_type: interface_link_type(interfaces, epb.if_id),
                            original_length: epb.origlen,
                            file_offset,
                            bytes_consumed: *position,
                            data: Bytes::copy_from_slice(&epb.data[..caplen]),
                        })
                    }
                    PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                        *index += 1;
                        Some(RawFrame {
                            index: *index,
                            timestamp_us: 0,
                            link_type: interface_link_type(interfaces, 0),
                            original_length: spb.origlen,
                            file_offset,
                            bytes_consumed: *position,
                            data: Bytes::copy_from_slice(spb.data),
                        })
                    }
                    _ => None,
                };

                reader.consume(offset);
                if frame.is_some() {
                    return Ok(frame);
                }
            }
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader.refill().map_err(|e| record_error("pcapng", e))?;
            }
            Err(e) => return Err(record_error("pcapng", e)),
        }
    }
}

/// Packets naming an undescribed interface fall back to the latest one.
fn interface_link_type(interfaces: &[u16], if_id: u32) -> u16 {
    interfaces
        .get(if_id as usize)
        .or(interfaces.last())
        .copied()
        .unwrap_or(1)
}
