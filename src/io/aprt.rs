//! APRT binary container
//!
//! Header (16 bytes):
//!   - Magic: "APRT" (4 bytes)
//!   - Version: u16 (2 bytes)
//!   - Flags: u16 (2 bytes)
//!   - Signal count: u32 (4 bytes)
//!   - CRC32: u32 (4 bytes)
//!
//! Body:
//!   - Bincode-serialized [`SignalSet`]
//!
//! The writer streams the body through an on-the-fly CRC and seek-patches
//! the header afterwards; the reader validates the CRC before handing the
//! bytes to bincode (fail-fast on corruption).
//!
//! Author: Moroya Sakamoto

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::{IoError, SignalSet};

/// Magic bytes for the APRT format
pub const APRT_MAGIC: [u8; 4] = *b"APRT";

/// Current format version
pub const APRT_VERSION: u16 = 1;

/// APRT file header
#[derive(Debug, Clone, Copy)]
pub struct AprtHeader {
    /// Magic bytes, always [`APRT_MAGIC`]
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Reserved flags, currently zero
    pub flags: u16,
    /// Number of signals in the body
    pub signal_count: u32,
    /// CRC32 of the body bytes
    pub crc32: u32,
}

impl AprtHeader {
    /// Create a header for a signal set whose body hashes to `body_crc`.
    pub fn new(set: &SignalSet, body_crc: u32) -> Self {
        AprtHeader {
            magic: APRT_MAGIC,
            version: APRT_VERSION,
            flags: 0,
            signal_count: set.len() as u32,
            crc32: body_crc,
        }
    }

    /// Serialize header to bytes
    #[inline]
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.signal_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.crc32.to_le_bytes());
        bytes
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8; 16]) -> Result<Self, IoError> {
        let magic: [u8; 4] = bytes[0..4].try_into().map_err(|_| {
            IoError::InvalidFormat("header shorter than 4 magic bytes".to_string())
        })?;
        if magic != APRT_MAGIC {
            return Err(IoError::InvalidFormat(format!(
                "Invalid magic bytes: {:?}",
                magic
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version > APRT_VERSION {
            return Err(IoError::UnsupportedVersion(version));
        }

        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        let signal_count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let crc32 = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        Ok(AprtHeader {
            magic,
            version,
            flags,
            signal_count,
            crc32,
        })
    }
}

// Writer wrapper that calculates CRC32 on the fly
struct CrcWriter<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> CrcWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<W: Write> Write for CrcWriter<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Save a signal set to a binary `.aprt` file.
///
/// Writes a placeholder header, streams the bincode body through an
/// on-the-fly CRC, then seeks back and patches the real header. The body is
/// never buffered whole in memory.
pub fn save_aprt(set: &SignalSet, path: impl AsRef<Path>) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let placeholder = AprtHeader {
        magic: APRT_MAGIC,
        version: APRT_VERSION,
        flags: 0,
        signal_count: set.len() as u32,
        crc32: 0,
    };
    writer.write_all(&placeholder.to_bytes())?;

    let mut crc_writer = CrcWriter::new(&mut writer);
    bincode::serialize_into(&mut crc_writer, set)
        .map_err(|e| IoError::Serialization(e.to_string()))?;
    let crc = crc_writer.finalize();

    writer.seek(SeekFrom::Start(0))?;
    writer.write_all(&AprtHeader::new(set, crc).to_bytes())?;
    writer.flush()?;

    log::debug!("saved {} signals ({} nodes)", set.len(), set.node_count());
    Ok(())
}

/// Load a signal set from a binary `.aprt` file.
///
/// Validates the body CRC before deserialization so corrupted data fails
/// fast instead of reaching bincode.
pub fn load_aprt(path: impl AsRef<Path>) -> Result<SignalSet, IoError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut header_bytes = [0u8; 16];
    reader.read_exact(&mut header_bytes)?;
    let header = AprtHeader::from_bytes(&header_bytes)?;

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&body);
    let actual = hasher.finalize();
    if actual != header.crc32 {
        return Err(IoError::CrcMismatch {
            expected: header.crc32,
            actual,
        });
    }

    let set: SignalSet =
        bincode::deserialize(&body).map_err(|e| IoError::Serialization(e.to_string()))?;
    if set.len() as u32 != header.signal_count {
        return Err(IoError::InvalidFormat(format!(
            "header promises {} signals, body holds {}",
            header.signal_count,
            set.len()
        )));
    }

    Ok(set)
}
