//! Native binary container: a 32-byte header followed by a Postcard payload.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (32 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │                    Payload (variable)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::{BoostError, FormatError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a treeboost model.
pub const MAGIC: &[u8; 4] = b"TBST";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags for format features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// The model carries feature names.
    pub const HAS_FEATURE_NAMES: u16 = 1 << 0;
    /// The model carries user attributes.
    pub const HAS_ATTRIBUTES: u16 = 1 << 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header of the native format.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("TBST")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       2     Reserved
/// 8       2     Flags (bitfield)
/// 10      2     Reserved
/// 12      4     Payload size (bytes)
/// 16      4     CRC32 checksum of payload
/// 20      4     Number of features (0 = unbound)
/// 24      4     Number of groups
/// 28      4     Model version (boosting rounds)
/// ```
///
/// All integers are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub num_features: u32,
    pub num_groups: u32,
    pub model_version: u32,
}

impl FormatHeader {
    pub fn new(num_features: u32, num_groups: u32, model_version: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            num_features,
            num_groups,
            model_version,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_features.to_le_bytes());
        buf[24..28].copy_from_slice(&self.num_groups.to_le_bytes());
        buf[28..32].copy_from_slice(&self.model_version.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, FormatError> {
        if &buf[0..4] != MAGIC {
            return Err(FormatError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(FormatError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Ok(Self {
            version_major,
            version_minor,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: u32_at(12),
            checksum: u32_at(16),
            num_features: u32_at(20),
            num_groups: u32_at(24),
            model_version: u32_at(28),
        })
    }
}

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Framing
// ============================================================================

/// Fill in size and checksum, then write header and payload.
pub fn write_framed<W: Write>(writer: &mut W, header: &mut FormatHeader, payload: &[u8]) -> Result<()> {
    header.payload_size = u32::try_from(payload.len())
        .map_err(|_| FormatError::CorruptPayload(format!("payload of {} bytes is too large", payload.len())))?;
    header.checksum = compute_checksum(payload);

    writer.write_all(&header.to_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one header and its payload, verifying the checksum.
///
/// A stream that ends early is a [`FormatError::Truncated`]; other read
/// failures stay [`BoostError::Io`].
pub fn read_framed<R: Read>(reader: &mut R) -> Result<(FormatHeader, Vec<u8>)> {
    let mut header_buf = [0u8; HEADER_SIZE];
    let got = read_full(reader, &mut header_buf)?;
    if got < HEADER_SIZE {
        // Too short to even hold a header; a wrong magic is the better report.
        if got >= MAGIC.len() && &header_buf[..4] != MAGIC {
            return Err(FormatError::NotAModel.into());
        }
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE,
            actual: got,
        }
        .into());
    }

    let header = FormatHeader::from_bytes(&header_buf)?;

    // Grow with the data actually present rather than trusting the size field.
    let expected = header.payload_size as usize;
    let mut payload = Vec::new();
    let got = reader
        .by_ref()
        .take(header.payload_size as u64)
        .read_to_end(&mut payload)?;
    if got < expected {
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE + expected,
            actual: HEADER_SIZE + got,
        }
        .into());
    }

    let actual = compute_checksum(&payload);
    if actual != header.checksum {
        return Err(FormatError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        }
        .into());
    }

    Ok((header, payload))
}

/// Like `read_exact`, but reports how many bytes were available.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(BoostError::Io(e)),
        }
    }
    Ok(filled)
}
