//! Zip container constants shared by the reader and the writer.
//!
//! Offsets and signatures follow the PKWARE APPNOTE layout. All multi-byte
//! fields in a zip file are little-endian.

/// Signature of the end-of-central-directory record (`PK\x05\x06`).
pub(crate) const SIG_END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
/// Signature of a central directory file header (`PK\x01\x02`).
pub(crate) const SIG_CENTRAL_HEADER: u32 = 0x0201_4b50;
/// Signature of a local file header (`PK\x03\x04`).
pub(crate) const SIG_LOCAL_HEADER: u32 = 0x0403_4b50;

/// Size of the end-of-central-directory record without its comment.
pub(crate) const END_OF_CENTRAL_DIR_LEN: usize = 22;
/// Size of a central directory header before its variable-length fields.
pub(crate) const CENTRAL_HEADER_LEN: usize = 46;
/// Size of a local file header before its variable-length fields.
pub(crate) const LOCAL_HEADER_LEN: usize = 30;

/// General purpose flag bit 0: the entry is encrypted.
pub(crate) const FLAG_ENCRYPTED: u16 = 0x0001;

/// Sentinel values marking fields continued in a zip64 record.
pub(crate) const ZIP64_U16: u16 = 0xFFFF;
pub(crate) const ZIP64_U32: u32 = 0xFFFF_FFFF;

/// DOS timestamp for 1980-01-01 00:00:00, used for deterministic output.
pub(crate) const DOS_EPOCH_DATE: u16 = 0x0021;
pub(crate) const DOS_EPOCH_TIME: u16 = 0x0000;

/// Compression method of a zip entry.
///
/// Only the two methods the Java toolchain emits are supported; anything
/// else is rejected at open time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression.
    Stored,
    /// Raw DEFLATE.
    Deflated,
}

impl CompressionMethod {
    /// Decode the method field of a zip header. Unknown methods yield `None`.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Stored),
            8 => Some(Self::Deflated),
            _ => None,
        }
    }

    /// The on-disk method field value.
    pub fn raw(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflated => 8,
        }
    }
}
