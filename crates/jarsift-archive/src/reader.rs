//! Zip archive reader.
//!
//! Parses the central directory of a jar/zip file into an entry index, then
//! serves reads by re-parsing each local file header on demand. The whole
//! archive is held in memory; class archives are small enough that one
//! up-front read beats seeking.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use jarsift_types::ArchivePath;
use tracing::warn;

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    CompressionMethod, CENTRAL_HEADER_LEN, END_OF_CENTRAL_DIR_LEN, FLAG_ENCRYPTED,
    LOCAL_HEADER_LEN, SIG_CENTRAL_HEADER, SIG_END_OF_CENTRAL_DIR, SIG_LOCAL_HEADER, ZIP64_U16,
    ZIP64_U32,
};
use crate::source::{Archive, UnitMeta};

/// One central-directory record kept by the index.
#[derive(Clone, Copy, Debug)]
struct EntryRecord {
    method: CompressionMethod,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    local_header_offset: u32,
}

/// A zip/jar archive opened read-only from a byte buffer.
pub struct ZipArchive {
    data: Vec<u8>,
    entries: BTreeMap<ArchivePath, EntryRecord>,
}

impl ZipArchive {
    /// Open a zip archive from disk.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a zip archive from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> ArchiveResult<Self> {
        let eocd = locate_end_of_central_dir(&data)?;
        let entries = parse_central_dir(&data, eocd)?;
        Ok(Self { data, entries })
    }

    /// Number of entries indexed from the central directory.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read_entry(&self, path: &ArchivePath, record: EntryRecord) -> ArchiveResult<Vec<u8>> {
        let data = &self.data;
        let offset = record.local_header_offset as usize;
        let name = path.as_str();

        if offset + LOCAL_HEADER_LEN > data.len() {
            return Err(ArchiveError::Truncated {
                offset: offset as u64,
                reason: "local header extends past end of file".to_string(),
            });
        }
        if read_u32(data, offset) != SIG_LOCAL_HEADER {
            return Err(ArchiveError::CorruptEntry {
                name: name.to_string(),
                offset: offset as u64,
                reason: "bad local header signature".to_string(),
            });
        }
        // Name and extra lengths in the local header may differ from the
        // central directory copy; the local values position the data.
        let name_len = read_u16(data, offset + 26) as usize;
        let extra_len = read_u16(data, offset + 28) as usize;
        let start = offset + LOCAL_HEADER_LEN + name_len + extra_len;
        let end = start + record.compressed_size as usize;
        if end > data.len() {
            return Err(ArchiveError::Truncated {
                offset: start as u64,
                reason: "entry data extends past end of file".to_string(),
            });
        }
        let raw = &data[start..end];

        let bytes = match record.method {
            CompressionMethod::Stored => raw.to_vec(),
            CompressionMethod::Deflated => {
                let mut out = Vec::with_capacity(record.uncompressed_size as usize);
                let mut decoder = flate2::read::DeflateDecoder::new(raw);
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| ArchiveError::Decompression {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?;
                out
            }
        };

        if bytes.len() != record.uncompressed_size as usize {
            return Err(ArchiveError::CorruptEntry {
                name: name.to_string(),
                offset: offset as u64,
                reason: format!(
                    "size mismatch: expected {}, got {}",
                    record.uncompressed_size,
                    bytes.len()
                ),
            });
        }

        let actual = crc32fast::hash(&bytes);
        if actual != record.crc32 {
            return Err(ArchiveError::CrcMismatch {
                name: name.to_string(),
                expected: record.crc32,
                actual,
            });
        }

        Ok(bytes)
    }
}

impl Archive for ZipArchive {
    fn unit_paths(&self) -> ArchiveResult<Vec<ArchivePath>> {
        Ok(self
            .entries
            .keys()
            .filter(|path| path.is_class_file())
            .cloned()
            .collect())
    }

    fn read_unit(&self, path: &ArchivePath) -> ArchiveResult<Option<Vec<u8>>> {
        match self.entries.get(path) {
            Some(record) => Ok(Some(self.read_entry(path, *record)?)),
            None => Ok(None),
        }
    }

    fn unit_meta(&self, path: &ArchivePath) -> ArchiveResult<Option<UnitMeta>> {
        Ok(self.entries.get(path).map(|record| UnitMeta {
            size: u64::from(record.uncompressed_size),
            crc32: Some(record.crc32),
        }))
    }
}

impl fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipArchive")
            .field("entry_count", &self.entries.len())
            .field("bytes", &self.data.len())
            .finish()
    }
}

// Callers bounds-check before calling; the conversions cannot fail.
fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap())
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap())
}

fn locate_end_of_central_dir(data: &[u8]) -> ArchiveResult<usize> {
    if data.len() < END_OF_CENTRAL_DIR_LEN {
        return Err(ArchiveError::NotAnArchive {
            reason: format!("{} bytes is too short for a zip file", data.len()),
        });
    }
    // The record sits at the very end, followed only by its own comment.
    // Accept a signature only where the comment length reaches exactly to
    // end-of-file, so a signature inside the comment cannot win.
    let earliest = data
        .len()
        .saturating_sub(END_OF_CENTRAL_DIR_LEN + u16::MAX as usize);
    let latest = data.len() - END_OF_CENTRAL_DIR_LEN;
    for offset in (earliest..=latest).rev() {
        if read_u32(data, offset) != SIG_END_OF_CENTRAL_DIR {
            continue;
        }
        let comment_len = read_u16(data, offset + 20) as usize;
        if offset + END_OF_CENTRAL_DIR_LEN + comment_len == data.len() {
            return Ok(offset);
        }
    }
    Err(ArchiveError::NotAnArchive {
        reason: "end of central directory record not found".to_string(),
    })
}

fn parse_central_dir(
    data: &[u8],
    eocd: usize,
) -> ArchiveResult<BTreeMap<ArchivePath, EntryRecord>> {
    let disk_number = read_u16(data, eocd + 4);
    let central_dir_disk = read_u16(data, eocd + 6);
    let entries_on_disk = read_u16(data, eocd + 8);
    let total_entries = read_u16(data, eocd + 10);
    let central_dir_size = read_u32(data, eocd + 12);
    let central_dir_offset = read_u32(data, eocd + 16);

    if disk_number != 0 || central_dir_disk != 0 || entries_on_disk != total_entries {
        return Err(ArchiveError::Unsupported("multi-disk archive".to_string()));
    }
    if total_entries == ZIP64_U16
        || central_dir_size == ZIP64_U32
        || central_dir_offset == ZIP64_U32
    {
        return Err(ArchiveError::Unsupported("zip64 archive".to_string()));
    }

    let mut entries = BTreeMap::new();
    let mut pos = central_dir_offset as usize;
    for _ in 0..total_entries {
        if pos + CENTRAL_HEADER_LEN > data.len() {
            return Err(ArchiveError::Truncated {
                offset: pos as u64,
                reason: "central directory header extends past end of file".to_string(),
            });
        }
        if read_u32(data, pos) != SIG_CENTRAL_HEADER {
            return Err(ArchiveError::CorruptEntry {
                name: String::new(),
                offset: pos as u64,
                reason: "bad central directory header signature".to_string(),
            });
        }
        let flags = read_u16(data, pos + 8);
        let method_raw = read_u16(data, pos + 10);
        let crc32 = read_u32(data, pos + 16);
        let compressed_size = read_u32(data, pos + 20);
        let uncompressed_size = read_u32(data, pos + 24);
        let name_len = read_u16(data, pos + 28) as usize;
        let extra_len = read_u16(data, pos + 30) as usize;
        let comment_len = read_u16(data, pos + 32) as usize;
        let local_header_offset = read_u32(data, pos + 42);

        let name_end = pos + CENTRAL_HEADER_LEN + name_len;
        if name_end > data.len() {
            return Err(ArchiveError::Truncated {
                offset: pos as u64,
                reason: "entry name extends past end of file".to_string(),
            });
        }
        let name_bytes = &data[pos + CENTRAL_HEADER_LEN..name_end];
        let record_offset = pos as u64;
        pos = name_end + extra_len + comment_len;

        let name = match std::str::from_utf8(name_bytes) {
            Ok(name) => name,
            Err(_) => {
                warn!(offset = record_offset, "skipping zip entry with non-UTF-8 name");
                continue;
            }
        };

        if name.ends_with('/') {
            // Directory marker, nothing to read.
            continue;
        }

        if flags & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::Unsupported(format!(
                "encrypted entry: {name}"
            )));
        }
        let method = match CompressionMethod::from_raw(method_raw) {
            Some(method) => method,
            None => {
                return Err(ArchiveError::Unsupported(format!(
                    "compression method {method_raw} for entry {name}"
                )));
            }
        };
        if compressed_size == ZIP64_U32
            || uncompressed_size == ZIP64_U32
            || local_header_offset == ZIP64_U32
        {
            return Err(ArchiveError::Unsupported(format!("zip64 entry: {name}")));
        }

        let path = match ArchivePath::parse(name) {
            Ok(path) => path,
            Err(err) => {
                warn!(name = %name, error = %err, "skipping zip entry with unsafe name");
                continue;
            }
        };

        entries.insert(
            path,
            EntryRecord {
                method,
                crc32,
                compressed_size,
                uncompressed_size,
                local_header_offset,
            },
        );
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ZipWriter;

    fn p(s: &str) -> ArchivePath {
        ArchivePath::parse(s).unwrap()
    }

    fn sample_archive() -> Vec<u8> {
        let mut writer = ZipWriter::new();
        writer
            .add(p("com/a/Foo.class"), b"outer bytecode", CompressionMethod::Deflated)
            .unwrap();
        writer
            .add(p("com/a/Foo$1.class"), b"inner bytecode", CompressionMethod::Stored)
            .unwrap();
        writer
            .add(
                p("META-INF/MANIFEST.MF"),
                b"Manifest-Version: 1.0\n",
                CompressionMethod::Stored,
            )
            .unwrap();
        writer.finish().unwrap()
    }

    /// Overwrite every occurrence of `from` with the same-length `to`.
    fn patch(data: &mut [u8], from: &[u8], to: &[u8]) {
        assert_eq!(from.len(), to.len());
        let mut start = 0;
        while let Some(found) = data[start..].windows(from.len()).position(|w| w == from) {
            let at = start + found;
            data[at..at + to.len()].copy_from_slice(to);
            start = at + to.len();
        }
    }

    // -----------------------------------------------------------------------
    // Round trips
    // -----------------------------------------------------------------------

    #[test]
    fn roundtrip_stored_and_deflated() {
        let archive = ZipArchive::from_bytes(sample_archive()).unwrap();
        assert_eq!(
            archive.read_unit(&p("com/a/Foo.class")).unwrap(),
            Some(b"outer bytecode".to_vec())
        );
        assert_eq!(
            archive.read_unit(&p("com/a/Foo$1.class")).unwrap(),
            Some(b"inner bytecode".to_vec())
        );
    }

    #[test]
    fn non_class_entries_readable_but_not_listed() {
        let archive = ZipArchive::from_bytes(sample_archive()).unwrap();
        assert_eq!(
            archive.read_unit(&p("META-INF/MANIFEST.MF")).unwrap(),
            Some(b"Manifest-Version: 1.0\n".to_vec())
        );
        assert!(archive
            .unit_paths()
            .unwrap()
            .iter()
            .all(|path| path.is_class_file()));
    }

    #[test]
    fn unit_paths_sorted() {
        let archive = ZipArchive::from_bytes(sample_archive()).unwrap();
        assert_eq!(
            archive.unit_paths().unwrap(),
            vec![p("com/a/Foo$1.class"), p("com/a/Foo.class")]
        );
    }

    #[test]
    fn read_missing_unit_returns_none() {
        let archive = ZipArchive::from_bytes(sample_archive()).unwrap();
        assert_eq!(archive.read_unit(&p("com/a/Missing.class")).unwrap(), None);
    }

    #[test]
    fn unit_meta_reports_size_and_crc() {
        let archive = ZipArchive::from_bytes(sample_archive()).unwrap();
        let meta = archive
            .unit_meta(&p("com/a/Foo$1.class"))
            .unwrap()
            .expect("entry present");
        assert_eq!(meta.size, b"inner bytecode".len() as u64);
        assert_eq!(meta.crc32, Some(crc32fast::hash(b"inner bytecode")));
    }

    #[test]
    fn open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("build.jar");
        std::fs::write(&jar, sample_archive()).unwrap();

        let archive = ZipArchive::open(&jar).unwrap();
        assert_eq!(archive.entry_count(), 3);
        assert_eq!(
            archive.read_unit(&p("com/a/Foo.class")).unwrap(),
            Some(b"outer bytecode".to_vec())
        );
    }

    // -----------------------------------------------------------------------
    // Rejection of malformed containers
    // -----------------------------------------------------------------------

    #[test]
    fn empty_input_is_not_an_archive() {
        let err = ZipArchive::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, ArchiveError::NotAnArchive { .. }));
    }

    #[test]
    fn garbage_input_is_not_an_archive() {
        let err = ZipArchive::from_bytes(vec![0xAB; 64]).unwrap_err();
        assert!(matches!(err, ArchiveError::NotAnArchive { .. }));
    }

    #[test]
    fn truncated_tail_is_not_an_archive() {
        let mut data = sample_archive();
        data.truncate(data.len() - 1);
        let err = ZipArchive::from_bytes(data).unwrap_err();
        assert!(matches!(err, ArchiveError::NotAnArchive { .. }));
    }

    #[test]
    fn central_dir_offset_past_end_is_truncated() {
        let mut data = sample_archive();
        let eocd = data.len() - END_OF_CENTRAL_DIR_LEN;
        let bad_offset = (data.len() as u32).to_le_bytes();
        data[eocd + 16..eocd + 20].copy_from_slice(&bad_offset);
        let err = ZipArchive::from_bytes(data).unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated { .. }));
    }

    #[test]
    fn corrupted_entry_data_fails_crc() {
        let mut data = sample_archive();
        // The stored entry's bytes appear verbatim; flip one of them.
        let pos = data
            .windows(14)
            .position(|w| w == b"inner bytecode")
            .expect("stored entry bytes present");
        data[pos] ^= 0xFF;

        let archive = ZipArchive::from_bytes(data).unwrap();
        let err = archive.read_unit(&p("com/a/Foo$1.class")).unwrap_err();
        assert!(matches!(err, ArchiveError::CrcMismatch { .. }));
    }

    #[test]
    fn encrypted_entry_is_unsupported() {
        let mut data = sample_archive();
        let sig = SIG_CENTRAL_HEADER.to_le_bytes();
        let pos = data
            .windows(4)
            .position(|w| w == sig)
            .expect("central header present");
        data[pos + 8] |= (FLAG_ENCRYPTED & 0xFF) as u8;

        let err = ZipArchive::from_bytes(data).unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported(_)));
    }

    #[test]
    fn unknown_compression_method_is_unsupported() {
        let mut data = sample_archive();
        let sig = SIG_CENTRAL_HEADER.to_le_bytes();
        let pos = data
            .windows(4)
            .position(|w| w == sig)
            .expect("central header present");
        data[pos + 10..pos + 12].copy_from_slice(&97u16.to_le_bytes());

        let err = ZipArchive::from_bytes(data).unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported(_)));
    }

    #[test]
    fn zip64_sentinel_is_unsupported() {
        let mut data = sample_archive();
        let eocd = data.len() - END_OF_CENTRAL_DIR_LEN;
        // Both entry-count fields, so the count-mismatch check cannot trip first.
        data[eocd + 8..eocd + 10].copy_from_slice(&ZIP64_U16.to_le_bytes());
        data[eocd + 10..eocd + 12].copy_from_slice(&ZIP64_U16.to_le_bytes());

        let err = ZipArchive::from_bytes(data).unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported(_)));
    }

    // -----------------------------------------------------------------------
    // Entry name sanitation
    // -----------------------------------------------------------------------

    #[test]
    fn traversing_entry_name_is_skipped() {
        let mut data = sample_archive();
        // Same length as "com/a/Foo.class", but escapes the extraction root.
        patch(&mut data, b"com/a/Foo.class", b"../xxevil.class");

        let archive = ZipArchive::from_bytes(data).unwrap();
        assert_eq!(archive.unit_paths().unwrap(), vec![p("com/a/Foo$1.class")]);
    }

    #[test]
    fn directory_marker_is_skipped() {
        let mut data = sample_archive();
        patch(&mut data, b"com/a/Foo.class", b"com/a/Foo.clas/");

        let archive = ZipArchive::from_bytes(data).unwrap();
        assert_eq!(archive.unit_paths().unwrap(), vec![p("com/a/Foo$1.class")]);
    }
}
