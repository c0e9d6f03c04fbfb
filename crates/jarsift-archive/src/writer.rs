use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use jarsift_types::ArchivePath;

use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    CompressionMethod, DOS_EPOCH_DATE, DOS_EPOCH_TIME, END_OF_CENTRAL_DIR_LEN,
    SIG_CENTRAL_HEADER, SIG_END_OF_CENTRAL_DIR, SIG_LOCAL_HEADER, ZIP64_U16, ZIP64_U32,
};

/// One entry staged for writing, already compressed.
struct PendingEntry {
    method: CompressionMethod,
    crc32: u32,
    uncompressed_size: u32,
    data: Vec<u8>,
}

/// Builds a zip archive in memory with deterministic output.
///
/// Entries are emitted sorted by path with a fixed timestamp, so the same
/// content always produces byte-identical archives.
pub struct ZipWriter {
    entries: BTreeMap<ArchivePath, PendingEntry>,
}

impl ZipWriter {
    /// Create a writer with no entries.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Stage one entry. A second entry at the same path replaces the first.
    pub fn add(
        &mut self,
        path: ArchivePath,
        data: &[u8],
        method: CompressionMethod,
    ) -> ArchiveResult<()> {
        if data.len() as u64 >= u64::from(ZIP64_U32) {
            return Err(ArchiveError::Unsupported(format!(
                "entry {path} exceeds zip32 size limit"
            )));
        }
        let crc32 = crc32fast::hash(data);
        let compressed = match method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflated => {
                let mut encoder =
                    flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
        };
        if compressed.len() as u64 >= u64::from(ZIP64_U32) {
            return Err(ArchiveError::Unsupported(format!(
                "entry {path} exceeds zip32 size limit"
            )));
        }
        self.entries.insert(
            path,
            PendingEntry {
                method,
                crc32,
                uncompressed_size: data.len() as u32,
                data: compressed,
            },
        );
        Ok(())
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the archive to bytes.
    pub fn finish(self) -> ArchiveResult<Vec<u8>> {
        if self.entries.len() >= ZIP64_U16 as usize {
            return Err(ArchiveError::Unsupported(
                "too many entries for a zip32 archive".to_string(),
            ));
        }

        let mut out = Vec::new();
        let mut directory = Vec::new();
        let mut count: u16 = 0;

        for (path, entry) in &self.entries {
            let name = path.as_str().as_bytes();
            if name.len() > u16::MAX as usize {
                return Err(ArchiveError::Unsupported(format!(
                    "entry name too long: {path}"
                )));
            }
            let local_offset = out.len();
            if local_offset as u64 >= u64::from(ZIP64_U32) {
                return Err(ArchiveError::Unsupported(
                    "archive exceeds zip32 size limit".to_string(),
                ));
            }

            push_u32(&mut out, SIG_LOCAL_HEADER);
            push_u16(&mut out, 20); // version needed to extract
            push_u16(&mut out, 0); // flags
            push_u16(&mut out, entry.method.raw());
            push_u16(&mut out, DOS_EPOCH_TIME);
            push_u16(&mut out, DOS_EPOCH_DATE);
            push_u32(&mut out, entry.crc32);
            push_u32(&mut out, entry.data.len() as u32);
            push_u32(&mut out, entry.uncompressed_size);
            push_u16(&mut out, name.len() as u16);
            push_u16(&mut out, 0); // extra length
            out.extend_from_slice(name);
            out.extend_from_slice(&entry.data);

            push_u32(&mut directory, SIG_CENTRAL_HEADER);
            push_u16(&mut directory, 20); // version made by
            push_u16(&mut directory, 20); // version needed to extract
            push_u16(&mut directory, 0); // flags
            push_u16(&mut directory, entry.method.raw());
            push_u16(&mut directory, DOS_EPOCH_TIME);
            push_u16(&mut directory, DOS_EPOCH_DATE);
            push_u32(&mut directory, entry.crc32);
            push_u32(&mut directory, entry.data.len() as u32);
            push_u32(&mut directory, entry.uncompressed_size);
            push_u16(&mut directory, name.len() as u16);
            push_u16(&mut directory, 0); // extra length
            push_u16(&mut directory, 0); // comment length
            push_u16(&mut directory, 0); // disk number start
            push_u16(&mut directory, 0); // internal attributes
            push_u32(&mut directory, 0); // external attributes
            push_u32(&mut directory, local_offset as u32);
            directory.extend_from_slice(name);

            count += 1;
        }

        let central_offset = out.len();
        out.extend_from_slice(&directory);
        let central_size = out.len() - central_offset;

        if (out.len() + END_OF_CENTRAL_DIR_LEN) as u64 >= u64::from(ZIP64_U32) {
            return Err(ArchiveError::Unsupported(
                "archive exceeds zip32 size limit".to_string(),
            ));
        }

        push_u32(&mut out, SIG_END_OF_CENTRAL_DIR);
        push_u16(&mut out, 0); // disk number
        push_u16(&mut out, 0); // central directory disk
        push_u16(&mut out, count);
        push_u16(&mut out, count);
        push_u32(&mut out, central_size as u32);
        push_u32(&mut out, central_offset as u32);
        push_u16(&mut out, 0); // comment length
        Ok(out)
    }

    /// Serialize and write to disk in one step.
    pub fn write_to(self, path: &Path) -> ArchiveResult<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ZipArchive;
    use crate::source::Archive;

    fn p(s: &str) -> ArchivePath {
        ArchivePath::parse(s).unwrap()
    }

    #[test]
    fn deterministic_regardless_of_insertion_order() {
        let mut first = ZipWriter::new();
        first
            .add(p("a/A.class"), b"alpha", CompressionMethod::Deflated)
            .unwrap();
        first
            .add(p("b/B.class"), b"beta", CompressionMethod::Stored)
            .unwrap();

        let mut second = ZipWriter::new();
        second
            .add(p("b/B.class"), b"beta", CompressionMethod::Stored)
            .unwrap();
        second
            .add(p("a/A.class"), b"alpha", CompressionMethod::Deflated)
            .unwrap();

        assert_eq!(first.finish().unwrap(), second.finish().unwrap());
    }

    #[test]
    fn first_local_entry_is_lexicographically_first() {
        let mut writer = ZipWriter::new();
        writer
            .add(p("z/Last.class"), b"z", CompressionMethod::Stored)
            .unwrap();
        writer
            .add(p("a/First.class"), b"a", CompressionMethod::Stored)
            .unwrap();
        let bytes = writer.finish().unwrap();

        // Local header: 30 fixed bytes, then the entry name.
        let name = &bytes[30..30 + "a/First.class".len()];
        assert_eq!(name, b"a/First.class");
    }

    #[test]
    fn duplicate_path_replaces_entry() {
        let mut writer = ZipWriter::new();
        writer
            .add(p("a/Foo.class"), b"old", CompressionMethod::Stored)
            .unwrap();
        writer
            .add(p("a/Foo.class"), b"new", CompressionMethod::Stored)
            .unwrap();
        assert_eq!(writer.len(), 1);

        let archive = ZipArchive::from_bytes(writer.finish().unwrap()).unwrap();
        assert_eq!(
            archive.read_unit(&p("a/Foo.class")).unwrap(),
            Some(b"new".to_vec())
        );
    }

    #[test]
    fn empty_archive_is_bare_end_record() {
        let bytes = ZipWriter::new().finish().unwrap();
        assert_eq!(bytes.len(), END_OF_CENTRAL_DIR_LEN);

        let archive = ZipArchive::from_bytes(bytes).unwrap();
        assert!(archive.is_empty());
        assert!(archive.unit_paths().unwrap().is_empty());
    }

    #[test]
    fn deflate_shrinks_compressible_content() {
        let content = vec![b'a'; 4096];
        let mut writer = ZipWriter::new();
        writer
            .add(p("a/Big.class"), &content, CompressionMethod::Deflated)
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert!(bytes.len() < content.len());

        let archive = ZipArchive::from_bytes(bytes).unwrap();
        assert_eq!(archive.read_unit(&p("a/Big.class")).unwrap(), Some(content));
    }

    #[test]
    fn write_to_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("out.jar");

        let mut writer = ZipWriter::new();
        writer
            .add(p("com/a/Foo.class"), b"bytecode", CompressionMethod::Deflated)
            .unwrap();
        writer.write_to(&jar).unwrap();

        let archive = ZipArchive::open(&jar).unwrap();
        assert_eq!(
            archive.read_unit(&p("com/a/Foo.class")).unwrap(),
            Some(b"bytecode".to_vec())
        );
    }
}
