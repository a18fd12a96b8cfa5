//! Types for reading GMA archives
//!

use binrw::{BinRead, NullString};
use bon::Builder;
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, instrument, warn};

use crate::crc;
use crate::error::{truncated, truncated_io, Error, FileNotFoundError, Result};
use crate::tree::{Addon, PATH_SEPARATOR};
use crate::types::{GmaDescriptor, GmaEntryRecord, GmaHeader};
use crate::{GMA_MAGIC, GMA_VERSION};

/// Options for how a GMA file should be read
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct GmaReadOptions {
    /// Verify the checksum of every entry and of the whole archive
    #[builder(default)]
    pub verify_integrity: bool,
}

/// A record of the file table, locating one file inside the contents block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonEntry {
    /// Path of the file, using [`PATH_SEPARATOR`]
    pub name: String,

    /// Size of the file contents
    pub size: u64,

    /// Checksum stored in the table, 0 when the writer skipped it
    pub crc: u32,

    /// 1-based index marker that preceded the record
    pub file_index: u32,

    /// Offset from the start of the contents block, the sum of every previous size
    pub offset: u64,
}

/// A parsed GMA archive
///
/// Holds the whole source in one shared buffer; file contents handed out by
/// [`GmaArchive::entry_data`] or [`GmaArchive::into_addon`] are views into it.
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_gma_contents(reader: impl Read + Seek) -> gmod_gma::error::Result<()> {
///     let gma = gmod_gma::GmaArchive::new(reader, Default::default())?;
///
///     for entry in gma.entries() {
///         println!("{}: {} bytes", entry.name, entry.size);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GmaArchive {
    header: GmaHeader,
    required_content: Vec<String>,
    descriptor: GmaDescriptor,
    entries: Vec<AddonEntry>,
    source: Bytes,
    contents_start: usize,
    verified: bool,
}

impl GmaArchive {
    /// Read a GMA archive collecting the entries it contains.
    ///
    /// The source is read from its start. On success the reader is left at position 0.
    #[instrument(skip(reader), err)]
    pub fn new<R: Read + Seek>(mut reader: R, options: GmaReadOptions) -> Result<GmaArchive> {
        reader.seek(SeekFrom::Start(0))?;

        let mut source = Vec::new();
        reader.read_to_end(&mut source)?;

        let archive = Self::parse(Bytes::from(source), options)?;

        reader.seek(SeekFrom::Start(0))?;

        Ok(archive)
    }

    /// Parse an archive that is already in memory
    pub fn from_bytes(source: impl Into<Bytes>, options: GmaReadOptions) -> Result<GmaArchive> {
        Self::parse(source.into(), options)
    }

    fn parse(source: Bytes, options: GmaReadOptions) -> Result<GmaArchive> {
        let mut reader = Cursor::new(source.as_ref());

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(truncated_io("header"))?;
        if &magic != GMA_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let header = GmaHeader::read(&mut reader).map_err(truncated("header"))?;
        if header.version > GMA_VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let required_content = if header.version > 1 {
            Self::read_required_content(&mut reader)?
        } else {
            Vec::new()
        };

        let descriptor = GmaDescriptor::read(&mut reader).map_err(truncated("addon metadata"))?;
        let entries = read_file_table(&mut reader)?;

        let contents_start = reader.position() as usize;
        let contents_end = entries
            .last()
            .map_or(Some(0), |e| e.offset.checked_add(e.size))
            .and_then(|len| usize::try_from(len).ok())
            .and_then(|len| contents_start.checked_add(len))
            .ok_or(Error::Truncated("file contents"))?;
        if contents_end > source.len() {
            return Err(Error::Truncated("file contents"));
        }

        let archive = GmaArchive {
            header,
            required_content,
            descriptor,
            entries,
            source,
            contents_start,
            verified: options.verify_integrity,
        };

        if options.verify_integrity {
            archive.verify()?;
        }

        Ok(archive)
    }

    fn read_required_content(reader: &mut Cursor<&[u8]>) -> Result<Vec<String>> {
        let mut content = Vec::new();
        loop {
            let value = NullString::read_le(reader).map_err(truncated("required content"))?;
            if value.0.is_empty() {
                break;
            }
            content.push(decode_lossy("required content", &value));
        }
        Ok(content)
    }

    /// Compares the stored checksums against the contents of every entry and the whole archive
    #[instrument(skip(self), err)]
    pub fn verify(&self) -> Result<()> {
        for entry in &self.entries {
            let actual = crc::checksum(&self.entry_data(entry));
            if actual != entry.crc {
                return Err(Error::EntryChecksumMismatch {
                    name: entry.name.clone(),
                    expected: entry.crc,
                    actual,
                });
            }
        }

        let Some(trailer_start) = self.source.len().checked_sub(4) else {
            return Err(Error::Truncated("archive checksum"));
        };
        if trailer_start < self.contents_end() {
            return Err(Error::Truncated("archive checksum"));
        }

        let expected = (&self.source[trailer_start..])
            .read_u32::<LittleEndian>()
            .map_err(truncated_io("archive checksum"))?;
        let actual = crc::checksum(&self.source[..trailer_start]);
        if actual != expected {
            return Err(Error::ArchiveChecksumMismatch { expected, actual });
        }

        Ok(())
    }

    /// Format version of the archive
    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Steam ID of the owner, usually 0
    pub fn steam_id(&self) -> u64 {
        self.header.steam_id
    }

    /// Unix seconds at which the archive was written
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Legacy list of required content, only present from version 2 onward
    pub fn required_content(&self) -> &[String] {
        &self.required_content
    }

    pub fn name(&self) -> String {
        decode_lossy("name", &self.descriptor.name)
    }

    pub fn description(&self) -> String {
        decode_lossy("description", &self.descriptor.description)
    }

    pub fn author(&self) -> String {
        decode_lossy("author", &self.descriptor.author)
    }

    /// Unused addon version field
    pub fn addon_version(&self) -> u32 {
        self.descriptor.addon_version
    }

    /// Number of entries contained in this GMA.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this GMA archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of the file table, in table order
    pub fn entries(&self) -> &[AddonEntry] {
        &self.entries
    }

    /// Get an entry by its position in the table
    pub fn by_index(&self, index: usize) -> Result<&AddonEntry> {
        self.entries
            .get(index)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))
    }

    /// Search for an entry by its path
    pub fn by_name(&self, name: &str) -> Result<&AddonEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::FileNotFound(FileNotFoundError::Name(name.to_owned())))
    }

    /// Offset of the contents block from the start of the archive
    pub fn contents_start(&self) -> u64 {
        self.contents_start as u64
    }

    /// A view of the contents of `entry`, sharing the archive's buffer
    pub fn entry_data(&self, entry: &AddonEntry) -> Bytes {
        let start = self.contents_start + entry.offset as usize;
        self.source.slice(start..start + entry.size as usize)
    }

    /// The raw bytes the archive was read from
    pub fn source(&self) -> &Bytes {
        &self.source
    }

    fn contents_end(&self) -> usize {
        self.entries.last().map_or(self.contents_start, |e| {
            self.contents_start + (e.offset + e.size) as usize
        })
    }

    /// Builds the addon tree, attaching every entry at its path
    #[instrument(skip(self), err)]
    pub fn into_addon(self) -> Result<Addon> {
        let mut addon = Addon::new(self.name(), self.description(), self.author())
            .with_integrity(self.verified);

        for entry in &self.entries {
            addon.insert_file(&entry.name, self.entry_data(entry))?;
        }

        Ok(addon)
    }
}

/// Reads file table records until the terminating zero index
///
/// Offsets are computed from the sizes, entries are contiguous starting at 0.
pub fn read_file_table<R: Read + Seek>(reader: &mut R) -> Result<Vec<AddonEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0u64;

    loop {
        let file_index = reader
            .read_u32::<LittleEndian>()
            .map_err(truncated_io("file table"))?;
        if file_index == 0 {
            break;
        }

        let record = GmaEntryRecord::read(reader).map_err(truncated("file table"))?;
        let name = decode_lossy("file name", &record.name)
            .replace('\\', &PATH_SEPARATOR.to_string());

        let size = u64::try_from(record.size).map_err(|_| Error::InvalidEntrySize {
            name: name.clone(),
            size: record.size,
        })?;

        let expected_index = entries.len() as u32 + 1;
        if file_index != expected_index {
            warn!(file_index, expected_index, name = %name, "unexpected file index");
        }

        debug!(name = %name, size, offset, "read entry");

        let entry = AddonEntry {
            name,
            size,
            crc: record.crc,
            file_index,
            offset,
        };

        offset = offset
            .checked_add(size)
            .ok_or(Error::InvalidEntrySize {
                name: entry.name.clone(),
                size: record.size,
            })?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Decodes a string field, replacing invalid UTF-8 sequences
fn decode_lossy(field: &'static str, value: &NullString) -> String {
    match String::from_utf8_lossy(&value.0) {
        Cow::Borrowed(value) => value.to_owned(),
        Cow::Owned(value) => {
            warn!(field, value = %value, "replaced invalid utf-8");
            value
        }
    }
}

impl Addon {
    /// Decode an addon from a GMA archive
    pub fn read<R: Read + Seek>(reader: R, options: GmaReadOptions) -> Result<Addon> {
        GmaArchive::new(reader, options)?.into_addon()
    }

    /// Decode an addon from a GMA archive that is already in memory
    pub fn from_bytes(source: impl Into<Bytes>, options: GmaReadOptions) -> Result<Addon> {
        GmaArchive::from_bytes(source, options)?.into_addon()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Seek};
    use tracing_test::traced_test;

    use crate::crc;
    use crate::error::{Error, Result};
    use crate::read::{read_file_table, GmaArchive, GmaReadOptions};
    use crate::tree::{Addon, Node};

    #[rustfmt::skip]
    const HEADER_V3: [u8; 22] = [
        b'G', b'M', b'A', b'D',
        0x03,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Required content
        0x00,
    ];

    #[rustfmt::skip]
    const METADATA: [u8; 15] = [
        b't', b'e', b's', b't', 0x00,
        b'{', b'}', 0x00,
        b'm', b'e', 0x00,
        0x01, 0x00, 0x00, 0x00,
    ];

    fn single_entry_archive(crc: u32) -> Vec<u8> {
        let mut input = HEADER_V3.to_vec();
        input.extend_from_slice(&METADATA);
        input.extend_from_slice(&1u32.to_le_bytes());
        input.extend_from_slice(b"hello.txt\0");
        input.extend_from_slice(&11i64.to_le_bytes());
        input.extend_from_slice(&crc.to_le_bytes());
        input.extend_from_slice(&0u32.to_le_bytes());
        input.extend_from_slice(b"Hello World");

        let trailer = crc::checksum(&input);
        input.extend_from_slice(&trailer.to_le_bytes());
        input
    }

    #[test]
    fn read_invalid_magic() {
        let mut input = single_entry_archive(0);
        input[0] = b'X';

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default());
        assert!(matches!(archive, Err(Error::InvalidMagic)));
    }

    #[test]
    fn read_short_magic() {
        let archive = GmaArchive::from_bytes(b"GM".to_vec(), GmaReadOptions::default());
        assert!(matches!(archive, Err(Error::Truncated(_))));
    }

    #[test]
    fn read_unsupported_version() {
        let mut input = single_entry_archive(0);
        input[4] = 4;

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default());
        assert!(matches!(archive, Err(Error::UnsupportedVersion(4))));
    }

    #[test]
    fn read_version_one_skips_required_content() -> Result<()> {
        let mut input = HEADER_V3[..21].to_vec();
        input[4] = 1;
        input.extend_from_slice(&METADATA);
        input.extend_from_slice(&0u32.to_le_bytes());
        input.extend_from_slice(&0u32.to_le_bytes());

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default())?;
        assert_eq!(archive.version(), 1);
        assert_eq!(archive.name(), "test");
        assert_eq!(archive.author(), "me");
        assert!(archive.is_empty());

        Ok(())
    }

    #[test]
    fn read_required_content_list() -> Result<()> {
        let mut input = HEADER_V3[..21].to_vec();
        input.extend_from_slice(b"base\0extra\0\0");
        input.extend_from_slice(&METADATA);
        input.extend_from_slice(&0u32.to_le_bytes());

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default())?;
        assert_eq!(archive.required_content(), ["base", "extra"]);
        assert_eq!(archive.description(), "{}");

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_single_entry() -> Result<()> {
        let input = single_entry_archive(0);

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default())?;
        assert_eq!(archive.len(), 1);

        let entry = archive.by_index(0)?;
        assert_eq!(entry.name, "hello.txt");
        assert_eq!(entry.size, 11);
        assert_eq!(entry.file_index, 1);
        assert_eq!(entry.offset, 0);
        assert_eq!(archive.contents_start(), 22 + 15 + 4 + 10 + 8 + 4 + 4);
        assert_eq!(archive.entry_data(entry).as_ref(), b"Hello World");

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_invalid_utf8_name() -> Result<()> {
        let mut input = single_entry_archive(0);
        input[22] = 0xFF;

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default())?;
        assert_eq!(archive.name(), "\u{FFFD}est");
        assert!(logs_contain("replaced invalid utf-8"));

        assert_eq!(archive.author(), "me");

        Ok(())
    }

    #[test]
    fn read_verified_entry() -> Result<()> {
        let input = single_entry_archive(crc::checksum(b"Hello World"));

        let addon = Addon::from_bytes(
            input,
            GmaReadOptions::builder().verify_integrity(true).build(),
        )?;
        assert!(addon.verify_integrity);
        assert_eq!(addon.by_name("hello.txt")?.data().as_ref(), b"Hello World");

        Ok(())
    }

    #[test]
    fn read_entry_checksum_mismatch() {
        let input = single_entry_archive(0x1234);

        let archive = GmaArchive::from_bytes(
            input,
            GmaReadOptions::builder().verify_integrity(true).build(),
        );
        match archive {
            Err(Error::EntryChecksumMismatch {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "hello.txt");
                assert_eq!(expected, 0x1234);
                assert_eq!(actual, crc::checksum(b"Hello World"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn read_archive_checksum_mismatch() {
        let mut input = single_entry_archive(crc::checksum(b"Hello World"));
        let last = input.len() - 1;
        input[last] ^= 0xFF;

        let archive = GmaArchive::from_bytes(
            input,
            GmaReadOptions::builder().verify_integrity(true).build(),
        );
        assert!(matches!(
            archive,
            Err(Error::ArchiveChecksumMismatch { .. })
        ));
    }

    #[test]
    fn read_verified_without_trailer() {
        let mut input = single_entry_archive(crc::checksum(b"Hello World"));
        input.truncate(input.len() - 4);

        let archive = GmaArchive::from_bytes(
            input.clone(),
            GmaReadOptions::builder().verify_integrity(true).build(),
        );
        assert!(matches!(
            archive,
            Err(Error::Truncated("archive checksum"))
        ));

        // A partial trailer is still missing
        input.extend_from_slice(&[0x00, 0x00]);
        let archive = GmaArchive::from_bytes(
            input,
            GmaReadOptions::builder().verify_integrity(true).build(),
        );
        assert!(matches!(
            archive,
            Err(Error::Truncated("archive checksum"))
        ));
    }

    #[test]
    fn read_skips_checksums_unless_asked() -> Result<()> {
        let mut input = single_entry_archive(0x1234);
        let last = input.len() - 1;
        input[last] ^= 0xFF;

        let addon = Addon::from_bytes(input, GmaReadOptions::default())?;
        assert!(!addon.verify_integrity);
        assert_eq!(addon.len(), 1);

        Ok(())
    }

    #[test]
    fn read_file_table_without_terminator() {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x01, 0x00, 0x00, 0x00,
            b'a', 0x00,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
        ]);

        assert!(matches!(
            read_file_table(&mut input),
            Err(Error::Truncated("file table"))
        ));
    }

    #[test]
    fn read_file_table_offsets() -> Result<()> {
        let mut input = Vec::new();
        for (index, (name, size)) in [("a", 3i64), ("b\\c", 5), ("d", 7)].iter().enumerate() {
            input.extend_from_slice(&(index as u32 + 1).to_le_bytes());
            input.extend_from_slice(name.as_bytes());
            input.push(0);
            input.extend_from_slice(&size.to_le_bytes());
            input.extend_from_slice(&0u32.to_le_bytes());
        }
        input.extend_from_slice(&0u32.to_le_bytes());

        let entries = read_file_table(&mut Cursor::new(input))?;
        assert_eq!(
            entries.iter().map(|e| e.offset).collect::<Vec<_>>(),
            vec![0, 3, 8]
        );
        assert_eq!(entries[1].name, "b/c");
        for pair in entries.windows(2) {
            assert_eq!(pair[1].offset, pair[0].offset + pair[0].size);
        }

        Ok(())
    }

    #[test]
    fn read_negative_size() {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x01, 0x00, 0x00, 0x00,
            b'a', 0x00,
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);

        assert!(matches!(
            read_file_table(&mut input),
            Err(Error::InvalidEntrySize { size: -1, .. })
        ));
    }

    #[test]
    fn read_contents_past_end() {
        let mut input = single_entry_archive(0);
        input.truncate(input.len() - 10);

        let archive = GmaArchive::from_bytes(input, GmaReadOptions::default());
        assert!(matches!(archive, Err(Error::Truncated("file contents"))));
    }

    #[test]
    fn read_rewinds_reader() -> Result<()> {
        let mut reader = Cursor::new(single_entry_archive(0));
        reader.seek(std::io::SeekFrom::End(0))?;

        let addon = Addon::read(&mut reader, GmaReadOptions::default())?;
        assert_eq!(reader.stream_position()?, 0);
        assert!(matches!(addon.root().get("hello.txt"), Some(Node::File(_))));

        Ok(())
    }
}
