//! CRC32 checksums as stored in GMA archives.
//!
//! Archives store a [`crc::CRC_32_ISO_HDLC`] checksum for every file and for the whole archive.
//! Writers produce the digest most significant byte first and reverse those bytes before
//! reading them back as a little-endian integer, which [`checksum`] reproduces.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};
use std::io::{self, Seek, SeekFrom, Write};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Computes the checksum of `data` the way it is stored in an archive
pub fn checksum(data: &[u8]) -> u32 {
    from_digest(CRC32.checksum(data))
}

fn from_digest(digest: u32) -> u32 {
    let mut bytes = digest.to_be_bytes();
    bytes.reverse();
    u32::from_le_bytes(bytes)
}

/// Incremental checksum over data fed in several pieces
pub struct Crc32Hasher {
    digest: Digest<'static, u32>,
}

impl Default for Crc32Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32Hasher {
    pub fn new() -> Self {
        Crc32Hasher {
            digest: CRC32.digest(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Checksum of everything passed to [`Crc32Hasher::update`] so far
    pub fn finalize(self) -> u32 {
        from_digest(self.digest.finalize())
    }
}

/// A writer that checksums and counts everything passed through it
pub(crate) struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: Crc32Hasher,
    total: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        ChecksumWriter {
            inner,
            hasher: Crc32Hasher::new(),
            total: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns the inner writer together with the checksum of everything written
    pub fn finish(self) -> (W, u32) {
        (self.inner, self.hasher.finalize())
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.total += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Only reports the current position, which is all `binrw` needs while writing
impl<W: Write> Seek for ChecksumWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Current(0) | SeekFrom::End(0) => Ok(self.total),
            SeekFrom::Start(offset) if offset == self.total => Ok(offset),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "checksummed output can not be seeked",
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::{checksum, ChecksumWriter, Crc32Hasher};

    #[test]
    fn checksum_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn hasher_matches_single_pass() {
        let data = b"print(\"hello from lua\")";

        let mut hasher = Crc32Hasher::new();
        for chunk in data.chunks(5) {
            hasher.update(chunk);
        }

        assert_eq!(hasher.finalize(), checksum(data));
    }

    #[test]
    fn writer_tracks_everything_written() -> std::io::Result<()> {
        let mut writer = ChecksumWriter::new(Vec::new());
        writer.write_all(b"12345")?;
        writer.write_all(b"6789")?;

        assert_eq!(writer.total(), 9);

        let (inner, crc) = writer.finish();
        assert_eq!(crc, 0xCBF43926);
        assert_eq!(inner, b"123456789".to_vec());

        Ok(())
    }
}
