//! Types for writing GMA archives
//!

use binrw::{BinWrite, NullString};
use bon::Builder;
use byteorder::{LittleEndian, WriteBytesExt};
use bytes::Bytes;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use crate::crc::{self, ChecksumWriter};
use crate::error::{Error, Result};
use crate::tree::{Addon, Directory, File};
use crate::types::{GmaDescriptor, GmaEntryRecord, GmaHeader};
use crate::{GMA_MAGIC, GMA_VERSION};

/// Options for how the GMA file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct GmaWriterOptions {
    /// Owner stored in the header
    #[builder(default)]
    pub steam_id: u64,

    /// Unix seconds stored in the header, the current time when unset
    pub timestamp: Option<u64>,

    /// Value of the unused addon version field
    #[builder(default = 1)]
    pub addon_version: u32,
}

impl Default for GmaWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GmaWriterOptions {
    fn timestamp(&self) -> u64 {
        self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        })
    }
}

/// GMA archive generator
///
/// Checksums are written when [`Addon::verify_integrity`] is set, zeros otherwise.
///
/// ```
/// # fn doit() -> gmod_gma::error::Result<()>
/// # {
/// use gmod_gma::{Addon, GmaWriter, GmaWriterOptions};
///
/// let mut addon = Addon::new("test", "{}", "me").with_integrity(true);
/// addon.insert_file("lua/autorun/init.lua", "print(1)")?;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let writer = GmaWriter::new(Vec::<u8>::new(), GmaWriterOptions::builder().timestamp(0).build());
/// let bytes = writer.write_addon(&addon)?;
///
/// assert_eq!(&bytes[..4], b"GMAD");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct GmaWriter<W: Write> {
    inner: ChecksumWriter<W>,
    options: GmaWriterOptions,
}

impl<W: Write> GmaWriter<W> {
    pub fn new(inner: W, options: GmaWriterOptions) -> GmaWriter<W> {
        GmaWriter {
            inner: ChecksumWriter::new(inner),
            options,
        }
    }

    /// Serializes `addon` and returns the inner writer
    ///
    /// Empty files, strings holding a NUL byte and paths that only differ in case are rejected
    /// before anything is written.
    #[instrument(skip_all, err, fields(name = %addon.name))]
    pub fn write_addon(mut self, addon: &Addon) -> Result<W> {
        let files: Vec<(String, &File)> = addon.files().collect();
        let names = validate(addon, &files)?;

        self.write_header(addon)?;
        self.write_file_table(&names, &files, addon.verify_integrity)?;
        self.write_contents(&files)?;

        let (mut inner, checksum) = self.inner.finish();
        let trailer = if addon.verify_integrity { checksum } else { 0 };
        inner.write_u32::<LittleEndian>(trailer)?;

        Ok(inner)
    }

    fn write_header(&mut self, addon: &Addon) -> Result<()> {
        self.inner.write_all(GMA_MAGIC)?;

        GmaHeader {
            version: GMA_VERSION,
            steam_id: self.options.steam_id,
            timestamp: self.options.timestamp(),
        }
        .write(&mut self.inner)?;

        // Empty required content list
        self.inner.write_u8(0)?;

        GmaDescriptor {
            name: NullString::from(addon.name.as_str()),
            description: NullString::from(addon.description.as_str()),
            author: NullString::from(addon.author.as_str()),
            addon_version: self.options.addon_version,
        }
        .write(&mut self.inner)?;

        Ok(())
    }

    fn write_file_table(
        &mut self,
        names: &[String],
        files: &[(String, &File)],
        with_crc: bool,
    ) -> Result<()> {
        for (index, (name, (_, file))) in names.iter().zip(files).enumerate() {
            debug!(index = index + 1, name = %name, size = file.size(), "writing entry");

            self.inner.write_u32::<LittleEndian>(index as u32 + 1)?;
            GmaEntryRecord {
                name: NullString::from(name.as_str()),
                size: file.size() as i64,
                crc: if with_crc { crc::checksum(file.data()) } else { 0 },
            }
            .write(&mut self.inner)?;
        }

        self.inner.write_u32::<LittleEndian>(0)?;

        Ok(())
    }

    fn write_contents(&mut self, files: &[(String, &File)]) -> Result<()> {
        for (path, file) in files {
            let before = self.inner.total();
            let result = self.inner.write_all(file.data());
            let written = self.inner.total() - before;

            if let Err(err) = result {
                if err.kind() != io::ErrorKind::WriteZero {
                    return Err(err.into());
                }
            }
            if written != file.size() {
                return Err(Error::ShortWrite {
                    name: path.clone(),
                    expected: file.size(),
                    written,
                });
            }
        }

        Ok(())
    }
}

/// Checks everything that would make the archive unreadable, returning the names stored in the
/// file table
fn validate(addon: &Addon, files: &[(String, &File)]) -> Result<Vec<String>> {
    for (field, value) in [
        ("name", &addon.name),
        ("description", &addon.description),
        ("author", &addon.author),
    ] {
        if value.contains('\0') {
            return Err(Error::InvalidString(format!("addon {field}")));
        }
    }

    // Names are stored lower case, so they must still form a valid tree once lowered
    let mut lowered = Directory::new();
    let mut names = Vec::with_capacity(files.len());
    for (path, file) in files {
        if file.is_empty() {
            return Err(Error::EmptyFile(path.clone()));
        }
        if path.contains('\0') {
            return Err(Error::InvalidString(format!("path \"{}\"", path.escape_debug())));
        }

        let name = path.to_lowercase();
        lowered.insert_file(&name, Bytes::new())?;
        names.push(name);
    }

    Ok(names)
}

impl Addon {
    /// Encode this addon into `writer`
    pub fn write<W: Write>(&self, writer: W, options: GmaWriterOptions) -> Result<W> {
        GmaWriter::new(writer, options).write_addon(self)
    }

    /// Encode this addon into a new buffer
    pub fn to_bytes(&self, options: GmaWriterOptions) -> Result<Vec<u8>> {
        self.write(Vec::new(), options)
    }
}
