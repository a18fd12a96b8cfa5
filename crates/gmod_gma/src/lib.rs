//! This library handles reading from and creating **GMA** addon archives used by *Garry's Mod*.
//!
//! # GMA Archive Format Documentation
//!
//! This crate provides utilities to decode a GMA archive into an in-memory [`Addon`] tree and to
//! encode such a tree back into the exact byte layout of the format. GMA files are identified by
//! the `GMAD` magic and are typically stored with the `.gma` extension.
//!
//! ## File Structure
//!
//! A GMA file consists of a header, the addon metadata, a file table, the concatenated file
//! contents and a trailing checksum.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x44414D47 ("GMAD")                               |
//! | 0x0004         | Version                | 1 byte: Format version, at most 3 is supported             |
//! | 0x0005         | Steam ID               | 8 bytes: Owner of the addon, opaque                        |
//! | 0x000D         | Timestamp              | 8 bytes: Unix seconds when the archive was created         |
//! | 0x0015         | Required Content       | Version > 1 only: strings terminated by an empty string    |
//! | -              | Name                   | String: Title of the addon                                 |
//! | -              | Description            | String: Free text, usually a JSON payload                  |
//! | -              | Author                 | String: Author of the addon                                |
//! | -              | Addon Version          | 4 bytes: Unused, always written as 1                       |
//! | -              | File Table             | Repeated entries, terminated by a zero index               |
//! | -              | File Contents          | Raw bytes of every entry in table order                    |
//! | EOF - 4        | Archive CRC32          | 4 bytes: Checksum of everything before it                  |
//!
//! ### Strings
//!
//! Every string is stored as UTF-8 followed by a null terminator. The single zero byte written after
//! the timestamp is therefore an empty required content list.
//!
//! ### File Table
//!
//! Each file is described by the following record:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Index                  | 4 bytes: 1-based position of the entry, 0 ends the table|
//! | 0x0004         | Name                   | String: Lower-case path using `/` separators            |
//! | -              | Size                   | 8 bytes: Signed size of the file contents               |
//! | -              | CRC32                  | 4 bytes: Checksum of the contents, or 0                 |
//!
//! The contents of the files follow the table without padding, so the offset of an entry is the
//! sum of the sizes of every entry before it.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.gma`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Checksums**: CRC-32/ISO-HDLC, see [`crc`]
//!

pub mod crc;
pub mod error;
#[cfg(feature = "serde")]
pub mod json;
pub mod read;
pub mod tree;
pub mod types;
pub mod write;

pub use read::{GmaArchive, GmaReadOptions};
pub use tree::{Addon, Directory, File, Node};
pub use write::{GmaWriter, GmaWriterOptions};

/// Magic bytes every GMA archive starts with
pub const GMA_MAGIC: &[u8; 4] = b"GMAD";

/// Highest format version this crate can read, and the version it writes
pub const GMA_VERSION: u8 = 3;
