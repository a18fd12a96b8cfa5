//! Base types for structure of GMA file.

use binrw::{BinRead, BinWrite, NullString};

/// GMA file header
///
/// Follows the "GMAD" magic, which is handled by the reader and writer so a bad magic can be
/// told apart from other failures. All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct GmaHeader {
    /// The format version of the archive
    pub version: u8,

    /// The Steam ID of the owner, writers leave this at zero
    pub steam_id: u64,

    /// Unix seconds at which the archive was created
    pub timestamp: u64,
}

/// Metadata describing the addon itself
///
/// Follows the required content list, which only exists from version 2 onward
#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[brw(little)]
pub struct GmaDescriptor {
    pub name: NullString,

    /// Usually a JSON payload carrying a description, type and tags
    pub description: NullString,

    pub author: NullString,

    /// Unused by the game, always written as 1
    pub addon_version: u32,
}

/// A record in the file table
///
/// Every record is preceded by its 1-based index, a zero index ends the table
#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[brw(little)]
pub struct GmaEntryRecord {
    /// Path of the file inside the addon, using `/` as separator
    pub name: NullString,

    /// Size of the file contents
    pub size: i64,

    /// A [`crate::crc::checksum`] of the contents, or 0 when not computed
    pub crc: u32,
}
