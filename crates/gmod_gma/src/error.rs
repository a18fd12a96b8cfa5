//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file does not start with the GMAD magic
    #[error("file is an invalid gma archive")]
    #[diagnostic(help("gma archives start with the bytes \"GMAD\""))]
    InvalidMagic,

    /// archive declares a version newer than this library understands
    #[error("unsupported gma version {0}, at most {max} is supported", max = crate::GMA_VERSION)]
    UnsupportedVersion(u8),

    /// stream ended while reading {0}
    #[error("archive ended unexpectedly while reading {0}")]
    Truncated(&'static str),

    /// entry declares a negative size
    #[error("\"{name}\" has an invalid size of {size}")]
    InvalidEntrySize { name: String, size: i64 },

    /// stored checksum of an entry does not match its contents
    #[error("\"{name}\" calculated checksum ({actual:#010X}) doesn't match the one in the file ({expected:#010X})")]
    EntryChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// trailing checksum does not match the archive contents
    #[error("archive checksum ({actual:#010X}) doesn't match the one at the end of the file ({expected:#010X})")]
    ArchiveChecksumMismatch { expected: u32, actual: u32 },

    /// archives cannot hold files without contents
    #[error("file \"{0}\" is empty")]
    #[diagnostic(help("remove the file or give it contents before packing"))]
    EmptyFile(String),

    /// sink accepted fewer bytes than the file holds
    #[error("failed to write \"{name}\": wrote {written} of {expected} bytes")]
    ShortWrite {
        name: String,
        expected: u64,
        written: u64,
    },

    /// path collides with an existing file or directory
    #[error("path \"{0}\" conflicts with an existing entry")]
    PathConflict(String),

    /// path has no usable components
    #[error("path \"{0}\" is not a valid file path")]
    InvalidPath(String),

    /// string field holds a NUL byte, which would end it early on the wire
    #[error("{0} contains a NUL byte")]
    #[diagnostic(help("strings in gma archives are NUL terminated"))]
    InvalidString(String),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// description is not a valid addon description payload
    #[cfg(feature = "serde")]
    #[error("addon description is not valid json")]
    InvalidDescription(#[from] serde_json::Error),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Maps end of stream failures from `binrw` onto [`Error::Truncated`]
pub(crate) fn truncated(what: &'static str) -> impl FnOnce(binrw::Error) -> Error {
    move |err| {
        if err.is_eof() {
            Error::Truncated(what)
        } else {
            Error::BinRWError(err)
        }
    }
}

/// Maps end of stream failures from [`std::io`] onto [`Error::Truncated`]
pub(crate) fn truncated_io(what: &'static str) -> impl FnOnce(std::io::Error) -> Error {
    move |err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated(what)
        } else {
            Error::IOError(err)
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
