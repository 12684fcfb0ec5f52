//! # Error Types
//!
//! General error handling for reading, writing and querying source-level
//! debugging information.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::Section;
use crate::types::{Address, AddressRange};

/// Main error type for srcdbg operations
///
/// This enum represents all the ways reading, writing, or querying a debug
/// info file can fail. None of the library layers abort on malformed input;
/// every failure surfaces as one of these variants.
///
/// ## Error Categories
///
/// 1. **Structural file errors**: Truncated, TrailingBytes, BadMagic, UnsupportedFormat,
///    UnsupportedVersion, NoSourceFilePaths, MissingNullTerminator, InvalidIndex, SectionOverrun
/// 2. **Caller-misuse errors**: InvalidSourceIndex, IndexOverflow, AddressOverflow,
///    NotInitialized, UnknownRegister, ProviderNotFound, InvalidArgument
/// 3. **Resource errors**: OutOfMemory, FileOpen, FileWrite, FileClose, Io
/// 4. **Policy errors**: OverlappingRanges, OverlappingProviders
/// 5. **Composite errors**: ImportFailed
#[derive(Error, Debug)]
pub enum SrcdbgError
{
    /// The file ended before a section declared in the header
    ///
    /// `expected` is the file size required to hold every section up to and
    /// including `section`; `actual` is the real file size.
    #[error("File too small to contain {section}: need {expected} bytes, have {actual}")]
    Truncated
    {
        /// Section that does not fit
        section: Section,
        /// Minimum file size required through the end of `section`
        expected: u64,
        /// Actual file size
        actual: u64,
    },

    /// The file is larger than the sum of the section sizes in its header
    #[error("File size ({actual}) not an exact match to the sum of section sizes reported in header ({expected})")]
    TrailingBytes
    {
        /// File size implied by the header
        expected: u64,
        /// Actual file size
        actual: u64,
    },

    /// The file does not start with the `MDbI` magic tag
    #[error("Not a source-level debugging information file (magic {0:?})")]
    BadMagic([u8; 4]),

    /// The format type tag is not one this crate knows how to read
    #[error("Unsupported format type {0:?}: only 'simp' is currently supported")]
    UnsupportedFormat([u8; 4]),

    /// The format version is not supported
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u8),

    /// The source file path section is empty
    ///
    /// Every debug info file must name at least one source file.
    #[error("File contains no source file paths")]
    NoSourceFilePaths,

    /// The byte preceding the end of a string section is not a null terminator
    #[error("Null terminator missing at end of last entry in {section}")]
    MissingNullTerminator
    {
        /// String section missing its terminator
        section: Section,
    },

    /// A record references a string index that has not been read
    #[error("Invalid index {index} encountered in {section} (only {limit} available)")]
    InvalidIndex
    {
        /// Section containing the bad reference
        section: Section,
        /// Index as stored in the file
        index: u32,
        /// Number of entries available when the reference was read
        limit: u32,
    },

    /// A variable-length record runs past the end of its section
    #[error("Record at offset {offset} runs past the end of {section}")]
    SectionOverrun
    {
        /// Section containing the record
        section: Section,
        /// File offset at which the record begins
        offset: usize,
    },

    /// A line mapping was added for a source file index the writer never issued
    #[error("Invalid source file index {0}")]
    InvalidSourceIndex(u32),

    /// A table grew beyond what its on-disk index type can address
    #[error("Index overflow: too many {0}")]
    IndexOverflow(&'static str),

    /// Shifting an address by an offset left the 16-bit address space
    #[error("Address {address} shifted by {offset} leaves the 16-bit address space")]
    AddressOverflow
    {
        /// Original address
        address: Address,
        /// Offset that was applied
        offset: i32,
    },

    /// Allocation failed while growing writer state
    #[error("Out of memory")]
    OutOfMemory,

    /// Failed to open a file for reading or writing
    #[error("Failed to open {}: {source}", path.display())]
    FileOpen
    {
        /// Path that could not be opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to an output file
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite
    {
        /// Path of the output file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to flush and close an output file
    #[error("Failed to close {}: {source}", path.display())]
    FileClose
    {
        /// Path of the output file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Importing an existing debug info file into a writer failed
    #[error("Failed to import {}: {source}", path.display())]
    ImportFailed
    {
        /// Path (or placeholder for in-memory data) being imported
        path: PathBuf,
        /// Why the import failed
        #[source]
        source: Box<SrcdbgError>,
    },

    /// Local relative symbols were queried before `complete_initialization`
    #[error("Local relative symbols have not been resolved; call complete_initialization first")]
    NotInitialized,

    /// A relative symbol rule references a register the CPU does not have
    #[error("Unknown register id {0}")]
    UnknownRegister(u8),

    /// Two line mappings of one file overlap (strict overlap policy)
    #[error("Line mapping {first} overlaps {second}")]
    OverlappingRanges
    {
        /// Earlier range in address order
        first: AddressRange,
        /// Later range that starts inside `first`
        second: AddressRange,
    },

    /// Two enabled providers cover the same addresses (strict overlap policy)
    #[error("Debug info '{first}' overlaps '{second}' at {address}")]
    OverlappingProviders
    {
        /// Name of the first provider
        first: String,
        /// Name of the second provider
        second: String,
        /// First address covered by both
        address: Address,
    },

    /// No provider exists at the given aggregator position
    #[error("No debug info provider at index {0}")]
    ProviderNotFound(usize),

    /// Invalid argument passed to a srcdbg function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error not tied to a specific open/write/close step
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::collections::TryReserveError> for SrcdbgError
{
    fn from(_: std::collections::TryReserveError) -> Self
    {
        SrcdbgError::OutOfMemory
    }
}

/// Status codes returned across the C interface
///
/// Values 0 through 6 match the codes toolchains already compile against;
/// later codes are appended.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterStatus
{
    Success = 0,
    OutOfMemory = 1,
    ImportFailed = 2,
    FileOpen = 3,
    FileWrite = 4,
    FileClose = 5,
    InvalidSourceIndex = 6,
    IndexOverflow = 7,
    InvalidArgument = 8,
}

impl WriterStatus
{
    /// Raw integer code as seen by C callers.
    #[must_use]
    pub const fn code(self) -> i32
    {
        self as i32
    }
}

impl SrcdbgError
{
    /// Collapse this error onto the fixed set of C status codes.
    #[must_use]
    pub fn status(&self) -> WriterStatus
    {
        match self {
            SrcdbgError::OutOfMemory => WriterStatus::OutOfMemory,
            SrcdbgError::FileOpen { .. } => WriterStatus::FileOpen,
            SrcdbgError::FileWrite { .. } | SrcdbgError::Io(_) => WriterStatus::FileWrite,
            SrcdbgError::FileClose { .. } => WriterStatus::FileClose,
            SrcdbgError::InvalidSourceIndex(_) => WriterStatus::InvalidSourceIndex,
            SrcdbgError::IndexOverflow(_) => WriterStatus::IndexOverflow,
            SrcdbgError::ImportFailed { .. }
            | SrcdbgError::Truncated { .. }
            | SrcdbgError::TrailingBytes { .. }
            | SrcdbgError::BadMagic(_)
            | SrcdbgError::UnsupportedFormat(_)
            | SrcdbgError::UnsupportedVersion(_)
            | SrcdbgError::NoSourceFilePaths
            | SrcdbgError::MissingNullTerminator { .. }
            | SrcdbgError::InvalidIndex { .. }
            | SrcdbgError::SectionOverrun { .. }
            | SrcdbgError::AddressOverflow { .. } => WriterStatus::ImportFailed,
            SrcdbgError::NotInitialized
            | SrcdbgError::UnknownRegister(_)
            | SrcdbgError::OverlappingRanges { .. }
            | SrcdbgError::OverlappingProviders { .. }
            | SrcdbgError::ProviderNotFound(_)
            | SrcdbgError::InvalidArgument(_) => WriterStatus::InvalidArgument,
        }
    }
}

/// Convenience type alias for `Result<T, SrcdbgError>`
///
/// ```rust
/// use srcdbg_core::error::SrcdbgResult;
/// fn foo() -> SrcdbgResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SrcdbgResult<T> = std::result::Result<T, SrcdbgError>;
