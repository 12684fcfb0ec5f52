//! Source file and source location types.

use std::fmt;

use super::AddressRange;

/// A source file named by a debug info file
///
/// `built` is the path exactly as the toolchain recorded it. `local` is where
/// that file was found on this machine after applying the configured path map
/// and search path, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilePath
{
    built: String,
    local: Option<String>,
}

impl SourceFilePath
{
    /// Construct from a built path and its resolved local copy.
    pub fn new(built: impl Into<String>, local: Option<String>) -> Self
    {
        Self {
            built: built.into(),
            local,
        }
    }

    /// Path as recorded by the toolchain.
    pub fn built(&self) -> &str
    {
        &self.built
    }

    /// Resolved local path, if one was found.
    pub fn local(&self) -> Option<&str>
    {
        self.local.as_deref()
    }

    /// Preferred path for opening the file (local, falling back to built).
    pub fn display_path(&self) -> &str
    {
        self.local.as_deref().unwrap_or(&self.built)
    }
}

impl fmt::Display for SourceFilePath
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_path())
    }
}

/// A (source file index, line number) pair
///
/// Inside a provider the file index is provider-local; the aggregator
/// translates it into the coalesced index space before handing it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileLine
{
    /// 0-based source file index
    pub file_index: u32,
    /// 1-based line number
    pub line_number: u32,
}

impl FileLine
{
    #[must_use]
    pub const fn new(file_index: u32, line_number: u32) -> Self
    {
        Self { file_index, line_number }
    }
}

impl fmt::Display for FileLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "file {} line {}", self.file_index, self.line_number)
    }
}

/// One line mapping: an address range that a source line assembled into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineMapping
{
    pub range: AddressRange,
    /// Index of the owning source file (provider-local)
    pub source_file_index: u16,
    /// 1-based line number
    pub line_number: u32,
}

impl LineMapping
{
    #[must_use]
    pub const fn new(first: u16, last: u16, source_file_index: u16, line_number: u32) -> Self
    {
        Self {
            range: AddressRange::new(first, last),
            source_file_index,
            line_number,
        }
    }

    /// Location this mapping points at.
    #[must_use]
    pub fn file_line(&self) -> FileLine
    {
        FileLine::new(u32::from(self.source_file_index), self.line_number)
    }
}
