//! # Debug Info Providers
//!
//! The format-agnostic interface a debugger queries for one loaded debug
//! info file.
//!
//! A provider answers three kinds of questions:
//!
//! - **Lines to addresses**: which address ranges did a source line assemble into?
//! - **Addresses to lines**: which source line produced the byte at an address?
//! - **Symbols**: which global and local symbols does the file define?
//!
//! File indices in a provider are local to it. When several files are
//! loaded together, [`crate::aggregator::SourceDebugInfo`] maps them into a
//! single coalesced index space.
//!
//! ## Lifecycle
//!
//! 1. Construct from bytes or a path: [`create_provider`] or [`SimpleProvider::load`]
//! 2. Once a live CPU exists: [`SourceDebugProvider::complete_initialization`]
//! 3. Query freely; nothing mutates after step 2

mod paths;
mod simple;

use std::fmt;
use std::path::Path;

use tracing::debug;

pub use paths::{match_source_path, resolve_local_path};
pub use simple::SimpleProvider;

use crate::config::LoadOptions;
use crate::error::SrcdbgResult;
use crate::format::FormatKind;
use crate::reader::{read_file, read_header};
use crate::types::{
    Address, AddressRange, FileLine, GlobalFixedSymbol, LineMapping, LocalFixedSymbol, LocalRelativeSymbol,
    RegisterSource, SourceFilePath,
};

/// Query interface over one loaded debug info file
///
/// Implementations are built once and are read-only afterwards, except for
/// the single call to [`SourceDebugProvider::complete_initialization`].
pub trait SourceDebugProvider: fmt::Debug + Send + Sync
{
    /// Bind local relative symbols to register names.
    ///
    /// Must be called before [`SourceDebugProvider::local_relative_symbols`].
    /// Calling it again is a no-op.
    ///
    /// ## Errors
    ///
    /// - `UnknownRegister`: a rule names a register `registers` does not have
    fn complete_initialization(&mut self, registers: &dyn RegisterSource) -> SrcdbgResult<()>;

    /// Number of source files in the file.
    fn num_files(&self) -> usize;

    /// Source file at a provider-local index.
    fn file_index_to_path(&self, file_index: u32) -> Option<&SourceFilePath>;

    /// Index of the single source file matching `path`, if exactly one does.
    ///
    /// Tries, in order: exact match, case-insensitive match, suffix match,
    /// case-insensitive suffix match. The first tier producing exactly one
    /// candidate wins; several candidates in a tier make the path ambiguous.
    fn file_path_to_index(&self, path: &str) -> Option<u32>;

    /// Address ranges that `line_number` of `file_index` assembled into.
    ///
    /// An unmapped line resolves to the next mapped line after it; a line past
    /// the last mapped line resolves to the last mapped line.
    fn file_line_to_address_ranges(&self, file_index: u32, line_number: u32) -> Vec<AddressRange>;

    /// Source line whose range contains `address`.
    fn address_to_file_line(&self, address: Address) -> Option<FileLine>;

    /// All line mappings, ordered by first address.
    fn line_mappings(&self) -> &[LineMapping];

    /// Global symbols with their values as stored, before any offset.
    fn global_fixed_symbols(&self) -> &[GlobalFixedSymbol];

    /// Local fixed symbols, each with all of its scopes.
    fn local_fixed_symbols(&self) -> &[LocalFixedSymbol];

    /// Local relative symbols with expressions bound to register names.
    ///
    /// ## Errors
    ///
    /// - `NotInitialized`: `complete_initialization` has not run yet
    fn local_relative_symbols(&self) -> SrcdbgResult<&[LocalRelativeSymbol]>;
}

/// Load the debug info file at `path` with the provider its header calls for.
///
/// ## Errors
///
/// - `FileOpen`: the file could not be read
/// - Any structural error from the reader
pub fn create_provider(path: impl AsRef<Path>, options: &LoadOptions) -> SrcdbgResult<Box<dyn SourceDebugProvider>>
{
    let path = path.as_ref();
    let bytes = read_file(path)?;
    match read_header(&bytes)? {
        FormatKind::Simple { version } => {
            debug!(path = %path.display(), version, "Loading simple debug info");
            Ok(Box::new(SimpleProvider::from_bytes(&bytes, options)?))
        }
    }
}
