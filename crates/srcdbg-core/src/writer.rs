//! # Writer
//!
//! Incremental builder for simple-format debug info files, used by
//! assemblers and other toolchains (directly, or through the C interface).
//!
//! Strings are interned: adding the same source path or symbol name twice
//! returns the same index. Local symbols are keyed by name, so adding another
//! scope to an existing local symbol extends its record instead of creating a
//! second one.
//!
//! ## Example
//!
//! ```rust
//! use srcdbg_core::writer::SimpleWriter;
//!
//! let mut writer = SimpleWriter::new();
//! let file = writer.add_source_file_path("game.asm")?;
//! writer.add_line_mapping(0x4000, 0x4002, file, 12)?;
//! writer.add_global_fixed_symbol("SCORE", 0x0200)?;
//! writer.add_local_fixed_symbol("loop_count", 0x4000, 0x40FF, 8)?;
//! let bytes = writer.to_bytes()?;
//! assert_eq!(&bytes[..4], b"MDbI");
//! # Ok::<(), srcdbg_core::SrcdbgError>(())
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::{SrcdbgError, SrcdbgResult};
use crate::format::{
    global_fixed_size, Section, SimpleHeader, ADDRESS_RANGE_SIZE, LOCAL_FIXED_HEAD_SIZE, LOCAL_RELATIVE_HEAD_SIZE,
    RELATIVE_RULE_SIZE, VERSION_1, VERSION_2,
};
use crate::reader::{read_file, Record, Records};
use crate::types::{AddressRange, LineMapping, RelativeRule, ScopeRanges, SymbolFlags};

/// Placeholder path reported when importing from memory
const IN_MEMORY: &str = "<memory>";

/// Deduplicating table of null-terminated strings
#[derive(Debug, Clone, Default)]
struct StringTable
{
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
    /// Encoded size, terminators included
    size: u64,
}

impl StringTable
{
    fn intern(&mut self, s: &str, what: &'static str) -> SrcdbgResult<u32>
    {
        if let Some(&index) = self.lookup.get(s) {
            return Ok(index);
        }
        if s.contains('\0') {
            return Err(SrcdbgError::InvalidArgument(format!("{what} contains a null byte: {s:?}")));
        }
        let index = u32::try_from(self.strings.len()).map_err(|_| SrcdbgError::IndexOverflow(what))?;
        self.strings.try_reserve(1)?;
        self.lookup.try_reserve(1)?;
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), index);
        self.size += s.len() as u64 + 1;
        Ok(index)
    }

    fn len(&self) -> usize
    {
        self.strings.len()
    }

    fn encode_into(&self, out: &mut Vec<u8>)
    {
        for s in &self.strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GlobalEntry
{
    name_index: u32,
    value: i32,
    flags: SymbolFlags,
}

#[derive(Debug, Clone)]
struct LocalFixedEntry
{
    name_index: u32,
    value: i32,
    ranges: ScopeRanges,
}

#[derive(Debug, Clone)]
struct LocalRelativeEntry
{
    name_index: u32,
    rules: Vec<RelativeRule>,
}

/// Everything the writer has accumulated, kept apart from the output file so
/// an import can be staged on a copy
#[derive(Debug, Clone, Default)]
struct Tables
{
    source_file_paths: StringTable,
    line_mappings: Vec<LineMapping>,
    symbol_names: StringTable,
    global_fixed: Vec<GlobalEntry>,
    local_fixed: Vec<LocalFixedEntry>,
    local_fixed_by_name: HashMap<u32, usize>,
    local_relative: Vec<LocalRelativeEntry>,
    local_relative_by_name: HashMap<u32, usize>,
}

impl Tables
{
    fn add_source_file_path(&mut self, path: &str) -> SrcdbgResult<u32>
    {
        // Line mappings store the file index as a u16
        if !self.source_file_paths.lookup.contains_key(path) && self.source_file_paths.len() > usize::from(u16::MAX) {
            return Err(SrcdbgError::IndexOverflow("source file paths"));
        }
        self.source_file_paths.intern(path, "source file paths")
    }

    fn add_line_mapping(&mut self, first: u16, last: u16, source_file_index: u32, line_number: u32) -> SrcdbgResult<()>
    {
        let source_file_index = u16::try_from(source_file_index)
            .ok()
            .filter(|index| usize::from(*index) < self.source_file_paths.len())
            .ok_or(SrcdbgError::InvalidSourceIndex(source_file_index))?;
        if self.line_mappings.len() >= u32::MAX as usize {
            return Err(SrcdbgError::IndexOverflow("line mappings"));
        }
        self.line_mappings.try_reserve(1)?;
        self.line_mappings
            .push(LineMapping::new(first, last, source_file_index, line_number));
        Ok(())
    }

    fn add_global_fixed_symbol(&mut self, name: &str, value: i32, flags: SymbolFlags) -> SrcdbgResult<()>
    {
        let name_index = self.symbol_names.intern(name, "symbol names")?;
        if self.global_fixed.len() >= u32::MAX as usize {
            return Err(SrcdbgError::IndexOverflow("global fixed symbols"));
        }
        self.global_fixed.try_reserve(1)?;
        self.global_fixed.push(GlobalEntry {
            name_index,
            value,
            flags,
        });
        Ok(())
    }

    fn add_local_fixed_symbol(&mut self, name: &str, range: AddressRange, value: i32) -> SrcdbgResult<()>
    {
        let name_index = self.symbol_names.intern(name, "symbol names")?;
        if let Some(&slot) = self.local_fixed_by_name.get(&name_index) {
            let entry = &mut self.local_fixed[slot];
            if entry.value != value {
                warn!(
                    symbol = name,
                    kept = entry.value,
                    ignored = value,
                    "Local fixed symbol re-added with a different value"
                );
            }
            if !entry.ranges.contains(&range) {
                entry.ranges.try_reserve(1).map_err(|_| SrcdbgError::OutOfMemory)?;
                entry.ranges.push(range);
            }
            return Ok(());
        }

        self.local_fixed.try_reserve(1)?;
        self.local_fixed_by_name.try_reserve(1)?;
        let mut ranges = ScopeRanges::new();
        ranges.push(range);
        self.local_fixed_by_name.insert(name_index, self.local_fixed.len());
        self.local_fixed.push(LocalFixedEntry {
            name_index,
            value,
            ranges,
        });
        Ok(())
    }

    fn add_local_relative_symbol(&mut self, name: &str, rule: RelativeRule) -> SrcdbgResult<()>
    {
        let name_index = self.symbol_names.intern(name, "symbol names")?;
        if let Some(&slot) = self.local_relative_by_name.get(&name_index) {
            let entry = &mut self.local_relative[slot];
            if !entry.rules.contains(&rule) {
                entry.rules.try_reserve(1)?;
                entry.rules.push(rule);
            }
            return Ok(());
        }

        self.local_relative.try_reserve(1)?;
        self.local_relative_by_name.try_reserve(1)?;
        self.local_relative_by_name
            .insert(name_index, self.local_relative.len());
        self.local_relative.push(LocalRelativeEntry {
            name_index,
            rules: vec![rule],
        });
        Ok(())
    }

    /// Re-emit every record of `bytes` into these tables, shifted by `offset`.
    fn import(&mut self, bytes: &[u8], offset: i32) -> SrcdbgResult<()>
    {
        let shift = |range: AddressRange| {
            range.checked_offset_by(offset).ok_or(SrcdbgError::AddressOverflow {
                address: if range.first.checked_offset_by(offset).is_none() {
                    range.first
                } else {
                    range.last
                },
                offset,
            })
        };

        let mut source_indices: Vec<u32> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let name_at = |names: &[String], index: u32| {
            names.get(index as usize).cloned().ok_or(SrcdbgError::InvalidIndex {
                section: Section::SymbolNames,
                index,
                limit: u32::try_from(names.len()).unwrap_or(u32::MAX),
            })
        };

        for record in Records::new(bytes)? {
            match record? {
                Record::SourcePath { path, .. } => {
                    source_indices.try_reserve(1)?;
                    source_indices.push(self.add_source_file_path(&path)?);
                }
                Record::LineMapping(mapping) => {
                    let range = shift(mapping.range)?;
                    let source_file_index = source_indices
                        .get(usize::from(mapping.source_file_index))
                        .copied()
                        .ok_or(SrcdbgError::InvalidSourceIndex(u32::from(mapping.source_file_index)))?;
                    self.add_line_mapping(range.first.value(), range.last.value(), source_file_index, mapping.line_number)?;
                }
                Record::SymbolName { name, .. } => {
                    names.try_reserve(1)?;
                    names.push(name.into_owned());
                }
                Record::GlobalFixed {
                    symbol_name_index,
                    value,
                    flags,
                } => {
                    let value = if flags.is_constant() {
                        value
                    } else {
                        value.wrapping_add(offset)
                    };
                    self.add_global_fixed_symbol(&name_at(&names, symbol_name_index)?, value, flags)?;
                }
                Record::LocalFixed {
                    symbol_name_index,
                    value,
                    ranges,
                } => {
                    let name = name_at(&names, symbol_name_index)?;
                    for range in ranges {
                        self.add_local_fixed_symbol(&name, shift(range)?, value.wrapping_add(offset))?;
                    }
                }
                Record::LocalRelative {
                    symbol_name_index,
                    rules,
                } => {
                    let name = name_at(&names, symbol_name_index)?;
                    for rule in rules {
                        let range = shift(rule.range)?;
                        self.add_local_relative_symbol(&name, RelativeRule { range, ..rule })?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn header(&self) -> SrcdbgResult<SimpleHeader>
    {
        let version = if self.global_fixed.iter().any(|entry| !entry.flags.is_empty()) {
            VERSION_2
        } else {
            VERSION_1
        };
        let local_fixed_size: u64 = self
            .local_fixed
            .iter()
            .map(|entry| (LOCAL_FIXED_HEAD_SIZE + entry.ranges.len() * ADDRESS_RANGE_SIZE) as u64)
            .sum();
        let local_relative_size: u64 = self
            .local_relative
            .iter()
            .map(|entry| (LOCAL_RELATIVE_HEAD_SIZE + entry.rules.len() * RELATIVE_RULE_SIZE) as u64)
            .sum();
        let fit = |value: u64, what: &'static str| u32::try_from(value).map_err(|_| SrcdbgError::IndexOverflow(what));

        Ok(SimpleHeader {
            version,
            source_file_paths_size: fit(self.source_file_paths.size, "source file path bytes")?,
            num_line_mappings: fit(self.line_mappings.len() as u64, "line mappings")?,
            symbol_names_size: fit(self.symbol_names.size, "symbol name bytes")?,
            num_global_fixed_symbol_values: fit(self.global_fixed.len() as u64, "global fixed symbols")?,
            local_fixed_symbol_values_size: fit(local_fixed_size, "local fixed symbol bytes")?,
            local_relative_symbol_values_size: fit(local_relative_size, "local relative symbol bytes")?,
        })
    }

    fn encode(&self) -> SrcdbgResult<Vec<u8>>
    {
        let header = self.header()?;
        let total = usize::try_from(header.total_size()).map_err(|_| SrcdbgError::OutOfMemory)?;
        let mut out = Vec::new();
        out.try_reserve_exact(total)?;

        out.extend_from_slice(&header.to_bytes());
        self.source_file_paths.encode_into(&mut out);
        for mapping in &self.line_mappings {
            out.extend_from_slice(&mapping.range.first.value().to_le_bytes());
            out.extend_from_slice(&mapping.range.last.value().to_le_bytes());
            out.extend_from_slice(&mapping.source_file_index.to_le_bytes());
            out.extend_from_slice(&mapping.line_number.to_le_bytes());
        }
        self.symbol_names.encode_into(&mut out);
        for entry in &self.global_fixed {
            out.extend_from_slice(&entry.name_index.to_le_bytes());
            out.extend_from_slice(&entry.value.to_le_bytes());
            if header.version >= VERSION_2 {
                out.extend_from_slice(&entry.flags.bits().to_le_bytes());
            }
        }
        for entry in &self.local_fixed {
            out.extend_from_slice(&entry.name_index.to_le_bytes());
            out.extend_from_slice(&entry.value.to_le_bytes());
            out.extend_from_slice(&(entry.ranges.len() as u32).to_le_bytes());
            for range in &entry.ranges {
                out.extend_from_slice(&range.first.value().to_le_bytes());
                out.extend_from_slice(&range.last.value().to_le_bytes());
            }
        }
        for entry in &self.local_relative {
            out.extend_from_slice(&entry.name_index.to_le_bytes());
            out.extend_from_slice(&(entry.rules.len() as u32).to_le_bytes());
            for rule in &entry.rules {
                out.extend_from_slice(&rule.range.first.value().to_le_bytes());
                out.extend_from_slice(&rule.range.last.value().to_le_bytes());
                out.push(rule.register);
                out.extend_from_slice(&rule.offset.to_le_bytes());
            }
        }

        debug_assert_eq!(out.len(), total);
        debug!(
            version = header.version,
            source_file_paths = self.source_file_paths.len(),
            line_mappings = self.line_mappings.len(),
            symbol_names = self.symbol_names.len(),
            global_fixed = self.global_fixed.len(),
            global_record_size = global_fixed_size(header.version),
            local_fixed = self.local_fixed.len(),
            local_relative = self.local_relative.len(),
            bytes = out.len(),
            "Encoded debug info"
        );
        Ok(out)
    }
}

#[derive(Debug)]
struct Output
{
    path: PathBuf,
    file: File,
}

/// Builder for one simple-format debug info file
///
/// Created either in memory with [`SimpleWriter::new`], or bound to an
/// output file with [`SimpleWriter::create`], in which case
/// [`SimpleWriter::close`] writes the result.
#[derive(Debug, Default)]
pub struct SimpleWriter
{
    output: Option<Output>,
    tables: Tables,
}

impl SimpleWriter
{
    /// Writer that only produces bytes via [`SimpleWriter::to_bytes`].
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Writer bound to a new file at `path`, created (or truncated) now.
    pub fn create(path: impl AsRef<Path>) -> SrcdbgResult<Self>
    {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| SrcdbgError::FileOpen {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Opened debug info output");
        Ok(Self {
            output: Some(Output { path, file }),
            tables: Tables::default(),
        })
    }

    /// Output path, if bound to a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path>
    {
        self.output.as_ref().map(|output| output.path.as_path())
    }

    /// Add a source file path, returning its index (existing index if already added).
    pub fn add_source_file_path(&mut self, path: &str) -> SrcdbgResult<u32>
    {
        let index = self.tables.add_source_file_path(path)?;
        trace!(path, index, "Added source file path");
        Ok(index)
    }

    /// Map `[first, last]` to a line of a previously added source file.
    pub fn add_line_mapping(&mut self, first: u16, last: u16, source_file_index: u32, line_number: u32) -> SrcdbgResult<()>
    {
        self.tables.add_line_mapping(first, last, source_file_index, line_number)
    }

    pub fn add_global_fixed_symbol(&mut self, name: &str, value: i32) -> SrcdbgResult<()>
    {
        self.tables.add_global_fixed_symbol(name, value, SymbolFlags::NONE)
    }

    /// Add a global symbol carrying flags. Any non-empty flags make the
    /// output a version 2 file.
    pub fn add_global_fixed_symbol_with_flags(&mut self, name: &str, value: i32, flags: SymbolFlags) -> SrcdbgResult<()>
    {
        self.tables.add_global_fixed_symbol(name, value, flags)
    }

    /// Add a scope to local fixed symbol `name`, creating it if needed.
    ///
    /// A symbol keeps the value it was first added with.
    pub fn add_local_fixed_symbol(&mut self, name: &str, first: u16, last: u16, value: i32) -> SrcdbgResult<()>
    {
        self.tables
            .add_local_fixed_symbol(name, AddressRange::new(first, last), value)
    }

    /// Add a `register + offset` rule for `[first, last]` to local relative symbol `name`.
    pub fn add_local_relative_symbol(
        &mut self,
        name: &str,
        first: u16,
        last: u16,
        register: u8,
        offset: i32,
    ) -> SrcdbgResult<()>
    {
        let rule = RelativeRule {
            range: AddressRange::new(first, last),
            register,
            offset,
        };
        self.tables.add_local_relative_symbol(name, rule)
    }

    /// Merge the contents of the debug info file at `path`, shifting its
    /// addresses by `offset`.
    ///
    /// On failure nothing is added.
    pub fn import(&mut self, path: impl AsRef<Path>, offset: i32) -> SrcdbgResult<()>
    {
        let path = path.as_ref();
        let bytes = read_file(path).map_err(|source| SrcdbgError::ImportFailed {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        self.import_from(&bytes, offset, path)
    }

    /// Same as [`SimpleWriter::import`] for a file already in memory.
    pub fn import_bytes(&mut self, bytes: &[u8], offset: i32) -> SrcdbgResult<()>
    {
        self.import_from(bytes, offset, Path::new(IN_MEMORY))
    }

    fn import_from(&mut self, bytes: &[u8], offset: i32, path: &Path) -> SrcdbgResult<()>
    {
        let mut staged = self.tables.clone();
        staged.import(bytes, offset).map_err(|source| SrcdbgError::ImportFailed {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        self.tables = staged;
        debug!(path = %path.display(), offset, "Imported debug info");
        Ok(())
    }

    /// Serialize everything added so far.
    pub fn to_bytes(&self) -> SrcdbgResult<Vec<u8>>
    {
        self.tables.encode()
    }

    /// Write the file and close it.
    ///
    /// On failure the partially written file is removed.
    pub fn close(self) -> SrcdbgResult<()>
    {
        let Some(Output { path, mut file }) = self.output else {
            return Err(SrcdbgError::InvalidArgument("writer has no output file".to_string()));
        };

        let result = self.tables.encode().and_then(|bytes| {
            file.write_all(&bytes).map_err(|source| SrcdbgError::FileWrite {
                path: path.clone(),
                source,
            })?;
            file.flush()
                .and_then(|()| file.sync_all())
                .map_err(|source| SrcdbgError::FileClose {
                    path: path.clone(),
                    source,
                })
        });
        drop(file);

        if let Err(err) = &result {
            warn!(path = %path.display(), error = %err, "Removing incomplete debug info output");
            let _ = std::fs::remove_file(&path);
        } else {
            debug!(path = %path.display(), "Closed debug info output");
        }
        result
    }
}
