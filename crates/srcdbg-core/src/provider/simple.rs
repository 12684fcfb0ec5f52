//! # Simple Format Provider
//!
//! Loads a `simp` file into memory and answers line and symbol queries
//! against it.
//!
//! ## Line Lookups
//!
//! - Address to line: binary search over mappings sorted by first address.
//!   Only the mapping found and the one before it are checked, so overlapping
//!   mappings (accepted under the permissive policy) resolve to one of them.
//! - Line to addresses: every mapping of the first line at or after the one
//!   asked for, so a breakpoint on a blank or comment line lands on the next
//!   line that produced code. Past the last line, the last mapping is used.
//!
//! ## Relative Symbols
//!
//! Register ids in a file only get names once a CPU is known. Until
//! [`SourceDebugProvider::complete_initialization`] runs, the relative
//! symbols stay raw and [`SourceDebugProvider::local_relative_symbols`]
//! fails with `NotInitialized`.

use std::path::Path;

use tracing::debug;

use super::paths::{match_source_path, resolve_local_path};
use super::SourceDebugProvider;
use crate::config::{LoadOptions, OverlapPolicy};
use crate::error::{SrcdbgError, SrcdbgResult};
use crate::reader::{read_file, Record, Records};
use crate::types::{
    Address, AddressRange, FileLine, GlobalFixedSymbol, LineMapping, LocalFixedSymbol, LocalRelativeSymbol,
    RegisterSource, RelativeRule, ScopedExpression, SourceFilePath,
};

/// Line mapping as stored in the per-file line index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineEntry
{
    range: AddressRange,
    line_number: u32,
}

/// Local relative symbol before its rules are bound to register names
#[derive(Debug, Clone)]
struct RawRelativeSymbol
{
    name: String,
    rules: Vec<RelativeRule>,
}

/// Relative symbols before and after register names are bound
#[derive(Debug, Clone)]
enum RelativeSymbols
{
    Raw(Vec<RawRelativeSymbol>),
    Resolved(Vec<LocalRelativeSymbol>),
}

/// In-memory index over one simple-format file
///
/// Keeps two views of the line mappings: every mapping ordered by first
/// address (for address lookups), and per source file ordered by
/// `(line, first address)` (for line lookups).
///
/// ```rust
/// use srcdbg_core::config::LoadOptions;
/// use srcdbg_core::provider::{SimpleProvider, SourceDebugProvider};
/// use srcdbg_core::types::{Address, AddressRange, FileLine};
/// use srcdbg_core::writer::SimpleWriter;
///
/// let mut writer = SimpleWriter::new();
/// let file = writer.add_source_file_path("a.asm")?;
/// writer.add_line_mapping(0x3F00, 0x3F03, file, 10)?;
/// let provider = SimpleProvider::from_bytes(&writer.to_bytes()?, &LoadOptions::default())?;
///
/// assert_eq!(provider.file_line_to_address_ranges(0, 10), [AddressRange::new(0x3F00, 0x3F03)]);
/// assert_eq!(provider.address_to_file_line(Address::new(0x3F02)), Some(FileLine::new(0, 10)));
/// # Ok::<(), srcdbg_core::SrcdbgError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SimpleProvider
{
    source_file_paths: Vec<SourceFilePath>,
    by_address: Vec<LineMapping>,
    by_line: Vec<Vec<LineEntry>>,
    global_fixed: Vec<GlobalFixedSymbol>,
    local_fixed: Vec<LocalFixedSymbol>,
    local_relative: RelativeSymbols,
}

impl SimpleProvider
{
    /// Read and index the file at `path`.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> SrcdbgResult<Self>
    {
        Self::from_bytes(&read_file(path)?, options)
    }

    /// Index a file already in memory.
    ///
    /// Either the whole file is valid and indexed, or an error is returned.
    ///
    /// ## Errors
    ///
    /// - Any structural error from the reader
    /// - `OverlappingRanges`: two line mappings overlap and the policy is strict
    pub fn from_bytes(bytes: &[u8], options: &LoadOptions) -> SrcdbgResult<Self>
    {
        let mut provider = SimpleProvider {
            source_file_paths: Vec::new(),
            by_address: Vec::new(),
            by_line: Vec::new(),
            global_fixed: Vec::new(),
            local_fixed: Vec::new(),
            local_relative: RelativeSymbols::Raw(Vec::new()),
        };
        let mut symbol_names: Vec<String> = Vec::new();
        let mut raw_relative = Vec::new();

        for record in Records::new(bytes)? {
            match record? {
                Record::SourcePath { path, .. } => {
                    let local = resolve_local_path(&path, options);
                    provider
                        .source_file_paths
                        .push(SourceFilePath::new(path.into_owned(), local));
                }
                Record::EndSourcePaths => {
                    provider.by_line = vec![Vec::new(); provider.source_file_paths.len()];
                }
                Record::LineMapping(mapping) => {
                    provider.by_address.push(mapping);
                    provider.by_line[usize::from(mapping.source_file_index)].push(LineEntry {
                        range: mapping.range,
                        line_number: mapping.line_number,
                    });
                }
                Record::EndLineMappings => {
                    provider.sort_line_mappings();
                    if options.overlap_policy == OverlapPolicy::Strict {
                        provider.check_overlaps()?;
                    }
                }
                Record::SymbolName { name, .. } => symbol_names.push(name.into_owned()),
                Record::GlobalFixed {
                    symbol_name_index,
                    value,
                    flags,
                } => {
                    let name = &symbol_names[symbol_name_index as usize];
                    provider
                        .global_fixed
                        .push(GlobalFixedSymbol::new(name.clone(), i64::from(value), flags));
                }
                Record::LocalFixed {
                    symbol_name_index,
                    value,
                    ranges,
                } => {
                    let name = &symbol_names[symbol_name_index as usize];
                    provider
                        .local_fixed
                        .push(LocalFixedSymbol::new(name.clone(), ranges, i64::from(value)));
                }
                Record::LocalRelative {
                    symbol_name_index,
                    rules,
                } => {
                    raw_relative.push(RawRelativeSymbol {
                        name: symbol_names[symbol_name_index as usize].clone(),
                        rules,
                    });
                }
                _ => {}
            }
        }
        provider.local_relative = RelativeSymbols::Raw(raw_relative);

        debug!(
            files = provider.source_file_paths.len(),
            line_mappings = provider.by_address.len(),
            global_fixed = provider.global_fixed.len(),
            local_fixed = provider.local_fixed.len(),
            "Built simple debug info provider"
        );
        Ok(provider)
    }

    fn sort_line_mappings(&mut self)
    {
        // Stable sorts keep file order among equal keys
        self.by_address.sort_by_key(|mapping| mapping.range.first);
        for entries in &mut self.by_line {
            entries.sort_by_key(|entry| (entry.line_number, entry.range.first));
        }
    }

    /// Reject any two overlapping line mappings. Expects `by_address` sorted.
    fn check_overlaps(&self) -> SrcdbgResult<()>
    {
        let mut widest: Option<AddressRange> = None;
        for mapping in &self.by_address {
            if let Some(previous) = widest {
                if previous.overlaps(&mapping.range) {
                    return Err(SrcdbgError::OverlappingRanges {
                        first: previous,
                        second: mapping.range,
                    });
                }
            }
            if widest.is_none_or(|previous| mapping.range.last > previous.last) {
                widest = Some(mapping.range);
            }
        }
        Ok(())
    }

    /// All source files, in index order.
    #[must_use]
    pub fn source_file_paths(&self) -> &[SourceFilePath]
    {
        &self.source_file_paths
    }

    /// Whether `complete_initialization` has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool
    {
        matches!(self.local_relative, RelativeSymbols::Resolved(_))
    }
}

impl SourceDebugProvider for SimpleProvider
{
    fn complete_initialization(&mut self, registers: &dyn RegisterSource) -> SrcdbgResult<()>
    {
        let RelativeSymbols::Raw(raw) = &self.local_relative else {
            return Ok(());
        };

        let mut resolved = Vec::with_capacity(raw.len());
        for symbol in raw {
            let mut scoped = Vec::with_capacity(symbol.rules.len());
            for rule in &symbol.rules {
                let register = registers
                    .register_name(rule.register)
                    .ok_or(SrcdbgError::UnknownRegister(rule.register))?;
                scoped.push(ScopedExpression::new(*rule, register));
            }
            resolved.push(LocalRelativeSymbol::new(symbol.name.clone(), scoped));
        }

        debug!(symbols = resolved.len(), "Resolved local relative symbols");
        self.local_relative = RelativeSymbols::Resolved(resolved);
        Ok(())
    }

    fn num_files(&self) -> usize
    {
        self.source_file_paths.len()
    }

    fn file_index_to_path(&self, file_index: u32) -> Option<&SourceFilePath>
    {
        self.source_file_paths.get(file_index as usize)
    }

    fn file_path_to_index(&self, path: &str) -> Option<u32>
    {
        match_source_path(&self.source_file_paths, path)
    }

    fn file_line_to_address_ranges(&self, file_index: u32, line_number: u32) -> Vec<AddressRange>
    {
        let Some(entries) = self.by_line.get(file_index as usize) else {
            return Vec::new();
        };
        let Some(last) = entries.last() else {
            return Vec::new();
        };

        let start = entries.partition_point(|entry| entry.line_number < line_number);
        if start == entries.len() {
            return vec![last.range];
        }
        let found = entries[start].line_number;
        entries[start..]
            .iter()
            .take_while(|entry| entry.line_number == found)
            .map(|entry| entry.range)
            .collect()
    }

    fn address_to_file_line(&self, address: Address) -> Option<FileLine>
    {
        if self.by_address.is_empty() {
            return None;
        }
        let found = self
            .by_address
            .partition_point(|mapping| mapping.range.first < address);
        let guess = found.min(self.by_address.len() - 1);

        let candidate = &self.by_address[guess];
        if candidate.range.contains(address) {
            return Some(candidate.file_line());
        }
        let previous = self.by_address.get(guess.checked_sub(1)?)?;
        previous
            .range
            .contains(address)
            .then(|| previous.file_line())
    }

    fn line_mappings(&self) -> &[LineMapping]
    {
        &self.by_address
    }

    fn global_fixed_symbols(&self) -> &[GlobalFixedSymbol]
    {
        &self.global_fixed
    }

    fn local_fixed_symbols(&self) -> &[LocalFixedSymbol]
    {
        &self.local_fixed
    }

    fn local_relative_symbols(&self) -> SrcdbgResult<&[LocalRelativeSymbol]>
    {
        match &self.local_relative {
            RelativeSymbols::Raw(_) => Err(SrcdbgError::NotInitialized),
            RelativeSymbols::Resolved(symbols) => Ok(symbols),
        }
    }
}
