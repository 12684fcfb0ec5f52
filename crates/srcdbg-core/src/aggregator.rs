//! # Aggregated Debug Info
//!
//! Combines any number of loaded debug info files into one view.
//!
//! Each file is held as a named [`ProviderEntry`] that can be disabled
//! without being removed and relocated by a signed address offset. The
//! aggregator assigns every source file of every enabled entry a *global*
//! file index, contiguous across entries in list order, and translates
//! between global and provider-local indices on every query.
//!
//! ## Revisions
//!
//! Global file indices are only stable between edits of the entry list.
//! Every edit re-runs [`SourceDebugInfo::coalesce`], which bumps
//! [`SourceDebugInfo::provider_list_rev`]; consumers caching global indices
//! (a file list in a UI, say) compare revisions and refresh on change.
//!
//! ## Offsets
//!
//! Addresses going into a provider are shifted by `-offset` and ranges
//! coming out by `+offset`, both wrapping in the 16-bit address space. A
//! range that wraps past $FFFF is reported as two ranges. Global symbol
//! values are shifted too, except those flagged constant; local fixed
//! values are not, only their scopes.
//!
//! ```rust
//! use srcdbg_core::aggregator::SourceDebugInfo;
//! use srcdbg_core::config::{LoadOptions, OverlapPolicy};
//! use srcdbg_core::provider::SimpleProvider;
//! use srcdbg_core::types::{Address, FileLine};
//! use srcdbg_core::writer::SimpleWriter;
//!
//! let mut writer = SimpleWriter::new();
//! let file = writer.add_source_file_path("rom.asm")?;
//! writer.add_line_mapping(0x0000, 0x0003, file, 1)?;
//! let provider = SimpleProvider::from_bytes(&writer.to_bytes()?, &LoadOptions::default())?;
//!
//! let mut info = SourceDebugInfo::new(OverlapPolicy::Permissive);
//! info.add_provider("rom", Box::new(provider), 0xC000)?;
//! assert_eq!(info.address_to_file_line(Address::new(0xC002)), Some(FileLine::new(0, 1)));
//! assert_eq!(info.address_to_file_line(Address::new(0x0002)), None);
//! # Ok::<(), srcdbg_core::SrcdbgError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{LoadOptions, OverlapPolicy};
use crate::error::{SrcdbgError, SrcdbgResult};
use crate::provider::{create_provider, SourceDebugProvider};
use crate::symtable::{SymbolEntry, SymbolTable};
use crate::types::{Address, AddressRange, FileLine, RegisterSource, ScopeRanges, SourceFilePath};

/// One loaded debug info file inside a [`SourceDebugInfo`]
#[derive(Debug)]
pub struct ProviderEntry
{
    name: String,
    provider: Box<dyn SourceDebugProvider>,
    enabled: bool,
    offset: i32,
}

impl ProviderEntry
{
    /// Display name, usually the file path.
    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    #[must_use]
    pub fn provider(&self) -> &dyn SourceDebugProvider
    {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool
    {
        self.enabled
    }

    /// Signed address offset applied to everything this entry reports.
    #[must_use]
    pub fn offset(&self) -> i32
    {
        self.offset
    }

    /// Consume the entry, returning its provider.
    #[must_use]
    pub fn into_provider(self) -> Box<dyn SourceDebugProvider>
    {
        self.provider
    }
}

/// Union of several providers with a single global file index space
#[derive(Debug)]
pub struct SourceDebugInfo
{
    entries: Vec<ProviderEntry>,
    policy: OverlapPolicy,
    /// Global file index to (entry index, local file index)
    global_to_local: Vec<(usize, u32)>,
    /// Per entry: global index of its local file 0, or `None` if disabled
    entry_base: Vec<Option<u32>>,
    provider_list_rev: u64,
}

impl Default for SourceDebugInfo
{
    fn default() -> Self
    {
        Self::new(OverlapPolicy::default())
    }
}

impl SourceDebugInfo
{
    /// Empty aggregator.
    #[must_use]
    pub fn new(policy: OverlapPolicy) -> Self
    {
        Self {
            entries: Vec::new(),
            policy,
            global_to_local: Vec::new(),
            entry_base: Vec::new(),
            provider_list_rev: 0,
        }
    }

    /// Load every file in `paths`, in order, each named by its path.
    ///
    /// Fails without returning a partial aggregator if any file fails to load.
    pub fn load<I, P>(paths: I, options: &LoadOptions) -> SrcdbgResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut info = Self::new(options.overlap_policy);
        for path in paths {
            let path = path.as_ref();
            let provider = create_provider(path, options)?;
            info.add_provider(path.display().to_string(), provider, 0)?;
        }
        Ok(info)
    }

    #[must_use]
    pub fn policy(&self) -> OverlapPolicy
    {
        self.policy
    }

    /// All entries, enabled or not, in list order.
    #[must_use]
    pub fn entries(&self) -> &[ProviderEntry]
    {
        &self.entries
    }

    /// Revision of the entry list; changes whenever global indices may have.
    #[must_use]
    pub fn provider_list_rev(&self) -> u64
    {
        self.provider_list_rev
    }

    /// Append an enabled provider, returning its entry index.
    ///
    /// ## Errors
    ///
    /// - `OverlappingProviders`: strict policy and the new entry overlaps an
    ///   enabled one; the entry is not added
    pub fn add_provider(
        &mut self,
        name: impl Into<String>,
        provider: Box<dyn SourceDebugProvider>,
        offset: i32,
    ) -> SrcdbgResult<usize>
    {
        let name = name.into();
        info!(name = %name, offset, files = provider.num_files(), "Adding debug info");
        self.entries.push(ProviderEntry {
            name,
            provider,
            enabled: true,
            offset,
        });
        if let Err(err) = self.coalesce() {
            self.entries.pop();
            return Err(err);
        }
        Ok(self.entries.len() - 1)
    }

    /// Remove and return the entry at `index`.
    pub fn remove_provider(&mut self, index: usize) -> SrcdbgResult<ProviderEntry>
    {
        if index >= self.entries.len() {
            return Err(SrcdbgError::ProviderNotFound(index));
        }
        let entry = self.entries.remove(index);
        info!(name = %entry.name, "Removed debug info");
        if let Err(err) = self.coalesce() {
            self.entries.insert(index, entry);
            return Err(err);
        }
        Ok(entry)
    }

    /// Enable or disable the entry at `index`.
    ///
    /// ## Errors
    ///
    /// - `ProviderNotFound`: no entry at `index`
    /// - `OverlappingProviders`: strict policy and enabling it would overlap
    ///   another enabled entry; the entry stays disabled
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> SrcdbgResult<()>
    {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(SrcdbgError::ProviderNotFound(index))?;
        let previous = std::mem::replace(&mut entry.enabled, enabled);
        info!(name = %entry.name, enabled, "Toggled debug info");
        self.coalesce_or_restore(index, |entry| entry.enabled = previous)
    }

    /// Change the address offset of the entry at `index`.
    pub fn set_offset(&mut self, index: usize, offset: i32) -> SrcdbgResult<()>
    {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(SrcdbgError::ProviderNotFound(index))?;
        let previous = std::mem::replace(&mut entry.offset, offset);
        info!(name = %entry.name, offset, "Relocated debug info");
        self.coalesce_or_restore(index, |entry| entry.offset = previous)
    }

    fn coalesce_or_restore(&mut self, index: usize, restore: impl FnOnce(&mut ProviderEntry)) -> SrcdbgResult<()>
    {
        let result = self.coalesce();
        if result.is_err() {
            restore(&mut self.entries[index]);
        }
        result
    }

    /// Rebuild the global file index mapping from the enabled entries.
    ///
    /// Bumps [`SourceDebugInfo::provider_list_rev`] on success. Under the
    /// strict policy, fails with `OverlappingProviders` and leaves the
    /// previous mapping in place when two enabled entries cover the same
    /// address.
    pub fn coalesce(&mut self) -> SrcdbgResult<()>
    {
        if self.policy == OverlapPolicy::Strict {
            self.check_provider_overlaps()?;
        }

        let mut global_to_local = Vec::new();
        let mut entry_base = Vec::with_capacity(self.entries.len());
        for (entry_index, entry) in self.entries.iter().enumerate() {
            if !entry.enabled {
                entry_base.push(None);
                continue;
            }
            let base = u32::try_from(global_to_local.len()).map_err(|_| SrcdbgError::IndexOverflow("source files"))?;
            entry_base.push(Some(base));
            let num_files =
                u32::try_from(entry.provider.num_files()).map_err(|_| SrcdbgError::IndexOverflow("source files"))?;
            global_to_local.extend((0..num_files).map(|local| (entry_index, local)));
        }

        self.global_to_local = global_to_local;
        self.entry_base = entry_base;
        self.provider_list_rev += 1;
        debug!(
            files = self.global_to_local.len(),
            rev = self.provider_list_rev,
            "Coalesced debug info"
        );
        Ok(())
    }

    fn check_provider_overlaps(&self) -> SrcdbgResult<()>
    {
        let mut ranges: Vec<(AddressRange, usize)> = Vec::new();
        for (entry_index, entry) in self.entries.iter().enumerate().filter(|(_, entry)| entry.enabled) {
            for mapping in entry.provider.line_mappings() {
                ranges.extend(
                    mapping
                        .range
                        .split_offset_by(entry.offset)
                        .map(|range| (range, entry_index)),
                );
            }
        }
        ranges.sort_by_key(|(range, _)| range.first);

        let mut widest: Option<(AddressRange, usize)> = None;
        for &(range, entry_index) in &ranges {
            if let Some((previous, previous_entry)) = widest {
                if previous_entry != entry_index && previous.overlaps(&range) {
                    return Err(SrcdbgError::OverlappingProviders {
                        first: self.entries[previous_entry].name.clone(),
                        second: self.entries[entry_index].name.clone(),
                        address: range.first,
                    });
                }
            }
            if widest.is_none_or(|(previous, _)| range.last > previous.last) {
                widest = Some((range, entry_index));
            }
        }
        Ok(())
    }

    /// Resolve local relative symbols of every entry, enabled or not.
    pub fn complete_initialization(&mut self, registers: &dyn RegisterSource) -> SrcdbgResult<()>
    {
        for entry in &mut self.entries {
            entry.provider.complete_initialization(registers)?;
        }
        Ok(())
    }

    /// (entry index, local file index) for a global file index.
    #[must_use]
    pub fn global_to_local(&self, file_index: u32) -> Option<(usize, u32)>
    {
        self.global_to_local.get(file_index as usize).copied()
    }

    /// Global file index for an entry's local file index, if the entry is enabled.
    #[must_use]
    pub fn local_to_global(&self, entry_index: usize, local_index: u32) -> Option<u32>
    {
        let base = (*self.entry_base.get(entry_index)?)?;
        let entry = &self.entries[entry_index];
        ((local_index as usize) < entry.provider.num_files()).then(|| base + local_index)
    }

    /// Total source files across enabled entries.
    #[must_use]
    pub fn num_files(&self) -> usize
    {
        self.global_to_local.len()
    }

    #[must_use]
    pub fn file_index_to_path(&self, file_index: u32) -> Option<&SourceFilePath>
    {
        let (entry_index, local) = self.global_to_local(file_index)?;
        self.entries[entry_index].provider.file_index_to_path(local)
    }

    /// Global index of the one source file matching `path` across all
    /// enabled entries; `None` if none or several entries match.
    #[must_use]
    pub fn file_path_to_index(&self, path: &str) -> Option<u32>
    {
        let mut found = None;
        for (entry_index, entry) in self.enabled_entries() {
            if let Some(local) = entry.provider.file_path_to_index(path) {
                if found.is_some() {
                    debug!(path, "Source path matches more than one debug info file");
                    return None;
                }
                found = Some((entry_index, local));
            }
        }
        let (entry_index, local) = found?;
        self.local_to_global(entry_index, local)
    }

    /// Address ranges of a line, relocated by the owning entry's offset.
    #[must_use]
    pub fn file_line_to_address_ranges(&self, file_index: u32, line_number: u32) -> Vec<AddressRange>
    {
        let Some((entry_index, local)) = self.global_to_local(file_index) else {
            return Vec::new();
        };
        let entry = &self.entries[entry_index];
        entry
            .provider
            .file_line_to_address_ranges(local, line_number)
            .into_iter()
            .flat_map(|range| range.split_offset_by(entry.offset))
            .collect()
    }

    /// First enabled entry, in list order, mapping `address` to a line.
    #[must_use]
    pub fn address_to_file_line(&self, address: Address) -> Option<FileLine>
    {
        self.enabled_entries().find_map(|(entry_index, entry)| {
            let local = entry
                .provider
                .address_to_file_line(address.offset_by(entry.offset.wrapping_neg()))?;
            let file_index = self.local_to_global(entry_index, local.file_index)?;
            Some(FileLine::new(file_index, local.line_number))
        })
    }

    /// Copy the symbols of every enabled entry into debugger symbol tables.
    ///
    /// Global symbols go to `globals` with the entry's offset added unless
    /// flagged constant. Local symbols go to `locals` with relocated scopes
    /// and are bound to `registers` for scope tests and register reads.
    /// Local fixed values are copied as stored.
    ///
    /// ## Errors
    ///
    /// - `NotInitialized`: an enabled entry's relative symbols are unresolved,
    ///   for example one added after [`SourceDebugInfo::complete_initialization`];
    ///   neither table is touched
    pub fn get_srcdbg_symbols(
        &self,
        globals: &mut SymbolTable,
        locals: &mut SymbolTable,
        registers: &Arc<dyn RegisterSource + Send + Sync>,
    ) -> SrcdbgResult<()>
    {
        let relative = self
            .enabled_entries()
            .map(|(_, entry)| entry.provider.local_relative_symbols())
            .collect::<SrcdbgResult<Vec<_>>>()?;

        for ((_, entry), relative) in self.enabled_entries().zip(relative) {
            let offset = entry.offset;
            for symbol in entry.provider.global_fixed_symbols() {
                globals.add(symbol.name(), SymbolEntry::Fixed(symbol.relocated_value(offset)));
            }
            for symbol in entry.provider.local_fixed_symbols() {
                let ranges: ScopeRanges = symbol
                    .scope_ranges()
                    .iter()
                    .flat_map(|range| range.split_offset_by(offset))
                    .collect();
                locals.add(
                    symbol.name(),
                    SymbolEntry::LocalFixed {
                        ranges,
                        value: symbol.value(),
                        registers: Arc::clone(registers),
                    },
                );
            }
            for symbol in relative {
                let scopes = symbol
                    .scoped_expressions()
                    .iter()
                    .flat_map(|scoped| scoped.relocated(offset))
                    .collect();
                locals.add(
                    symbol.name(),
                    SymbolEntry::LocalRelative {
                        scopes,
                        registers: Arc::clone(registers),
                    },
                );
            }
        }
        Ok(())
    }

    fn enabled_entries(&self) -> impl Iterator<Item = (usize, &ProviderEntry)>
    {
        self.entries.iter().enumerate().filter(|(_, entry)| entry.enabled)
    }
}
