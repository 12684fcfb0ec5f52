//! # Reader
//!
//! Validating decoder for simple-format debug info files.
//!
//! [`Records`] is a pull-based iterator over a byte buffer. Its constructor
//! checks everything that can be checked without walking the records: the
//! base header, every section boundary against the file size, and the null
//! terminators closing the string sections. Iteration then decodes one
//! [`Record`] at a time, checking each string index against the strings
//! already produced, and emits an `End*` record after every section so the
//! consumer can finalize per-section state (sorting, for instance).
//!
//! Stopping early is just dropping the iterator. [`read_records`] wraps the
//! same walk for callers that prefer a callback.
//!
//! ```rust
//! use srcdbg_core::reader::{Record, Records};
//! use srcdbg_core::writer::SimpleWriter;
//!
//! let mut writer = SimpleWriter::new();
//! writer.add_source_file_path("main.asm").unwrap();
//! let bytes = writer.to_bytes().unwrap();
//!
//! let paths: Vec<String> = Records::new(&bytes)
//!     .unwrap()
//!     .filter_map(|record| match record {
//!         Ok(Record::SourcePath { path, .. }) => Some(path.into_owned()),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(paths, ["main.asm"]);
//! ```

use std::borrow::Cow;
use std::ops::ControlFlow;
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{SrcdbgError, SrcdbgResult};
use crate::format::{
    ByteCursor, FormatKind, HeaderBase, Section, SimpleHeader, ADDRESS_RANGE_SIZE, LOCAL_FIXED_HEAD_SIZE,
    LOCAL_RELATIVE_HEAD_SIZE, RELATIVE_RULE_SIZE, SIMPLE_HEADER_SIZE, VERSION_2,
};
use crate::types::{AddressRange, LineMapping, RelativeRule, ScopeRanges, SymbolFlags};

/// One decoded unit of a debug info file, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a>
{
    /// Always first
    Header(SimpleHeader),
    SourcePath
    {
        index: u32,
        path: Cow<'a, str>,
    },
    EndSourcePaths,
    LineMapping(LineMapping),
    EndLineMappings,
    SymbolName
    {
        index: u32,
        name: Cow<'a, str>,
    },
    EndSymbolNames,
    GlobalFixed
    {
        symbol_name_index: u32,
        value: i32,
        flags: SymbolFlags,
    },
    EndGlobalFixed,
    LocalFixed
    {
        symbol_name_index: u32,
        value: i32,
        ranges: ScopeRanges,
    },
    EndLocalFixed,
    LocalRelative
    {
        symbol_name_index: u32,
        rules: Vec<RelativeRule>,
    },
    EndLocalRelative,
}

/// Inspect only the base header and report the format it names.
///
/// Fails fast on a bad magic, unknown type, or unsupported version without
/// looking at the rest of the file.
pub fn read_header(bytes: &[u8]) -> SrcdbgResult<FormatKind>
{
    let mut cursor = ByteCursor::new(bytes);
    HeaderBase::parse(&mut cursor)?.kind()
}

/// Load a whole debug info file into memory.
pub fn read_file(path: impl AsRef<Path>) -> SrcdbgResult<Vec<u8>>
{
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| SrcdbgError::FileOpen {
        path: path.to_path_buf(),
        source,
    })
}

/// Walk every record, handing each to `callback`.
///
/// `ControlFlow::Break` from the callback ends the walk early and is not an
/// error.
pub fn read_records<F>(bytes: &[u8], mut callback: F) -> SrcdbgResult<()>
where
    F: FnMut(&Record<'_>) -> ControlFlow<()>,
{
    for record in Records::new(bytes)? {
        if callback(&record?).is_break() {
            break;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase
{
    Header,
    Section(Section),
    Done,
}

/// Iterator over the [`Record`]s of one file
///
/// Yields `Err` at most once, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct Records<'a>
{
    bytes: &'a [u8],
    cursor: ByteCursor<'a>,
    header: SimpleHeader,
    /// End offset of each section, indexed by `section_slot`
    section_ends: [usize; 6],
    phase: Phase,
    num_source_paths: u32,
    num_symbol_names: u32,
}

const fn section_slot(section: Section) -> usize
{
    match section {
        Section::Header | Section::SourceFilePaths => 0,
        Section::LineMappings => 1,
        Section::SymbolNames => 2,
        Section::GlobalFixedSymbols => 3,
        Section::LocalFixedSymbols => 4,
        Section::LocalRelativeSymbols => 5,
    }
}

const fn next_section(section: Section) -> Option<Section>
{
    match section {
        Section::Header => Some(Section::SourceFilePaths),
        Section::SourceFilePaths => Some(Section::LineMappings),
        Section::LineMappings => Some(Section::SymbolNames),
        Section::SymbolNames => Some(Section::GlobalFixedSymbols),
        Section::GlobalFixedSymbols => Some(Section::LocalFixedSymbols),
        Section::LocalFixedSymbols => Some(Section::LocalRelativeSymbols),
        Section::LocalRelativeSymbols => None,
    }
}

impl<'a> Records<'a>
{
    /// Validate the header and section layout of `bytes`.
    pub fn new(bytes: &'a [u8]) -> SrcdbgResult<Self>
    {
        let mut cursor = ByteCursor::new(bytes);
        let FormatKind::Simple { version } = HeaderBase::parse(&mut cursor)?.kind()?;
        let header = SimpleHeader::parse(&mut cursor, version)?;

        let actual = bytes.len() as u64;
        let mut section_ends = [0usize; 6];
        let mut end = SIMPLE_HEADER_SIZE as u64;
        for (slot, (section, size)) in header.section_sizes().into_iter().enumerate() {
            end += size;
            if end > actual {
                return Err(SrcdbgError::Truncated {
                    section,
                    expected: end,
                    actual,
                });
            }
            // end <= bytes.len(), so it fits in usize
            section_ends[slot] = usize::try_from(end).unwrap_or(usize::MAX);
        }
        if end != actual {
            return Err(SrcdbgError::TrailingBytes { expected: end, actual });
        }

        if header.source_file_paths_size == 0 {
            return Err(SrcdbgError::NoSourceFilePaths);
        }
        let paths_end = section_ends[section_slot(Section::SourceFilePaths)];
        if bytes[paths_end - 1] != 0 {
            return Err(SrcdbgError::MissingNullTerminator {
                section: Section::SourceFilePaths,
            });
        }
        if header.symbol_names_size > 0 && bytes[section_ends[section_slot(Section::SymbolNames)] - 1] != 0 {
            return Err(SrcdbgError::MissingNullTerminator {
                section: Section::SymbolNames,
            });
        }

        debug!(
            version,
            source_file_paths_size = header.source_file_paths_size,
            num_line_mappings = header.num_line_mappings,
            symbol_names_size = header.symbol_names_size,
            num_global_fixed_symbol_values = header.num_global_fixed_symbol_values,
            local_fixed_symbol_values_size = header.local_fixed_symbol_values_size,
            local_relative_symbol_values_size = header.local_relative_symbol_values_size,
            "Validated debug info header"
        );

        Ok(Self {
            bytes,
            cursor,
            header,
            section_ends,
            phase: Phase::Header,
            num_source_paths: 0,
            num_symbol_names: 0,
        })
    }

    /// Header decoded by [`Records::new`].
    #[must_use]
    pub fn header(&self) -> &SimpleHeader
    {
        &self.header
    }

    fn section_end(&self, section: Section) -> usize
    {
        self.section_ends[section_slot(section)]
    }

    fn read_string(&mut self, section: Section) -> SrcdbgResult<Cow<'a, str>>
    {
        let start = self.cursor.offset();
        let end = self.section_end(section);
        let len = self.bytes[start..end]
            .iter()
            .position(|&byte| byte == 0)
            .ok_or(SrcdbgError::MissingNullTerminator { section })?;
        let raw = self.cursor.take(len + 1, section)?;
        Ok(String::from_utf8_lossy(&raw[..len]))
    }

    fn check_symbol_index(&self, section: Section, index: u32) -> SrcdbgResult<()>
    {
        if index >= self.num_symbol_names {
            return Err(SrcdbgError::InvalidIndex {
                section,
                index,
                limit: self.num_symbol_names,
            });
        }
        Ok(())
    }

    /// Fail with `SectionOverrun` unless `len` more bytes fit in `section`.
    fn ensure_in_section(&self, section: Section, record_start: usize, len: u64) -> SrcdbgResult<()>
    {
        let remaining = self.section_end(section).saturating_sub(self.cursor.offset()) as u64;
        if len > remaining {
            return Err(SrcdbgError::SectionOverrun {
                section,
                offset: record_start,
            });
        }
        Ok(())
    }

    fn read_address_range(&mut self, section: Section) -> SrcdbgResult<AddressRange>
    {
        let first = self.cursor.read_u16(section)?;
        let last = self.cursor.read_u16(section)?;
        Ok(AddressRange::new(first, last))
    }

    fn read_record(&mut self, section: Section) -> SrcdbgResult<Record<'a>>
    {
        let record_start = self.cursor.offset();
        match section {
            Section::Header => Ok(Record::Header(self.header)),
            Section::SourceFilePaths => {
                let path = self.read_string(section)?;
                let index = self.num_source_paths;
                self.num_source_paths += 1;
                Ok(Record::SourcePath { index, path })
            }
            Section::LineMappings => {
                let range = self.read_address_range(section)?;
                let source_file_index = self.cursor.read_u16(section)?;
                let line_number = self.cursor.read_u32(section)?;
                if u32::from(source_file_index) >= self.num_source_paths {
                    return Err(SrcdbgError::InvalidIndex {
                        section,
                        index: u32::from(source_file_index),
                        limit: self.num_source_paths,
                    });
                }
                Ok(Record::LineMapping(LineMapping {
                    range,
                    source_file_index,
                    line_number,
                }))
            }
            Section::SymbolNames => {
                let name = self.read_string(section)?;
                let index = self.num_symbol_names;
                self.num_symbol_names += 1;
                Ok(Record::SymbolName { index, name })
            }
            Section::GlobalFixedSymbols => {
                let symbol_name_index = self.cursor.read_u32(section)?;
                let value = self.cursor.read_i32(section)?;
                let flags = if self.header.version >= VERSION_2 {
                    SymbolFlags::from_bits(self.cursor.read_u32(section)?)
                } else {
                    SymbolFlags::NONE
                };
                self.check_symbol_index(section, symbol_name_index)?;
                Ok(Record::GlobalFixed {
                    symbol_name_index,
                    value,
                    flags,
                })
            }
            Section::LocalFixedSymbols => {
                self.ensure_in_section(section, record_start, LOCAL_FIXED_HEAD_SIZE as u64)?;
                let symbol_name_index = self.cursor.read_u32(section)?;
                let value = self.cursor.read_i32(section)?;
                let count = self.cursor.read_u32(section)?;
                self.check_symbol_index(section, symbol_name_index)?;
                self.ensure_in_section(section, record_start, u64::from(count) * ADDRESS_RANGE_SIZE as u64)?;
                let mut ranges = ScopeRanges::new();
                for _ in 0..count {
                    ranges.push(self.read_address_range(section)?);
                }
                Ok(Record::LocalFixed {
                    symbol_name_index,
                    value,
                    ranges,
                })
            }
            Section::LocalRelativeSymbols => {
                self.ensure_in_section(section, record_start, LOCAL_RELATIVE_HEAD_SIZE as u64)?;
                let symbol_name_index = self.cursor.read_u32(section)?;
                let count = self.cursor.read_u32(section)?;
                self.check_symbol_index(section, symbol_name_index)?;
                self.ensure_in_section(section, record_start, u64::from(count) * RELATIVE_RULE_SIZE as u64)?;
                let mut rules = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let range = self.read_address_range(section)?;
                    let register = self.cursor.read_u8(section)?;
                    let offset = self.cursor.read_i32(section)?;
                    rules.push(RelativeRule { range, register, offset });
                }
                Ok(Record::LocalRelative {
                    symbol_name_index,
                    rules,
                })
            }
        }
    }

    fn end_record(section: Section) -> Record<'static>
    {
        match section {
            Section::Header | Section::SourceFilePaths => Record::EndSourcePaths,
            Section::LineMappings => Record::EndLineMappings,
            Section::SymbolNames => Record::EndSymbolNames,
            Section::GlobalFixedSymbols => Record::EndGlobalFixed,
            Section::LocalFixedSymbols => Record::EndLocalFixed,
            Section::LocalRelativeSymbols => Record::EndLocalRelative,
        }
    }

    fn step(&mut self) -> Option<SrcdbgResult<Record<'a>>>
    {
        match self.phase {
            Phase::Done => None,
            Phase::Header => {
                self.phase = Phase::Section(Section::SourceFilePaths);
                Some(self.read_record(Section::Header))
            }
            Phase::Section(section) => {
                if self.cursor.offset() < self.section_end(section) {
                    return Some(self.read_record(section));
                }
                self.phase = next_section(section).map_or(Phase::Done, Phase::Section);
                Some(Ok(Self::end_record(section)))
            }
        }
    }
}

impl<'a> Iterator for Records<'a>
{
    type Item = SrcdbgResult<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let item = self.step();
        match &item {
            Some(Err(_)) => self.phase = Phase::Done,
            Some(Ok(record)) => trace!(?record, "Read record"),
            None => {}
        }
        item
    }
}

impl std::iter::FusedIterator for Records<'_> {}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::format::{MAGIC, TYPE_SIMPLE, VERSION_1};

    fn file(header: SimpleHeader, body: &[u8]) -> Vec<u8>
    {
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    fn one_path_header() -> SimpleHeader
    {
        SimpleHeader {
            version: VERSION_1,
            source_file_paths_size: 2,
            ..SimpleHeader::default()
        }
    }

    #[test]
    fn test_read_header_rejects_bad_magic()
    {
        let mut bytes = file(one_path_header(), b"a\0");
        bytes[0] = b'X';
        assert!(matches!(read_header(&bytes), Err(SrcdbgError::BadMagic(_))));
    }

    #[test]
    fn test_read_header_only_needs_base()
    {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&TYPE_SIMPLE);
        bytes.push(VERSION_1);
        assert_eq!(read_header(&bytes).ok(), Some(FormatKind::Simple { version: 1 }));
    }

    #[test]
    fn test_minimal_file_record_sequence()
    {
        let bytes = file(one_path_header(), b"a\0");
        let records: Vec<Record<'_>> = Records::new(&bytes).unwrap().map(Result::unwrap).collect();
        assert_eq!(records.len(), 8);
        assert_eq!(
            records[1],
            Record::SourcePath {
                index: 0,
                path: Cow::Borrowed("a")
            }
        );
        assert_eq!(records[2], Record::EndSourcePaths);
        assert_eq!(records[7], Record::EndLocalRelative);
    }

    #[test]
    fn test_local_fixed_overrun()
    {
        let header = SimpleHeader {
            symbol_names_size: 2,
            local_fixed_symbol_values_size: 12,
            ..one_path_header()
        };
        let mut body = b"a\0x\0".to_vec();
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&5i32.to_le_bytes());
        // claims one range, but the section ends after the head
        body.extend_from_slice(&1u32.to_le_bytes());
        let bytes = file(header, &body);
        let result: SrcdbgResult<Vec<_>> = Records::new(&bytes).unwrap().collect();
        assert!(matches!(
            result,
            Err(SrcdbgError::SectionOverrun {
                section: Section::LocalFixedSymbols,
                ..
            })
        ));
    }

    #[test]
    fn test_early_break_is_not_an_error()
    {
        let bytes = file(one_path_header(), b"a\0");
        let mut seen = 0;
        read_records(&bytes, |_| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(seen, 1);
    }
}
