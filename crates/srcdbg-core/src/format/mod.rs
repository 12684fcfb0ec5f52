//! # On-Disk Format
//!
//! Constants and fixed-layout header types for `MDbI` debug info files.
//!
//! ## Layout
//!
//! Every integer is little-endian and every record is packed:
//!
//! ```text
//! header base      magic "MDbI" | type "simp" | version u8              9 bytes
//! simple header    six u32 section sizes / counts                      24 bytes
//! source paths     null-terminated strings
//! line mappings    {first u16, last u16, file u16, line u32}           10 bytes each
//! symbol names     null-terminated strings
//! global symbols   {name u32, value i32 [, flags u32 in v2]}           8 / 12 bytes each
//! local fixed      {name u32, value i32, count u32} + count * {u16, u16}
//! local relative   {name u32, count u32} + count * {u16, u16, u8, i32}
//! ```

mod cursor;

use std::fmt;

pub(crate) use cursor::ByteCursor;

use crate::error::{SrcdbgError, SrcdbgResult};

/// Magic tag at offset 0 of every debug info file
pub const MAGIC: [u8; 4] = *b"MDbI";

/// Type tag of the simple format
pub const TYPE_SIMPLE: [u8; 4] = *b"simp";

/// Version without symbol flags
pub const VERSION_1: u8 = 1;

/// Version whose global symbols carry a trailing `flags` field
pub const VERSION_2: u8 = 2;

/// Size of [`HeaderBase`] on disk
pub const HEADER_BASE_SIZE: usize = 9;

/// Size of the base header plus [`SimpleHeader`] section fields
pub const SIMPLE_HEADER_SIZE: usize = HEADER_BASE_SIZE + 6 * 4;

pub const LINE_MAPPING_SIZE: usize = 10;

/// Global fixed symbol record size for the given version
#[must_use]
pub const fn global_fixed_size(version: u8) -> usize
{
    if version >= VERSION_2 { 12 } else { 8 }
}

/// Local fixed symbol head: name index, value, range count
pub const LOCAL_FIXED_HEAD_SIZE: usize = 12;

/// One scope range in a local fixed symbol
pub const ADDRESS_RANGE_SIZE: usize = 4;

/// Local relative symbol head: name index, rule count
pub const LOCAL_RELATIVE_HEAD_SIZE: usize = 8;

/// One rule in a local relative symbol: range, register, offset
pub const RELATIVE_RULE_SIZE: usize = 9;

/// File sections, in on-disk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section
{
    Header,
    SourceFilePaths,
    LineMappings,
    SymbolNames,
    GlobalFixedSymbols,
    LocalFixedSymbols,
    LocalRelativeSymbols,
}

impl fmt::Display for Section
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Section::Header => "header",
            Section::SourceFilePaths => "source file paths",
            Section::LineMappings => "line mappings",
            Section::SymbolNames => "symbol names",
            Section::GlobalFixedSymbols => "global fixed symbol values",
            Section::LocalFixedSymbols => "local fixed symbol values",
            Section::LocalRelativeSymbols => "local relative symbol values",
        };
        f.write_str(name)
    }
}

/// Format family named by the header type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind
{
    /// `simp`, with its version
    Simple
    {
        version: u8
    },
}

/// Fields common to every format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBase
{
    pub magic: [u8; 4],
    pub type_tag: [u8; 4],
    pub version: u8,
}

impl HeaderBase
{
    /// Decode the base header without validating it.
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> SrcdbgResult<Self>
    {
        Ok(Self {
            magic: cursor.read_array(Section::Header)?,
            type_tag: cursor.read_array(Section::Header)?,
            version: cursor.read_u8(Section::Header)?,
        })
    }

    /// Check magic, type and version, returning the format they name.
    pub fn kind(&self) -> SrcdbgResult<FormatKind>
    {
        if self.magic != MAGIC {
            return Err(SrcdbgError::BadMagic(self.magic));
        }
        if self.type_tag != TYPE_SIMPLE {
            return Err(SrcdbgError::UnsupportedFormat(self.type_tag));
        }
        match self.version {
            VERSION_1 | VERSION_2 => Ok(FormatKind::Simple { version: self.version }),
            other => Err(SrcdbgError::UnsupportedVersion(other)),
        }
    }
}

/// Section sizes and counts of the simple format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimpleHeader
{
    pub version: u8,
    /// Bytes of null-terminated source path strings
    pub source_file_paths_size: u32,
    pub num_line_mappings: u32,
    /// Bytes of null-terminated symbol name strings
    pub symbol_names_size: u32,
    pub num_global_fixed_symbol_values: u32,
    /// Bytes of variable-length local fixed records
    pub local_fixed_symbol_values_size: u32,
    /// Bytes of variable-length local relative records
    pub local_relative_symbol_values_size: u32,
}

impl SimpleHeader
{
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>, version: u8) -> SrcdbgResult<Self>
    {
        Ok(Self {
            version,
            source_file_paths_size: cursor.read_u32(Section::Header)?,
            num_line_mappings: cursor.read_u32(Section::Header)?,
            symbol_names_size: cursor.read_u32(Section::Header)?,
            num_global_fixed_symbol_values: cursor.read_u32(Section::Header)?,
            local_fixed_symbol_values_size: cursor.read_u32(Section::Header)?,
            local_relative_symbol_values_size: cursor.read_u32(Section::Header)?,
        })
    }

    /// Encode the base and simple header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIMPLE_HEADER_SIZE]
    {
        let mut out = [0u8; SIMPLE_HEADER_SIZE];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..8].copy_from_slice(&TYPE_SIMPLE);
        out[8] = self.version;
        let fields = [
            self.source_file_paths_size,
            self.num_line_mappings,
            self.symbol_names_size,
            self.num_global_fixed_symbol_values,
            self.local_fixed_symbol_values_size,
            self.local_relative_symbol_values_size,
        ];
        for (i, field) in fields.iter().enumerate() {
            let start = HEADER_BASE_SIZE + i * 4;
            out[start..start + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Byte length of each section, in on-disk order.
    #[must_use]
    pub fn section_sizes(&self) -> [(Section, u64); 6]
    {
        [
            (Section::SourceFilePaths, u64::from(self.source_file_paths_size)),
            (
                Section::LineMappings,
                u64::from(self.num_line_mappings) * LINE_MAPPING_SIZE as u64,
            ),
            (Section::SymbolNames, u64::from(self.symbol_names_size)),
            (
                Section::GlobalFixedSymbols,
                u64::from(self.num_global_fixed_symbol_values) * global_fixed_size(self.version) as u64,
            ),
            (Section::LocalFixedSymbols, u64::from(self.local_fixed_symbol_values_size)),
            (
                Section::LocalRelativeSymbols,
                u64::from(self.local_relative_symbol_values_size),
            ),
        ]
    }

    /// Exact file size implied by the header.
    #[must_use]
    pub fn total_size(&self) -> u64
    {
        SIMPLE_HEADER_SIZE as u64 + self.section_sizes().iter().map(|(_, size)| size).sum::<u64>()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_header_encoding_layout()
    {
        let header = SimpleHeader {
            version: VERSION_1,
            source_file_paths_size: 6,
            num_line_mappings: 1,
            ..SimpleHeader::default()
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..9], b"MDbIsimp\x01");
        assert_eq!(&bytes[9..13], &6u32.to_le_bytes());
        assert_eq!(&bytes[13..17], &1u32.to_le_bytes());
        assert_eq!(header.total_size(), 33 + 6 + 10);
    }

    #[test]
    fn test_global_record_size_by_version()
    {
        assert_eq!(global_fixed_size(VERSION_1), 8);
        assert_eq!(global_fixed_size(VERSION_2), 12);
    }

    #[test]
    fn test_header_base_kind()
    {
        let mut base = HeaderBase {
            magic: MAGIC,
            type_tag: TYPE_SIMPLE,
            version: 3,
        };
        assert!(matches!(base.kind(), Err(SrcdbgError::UnsupportedVersion(3))));
        base.version = 2;
        assert_eq!(base.kind().ok(), Some(FormatKind::Simple { version: 2 }));
        base.type_tag = *b"dwrf";
        assert!(matches!(base.kind(), Err(SrcdbgError::UnsupportedFormat(_))));
    }
}
