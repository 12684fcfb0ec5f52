//! Bounds-checked little-endian reads over a byte slice.

use crate::error::{SrcdbgError, SrcdbgResult};

use super::Section;

/// Forward-only reader that checks the remaining length before every field
#[derive(Debug, Clone)]
pub(crate) struct ByteCursor<'a>
{
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a>
{
    pub(crate) fn new(bytes: &'a [u8]) -> Self
    {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize
    {
        self.offset
    }

    pub(crate) fn take(&mut self, len: usize, section: Section) -> SrcdbgResult<&'a [u8]>
    {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(SrcdbgError::Truncated {
                section,
                expected: self.offset as u64 + len as u64,
                actual: self.bytes.len() as u64,
            });
        };
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self, section: Section) -> SrcdbgResult<[u8; N]>
    {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, section)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self, section: Section) -> SrcdbgResult<u8>
    {
        Ok(self.read_array::<1>(section)?[0])
    }

    pub(crate) fn read_u16(&mut self, section: Section) -> SrcdbgResult<u16>
    {
        Ok(u16::from_le_bytes(self.read_array(section)?))
    }

    pub(crate) fn read_u32(&mut self, section: Section) -> SrcdbgResult<u32>
    {
        Ok(u32::from_le_bytes(self.read_array(section)?))
    }

    pub(crate) fn read_i32(&mut self, section: Section) -> SrcdbgResult<i32>
    {
        Ok(i32::from_le_bytes(self.read_array(section)?))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_reads_little_endian()
    {
        let bytes = [0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF, 0x07];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_u16(Section::LineMappings).ok(), Some(0x1234));
        assert_eq!(cursor.read_i32(Section::LineMappings).ok(), Some(-2));
        assert_eq!(cursor.read_u8(Section::LineMappings).ok(), Some(7));
        assert_eq!(cursor.offset(), 7);
    }

    #[test]
    fn test_short_read_is_truncated()
    {
        let bytes = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&bytes);
        match cursor.read_u32(Section::SymbolNames) {
            Err(SrcdbgError::Truncated {
                section,
                expected,
                actual,
            }) => {
                assert_eq!(section, Section::SymbolNames);
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
        assert_eq!(cursor.offset(), 0);
    }
}
