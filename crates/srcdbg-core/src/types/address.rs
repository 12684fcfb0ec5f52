//! CPU address and address range types.

use std::fmt;

/// Strongly typed 16-bit CPU address
///
/// The targets described by debug info files are 8/16-bit CPUs, so every
/// address stored in a file fits in a `u16`. This wrapper keeps addresses
/// from being mixed up with line numbers, indices, or symbol values, which
/// are all plain integers in the file format.
///
/// ## Example
///
/// ```rust
/// use srcdbg_core::types::Address;
///
/// let addr = Address::new(0x3F00);
/// assert_eq!(addr.offset_by(0x10), Address::new(0x3F10));
/// assert_eq!(addr.to_string(), "$3F00");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u16);

impl Address
{
    /// The lowest address ($0000)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u16` value
    pub const fn new(value: u16) -> Self
    {
        Address(value)
    }

    /// Get the raw `u16` value of this address
    pub const fn value(self) -> u16
    {
        self.0
    }

    /// Shift this address by a signed offset, wrapping around the 16-bit address space
    ///
    /// Aggregated providers are relocated this way; the emulated CPU wraps the
    /// same way when its program counter runs off either end.
    ///
    /// ```rust
    /// use srcdbg_core::types::Address;
    ///
    /// assert_eq!(Address::new(0xFFFF).offset_by(1), Address::ZERO);
    /// assert_eq!(Address::new(0x0000).offset_by(-1), Address::new(0xFFFF));
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn offset_by(self, offset: i32) -> Self
    {
        Address((i32::from(self.0).wrapping_add(offset)) as u16)
    }

    /// Shift this address by a signed offset, checking that it stays in range
    ///
    /// Returns `None` if the shifted address would fall outside `$0000..=$FFFF`.
    /// Used when re-emitting records into a new file, where silently wrapping
    /// would corrupt the output.
    ///
    /// ```rust
    /// use srcdbg_core::types::Address;
    ///
    /// assert_eq!(Address::new(0x1000).checked_offset_by(0x100), Some(Address::new(0x1100)));
    /// assert_eq!(Address::new(0xFFFF).checked_offset_by(1), None);
    /// ```
    #[must_use]
    pub fn checked_offset_by(self, offset: i32) -> Option<Self>
    {
        i32::from(self.0)
            .checked_add(offset)
            .and_then(|shifted| u16::try_from(shifted).ok())
            .map(Address)
    }
}

impl From<u16> for Address
{
    fn from(value: u16) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u16
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        u64::from(address.0)
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "${:04X}", self.0)
    }
}

/// Inclusive address interval `[first, last]`
///
/// Line mappings use it for the bytes a source line assembled into; local
/// symbols use it for the scopes in which they are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange
{
    /// First address in the range
    pub first: Address,
    /// Last address in the range (inclusive)
    pub last: Address,
}

impl AddressRange
{
    /// Build a range from raw bounds.
    #[must_use]
    pub const fn new(first: u16, last: u16) -> Self
    {
        Self {
            first: Address::new(first),
            last: Address::new(last),
        }
    }

    /// Whether `address` lies within the range (bounds included).
    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        self.first <= address && address <= self.last
    }

    /// Whether the two ranges share at least one address.
    #[must_use]
    pub fn overlaps(&self, other: &AddressRange) -> bool
    {
        self.first <= other.last && other.first <= self.last
    }

    /// Shift both bounds by `offset`, wrapping around the address space.
    #[must_use]
    pub fn offset_by(self, offset: i32) -> Self
    {
        Self {
            first: self.first.offset_by(offset),
            last: self.last.offset_by(offset),
        }
    }

    /// Shift by `offset` as [`AddressRange::offset_by`] does, splitting a
    /// range that wraps past $FFFF into its high and low parts.
    ///
    /// ```rust
    /// use srcdbg_core::types::AddressRange;
    ///
    /// let split: Vec<_> = AddressRange::new(0x0000, 0x0003).split_offset_by(-2).collect();
    /// assert_eq!(split, [AddressRange::new(0xFFFE, 0xFFFF), AddressRange::new(0x0000, 0x0001)]);
    /// ```
    pub fn split_offset_by(self, offset: i32) -> impl Iterator<Item = AddressRange>
    {
        let shifted = self.offset_by(offset);
        let (high, low) = if shifted.first <= shifted.last {
            (shifted, None)
        } else {
            (
                Self {
                    first: shifted.first,
                    last: Address::new(u16::MAX),
                },
                Some(Self {
                    first: Address::ZERO,
                    last: shifted.last,
                }),
            )
        };
        std::iter::once(high).chain(low)
    }

    /// Shift both bounds by `offset`, or `None` if either leaves the address space.
    #[must_use]
    pub fn checked_offset_by(self, offset: i32) -> Option<Self>
    {
        Some(Self {
            first: self.first.checked_offset_by(offset)?,
            last: self.last.checked_offset_by(offset)?,
        })
    }
}

impl From<(u16, u16)> for AddressRange
{
    fn from((first, last): (u16, u16)) -> Self
    {
        AddressRange::new(first, last)
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}-{}", self.first, self.last)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_split_offset_by()
    {
        let range = AddressRange::new(0xFFF0, 0xFFFF);
        assert_eq!(range.split_offset_by(0).collect::<Vec<_>>(), [range]);
        assert_eq!(
            range.split_offset_by(0x08).collect::<Vec<_>>(),
            [AddressRange::new(0xFFF8, 0xFFFF), AddressRange::new(0x0000, 0x0007)]
        );
        assert_eq!(
            range.split_offset_by(0x10).collect::<Vec<_>>(),
            [AddressRange::new(0x0000, 0x000F)]
        );
    }
}
