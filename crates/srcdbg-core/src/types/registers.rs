//! CPU register naming and live register access.

use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use super::Address;

/// Source of register names and values for the emulated CPU
///
/// Local relative symbols store a register id and an offset. Rendering them
/// needs the register's symbolic name; evaluating them needs its current
/// value. An emulator implements this trait for each CPU it runs.
///
/// ## Example
///
/// ```rust
/// use srcdbg_core::types::{Mc6809Register, Mc6809Registers, RegisterSource};
///
/// let cpu = Mc6809Registers::default();
/// cpu.set(Mc6809Register::U, 0x7F00);
///
/// assert_eq!(cpu.register_name(Mc6809Register::U.id()), Some("U"));
/// assert_eq!(cpu.register_value(Mc6809Register::U.id()), Some(0x7F00));
/// assert_eq!(cpu.register_name(42), None);
/// ```
pub trait RegisterSource
{
    /// Symbolic name of register `id`, or `None` if the CPU has no such register.
    fn register_name(&self, id: u8) -> Option<&str>;

    /// Current value of register `id`, or `None` if the CPU has no such register.
    fn register_value(&self, id: u8) -> Option<u64>;

    /// Current program counter.
    fn pc(&self) -> Address;
}

/// Motorola 6809 register identifiers as stored in debug info files
///
/// The numbering is shared with the toolchains that emit these files and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mc6809Register
{
    /// Hardware stack pointer
    S = 0,
    /// Condition codes
    Cc = 1,
    A = 2,
    B = 3,
    /// A and B combined
    D = 4,
    /// User stack pointer
    U = 5,
    X = 6,
    Y = 7,
    /// Direct page
    Dp = 8,
    /// Program counter (-1 on the C side)
    Pc = 0xFF,
}

impl Mc6809Register
{
    /// Every register, in id order with PC last.
    pub const ALL: [Mc6809Register; 10] = [
        Mc6809Register::S,
        Mc6809Register::Cc,
        Mc6809Register::A,
        Mc6809Register::B,
        Mc6809Register::D,
        Mc6809Register::U,
        Mc6809Register::X,
        Mc6809Register::Y,
        Mc6809Register::Dp,
        Mc6809Register::Pc,
    ];

    /// Id as stored in a local relative symbol record.
    #[must_use]
    pub const fn id(self) -> u8
    {
        self as u8
    }

    #[must_use]
    pub fn from_id(id: u8) -> Option<Self>
    {
        Self::ALL.into_iter().find(|register| register.id() == id)
    }

    /// Name used in rendered expressions.
    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            Mc6809Register::S => "S",
            Mc6809Register::Cc => "CC",
            Mc6809Register::A => "A",
            Mc6809Register::B => "B",
            Mc6809Register::D => "D",
            Mc6809Register::U => "U",
            Mc6809Register::X => "X",
            Mc6809Register::Y => "Y",
            Mc6809Register::Dp => "DP",
            Mc6809Register::Pc => "PC",
        }
    }
}

/// Live 6809 register file
///
/// Values are stored in atomics so a debugger thread can read them while the
/// emulation thread updates them.
#[derive(Debug, Default)]
pub struct Mc6809Registers
{
    s: AtomicU16,
    u: AtomicU16,
    x: AtomicU16,
    y: AtomicU16,
    pc: AtomicU16,
    a: AtomicU8,
    b: AtomicU8,
    cc: AtomicU8,
    dp: AtomicU8,
}

impl Mc6809Registers
{
    /// Set a register. Writing `D` updates `A` and `B`; 8-bit registers keep the low byte.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set(&self, register: Mc6809Register, value: u16)
    {
        let low = value as u8;
        match register {
            Mc6809Register::S => self.s.store(value, Ordering::Relaxed),
            Mc6809Register::U => self.u.store(value, Ordering::Relaxed),
            Mc6809Register::X => self.x.store(value, Ordering::Relaxed),
            Mc6809Register::Y => self.y.store(value, Ordering::Relaxed),
            Mc6809Register::Pc => self.pc.store(value, Ordering::Relaxed),
            Mc6809Register::A => self.a.store(low, Ordering::Relaxed),
            Mc6809Register::B => self.b.store(low, Ordering::Relaxed),
            Mc6809Register::Cc => self.cc.store(low, Ordering::Relaxed),
            Mc6809Register::Dp => self.dp.store(low, Ordering::Relaxed),
            Mc6809Register::D => {
                self.a.store((value >> 8) as u8, Ordering::Relaxed);
                self.b.store(low, Ordering::Relaxed);
            }
        }
    }

    /// Current value of a register.
    #[must_use]
    pub fn get(&self, register: Mc6809Register) -> u16
    {
        match register {
            Mc6809Register::S => self.s.load(Ordering::Relaxed),
            Mc6809Register::U => self.u.load(Ordering::Relaxed),
            Mc6809Register::X => self.x.load(Ordering::Relaxed),
            Mc6809Register::Y => self.y.load(Ordering::Relaxed),
            Mc6809Register::Pc => self.pc.load(Ordering::Relaxed),
            Mc6809Register::A => u16::from(self.a.load(Ordering::Relaxed)),
            Mc6809Register::B => u16::from(self.b.load(Ordering::Relaxed)),
            Mc6809Register::Cc => u16::from(self.cc.load(Ordering::Relaxed)),
            Mc6809Register::Dp => u16::from(self.dp.load(Ordering::Relaxed)),
            Mc6809Register::D => {
                (u16::from(self.a.load(Ordering::Relaxed)) << 8) | u16::from(self.b.load(Ordering::Relaxed))
            }
        }
    }
}

impl RegisterSource for Mc6809Registers
{
    fn register_name(&self, id: u8) -> Option<&str>
    {
        Mc6809Register::from_id(id).map(Mc6809Register::name)
    }

    fn register_value(&self, id: u8) -> Option<u64>
    {
        Mc6809Register::from_id(id).map(|register| u64::from(self.get(register)))
    }

    fn pc(&self) -> Address
    {
        Address::new(self.get(Mc6809Register::Pc))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_register_ids_are_stable()
    {
        assert_eq!(Mc6809Register::S.id(), 0);
        assert_eq!(Mc6809Register::U.id(), 5);
        assert_eq!(Mc6809Register::Dp.id(), 8);
        assert_eq!(Mc6809Register::Pc.id() as i8, -1);
        assert_eq!(Mc6809Register::from_id(9), None);
    }

    #[test]
    fn test_d_is_a_and_b()
    {
        let cpu = Mc6809Registers::default();
        cpu.set(Mc6809Register::D, 0x1234);
        assert_eq!(cpu.get(Mc6809Register::A), 0x12);
        assert_eq!(cpu.get(Mc6809Register::B), 0x34);

        cpu.set(Mc6809Register::B, 0xFF);
        assert_eq!(cpu.get(Mc6809Register::D), 0x12FF);
    }

    #[test]
    fn test_pc_through_trait()
    {
        let cpu = Mc6809Registers::default();
        cpu.set(Mc6809Register::Pc, 0xC000);
        assert_eq!(cpu.pc(), Address::new(0xC000));
        assert_eq!(cpu.register_name(0xFF), Some("PC"));
    }
}
