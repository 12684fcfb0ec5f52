//! Symbol types decoded from debug info files.

use std::fmt;

use smallvec::SmallVec;

use super::{Address, AddressRange};

/// Scope ranges of a local symbol. Almost every symbol has one or two.
pub type ScopeRanges = SmallVec<[AddressRange; 2]>;

/// Flags attached to a global fixed symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SymbolFlags(u32);

impl SymbolFlags
{
    /// No flags set.
    pub const NONE: Self = Self(0);

    /// The value is a constant rather than an address, so relocating the
    /// containing file must leave it alone.
    pub const CONSTANT: Self = Self(1);

    /// Create from the raw on-disk representation.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self
    {
        Self(bits)
    }

    /// Raw on-disk representation.
    #[must_use]
    pub const fn bits(self) -> u32
    {
        self.0
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// Whether the value is exempt from address offsetting.
    #[must_use]
    pub const fn is_constant(self) -> bool
    {
        self.contains(Self::CONSTANT)
    }

    /// Whether no flag is set. Files with only empty flags are written as version 1.
    #[must_use]
    pub const fn is_empty(self) -> bool
    {
        self.0 == 0
    }
}

impl std::ops::BitOr for SymbolFlags
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self
    {
        Self(self.0 | rhs.0)
    }
}

/// A symbol with one value everywhere in the program
///
/// Usually a label or an `EQU`. Labels are addresses and move with their
/// file when it is relocated; values flagged [`SymbolFlags::CONSTANT`] do not.
///
/// ## Example
///
/// ```rust
/// use srcdbg_core::types::{GlobalFixedSymbol, SymbolFlags};
///
/// let start = GlobalFixedSymbol::new("start", 0x0100, SymbolFlags::NONE);
/// assert_eq!(start.relocated_value(0xC000), 0xC100);
/// assert_eq!(start.to_string(), "start = 256");
///
/// let size = GlobalFixedSymbol::new("SIZE", 0x20, SymbolFlags::CONSTANT);
/// assert_eq!(size.relocated_value(0xC000), 0x20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalFixedSymbol
{
    name: String,
    value: i64,
    flags: SymbolFlags,
}

impl GlobalFixedSymbol
{
    /// Construct from a name, the value as stored in the file and its flags.
    pub fn new(name: impl Into<String>, value: i64, flags: SymbolFlags) -> Self
    {
        Self {
            name: name.into(),
            value,
            flags,
        }
    }

    /// Symbol name as written by the toolchain.
    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Value as stored in the file, before any aggregator offset.
    #[must_use]
    pub fn value(&self) -> i64
    {
        self.value
    }

    /// Flags; always empty for symbols read from a version 1 file.
    #[must_use]
    pub fn flags(&self) -> SymbolFlags
    {
        self.flags
    }

    /// Value after relocating by `offset`, unless the symbol is a constant.
    #[must_use]
    pub fn relocated_value(&self, offset: i32) -> i64
    {
        if self.flags.is_constant() {
            self.value
        } else {
            self.value + i64::from(offset)
        }
    }
}

impl fmt::Display for GlobalFixedSymbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// A symbol with a single value that is only visible inside its scopes
///
/// Scopes are address ranges of code, so they move when the file is
/// relocated. The value itself is never relocated: there is no flag to say
/// whether it is an address.
///
/// ```rust
/// use srcdbg_core::types::{Address, AddressRange, LocalFixedSymbol, ScopeRanges};
///
/// let scopes: ScopeRanges = [AddressRange::new(0x0100, 0x013F)].into_iter().collect();
/// let count = LocalFixedSymbol::new("count", scopes, 8);
/// assert!(count.in_scope(Address::new(0x0120)));
/// assert!(!count.in_scope(Address::new(0x0140)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFixedSymbol
{
    name: String,
    scope_ranges: ScopeRanges,
    value: i64,
}

impl LocalFixedSymbol
{
    /// Construct from a name, its scopes and its value.
    pub fn new(name: impl Into<String>, scope_ranges: ScopeRanges, value: i64) -> Self
    {
        Self {
            name: name.into(),
            scope_ranges,
            value,
        }
    }

    /// Symbol name; the same name may be defined again with other scopes.
    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Address ranges in which the symbol is visible, in file order.
    #[must_use]
    pub fn scope_ranges(&self) -> &[AddressRange]
    {
        &self.scope_ranges
    }

    /// Value inside every scope.
    #[must_use]
    pub fn value(&self) -> i64
    {
        self.value
    }

    /// Whether `pc` lies inside any of the symbol's scopes.
    #[must_use]
    pub fn in_scope(&self, pc: Address) -> bool
    {
        self.scope_ranges.iter().any(|range| range.contains(pc))
    }
}

/// How to compute a relative symbol inside one scope: `register + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelativeRule
{
    /// Scope in which the rule applies
    pub range: AddressRange,
    /// CPU-specific register id
    pub register: u8,
    /// Offset added to the register's value
    pub offset: i32,
}

/// A relative rule bound to the symbolic name of its register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedExpression
{
    rule: RelativeRule,
    expression: String,
}

impl ScopedExpression
{
    /// Render `rule` against a register name, e.g. `(U - 4)`.
    pub fn new(rule: RelativeRule, register_name: &str) -> Self
    {
        let expression = if rule.offset < 0 {
            format!("({register_name} - {})", i64::from(rule.offset).abs())
        } else {
            format!("({register_name} + {})", rule.offset)
        };
        Self { rule, expression }
    }

    /// Rule the expression was rendered from; evaluation reads its register.
    #[must_use]
    pub fn rule(&self) -> RelativeRule
    {
        self.rule
    }

    /// Scope of the rule.
    #[must_use]
    pub fn range(&self) -> AddressRange
    {
        self.rule.range
    }

    /// Display expression, e.g. `(S + 2)`.
    #[must_use]
    pub fn expression(&self) -> &str
    {
        &self.expression
    }

    /// Same expression with its scope shifted by `offset`; a scope that
    /// wraps past $FFFF comes back as two expressions.
    pub fn relocated(&self, offset: i32) -> impl Iterator<Item = Self> + '_
    {
        self.rule.range.split_offset_by(offset).map(move |range| Self {
            rule: RelativeRule { range, ..self.rule },
            expression: self.expression.clone(),
        })
    }
}

/// A local symbol whose value is computed from a register at debug time
///
/// Typically a stack variable or argument addressed through a frame or
/// stack pointer. Each scope carries its own rule, since the same variable
/// sits at different offsets as the stack grows inside a function.
///
/// ## Example
///
/// ```rust
/// use srcdbg_core::types::{Address, AddressRange, LocalRelativeSymbol, RelativeRule, ScopedExpression};
///
/// let rule = |first, last, offset| RelativeRule {
///     range: AddressRange::new(first, last),
///     register: 0,
///     offset,
/// };
/// let arg = LocalRelativeSymbol::new(
///     "arg",
///     vec![
///         ScopedExpression::new(rule(0x0100, 0x0107, 2), "S"),
///         ScopedExpression::new(rule(0x0108, 0x0120, 4), "S"),
///     ],
/// );
/// assert_eq!(arg.expression_at(Address::new(0x0110)).map(ScopedExpression::expression), Some("(S + 4)"));
/// assert!(arg.expression_at(Address::new(0x0200)).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRelativeSymbol
{
    name: String,
    scoped_expressions: Vec<ScopedExpression>,
}

impl LocalRelativeSymbol
{
    /// Construct from a name and its rules, already bound to register names.
    pub fn new(name: impl Into<String>, scoped_expressions: Vec<ScopedExpression>) -> Self
    {
        Self {
            name: name.into(),
            scoped_expressions,
        }
    }

    /// Symbol name.
    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// One expression per scope, in file order.
    #[must_use]
    pub fn scoped_expressions(&self) -> &[ScopedExpression]
    {
        &self.scoped_expressions
    }

    /// Expression whose scope contains `pc`, if any. The first match wins.
    #[must_use]
    pub fn expression_at(&self, pc: Address) -> Option<&ScopedExpression>
    {
        self.scoped_expressions.iter().find(|scoped| scoped.range().contains(pc))
    }
}
