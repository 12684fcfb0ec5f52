//! # Symbol Tables
//!
//! Debugger-side symbol storage filled by
//! [`SourceDebugInfo::get_srcdbg_symbols`](crate::aggregator::SourceDebugInfo::get_srcdbg_symbols).
//!
//! Fixed symbols always have a value. Local symbols only have one while the
//! program counter of their bound [`RegisterSource`] is inside one of their
//! scopes; relative symbols additionally read a register to compute it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{AddressRange, RegisterSource, ScopeRanges, ScopedExpression};

/// One definition of a symbol
#[derive(Clone)]
pub enum SymbolEntry
{
    /// Same value everywhere
    Fixed(i64),
    /// One value inside `ranges`
    LocalFixed
    {
        ranges: ScopeRanges,
        value: i64,
        registers: Arc<dyn RegisterSource + Send + Sync>,
    },
    /// `register + offset` inside each scope
    LocalRelative
    {
        scopes: Vec<ScopedExpression>,
        registers: Arc<dyn RegisterSource + Send + Sync>,
    },
}

impl SymbolEntry
{
    /// Value at the current program counter, if in scope.
    #[must_use]
    pub fn value(&self) -> Option<i64>
    {
        match self {
            SymbolEntry::Fixed(value) => Some(*value),
            SymbolEntry::LocalFixed {
                ranges,
                value,
                registers,
            } => {
                let pc = registers.pc();
                ranges.iter().any(|range| range.contains(pc)).then_some(*value)
            }
            SymbolEntry::LocalRelative { scopes, registers } => {
                let scoped = Self::in_scope(scopes, registers.as_ref())?;
                let rule = scoped.rule();
                let base = registers.register_value(rule.register)?;
                i64::try_from(base).ok().map(|base| base + i64::from(rule.offset))
            }
        }
    }

    /// Display expression at the current program counter, for relative symbols.
    #[must_use]
    pub fn expression(&self) -> Option<&str>
    {
        match self {
            SymbolEntry::LocalRelative { scopes, registers } => {
                Self::in_scope(scopes, registers.as_ref()).map(ScopedExpression::expression)
            }
            _ => None,
        }
    }

    /// Address ranges in which the entry is visible; empty for fixed symbols.
    #[must_use]
    pub fn scope_ranges(&self) -> Vec<AddressRange>
    {
        match self {
            SymbolEntry::Fixed(_) => Vec::new(),
            SymbolEntry::LocalFixed { ranges, .. } => ranges.to_vec(),
            SymbolEntry::LocalRelative { scopes, .. } => scopes.iter().map(ScopedExpression::range).collect(),
        }
    }

    fn in_scope<'a>(scopes: &'a [ScopedExpression], registers: &dyn RegisterSource) -> Option<&'a ScopedExpression>
    {
        let pc = registers.pc();
        scopes.iter().find(|scoped| scoped.range().contains(pc))
    }
}

impl fmt::Debug for SymbolEntry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolEntry::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            SymbolEntry::LocalFixed { ranges, value, .. } => f
                .debug_struct("LocalFixed")
                .field("ranges", ranges)
                .field("value", value)
                .finish_non_exhaustive(),
            SymbolEntry::LocalRelative { scopes, .. } => f
                .debug_struct("LocalRelative")
                .field("scopes", scopes)
                .finish_non_exhaustive(),
        }
    }
}

/// Symbols by name
///
/// A name may have several definitions (a local reused in different
/// functions, or the same symbol from two files); lookups use the first one
/// that is in scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable
{
    symbols: BTreeMap<String, Vec<SymbolEntry>>,
}

impl SymbolTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a definition of `name` after any existing ones.
    pub fn add(&mut self, name: impl Into<String>, entry: SymbolEntry)
    {
        self.symbols.entry(name.into()).or_default().push(entry);
    }

    /// Value of `name` at the current program counter.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<i64>
    {
        self.entries(name).iter().find_map(SymbolEntry::value)
    }

    /// Display expression of `name` at the current program counter.
    #[must_use]
    pub fn expression(&self, name: &str) -> Option<&str>
    {
        self.entries(name).iter().find_map(SymbolEntry::expression)
    }

    /// Every definition of `name`.
    #[must_use]
    pub fn entries(&self, name: &str) -> &[SymbolEntry]
    {
        self.symbols.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Symbol names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str>
    {
        self.symbols.keys().map(String::as_str)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    pub fn clear(&mut self)
    {
        self.symbols.clear();
    }
}
