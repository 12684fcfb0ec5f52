//! # Types
//!
//! Format-agnostic types shared by the reader, writer, providers and the
//! aggregator.
//!
//! These types describe decoded debug info (addresses, source files, symbols)
//! rather than its on-disk encoding, which lives in [`crate::format`].

pub mod address;
pub mod registers;
pub mod source;
pub mod symbols;

// Re-export all public types
pub use address::{Address, AddressRange};
pub use registers::{Mc6809Register, Mc6809Registers, RegisterSource};
pub use source::{FileLine, LineMapping, SourceFilePath};
pub use symbols::{
    GlobalFixedSymbol, LocalFixedSymbol, LocalRelativeSymbol, RelativeRule, ScopeRanges, ScopedExpression,
    SymbolFlags,
};
