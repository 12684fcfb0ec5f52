//! # srcdbg-core
//!
//! Source-level debugging information for emulated 8-bit machines.
//!
//! Assemblers and compilers describe the programs they build in an
//! `MDbI` file: which source line produced which addresses, and the values
//! of global and local symbols. An emulator's debugger loads those files to
//! step through source, set breakpoints on lines, and evaluate symbols.
//!
//! This crate provides:
//! - A validating, streaming reader for the `simp` format ([`reader`])
//! - A writer that builds, merges and relocates files ([`writer`])
//! - Query engines over one loaded file ([`provider`]) and over many ([`aggregator`])
//! - Debugger-side symbol tables bound to live CPU registers ([`symtable`])
//!
//! ## File layout
//!
//! All integers are little-endian and packed. A file is a header followed by
//! six sections whose sizes the header records; see [`format`] for details.
//!
//! ## Logging
//!
//! Every layer logs through `tracing`. Nothing is printed unless the host
//! application installs a subscriber (the `srcdbg` CLI uses `srcdbg-utils`).

pub mod aggregator;
pub mod config;
pub mod error;
pub mod format;
pub mod provider;
pub mod reader;
pub mod symtable;
pub mod types;
pub mod writer;

pub use aggregator::{ProviderEntry, SourceDebugInfo};
pub use config::{LoadOptions, OverlapPolicy};
// Re-export commonly used types
pub use error::{SrcdbgError, SrcdbgResult, WriterStatus};
pub use provider::{create_provider, SimpleProvider, SourceDebugProvider};
pub use reader::{Record, Records};
pub use symtable::{SymbolEntry, SymbolTable};
pub use types::{Address, AddressRange, FileLine, SourceFilePath};
pub use writer::SimpleWriter;
