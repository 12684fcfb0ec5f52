//! # srcdbg Utilities
//!
//! Shared helpers for the srcdbg binaries.
//!
//! Currently this is the `tracing` subscriber setup used by the CLI; the
//! libraries themselves only depend on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
