//! # Load Configuration
//!
//! Options that control how debug info files are turned into providers.
//!
//! ## Environment Variables
//!
//! - `SRCDBG_SOURCE_PATH`: `;`-separated directories searched for relative
//!   source paths
//! - `SRCDBG_SOURCE_PATH_MAP`: `;`-separated alternating find/replace path
//!   prefixes, e.g. `C:\build\;/home/me/src/`
//! - `SRCDBG_OVERLAP_POLICY`: `permissive` (default) or `strict`
//!
//! ```rust
//! use srcdbg_core::config::{LoadOptions, OverlapPolicy};
//!
//! let options = LoadOptions::default()
//!     .with_source_search_path(["/home/me/src"])
//!     .with_source_path_map([("C:\\build\\", "/home/me/src/")])
//!     .with_overlap_policy(OverlapPolicy::Strict);
//! assert_eq!(options.source_path_map.len(), 1);
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

pub const SOURCE_PATH_ENV: &str = "SRCDBG_SOURCE_PATH";
pub const SOURCE_PATH_MAP_ENV: &str = "SRCDBG_SOURCE_PATH_MAP";
pub const OVERLAP_POLICY_ENV: &str = "SRCDBG_OVERLAP_POLICY";

/// Separator used by the list-valued environment variables
pub const LIST_SEPARATOR: char = ';';

/// What to do when address ranges overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OverlapPolicy
{
    /// Accept overlaps; lookups return the first match
    #[default]
    Permissive,
    /// Reject overlapping line mappings within a file and overlapping
    /// enabled files in an aggregator
    Strict,
}

impl FromStr for OverlapPolicy
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "permissive" | "allow" | "first-match" => Ok(OverlapPolicy::Permissive),
            "strict" | "deny" => Ok(OverlapPolicy::Strict),
            _ => Err(format!("Unknown overlap policy: {s}. Use 'permissive' or 'strict'")),
        }
    }
}

impl fmt::Display for OverlapPolicy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            OverlapPolicy::Permissive => f.write_str("permissive"),
            OverlapPolicy::Strict => f.write_str("strict"),
        }
    }
}

/// Options for constructing providers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions
{
    /// Directories searched, in order, for relative source paths
    pub source_search_path: Vec<PathBuf>,
    /// Prefix replacements applied to built paths; first match wins
    pub source_path_map: Vec<(String, String)>,
    pub overlap_policy: OverlapPolicy,
}

impl LoadOptions
{
    /// Read options from the `SRCDBG_*` environment variables.
    ///
    /// Unset variables leave the default; an unparseable overlap policy is
    /// logged and ignored.
    #[must_use]
    pub fn from_env() -> Self
    {
        let mut options = LoadOptions::default();
        if let Ok(value) = env::var(SOURCE_PATH_ENV) {
            options.source_search_path = parse_search_path(&value);
        }
        if let Ok(value) = env::var(SOURCE_PATH_MAP_ENV) {
            options.source_path_map = parse_path_map(&value);
        }
        if let Ok(value) = env::var(OVERLAP_POLICY_ENV) {
            match value.parse() {
                Ok(policy) => options.overlap_policy = policy,
                Err(err) => warn!(variable = OVERLAP_POLICY_ENV, "{err}"),
            }
        }
        options
    }

    #[must_use]
    pub fn with_source_search_path<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source_search_path = dirs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_source_path_map<I, F, R>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, R)>,
        F: Into<String>,
        R: Into<String>,
    {
        self.source_path_map = pairs
            .into_iter()
            .map(|(find, replace)| (find.into(), replace.into()))
            .collect();
        self
    }

    #[must_use]
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self
    {
        self.overlap_policy = policy;
        self
    }
}

/// Split a `;`-separated directory list, skipping empty entries.
#[must_use]
pub fn parse_search_path(value: &str) -> Vec<PathBuf>
{
    value
        .split(LIST_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Split a `;`-separated list into find/replace pairs.
///
/// An unpaired trailing entry is ignored.
#[must_use]
pub fn parse_path_map(value: &str) -> Vec<(String, String)>
{
    let entries: Vec<&str> = value.split(LIST_SEPARATOR).collect();
    if entries.len() % 2 != 0 && !value.is_empty() {
        warn!(variable = SOURCE_PATH_MAP_ENV, "Ignoring unpaired trailing path map entry");
    }
    entries
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_overlap_policy_from_str()
    {
        assert_eq!(OverlapPolicy::from_str("strict").unwrap(), OverlapPolicy::Strict);
        assert_eq!(OverlapPolicy::from_str("PERMISSIVE").unwrap(), OverlapPolicy::Permissive);
        assert!(OverlapPolicy::from_str("sometimes").is_err());
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::Permissive);
    }

    #[test]
    fn test_parse_search_path()
    {
        assert_eq!(
            parse_search_path("/a;;/b"),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(parse_search_path("").is_empty());
    }

    #[test]
    fn test_parse_path_map_ignores_odd_entry()
    {
        let map = parse_path_map("C:\\build\\;/src/;dangling");
        assert_eq!(map, vec![("C:\\build\\".to_string(), "/src/".to_string())]);
    }
}
