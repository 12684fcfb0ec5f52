//! Source path resolution and matching.

use std::path::Path;

use tracing::trace;

use crate::config::LoadOptions;
use crate::types::SourceFilePath;

/// Find a local copy of a source file recorded as `built`.
///
/// The first path map entry whose prefix matches is applied. An absolute
/// result is used as-is; a relative one is joined to each search directory
/// until an existing file turns up. Returns `None` when the map did not apply,
/// the path stayed relative, and no search directory had the file.
#[must_use]
pub fn resolve_local_path(built: &str, options: &LoadOptions) -> Option<String>
{
    let mapped = options
        .source_path_map
        .iter()
        .find(|(find, _)| built.starts_with(find.as_str()))
        .map(|(find, replace)| format!("{replace}{}", &built[find.len()..]));
    let local = mapped.as_deref().unwrap_or(built);

    if Path::new(local).is_absolute() {
        return Some(local.to_string());
    }

    for dir in &options.source_search_path {
        let candidate = dir.join(local);
        if candidate.exists() {
            trace!(built, found = %candidate.display(), "Resolved source path");
            return Some(candidate.to_string_lossy().into_owned());
        }
    }

    mapped
}

#[derive(Debug, Clone, Copy)]
enum Tier
{
    Exact,
    ExactIgnoreCase,
    Suffix,
    SuffixIgnoreCase,
}

const TIERS: [Tier; 4] = [Tier::Exact, Tier::ExactIgnoreCase, Tier::Suffix, Tier::SuffixIgnoreCase];

fn normalize_separators(path: &str) -> String
{
    path.replace('\\', "/")
}

/// Whether `candidate` ends with `query` starting at a path component boundary.
fn is_component_suffix(candidate: &str, query: &str) -> bool
{
    if !candidate.ends_with(query) {
        return false;
    }
    let start = candidate.len() - query.len();
    start == 0 || query.starts_with('/') || candidate[..start].ends_with('/')
}

fn matches(tier: Tier, candidate: &str, query: &str) -> bool
{
    match tier {
        Tier::Exact => candidate == query,
        Tier::ExactIgnoreCase => candidate.to_lowercase() == query.to_lowercase(),
        Tier::Suffix => is_component_suffix(&normalize_separators(candidate), &normalize_separators(query)),
        Tier::SuffixIgnoreCase => is_component_suffix(
            &normalize_separators(&candidate.to_lowercase()),
            &normalize_separators(&query.to_lowercase()),
        ),
    }
}

/// Index of the one source file matching `query`.
///
/// Tiers are tried from strictest to loosest. A tier with exactly one
/// candidate decides the answer; a tier with several makes the query
/// ambiguous and the answer `None`.
#[must_use]
pub fn match_source_path(paths: &[SourceFilePath], query: &str) -> Option<u32>
{
    if query.is_empty() {
        return None;
    }
    for tier in TIERS {
        let mut found = None;
        for (index, path) in paths.iter().enumerate() {
            let hit = matches(tier, path.built(), query) || path.local().is_some_and(|local| matches(tier, local, query));
            if hit {
                if found.is_some() {
                    trace!(query, ?tier, "Ambiguous source path");
                    return None;
                }
                found = Some(index);
            }
        }
        if let Some(index) = found {
            return u32::try_from(index).ok();
        }
    }
    None
}
