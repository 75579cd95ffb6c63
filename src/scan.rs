//! Recursive tree scanning with exclusion rules.
//!
//! The scan is the single source of ordering for every batch workflow:
//! entries are visited depth-first in lexicographic order so repeated runs
//! over an unchanged tree produce identical output.
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of source script candidates.
pub const SOURCE_EXTENSION: &str = "js";
/// Extension of descriptor candidates.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Patterns every scan starts from: dependency directories and package
/// manifest/lock files are never lens material.
const DEFAULT_EXCLUSION_PATTERNS: &[&str] =
    &["node_modules", r"package\.json", r"package-lock\.json"];

/// Compiled exclusion rules, tested against individual path segments.
///
/// Matching a directory name prunes the whole subtree; matching a file name
/// drops the file. Defaults always apply unless the caller starts from
/// [`ExclusionSet::empty`], and extension composes rather than replaces.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// The default exclusion set.
    pub fn defaults() -> ExclusionSet {
        let patterns = DEFAULT_EXCLUSION_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("regex for default exclusion"))
            .collect();
        ExclusionSet { patterns }
    }

    /// An exclusion set with no rules at all.
    pub fn empty() -> ExclusionSet {
        ExclusionSet {
            patterns: Vec::new(),
        }
    }

    /// Append caller-supplied patterns, keeping everything already present.
    pub fn extend(mut self, patterns: &[String]) -> Result<ExclusionSet> {
        for pattern in patterns {
            let compiled = Regex::new(pattern)
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
            self.patterns.push(compiled);
        }
        Ok(self)
    }

    /// Whether a single path segment or file name is excluded.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

impl Default for ExclusionSet {
    fn default() -> ExclusionSet {
        ExclusionSet::defaults()
    }
}

/// Candidate files found under a scan root, in traversal order.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub descriptor_paths: Vec<PathBuf>,
    pub source_paths: Vec<PathBuf>,
}

/// Enumerate descriptor and source candidates under `root`.
///
/// Excluded directories are not descended into; the root itself is never
/// tested against the exclusion rules.
pub fn scan_tree(root: &Path, exclusions: &ExclusionSet) -> Result<ScanOutput> {
    let mut output = ScanOutput::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !exclusions.is_excluded(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("scan directory {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = entry.path().extension().and_then(|ext| ext.to_str());
        if extension == Some(SOURCE_EXTENSION) {
            output.source_paths.push(entry.into_path());
        } else if extension == Some(DESCRIPTOR_EXTENSION) {
            output.descriptor_paths.push(entry.into_path());
        }
    }

    tracing::debug!(
        root = %root.display(),
        descriptors = output.descriptor_paths.len(),
        sources = output.source_paths.len(),
        "scan complete"
    );
    Ok(output)
}
