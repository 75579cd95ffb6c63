//! Pairing between descriptors and the source scripts that feed them.
//!
//! Two maps are built per scan: an exact index keyed by the sibling
//! descriptor path of every classified script, and a per-directory fallback
//! list in scan order. Resolution tries exact first, always — a descriptor
//! must never pick up an unrelated sibling's content just because that
//! sibling was scanned earlier.
use crate::classify::Classifier;
use crate::encoding;
use crate::scan::DESCRIPTOR_EXTENSION;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How a source file satisfied a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingKind {
    Exact,
    Fallback,
}

/// Exact and fallback pairing maps. Rebuilt on every scan, never persisted.
#[derive(Debug, Default)]
pub struct PairingIndex {
    exact: BTreeMap<PathBuf, PathBuf>,
    fallback: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl PairingIndex {
    /// Resolve the single best source for a descriptor: the exact sibling if
    /// one exists, otherwise the first fallback candidate in its directory.
    pub fn resolve(&self, descriptor_path: &Path) -> Option<(&Path, PairingKind)> {
        if let Some(source) = self.exact.get(descriptor_path) {
            return Some((source.as_path(), PairingKind::Exact));
        }
        let dir = descriptor_path.parent()?;
        self.fallback
            .get(dir)
            .and_then(|candidates| candidates.first())
            .map(|source| (source.as_path(), PairingKind::Fallback))
    }

    /// Exact pairs as (descriptor path, source path), in path order. The
    /// descriptor side is derived from the source name and may not exist on
    /// disk.
    pub fn exact_pairs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.exact
            .iter()
            .map(|(descriptor, source)| (descriptor.as_path(), source.as_path()))
    }

    /// Every classified source, sorted and de-duplicated.
    pub fn all_sources(&self) -> Vec<&Path> {
        let mut sources: Vec<&Path> = self.exact.values().map(PathBuf::as_path).collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Build the pairing index from classified source candidates.
///
/// Each candidate is read with charset auto-detection; unreadable files are
/// skipped. Fallback lists keep the caller's (scan) order.
pub fn build_pairing_index(source_paths: &[PathBuf], classifier: &Classifier) -> PairingIndex {
    let mut index = PairingIndex::default();

    for path in source_paths {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "skipping unreadable source candidate");
                continue;
            }
        };
        let decoded = encoding::decode_bytes(&bytes, None);
        if !classifier.has_entry_point(&decoded.text) {
            continue;
        }

        let descriptor = path.with_extension(DESCRIPTOR_EXTENSION);
        index.exact.insert(descriptor, path.clone());
        if let Some(dir) = path.parent() {
            index
                .fallback
                .entry(dir.to_path_buf())
                .or_default()
                .push(path.clone());
        }
    }

    index
}
