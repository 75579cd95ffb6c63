//! Lens discovery: scan a tree, pair scripts to descriptors, and repair
//! descriptors that are one content error away from minimal validity.
//!
//! Discovery never writes anything. Repairs happen in memory and are only
//! kept when revalidation succeeds; callers decide whether to persist.
use crate::classify::Classifier;
use crate::content::{classify_content, encode_payload, needs_repair, synchronize, SyncOptions};
use crate::encoding::decode_bytes;
use crate::pairing::{build_pairing_index, PairingIndex, PairingKind};
use crate::scan::{scan_tree, ExclusionSet};
use crate::validate::validate_minimal;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a repaired descriptor's script payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnhanceSource {
    /// Sibling script with the same stem as the descriptor.
    ExactMatch,
    /// Another enhance-bearing script in the descriptor's directory.
    Fallback,
    /// No script available; the placeholder body was used.
    Default,
}

impl fmt::Display for EnhanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnhanceSource::ExactMatch => "exact-match",
            EnhanceSource::Fallback => "fallback",
            EnhanceSource::Default => "default",
        };
        f.write_str(label)
    }
}

/// One usable lens descriptor found during discovery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LensEntry {
    pub path: PathBuf,
    pub name: String,
    pub url: String,
    pub status: String,
    pub version: String,
    pub has_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_with: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance_source: Option<EnhanceSource>,
    /// Full (possibly repaired) resource, kept for callers that persist it.
    #[serde(skip)]
    pub resource: Value,
}

/// Discovery results plus the pairing index the scan produced, so callers
/// can answer pairing questions without walking the tree again.
pub struct Discovery {
    pub entries: Vec<LensEntry>,
    pub index: PairingIndex,
}

/// Scan `root` and return every descriptor that is minimally valid, or that
/// becomes so after an in-memory content repair.
pub fn discover(root: &Path, exclusions: &ExclusionSet) -> Result<Discovery> {
    let scan = scan_tree(root, exclusions)?;
    let classifier = Classifier::new();
    let index = build_pairing_index(&scan.source_paths, &classifier);

    let mut entries = Vec::new();
    for descriptor_path in &scan.descriptor_paths {
        let raw = match fs::read_to_string(descriptor_path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(path = %descriptor_path.display(), %err, "skipping unreadable descriptor");
                continue;
            }
        };
        let record: Value = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(path = %descriptor_path.display(), %err, "skipping unparseable descriptor");
                continue;
            }
        };

        let report = validate_minimal(&record);
        if report.is_valid {
            entries.push(entry_from(descriptor_path, record, None, None));
            continue;
        }
        if !is_repair_eligible(&report.errors, &record) {
            tracing::debug!(
                path = %descriptor_path.display(),
                errors = ?report.errors,
                "descriptor not eligible for repair"
            );
            continue;
        }

        let (payload, enhanced_with, source) = repair_payload(descriptor_path, &index);
        let repaired = synchronize(&record, Some(&payload), &SyncOptions { skip_date: true });
        if !validate_minimal(&repaired).is_valid {
            tracing::debug!(path = %descriptor_path.display(), "repair did not yield a valid descriptor");
            continue;
        }
        entries.push(entry_from(descriptor_path, repaired, enhanced_with, Some(source)));
    }

    Ok(Discovery { entries, index })
}

/// Convenience wrapper using the default exclusion set.
pub fn discover_lenses(root: &Path) -> Result<Discovery> {
    discover(root, &ExclusionSet::defaults())
}

/// A descriptor qualifies for repair only when its single minimal-validation
/// error concerns content and the content shape is actually malformed.
fn is_repair_eligible(errors: &[String], record: &Value) -> bool {
    errors.len() == 1
        && errors[0].contains("content")
        && needs_repair(classify_content(record))
}

fn repair_payload(
    descriptor_path: &Path,
    index: &PairingIndex,
) -> (String, Option<PathBuf>, EnhanceSource) {
    if let Some((source_path, kind)) = index.resolve(descriptor_path) {
        match fs::read(source_path) {
            Ok(bytes) => {
                let decoded = decode_bytes(&bytes, None);
                let source = match kind {
                    PairingKind::Exact => EnhanceSource::ExactMatch,
                    PairingKind::Fallback => EnhanceSource::Fallback,
                };
                tracing::debug!(
                    descriptor = %descriptor_path.display(),
                    script = %source_path.display(),
                    %source,
                    "repairing descriptor from script"
                );
                return (
                    encode_payload(&decoded.text),
                    Some(source_path.to_path_buf()),
                    source,
                );
            }
            Err(err) => {
                tracing::debug!(script = %source_path.display(), %err, "paired script unreadable");
            }
        }
    }
    (crate::content::placeholder_payload(), None, EnhanceSource::Default)
}

fn entry_from(
    path: &Path,
    resource: Value,
    enhanced_with: Option<PathBuf>,
    enhance_source: Option<EnhanceSource>,
) -> LensEntry {
    let field = |name: &str, fallback: &str| {
        resource
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };
    let has_data = resource
        .get("content")
        .and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(crate::validate::has_content_data));
    LensEntry {
        path: path.to_path_buf(),
        name: field("name", ""),
        url: field("url", ""),
        status: field("status", ""),
        version: field("version", "unknown"),
        has_data,
        enhanced_with,
        enhance_source,
        resource,
    }
}
