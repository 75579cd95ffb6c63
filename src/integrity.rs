//! Integrity checks between a script file and its descriptor payload.
//!
//! A check decodes the script with the requested (or detected) charset,
//! re-encodes it to the expected base64 payload, and compares that against
//! the descriptor's stored `content[0].data` as opaque text. Line endings
//! and stray whitespace are significant.
use crate::content::encode_payload;
use crate::encoding::{decode_file, Charset};
use crate::resource::RESOURCE_TYPE;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a pairing passed or failed its integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckOutcome {
    /// Decoded script and descriptor payload are byte-for-byte equal.
    Match,
    SourceMissing,
    DescriptorMissing,
    ParseError,
    WrongResourceType,
    NoContentData,
    Mismatch,
}

impl CheckOutcome {
    pub fn passed(self) -> bool {
        self == CheckOutcome::Match
    }

    /// Short human-readable reason for the outcome.
    pub fn reason(self) -> &'static str {
        match self {
            CheckOutcome::Match => "content matches",
            CheckOutcome::SourceMissing => "script file not found",
            CheckOutcome::DescriptorMissing => "descriptor file not found",
            CheckOutcome::ParseError => "descriptor could not be parsed",
            CheckOutcome::WrongResourceType => "descriptor is not a Library resource",
            CheckOutcome::NoContentData => "descriptor has no base64 content data",
            CheckOutcome::Mismatch => "descriptor content is out of date",
        }
    }
}

/// Result of checking one script/descriptor pairing.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: PathBuf,
    pub descriptor: PathBuf,
    pub outcome: CheckOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckReport {
    fn new(source: &Path, descriptor: &Path, outcome: CheckOutcome) -> CheckReport {
        CheckReport {
            source: source.to_path_buf(),
            descriptor: descriptor.to_path_buf(),
            outcome,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> CheckReport {
        self.detail = Some(detail);
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Check that `descriptor` embeds exactly the decoded text of `source`.
///
/// Never returns `Err`: every failure mode is a reportable outcome so batch
/// runs can keep going and summarize.
pub fn check_integrity(
    source: &Path,
    descriptor: &Path,
    charset: Option<Charset>,
) -> CheckReport {
    if !source.is_file() {
        return CheckReport::new(source, descriptor, CheckOutcome::SourceMissing);
    }
    let decoded = match decode_file(source, charset) {
        Ok(decoded) => decoded,
        Err(err) => {
            return CheckReport::new(source, descriptor, CheckOutcome::SourceMissing)
                .with_detail(format!("{err:#}"));
        }
    };

    if !descriptor.is_file() {
        return CheckReport::new(source, descriptor, CheckOutcome::DescriptorMissing);
    }
    let raw = match fs::read_to_string(descriptor) {
        Ok(raw) => raw,
        Err(err) => {
            return CheckReport::new(source, descriptor, CheckOutcome::ParseError)
                .with_detail(err.to_string());
        }
    };
    let record: Value = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(err) => {
            return CheckReport::new(source, descriptor, CheckOutcome::ParseError)
                .with_detail(err.to_string());
        }
    };

    if record.get("resourceType").and_then(Value::as_str) != Some(RESOURCE_TYPE) {
        return CheckReport::new(source, descriptor, CheckOutcome::WrongResourceType);
    }

    let Some(data) = record
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("data"))
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
    else {
        return CheckReport::new(source, descriptor, CheckOutcome::NoContentData);
    };

    // The comparison is opaque text against text: the expected payload is
    // recomputed from the script and matched against the stored base64
    // verbatim, so malformed stored base64 is a mismatch, not absent data.
    let expected = encode_payload(&decoded.text);
    if expected == data {
        CheckReport::new(source, descriptor, CheckOutcome::Match)
    } else {
        CheckReport::new(source, descriptor, CheckOutcome::Mismatch).with_detail(format!(
            "expected {} base64 chars, descriptor stores {}",
            expected.len(),
            data.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::encode_payload;
    use serde_json::json;
    use std::fs;

    fn write_descriptor(dir: &Path, name: &str, payload: &str) -> PathBuf {
        let record = json!({
            "resourceType": "Library",
            "url": "https://example.com/lens",
            "name": name,
            "status": "active",
            "content": [{"contentType": "application/javascript", "data": payload}],
        });
        let path = dir.join(format!("{name}.json"));
        fs::write(&path, serde_json::to_string_pretty(&record).unwrap()).unwrap();
        path
    }

    #[test]
    fn matching_pair_passes() {
        let dir = tempfile::tempdir().unwrap();
        let script = "function enhance(c) { return c; }\n";
        let source = dir.path().join("lens.js");
        fs::write(&source, script).unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", &encode_payload(script));
        let report = check_integrity(&source, &descriptor, None);
        assert!(report.passed());
        assert_eq!(report.outcome, CheckOutcome::Match);
    }

    #[test]
    fn stale_payload_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "new body").unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", &encode_payload("old body"));
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::Mismatch);
        assert!(report.detail.is_some());
    }

    #[test]
    fn malformed_stored_base64_is_a_mismatch_not_absent_data() {
        let dir = tempfile::tempdir().unwrap();
        let script = "function enhance(c) { return c; }\n";
        let source = dir.path().join("lens.js");
        fs::write(&source, script).unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", "!!!not-base64!!!");
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::Mismatch);
    }

    #[test]
    fn line_endings_are_significant() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "a\r\nb\r\n").unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", &encode_payload("a\nb\n"));
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::Mismatch);
    }

    #[test]
    fn missing_source_reported() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", &encode_payload("x"));
        let report = check_integrity(&dir.path().join("gone.js"), &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::SourceMissing);
    }

    #[test]
    fn missing_descriptor_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "x").unwrap();
        let report = check_integrity(&source, &dir.path().join("gone.json"), None);
        assert_eq!(report.outcome, CheckOutcome::DescriptorMissing);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "x").unwrap();
        let descriptor = dir.path().join("lens.json");
        fs::write(&descriptor, "{not json").unwrap();
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::ParseError);
        assert!(report.detail.is_some());
    }

    #[test]
    fn non_library_resource_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "x").unwrap();
        let descriptor = dir.path().join("lens.json");
        fs::write(&descriptor, r#"{"resourceType": "Patient"}"#).unwrap();
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::WrongResourceType);
    }

    #[test]
    fn empty_data_counts_as_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        fs::write(&source, "x").unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", "");
        let report = check_integrity(&source, &descriptor, None);
        assert_eq!(report.outcome, CheckOutcome::NoContentData);
    }

    #[test]
    fn explicit_charset_changes_the_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lens.js");
        // "é" as latin1 single byte; decoding as windows-1252 gives the same
        // char, but decoding the utf-16 pair below would not.
        fs::write(&source, [0xE9u8]).unwrap();
        let descriptor = write_descriptor(dir.path(), "lens", &encode_payload("\u{e9}"));
        let report = check_integrity(&source, &descriptor, Some(Charset::Latin1));
        assert_eq!(report.outcome, CheckOutcome::Match);
    }
}
