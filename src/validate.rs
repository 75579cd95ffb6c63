//! Minimal and full-profile descriptor validation.
//!
//! The minimal profile gates repair and synchronization; the full profile is
//! only used by listing and reporting. Both apply the identical content rule
//! and iterate their checks in a fixed order, so the error list is
//! deterministic for identical input.
use crate::resource::{LEE_VERSION_URL, RESOURCE_TYPE};
use serde_json::Value;

/// Outcome of validating one descriptor snapshot.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> ValidationReport {
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate the minimal required-field profile: resource tag, url, name,
/// status, and a content sequence with at least one data-bearing element.
pub fn validate_minimal(record: &Value) -> ValidationReport {
    if record.as_object().is_none() {
        return ValidationReport::from_errors(vec!["Lens must be a JSON object".to_string()]);
    }

    let mut errors = Vec::new();
    check_resource_type(record, &mut errors);
    check_required_string(record, "url", &mut errors);
    check_required_string(record, "name", &mut errors);
    check_required_string(record, "status", &mut errors);
    check_content(record, &mut errors);
    ValidationReport::from_errors(errors)
}

/// Validate the full lens profile: everything the minimal profile checks
/// plus the descriptive fields, type coding, identifier, jurisdiction,
/// parameter, and the lee-version extension.
pub fn validate_full(record: &Value) -> ValidationReport {
    let minimal = validate_minimal(record);
    if record.as_object().is_none() {
        return minimal;
    }

    let mut errors = minimal.errors;
    for field in ["version", "description", "purpose", "usage", "copyright"] {
        check_required_string(record, field, &mut errors);
    }
    if !has_coding_entries(record.get("type")) {
        errors.push("type must be an object with at least one coding entry".to_string());
    }
    for field in ["identifier", "jurisdiction", "parameter"] {
        if !has_array_entries(record.get(field)) {
            errors.push(format!("{field} must contain at least one entry"));
        }
    }
    if !has_lee_version_extension(record.get("extension")) {
        errors.push("extension must include the lee-version extension".to_string());
    }
    ValidationReport::from_errors(errors)
}

fn check_resource_type(record: &Value, errors: &mut Vec<String>) {
    if record.get("resourceType").and_then(Value::as_str) != Some(RESOURCE_TYPE) {
        errors.push(format!("resourceType must be \"{RESOURCE_TYPE}\""));
    }
}

fn check_required_string(record: &Value, field: &str, errors: &mut Vec<String>) {
    if !is_present_string(record.get(field)) {
        errors.push(format!("{field} is required and must be a string"));
    }
}

fn check_content(record: &Value, errors: &mut Vec<String>) {
    match record.get("content").and_then(Value::as_array) {
        Some(items) => {
            if !items.iter().any(has_content_data) {
                errors.push(
                    "content must include at least one item with base64 encoded data".to_string(),
                );
            }
        }
        None => errors.push("content must be an array".to_string()),
    }
}

fn is_present_string(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|text| !text.is_empty())
}

/// Whether a content element carries a non-empty string `data` field.
pub fn has_content_data(item: &Value) -> bool {
    is_present_string(item.get("data"))
}

fn has_array_entries(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

fn has_coding_entries(value: Option<&Value>) -> bool {
    value
        .and_then(|type_field| type_field.get("coding"))
        .and_then(Value::as_array)
        .is_some_and(|coding| !coding.is_empty())
}

fn has_lee_version_extension(value: Option<&Value>) -> bool {
    value.and_then(Value::as_array).is_some_and(|extensions| {
        extensions
            .iter()
            .any(|ext| ext.get("url").and_then(Value::as_str) == Some(LEE_VERSION_URL))
    })
}

/// Human-readable requirements still missing for full validation, used by
/// listing output. Mirrors the profile documentation field by field.
pub fn missing_requirements(record: &Value) -> Vec<String> {
    let mut requirements = Vec::new();
    if record.as_object().is_none() {
        requirements.push("record must be a JSON object".to_string());
        return requirements;
    }

    let string_fields = [
        ("name", "name (string, required): Computer-friendly name for the lens"),
        ("version", "version (string, required): Business version of the library (e.g., \"1.0.0\")"),
        ("status", "status (code, required): draft | active | retired | unknown"),
        ("description", "description (markdown, required): Natural language description of the lens"),
        ("purpose", "purpose (markdown, required): Why this lens is defined"),
        ("usage", "usage (markdown, required): Describes the clinical usage of the lens"),
        ("copyright", "copyright (markdown, required): Use and/or publishing restrictions"),
    ];
    for (field, requirement) in string_fields {
        if !is_present_string(record.get(field)) {
            requirements.push(requirement.to_string());
        }
    }

    if record.get("type").and_then(Value::as_object).is_none() {
        requirements
            .push("type (CodeableConcept, required): Must be \"logical-library\"".to_string());
    } else if !has_coding_entries(record.get("type")) {
        requirements
            .push("type.coding (required): Must contain code \"logical-library\"".to_string());
    }

    if !has_array_entries(record.get("identifier")) {
        requirements.push(format!(
            "identifier (required): At least one identifier with system \"{}\"",
            crate::resource::IDENTIFIER_SYSTEM
        ));
    }
    if !has_array_entries(record.get("jurisdiction")) {
        requirements.push("jurisdiction (required): At least one jurisdiction code".to_string());
    }
    if !has_array_entries(record.get("parameter")) {
        requirements.push("parameter (required): At least one parameter definition".to_string());
    }

    match record.get("content").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {
            if !items.iter().any(has_content_data) {
                requirements.push(
                    "content[].data (base64Binary, required): Base64-encoded JavaScript lens function"
                        .to_string(),
                );
            }
        }
        _ => requirements.push(
            "content (required): At least one attachment with base64-encoded lens code"
                .to_string(),
        ),
    }

    if !has_lee_version_extension(record.get("extension")) {
        requirements.push(format!(
            "extension (required): LEE version extension ({LEE_VERSION_URL})"
        ));
    }

    requirements
}
