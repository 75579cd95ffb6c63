//! The FHIR Library descriptor model and its default metadata.
//!
//! Only new-descriptor creation goes through the typed model; existing
//! descriptors are handled as raw JSON so unrelated fields survive a
//! synchronization untouched.
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Resource tag every descriptor must carry.
pub const RESOURCE_TYPE: &str = "Library";
/// Media type of the embedded script attachment.
pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript";
/// Identifier system for generated descriptors.
pub const IDENTIFIER_SYSTEM: &str = "http://gravitate-health.lst.tfo.upm.es";
/// Canonical url placeholder for generated descriptors.
pub const DEFAULT_URL: &str = "http://hl7.eu/fhir/ig/gravitate-health/Library/mock-lib";
/// Extension url carrying the lens execution environment version.
pub const LEE_VERSION_URL: &str =
    "http://hl7.eu/fhir/ig/gravitate-health/StructureDefinition/lee-version";

const DEFAULT_PUBLISHER: &str = "Gravitate Health Project - UPM Team";
const DEFAULT_COPYRIGHT: &str = "© 2024 Gravitate Health";

/// Current instant in the RFC 3339 form descriptors use for `date`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coding {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeField {
    pub coding: Vec<Coding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub coding: Vec<Coding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    pub value_string: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "use")]
    pub use_kind: String,
    pub documentation: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telecom {
    pub system: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub telecom: Vec<Telecom>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSlot {
    pub content_type: String,
    pub data: String,
}

/// A complete generated descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LensResource {
    pub resource_type: String,
    pub id: String,
    pub date: String,
    pub meta: Value,
    pub extension: Vec<Extension>,
    pub url: String,
    pub identifier: Vec<Identifier>,
    pub version: String,
    pub name: String,
    pub title: String,
    pub status: String,
    pub experimental: bool,
    #[serde(rename = "type")]
    pub type_field: TypeField,
    pub publisher: String,
    pub contact: Vec<Contact>,
    pub description: String,
    pub jurisdiction: Vec<Jurisdiction>,
    pub purpose: String,
    pub usage: String,
    pub copyright: String,
    pub parameter: Vec<Parameter>,
    pub content: Vec<ContentSlot>,
}

impl LensResource {
    /// A descriptor populated with default metadata and the given base64
    /// payload.
    pub fn default_values(name: &str, data: &str) -> LensResource {
        LensResource {
            resource_type: RESOURCE_TYPE.to_string(),
            id: kebab_id(name),
            date: timestamp_now(),
            meta: json!({}),
            extension: vec![lee_version_extension()],
            url: DEFAULT_URL.to_string(),
            identifier: vec![Identifier {
                system: IDENTIFIER_SYSTEM.to_string(),
                value: name.to_string(),
            }],
            version: "0.0.1".to_string(),
            name: name.to_string(),
            title: name.to_string(),
            status: "draft".to_string(),
            experimental: true,
            type_field: logical_library_type(),
            publisher: DEFAULT_PUBLISHER.to_string(),
            contact: vec![default_contact()],
            description: "Description to be specified".to_string(),
            jurisdiction: vec![default_jurisdiction()],
            purpose: "Purpose to be specified".to_string(),
            usage: "Usage to be specified".to_string(),
            copyright: DEFAULT_COPYRIGHT.to_string(),
            parameter: vec![default_parameter()],
            content: vec![ContentSlot {
                content_type: SCRIPT_CONTENT_TYPE.to_string(),
                data: data.to_string(),
            }],
        }
    }

    /// A descriptor whose metadata is mapped from a `package.json` manifest,
    /// with the original's fallbacks for every absent field.
    pub fn from_package_manifest(manifest: &Value, data: &str) -> LensResource {
        let name = string_field(manifest, "name").unwrap_or_else(|| "unnamed-lens".to_string());
        let version = string_field(manifest, "version").unwrap_or_else(|| "0.0.1".to_string());
        let description = string_field(manifest, "description")
            .unwrap_or_else(|| "No description provided".to_string());
        let license = string_field(manifest, "license").unwrap_or_else(|| "UNLICENSED".to_string());
        let purpose = string_field(manifest, "purpose")
            .unwrap_or_else(|| "Purpose to be specified".to_string());
        let usage =
            string_field(manifest, "usage").unwrap_or_else(|| "Usage to be specified".to_string());
        let copyright = string_field(manifest, "copyright")
            .unwrap_or_else(|| format!("Licensed under {license}"));
        let (publisher, contact) = author_fields(manifest.get("author"));

        let mut resource = LensResource::default_values(&name, data);
        resource.id = kebab_id(&name);
        resource.version = version;
        resource.title.clone_from(&name);
        resource.publisher = publisher;
        resource.contact = vec![contact];
        resource.description = description;
        resource.purpose = purpose;
        resource.usage = usage;
        resource.copyright = copyright;
        resource
    }

    /// Serialize as a JSON value for validation or merging.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("serialize lens resource")
    }
}

fn kebab_id(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn lee_version_extension() -> Extension {
    Extension {
        url: LEE_VERSION_URL.to_string(),
        value_string: "dev".to_string(),
    }
}

fn logical_library_type() -> TypeField {
    TypeField {
        coding: vec![Coding {
            code: "logical-library".to_string(),
            system: None,
        }],
    }
}

fn default_jurisdiction() -> Jurisdiction {
    Jurisdiction {
        coding: vec![Coding {
            code: "US".to_string(),
            system: Some("urn:iso:std:iso:3166".to_string()),
        }],
    }
}

fn default_parameter() -> Parameter {
    Parameter {
        use_kind: "in".to_string(),
        documentation: "parameter if it exists".to_string(),
        type_name: "CodeableConcept".to_string(),
    }
}

fn default_contact() -> Contact {
    Contact {
        name: "Gravitate Health".to_string(),
        telecom: vec![Telecom {
            system: "url".to_string(),
            value: "https://www.gravitatehealth.eu/".to_string(),
        }],
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Publisher name and contact derived from a manifest `author` field, which
/// may be a plain string or an object with name/email/url.
fn author_fields(author: Option<&Value>) -> (String, Contact) {
    match author {
        Some(Value::String(name)) if !name.is_empty() => (
            name.clone(),
            Contact {
                name: name.clone(),
                telecom: Vec::new(),
            },
        ),
        Some(Value::Object(fields)) => {
            let name = fields
                .get("name")
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            let mut telecom = Vec::new();
            if let Some(email) = fields.get("email").and_then(Value::as_str) {
                telecom.push(Telecom {
                    system: "email".to_string(),
                    value: email.to_string(),
                });
            }
            if let Some(url) = fields.get("url").and_then(Value::as_str) {
                telecom.push(Telecom {
                    system: "url".to_string(),
                    value: url.to_string(),
                });
            }
            let contact = if telecom.is_empty() {
                default_contact()
            } else {
                Contact {
                    name: name.clone(),
                    telecom,
                }
            };
            (name, contact)
        }
        _ => ("Unknown".to_string(), default_contact()),
    }
}
