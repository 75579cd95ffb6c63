//! Charset resolution and decoding for lens source files.
//!
//! Descriptors always embed the UTF-8 encoding of the script, so every
//! supported charset decodes to the same canonical text before encoding.
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// Charsets accepted for `--source-encoding` and auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Windows1252,
}

impl Charset {
    /// Parse a user-supplied charset name. Unknown names are an error so a
    /// typo never silently falls back to auto-detection.
    pub fn parse(name: &str) -> Result<Charset> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Charset::Utf8),
            "utf16le" | "utf-16le" => Ok(Charset::Utf16Le),
            "utf16be" | "utf-16be" => Ok(Charset::Utf16Be),
            "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Charset::Latin1),
            "windows-1252" | "windows1252" | "cp1252" => Ok(Charset::Windows1252),
            _ => Err(anyhow!("unsupported source encoding: {name}")),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf8",
            Charset::Utf16Le => "utf16le",
            Charset::Utf16Be => "utf16be",
            Charset::Latin1 => "latin1",
            Charset::Windows1252 => "windows-1252",
        }
    }

    fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => decode_with(encoding_rs::UTF_8, bytes),
            Charset::Utf16Le => decode_with(encoding_rs::UTF_16LE, bytes),
            Charset::Utf16Be => decode_with(encoding_rs::UTF_16BE, bytes),
            // True ISO-8859-1: every byte is the matching codepoint. The
            // WHATWG "latin1" label aliases Windows-1252, which is not what
            // callers declaring latin1 mean.
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Windows1252 => decode_with(encoding_rs::WINDOWS_1252, bytes),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_with(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// A source file decoded to canonical text plus the charset that was used.
#[derive(Debug, Clone)]
pub struct DecodedSource {
    pub text: String,
    pub charset: Charset,
}

/// Sniff the charset of raw bytes: byte-order mark first, then UTF-8
/// validity, then Windows-1252 as the legacy fallback.
pub fn detect_charset(bytes: &[u8]) -> Charset {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Charset::Utf8
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        Charset::Utf16Le
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        Charset::Utf16Be
    } else if std::str::from_utf8(bytes).is_ok() {
        Charset::Utf8
    } else {
        Charset::Windows1252
    }
}

/// Decode raw bytes with the explicit charset, or an auto-detected one.
/// A single leading U+FEFF is stripped after decoding; everything else,
/// including line endings, is preserved verbatim.
pub fn decode_bytes(bytes: &[u8], explicit: Option<Charset>) -> DecodedSource {
    let charset = explicit.unwrap_or_else(|| detect_charset(bytes));
    let decoded = charset.decode(bytes);
    let text = match decoded.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => decoded,
    };
    DecodedSource { text, charset }
}

/// Read and decode a source file. Identical bytes and charset always yield
/// identical text.
pub fn decode_file(path: &Path, explicit: Option<Charset>) -> Result<DecodedSource> {
    let bytes = fs::read(path).with_context(|| format!("read source file {}", path.display()))?;
    Ok(decode_bytes(&bytes, explicit))
}
