//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A temporary lens tree plus helpers for driving the compiled binary.
pub struct LensTree {
    _temp: TempDir,
    pub root: PathBuf,
}

impl LensTree {
    pub fn new() -> LensTree {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().to_path_buf();
        LensTree { _temp: temp, root }
    }

    /// Write a script file relative to the tree root, creating parents.
    pub fn write_script(&self, rel: &str, body: &str) -> PathBuf {
        self.write_raw(rel, body.as_bytes())
    }

    pub fn write_raw(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, bytes).expect("write file");
        path
    }

    /// Write a minimal Library descriptor with the given content field.
    pub fn write_descriptor(&self, rel: &str, name: &str, content: serde_json::Value) -> PathBuf {
        let record = serde_json::json!({
            "resourceType": "Library",
            "url": format!("https://example.com/{name}"),
            "name": name,
            "status": "active",
            "version": "1.0.0",
            "content": content,
        });
        self.write_raw(
            rel,
            serde_json::to_string_pretty(&record)
                .expect("serialize descriptor")
                .as_bytes(),
        )
    }

    pub fn read_json(&self, rel: &str) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.root.join(rel)).expect("read descriptor");
        serde_json::from_str(&raw).expect("parse descriptor")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Run the binary with the tree root as working directory.
    pub fn run(&self, args: &[&str]) -> Output {
        run_in(&self.root, args)
    }
}

impl Default for LensTree {
    fn default() -> LensTree {
        LensTree::new()
    }
}

/// Run the compiled binary in `dir` and capture output.
pub fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lensb"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run lensb")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Base64 of a UTF-8 string, matching what the binary embeds.
pub fn b64(text: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(text.as_bytes())
}
