//! End-to-end coverage for scanning, pairing, and batch bundling.

mod common;

use common::{b64, stdout_of, LensTree};
use serde_json::json;

const ENHANCE_A: &str = "function enhance(content) {\n    return content + ' [a]';\n}\n";
const ENHANCE_B: &str = "const enhance = (content) => content + ' [b]';\n";

#[test]
fn batch_bundle_pairs_each_descriptor_with_its_own_script() {
    let tree = LensTree::new();
    tree.write_script("a.js", ENHANCE_A);
    tree.write_script("b.js", ENHANCE_B);
    tree.write_descriptor("a.json", "a", json!([]));
    tree.write_descriptor("b.json", "b", json!([]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    let a = tree.read_json("a.json");
    let b = tree.read_json("b.json");
    assert_eq!(a["content"][0]["data"], b64(ENHANCE_A));
    assert_eq!(b["content"][0]["data"], b64(ENHANCE_B));
}

#[test]
fn fallback_script_fills_unmatched_descriptor_in_same_directory() {
    let tree = LensTree::new();
    tree.write_script("helper.js", ENHANCE_A);
    tree.write_descriptor("other.json", "other", json!([]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    let other = tree.read_json("other.json");
    assert_eq!(other["content"][0]["data"], b64(ENHANCE_A));
    // The helper script only feeds existing descriptors.
    assert!(!tree.exists("helper.json"));
}

#[test]
fn exact_match_wins_over_fallback_candidates() {
    let tree = LensTree::new();
    tree.write_script("aaa-fallback.js", ENHANCE_B);
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_descriptor("lens.json", "lens", json!([]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert_eq!(tree.read_json("lens.json")["content"][0]["data"], b64(ENHANCE_A));
}

#[test]
fn orphan_script_produces_no_descriptor() {
    let tree = LensTree::new();
    tree.write_script("orphan.js", ENHANCE_A);

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(!tree.exists("orphan.json"));
}

#[test]
fn descriptor_without_any_script_gets_placeholder() {
    let tree = LensTree::new();
    tree.write_descriptor("alone.json", "alone", json!([]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    let record = tree.read_json("alone.json");
    let data = record["content"][0]["data"].as_str().unwrap();
    assert!(!data.is_empty());
    assert_eq!(record["content"][0]["contentType"], "application/javascript");
}

#[test]
fn default_exclusions_leave_node_modules_untouched() {
    let tree = LensTree::new();
    tree.write_script("node_modules/dep.js", ENHANCE_A);
    tree.write_descriptor("node_modules/dep.json", "dep", json!([]));
    tree.write_descriptor("top.json", "top", json!([{"data": "a2VlcA=="}]));

    let output = tree.run(&["batch-bundle", "--force"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    let hidden = tree.read_json("node_modules/dep.json");
    assert_eq!(hidden["content"], json!([]));
}

#[test]
fn extra_exclusions_compose_with_defaults() {
    let tree = LensTree::new();
    tree.write_descriptor("vendor/skip.json", "skip", json!([]));
    tree.write_descriptor("node_modules/dep.json", "dep", json!([]));
    tree.write_descriptor("keep.json", "keep", json!([]));

    let output = tree.run(&["batch-bundle", "-e", "vendor"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    assert_eq!(tree.read_json("vendor/skip.json")["content"], json!([]));
    assert_eq!(tree.read_json("node_modules/dep.json")["content"], json!([]));
    assert!(tree.read_json("keep.json")["content"][0]["data"].is_string());
}

#[test]
fn skip_valid_leaves_valid_descriptors_alone() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_descriptor("lens.json", "lens", json!([{"data": "c3RhbGU="}]));

    let output = tree.run(&["batch-bundle", "--skip-valid"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert_eq!(tree.read_json("lens.json")["content"][0]["data"], "c3RhbGU=");
}

#[test]
fn up_to_date_descriptor_is_not_rewritten_by_default() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_descriptor("lens.json", "lens", json!([{"data": b64(ENHANCE_A)}]));
    let before = std::fs::read_to_string(tree.root.join("lens.json")).unwrap();

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    let after = std::fs::read_to_string(tree.root.join("lens.json")).unwrap();
    assert_eq!(before, after);

    // --force rewrites it, refreshing the date stamp.
    let forced = tree.run(&["batch-bundle", "--force"]);
    assert_eq!(forced.status.code(), Some(0), "{}", stdout_of(&forced));
    assert!(tree.read_json("lens.json")["date"].is_string());
}

#[test]
fn stale_payload_is_rewritten_without_force() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_descriptor("lens.json", "lens", json!([{"data": "c3RhbGU="}]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert_eq!(tree.read_json("lens.json")["content"][0]["data"], b64(ENHANCE_A));
}

#[test]
fn skip_date_preserves_existing_date() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    let record = json!({
        "resourceType": "Library",
        "url": "https://example.com/lens",
        "name": "lens",
        "status": "active",
        "date": "2020-01-01T00:00:00.000Z",
        "content": [],
    });
    tree.write_raw("lens.json", serde_json::to_string(&record).unwrap().as_bytes());

    let output = tree.run(&["batch-bundle", "--skip-date"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert_eq!(tree.read_json("lens.json")["date"], "2020-01-01T00:00:00.000Z");
}

#[test]
fn unparseable_descriptors_do_not_abort_the_batch() {
    let tree = LensTree::new();
    tree.write_raw("broken.json", b"{not json");
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_descriptor("lens.json", "lens", json!([]));

    let output = tree.run(&["batch-bundle"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert_eq!(tree.read_json("lens.json")["content"][0]["data"], b64(ENHANCE_A));
}

#[test]
fn ls_lens_lists_usable_descriptors() {
    let tree = LensTree::new();
    tree.write_descriptor("good.json", "good", json!([{"data": "ZA=="}]));
    tree.write_descriptor("empty.json", "empty", json!([]));

    let output = tree.run(&["ls-lens", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let rows: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["good"]);
}

#[test]
fn ls_lens_almost_valid_shows_repairable_descriptors() {
    let tree = LensTree::new();
    tree.write_descriptor("good.json", "good", json!([{"data": "ZA=="}]));
    tree.write_descriptor("empty.json", "empty", json!([]));

    let output = tree.run(&["ls-lens", "--almost-valid", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let rows: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "empty");
}

#[test]
fn ls_enhance_lists_only_entry_point_scripts() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    tree.write_script("plain.js", "module.exports = {};\n");

    let output = tree.run(&["ls-enhance", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let rows: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["path"], "lens.js");
}

#[test]
fn new_scaffolds_script_and_descriptor_pair() {
    let tree = LensTree::new();
    let output = tree.run(&["new", "my-lens"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert!(tree.exists("my-lens.js"));

    let record = tree.read_json("my-lens.json");
    assert_eq!(record["resourceType"], "Library");
    assert_eq!(record["name"], "my-lens");
    assert_eq!(record["status"], "draft");
    assert!(record["content"][0]["data"].as_str().is_some());

    // Scaffolding refuses to clobber what it just created.
    let second = tree.run(&["new", "my-lens"]);
    assert_eq!(second.status.code(), Some(2));
}

#[test]
fn bundle_creates_descriptor_from_package_manifest() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    let manifest = json!({
        "name": "manifest-lens",
        "version": "2.3.4",
        "description": "From the manifest",
        "license": "MIT",
        "author": {"name": "Jane Doe", "email": "jane@example.com"},
    });
    tree.write_raw("pkg.json", serde_json::to_string(&manifest).unwrap().as_bytes());

    let output = tree.run(&["bundle", "lens.js", "-p", "pkg.json"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));

    let record = tree.read_json("manifest-lens.json");
    assert_eq!(record["version"], "2.3.4");
    assert_eq!(record["publisher"], "Jane Doe");
    assert_eq!(record["copyright"], "Licensed under MIT");
    assert_eq!(record["content"][0]["data"], b64(ENHANCE_A));
}

#[test]
fn bundle_without_name_or_manifest_is_an_operational_error() {
    let tree = LensTree::new();
    tree.write_script("lens.js", ENHANCE_A);
    let output = tree.run(&["bundle", "lens.js"]);
    assert_eq!(output.status.code(), Some(2));
}
