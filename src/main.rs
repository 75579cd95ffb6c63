use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod classify;
mod cli;
mod content;
mod discover;
mod encoding;
mod integrity;
mod pairing;
mod resource;
mod scan;
mod validate;

use classify::Classifier;
use cli::{
    BatchBundleArgs, BatchCheckArgs, BundleArgs, CheckArgs, Command, LsEnhanceArgs, LsLensArgs,
    NewArgs, RootArgs,
};
use content::{encode_payload, synchronize, SyncOptions, PLACEHOLDER_SCRIPT};
use discover::discover;
use encoding::{decode_file, Charset};
use integrity::{check_integrity, CheckReport};
use pairing::build_pairing_index;
use resource::{LensResource, RESOURCE_TYPE};
use scan::{scan_tree, ExclusionSet, DESCRIPTOR_EXTENSION};
use validate::{missing_requirements, validate_full, validate_minimal};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: RootArgs) -> Result<ExitCode> {
    match args.command {
        Command::Bundle(args) => cmd_bundle(args),
        Command::Check(args) => cmd_check(args),
        Command::BatchBundle(args) => cmd_batch_bundle(args),
        Command::BatchCheck(args) => cmd_batch_check(args),
        Command::LsLens(args) => cmd_ls_lens(args),
        Command::LsEnhance(args) => cmd_ls_enhance(args),
        Command::New(args) => cmd_new(args),
    }
}

fn cmd_bundle(args: BundleArgs) -> Result<ExitCode> {
    let charset = parse_charset(args.source_encoding.as_deref())?;
    let decoded = decode_file(&args.file, charset)?;
    let payload = encode_payload(&decoded.text);
    let options = SyncOptions {
        skip_date: args.skip_date,
    };

    if args.update {
        let descriptor_path = resolve_descriptor(&args.file, args.name.as_deref(), None)?
            .ok_or_else(|| {
                anyhow!(
                    "no descriptor found to update for {}",
                    args.file.display()
                )
            })?;
        let record = read_json(&descriptor_path)?;
        let updated = synchronize(&record, Some(&payload), &options);
        write_json(&descriptor_path, &updated)?;
        println!("Updated {}", descriptor_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let resource = if let Some(manifest_path) = &args.package_manifest {
        let manifest = read_json(manifest_path)?;
        LensResource::from_package_manifest(&manifest, &payload)
    } else if let Some(name) = &args.name {
        LensResource::default_values(name, &payload)
    } else {
        return Err(anyhow!(
            "either --name or --package-manifest is required to create a descriptor \
             (use --update to refresh an existing one)"
        ));
    };

    let descriptor_path = args
        .file
        .with_file_name(format!("{}.{DESCRIPTOR_EXTENSION}", resource.name));
    if descriptor_path.is_file() {
        // An existing descriptor keeps its metadata; only the payload and
        // date are refreshed.
        let record = read_json(&descriptor_path)?;
        let updated = synchronize(&record, Some(&payload), &options);
        write_json(&descriptor_path, &updated)?;
        println!("Updated existing {}", descriptor_path.display());
    } else {
        write_json(&descriptor_path, &resource.to_value())?;
        println!("Wrote {}", descriptor_path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(args: CheckArgs) -> Result<ExitCode> {
    let charset = parse_charset(args.source_encoding.as_deref())?;
    let descriptor_path =
        resolve_descriptor(&args.file, args.name.as_deref(), args.bundle.as_deref())?
            .ok_or_else(|| anyhow!("no descriptor found for {}", args.file.display()))?;

    let report = check_integrity(&args.file, &descriptor_path, charset);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_check_line(&report);
    }
    Ok(exit_for(report.passed()))
}

fn cmd_batch_bundle(args: BatchBundleArgs) -> Result<ExitCode> {
    let charset = parse_charset(args.source_encoding.as_deref())?;
    let exclusions = ExclusionSet::defaults().extend(&args.exclude)?;
    let discovery = discover(&args.dir, &exclusions)?;
    let options = SyncOptions {
        skip_date: args.skip_date,
    };

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for entry in &discovery.entries {
        let payload = match discovery.index.resolve(&entry.path) {
            Some((source_path, _)) => match decode_file(source_path, charset) {
                Ok(decoded) => Some(encode_payload(&decoded.text)),
                Err(err) => {
                    errors.push(format!("{}: {err:#}", source_path.display()));
                    continue;
                }
            },
            None => None,
        };

        // Entries without an enhance source were valid on disk; respect the
        // skip flags for them. Repaired entries always need a write.
        if entry.enhance_source.is_none() {
            if args.skip_valid {
                skipped += 1;
                tracing::debug!(path = %entry.path.display(), "skipping valid descriptor");
                continue;
            }
            let up_to_date = match (&payload, first_content_data(&entry.resource)) {
                (Some(payload), Some(current)) => payload == current,
                (None, _) => true,
                _ => false,
            };
            if up_to_date && !args.force {
                skipped += 1;
                tracing::debug!(path = %entry.path.display(), "descriptor already up to date");
                continue;
            }
        }

        let updated = synchronize(&entry.resource, payload.as_deref(), &options);
        match write_json(&entry.path, &updated) {
            Ok(()) => {
                written += 1;
                println!("Bundled {}", rel(&entry.path, &args.dir).display());
            }
            Err(err) => errors.push(format!("{}: {err:#}", entry.path.display())),
        }
    }

    println!("{}", "=".repeat(60));
    println!(
        "Bundled {written} descriptor(s), skipped {skipped}, {} error(s)",
        errors.len()
    );
    for error in &errors {
        eprintln!("  {error}");
    }
    Ok(exit_for(errors.is_empty()))
}

fn cmd_batch_check(args: BatchCheckArgs) -> Result<ExitCode> {
    let exclusions = ExclusionSet::defaults().extend(&args.exclude)?;
    let scan = scan_tree(&args.dir, &exclusions)?;
    let classifier = Classifier::new();
    let index = build_pairing_index(&scan.source_paths, &classifier);

    let reports: Vec<CheckReport> = index
        .exact_pairs()
        .map(|(descriptor, source)| check_integrity(source, descriptor, None))
        .collect();
    let failures = reports.iter().filter(|report| !report.passed()).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        if !args.quiet {
            for report in &reports {
                print_check_line(report);
            }
        }
        println!("{}", "=".repeat(60));
        println!("Checked {} pairing(s), {failures} failure(s)", reports.len());
    }
    Ok(exit_for(failures == 0))
}

/// Row emitted by `ls-lens`; validation fields are populated on demand.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LensRow {
    path: PathBuf,
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_requirements: Vec<String>,
}

fn cmd_ls_lens(args: LsLensArgs) -> Result<ExitCode> {
    let scan = scan_tree(&args.dir, &ExclusionSet::defaults())?;

    let mut rows = Vec::new();
    for path in &scan.descriptor_paths {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "skipping unreadable file");
                continue;
            }
        };
        let record: Value = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "skipping unparseable file");
                continue;
            }
        };
        if record.get("resourceType").and_then(Value::as_str) != Some(RESOURCE_TYPE) {
            continue;
        }

        let minimal = validate_minimal(&record);
        let has_data = record
            .get("content")
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(validate::has_content_data));
        let include = if args.all {
            true
        } else if args.almost_valid {
            !minimal.is_valid
                && minimal.errors.len() <= 2
                && minimal.errors.iter().any(|error| error.contains("content"))
        } else {
            minimal.is_valid || has_data
        };
        if !include {
            continue;
        }

        let report = if args.validate {
            validate_full(&record)
        } else {
            minimal
        };
        rows.push(LensRow {
            path: rel(path, &args.dir).to_path_buf(),
            name: record
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string(),
            valid: report.is_valid,
            errors: if args.validate { report.errors } else { Vec::new() },
            missing_requirements: if args.show_reasons && !report.is_valid {
                missing_requirements(&record)
            } else {
                Vec::new()
            },
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    for row in &rows {
        if args.validate {
            let verdict = if row.valid { "valid" } else { "INVALID" };
            println!("{} ({}) {verdict}", row.path.display(), row.name);
            for error in &row.errors {
                println!("    error: {error}");
            }
            for requirement in &row.missing_requirements {
                println!("    missing: {requirement}");
            }
        } else {
            println!("{}", row.path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Row emitted by `ls-enhance`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceRow {
    path: PathBuf,
    form: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptor: Option<PathBuf>,
}

fn cmd_ls_enhance(args: LsEnhanceArgs) -> Result<ExitCode> {
    let scan = scan_tree(&args.dir, &ExclusionSet::defaults())?;
    let classifier = Classifier::new();
    let index = build_pairing_index(&scan.source_paths, &classifier);

    let mut rows = Vec::new();
    for source in index.all_sources() {
        let form = fs::read(source)
            .ok()
            .map(|bytes| encoding::decode_bytes(&bytes, None))
            .and_then(|decoded| classifier.detect(&decoded.text))
            .map_or_else(|| "unknown".to_string(), |form| format!("{form:?}"));
        let sibling = source.with_extension(DESCRIPTOR_EXTENSION);
        rows.push(EnhanceRow {
            path: rel(source, &args.dir).to_path_buf(),
            form,
            descriptor: sibling
                .is_file()
                .then(|| rel(&sibling, &args.dir).to_path_buf()),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    for row in &rows {
        if args.details {
            let pairing = match &row.descriptor {
                Some(descriptor) => format!("exact match: {}", descriptor.display()),
                None => "fallback (no sibling descriptor)".to_string(),
            };
            println!("{} [{}] {pairing}", row.path.display(), row.form);
        } else {
            println!("{}", row.path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_new(args: NewArgs) -> Result<ExitCode> {
    let script_path = PathBuf::from(format!("{}.js", args.name));
    let descriptor_path = PathBuf::from(format!("{}.{DESCRIPTOR_EXTENSION}", args.name));
    for path in [&script_path, &descriptor_path] {
        if path.exists() {
            return Err(anyhow!("refusing to overwrite {}", path.display()));
        }
    }

    let script = format!("{PLACEHOLDER_SCRIPT}\n");
    fs::write(&script_path, &script)
        .with_context(|| format!("write script {}", script_path.display()))?;
    let resource = LensResource::default_values(&args.name, &encode_payload(&script));
    write_json(&descriptor_path, &resource.to_value())?;
    println!(
        "Created {} and {}",
        script_path.display(),
        descriptor_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn exit_for(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn parse_charset(name: Option<&str>) -> Result<Option<Charset>> {
    name.map(Charset::parse).transpose()
}

fn print_check_line(report: &CheckReport) {
    if report.passed() {
        println!(
            "ok   {} -> {}",
            report.source.display(),
            report.descriptor.display()
        );
    } else {
        let detail = report
            .detail
            .as_deref()
            .map(|detail| format!(" ({detail})"))
            .unwrap_or_default();
        println!(
            "FAIL {} -> {}: {}{detail}",
            report.source.display(),
            report.descriptor.display(),
            report.outcome.reason()
        );
    }
}

/// Resolve the descriptor a script should be compared with or bundled into.
///
/// Priority: explicit path, named sibling, same-stem sibling, then the first
/// descriptor in the script's directory carrying the resource tag.
fn resolve_descriptor(
    source: &Path,
    name: Option<&str>,
    explicit: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }
    let dir = source.parent().filter(|dir| !dir.as_os_str().is_empty());
    let dir = dir.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    if let Some(name) = name {
        return Ok(Some(dir.join(format!("{name}.{DESCRIPTOR_EXTENSION}"))));
    }

    let sibling = source.with_extension(DESCRIPTOR_EXTENSION);
    if sibling.is_file() {
        return Ok(Some(sibling));
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(&dir)
        .with_context(|| format!("read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == DESCRIPTOR_EXTENSION)
        })
        .collect();
    candidates.sort();
    for candidate in candidates {
        let Ok(record) = read_json(&candidate) else {
            continue;
        };
        if record.get("resourceType").and_then(Value::as_str) == Some(RESOURCE_TYPE) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn first_content_data(record: &Value) -> Option<&str> {
    record
        .get("content")?
        .as_array()?
        .first()?
        .get("data")?
        .as_str()
}

fn rel<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value =
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}

/// Descriptors are written pretty-printed with a trailing newline so diffs
/// stay readable under version control.
fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
