//! CLI argument parsing for the lens bundling workflow.
//!
//! The CLI is intentionally thin: each subcommand maps to one engine
//! operation, so the same core logic can be reused elsewhere.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for lens descriptor maintenance.
///
/// Keeping a single `RootArgs` type makes command routing obvious and avoids
/// hidden defaults in subcommand constructors.
#[derive(Parser, Debug)]
#[command(
    name = "lensb",
    version,
    about = "Bundle and verify FHIR lens descriptors for enhance scripts",
    after_help = "Commands:\n  bundle <file.js>        Bundle one script into a Library descriptor\n  check <file.js>         Verify a descriptor embeds the current script\n  batch-bundle [dir]      Bundle every lens under a directory tree\n  batch-check [dir]       Verify every exact script/descriptor pairing\n  ls-lens [dir]           List usable lens descriptors\n  ls-enhance [dir]        List scripts that declare an enhance entry point\n  new <name>              Scaffold a script and descriptor pair\n\nExamples:\n  lensb bundle lenses/pregnancy.js -n pregnancy-lens\n  lensb bundle lenses/pregnancy.js -u --skip-date\n  lensb check lenses/pregnancy.js\n  lensb batch-bundle lenses -e 'dist' --skip-valid\n  lensb batch-check lenses --json\n  lensb ls-lens lenses --validate --show-reasons\n  lensb new my-lens",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Bundle(BundleArgs),
    Check(CheckArgs),
    BatchBundle(BatchBundleArgs),
    BatchCheck(BatchCheckArgs),
    LsLens(LsLensArgs),
    LsEnhance(LsEnhanceArgs),
    New(NewArgs),
}

/// Bundle command inputs for a single script.
#[derive(Parser, Debug)]
#[command(about = "Bundle one enhance script into a Library descriptor")]
pub struct BundleArgs {
    /// Path to the JavaScript lens source
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Name for a newly created descriptor
    #[arg(short, long, value_name = "NAME", conflicts_with = "package_manifest")]
    pub name: Option<String>,

    /// Derive descriptor metadata from an npm-style package manifest
    #[arg(short = 'p', long, value_name = "FILE")]
    pub package_manifest: Option<PathBuf>,

    /// Update an existing descriptor instead of creating one
    #[arg(short, long)]
    pub update: bool,

    /// Leave the descriptor's date field untouched
    #[arg(long)]
    pub skip_date: bool,

    /// Character encoding of the script file (detected when omitted)
    #[arg(long, value_name = "ENCODING")]
    pub source_encoding: Option<String>,
}

/// Check command inputs for a single script/descriptor pairing.
#[derive(Parser, Debug)]
#[command(about = "Verify a descriptor embeds the current script content")]
pub struct CheckArgs {
    /// Path to the JavaScript lens source
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Explicit descriptor path to check against
    #[arg(short = 'b', long, value_name = "FILE")]
    pub bundle: Option<PathBuf>,

    /// Descriptor name to resolve in the script's directory
    #[arg(short, long, value_name = "NAME", conflicts_with = "bundle")]
    pub name: Option<String>,

    /// Suppress per-check output; rely on the exit code
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Character encoding of the script file (detected when omitted)
    #[arg(long, value_name = "ENCODING")]
    pub source_encoding: Option<String>,
}

/// Batch bundle command inputs for a directory tree.
#[derive(Parser, Debug)]
#[command(about = "Bundle every lens descriptor under a directory tree")]
pub struct BatchBundleArgs {
    /// Root directory to scan
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Additional exclusion patterns (regex on path segments, repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Skip descriptors whose payload already matches their script
    #[arg(short, long)]
    pub skip_valid: bool,

    /// Leave descriptor date fields untouched
    #[arg(short = 'd', long)]
    pub skip_date: bool,

    /// Rewrite every descriptor even when its payload is current
    #[arg(short, long, conflicts_with = "skip_valid")]
    pub force: bool,

    /// Character encoding of script files (detected when omitted)
    #[arg(long, value_name = "ENCODING")]
    pub source_encoding: Option<String>,
}

/// Batch check command inputs for a directory tree.
#[derive(Parser, Debug)]
#[command(about = "Verify every exact script/descriptor pairing under a tree")]
pub struct BatchCheckArgs {
    /// Root directory to scan
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Additional exclusion patterns (regex on path segments, repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Suppress per-check output; rely on the exit code
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Lens listing inputs.
#[derive(Parser, Debug)]
#[command(about = "List usable lens descriptors under a directory tree")]
pub struct LsLensArgs {
    /// Root directory to scan
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Include descriptors that fail validation
    #[arg(short, long)]
    pub all: bool,

    /// Only show descriptors that are one content repair from validity
    #[arg(long, conflicts_with = "all")]
    pub almost_valid: bool,

    /// Validate against the full lens profile and show per-lens results
    #[arg(short, long)]
    pub validate: bool,

    /// Show missing requirements for descriptors that fail validation
    #[arg(short = 'r', long, requires = "validate")]
    pub show_reasons: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Enhance script listing inputs.
#[derive(Parser, Debug)]
#[command(about = "List scripts that declare an enhance entry point")]
pub struct LsEnhanceArgs {
    /// Root directory to scan
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Show pairing details for each script
    #[arg(short, long)]
    pub details: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// New command inputs for scaffolding a lens.
#[derive(Parser, Debug)]
#[command(about = "Scaffold a placeholder script and descriptor pair")]
pub struct NewArgs {
    /// Name for the new lens (used for both file stems and metadata)
    #[arg(value_name = "NAME")]
    pub name: String,
}
