use crate::config::GenConfig;
use crate::generator::{generate, GenerateOptions, GenerationReport};
use crate::spec::load_spec;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Command-line interface for crudgen
///
/// Reads an entity spec and writes the generated backend under `--root`.
#[derive(Parser, Debug)]
#[command(name = "crudgen", version)]
#[command(about = "Generate a FastAPI/SQLAlchemy CRUD backend from an entity spec", long_about = None)]
pub struct Cli {
    /// Path to the entity spec (JSON)
    #[arg(short, long)]
    pub spec: PathBuf,

    /// Path to the generator config overlay (JSON)
    #[arg(short, long, env = "CRUDGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project root the app directory is resolved against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Remove previously generated output of this spec before generating
    #[arg(long, default_value_t = false)]
    pub clean: bool,

    /// Render everything and report the would-be file list without writing
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// Run one generation for already-parsed arguments.
///
/// The spec and config are loaded and validated before anything is written.
///
/// # Errors
///
/// Returns an error if:
/// - The spec file cannot be read, parsed or validated
/// - The config overlay is malformed
/// - An import target cannot be parsed
/// - A file cannot be written or removed
pub fn execute(cli: &Cli) -> anyhow::Result<GenerationReport> {
    let spec_path = cli
        .spec
        .canonicalize()
        .with_context(|| format!("cannot open spec {}", cli.spec.display()))?;
    let config = GenConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let spec = load_spec(&spec_path)
        .with_context(|| format!("failed to load spec {}", spec_path.display()))?;
    info!(
        entities = spec.entities.len(),
        enums = spec.enums.len(),
        spec = %spec_path.display(),
        "spec loaded"
    );

    let opts = GenerateOptions {
        root: cli.root.clone(),
        spec_path,
        clean: cli.clean,
        dry_run: cli.dry_run,
    };
    let report = generate(&spec, &config, &opts).context("generation failed")?;
    Ok(report)
}

/// Parse the process arguments, generate, and print the summary
///
/// # Errors
///
/// Propagates every error of [`execute`].
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let report = execute(&cli)?;

    if cli.dry_run {
        for path in report.removed.iter() {
            println!("would remove {}", path.display());
        }
        for path in report.written.iter().chain(report.scaffolded.iter()) {
            println!("would write {}", path.display());
        }
    } else if !report.removed.is_empty() {
        println!("🧹 Removed {} generated paths", report.removed.len());
    }
    for path in &report.skipped {
        println!("⚠️  Kept hand-written {}", path.display());
    }
    if !cli.dry_run {
        println!("✅ Generated {} files", report.written.len());
        for path in &report.scaffolded {
            println!("✅ Scaffolded {}", path.display());
        }
    }
    println!("Codegen done.");
    println!("{}", report.mount_import);
    Ok(())
}
