//! Lattice Extract - converts a cell model tree into lattice parameters
//!
//! Reads the model as JSON in the attribute/text convention (`@attr`,
//! `#text`), runs the extraction and writes the parameter set as JSON.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use lattice_extract::{extract, ExtractConfig, ExtractOptions, ModelTree, ParameterSet};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Both this binary and the library log under the `lattice_extract` target.
const DEFAULT_FILTER: &str = "lattice_extract=info";

#[derive(Parser, Debug)]
#[command(name = "lattice-extract")]
#[command(about = "Extract dimensionless lattice parameters from a cell model")]
struct Cli {
    /// Model tree as JSON
    input: PathBuf,

    /// Extraction config (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the parameter set here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Write the output even when some entities failed to extract
    #[arg(long)]
    allow_partial: bool,
}

fn load_options(path: Option<&Path>) -> Result<ExtractOptions> {
    let Some(path) = path else {
        return Ok(ExtractOptions::default());
    };
    info!("Loading config from: {}", path.display());
    let config = ExtractConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    Ok(config.to_options())
}

fn load_tree(path: &Path) -> Result<ModelTree> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse model tree {}", path.display()))
}

fn write_output(set: &ParameterSet, cli: &Cli) -> Result<()> {
    let json = if cli.pretty {
        serde_json::to_string_pretty(set)?
    } else {
        serde_json::to_string(set)?
    };
    match &cli.output {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli.config.as_deref())?;

    info!("Loading model from: {}", cli.input.display());
    let tree = load_tree(&cli.input)?;

    let set = extract(&tree, &options).context("extraction failed")?;
    info!(
        "Lattice {:?}, {} steps, {} cell types, {} substrates",
        set.lattice_dims(),
        set.time.steps,
        set.cell_types.len(),
        set.substrates.len()
    );

    if !set.is_complete() {
        for failure in &set.failures {
            warn!("{failure}");
        }
        if !cli.allow_partial {
            bail!(
                "{} entities failed to extract (use --allow-partial to write the rest)",
                set.failures.len()
            );
        }
    }

    write_output(&set, cli)
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
