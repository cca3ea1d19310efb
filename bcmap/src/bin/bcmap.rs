//! bcmap
#![deny(missing_docs)]

use anyhow::Result;
use bcmap::experiment::Experiment;
use bcmap::mylog;
use bcmap::output::OutputPaths;
use bcmap_ref::Reference;
use clap::Parser;
use log::{info, LevelFilter};
use parameters_toml::Parameters;
use std::path::PathBuf;

/// Call one consensus sequence, protein and allele per barcode cluster.
#[derive(Debug, Parser)]
#[command(name = "bcmap", version)]
struct Args {
    /// FASTA file with the reference construct.
    reference: PathBuf,
    /// Whitespace separated table of `<cluster> <barcode>` lines.
    membership: PathBuf,
    /// Directory with one `cluster_<id>` read file per cluster.
    cluster_dir: PathBuf,
    /// Directory the three output files are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// TOML file overriding the default run parameters.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Number of leading barcode characters used as the key.
    #[arg(long)]
    key_size: Option<usize>,
    /// Maximum number of cluster files to visit.
    #[arg(long)]
    max_cluster_files: Option<usize>,
    /// Log debug messages.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    mylog::init_log(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let mut params = Parameters::load(args.params.as_deref())?;
    if let Some(key_size) = args.key_size {
        params.key_size = key_size;
    }
    if let Some(max_cluster_files) = args.max_cluster_files {
        params.max_cluster_files = max_cluster_files;
    }
    params.validate()?;

    // Refuse to start if a previous run left outputs behind.
    OutputPaths::for_cluster_dir(&args.cluster_dir, &args.out_dir)?.ensure_absent()?;

    let reference = Reference::from_fasta(&args.reference)?;
    let experiment = Experiment::new(reference, &args.membership, params)?;
    let summary = experiment.map_from_cluster_files(&args.cluster_dir, &args.out_dir)?;
    info!(
        "Done: {} of {} visited clusters written",
        summary.written, summary.visited
    );
    Ok(())
}
