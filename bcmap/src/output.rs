// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! The three per-run output streams: the barcode table, consensus DNA records
//! and protein records.

use crate::errors::BcmapError;
use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything written for one cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterResult {
    pub cluster: String,
    pub allele: String,
    pub num_n: usize,
    pub num_c: usize,
    pub num_mismatch: usize,
    pub consensus: String,
    pub support: String,
    pub n_display: String,
    pub c_display: String,
    pub protein: String,
    pub barcodes: Vec<String>,
}

impl ClusterResult {
    /// Header shared by the DNA and protein records.
    pub fn header(&self) -> String {
        format!(
            ">cluster_{},{},{},{},{}",
            self.cluster, self.allele, self.num_n, self.num_c, self.num_mismatch
        )
    }
}

/// Output file paths of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub clusters: PathBuf,
    pub dna: PathBuf,
    pub prot: PathBuf,
}

impl OutputPaths {
    /// Output files in `out_dir`, named after the final component of `cluster_dir`.
    pub fn for_cluster_dir(cluster_dir: &Path, out_dir: &Path) -> Result<OutputPaths> {
        let root = match cluster_dir.file_name() {
            Some(name) => name.to_os_string(),
            None => cluster_dir
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|s| s.to_os_string()))
                .ok_or_else(|| BcmapError::BadClusterDir {
                    dir: cluster_dir.to_path_buf(),
                })?,
        };
        let root = root.to_string_lossy();
        Ok(OutputPaths {
            clusters: out_dir.join(format!("{root}.clusters")),
            dna: out_dir.join(format!("{root}_dna.fasta")),
            prot: out_dir.join(format!("{root}_prot.fasta")),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.clusters, &self.dna, &self.prot]
            .into_iter()
            .map(PathBuf::as_path)
    }

    /// Fail if any of the outputs is already present.
    pub fn ensure_absent(&self) -> Result<(), BcmapError> {
        let paths: Vec<_> = self
            .iter()
            .filter(|p| p.exists())
            .map(Path::to_path_buf)
            .collect();
        if paths.is_empty() {
            Ok(())
        } else {
            Err(BcmapError::OutputExists { paths })
        }
    }
}

/// One line of the barcode table.
#[derive(Serialize)]
struct BarcodeRow<'a> {
    barcode: &'a str,
    cluster: &'a str,
    allele: &'a str,
}

/// Buffered writers for the three output streams.
pub struct OutputWriters {
    clusters: csv::Writer<File>,
    dna: BufWriter<File>,
    prot: BufWriter<File>,
}

fn create_new(path: &Path) -> Result<File> {
    File::create_new(path).with_context(|| path.display().to_string())
}

impl OutputWriters {
    /// Create all three files; none of them may exist yet. If one cannot be
    /// created, the ones already created are removed again.
    pub fn create(paths: &OutputPaths) -> Result<OutputWriters> {
        paths.ensure_absent()?;
        let mut files = Vec::with_capacity(3);
        for path in paths.iter() {
            match create_new(path) {
                Ok(file) => files.push(file),
                Err(err) => {
                    drop(files);
                    for created in paths.iter().take_while(|&p| p != path) {
                        if let Err(rm_err) = std::fs::remove_file(created) {
                            warn!("could not remove {}: {rm_err}", created.display());
                        }
                    }
                    return Err(err);
                }
            }
        }
        let [clusters, dna, prot]: [File; 3] = files
            .try_into()
            .map_err(|_| anyhow!("expected three output files"))?;
        Ok(OutputWriters {
            clusters: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(clusters),
            dna: BufWriter::new(dna),
            prot: BufWriter::new(prot),
        })
    }

    pub fn write_cluster(&mut self, result: &ClusterResult) -> Result<()> {
        let header = result.header();

        writeln!(self.dna, "{header}")?;
        writeln!(self.dna, "{}", result.consensus)?;
        writeln!(self.dna, "{}", result.support)?;
        writeln!(self.dna, "{}", result.n_display)?;
        writeln!(self.dna, "{}", result.c_display)?;

        writeln!(self.prot, "{header}")?;
        writeln!(self.prot, "{}", result.protein)?;

        for barcode in &result.barcodes {
            self.clusters.serialize(BarcodeRow {
                barcode,
                cluster: &result.cluster,
                allele: &result.allele,
            })?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.clusters.flush()?;
        self.dna.flush()?;
        self.prot.flush()?;
        Ok(())
    }

    /// Flush and close the streams.
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }
}
