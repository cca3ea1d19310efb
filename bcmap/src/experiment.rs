// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Driving the consensus caller over a directory of cluster read files.

use crate::clusters::{ClusterId, ClusterMembership};
use crate::consensus::{call_consensus, CallCutoffs};
use crate::output::{ClusterResult, OutputPaths, OutputWriters};
use crate::reads::{read_cluster_file, ClusterReads, TerminalPolicy};
use anyhow::{Context, Result};
use bcmap_ref::ProfileProvider;
use itertools::Itertools;
use log::{debug, info, warn};
use parameters_toml::Parameters;
use std::path::{Path, PathBuf};

/// Counts reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cluster files looked at, processed or skipped.
    pub visited: usize,
    pub written: usize,
    pub skipped: usize,
    pub flushes: usize,
}

pub struct Experiment<P> {
    provider: P,
    membership: ClusterMembership,
    params: Parameters,
}

/// Regular files in `dir`, sorted by name.
pub fn list_cluster_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| dir.display().to_string())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

impl<P: ProfileProvider> Experiment<P> {
    /// Set up a run, loading the cluster membership table.
    pub fn new(provider: P, membership_file: &Path, params: Parameters) -> Result<Self> {
        let membership = ClusterMembership::load(membership_file, params.key_size)?;
        Ok(Self::with_membership(provider, membership, params))
    }

    pub fn with_membership(provider: P, membership: ClusterMembership, params: Parameters) -> Self {
        Experiment {
            provider,
            membership,
            params,
        }
    }

    pub fn membership(&self) -> &ClusterMembership {
        &self.membership
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Build the output record for one cluster, or `None` when the cluster
    /// lacks reads from either terminus.
    pub fn process_cluster(&self, reads: &ClusterReads) -> Result<Option<ClusterResult>> {
        if !reads.has_both_termini() {
            return Ok(None);
        }

        let n_probs = self
            .provider
            .calc_base_prob(&reads.n_term.bases, &reads.n_term.quals, false);
        let c_probs = self
            .provider
            .calc_base_prob(&reads.c_term.bases, &reads.c_term.quals, true);

        self.check_membership(reads);

        let consensus = call_consensus(&n_probs, &c_probs, CallCutoffs::from_params(&self.params))
            .with_context(|| format!("cluster {}", reads.label))?;
        let seq = consensus.seq();

        Ok(Some(ClusterResult {
            cluster: reads.label.clone(),
            allele: self.provider.get_allele(&seq),
            num_n: reads.n_term.len(),
            num_c: reads.c_term.len(),
            num_mismatch: consensus.num_mismatch,
            consensus: String::from_utf8_lossy(&seq).into_owned(),
            support: consensus.support_string(),
            n_display: self.provider.prob_to_seq(&n_probs),
            c_display: self.provider.prob_to_seq(&c_probs),
            protein: self.provider.translate(&seq),
            barcodes: reads.barcodes.clone(),
        }))
    }

    /// Report read barcodes whose membership entry disagrees with the file's
    /// cluster label. The output keeps the label either way.
    fn check_membership(&self, reads: &ClusterReads) {
        let label: Option<ClusterId> = reads.label.parse().ok();
        let disagree = reads
            .barcodes
            .iter()
            .filter(|bc| self.membership.cluster_of(bc) != label)
            .count();
        if disagree > 0 {
            debug!(
                "cluster {}: {disagree} of {} barcodes are listed under a different cluster",
                reads.label,
                reads.barcodes.len()
            );
        }
    }

    /// Process every cluster file in `cluster_dir` in name order, writing the
    /// three output streams into `out_dir`.
    pub fn map_from_cluster_files(&self, cluster_dir: &Path, out_dir: &Path) -> Result<RunSummary> {
        let paths = OutputPaths::for_cluster_dir(cluster_dir, out_dir)?;
        paths.ensure_absent()?;

        let cluster_files = list_cluster_files(cluster_dir)?;
        let total = cluster_files.len();
        info!("found {total} cluster files in {}", cluster_dir.display());

        let mut writers = OutputWriters::create(&paths)?;
        let policy = TerminalPolicy::from_params(&self.params);
        let mut summary = RunSummary::default();

        for (i, path) in cluster_files
            .iter()
            .enumerate()
            .take(self.params.max_cluster_files)
        {
            summary.visited += 1;

            let reads = match read_cluster_file(path, self.params.key_size, &policy) {
                Ok(reads) => reads,
                Err(err) => {
                    warn!("skipping {}: {err:#}", path.display());
                    summary.skipped += 1;
                    continue;
                }
            };

            let result = match self.process_cluster(&reads) {
                Ok(Some(result)) => result,
                Ok(None) => {
                    debug!(
                        "skipping cluster {}: {} N-terminal and {} C-terminal reads",
                        reads.label,
                        reads.n_term.len(),
                        reads.c_term.len()
                    );
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => {
                    warn!("skipping {}: {err:#}", path.display());
                    summary.skipped += 1;
                    continue;
                }
            };
            writers.write_cluster(&result)?;
            summary.written += 1;

            if i % self.params.flush_every == 0 {
                writers.flush()?;
                summary.flushes += 1;
                info!("{i} of {total}");
            }
        }
        if summary.visited < total {
            info!("stopped after {} of {total} cluster files", summary.visited);
        }

        writers.finish()?;
        info!(
            "wrote {} clusters, skipped {}; outputs: {}",
            summary.written,
            summary.skipped,
            paths.iter().map(Path::display).join(", ")
        );
        Ok(summary)
    }
}
