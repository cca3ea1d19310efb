// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
use itertools::Itertools;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BcmapError {
    #[error(
        "output file(s) exist: {}. Remove them or choose a different output directory.",
        .paths.iter().map(|p| format!("{:?}", p)).join(", ")
    )]
    OutputExists { paths: Vec<PathBuf> },

    #[error("malformed line {line} in cluster membership file {path:?}: {reason}")]
    MalformedMembership {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("malformed read record on line {line}: {reason}")]
    MalformedRead { line: usize, reason: String },

    #[error("cannot derive a cluster label from file name '{name}', expected e.g. 'cluster_17.txt'")]
    BadClusterFileName { name: String },

    #[error("cannot derive output file names from cluster directory {dir:?}")]
    BadClusterDir { dir: PathBuf },
}
