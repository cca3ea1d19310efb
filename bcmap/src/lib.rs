//! bcmap
// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//!
//! Collapse barcode clusters of paired N- and C-terminal reads into one
//! consensus sequence, protein and allele call per cluster.
// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

pub mod clusters;
pub mod consensus;
pub mod errors;
pub mod experiment;
pub mod mylog;
pub mod output;
pub mod reads;

pub use clusters::{ClusterId, ClusterMembership};
pub use consensus::{call_consensus, CallCutoffs, Consensus};
pub use errors::BcmapError;
pub use experiment::{Experiment, RunSummary};
