//!
//! Tunable parameters of a bcmap run, read from an optional TOML file.
//!
// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

use anyhow::{ensure, Context, Result};
use log::warn;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// A terminal profile has signal at a position when its most probable
    /// base exceeds this value.
    pub signal_cutoff: f64,
    /// A base is called when its averaged probability reaches this value.
    pub call_cutoff: f64,
    /// Number of leading characters of a barcode token that form the key.
    pub key_size: usize,
    /// Reads ending with this sequence are C-terminal reads.
    pub c_term_marker: Cow<'static, str>,
    /// N-terminal reads are truncated to this many bases.
    pub n_term_max_len: usize,
    /// Stop codon stripped repeatedly from the end of N-terminal reads.
    pub stop_codon: Cow<'static, str>,
    /// Output streams are flushed after the cluster file whose index is a
    /// multiple of this value.
    pub flush_every: usize,
    /// Maximum number of cluster files visited in one run.
    pub max_cluster_files: usize,
}

pub const DEFAULT_PARAMETERS: Parameters = Parameters {
    signal_cutoff: 0.3,
    call_cutoff: 0.8,
    key_size: 25,
    c_term_marker: Cow::Borrowed("GCCTAATAA"),
    n_term_max_len: 346,
    stop_codon: Cow::Borrowed("TAA"),
    flush_every: 1000,
    max_cluster_files: 10_001,
};

impl Default for Parameters {
    fn default() -> Self {
        DEFAULT_PARAMETERS
    }
}

macro_rules! warn_non_default {
    ($p:expr, $($a:ident),+ $(,)?) => {
        $(
            if DEFAULT_PARAMETERS.$a != $p.$a {
                warn!("using non-default {} = {:?}", stringify!($a), $p.$a);
            }
        )+
    };
}

impl Parameters {
    /// Load parameters from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Parameters> {
        let params = match path {
            Some(path) => {
                let s = std::fs::read_to_string(path)
                    .with_context(|| path.display().to_string())?;
                Parameters::from_toml_str(&s).with_context(|| path.display().to_string())?
            }
            None => DEFAULT_PARAMETERS,
        };
        params.report_non_default();
        Ok(params)
    }

    /// Parse and validate a TOML document. Keys that are absent keep their default.
    pub fn from_toml_str(s: &str) -> Result<Parameters> {
        let params: Parameters = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.signal_cutoff),
            "signal_cutoff must lie in [0, 1], got {}",
            self.signal_cutoff
        );
        ensure!(
            self.call_cutoff > 0.0 && self.call_cutoff <= 1.0,
            "call_cutoff must lie in (0, 1], got {}",
            self.call_cutoff
        );
        ensure!(self.key_size > 0, "key_size must be positive");
        ensure!(self.flush_every > 0, "flush_every must be positive");
        ensure!(
            self.stop_codon.len() == 3,
            "stop_codon must be a single codon, got '{}'",
            self.stop_codon
        );
        ensure!(!self.c_term_marker.is_empty(), "c_term_marker must not be empty");
        Ok(())
    }

    pub fn report_non_default(&self) {
        warn_non_default!(
            self,
            signal_cutoff,
            call_cutoff,
            key_size,
            c_term_marker,
            n_term_max_len,
            stop_codon,
            flush_every,
            max_cluster_files,
        );
    }
}
