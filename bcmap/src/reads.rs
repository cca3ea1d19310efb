// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Reading one cluster's read file and splitting it into N- and C-terminal
//! read groups.

use crate::clusters::truncate_chars;
use crate::errors::BcmapError;
use anyhow::{Context, Result};
use bcmap_ref::phred_score;
use itertools::Itertools;
use parameters_toml::Parameters;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Field separator of a read record.
const FIELD_SEP: char = '|';
const MIN_FIELDS: usize = 4;

/// Which end of the construct a read was sequenced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminus {
    N,
    C,
}

/// Bases and numeric quality scores of one read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Read {
    pub bases: Vec<u8>,
    pub quals: Vec<u8>,
}

impl Read {
    fn truncate(&mut self, len: usize) {
        self.bases.truncate(len);
        self.quals.truncate(len);
    }
}

/// Reads of one terminus, kept as parallel base and quality lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadGroup {
    pub bases: Vec<Vec<u8>>,
    pub quals: Vec<Vec<u8>>,
}

impl ReadGroup {
    pub fn push(&mut self, read: Read) {
        self.bases.push(read.bases);
        self.quals.push(read.quals);
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Decides the terminus of a read from its sequence and trims N-terminal reads.
///
/// A read ending with the C-terminal marker is C-terminal, everything else is
/// N-terminal. N-terminal reads are cut to a maximum length and then lose any
/// number of trailing stop codons.
#[derive(Clone, Debug)]
pub struct TerminalPolicy {
    c_term_marker: Vec<u8>,
    n_term_max_len: usize,
    stop_codon: Vec<u8>,
}

impl Default for TerminalPolicy {
    fn default() -> Self {
        TerminalPolicy::from_params(&Parameters::default())
    }
}

impl TerminalPolicy {
    pub fn from_params(params: &Parameters) -> Self {
        TerminalPolicy {
            c_term_marker: params.c_term_marker.as_bytes().to_vec(),
            n_term_max_len: params.n_term_max_len,
            stop_codon: params.stop_codon.as_bytes().to_vec(),
        }
    }

    pub fn classify(&self, bases: &[u8]) -> Terminus {
        if bases.ends_with(&self.c_term_marker) {
            Terminus::C
        } else {
            Terminus::N
        }
    }

    /// Classify `read`, trimming it in place when it is N-terminal.
    pub fn assign(&self, read: &mut Read) -> Terminus {
        let terminus = self.classify(&read.bases);
        if terminus == Terminus::N {
            if read.bases.len() > self.n_term_max_len {
                read.truncate(self.n_term_max_len);
            }
            while !self.stop_codon.is_empty() && read.bases.ends_with(&self.stop_codon) {
                read.truncate(read.bases.len() - self.stop_codon.len());
            }
        }
        terminus
    }
}

/// Everything gathered from one cluster's read file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterReads {
    /// Cluster label taken from the file name.
    pub label: String,
    pub n_term: ReadGroup,
    pub c_term: ReadGroup,
    /// Distinct barcodes in order of first appearance.
    pub barcodes: Vec<String>,
}

impl ClusterReads {
    /// A consensus needs coverage from both ends.
    pub fn has_both_termini(&self) -> bool {
        !self.n_term.is_empty() && !self.c_term.is_empty()
    }
}

/// Cluster label of a read file: the text between the first `_` and the
/// following `_` or `.`, e.g. `cluster_17.txt` is cluster `17`.
pub fn cluster_label(file_name: &str) -> Result<String, BcmapError> {
    file_name
        .split('_')
        .nth(1)
        .and_then(|s| s.split('.').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BcmapError::BadClusterFileName {
            name: file_name.to_string(),
        })
}

/// Parse a `<barcode>|<ignored>|<bases>|<qualities>` record into the barcode
/// key and the read.
pub fn parse_read_record(
    record: &str,
    line: usize,
    key_size: usize,
) -> Result<(String, Read), BcmapError> {
    let fields = record.split(FIELD_SEP).collect_vec();
    if fields.len() < MIN_FIELDS {
        return Err(BcmapError::MalformedRead {
            line,
            reason: format!(
                "expected at least {MIN_FIELDS} '{FIELD_SEP}' separated fields, found {}",
                fields.len()
            ),
        });
    }
    let barcode = truncate_chars(fields[0], key_size).trim().to_string();
    let bases = fields[2].trim().as_bytes().to_vec();
    let quals: Vec<u8> = fields[3]
        .trim()
        .bytes()
        .map(|c| {
            phred_score(c).ok_or_else(|| BcmapError::MalformedRead {
                line,
                reason: format!("invalid quality character {:?}", c as char),
            })
        })
        .collect::<Result<_, _>>()?;
    if bases.len() != quals.len() {
        return Err(BcmapError::MalformedRead {
            line,
            reason: format!("{} bases but {} quality values", bases.len(), quals.len()),
        });
    }
    Ok((barcode, Read { bases, quals }))
}

/// Read and split the records of one cluster read file.
pub fn read_cluster_file(
    path: &Path,
    key_size: usize,
    policy: &TerminalPolicy,
) -> Result<ClusterReads> {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let label = cluster_label(&file_name)?;
    let file = File::open(path).with_context(|| path.display().to_string())?;
    aggregate_reads(BufReader::new(file), label, key_size, policy)
        .with_context(|| path.display().to_string())
}

/// Split the records in `reader` into read groups using `policy`.
pub fn aggregate_reads(
    reader: impl BufRead,
    label: String,
    key_size: usize,
    policy: &TerminalPolicy,
) -> Result<ClusterReads> {
    let mut n_term = ReadGroup::default();
    let mut c_term = ReadGroup::default();
    let mut barcodes = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (barcode, mut read) = parse_read_record(&line, i + 1, key_size)?;
        match policy.assign(&mut read) {
            Terminus::N => n_term.push(read),
            Terminus::C => c_term.push(read),
        }
        barcodes.push(barcode);
    }

    Ok(ClusterReads {
        label,
        n_term,
        c_term,
        barcodes: barcodes.into_iter().unique().collect(),
    })
}
