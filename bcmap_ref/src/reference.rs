// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! The reference construct and its annotation of called sequences.

use crate::alphabet::base_index;
use crate::profile::ProbMatrix;
use crate::ProfileProvider;
use amino::{codon_to_aa, nucleotide_to_aminoacid_sequence};
use anyhow::{bail, Context, Result};
use bio::io::fasta;
use itertools::Itertools;
use log::info;
use std::path::Path;

/// Allele label of a sequence without coding changes.
pub const WILD_TYPE: &str = "wt";

/// Separator between the substitutions of an allele label.
const ALLELE_SEP: &str = "/";

/// The reference construct that reads are profiled against.
#[derive(Clone, Debug)]
pub struct Reference {
    name: String,
    seq: Vec<u8>,
}

impl Reference {
    /// Build a reference from a name and a DNA sequence (upper-cased).
    pub fn new(name: impl Into<String>, seq: &[u8]) -> Self {
        Reference {
            name: name.into(),
            seq: seq.to_ascii_uppercase(),
        }
    }

    /// Load the first record of a FASTA file.
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let reader = fasta::Reader::from_file(path)
            .with_context(|| format!("opening reference {}", path.display()))?;
        let Some(record) = reader.records().next() else {
            bail!("reference file {} contains no FASTA record", path.display());
        };
        let record = record.with_context(|| format!("reading reference {}", path.display()))?;
        if record.seq().is_empty() {
            bail!(
                "reference '{}' in {} has an empty sequence",
                record.id(),
                path.display()
            );
        }
        let reference = Reference::new(record.id(), record.seq());
        info!(
            "loaded reference '{}' ({} bp) from {}",
            reference.name,
            reference.len(),
            path.display()
        );
        Ok(reference)
    }

    /// Reference name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference sequence.
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    /// Reference length, which is also the length of every profile.
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// True for an empty reference.
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

impl ProfileProvider for Reference {
    fn calc_base_prob(
        &self,
        bases: &[Vec<u8>],
        quals: &[Vec<u8>],
        align_three_prime: bool,
    ) -> ProbMatrix {
        ProbMatrix::from_reads(self.len(), bases, quals, align_three_prime)
    }

    fn translate(&self, consensus: &[u8]) -> String {
        nucleotide_to_aminoacid_sequence(consensus, 0)
            .into_iter()
            .map(char::from)
            .collect()
    }

    /// Coding substitutions of `consensus` relative to the reference, as
    /// `<ref aa><codon number><alt aa>` joined by `/`. Codons that are not
    /// fully called are ignored.
    fn get_allele(&self, consensus: &[u8]) -> String {
        let label = consensus
            .chunks_exact(3)
            .zip(self.seq.chunks_exact(3))
            .enumerate()
            .filter(|(_, (alt, _))| alt.iter().all(|&b| base_index(b).is_some()))
            .filter_map(|(i, (alt, wt))| {
                let (alt_aa, wt_aa) = (codon_to_aa(alt), codon_to_aa(wt));
                (alt_aa != wt_aa).then(|| format!("{}{}{}", wt_aa as char, i + 1, alt_aa as char))
            })
            .join(ALLELE_SEP);
        if label.is_empty() {
            WILD_TYPE.to_string()
        } else {
            label
        }
    }
}
