//! bcmap_ref
// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//!
//! The reference construct and everything the consensus caller needs from it:
//! per-position base probabilities for a group of reads, translation, allele
//! naming and display sequences for probability profiles.
#![deny(missing_docs)]

pub mod alphabet;
pub mod profile;
pub mod reference;

pub use alphabet::{base_index, phred_score, BaseProbs, BASES, NUM_BASES};
pub use profile::ProbMatrix;
pub use reference::Reference;

/// Source of base-probability profiles and sequence annotation for a
/// reference construct.
pub trait ProfileProvider {
    /// Compute a position-by-base probability matrix for a group of reads.
    /// `bases` and `quals` are parallel lists; qualities are numeric Phred
    /// scores. With `align_three_prime` the reads are registered against the
    /// 3' end of the reference, otherwise against the 5' end.
    fn calc_base_prob(
        &self,
        bases: &[Vec<u8>],
        quals: &[Vec<u8>],
        align_three_prime: bool,
    ) -> ProbMatrix;

    /// Translate a called DNA sequence into amino acids.
    fn translate(&self, consensus: &[u8]) -> String;

    /// Name the allele carried by a called DNA sequence.
    fn get_allele(&self, consensus: &[u8]) -> String;

    /// Render a probability matrix as a human readable sequence.
    fn prob_to_seq(&self, probs: &ProbMatrix) -> String {
        probs.to_display_seq()
    }
}
