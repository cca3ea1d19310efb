// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Position-indexed base probability profiles.

use crate::alphabet::{base_index, BaseProbs, BASES, NUM_BASES};
use std::ops::Index;

/// Probability assigned to every base at a position that no read covers.
pub const BACKGROUND_PROB: f64 = 1.0 / NUM_BASES as f64;

/// Highest error probability a single base is trusted with; a Phred score of
/// zero means the base carries no information.
const MAX_ERROR_PROB: f64 = 0.75;

const DISPLAY_CALL_PROB: f64 = 0.8;
const DISPLAY_SIGNAL_PROB: f64 = 0.3;

/// A probability distribution over `BASES` for every reference position.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbMatrix {
    rows: Vec<BaseProbs>,
}

impl ProbMatrix {
    /// Wrap precomputed rows.
    pub fn new(rows: Vec<BaseProbs>) -> Self {
        ProbMatrix { rows }
    }

    /// A matrix of `len` positions without any read support.
    pub fn background(len: usize) -> Self {
        ProbMatrix {
            rows: vec![[BACKGROUND_PROB; NUM_BASES]; len],
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the matrix has no positions.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the per-position distributions.
    pub fn iter(&self) -> impl Iterator<Item = &BaseProbs> + '_ {
        self.rows.iter()
    }

    /// Accumulate quality-weighted base observations of `bases`/`quals` into a
    /// profile `ref_len` positions long.
    ///
    /// Reads are placed without gaps: starting at position 0, or with
    /// `align_three_prime` ending at the last reference position. Bases that
    /// fall outside the reference or are not one of `BASES` are ignored.
    pub fn from_reads(
        ref_len: usize,
        bases: &[Vec<u8>],
        quals: &[Vec<u8>],
        align_three_prime: bool,
    ) -> Self {
        let mut sums = vec![[0.0; NUM_BASES]; ref_len];
        let mut depth = vec![0usize; ref_len];

        for (seq, qual) in bases.iter().zip(quals) {
            let offset = if align_three_prime {
                ref_len as isize - seq.len() as isize
            } else {
                0
            };
            for (i, (&b, &q)) in seq.iter().zip(qual).enumerate() {
                let pos = offset + i as isize;
                if pos < 0 || pos >= ref_len as isize {
                    continue;
                }
                let Some(bi) = base_index(b) else {
                    continue;
                };
                let pos = pos as usize;
                let err = phred_to_error(q);
                for (j, p) in sums[pos].iter_mut().enumerate() {
                    *p += if j == bi {
                        1.0 - err
                    } else {
                        err / (NUM_BASES - 1) as f64
                    };
                }
                depth[pos] += 1;
            }
        }

        let rows = sums
            .into_iter()
            .zip(depth)
            .map(|(sum, n)| {
                if n == 0 {
                    [BACKGROUND_PROB; NUM_BASES]
                } else {
                    sum.map(|p| p / n as f64)
                }
            })
            .collect();
        ProbMatrix { rows }
    }

    /// Most probable base per position: upper case when confidently called,
    /// lower case when there is signal, `-` otherwise.
    pub fn to_display_seq(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                let (i, p) = argmax(row);
                if p >= DISPLAY_CALL_PROB {
                    BASES[i] as char
                } else if p > DISPLAY_SIGNAL_PROB {
                    BASES[i].to_ascii_lowercase() as char
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl Index<usize> for ProbMatrix {
    type Output = BaseProbs;

    fn index(&self, i: usize) -> &BaseProbs {
        &self.rows[i]
    }
}

/// Index and value of the largest entry; the first one wins ties.
pub fn argmax(row: &BaseProbs) -> (usize, f64) {
    let mut best = (0, row[0]);
    for (i, &p) in row.iter().enumerate().skip(1) {
        if p > best.1 {
            best = (i, p);
        }
    }
    best
}

fn phred_to_error(q: u8) -> f64 {
    10f64.powf(-f64::from(q) / 10.0).min(MAX_ERROR_PROB)
}
