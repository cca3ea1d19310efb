// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Merging the N- and C-terminal base probability profiles of a cluster into
//! one called sequence.
//!
//! At every position each profile either has signal (its most probable base
//! exceeds the signal cutoff) or not. Profiles with signal are averaged; if
//! only one side has signal it is used alone, and if neither does the two are
//! averaged anyway. A base is called when it is the only one whose averaged
//! probability reaches the call cutoff. Otherwise the position is `N` (no
//! confident data) or `X` (confident but conflicting data), and every `X`
//! counts as a mismatch.

use anyhow::{ensure, Result};
use bcmap_ref::{BaseProbs, ProbMatrix, BASES, NUM_BASES};
use parameters_toml::Parameters;

/// Symbol of a position without confident data.
pub const NO_CALL: u8 = b'N';
/// Symbol of a position with conflicting confident data.
pub const MISMATCH: u8 = b'X';

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CallCutoffs {
    pub signal: f64,
    pub call: f64,
}

impl Default for CallCutoffs {
    fn default() -> Self {
        CallCutoffs::from_params(&Parameters::default())
    }
}

impl CallCutoffs {
    pub fn from_params(params: &Parameters) -> Self {
        CallCutoffs {
            signal: params.signal_cutoff,
            call: params.call_cutoff,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    /// Index into `BASES`.
    Base(usize),
    NoCall,
    Mismatch,
}

impl Call {
    pub fn symbol(self) -> u8 {
        match self {
            Call::Base(i) => BASES[i],
            Call::NoCall => NO_CALL,
            Call::Mismatch => MISMATCH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsensusCall {
    pub call: Call,
    /// Averaged probability of the called base, or the largest averaged
    /// probability when no base was called.
    pub support: f64,
}

impl ConsensusCall {
    pub fn is_mismatch(&self) -> bool {
        self.call == Call::Mismatch
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Consensus {
    pub calls: Vec<ConsensusCall>,
    pub num_mismatch: usize,
}

impl Consensus {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn seq(&self) -> Vec<u8> {
        self.calls.iter().map(|c| c.call.symbol()).collect()
    }

    pub fn support(&self) -> Vec<f64> {
        self.calls.iter().map(|c| c.support).collect()
    }

    /// One digit per position, see [`support_digit`].
    pub fn support_string(&self) -> String {
        self.calls.iter().map(|c| support_digit(c.support)).collect()
    }
}

/// Render a support value as a single digit: rounded to one decimal place and
/// written as its tenths digit, with a perfect 1.0 shown as `9`.
pub fn support_digit(support: f64) -> char {
    let rounded = format!("{support:.1}");
    if rounded == "1.0" {
        return '9';
    }
    rounded.chars().last().unwrap_or('0')
}

fn max_prob(p: &BaseProbs) -> f64 {
    p.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn mean(a: &BaseProbs, b: &BaseProbs) -> BaseProbs {
    std::array::from_fn(|i| (a[i] + b[i]) / 2.0)
}

/// Call a single position from its N- and C-terminal distributions.
pub fn call_position(n: &BaseProbs, c: &BaseProbs, cutoffs: CallCutoffs) -> ConsensusCall {
    let n_max = max_prob(n);
    let c_max = max_prob(c);

    let average = match (n_max > cutoffs.signal, c_max > cutoffs.signal) {
        (true, false) => *n,
        (false, true) => *c,
        // With no signal on either side the average still gives a usable
        // estimate for the position.
        (true, true) | (false, false) => mean(n, c),
    };

    let mut above = (0..NUM_BASES).filter(|&i| average[i] >= cutoffs.call);
    let call = match (above.next(), above.next()) {
        (Some(i), None) => Call::Base(i),
        (None, _) if n_max > cutoffs.call && c_max > cutoffs.call => Call::Mismatch,
        (None, _) => Call::NoCall,
        (Some(_), Some(_)) => Call::Mismatch,
    };
    let support = match call {
        Call::Base(i) => average[i],
        Call::NoCall | Call::Mismatch => max_prob(&average),
    };
    ConsensusCall { call, support }
}

/// Call every position of two equally long profiles.
pub fn call_consensus(
    n_probs: &ProbMatrix,
    c_probs: &ProbMatrix,
    cutoffs: CallCutoffs,
) -> Result<Consensus> {
    ensure!(
        n_probs.len() == c_probs.len(),
        "N-terminal profile has {} positions but C-terminal profile has {}",
        n_probs.len(),
        c_probs.len()
    );

    let calls: Vec<_> = n_probs
        .iter()
        .zip(c_probs.iter())
        .map(|(n, c)| call_position(n, c, cutoffs))
        .collect();
    let num_mismatch = calls.iter().filter(|c| c.is_mismatch()).count();
    Ok(Consensus {
        calls,
        num_mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const CUTOFFS: CallCutoffs = CallCutoffs {
        signal: 0.3,
        call: 0.8,
    };
    const BLANK: BaseProbs = [0.28, 0.24, 0.24, 0.24];

    fn one_hot(i: usize, p: f64) -> BaseProbs {
        let mut v = [(1.0 - p) / 3.0; 4];
        v[i] = p;
        v
    }

    #[test]
    fn test_agreeing_sides() {
        let call = call_position(&one_hot(2, 0.9), &one_hot(2, 0.96), CUTOFFS);
        assert_eq!(call.call, Call::Base(2));
        assert!((call.support - 0.93).abs() < 1e-12);
        assert_eq!(call.call.symbol(), b'G');
    }

    #[test]
    fn test_one_sided_signal_is_used_alone() {
        let call = call_position(&one_hot(0, 0.85), &BLANK, CUTOFFS);
        assert_eq!(call, ConsensusCall { call: Call::Base(0), support: 0.85 });

        let call = call_position(&BLANK, &one_hot(3, 0.99), CUTOFFS);
        assert_eq!(call, ConsensusCall { call: Call::Base(3), support: 0.99 });
    }

    #[test]
    fn test_weak_agreement_is_no_call() {
        // both sides have signal, but the average stays below the call cutoff
        let call = call_position(&one_hot(1, 0.7), &one_hot(1, 0.75), CUTOFFS);
        assert_eq!(call.call, Call::NoCall);
        assert!((call.support - 0.725).abs() < 1e-12);
    }

    #[test]
    fn test_confident_conflict_is_mismatch() {
        let n = one_hot(0, 0.95);
        let c = one_hot(1, 0.9);
        let call = call_position(&n, &c, CUTOFFS);
        assert_eq!(call.call, Call::Mismatch);
        assert!((call.support - max_prob(&mean(&n, &c))).abs() < 1e-12);

        let consensus =
            call_consensus(&ProbMatrix::new(vec![n]), &ProbMatrix::new(vec![c]), CUTOFFS).unwrap();
        assert_eq!(consensus.num_mismatch, 1);
        assert_eq!(consensus.seq(), b"X");
    }

    #[test]
    fn test_conflict_needs_both_sides_strictly_above_cutoff() {
        let call = call_position(&one_hot(0, 0.8), &one_hot(1, 0.95), CUTOFFS);
        assert_eq!(call.call, Call::NoCall);
    }

    #[test]
    fn test_no_signal_is_no_call() {
        let n = [0.3, 0.3, 0.2, 0.2];
        let c = [0.1, 0.3, 0.3, 0.3];
        let call = call_position(&n, &c, CUTOFFS);
        assert_eq!(call.call, Call::NoCall);
        assert!((call.support - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_no_signal_sides_are_averaged() {
        // With a low call cutoff the averaged no-signal vector can still call.
        let cutoffs = CallCutoffs {
            signal: 0.5,
            call: 0.4,
        };
        let call = call_position(&[0.5, 0.5, 0.0, 0.0], &[0.4, 0.2, 0.2, 0.2], cutoffs);
        assert_eq!(call.call, Call::Base(0));
        assert!((call.support - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_several_bases_above_low_cutoff_is_mismatch() {
        let cutoffs = CallCutoffs {
            signal: 0.3,
            call: 0.4,
        };
        let p = [0.45, 0.45, 0.05, 0.05];
        let call = call_position(&p, &p, cutoffs);
        assert_eq!(call.call, Call::Mismatch);
        assert!((call.support - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_call_consensus_counts_and_lengths() {
        let n = ProbMatrix::new(vec![one_hot(0, 0.99), BLANK, one_hot(2, 0.9), one_hot(3, 0.9)]);
        let c = ProbMatrix::new(vec![one_hot(0, 0.97), BLANK, one_hot(1, 0.9), one_hot(0, 0.9)]);
        let consensus = call_consensus(&n, &c, CUTOFFS).unwrap();
        assert_eq!(consensus.len(), 4);
        assert_eq!(consensus.seq(), b"ANXX");
        assert_eq!(consensus.num_mismatch, 2);
        assert_eq!(consensus.support_string(), "9355");
    }

    #[test]
    fn test_call_consensus_length_mismatch() {
        let n = ProbMatrix::background(3);
        let c = ProbMatrix::background(4);
        assert!(call_consensus(&n, &c, CUTOFFS).is_err());
    }

    #[test]
    fn test_support_digit() {
        assert_eq!(support_digit(1.0), '9');
        assert_eq!(support_digit(0.96), '9');
        assert_eq!(support_digit(0.83), '8');
        assert_eq!(support_digit(0.24), '2');
        assert_eq!(support_digit(0.4667), '5');
        assert_eq!(support_digit(0.04), '0');
    }

    fn probs() -> impl Strategy<Value = BaseProbs> {
        proptest::array::uniform4(0.0f64..1.0).prop_map(|v| {
            let total: f64 = v.iter().sum::<f64>().max(1e-9);
            v.map(|p| p / total)
        })
    }

    proptest! {
        #[test]
        fn prop_call_is_deterministic(
            rows in proptest::collection::vec((probs(), probs()), 0..30),
        ) {
            let n = ProbMatrix::new(rows.iter().map(|r| r.0).collect());
            let c = ProbMatrix::new(rows.iter().map(|r| r.1).collect());
            let first = call_consensus(&n, &c, CUTOFFS).unwrap();
            let second = call_consensus(&n, &c, CUTOFFS).unwrap();
            prop_assert_eq!(first.len(), rows.len());
            prop_assert_eq!(
                first.num_mismatch,
                first.seq().iter().filter(|&&b| b == MISMATCH).count()
            );
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_single_qualifier_is_called(
            base in 0usize..4,
            p in 0.8f64..=1.0,
            q in 0.8f64..=1.0,
        ) {
            let call = call_position(&one_hot(base, p), &one_hot(base, q), CUTOFFS);
            prop_assert_eq!(call.call, Call::Base(base));
            prop_assert!((call.support - (p + q) / 2.0).abs() < 1e-12);
        }

        #[test]
        fn prop_conflict_is_mismatch(
            a in 0usize..4,
            shift in 1usize..4,
            p in 0.81f64..=1.0,
            q in 0.81f64..=1.0,
        ) {
            let b = (a + shift) % 4;
            let call = call_position(&one_hot(a, p), &one_hot(b, q), CUTOFFS);
            prop_assert_eq!(call.call, Call::Mismatch);
        }

        #[test]
        fn prop_no_signal_is_never_mismatch(
            n in proptest::array::uniform4(0.0f64..=0.3),
            c in proptest::array::uniform4(0.0f64..=0.3),
        ) {
            prop_assert_eq!(call_position(&n, &c, CUTOFFS).call, Call::NoCall);
        }
    }
}
