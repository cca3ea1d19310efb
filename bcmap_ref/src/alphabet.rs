// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Base alphabet and quality encoding.

/// Number of called bases.
pub const NUM_BASES: usize = 4;

/// Index to symbol table for a probability vector.
pub const BASES: [u8; NUM_BASES] = *b"ACGT";

/// Probability of each of `BASES` at one position.
pub type BaseProbs = [f64; NUM_BASES];

const PHRED_OFFSET: u8 = 33;
const NO_QUAL: u8 = u8::MAX;

const PHRED: [u8; 256] = make_phred_map();

const fn make_phred_map() -> [u8; 256] {
    let mut table = [NO_QUAL; 256];
    let mut c = PHRED_OFFSET as usize;
    while c <= b'~' as usize {
        table[c] = (c - PHRED_OFFSET as usize) as u8;
        c += 1;
    }
    table
}

/// Numeric Phred score of a Phred+33 quality character, `None` for
/// characters outside `!`..=`~`.
pub const fn phred_score(c: u8) -> Option<u8> {
    match PHRED[c as usize] {
        NO_QUAL => None,
        q => Some(q),
    }
}

/// Index of an upper case base in `BASES`.
pub const fn base_index(b: u8) -> Option<usize> {
    match b {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}
