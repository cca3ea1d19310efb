//! amino
// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

/// Amino acid emitted for a codon that is not fully called.
pub const UNKNOWN_AA: u8 = b'X';

/// Amino acid emitted for a codon made entirely of gaps.
pub const GAP_AA: u8 = b'-';

/// Convert a codon to an amino acid.
///
/// Codons that contain anything other than upper case `ACGT` (for example the
/// `N` and `X` symbols of a consensus call) map to [`UNKNOWN_AA`].
pub fn codon_to_aa(codon: &[u8]) -> u8 {
    assert!(codon.len() == 3);

    match codon {
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => b'G',
        b"TGG" => b'W',
        b"TGT" | b"TGC" => b'C',
        b"TTT" | b"TTC" => b'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => b'L',
        b"ATT" | b"ATC" | b"ATA" => b'I',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => b'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => b'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => b'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => b'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => b'A',
        b"TAT" | b"TAC" => b'Y',
        b"CAT" | b"CAC" => b'H',
        b"CAA" | b"CAG" => b'Q',
        b"AAT" | b"AAC" => b'N',
        b"AAA" | b"AAG" => b'K',
        b"GAT" | b"GAC" => b'D',
        b"GAA" | b"GAG" => b'E',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => b'R',
        b"ATG" => b'M',
        b"TAG" | b"TAA" | b"TGA" => b'*',
        _ => UNKNOWN_AA,
    }
}

/// Convert a given DNA sequence to amino acids, starting at a given position.
/// A trailing partial codon is dropped.
pub fn nucleotide_to_aminoacid_sequence(dna_seq: &[u8], start: usize) -> Vec<u8> {
    let mut a = Vec::<u8>::new();
    if dna_seq.len() >= 3 {
        for pos in (start..dna_seq.len() - 3 + 1).step_by(3) {
            let codon = &dna_seq[pos..pos + 3];
            if codon == b"---" {
                a.push(GAP_AA);
            } else {
                a.push(codon_to_aa(codon));
            }
        }
    }
    a
}
