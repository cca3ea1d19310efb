// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.
//! Barcode to cluster assignments.

use crate::errors::BcmapError;
use anyhow::{Context, Result};
use log::info;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Cluster id marking a barcode that was not placed in any cluster.
pub const UNASSIGNED: i64 = -1;

/// Cluster identifier. Ids read from the membership table are kept as is;
/// unassigned barcodes receive synthesized, strictly negative ids.
pub type ClusterId = i64;

/// The first `n` characters of `s`.
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Hands out a fresh negative id for every unassigned barcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingletonIds {
    next: ClusterId,
}

impl Default for SingletonIds {
    fn default() -> Self {
        SingletonIds { next: UNASSIGNED }
    }
}

impl SingletonIds {
    pub fn next_id(&mut self) -> ClusterId {
        let id = self.next;
        self.next -= 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> usize {
        (UNASSIGNED - self.next) as usize
    }
}

/// Forward and inverse cluster membership maps.
#[derive(Clone, Debug, Default)]
pub struct ClusterMembership {
    by_barcode: HashMap<String, ClusterId>,
    by_cluster: HashMap<ClusterId, Vec<String>>,
    singletons: SingletonIds,
}

impl ClusterMembership {
    /// Load a whitespace separated `<cluster> <barcode> ...` table. Barcodes are
    /// trimmed and cut to `key_size` characters. A later line for the same
    /// barcode replaces the earlier assignment in the forward map, while the
    /// inverse map keeps every occurrence in file order.
    pub fn load(path: &Path, key_size: usize) -> Result<ClusterMembership> {
        let file = File::open(path).with_context(|| path.display().to_string())?;
        let membership = Self::from_reader(BufReader::new(file), key_size, path)?;
        info!(
            "loaded {} barcodes in {} clusters ({} unassigned) from {}",
            membership.num_barcodes(),
            membership.num_clusters(),
            membership.singletons.issued(),
            path.display()
        );
        Ok(membership)
    }

    /// Parse a membership table from `reader`; `path` is only used for errors.
    /// Blank lines are skipped. Negative cluster ids other than
    /// [`UNASSIGNED`] are rejected so they cannot collide with singletons.
    pub fn from_reader(
        reader: impl BufRead,
        key_size: usize,
        path: &Path,
    ) -> Result<ClusterMembership> {
        let malformed = |line: usize, reason: String| BcmapError::MalformedMembership {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut membership = ClusterMembership::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line.with_context(|| path.display().to_string())?;
            let mut fields = line.split_whitespace();
            let Some(cluster_token) = fields.next() else {
                continue;
            };
            let Some(barcode_token) = fields.next() else {
                return Err(malformed(i + 1, "expected a cluster and a barcode".into()).into());
            };
            let cluster: ClusterId = cluster_token.parse().map_err(|_| {
                malformed(
                    i + 1,
                    format!("cluster '{cluster_token}' is not an integer"),
                )
            })?;
            if cluster < 0 && cluster != UNASSIGNED {
                return Err(malformed(
                    i + 1,
                    format!("cluster {cluster} is negative; only {UNASSIGNED} marks unassigned"),
                )
                .into());
            }
            membership.insert(cluster, truncate_chars(barcode_token.trim(), key_size));
        }
        Ok(membership)
    }

    fn insert(&mut self, cluster: ClusterId, barcode: &str) {
        let cluster = if cluster == UNASSIGNED {
            self.singletons.next_id()
        } else {
            cluster
        };
        self.by_barcode.insert(barcode.to_string(), cluster);
        self.by_cluster
            .entry(cluster)
            .or_default()
            .push(barcode.to_string());
    }

    /// Cluster of `barcode`, if it was listed.
    pub fn cluster_of(&self, barcode: &str) -> Option<ClusterId> {
        self.by_barcode.get(barcode).copied()
    }

    /// Every barcode listed for `cluster`, duplicates included, in file order.
    pub fn barcodes_of(&self, cluster: ClusterId) -> &[String] {
        self.by_cluster.get(&cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_barcodes(&self) -> usize {
        self.by_barcode.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.by_cluster.len()
    }

    /// Counter state after loading; the next id it would synthesize.
    pub fn singleton_ids(&self) -> SingletonIds {
        self.singletons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Cursor;
    use std::io::Write;

    fn parse(text: &str, key_size: usize) -> Result<ClusterMembership> {
        ClusterMembership::from_reader(Cursor::new(text), key_size, Path::new("test.txt"))
    }

    #[test]
    fn test_last_write_wins() -> Result<()> {
        let m = parse("3 AAAA\n5 CCCC extra fields\n7 AAAA\n", 25)?;
        assert_eq!(m.cluster_of("AAAA"), Some(7));
        assert_eq!(m.cluster_of("CCCC"), Some(5));
        assert_eq!(m.barcodes_of(3), ["AAAA"]);
        assert_eq!(m.barcodes_of(7), ["AAAA"]);
        assert_eq!(m.num_barcodes(), 2);
        Ok(())
    }

    #[test]
    fn test_inverse_keeps_duplicates_in_order() -> Result<()> {
        let m = parse("1 GGGG\n1 TTTT\n1 GGGG\n", 25)?;
        assert_eq!(m.barcodes_of(1), ["GGGG", "TTTT", "GGGG"]);
        assert!(m.barcodes_of(2).is_empty());
        Ok(())
    }

    #[test]
    fn test_unassigned_become_singletons() -> Result<()> {
        let m = parse("-1 AAAA\n4 CCCC\n-1 GGGG\n-1 TTTT\n", 25)?;
        assert_eq!(m.cluster_of("AAAA"), Some(-1));
        assert_eq!(m.cluster_of("GGGG"), Some(-2));
        assert_eq!(m.cluster_of("TTTT"), Some(-3));
        assert_eq!(m.barcodes_of(-2), ["GGGG"]);
        assert_eq!(m.singleton_ids().issued(), 3);
        assert_eq!(m.singleton_ids().next_id(), -4);
        Ok(())
    }

    #[test]
    fn test_key_size() -> Result<()> {
        let m = parse("0   ACGTACGT\t\n", 4)?;
        assert_eq!(m.cluster_of("ACGT"), Some(0));
        assert_eq!(m.cluster_of("ACGTACGT"), None);
        Ok(())
    }

    #[test]
    fn test_blank_lines_are_ignored() -> Result<()> {
        let m = parse("\n2 AAAA\n   \n", 25)?;
        assert_eq!(m.num_barcodes(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_lines_are_fatal() {
        let err = parse("1 AAAA\nx CCCC\n", 25).unwrap_err();
        match err.downcast_ref::<BcmapError>() {
            Some(BcmapError::MalformedMembership { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse("1\n", 25).is_err());
        assert!(parse("1.5 AAAA\n", 25).is_err());
    }

    #[test]
    fn test_negative_ids_cannot_collide_with_singletons() {
        let err = parse("-2 AAAA\n-1 CCCC\n-1 GGGG\n", 25).unwrap_err();
        match err.downcast_ref::<BcmapError>() {
            Some(BcmapError::MalformedMembership { line, .. }) => assert_eq!(*line, 1),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse("1 AAAA\n-7 CCCC\n", 25).is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "9 ACGTACGT\n-1 TTTTTTTT")?;
        let m = ClusterMembership::load(file.path(), 6)?;
        assert_eq!(m.cluster_of("ACGTAC"), Some(9));
        assert_eq!(m.cluster_of("TTTTTT"), Some(-1));
        Ok(())
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("ACGT", 2), "AC");
        assert_eq!(truncate_chars("ACGT", 10), "ACGT");
        assert_eq!(truncate_chars("", 3), "");
    }

    proptest! {
        #[test]
        fn prop_membership_laws(
            rows in proptest::collection::vec((-1i64..4, "[AC]{2}"), 0..40),
        ) {
            let text: String = rows.iter().map(|(c, b)| format!("{c} {b}\n")).collect();
            let m = parse(&text, 25).unwrap();

            let mut expected_next = UNASSIGNED;
            let mut last = HashMap::new();
            for (c, b) in &rows {
                let id = if *c == UNASSIGNED {
                    let id = expected_next;
                    expected_next -= 1;
                    id
                } else {
                    *c
                };
                last.insert(b.clone(), id);
            }
            for (b, id) in &last {
                prop_assert_eq!(m.cluster_of(b), Some(*id));
            }
            let synthesized: Vec<_> = (expected_next + 1..=UNASSIGNED).rev().collect();
            for id in synthesized {
                prop_assert_eq!(m.barcodes_of(id).len(), 1);
            }
            let total: usize = rows.len();
            let listed: usize = (-(rows.len() as i64) - 1..4).map(|c| m.barcodes_of(c).len()).sum();
            prop_assert_eq!(total, listed);
        }

        #[test]
        fn prop_stray_negative_id_is_rejected(
            rows in proptest::collection::vec((-1i64..4, "[AC]{2}"), 0..20),
            stray in -1000i64..-1,
            at in 0usize..20,
        ) {
            let mut lines: Vec<String> = rows.iter().map(|(c, b)| format!("{c} {b}")).collect();
            let at = at.min(lines.len());
            lines.insert(at, format!("{stray} GGGG"));
            let err = parse(&(lines.join("\n") + "\n"), 25).unwrap_err();
            match err.downcast_ref::<BcmapError>() {
                Some(BcmapError::MalformedMembership { line, .. }) => {
                    prop_assert_eq!(*line, at + 1);
                }
                other => {
                    prop_assert!(false, "unexpected error {:?}", other);
                }
            }
        }
    }
}
