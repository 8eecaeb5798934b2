use anyhow::{anyhow, Context};
use log::{info, warn};
use std::{collections::BTreeMap, path::Path};

use crate::{
    io::{read_tsv, COMMA},
    output::write_table,
    types::{ContigCoverage, MagId, RelativeAbundance},
};

/// Bin label CheckM gives to contigs that no binner claimed.
pub const UNBINNED: &str = "unbinned";

#[derive(Debug, Clone, PartialEq)]
pub struct MagCoverage {
    pub mag: MagId,
    pub avg_read_cov: f64,
    pub avg_mag_ra: f64,
}

/// Length-weighted mean contig coverage per MAG, unbinned contigs excluded.
pub fn weighted_coverage(rows: &[ContigCoverage]) -> anyhow::Result<BTreeMap<MagId, f64>> {
    let mut sums: BTreeMap<MagId, (f64, u64)> = BTreeMap::new();
    for row in rows {
        let mag = MagId::normalize(&row.bin_id);
        if mag.as_str() == UNBINNED {
            continue;
        }
        let entry = sums.entry(mag).or_default();
        entry.0 += row.coverage * row.sequence_length as f64;
        entry.1 += row.sequence_length;
    }

    sums.into_iter()
        .map(|(mag, (weighted, length))| {
            if length == 0 {
                return Err(anyhow!("MAG {} has a total sequence length of 0", mag));
            }
            Ok((mag, weighted / length as f64))
        })
        .collect()
}

/// Normalizes weighted coverages so they sum to 1 across the sample.
pub fn relative_abundance(rows: &[ContigCoverage]) -> anyhow::Result<Vec<MagCoverage>> {
    let coverages = weighted_coverage(rows)?;
    let total: f64 = coverages.values().sum();
    if total == 0.0 && !coverages.is_empty() {
        warn!("All MAGs have zero coverage, relative abundances are undefined");
    }

    Ok(coverages
        .into_iter()
        .map(|(mag, avg_read_cov)| MagCoverage {
            mag,
            avg_read_cov,
            avg_mag_ra: avg_read_cov / total,
        })
        .collect())
}

pub fn run<P: AsRef<Path>>(f_in: P, f_out: P) -> anyhow::Result<()> {
    let f_in = f_in.as_ref();
    let rows: Vec<ContigCoverage> = read_tsv(f_in)?;
    let mags =
        relative_abundance(&rows).with_context(|| format!("Bad coverage table: {}", f_in.display()))?;
    info!("{}: {} contigs over {} MAGs", f_in.display(), rows.len(), mags.len());

    let out = mags
        .into_iter()
        .map(|m| RelativeAbundance {
            mag: m.mag,
            avg_mag_ra: m.avg_mag_ra,
        })
        .collect::<Vec<_>>();
    write_table(f_out, &out, COMMA, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn contig(bin: &str, len: u64, cov: f64) -> ContigCoverage {
        ContigCoverage {
            bin_id: bin.to_string(),
            sequence_length: len,
            coverage: cov,
        }
    }

    #[test]
    fn weighted_mean_then_normalized() {
        let rows = vec![
            contig("m1", 100, 10.0),
            contig("m1", 100, 20.0),
            contig("m2", 50, 5.0),
        ];
        let mags = relative_abundance(&rows).unwrap();

        assert_eq!(mags[0].mag, MagId::new("m1"));
        assert!((mags[0].avg_read_cov - 15.0).abs() < 1e-12);
        assert!((mags[0].avg_mag_ra - 0.75).abs() < 1e-12);
        assert!((mags[1].avg_read_cov - 5.0).abs() < 1e-12);
        assert!((mags[1].avg_mag_ra - 0.25).abs() < 1e-12);
    }

    #[test]
    fn unbinned_contigs_never_count() {
        let rows = vec![
            contig("1", 1000, 3.0),
            contig(UNBINNED, 100_000, 500.0),
            contig("2", 10, 7.0),
            contig("3", 250, 0.5),
        ];
        let mags = relative_abundance(&rows).unwrap();

        assert_eq!(mags.len(), 3);
        assert!(mags.iter().all(|m| m.mag.as_str() != UNBINNED));
        let sum: f64 = mags.iter().map(|m| m.avg_mag_ra).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn binner_labels_are_written_as_bare_ids() {
        let rows = vec![
            contig("bin.0", 100, 3.0),
            contig("bin.unbinned", 1000, 50.0),
            contig("bin.1", 100, 1.0),
        ];
        let mags = relative_abundance(&rows).unwrap();
        let ids = mags.iter().map(|m| m.mag.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["0", "1"]);
    }

    #[test]
    fn zero_length_mag_is_fatal() {
        let rows = vec![contig("1", 0, 3.0), contig("2", 10, 1.0)];
        assert!(relative_abundance(&rows).is_err());
    }

    #[test]
    fn zero_coverage_sample_yields_nan() {
        let rows = vec![contig("1", 10, 0.0)];
        let mags = relative_abundance(&rows).unwrap();
        assert!(mags[0].avg_mag_ra.is_nan());
    }

    #[test]
    fn run_reads_checkm_columns() {
        let dir = tempfile::tempdir().unwrap();
        let f_in = dir.path().join("coverage.tsv");
        let f_out = dir.path().join("mag_ra.csv");
        fs::write(
            &f_in,
            "Sequence Id\tBin Id\tSequence length (bp)\tCoverage\n\
             c1\t1\t100\t10.0\n\
             c2\t1\t100\t20.0\n\
             c3\t2\t50\t5.0\n\
             c4\tunbinned\t900\t99.0\n",
        )
        .unwrap();

        run(&f_in, &f_out).unwrap();
        let out = fs::read_to_string(&f_out).unwrap();
        assert_eq!(out, "mag,avg_mag_ra\n1,0.75\n2,0.25\n");
    }
}
