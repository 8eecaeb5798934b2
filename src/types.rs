use std::fmt;

use serde::{Deserialize, Serialize};

const FASTA_EXTENSIONS: [&str; 4] = [".fasta", ".fna", ".fa", ".fsa"];

/// Binner naming convention, `bin.<n>`.
const BIN_PREFIX: &str = "bin.";

/// Identifier of a MAG, always kept as a string so `"01"` and `"1"` stay distinct.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MagId(String);

impl MagId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// The one form every source is keyed by before joining:
    /// `/tmp/s1/bin.3.fa.gz`, `bin.3.fa`, `bin.3` and `3` all become `3`.
    pub fn normalize(raw: &str) -> Self {
        let mut id = raw.trim();
        id = id.rsplit('/').next().unwrap_or(id);
        if let Some(stem) = id.strip_suffix(".gz") {
            id = stem;
        }
        if let Some(stem) = FASTA_EXTENSIONS.iter().find_map(|ext| id.strip_suffix(ext)) {
            id = stem;
        }
        if let Some(num) = id.strip_prefix(BIN_PREFIX) {
            id = num;
        }
        Self::new(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MagId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One contig row of a CheckM coverage table.
#[derive(Debug, Clone, Deserialize)]
pub struct ContigCoverage {
    #[serde(rename = "Bin Id")]
    pub bin_id: String,
    #[serde(rename = "Sequence length (bp)")]
    pub sequence_length: u64,
    #[serde(rename = "Coverage")]
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeAbundance {
    pub mag: MagId,
    pub avg_mag_ra: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneCounts {
    #[serde(rename = "CDS")]
    pub cds: u64,
    pub genes: u64,
    #[serde(rename = "mRNA")]
    pub mrna: u64,
    #[serde(rename = "tRNA")]
    pub trna: u64,
    #[serde(rename = "rRNA_total")]
    pub rrna_total: u64,
    #[serde(rename = "rRNA_5s")]
    pub rrna_5s: u64,
    #[serde(rename = "rRNA_16s")]
    pub rrna_16s: u64,
    #[serde(rename = "rRNA_23s")]
    pub rrna_23s: u64,
}

/// Headerless gene-count line: the Prokka label followed by the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneCountRow {
    pub label: String,
    pub cds: u64,
    pub genes: u64,
    pub mrna: u64,
    pub trna: u64,
    pub rrna_total: u64,
    pub rrna_5s: u64,
    pub rrna_16s: u64,
    pub rrna_23s: u64,
}

impl GeneCountRow {
    pub fn new(label: String, counts: GeneCounts) -> Self {
        Self {
            label,
            cds: counts.cds,
            genes: counts.genes,
            mrna: counts.mrna,
            trna: counts.trna,
            rrna_total: counts.rrna_total,
            rrna_5s: counts.rrna_5s,
            rrna_16s: counts.rrna_16s,
            rrna_23s: counts.rrna_23s,
        }
    }
}

/// MAG-vs-reference statistics pulled out of a DNAdiff report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlignmentComparison {
    pub query: String,
    pub reference: String,
    pub reference_length: u64,
    pub aligned_ref_pct: f64,
    pub query_length: u64,
    pub aligned_query_pct: f64,
    pub avg_identity: f64,
}

impl AlignmentComparison {
    pub const NO_REFERENCE: &'static str = "None";

    pub fn no_reference(query: String) -> Self {
        Self {
            query,
            reference: Self::NO_REFERENCE.to_string(),
            reference_length: 0,
            aligned_ref_pct: 0.0,
            query_length: 0,
            aligned_query_pct: 0.0,
            avg_identity: 0.0,
        }
    }
}

impl fmt::Display for AlignmentComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{:.2}\t{}\t{:.2}\t{:.2}",
            self.query,
            self.reference,
            self.reference_length,
            self.aligned_ref_pct,
            self.query_length,
            self.aligned_query_pct,
            self.avg_identity
        )
    }
}

/// Reference-based assembly statistics for one MAG, as written by `aggregate-quast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub mag: MagId,
    pub genome_fraction: Option<f64>,
    #[serde(rename = "NG50")]
    pub ng50: Option<u64>,
    #[serde(rename = "NA50")]
    pub na50: Option<u64>,
    pub num_misassemb: Option<u64>,
    pub prop_misassemb_ctgs: Option<f64>,
    pub prop_misassemb_len: Option<f64>,
    pub prop_unaln_ctgs: Option<f64>,
    pub prop_unaln_len: Option<f64>,
}

impl AssemblyStats {
    /// Row for a MAG that QUAST had no reference for.
    pub const UNALIGNED: Self = Self {
        mag: MagId(String::new()),
        genome_fraction: Some(0.0),
        ng50: Some(0),
        na50: Some(0),
        num_misassemb: Some(0),
        prop_misassemb_ctgs: Some(0.0),
        prop_misassemb_len: Some(0.0),
        prop_unaln_ctgs: Some(0.0),
        prop_unaln_len: Some(0.0),
    };

    /// Row used by the summary when there is no QUAST table at all.
    pub const PLACEHOLDER: Self = Self {
        mag: MagId(String::new()),
        genome_fraction: Some(0.0),
        ng50: Some(0),
        na50: Some(0),
        num_misassemb: None,
        prop_misassemb_ctgs: None,
        prop_misassemb_len: None,
        prop_unaln_ctgs: None,
        prop_unaln_len: None,
    };

    pub fn unaligned(mag: MagId) -> Self {
        Self {
            mag,
            ..Self::UNALIGNED
        }
    }

    pub fn placeholder(mag: MagId) -> Self {
        Self {
            mag,
            ..Self::PLACEHOLDER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spelling_normalizes_to_one_id() {
        for raw in ["3", "bin.3", "3.fa", "bin.3.fa", "/tmp/s1/bin.3.fa", "/tmp/s1/3.fna.gz", " bin.3 "] {
            assert_eq!(MagId::normalize(raw), MagId::new("3"), "{}", raw);
        }
    }

    #[test]
    fn foreign_names_keep_their_dots() {
        assert_eq!(MagId::normalize("/x/maxbin.002.fasta"), MagId::new("maxbin.002"));
        assert_eq!(MagId::normalize("07"), MagId::new("07"));
        assert!(MagId::normalize("bin.").is_empty());
    }

    #[test]
    fn no_reference_line_is_zero_filled() {
        let line = AlignmentComparison::no_reference("myMAG".into()).to_string();
        assert_eq!(line, "myMAG\tNone\t0\t0.00\t0\t0.00\t0.00");
    }

    #[test]
    fn fallback_rows_share_the_mag_but_not_the_values() {
        let a = AssemblyStats::unaligned(MagId::new("4"));
        let p = AssemblyStats::placeholder(MagId::new("4"));
        assert_eq!(a.mag, p.mag);
        assert_eq!(a.prop_unaln_len, Some(0.0));
        assert_eq!(p.prop_unaln_len, None);
    }
}
