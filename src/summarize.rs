//! Merges every per-MAG report into one table and classifies each MAG.

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use crate::{
    io::{index_by_mag, is_empty_file, read_csv, read_table, read_tsv, COMMA, TAB},
    output::write_table,
    quality::{gunc_status, overall_score, QualityInputs, QualityScheme},
    types::{AlignmentComparison, AssemblyStats, GeneCountRow, MagId, RelativeAbundance},
};

/// Written where an optional tool produced nothing.
pub const NO_DATA: &str = "NA";

pub struct SummaryInputs {
    pub checkm2: PathBuf,
    pub checkm1: Option<PathBuf>,
    pub mag_ra: PathBuf,
    pub gunc: Option<PathBuf>,
    pub gtdb: PathBuf,
    pub diff: PathBuf,
    pub quast: PathBuf,
    pub gene_cts: PathBuf,
}

impl SummaryInputs {
    /// Strain heterogeneity is only available alongside the MIMAG tiers.
    pub fn scheme(&self) -> QualityScheme {
        if self.checkm1.is_some() {
            QualityScheme::Mimag
        } else {
            QualityScheme::Binary
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CheckM2Row {
    #[serde(rename = "Name")]
    mag: String,
    #[serde(rename = "Completeness")]
    completeness: f64,
    #[serde(rename = "Contamination")]
    contamination: f64,
    #[serde(rename = "Contig_N50")]
    n50: u64,
    #[serde(rename = "Genome_Size")]
    size: u64,
    #[serde(rename = "GC_Content")]
    gc: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct StrainRow {
    #[serde(rename = "Bin Id")]
    mag: String,
    #[serde(rename = "Strain heterogeneity")]
    strain_het: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct GuncRow {
    genome: String,
    clade_separation_score: Option<f64>,
    n_effective_surplus_clades: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct GtdbRow {
    user_genome: String,
    classification: String,
}

/// The parts of a DNAdiff line that go into the summary.
#[derive(Debug, Clone, PartialEq)]
struct ReferenceHit {
    reference: String,
    ref_cov: f64,
    bin_cov: f64,
    ani: f64,
}

impl ReferenceHit {
    fn no_alignment() -> Self {
        Self {
            reference: NO_DATA.to_string(),
            ref_cov: 0.0,
            bin_cov: 0.0,
            ani: 0.0,
        }
    }
}

impl From<AlignmentComparison> for ReferenceHit {
    fn from(a: AlignmentComparison) -> Self {
        Self {
            reference: a.reference,
            ref_cov: a.aligned_ref_pct,
            bin_cov: a.aligned_query_pct,
            ani: a.avg_identity,
        }
    }
}

/// One output row. Columns a MAG has no data for are left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub mag: MagId,
    pub completeness: Option<f64>,
    pub contamination: Option<f64>,
    #[serde(rename = "N50")]
    pub n50: Option<u64>,
    pub size: Option<u64>,
    #[serde(rename = "GC")]
    pub gc: Option<f64>,
    pub clade_separation_score: Option<f64>,
    pub n_effective_surplus_clades: Option<f64>,
    pub strain_het: Option<f64>,
    pub num_cds: Option<u64>,
    pub num_trna: Option<u64>,
    pub num_rrna_total: Option<u64>,
    pub num_rrna_5s: Option<u64>,
    pub num_rrna_16s: Option<u64>,
    pub num_rrna_23s: Option<u64>,
    pub avg_mag_ra: Option<f64>,
    pub classification: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub bin_cov: Option<f64>,
    pub ref_cov: Option<f64>,
    #[serde(rename = "ANI")]
    pub ani: Option<f64>,
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
    pub quality_tier: Option<String>,
    pub gunc_status: Option<String>,
    pub overall_score: Option<f64>,
}

/// Every source keyed by normalized MAG id.
#[derive(Default)]
struct Sources {
    checkm2: HashMap<MagId, CheckM2Row>,
    gunc: HashMap<MagId, GuncRow>,
    strain: HashMap<MagId, StrainRow>,
    genes: HashMap<MagId, GeneCountRow>,
    abundance: HashMap<MagId, RelativeAbundance>,
    gtdb: HashMap<MagId, String>,
    diff: HashMap<MagId, ReferenceHit>,
    quast: HashMap<MagId, AssemblyStats>,
}

impl Sources {
    fn load(inputs: &SummaryInputs) -> anyhow::Result<Self> {
        let mut sources = Sources::default();

        let rows: Vec<CheckM2Row> = read_tsv(&inputs.checkm2)?;
        sources.checkm2 = index_by_mag(rows, |r| r.mag.as_str(), &inputs.checkm2)?;
        info!("{} MAGs in {}", sources.checkm2.len(), inputs.checkm2.display());

        if let Some(path) = &inputs.gunc {
            let rows: Vec<GuncRow> = read_tsv(path)?;
            sources.gunc = index_by_mag(rows, |r| r.genome.as_str(), path)?;
        }

        if let Some(path) = &inputs.checkm1 {
            let rows: Vec<StrainRow> = read_tsv(path)?;
            sources.strain = index_by_mag(rows, |r| r.mag.as_str(), path)?;
        }

        let rows: Vec<GeneCountRow> = read_table(&inputs.gene_cts, COMMA, false)?;
        sources.genes = index_by_mag(rows, |r| r.label.as_str(), &inputs.gene_cts)?;

        let rows: Vec<RelativeAbundance> = read_csv(&inputs.mag_ra)?;
        sources.abundance = index_by_mag(rows, |r| r.mag.as_str(), &inputs.mag_ra)?;

        if is_empty_file(&inputs.gtdb)? {
            info!("No GTDB-Tk classifications, every MAG is {}", NO_DATA);
            sources.gtdb = sources.fallback(|| NO_DATA.to_string());
        } else {
            let rows: Vec<GtdbRow> = read_tsv(&inputs.gtdb)?;
            sources.gtdb = index_by_mag(rows, |r| r.user_genome.as_str(), &inputs.gtdb)?
                .into_iter()
                .map(|(mag, r)| (mag, r.classification))
                .collect();
        }

        if is_empty_file(&inputs.diff)? {
            info!("No DNAdiff results, every MAG is unaligned");
            sources.diff = sources.fallback(ReferenceHit::no_alignment);
        } else {
            let rows: Vec<AlignmentComparison> = read_table(&inputs.diff, TAB, false)?;
            sources.diff = index_by_mag(rows, |r| r.query.as_str(), &inputs.diff)?
                .into_iter()
                .map(|(mag, r)| (mag, ReferenceHit::from(r)))
                .collect();
        }

        if is_empty_file(&inputs.quast)? {
            info!("No QUAST results, using placeholder assembly stats");
            sources.quast = sources
                .checkm2
                .keys()
                .map(|mag| (mag.clone(), AssemblyStats::placeholder(mag.clone())))
                .collect();
        } else {
            let rows: Vec<AssemblyStats> = read_csv(&inputs.quast)?;
            sources.quast = index_by_mag(rows, |r| r.mag.as_str(), &inputs.quast)?;
        }

        Ok(sources)
    }

    /// The same value for every MAG CheckM2 reported on.
    fn fallback<T, F: Fn() -> T>(&self, value: F) -> HashMap<MagId, T> {
        self.checkm2
            .keys()
            .map(|mag| (mag.clone(), value()))
            .collect()
    }

    fn all_mags(&self) -> BTreeSet<MagId> {
        let mut mags = BTreeSet::new();
        mags.extend(self.checkm2.keys().cloned());
        mags.extend(self.gunc.keys().cloned());
        mags.extend(self.strain.keys().cloned());
        mags.extend(self.genes.keys().cloned());
        mags.extend(self.abundance.keys().cloned());
        mags.extend(self.gtdb.keys().cloned());
        mags.extend(self.diff.keys().cloned());
        mags.extend(self.quast.keys().cloned());
        mags
    }

    fn row(&self, mag: MagId) -> SummaryRow {
        let mut row = SummaryRow::default();

        if let Some(c) = self.checkm2.get(&mag) {
            row.completeness = Some(c.completeness);
            row.contamination = Some(c.contamination);
            row.n50 = Some(c.n50);
            row.size = Some(c.size);
            row.gc = Some(c.gc);
        } else {
            warn!("MAG {} has no CheckM2 result", mag);
        }
        if let Some(g) = self.gunc.get(&mag) {
            row.clade_separation_score = g.clade_separation_score;
            row.n_effective_surplus_clades = g.n_effective_surplus_clades;
        }
        row.strain_het = self.strain.get(&mag).map(|s| s.strain_het);
        if let Some(g) = self.genes.get(&mag) {
            row.num_cds = Some(g.cds);
            row.num_trna = Some(g.trna);
            row.num_rrna_total = Some(g.rrna_total);
            row.num_rrna_5s = Some(g.rrna_5s);
            row.num_rrna_16s = Some(g.rrna_16s);
            row.num_rrna_23s = Some(g.rrna_23s);
        }
        row.avg_mag_ra = self.abundance.get(&mag).map(|a| a.avg_mag_ra);
        row.classification = self.gtdb.get(&mag).cloned();
        if let Some(d) = self.diff.get(&mag) {
            row.reference = Some(d.reference.clone());
            row.bin_cov = Some(d.bin_cov);
            row.ref_cov = Some(d.ref_cov);
            row.ani = Some(d.ani);
        }
        if let Some(q) = self.quast.get(&mag) {
            row.genome_fraction = q.genome_fraction;
            row.ng50 = q.ng50;
            row.na50 = q.na50;
            row.num_misassemb = q.num_misassemb;
            row.prop_misassemb_ctgs = q.prop_misassemb_ctgs;
            row.prop_misassemb_len = q.prop_misassemb_len;
            row.prop_unaln_ctgs = q.prop_unaln_ctgs;
            row.prop_unaln_len = q.prop_unaln_len;
        }

        row.mag = mag;
        row
    }
}

/// Adds the derived columns for `scheme`.
pub fn classify(row: &mut SummaryRow, scheme: QualityScheme) {
    let inputs = QualityInputs {
        completeness: row.completeness,
        contamination: row.contamination,
        trna: row.num_trna,
        rrna_5s: row.num_rrna_5s,
        rrna_16s: row.num_rrna_16s,
        rrna_23s: row.num_rrna_23s,
    };
    row.quality_tier = scheme.classify(&inputs).map(|t| t.to_string());

    if scheme == QualityScheme::Mimag {
        row.gunc_status = Some(gunc_status(row.clade_separation_score).to_string());
        row.overall_score =
            overall_score(row.completeness, row.contamination, row.n50, row.strain_het);
    }
}

pub fn summarize(inputs: &SummaryInputs) -> anyhow::Result<Vec<SummaryRow>> {
    let scheme = inputs.scheme();
    let sources = Sources::load(inputs)?;

    let rows = sources
        .all_mags()
        .into_iter()
        .map(|mag| {
            let mut row = sources.row(mag);
            classify(&mut row, scheme);
            row
        })
        .collect::<Vec<_>>();

    info!("Summarized {} MAGs using {:?} tiers", rows.len(), scheme);
    Ok(rows)
}

pub fn run<P: AsRef<Path>>(inputs: &SummaryInputs, output: P) -> anyhow::Result<()> {
    let rows = summarize(inputs).context("Failed to summarize MAG reports")?;
    write_table(output, &rows, COMMA, true)
}
