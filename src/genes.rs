//! Gene and rRNA counts from Prokka's `.txt` summary and `.tsv` feature table.

use anyhow::Context;
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::{
    io::{read_tsv, COMMA},
    output::write_table,
    types::{GeneCountRow, GeneCounts},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKey {
    Cds,
    Gene,
    Mrna,
    Trna,
    Rrna,
}

const SUMMARY_KEYS: [(&str, SummaryKey); 5] = [
    ("CDS:", SummaryKey::Cds),
    ("gene:", SummaryKey::Gene),
    ("mRNA:", SummaryKey::Mrna),
    ("tRNA:", SummaryKey::Trna),
    ("rRNA:", SummaryKey::Rrna),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RrnaSubtype {
    S5,
    S16,
    S23,
}

/// Checked in order; the first substring found decides the subtype.
const RRNA_PRIORITY: [(&str, RrnaSubtype); 3] = [
    ("5S", RrnaSubtype::S5),
    ("16S", RrnaSubtype::S16),
    ("23S", RrnaSubtype::S23),
];

#[derive(Debug, Deserialize)]
struct Feature {
    ftype: String,
    product: String,
}

/// Parses one summary line. `Ok(None)` for lines that carry no count we track.
pub fn parse_summary_line(line: &str) -> anyhow::Result<Option<(SummaryKey, u64)>> {
    let line = line.trim();
    let Some((prefix, key)) = SUMMARY_KEYS.iter().find(|(p, _)| line.starts_with(p)) else {
        return Ok(None);
    };
    let value = line[prefix.len()..].trim();
    let count = value
        .parse::<u64>()
        .with_context(|| format!("Invalid count {:?} for {}", value, prefix))?;
    Ok(Some((*key, count)))
}

pub fn classify_rrna(product: &str) -> Option<RrnaSubtype> {
    RRNA_PRIORITY
        .iter()
        .find(|(needle, _)| product.contains(needle))
        .map(|(_, subtype)| *subtype)
}

pub fn parse_summary(text: &str) -> anyhow::Result<GeneCounts> {
    let mut counts = GeneCounts::default();
    for (i, line) in text.lines().enumerate() {
        let parsed = parse_summary_line(line).with_context(|| format!("line {}", i + 1))?;
        match parsed {
            Some((SummaryKey::Cds, n)) => counts.cds = n,
            Some((SummaryKey::Gene, n)) => counts.genes = n,
            Some((SummaryKey::Mrna, n)) => counts.mrna = n,
            Some((SummaryKey::Trna, n)) => counts.trna = n,
            Some((SummaryKey::Rrna, n)) => counts.rrna_total = n,
            None => {}
        }
    }
    Ok(counts)
}

/// Adds rRNA subtype tallies. Products matching no subtype are left uncounted.
pub fn add_rrna_subtypes<'a, I>(counts: &mut GeneCounts, products: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for product in products {
        match classify_rrna(product) {
            Some(RrnaSubtype::S5) => counts.rrna_5s += 1,
            Some(RrnaSubtype::S16) => counts.rrna_16s += 1,
            Some(RrnaSubtype::S23) => counts.rrna_23s += 1,
            None => warn!("Unrecognised rRNA product: {:?}", product),
        }
    }
}

pub fn summarize_genes<P: AsRef<Path>>(f_summ: P, f_all: P) -> anyhow::Result<GeneCounts> {
    let f_summ = f_summ.as_ref();
    let text = std::fs::read_to_string(f_summ)
        .with_context(|| format!("Failed to read: {}", f_summ.display()))?;
    let mut counts =
        parse_summary(&text).with_context(|| format!("Malformed summary: {}", f_summ.display()))?;

    if counts.rrna_total != 0 {
        let features: Vec<Feature> = read_tsv(f_all.as_ref())?;
        let products = features
            .iter()
            .filter(|f| f.ftype == "rRNA")
            .map(|f| f.product.as_str());
        add_rrna_subtypes(&mut counts, products);
    } else {
        debug!("No rRNAs in {}, skipping feature table", f_summ.display());
    }
    Ok(counts)
}

pub fn run<P: AsRef<Path>>(f_summ: P, f_all: P, label: &str, f_out: P) -> anyhow::Result<()> {
    let counts = summarize_genes(&f_summ, &f_all)?;
    info!(
        "{}: {} CDS, {} tRNA, {} rRNA (5S {}, 16S {}, 23S {})",
        label,
        counts.cds,
        counts.trna,
        counts.rrna_total,
        counts.rrna_5s,
        counts.rrna_16s,
        counts.rrna_23s
    );
    let row = GeneCountRow::new(label.to_string(), counts);
    write_table(f_out, &[row], COMMA, false)
}
