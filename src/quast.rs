use anyhow::{anyhow, Context};
use log::{debug, info};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    io::{is_empty_file, COMMA},
    output::{write_empty, write_table},
    types::{AssemblyStats, MagId},
};

/// QUAST prints `-` for statistics it could not compute.
const NOT_AVAILABLE: &str = "-";

/// The metrics of one QUAST `report.tsv` that the summary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QuastReport {
    pub mag: MagId,
    pub num_contigs: u64,
    pub total_length: u64,
    pub genome_fraction: Option<f64>,
    pub ng50: Option<u64>,
    pub na50: Option<u64>,
    pub num_misassemblies: Option<u64>,
    pub misassembled_contigs: Option<u64>,
    pub misassembled_length: Option<u64>,
    pub unaligned_contigs: Option<UnalignedContigs>,
    pub unaligned_length: Option<u64>,
}

/// `"<full> + <partial> part"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnalignedContigs {
    pub full: u64,
    pub partial: u64,
}

impl FromStr for UnalignedContigs {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('+');
        let full = parts
            .next()
            .map(str::trim)
            .ok_or_else(|| anyhow!("Empty unaligned contig count"))?
            .parse()
            .with_context(|| format!("Bad unaligned contig count {:?}", s))?;
        let partial = match parts.next() {
            Some(rest) => rest
                .split_whitespace()
                .next()
                .ok_or_else(|| anyhow!("Bad unaligned contig count {:?}", s))?
                .parse()
                .with_context(|| format!("Bad unaligned contig count {:?}", s))?,
            None => 0,
        };
        Ok(Self { full, partial })
    }
}

fn metric<T>(metrics: &HashMap<&str, &str>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = *metrics
        .get(key)
        .ok_or_else(|| anyhow!("Missing metric {:?}", key))?;
    if value == NOT_AVAILABLE {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| anyhow!("Bad value {:?} for {:?}: {}", value, key, e))
}

fn required<T>(metrics: &HashMap<&str, &str>, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    metric(metrics, key)?.ok_or_else(|| anyhow!("Metric {:?} is not available", key))
}

pub fn parse_report(text: &str) -> anyhow::Result<QuastReport> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| anyhow!("Report is empty"))?;
    let mag = header
        .split('\t')
        .nth(1)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("Header line names no assembly"))?;

    let metrics = lines
        .filter_map(|line| line.split_once('\t'))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect::<HashMap<_, _>>();

    Ok(QuastReport {
        mag: MagId::normalize(mag),
        num_contigs: required(&metrics, "# contigs")?,
        total_length: required(&metrics, "Total length")?,
        genome_fraction: metric(&metrics, "Genome fraction (%)")?,
        ng50: metric(&metrics, "NG50")?,
        na50: metric(&metrics, "NA50")?,
        num_misassemblies: metric(&metrics, "# misassemblies")?,
        misassembled_contigs: metric(&metrics, "# misassembled contigs")?,
        misassembled_length: metric(&metrics, "Misassembled contigs length")?,
        unaligned_contigs: metric(&metrics, "# unaligned contigs")?,
        unaligned_length: metric(&metrics, "Unaligned length")?,
    })
}

/// Zero denominators give NaN so a degenerate MAG stays visible downstream.
fn proportion(part: Option<u64>, whole: u64) -> Option<f64> {
    part.map(|p| {
        if whole == 0 {
            f64::NAN
        } else {
            p as f64 / whole as f64
        }
    })
}

impl From<QuastReport> for AssemblyStats {
    fn from(r: QuastReport) -> Self {
        AssemblyStats {
            prop_misassemb_ctgs: proportion(r.misassembled_contigs, r.num_contigs),
            prop_misassemb_len: proportion(r.misassembled_length, r.total_length),
            prop_unaln_ctgs: proportion(r.unaligned_contigs.map(|u| u.full), r.num_contigs),
            prop_unaln_len: proportion(r.unaligned_length, r.total_length),
            mag: r.mag,
            genome_fraction: r.genome_fraction,
            ng50: r.ng50,
            na50: r.na50,
            num_misassemb: r.num_misassemblies,
        }
    }
}

/// QUAST writes `<outdir>/<mag>/report.tsv`, so the parent directory names the MAG.
fn mag_from_parent(path: &Path) -> anyhow::Result<MagId> {
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map(MagId::normalize)
        .ok_or_else(|| anyhow!("Cannot derive a MAG name from {:#?}", path))
}

/// Rows for every report, or `None` when no report had any content.
pub fn aggregate(reports: &[PathBuf]) -> anyhow::Result<Option<Vec<AssemblyStats>>> {
    let mut rows = Vec::new();
    let mut unaligned = Vec::new();

    for path in reports {
        if is_empty_file(path)? {
            debug!("{} is empty", path.display());
            unaligned.push(mag_from_parent(path)?);
            continue;
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        let report = parse_report(&text)
            .with_context(|| format!("Malformed QUAST report: {}", path.display()))?;
        rows.push(AssemblyStats::from(report));
    }

    if rows.is_empty() {
        return Ok(None);
    }
    info!(
        "{} QUAST reports, {} MAGs without a reference",
        rows.len(),
        unaligned.len()
    );
    rows.extend(unaligned.into_iter().map(AssemblyStats::unaligned));
    Ok(Some(rows))
}

pub fn run<P: AsRef<Path>>(f_out: P, reports: &[PathBuf]) -> anyhow::Result<()> {
    match aggregate(reports)? {
        Some(rows) => write_table(f_out, &rows, COMMA, true),
        None => {
            info!("No QUAST results, writing an empty table");
            write_empty(f_out)
        }
    }
}
