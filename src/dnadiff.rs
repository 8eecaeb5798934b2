use anyhow::{anyhow, Context};
use log::info;
use std::path::Path;

use crate::{io::is_empty_file, output::write_lines, types::AlignmentComparison};

/// `4641652(99.87%)` -> `99.87`
pub fn parse_percent(token: &str) -> Option<f64> {
    let inner = token.rsplit('(').next()?;
    let value = inner.split('%').next()?;
    value.parse().ok()
}

fn columns<'a>(line: &'a str, key: &str) -> anyhow::Result<(&'a str, &'a str)> {
    let mut cols = line.split_whitespace().skip(1);
    match (cols.next(), cols.next()) {
        (Some(r), Some(q)) => Ok((r, q)),
        _ => Err(anyhow!("{} line has fewer than two values", key)),
    }
}

/// Parses the text of a non-empty DNAdiff `.report`.
///
/// The first line names the reference and query files. Later occurrences of
/// a statistic replace earlier ones, so `AvgIdentity` ends up holding the
/// M-to-M value when both alignment blocks are present.
pub fn parse_report(text: &str) -> anyhow::Result<AlignmentComparison> {
    let mut first = text
        .lines()
        .next()
        .map(str::split_whitespace)
        .ok_or_else(|| anyhow!("Report has no header line"))?;
    let reference = first
        .next()
        .ok_or_else(|| anyhow!("Header line names no reference"))?;
    let query = first
        .next()
        .ok_or_else(|| anyhow!("Header line names no query"))?;

    let mut lengths = None;
    let mut aligned = None;
    let mut identity = None;

    for (i, line) in text.lines().enumerate() {
        let ctx = || format!("line {}", i + 1);
        if line.contains("TotalBases") {
            let (r, q) = columns(line, "TotalBases").with_context(ctx)?;
            let r: u64 = r.parse().with_context(ctx)?;
            let q: u64 = q.parse().with_context(ctx)?;
            lengths = Some((r, q));
        }
        if line.contains("AlignedBases") {
            let (r, q) = columns(line, "AlignedBases").with_context(ctx)?;
            let r = parse_percent(r).ok_or_else(|| anyhow!("Bad percentage {:?}", r)).with_context(ctx)?;
            let q = parse_percent(q).ok_or_else(|| anyhow!("Bad percentage {:?}", q)).with_context(ctx)?;
            aligned = Some((r, q));
        }
        if line.contains("AvgIdentity") {
            let (r, _) = columns(line, "AvgIdentity").with_context(ctx)?;
            identity = Some(r.parse::<f64>().with_context(ctx)?);
        }
    }

    let (reference_length, query_length) = lengths.ok_or_else(|| anyhow!("No TotalBases line"))?;
    let (aligned_ref_pct, aligned_query_pct) =
        aligned.ok_or_else(|| anyhow!("No AlignedBases line"))?;
    let avg_identity = identity.ok_or_else(|| anyhow!("No AvgIdentity line"))?;

    Ok(AlignmentComparison {
        query: query.to_string(),
        reference: reference.to_string(),
        reference_length,
        aligned_ref_pct,
        query_length,
        aligned_query_pct,
        avg_identity,
    })
}

/// Reads a report, falling back to a no-reference record for an empty file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<AlignmentComparison> {
    let path = path.as_ref();
    if is_empty_file(path)? {
        let query = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid UTF-8 in filename: {:#?}", path))?;
        info!("{} is empty, no reference for {}", path.display(), query);
        return Ok(AlignmentComparison::no_reference(query.to_string()));
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    parse_report(&text).with_context(|| format!("Malformed DNAdiff report: {}", path.display()))
}

pub fn run<P: AsRef<Path>>(f_in: P, f_out: P) -> anyhow::Result<()> {
    let record = parse_file(f_in)?;
    write_lines(f_out, &[record])
}
