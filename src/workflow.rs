//! Working-directory layout, parameters and sample staging.

use anyhow::{anyhow, Context};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use std::{
    ffi::OsStr,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    fasta::{decompress_to, is_gzipped},
    io::{list_with_extensions, read_csv, read_tsv},
    output::write_lines,
};

pub const OUT_DIRS: [&str; 8] = [
    "0_checkm2",
    "1_checkm1",
    "2_gunc",
    "3_gtdbtk",
    "4_dnadiff",
    "5_quast",
    "6_prokka",
    "final_reports",
];

pub const LOG_DIRS: [&str; 6] = ["checkm", "gunc", "gtdbtk", "dnadiff", "quast", "prokka"];

const UNBINNED_MAG: &str = "bin.unbinned.fa";

/// Resolved output, temp and log roots. Built once and handed to whoever writes files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDirs {
    pub out: PathBuf,
    pub tmp: PathBuf,
    pub log: PathBuf,
}

impl WorkflowDirs {
    pub fn new<P: AsRef<Path>>(work_dir: P, module: &str) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            out: work_dir.join(module),
            tmp: work_dir.join("tmp"),
            log: work_dir.join("logs"),
        }
    }

    /// Creates the whole tree. Existing directories are left alone.
    pub fn create<P: AsRef<Path>>(work_dir: P, module: &str) -> anyhow::Result<Self> {
        let dirs = Self::new(work_dir, module);
        let all = OUT_DIRS
            .iter()
            .map(|d| dirs.out.join(d))
            .chain(std::iter::once(dirs.tmp.clone()))
            .chain(LOG_DIRS.iter().map(|d| dirs.log.join(d)));
        for dir in all {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create dir: {}", dir.display()))?;
        }
        info!("Workflow directories ready under {}", dirs.out.display());
        Ok(dirs)
    }

    pub fn step(&self, name: &str) -> PathBuf {
        self.out.join(name)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Parameters {
    pub conda_prefix: Option<String>,
}

impl Parameters {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Malformed parameters file: {}", path.display()))
    }

    pub fn conda_prefix(&self) -> &str {
        self.conda_prefix.as_deref().unwrap_or("Not Found")
    }
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    sample: String,
    mag_dir: PathBuf,
    bam: PathBuf,
}

static BIN_NAMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bin\.\d+\.fa$").expect("bin naming pattern is valid"));

/// True when every file is named `bin.<number>.fa`.
pub fn follows_bin_naming(names: &[&str]) -> bool {
    names.iter().all(|n| BIN_NAMING.is_match(n))
}

fn file_name(path: &Path) -> anyhow::Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid UTF-8 in filename: {:#?}", path))
}

/// Symlinks plain files and decompresses gzipped ones.
fn stage(src: &Path, dest: &Path) -> anyhow::Result<()> {
    let src = std::path::absolute(src)?;
    if is_gzipped(&src)? {
        debug!("Decompressing {} -> {}", src.display(), dest.display());
        decompress_to(&src, dest)?;
    } else {
        symlink(&src, dest)
            .with_context(|| format!("Failed to link {} -> {}", src.display(), dest.display()))?;
    }
    Ok(())
}

/// MAG files of one sample and the prefix each is staged under.
fn plan_sample(row: &SampleRow) -> anyhow::Result<Vec<(PathBuf, String)>> {
    let mut mags = list_with_extensions(&row.mag_dir, &[".fa"])?;
    mags.retain(|p| p.file_name() != Some(OsStr::new(UNBINNED_MAG)));
    if mags.is_empty() {
        return Err(anyhow!("No MAGs found in path: {}", row.mag_dir.display()));
    }

    let names = mags
        .iter()
        .map(|p| file_name(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let bin_naming = follows_bin_naming(&names);

    let prefixes = names
        .iter()
        .enumerate()
        .map(|(i, name)| match name.split('.').nth(1) {
            Some(n) if bin_naming => n.to_string(),
            _ => format!("bin.{}", i),
        })
        .collect::<Vec<_>>();
    Ok(mags.into_iter().zip(prefixes).collect())
}

/// Stages one sample. Nothing is created until its MAGs are found, and a
/// failure part way through removes what was staged so a rerun starts clean.
fn stage_sample(row: &SampleRow, tmp: &Path) -> anyhow::Result<()> {
    let plan = plan_sample(row)?;

    let staged = stage_planned(row, tmp, &plan);
    if staged.is_err() {
        warn!("{}: staging failed, removing partial output", row.sample);
        let _ = std::fs::remove_dir_all(tmp.join(&row.sample));
        let _ = std::fs::remove_file(tmp.join(format!("{}.out", row.sample)));
        let _ = std::fs::remove_file(tmp.join(format!("{}.bam", row.sample)));
    }
    staged
}

fn stage_planned(row: &SampleRow, tmp: &Path, plan: &[(PathBuf, String)]) -> anyhow::Result<()> {
    let sample_dir = tmp.join(&row.sample);
    std::fs::create_dir_all(&sample_dir)
        .with_context(|| format!("Failed to create dir: {}", sample_dir.display()))?;

    for (path, prefix) in plan {
        stage(path, &sample_dir.join(format!("{}.fa", prefix)))?;
    }
    let prefixes = plan.iter().map(|(_, prefix)| prefix).collect::<Vec<_>>();
    write_lines(tmp.join(format!("{}.out", row.sample)), &prefixes)?;

    let bam = std::path::absolute(&row.bam)?;
    let bam_link = tmp.join(format!("{}.bam", row.sample));
    symlink(&bam, &bam_link)
        .with_context(|| format!("Failed to link {} -> {}", bam.display(), bam_link.display()))?;

    info!("{}: staged {} MAGs", row.sample, plan.len());
    Ok(())
}

/// Stages every sample of the sheet into `tmp` and returns the sample names.
/// Samples that already have a directory under `tmp` are left untouched.
pub fn ingest_samples<P: AsRef<Path>, Q: AsRef<Path>>(samples: P, tmp: Q) -> anyhow::Result<Vec<String>> {
    let samples = samples.as_ref();
    let tmp = tmp.as_ref();
    let rows: Vec<SampleRow> = read_csv(samples)?;

    let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
        .progress_chars("##-");
    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(style);
    pb.set_message("Staging samples...");

    for row in &rows {
        if tmp.join(&row.sample).exists() {
            debug!("{} already staged", row.sample);
        } else {
            stage_sample(row, tmp).with_context(|| format!("Failed to stage sample {}", row.sample))?;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(rows.into_iter().map(|r| r.sample).collect())
}

/// MAG prefixes written by [`ingest_samples`] for one sample.
pub fn read_bin_list<P: AsRef<Path>>(sample: &str, tmp: P) -> anyhow::Result<Vec<String>> {
    let path = tmp.as_ref().join(format!("{}.out", sample));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

#[derive(Debug, Deserialize)]
struct GtdbSummaryRow {
    user_genome: String,
    closest_genome_reference: Option<String>,
}

/// Spellings GTDB-Tk and friends use for "no closest reference".
fn is_missing(value: &str) -> bool {
    matches!(value, "" | "N/A" | "NA" | "nan" | "NaN" | "None")
}

/// `GCF_000005845.2` -> `<db>/skani/database/GCF/000/005/845/GCF_000005845.2_genomic.fna.gz`
pub fn reference_path<P: AsRef<Path>>(gtdb_db: P, accession: &str) -> anyhow::Result<PathBuf> {
    let (source, digits) = accession
        .split_once('_')
        .ok_or_else(|| anyhow!("Unexpected accession format: {:?}", accession))?;
    let block = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .ok_or_else(|| anyhow!("Unexpected accession format: {:?}", accession))
    };
    Ok(gtdb_db
        .as_ref()
        .join("skani/database")
        .join(source)
        .join(block(0..3)?)
        .join(block(3..6)?)
        .join(block(6..9)?)
        .join(format!("{}_genomic.fna.gz", accession)))
}

/// Writes `<out_dir>/<user_genome>.ref` for every classified MAG.
pub fn pair_mag_refs<P, Q, R>(gtdb_summary: P, out_dir: Q, gtdb_db: R) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let rows: Vec<GtdbSummaryRow> = read_tsv(gtdb_summary.as_ref())?;
    let mut paired = 0;
    for row in &rows {
        let target = match row.closest_genome_reference.as_deref() {
            Some(r) if !is_missing(r) => {
                paired += 1;
                reference_path(&gtdb_db, r)?.display().to_string()
            }
            _ => "None".to_string(),
        };
        write_lines(out_dir.as_ref().join(format!("{}.ref", row.user_genome)), &[target])?;
    }
    info!("{} of {} MAGs have a closest reference", paired, rows.len());
    Ok(paired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn tree_is_created_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = WorkflowDirs::create(dir.path(), "mag_qc").unwrap();
        assert_eq!(dirs.out, dir.path().join("mag_qc"));
        assert!(dirs.step("5_quast").is_dir());
        assert!(dirs.step("final_reports").is_dir());
        assert!(dirs.tmp.is_dir());
        assert!(dirs.log.join("prokka").is_dir());

        let again = WorkflowDirs::create(dir.path(), "mag_qc").unwrap();
        assert_eq!(dirs, again);
    }

    #[test]
    fn conda_prefix_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let with = dir.path().join("with.yaml");
        let without = dir.path().join("without.yaml");
        fs::write(&with, "conda_prefix: /opt/envs\nother: 1\n").unwrap();
        fs::write(&without, "other: 1\n").unwrap();

        assert_eq!(Parameters::load(&with).unwrap().conda_prefix(), "/opt/envs");
        assert_eq!(Parameters::load(&without).unwrap().conda_prefix(), "Not Found");
    }

    #[test]
    fn bin_naming_convention() {
        assert!(follows_bin_naming(&["bin.1.fa", "bin.22.fa"]));
        assert!(!follows_bin_naming(&["bin.1.fa", "maxbin.002.fasta"]));
        assert!(!follows_bin_naming(&["bin.1.fa.gz"]));
        assert!(!follows_bin_naming(&["xbin.1.fa"]));
    }

    #[test]
    fn samples_are_staged_once() {
        let dir = tempfile::tempdir().unwrap();
        let mags = dir.path().join("mags");
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(&mags).unwrap();
        fs::create_dir_all(&tmp).unwrap();
        fs::write(mags.join("bin.4.fa"), ">a\nAC\n").unwrap();
        fs::write(mags.join("bin.12.fa"), ">b\nGT\n").unwrap();
        fs::write(mags.join(UNBINNED_MAG), ">u\nNN\n").unwrap();
        fs::write(dir.path().join("s1.bam"), "").unwrap();

        let sheet = dir.path().join("samples.csv");
        fs::write(
            &sheet,
            format!(
                "sample,mag_dir,bam\ns1,{},{}\n",
                mags.display(),
                dir.path().join("s1.bam").display()
            ),
        )
        .unwrap();

        let names = ingest_samples(&sheet, &tmp).unwrap();
        assert_eq!(names, vec!["s1".to_string()]);
        assert_eq!(read_bin_list("s1", &tmp).unwrap(), vec!["12", "4"]);
        assert_eq!(fs::read_to_string(tmp.join("s1").join("4.fa")).unwrap(), ">a\nAC\n");
        assert!(!tmp.join("s1").join("unbinned.fa").exists());
        assert!(tmp.join("s1.bam").symlink_metadata().is_ok());

        // a second run must not try to relink
        assert_eq!(ingest_samples(&sheet, &tmp).unwrap(), names);
    }

    #[test]
    fn failed_sample_can_be_ingested_again() {
        let dir = tempfile::tempdir().unwrap();
        let mags = dir.path().join("mags");
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(&mags).unwrap();
        fs::create_dir_all(&tmp).unwrap();
        fs::write(dir.path().join("s1.bam"), "").unwrap();
        let sheet = dir.path().join("samples.csv");
        fs::write(
            &sheet,
            format!(
                "sample,mag_dir,bam\ns1,{},{}\n",
                mags.display(),
                dir.path().join("s1.bam").display()
            ),
        )
        .unwrap();

        assert!(ingest_samples(&sheet, &tmp).is_err());
        assert!(!tmp.join("s1").exists());
        assert!(!tmp.join("s1.out").exists());

        fs::write(mags.join("bin.4.fa"), ">a\nAC\n").unwrap();
        ingest_samples(&sheet, &tmp).unwrap();
        assert!(tmp.join("s1.out").exists());
        assert_eq!(read_bin_list("s1", &tmp).unwrap(), vec!["4"]);
        assert!(tmp.join("s1").join("4.fa").exists());
    }

    #[test]
    fn failure_after_staging_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let mags = dir.path().join("mags");
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(&mags).unwrap();
        fs::create_dir_all(&tmp).unwrap();
        fs::write(mags.join("bin.4.fa"), ">a\nAC\n").unwrap();
        // an existing link makes the bam symlink the failing step
        fs::write(tmp.join("s3.bam"), "").unwrap();

        let row = SampleRow {
            sample: "s3".into(),
            mag_dir: mags,
            bam: dir.path().join("s3.bam"),
        };
        assert!(stage_sample(&row, &tmp).is_err());
        assert!(!tmp.join("s3").exists());
        assert!(!tmp.join("s3.out").exists());
    }

    #[test]
    fn foreign_names_are_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let mags = dir.path().join("mags");
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(&mags).unwrap();
        fs::create_dir_all(&tmp).unwrap();
        fs::write(mags.join("a.fasta"), ">a\nAC\n").unwrap();
        fs::write(mags.join("b.fa"), ">b\nGT\n").unwrap();
        fs::write(dir.path().join("s2.bam"), "").unwrap();

        let row = SampleRow {
            sample: "s2".into(),
            mag_dir: mags,
            bam: dir.path().join("s2.bam"),
        };
        stage_sample(&row, &tmp).unwrap();
        assert_eq!(read_bin_list("s2", &tmp).unwrap(), vec!["bin.0", "bin.1"]);
        assert_eq!(fs::read_to_string(tmp.join("s2").join("bin.1.fa")).unwrap(), ">b\nGT\n");
    }

    #[test]
    fn reference_paths_follow_skani_layout() {
        let p = reference_path("/db", "GCF_000005845.2").unwrap();
        assert_eq!(
            p,
            PathBuf::from("/db/skani/database/GCF/000/005/845/GCF_000005845.2_genomic.fna.gz")
        );
        assert!(reference_path("/db", "GCF000").is_err());
        assert!(reference_path("/db", "GCF_0001").is_err());
    }

    #[test]
    fn refs_are_written_per_mag() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("gtdbtk.bac120.summary.tsv");
        fs::write(
            &summary,
            "user_genome\tclassification\tclosest_genome_reference\n\
             1\td__Bacteria;s__Escherichia coli\tGCF_000005845.2\n\
             2\td__Bacteria;s__\tN/A\n",
        )
        .unwrap();

        let n = pair_mag_refs(&summary, dir.path(), "/db").unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("1.ref")).unwrap(),
            "/db/skani/database/GCF/000/005/845/GCF_000005845.2_genomic.fna.gz\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("2.ref")).unwrap(), "None\n");
    }
}
