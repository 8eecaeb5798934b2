use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Summarize MAG quality reports from CheckM2, GUNC, GTDB-Tk, DNAdiff, QUAST and Prokka")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Length-weighted MAG coverage normalized to relative abundance
    MagRa {
        #[arg(help = "Contig coverage TSV (CheckM coverage)")]
        f_in: PathBuf,
        #[arg(help = "Output MAG relative abundance CSV")]
        f_out: PathBuf,
    },

    /// CDS, tRNA and rRNA subtype counts for one MAG
    GeneCounts {
        #[arg(help = "Prokka summary TXT")]
        f_summ: PathBuf,
        #[arg(help = "Prokka feature TSV")]
        f_all: PathBuf,
        #[arg(help = "MAG label, e.g. bin.3")]
        label: String,
        #[arg(help = "Output gene count CSV")]
        f_out: PathBuf,
    },

    /// One summary line from a DNAdiff report
    ParseDnadiff {
        #[arg(help = "DNAdiff .report (empty when there was no reference)")]
        f_in: PathBuf,
        #[arg(help = "Output TSV line")]
        f_out: PathBuf,
    },

    /// Merge per-MAG QUAST reports into one table
    AggregateQuast {
        #[arg(help = "Output QUAST summary CSV")]
        f_out: PathBuf,
        #[arg(num_args(0..), help = "Per-MAG QUAST report.tsv files")]
        reports: Vec<PathBuf>,
    },

    /// Merge all reports and assign MIMAG tiers, GUNC status and overall score
    Summarize {
        #[arg(help = "CheckM2 report")]
        checkm2: PathBuf,
        #[arg(help = "CheckM1 report (strain heterogeneity)")]
        checkm1: PathBuf,
        #[arg(help = "MAG relative abundance report")]
        mag_ra: PathBuf,
        #[arg(help = "GUNC report")]
        gunc: PathBuf,
        #[arg(help = "GTDB-Tk classification report")]
        gtdb: PathBuf,
        #[arg(help = "DNAdiff report")]
        diff: PathBuf,
        #[arg(help = "QUAST report")]
        quast: PathBuf,
        #[arg(help = "rRNA and total gene counts")]
        gene_cts: PathBuf,
        #[arg(help = "Summary output")]
        output: PathBuf,
    },

    /// Merge reports without CheckM1 and GUNC, using high/medium tiers
    SummarizeBinary {
        #[arg(help = "CheckM2 report")]
        checkm2: PathBuf,
        #[arg(help = "MAG relative abundance report")]
        mag_ra: PathBuf,
        #[arg(help = "GTDB-Tk classification report")]
        gtdb: PathBuf,
        #[arg(help = "DNAdiff report")]
        diff: PathBuf,
        #[arg(help = "QUAST report")]
        quast: PathBuf,
        #[arg(help = "rRNA and total gene counts")]
        gene_cts: PathBuf,
        #[arg(help = "Summary output")]
        output: PathBuf,
    },

    /// Create the output, temp and log directory tree
    SetupDirs {
        #[arg(help = "Working directory")]
        work_dir: PathBuf,
        #[arg(help = "Module name, the output directory under work_dir")]
        module: String,
    },

    /// Stage MAGs and BAMs from a sample sheet into the temp directory
    Ingest {
        #[arg(help = "Sample sheet CSV: sample,mag_dir,bam")]
        samples: PathBuf,
        #[arg(help = "Working directory")]
        work_dir: PathBuf,
        #[arg(help = "Module name, the output directory under work_dir")]
        module: String,
    },

    /// Write the closest GTDB reference genome path for each MAG
    PairRefs {
        #[arg(help = "GTDB-Tk summary TSV")]
        gtdb_summary: PathBuf,
        #[arg(help = "Directory for the .ref files")]
        out_dir: PathBuf,
        #[arg(help = "GTDB-Tk database directory")]
        gtdb_db: PathBuf,
    },

    /// Prefix contig names with the bin number
    AddBinNum {
        #[arg(help = "Input FASTA (may be gzipped)")]
        f_in: PathBuf,
        #[arg(help = "Bin number")]
        bin_num: String,
        #[arg(help = "Output FASTA")]
        f_out: PathBuf,
    },

    /// Print the conda prefix configured in parameters.yaml
    CondaPrefix {
        #[arg(help = "parameters.yaml")]
        parameters: PathBuf,
    },
}

pub fn parse_args() -> Args {
    Args::parse()
}
