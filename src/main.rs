use env_logger::Env;
use log::info;

use magqc::{
    cli::{parse_args, Command},
    coverage, dnadiff, fasta, genes, quast,
    summarize::{self, SummaryInputs},
    workflow::{self, Parameters, WorkflowDirs},
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = parse_args();

    match args.command {
        Command::MagRa { f_in, f_out } => coverage::run(f_in, f_out)?,
        Command::GeneCounts {
            f_summ,
            f_all,
            label,
            f_out,
        } => genes::run(f_summ, f_all, &label, f_out)?,
        Command::ParseDnadiff { f_in, f_out } => dnadiff::run(f_in, f_out)?,
        Command::AggregateQuast { f_out, reports } => quast::run(f_out, &reports)?,
        Command::Summarize {
            checkm2,
            checkm1,
            mag_ra,
            gunc,
            gtdb,
            diff,
            quast,
            gene_cts,
            output,
        } => {
            let inputs = SummaryInputs {
                checkm2,
                checkm1: Some(checkm1),
                mag_ra,
                gunc: Some(gunc),
                gtdb,
                diff,
                quast,
                gene_cts,
            };
            summarize::run(&inputs, output)?
        }
        Command::SummarizeBinary {
            checkm2,
            mag_ra,
            gtdb,
            diff,
            quast,
            gene_cts,
            output,
        } => {
            let inputs = SummaryInputs {
                checkm2,
                checkm1: None,
                mag_ra,
                gunc: None,
                gtdb,
                diff,
                quast,
                gene_cts,
            };
            summarize::run(&inputs, output)?
        }
        Command::SetupDirs { work_dir, module } => {
            WorkflowDirs::create(work_dir, &module)?;
        }
        Command::Ingest {
            samples,
            work_dir,
            module,
        } => {
            let dirs = WorkflowDirs::create(work_dir, &module)?;
            let names = workflow::ingest_samples(samples, &dirs.tmp)?;
            info!("Ingested {} samples", names.len());
        }
        Command::PairRefs {
            gtdb_summary,
            out_dir,
            gtdb_db,
        } => {
            workflow::pair_mag_refs(gtdb_summary, out_dir, gtdb_db)?;
        }
        Command::AddBinNum {
            f_in,
            bin_num,
            f_out,
        } => {
            let n = fasta::add_bin_num(&f_in, &bin_num, &f_out)?;
            info!("Renamed {} contigs from {}", n, f_in.display());
        }
        Command::CondaPrefix { parameters } => {
            println!("{}", Parameters::load(parameters)?.conda_prefix());
        }
    }

    Ok(())
}
