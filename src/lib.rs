pub mod cli;
pub mod coverage;
pub mod dnadiff;
pub mod fasta;
pub mod genes;
pub mod io;
pub mod output;
pub mod quality;
pub mod quast;
pub mod summarize;
pub mod types;
pub mod workflow;
