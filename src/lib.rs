// Declare the library modules
pub mod config;
pub mod constants;
pub mod ensembl;
pub mod error;
pub mod fasta;
pub mod fastq;
pub mod gtf;
pub mod interval;
pub mod parallel;
pub mod utils;

pub use config::{Operation, RunConfig};
pub use error::AnalysisError;
