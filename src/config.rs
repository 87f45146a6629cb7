use crate::constants::{DEFAULT_ENSEMBL_REST_URL, ENSEMBL_REST_URL_ENV};
use crate::error::AnalysisError;
use anyhow::Result;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// The analyses the toolkit can run. Selected once at startup from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FindMostFrequentSequences,
    CountLongReads,
    Annotation,
    IntervalSummary,
    VariantInfo,
}

impl Operation {
    /// Input file suffix used by directory discovery, if the operation has one.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::FindMostFrequentSequences => Some(".fasta"),
            Self::CountLongReads => Some(".fastq"),
            Self::Annotation => Some(".gtf"),
            Self::IntervalSummary | Self::VariantInfo => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FindMostFrequentSequences => "find_most_frequent_sequences",
            Self::CountLongReads => "count_reads_length_glt_threshold",
            Self::Annotation => "annotation",
            Self::IntervalSummary => "interval_summary",
            Self::VariantInfo => "variant_info",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default worker count: all cores but one, never below one.
pub fn default_num_cpus() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Settings shared by every operation for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub operation: Operation,
    /// Worker pool size, always at least 1.
    pub num_workers: usize,
    /// Minimum number of partitions handed to a worker at once.
    pub chunk_size: usize,
    /// Where result files go. `None` means print to stdout when the
    /// operation supports it, otherwise the current directory.
    pub output_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(operation: Operation, num_workers: usize, output_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &output_dir {
            if !dir.is_dir() {
                return Err(AnalysisError::InvalidOutputDir(dir.clone()).into());
            }
        }
        Ok(RunConfig {
            operation,
            num_workers: num_workers.max(1),
            chunk_size: 1,
            output_dir,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Output directory, falling back to the current working directory.
    pub fn output_dir_or_cwd(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// `<output dir>/<stem of input><suffix>`
    pub fn output_path_for(&self, input: &Path, suffix: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.output_dir_or_cwd().join(format!("{}{}", stem, suffix))
    }
}

/// Base URL for the Ensembl REST service; `.env` and the environment may override it.
pub fn ensembl_rest_url() -> String {
    dotenv::dotenv().ok();
    env::var(ENSEMBL_REST_URL_ENV)
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_ENSEMBL_REST_URL.to_string())
}
