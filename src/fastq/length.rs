use crate::config::{Operation, RunConfig};
use crate::parallel::chunking::{process_partitions_parallel, ChunkingConfig};
use crate::utils::io::find_input_files;
use crate::utils::logging::logged;
use anyhow::{Context, Result};
use bio::io::fastq;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_THRESHOLD: usize = 30;

/// Share of reads in one FASTQ file longer than a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthStats {
    pub file: PathBuf,
    pub total: usize,
    pub long: usize,
    /// 0..=100; 0 for a file without reads.
    pub percentage: f64,
    pub threshold: usize,
}

/// Counts reads whose length is strictly greater than `threshold`.
pub fn calculate_long_sequences_percentage(fastq_path: &Path, threshold: usize) -> Result<LengthStats> {
    let file = File::open(fastq_path)
        .with_context(|| format!("Failed to open FASTQ file: {}", fastq_path.display()))?;
    let reader = fastq::Reader::new(BufReader::new(file));

    let mut total = 0;
    let mut long = 0;
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read FASTQ record from {}", fastq_path.display()))?;
        total += 1;
        if record.seq().len() > threshold {
            long += 1;
        }
    }

    let percentage = if total == 0 {
        0.0
    } else {
        (long as f64 / total as f64) * 100.0
    };
    Ok(LengthStats {
        file: fastq_path.to_path_buf(),
        total,
        long,
        percentage,
        threshold,
    })
}

/// `File\tPercentage\tThreshold` table with percentages to two decimals.
pub fn format_length_table(stats: &[LengthStats]) -> String {
    let mut lines = vec!["File\tPercentage\tThreshold".to_string()];
    for s in stats {
        lines.push(format!("{}\t{:.2}\t{}", s.file.display(), s.percentage, s.threshold));
    }
    lines.join("\n")
}

/// Runs the threshold count over every `.fastq` file under `path`. The pool
/// never has more workers than there are files.
pub fn analyze(path: &Path, threshold: usize, config: &RunConfig) -> Result<Vec<LengthStats>> {
    logged("FastqAnalyzer::analyze", || {
        let files = find_input_files(Operation::CountLongReads, path)?;
        let mut chunking = ChunkingConfig::from(config);
        chunking.num_workers = chunking.num_workers.min(files.len()).max(1);
        process_partitions_parallel(files, &chunking, |file| {
            logged("calculate_long_sequences_percentage", || {
                calculate_long_sequences_percentage(&file, threshold)
            })
        })
    })
}
