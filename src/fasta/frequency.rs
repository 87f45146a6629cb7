use crate::config::{Operation, RunConfig};
use crate::parallel::chunking::{process_partitions_parallel, ChunkingConfig};
use crate::utils::io::find_input_files;
use crate::utils::logging::logged;
use anyhow::{Context, Result};
use bio::io::fasta;
use fxhash::FxHashMap;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Most common sequences of one FASTA file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFrequency {
    pub file: PathBuf,
    /// `(sequence, count)`, most frequent first.
    pub top: Vec<(String, usize)>,
}

impl SequenceFrequency {
    /// `Rank\tSequence\tCount` table, ranks starting at 1.
    pub fn to_table(&self) -> String {
        let mut lines = vec!["Rank\tSequence\tCount".to_string()];
        lines.extend(
            self.top
                .iter()
                .enumerate()
                .map(|(idx, (seq, count))| format!("{}\t{}\t{}", idx + 1, seq, count)),
        );
        lines.join("\n")
    }
}

/// Counts identical sequences in a FASTA file and keeps the `n_top` most
/// frequent. Equal counts keep first-seen order.
pub fn find_most_frequent_sequences(fasta_path: &Path, n_top: usize) -> Result<SequenceFrequency> {
    let file = File::open(fasta_path)
        .with_context(|| format!("Failed to open FASTA file: {}", fasta_path.display()))?;
    let reader = fasta::Reader::new(BufReader::new(file));

    // sequence -> (count, first seen)
    let mut counter: FxHashMap<Vec<u8>, (usize, usize)> = FxHashMap::default();
    let mut record_count = 0;
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read FASTA record from {}", fasta_path.display()))?;
        let order = counter.len();
        counter.entry(record.seq().to_vec()).or_insert((0, order)).0 += 1;
        record_count += 1;
    }
    debug!(
        "{}: {} records, {} distinct sequences",
        fasta_path.display(),
        record_count,
        counter.len()
    );

    let mut ranked: Vec<(Vec<u8>, (usize, usize))> = counter.into_iter().collect();
    ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
    let top = ranked
        .into_iter()
        .take(n_top)
        .map(|(seq, (count, _))| (String::from_utf8_lossy(&seq).into_owned(), count))
        .collect();

    Ok(SequenceFrequency {
        file: fasta_path.to_path_buf(),
        top,
    })
}

/// Runs the frequency count over every `.fasta` file under `path`, one file per task.
pub fn analyze(path: &Path, n_top: usize, config: &RunConfig) -> Result<Vec<SequenceFrequency>> {
    logged("FastaAnalyzer::analyze", || {
        let files = find_input_files(Operation::FindMostFrequentSequences, path)?;
        let chunking = ChunkingConfig::from(config);
        process_partitions_parallel(files, &chunking, |file| {
            logged("find_most_frequent_sequences", || find_most_frequent_sequences(&file, n_top))
        })
    })
}
