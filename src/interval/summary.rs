use crate::error::AnalysisError;
use crate::utils::io::{check_path_is_file, open_file_for_reading, open_file_for_writing};
use crate::utils::logging::logged;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub const DEFAULT_BINS: usize = 10;
const COVERAGE_COLUMN: &str = "mean_coverage";
const OUTPUT_COVERAGE_COLUMN: &str = "mean_target_coverage";

/// Mean coverage of one `(lo, hi]` bin; `None` when the bin is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSummary {
    pub lo: f64,
    pub hi: f64,
    pub mean_coverage: Option<f64>,
}

impl BinSummary {
    pub fn label(&self) -> String {
        format!("({}, {}]", format_edge(self.lo), format_edge(self.hi))
    }
}

fn format_edge(edge: f64) -> String {
    format!("{:?}", (edge * 1000.0).round() / 1000.0)
}

/// Bins an interval table on a fractional column and averages coverage per bin.
#[derive(Debug, Clone)]
pub struct IntervalSummary {
    pub file_path: PathBuf,
    pub group_by_key: String,
    pub bins_num: usize,
}

impl IntervalSummary {
    pub fn new(input_path: &Path, group_by_key: &str, bins_num: usize) -> Result<Self> {
        check_path_is_file(input_path)?;
        if bins_num == 0 {
            anyhow::bail!("Number of bins must be greater than 0");
        }
        Ok(Self {
            file_path: input_path.to_path_buf(),
            group_by_key: group_by_key.to_string(),
            bins_num,
        })
    }

    /// Re-joins every line with empty cells removed, which realigns tables
    /// that pad columns with repeated tabs.
    pub fn pre_fix_input(&self) -> Result<String> {
        let reader = open_file_for_reading(&self.file_path)?;
        let mut cleaned = String::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {}", self.file_path.display()))?;
            let columns: Vec<&str> = line
                .trim()
                .split('\t')
                .filter(|col| !col.trim().is_empty())
                .collect();
            if columns.is_empty() {
                continue;
            }
            cleaned.push_str(&columns.join("\t"));
            cleaned.push('\n');
        }
        Ok(cleaned)
    }

    /// Bin edges `0, 1/n, ..., 1`.
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..=self.bins_num)
            .map(|i| i as f64 / self.bins_num as f64)
            .collect()
    }

    pub fn summarize(&self) -> Result<Vec<BinSummary>> {
        let cleaned = self.pre_fix_input()?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(cleaned.as_bytes());

        let headers = reader.headers().context("Failed to read interval table header")?.clone();
        let column_index = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
        };
        let key_idx = column_index(self.group_by_key.as_str())?;
        let coverage_idx = column_index(COVERAGE_COLUMN)?;

        let edges = self.bin_edges();
        let mut sums = vec![(0.0_f64, 0_usize); self.bins_num];
        for record in reader.records() {
            let record = record.context("Failed to parse interval table row")?;
            let key = record.get(key_idx).and_then(|v| v.trim().parse::<f64>().ok());
            let coverage = record.get(coverage_idx).and_then(|v| v.trim().parse::<f64>().ok());
            let (Some(key), Some(coverage)) = (key, coverage) else {
                continue;
            };
            if coverage.is_nan() {
                continue;
            }
            if let Some(bin) = edges.windows(2).position(|w| w[0] < key && key <= w[1]) {
                sums[bin].0 += coverage;
                sums[bin].1 += 1;
            }
        }

        Ok(edges
            .windows(2)
            .zip(sums)
            .map(|(w, (sum, n))| BinSummary {
                lo: w[0],
                hi: w[1],
                mean_coverage: (n > 0).then(|| sum / n as f64),
            })
            .collect())
    }

    /// Writes `<group_by_key>\tmean_target_coverage`, one row per bin, `NA`
    /// for empty bins.
    pub fn process_data(&self, output_file: &Path) -> Result<Vec<BinSummary>> {
        logged("IntervalSummary::process_data", || {
            let bins = self.summarize()?;
            let mut writer = WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(open_file_for_writing(output_file)?);
            writer.write_record([self.group_by_key.as_str(), OUTPUT_COVERAGE_COLUMN])?;
            for bin in &bins {
                let mean = bin
                    .mean_coverage
                    .map_or_else(|| "NA".to_string(), |m| format!("{:?}", m));
                writer.write_record([bin.label(), mean])?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", output_file.display()))?;
            info!("Wrote {} bins to {}", bins.len(), output_file.display());
            Ok(bins)
        })
    }
}
