use crate::constants::GTF_COLUMNS;
use crate::error::AnalysisError;
use crate::utils::io::open_file_for_reading;
use anyhow::{Context, Result};
use log::info;
use std::io::BufRead;
use std::path::Path;

/// One row of a GTF file. Coordinates are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub chromosome: String,
    pub source: String,
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub score: String,
    pub strand: String,
    pub phase: String,
    /// Raw `key "value";` attribute column.
    pub attributes: String,
}

impl Feature {
    /// Closed-interval overlap on an exactly matching chromosome name.
    /// A feature with `start > end` never overlaps anything.
    pub fn overlaps(&self, chromosome: &str, position: i64) -> bool {
        self.chromosome == chromosome && self.start <= position && position <= self.end
    }
}

/// Parses one tab-separated GTF row. `line_no` is only used for error messages.
pub fn parse_feature_line(line: &str, path: &Path, line_no: usize) -> Result<Feature, AnalysisError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != GTF_COLUMNS.len() {
        return Err(AnalysisError::ColumnCount {
            path: path.to_path_buf(),
            line: line_no,
            expected: GTF_COLUMNS.len(),
            found: fields.len(),
        });
    }

    let parse_coord = |value: &str, column: &str| {
        value.trim().parse::<i64>().map_err(|_| AnalysisError::InvalidNumber {
            path: path.to_path_buf(),
            line: line_no,
            column: column.to_string(),
            value: value.to_string(),
        })
    };

    Ok(Feature {
        chromosome: fields[0].to_string(),
        source: fields[1].to_string(),
        feature_type: fields[2].to_string(),
        start: parse_coord(fields[3], GTF_COLUMNS[3])?,
        end: parse_coord(fields[4], GTF_COLUMNS[4])?,
        score: fields[5].to_string(),
        strand: fields[6].to_string(),
        phase: fields[7].to_string(),
        attributes: fields[8].to_string(),
    })
}

/// The full feature set, loaded once and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    features: Vec<Feature>,
}

impl AnnotationTable {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Loads every non-comment, non-blank line of a GTF file.
    /// Any malformed row fails the whole load.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = open_file_for_reading(path)?;
        let mut features = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {} of {}", idx + 1, path.display()))?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            features.push(parse_feature_line(line, path, idx + 1)?);
        }
        info!("Loaded {} features from {}", features.len(), path.display());
        Ok(Self { features })
    }

    /// Features overlapping `chromosome:position`, in file order.
    pub fn overlapping<'a>(&'a self, chromosome: &'a str, position: i64) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features.iter().filter(move |f| f.overlaps(chromosome, position))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
