use crate::config::Operation;
use crate::error::AnalysisError;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Collects the input files for `operation` under `input_path`.
///
/// A directory is searched recursively for files ending in the operation's
/// suffix; a single file is accepted only if it carries that suffix.
/// Zero-byte matches are reported but kept.
pub fn find_input_files(operation: Operation, input_path: &Path) -> Result<Vec<PathBuf>> {
    let suffix = operation
        .suffix()
        .with_context(|| format!("{} does not take discoverable input files", operation))?;

    let mut input_files = Vec::new();
    if input_path.is_dir() {
        let pattern = input_path.join("**").join(format!("*{}", suffix));
        let pattern_str = pattern
            .to_str()
            .with_context(|| format!("Input path is not valid UTF-8: {}", input_path.display()))?;
        debug!("Searching for input files matching {}", pattern_str);
        for entry in glob::glob(pattern_str).context("Invalid input search pattern")? {
            let path = entry.context("Failed to read directory entry during input search")?;
            if path.is_file() {
                input_files.push(path);
            }
        }
        input_files.sort();
    } else if input_path.is_file() && input_path.to_string_lossy().ends_with(suffix) {
        input_files.push(input_path.to_path_buf());
    }

    if input_files.is_empty() {
        return Err(AnalysisError::InvalidInput {
            operation: operation.to_string(),
            suffix: suffix.to_string(),
            path: input_path.to_path_buf(),
        }
        .into());
    }

    for file in &input_files {
        let size = fs::metadata(file)
            .with_context(|| format!("Failed to stat input file: {}", file.display()))?
            .len();
        if size == 0 {
            warn!("File '{}' has zero file size.", file.display());
        }
    }
    Ok(input_files)
}

/// Errors unless `path` is an existing regular file.
pub fn check_path_is_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(AnalysisError::NotAFile(path.to_path_buf()).into());
    }
    Ok(())
}

/// Open a file for reading
pub fn open_file_for_reading(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file for reading: {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Open a file for writing, truncating any existing content
pub fn open_file_for_writing(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to open file for writing: {}", path.display()))?;
    Ok(BufWriter::new(file))
}
