use crate::constants::{PLACEHOLDER, VARIANT_INFO_HEADER};
use crate::error::AnalysisError;
use crate::utils::io::{check_path_is_file, open_file_for_reading, open_file_for_writing};
use crate::utils::logging::logged;
use crate::utils::progress::ProgressTracker;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const VARIANT_NOT_FOUND: &str = "No variant found with ID";
const TRANSCRIPT_NOT_FOUND: &str = "not found";

// --- Response shapes (only the fields we read) ---

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TranscriptConsequence {
    pub transcript_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ColocatedVariant {
    pub allele_string: Option<String>,
    pub seq_region_name: Option<String>,
    pub most_severe_consequence: Option<String>,
    #[serde(default)]
    pub transcript_consequences: Option<Vec<TranscriptConsequence>>,
}

impl ColocatedVariant {
    fn first_transcript_id(&self) -> Option<&str> {
        self.transcript_consequences
            .as_ref()
            .and_then(|tc| tc.first())
            .and_then(|tc| tc.transcript_id.as_deref())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TranscriptInfo {
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ServiceError {
    error: String,
}

pub type VariantRow = [String; 5];

fn placeholder_row(variant_id: &str) -> VariantRow {
    [
        variant_id.to_string(),
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
    ]
}

/// Decides what a failed request means. `Ok(())` means "treat as missing";
/// an error means the whole retrieval stops.
pub fn handle_failed_request(
    id: &str,
    body: Option<&str>,
    not_found_marker: &str,
    skip_bad_call: bool,
    cause: &str,
) -> Result<(), AnalysisError> {
    if skip_bad_call {
        debug!("Skipping failed request for {}: {}", id, cause);
        return Ok(());
    }
    if let Some(body) = body.filter(|b| b.contains(not_found_marker)) {
        let message = serde_json::from_str::<ServiceError>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string());
        warn!("{}", message);
        return Ok(());
    }
    Err(AnalysisError::Request {
        id: id.to_string(),
        message: cause.to_string(),
    })
}

/// Builds the output rows for one variant. `lookup_transcript` resolves a
/// transcript ID to its metadata.
pub fn build_variant_rows<F>(
    variant_id: &str,
    variants: Option<&[ColocatedVariant]>,
    mut lookup_transcript: F,
) -> Result<Vec<VariantRow>>
where
    F: FnMut(&str) -> Result<Option<TranscriptInfo>>,
{
    let Some(variants) = variants.filter(|v| !v.is_empty()) else {
        return Ok(vec![placeholder_row(variant_id)]);
    };

    let mut rows = Vec::with_capacity(variants.len());
    for colocated in variants {
        let transcript = match colocated.first_transcript_id() {
            Some(transcript_id) => lookup_transcript(transcript_id)?,
            None => {
                warn!("Variant {} has no transcript consequences", variant_id);
                None
            }
        };
        match transcript {
            Some(info) => rows.push([
                variant_id.to_string(),
                colocated.allele_string.clone().unwrap_or_default(),
                colocated.seq_region_name.clone().unwrap_or_default(),
                colocated.most_severe_consequence.clone().unwrap_or_default(),
                info.display_name.unwrap_or_default(),
            ]),
            None => rows.push(placeholder_row(variant_id)),
        }
    }
    Ok(rows)
}

/// Reads variant IDs from a CSV file; every non-empty cell is one ID.
pub fn read_variant_ids(path: &Path) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(open_file_for_reading(path)?);
    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse variant ID file {}", path.display()))?;
        ids.extend(record.iter().map(str::trim).filter(|id| !id.is_empty()).map(String::from));
    }
    Ok(ids)
}

/// Fetches variant consequences and transcript names from the Ensembl REST
/// service, one request at a time.
pub struct EnsemblVariantInfoRetriever {
    pub species: String,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub variant_ids: Vec<String>,
    pub skip_bad_call: bool,
    base_url: String,
    client: Client,
}

impl EnsemblVariantInfoRetriever {
    pub fn new(
        species: &str,
        input_file: &Path,
        output_file: PathBuf,
        skip_bad_call: bool,
        base_url: &str,
    ) -> Result<Self> {
        logged("EnsemblVariantInfoRetriever::new", || {
            check_path_is_file(input_file)?;
            let variant_ids = read_variant_ids(input_file)?;
            info!("Read {} variant IDs from {}", variant_ids.len(), input_file.display());
            Ok(Self {
                species: species.to_string(),
                input_file: input_file.to_path_buf(),
                output_file,
                variant_ids,
                skip_bad_call,
                base_url: base_url.trim_end_matches('/').to_string(),
                client: Client::new(),
            })
        })
    }

    pub fn variant_url(&self, variant_id: &str) -> String {
        format!("{}/vep/{}/id/{}", self.base_url, self.species, variant_id)
    }

    pub fn transcript_url(&self, transcript_id: &str) -> String {
        format!("{}/lookup/id/{}", self.base_url, transcript_id)
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str, id: &str, not_found_marker: &str) -> Result<Option<T>> {
        let response = match self.client.get(url).header(CONTENT_TYPE, "application/json").send() {
            Ok(response) => response,
            Err(e) => {
                handle_failed_request(id, None, not_found_marker, self.skip_bad_call, &e.to_string())?;
                return Ok(None);
            }
        };

        let status = response.status();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                let cause = format!("Failed to read response body from {}: {}", url, e);
                handle_failed_request(id, None, not_found_marker, self.skip_bad_call, &cause)?;
                return Ok(None);
            }
        };
        if !status.is_success() {
            let cause = format!("HTTP {} from {}", status, url);
            handle_failed_request(id, Some(&body), not_found_marker, self.skip_bad_call, &cause)?;
            return Ok(None);
        }

        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                let cause = format!("Failed to parse JSON response from {}: {}", url, e);
                handle_failed_request(id, Some(&body), not_found_marker, self.skip_bad_call, &cause)?;
                Ok(None)
            }
        }
    }

    pub fn get_variant_info(&self, variant_id: &str) -> Result<Option<Vec<ColocatedVariant>>> {
        logged("get_variant_info", || {
            self.fetch_json(&self.variant_url(variant_id), variant_id, VARIANT_NOT_FOUND)
                .with_context(|| format!("Error fetching variant info for {}", variant_id))
        })
    }

    pub fn get_transcript_info(&self, transcript_id: &str) -> Result<Option<TranscriptInfo>> {
        logged("get_transcript_info", || {
            self.fetch_json(&self.transcript_url(transcript_id), transcript_id, TRANSCRIPT_NOT_FOUND)
                .with_context(|| format!("Error fetching transcript info for {}", transcript_id))
        })
    }

    /// Writes one TSV row per colocated variant. Returns the number of data rows.
    pub fn fetch_and_write_variant_info(&self) -> Result<usize> {
        logged("fetch_and_write_variant_info", || {
            let mut writer = WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(open_file_for_writing(&self.output_file)?);
            writer.write_record(VARIANT_INFO_HEADER)?;

            let mut progress = ProgressTracker::new(self.variant_ids.len(), "Variant retrieval");
            let mut row_count = 0;
            for variant_id in &self.variant_ids {
                let variants = self.get_variant_info(variant_id)?;
                let rows = build_variant_rows(variant_id, variants.as_deref(), |transcript_id| {
                    self.get_transcript_info(transcript_id)
                })?;
                for row in &rows {
                    writer.write_record(row)?;
                }
                row_count += rows.len();
                if progress.increment() {
                    info!("{}", progress.status());
                }
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", self.output_file.display()))?;
            println!("Data has been written to {}", self.output_file.display());
            Ok(row_count)
        })
    }
}
