use crate::config::{Operation, RunConfig};
use crate::constants::ANNOTATION_HEADER_LABELS;
use crate::error::AnalysisError;
use crate::gtf::attributes::{parse_attributes, AttributeProjection};
use crate::gtf::feature::AnnotationTable;
use crate::parallel::chunking::{process_partitions_parallel, split_into_partitions, ChunkingConfig};
use crate::utils::io::{find_input_files, open_file_for_reading, open_file_for_writing};
use crate::utils::logging::logged;
use anyhow::{Context, Result};
use log::{info, warn};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// One `(chromosome, position)` row of the positions file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPosition {
    pub chromosome: String,
    pub position: i64,
}

impl QueryPosition {
    pub fn new(chromosome: impl Into<String>, position: i64) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
        }
    }
}

/// A query position together with its newline-joined annotation rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedPosition {
    pub query: QueryPosition,
    pub annotation: String,
}

impl AnnotatedPosition {
    /// Individual output lines carried by this cell.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.annotation.trim().split('\n')
    }
}

/// Reads a headerless two-column (chromosome, position) file. Columns are
/// separated by tabs or other whitespace; blank lines are skipped.
pub fn load_positions(path: &Path) -> Result<Vec<QueryPosition>> {
    let reader = open_file_for_reading(path)?;
    let mut positions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {} of {}", idx + 1, path.display()))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 2 {
            return Err(AnalysisError::ColumnCount {
                path: path.to_path_buf(),
                line: idx + 1,
                expected: 2,
                found: fields.len(),
            }
            .into());
        }
        let position = fields[1].parse::<i64>().map_err(|_| AnalysisError::InvalidNumber {
            path: path.to_path_buf(),
            line: idx + 1,
            column: "position".to_string(),
            value: fields[1].to_string(),
        })?;
        positions.push(QueryPosition::new(fields[0], position));
    }
    Ok(positions)
}

/// Annotates one position: one row per overlapping feature in table order,
/// or a single placeholder row when nothing overlaps. Rows are joined with `\n`.
pub fn annotate_position(table: &AnnotationTable, query: &QueryPosition) -> Result<String, AnalysisError> {
    let prefix = format!("{}\t{}\t", query.chromosome, query.position);
    let rows = table
        .overlapping(&query.chromosome, query.position)
        .map(|feature| parse_attributes(&feature.attributes).map(|p| format!("{}{}", prefix, p)))
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        Ok(format!("{}{}", prefix, AttributeProjection::placeholder()))
    } else {
        Ok(rows.join("\n"))
    }
}

/// Annotates every position of one partition.
pub fn execute_annotation(table: &AnnotationTable, partition: &[QueryPosition]) -> Result<Vec<AnnotatedPosition>> {
    partition
        .iter()
        .map(|query| {
            let annotation = annotate_position(table, query)
                .with_context(|| format!("Failed to annotate {}:{}", query.chromosome, query.position))?;
            Ok(AnnotatedPosition {
                query: query.clone(),
                annotation,
            })
        })
        .collect()
}

/// Writes the fixed header and every annotation row. Returns the number of
/// data rows written.
pub fn write_annotations<W: Write>(writer: &mut W, partitions: &[Vec<AnnotatedPosition>]) -> Result<usize> {
    let mut header = vec!["chr", "pos"];
    header.extend(ANNOTATION_HEADER_LABELS);
    writeln!(writer, "{}", header.join("\t")).context("Failed to write annotation header")?;

    let mut row_count = 0;
    for annotated in partitions.iter().flatten() {
        for row in annotated.rows() {
            writeln!(writer, "{}", row).context("Failed to write annotation row")?;
            row_count += 1;
        }
    }
    Ok(row_count)
}

/// Annotates positions from a two-column file against a GTF knowledge base.
pub struct GtfAnnotation {
    pub knowledge_file: PathBuf,
    pub table: AnnotationTable,
    pub positions: Vec<QueryPosition>,
    pub output_file: PathBuf,
    pub chunking: ChunkingConfig,
}

impl GtfAnnotation {
    pub fn new(input_file: &Path, knowledge_file: &Path, output_file: PathBuf, config: &RunConfig) -> Result<Self> {
        logged("GtfAnnotation::new", || {
            let knowledge_file = find_input_files(Operation::Annotation, knowledge_file)?
                .into_iter()
                .next()
                .context("No annotation file found")?;
            let table = logged("load_annotation", || AnnotationTable::load(&knowledge_file))?;
            if table.is_empty() {
                warn!("{} has no features; every position gets a placeholder row", knowledge_file.display());
            }
            let positions = logged("load_positions", || load_positions(input_file))?;
            info!("Loaded {} query positions from {}", positions.len(), input_file.display());
            Ok(Self {
                knowledge_file,
                table,
                positions,
                output_file,
                chunking: ChunkingConfig::from(config),
            })
        })
    }

    /// Splits the positions into one partition per worker and annotates them
    /// in parallel. Partition results keep submission order.
    pub fn annotate_partitions(&self) -> Result<Vec<Vec<AnnotatedPosition>>> {
        logged("annotate_partitions", || {
            let partitions = split_into_partitions(&self.positions, self.chunking.num_workers);
            let table = &self.table;
            process_partitions_parallel(partitions, &self.chunking, |partition| {
                logged("execute_annotation", || execute_annotation(table, partition))
            })
        })
    }

    /// Runs the whole pipeline and writes the output file. The output file is
    /// only created once every partition has succeeded. Returns the number of
    /// data rows written.
    pub fn annotate_all_positions(&self) -> Result<usize> {
        logged("annotate_all_positions", || {
            let results = self.annotate_partitions()?;
            let mut writer = open_file_for_writing(&self.output_file)?;
            let rows = write_annotations(&mut writer, &results)?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", self.output_file.display()))?;
            info!("Wrote {} annotation rows to {}", rows, self.output_file.display());
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtf::feature::parse_feature_line;
    use std::collections::HashMap;

    fn table(rows: &[&str]) -> AnnotationTable {
        AnnotationTable::new(
            rows.iter()
                .enumerate()
                .map(|(i, r)| parse_feature_line(r, Path::new("test.gtf"), i + 1).unwrap())
                .collect(),
        )
    }

    fn sample_table() -> AnnotationTable {
        table(&[
            "chr1\tsrc\tgene\t100\t200\t.\t+\t.\tgene_id \"G1\"; gene_name \"Foo\";",
            "chr1\tsrc\texon\t150\t160\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_number \"2\"; exon_id \"E2\"; gene_name \"Foo\";",
            "chr2\tsrc\tgene\t1\t50\t.\t-\t.\tgene_id \"G2\";",
        ])
    }

    #[test]
    fn no_overlap_emits_single_fallback_row() {
        let table = sample_table();
        let out = annotate_position(&table, &QueryPosition::new("chr1", 500)).unwrap();
        assert_eq!(out, "chr1\t500\t.\t.\t.\t.\t.");
        let out = annotate_position(&table, &QueryPosition::new("chrX", 150)).unwrap();
        assert_eq!(out, "chrX\t150\t.\t.\t.\t.\t.");
    }

    #[test]
    fn overlapping_features_expand_in_table_order() {
        let table = sample_table();
        let out = annotate_position(&table, &QueryPosition::new("chr1", 155)).unwrap();
        let rows: Vec<&str> = out.split('\n').collect();
        assert_eq!(
            rows,
            vec!["chr1\t155\tG1\t.\t.\t.\tFoo", "chr1\t155\tG1\tT1\t2\tE2\tFoo"]
        );
    }

    #[test]
    fn boundaries_are_inclusive() {
        let table = sample_table();
        for pos in [100, 200] {
            let out = annotate_position(&table, &QueryPosition::new("chr1", pos)).unwrap();
            assert!(out.contains("G1"), "position {} should overlap", pos);
        }
        for pos in [99, 201] {
            let out = annotate_position(&table, &QueryPosition::new("chr1", pos)).unwrap();
            assert!(out.ends_with(".\t.\t.\t.\t."), "position {} should not overlap", pos);
        }
    }

    #[test]
    fn malformed_attribute_fails_the_partition() {
        let table = table(&["chr1\tsrc\tgene\t1\t10\t.\t+\t.\tgene_id G1;"]);
        let positions = vec![QueryPosition::new("chr1", 5)];
        assert!(execute_annotation(&table, &positions).is_err());
        // Non-overlapping positions never parse the bad attribute string.
        let positions = vec![QueryPosition::new("chr1", 50)];
        assert!(execute_annotation(&table, &positions).is_ok());
    }

    #[test]
    fn row_count_is_sum_of_max_one_overlaps() {
        let table = sample_table();
        let positions = vec![
            QueryPosition::new("chr1", 155), // 2
            QueryPosition::new("chr1", 120), // 1
            QueryPosition::new("chr1", 120), // duplicate, 1
            QueryPosition::new("chr2", 10),  // 1
            QueryPosition::new("chr3", 10),  // fallback
        ];
        let annotated = execute_annotation(&table, &positions).unwrap();
        let mut buf = Vec::new();
        let rows = write_annotations(&mut buf, &[annotated]).unwrap();
        assert_eq!(rows, 6);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "chr\tpos\tgene_id\ttranscript_id\texon_number \texon_id\tgene_name"
        );
        assert_eq!(lines.count(), 6);
    }

    #[test]
    fn partitioning_does_not_change_output_rows() {
        let table = sample_table();
        let positions: Vec<QueryPosition> = (0..40)
            .map(|i| QueryPosition::new(if i % 3 == 0 { "chr2" } else { "chr1" }, 90 + i * 3))
            .collect();

        let collect_rows = |n: usize| -> HashMap<String, usize> {
            let config = ChunkingConfig {
                num_workers: n,
                chunk_size: 1,
                show_progress: false,
            };
            let parts = split_into_partitions(&positions, n);
            let results = process_partitions_parallel(parts, &config, |p| execute_annotation(&table, p)).unwrap();
            let mut counts = HashMap::new();
            for annotated in results.iter().flatten() {
                for row in annotated.rows() {
                    *counts.entry(row.to_string()).or_insert(0) += 1;
                }
            }
            counts
        };

        let single = collect_rows(1);
        assert_eq!(single, collect_rows(4));
        assert_eq!(single, collect_rows(7));
    }

    #[test]
    fn positions_file_requires_two_integer_columns() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let good = temp_dir.path().join("pos.tsv");
        std::fs::write(&good, "chr1\t150\nchr1 500\n\n").unwrap();
        let positions = load_positions(&good).unwrap();
        assert_eq!(positions, vec![QueryPosition::new("chr1", 150), QueryPosition::new("chr1", 500)]);

        let bad = temp_dir.path().join("bad.tsv");
        std::fs::write(&bad, "chr1\t150\t7\n").unwrap();
        assert!(load_positions(&bad).is_err());

        let bad = temp_dir.path().join("bad2.tsv");
        std::fs::write(&bad, "chr1\tabc\n").unwrap();
        assert!(load_positions(&bad).is_err());
    }

    #[test]
    fn empty_annotation_file_yields_placeholder_rows() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let gtf = temp_dir.path().join("empty.gtf");
        std::fs::write(&gtf, "#!genome-build test\n").unwrap();
        let positions = temp_dir.path().join("pos.tsv");
        std::fs::write(&positions, "chr1\t1\nchr2\t2\n").unwrap();

        let config = RunConfig::new(Operation::Annotation, 2, Some(temp_dir.path().to_path_buf())).unwrap();
        let output = temp_dir.path().join("out.tsv");
        let annotation = GtfAnnotation::new(&positions, &gtf, output.clone(), &config).unwrap();
        assert!(annotation.table.is_empty());
        assert_eq!(annotation.annotate_all_positions().unwrap(), 2);

        let text = std::fs::read_to_string(&output).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows, vec!["chr1\t1\t.\t.\t.\t.\t.", "chr2\t2\t.\t.\t.\t.\t."]);
    }
}
